use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::info;

use super::catalog::TableMap;
use super::columns::{quote_ident, record_column_value, record_columns};
use super::connection::LegacyDb;
use super::pairtree::dir_value;
use super::sublist::write_sublists;
use crate::dates::now_timestamp;
use crate::error::{CoreError, Result};
use crate::models::LegacyRecord;

impl LegacyDb {
    /// Reserve the next id and write `rec` under it. Returns the new id.
    ///
    /// Any SQL failure rolls the whole record back.
    pub fn create_record(&self, rec: &mut LegacyRecord) -> Result<i64> {
        let mut conn = self.get_connection();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO eprint (eprintid) SELECT COALESCE(MAX(eprintid), 0) + 1 FROM eprint",
            [],
        )?;
        let id: i64 = tx.query_row("SELECT MAX(eprintid) FROM eprint", [], |row| row.get(0))?;

        rec.eprintid = id;
        let now = now_timestamp();
        if rec.datestamp.is_empty() {
            rec.datestamp = now.clone();
        }
        rec.status_changed = now.clone();
        if rec.eprint_status.is_empty() {
            rec.eprint_status = "inbox".to_string();
        }
        if rec.rev_number == 0 {
            rec.rev_number = 1;
        }
        prepare(rec, &now);

        write_main(&tx, self.tables(), rec)?;
        write_sublists(&tx, self.tables(), rec)?;
        tx.commit()?;

        rec.id = format!("{}/id/eprint/{id}", self.base_url());
        info!(eprintid = id, "created legacy record");
        Ok(id)
    }

    /// Rewrite an existing record's main row and side tables.
    pub fn update_record(&self, rec: &mut LegacyRecord) -> Result<()> {
        let mut conn = self.get_connection();
        let tx = conn.transaction()?;

        let exists = tx
            .query_row(
                "SELECT eprintid FROM eprint WHERE eprintid = ?1",
                params![rec.eprintid],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(CoreError::NotFound(format!("eprint {}", rec.eprintid)));
        }

        let now = now_timestamp();
        if rec.datestamp.is_empty() {
            rec.datestamp = now.clone();
        }
        if rec.status_changed.is_empty() {
            rec.status_changed = now.clone();
        }
        prepare(rec, &now);

        write_main(&tx, self.tables(), rec)?;
        write_sublists(&tx, self.tables(), rec)?;
        tx.commit()?;
        info!(eprintid = rec.eprintid, "updated legacy record");
        Ok(())
    }
}

fn prepare(rec: &mut LegacyRecord, now: &str) {
    if rec.dir.is_empty() {
        rec.dir = dir_value(rec.eprintid);
    }
    rec.lastmod = now.to_string();
    rec.split_dates();
}

fn sql_value(value: Value) -> Value {
    match value {
        Value::Text(s) if s.is_empty() => Value::Null,
        other => other,
    }
}

fn write_main(conn: &Connection, tables: &TableMap, rec: &LegacyRecord) -> Result<()> {
    let columns: Vec<&'static str> = record_columns()
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| tables.has_column("eprint", name))
        .collect();
    if columns.is_empty() {
        return Err(CoreError::Storage("eprint table not found".to_string()));
    }

    let column_list = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
    let placeholders = (1..=columns.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
    let values: Vec<Value> = columns
        .iter()
        .map(|c| record_column_value(rec, c).map(sql_value).unwrap_or(Value::Null))
        .collect();

    conn.execute(
        &format!("REPLACE INTO eprint ({column_list}) VALUES ({placeholders})"),
        params_from_iter(values),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::seeded_db;
    use crate::models::{Name, SubList};

    use super::*;

    #[test]
    fn create_reserves_next_id_and_round_trips() {
        let db = seeded_db().unwrap();
        let mut rec = LegacyRecord {
            title: "New record".into(),
            record_type: "book".into(),
            abstract_text: "About it".into(),
            date: "2001-02".into(),
            date_type: "published".into(),
            ..LegacyRecord::default()
        };
        rec.item_at_mut(SubList::Creators, 0).name = Name::person("", "Ada", "Lovelace", "");
        rec.item_at_mut(SubList::Creators, 1).name = Name::person("", "Alan", "Turing", "");
        rec.item_at_mut(SubList::Creators, 1).orcid = "0000-0002-0000-0000".into();
        rec.item_at_mut(SubList::Funders, 0).agency = "NASA".into();

        let id = db.create_record(&mut rec).unwrap();
        assert_eq!(id, 4);
        assert_eq!(rec.dir, "disk0/00/00/00/04");

        let back = db.read_record(id).unwrap();
        assert_eq!(back.title, "New record");
        assert_eq!(back.record_type, "book");
        assert_eq!(back.abstract_text, "About it");
        assert_eq!(back.date, "2001-02");
        assert_eq!(back.eprint_status, "inbox");
        assert!(!back.datestamp.is_empty());
        let creators = back.creators.unwrap();
        assert_eq!(creators.at(1).unwrap().family(), "Turing");
        assert_eq!(creators.at(1).unwrap().orcid, "0000-0002-0000-0000");
        assert_eq!(back.funders.unwrap().at(0).unwrap().agency, "NASA");
    }

    #[test]
    fn update_replaces_sublists() {
        let db = seeded_db().unwrap();
        let mut rec = db.read_record(1).unwrap();
        rec.title = "Foo revised".into();
        rec.creators = Some(
            [crate::models::Item {
                name: Name::person("", "Solo", "Author", ""),
                ..Default::default()
            }]
            .into_iter()
            .collect(),
        );
        db.update_record(&mut rec).unwrap();

        let back = db.read_record(1).unwrap();
        assert_eq!(back.title, "Foo revised");
        assert_eq!(back.creators.unwrap().len(), 1);
        assert_eq!(back.datestamp, "2020-01-02 03:04:05");
    }

    #[test]
    fn update_missing_record_fails() {
        let db = seeded_db().unwrap();
        let mut rec = LegacyRecord {
            eprintid: 99,
            ..LegacyRecord::default()
        };
        assert!(matches!(db.update_record(&mut rec), Err(CoreError::NotFound(_))));
    }
}
