use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use super::catalog::TableMap;
use super::columns::{coalesce_columns, record_columns, set_record_column, ColumnMapped};
use super::connection::LegacyDb;
use super::queries::display_name_for;
use super::sublist::read_sublist;
use crate::error::{CoreError, Result};
use crate::models::{Document, LegacyFile, LegacyRecord, Relation, SubList};

impl LegacyDb {
    /// Reconstruct one record from the main table, its side tables and its documents.
    ///
    /// Side-table and document failures are logged and leave that part empty;
    /// only a missing main row is an error.
    pub fn read_record(&self, eprintid: i64) -> Result<LegacyRecord> {
        let conn = self.get_connection();
        let tables = self.tables();

        let mut rec = read_main_row(&conn, tables, eprintid)?
            .ok_or_else(|| CoreError::NotFound(format!("eprint {eprintid}")))?;
        rec.derive_dates();
        rec.id = format!("{}/id/eprint/{}", self.base_url(), rec.eprintid);
        if rec.userid > 0 {
            match display_name_for(&conn, rec.userid) {
                Ok(name) => rec.deposited_by = name.unwrap_or_default(),
                Err(e) => warn!(eprintid, userid = rec.userid, error = %e, "user lookup failed"),
            }
        }

        for kind in SubList::ALL {
            match read_sublist(&conn, tables, kind, eprintid) {
                Ok(list) => *rec.sublist_mut(kind) = list,
                Err(e) => warn!(eprintid, list = kind.field(), error = %e, "sub-list read failed"),
            }
        }

        match read_documents(&conn, tables, self.base_url(), eprintid) {
            Ok(docs) => rec.documents = docs,
            Err(e) => warn!(eprintid, error = %e, "document read failed"),
        }
        debug!(eprintid, documents = rec.documents.len(), "record assembled");
        Ok(rec)
    }
}

fn read_main_row(conn: &Connection, tables: &TableMap, eprintid: i64) -> Result<Option<LegacyRecord>> {
    let select = coalesce_columns(record_columns(), tables, "eprint");
    if select.is_empty() {
        return Err(CoreError::Storage("eprint table not found".to_string()));
    }
    let names: Vec<&'static str> = select.iter().map(|(n, _)| *n).collect();
    let exprs = select.iter().map(|(_, e)| e.as_str()).collect::<Vec<_>>().join(", ");
    let sql = format!("SELECT {exprs} FROM eprint WHERE eprintid = ?1 LIMIT 1");

    let mut stmt = conn.prepare(&sql)?;
    let rec = stmt
        .query_row(params![eprintid], |row| {
            let mut rec = LegacyRecord::default();
            for (i, name) in names.iter().enumerate() {
                let value = row.get(i)?;
                if !set_record_column(&mut rec, name, value) {
                    debug!(column = *name, "unmapped eprint column");
                }
            }
            Ok(rec)
        })
        .optional()?;
    Ok(rec)
}

/// Documents of a record, latest revision per position, with files and relations.
pub fn read_documents(
    conn: &Connection,
    tables: &TableMap,
    base_url: &str,
    eprintid: i64,
) -> Result<Vec<Document>> {
    if !tables.has_table("document") {
        return Ok(Vec::new());
    }
    let select = Document::select_list(tables, "document");
    let names: Vec<&'static str> = select.iter().map(|(n, _)| *n).collect();
    let exprs = select.iter().map(|(_, e)| e.as_str()).collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT {exprs} FROM document WHERE eprintid = ?1 ORDER BY eprintid, pos ASC, rev_number DESC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![eprintid], |row| Document::from_row(&names, row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut docs: Vec<Document> = Vec::new();
    for mut doc in rows {
        if docs.last().is_some_and(|d| d.pos == doc.pos) {
            continue;
        }
        doc.derive_dates();
        doc.id = format!("{base_url}/id/document/{}", doc.docid);
        doc.files = read_files(conn, tables, base_url, eprintid, &doc)?;
        doc.relation = read_relations(conn, tables, base_url, doc.docid)?;
        docs.push(doc);
    }
    Ok(docs)
}

fn read_files(
    conn: &Connection,
    tables: &TableMap,
    base_url: &str,
    eprintid: i64,
    doc: &Document,
) -> Result<Vec<LegacyFile>> {
    if !tables.has_table("file") {
        return Ok(Vec::new());
    }
    let select = LegacyFile::select_list(tables, "file");
    let names: Vec<&'static str> = select.iter().map(|(n, _)| *n).collect();
    let exprs = select.iter().map(|(_, e)| e.as_str()).collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT {exprs} FROM file WHERE datasetid = 'document' AND objectid = ?1 ORDER BY fileid"
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut files = stmt
        .query_map(params![doc.docid], |row| LegacyFile::from_row(&names, row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for file in &mut files {
        file.derive_dates();
        file.id = format!("{base_url}/id/file/{}", file.fileid);
        file.url = format!("{base_url}/{eprintid}/{}/{}", doc.pos, file.filename);
    }
    Ok(files)
}

fn read_relations(
    conn: &Connection,
    tables: &TableMap,
    base_url: &str,
    docid: i64,
) -> Result<Vec<Relation>> {
    if !tables.has_table("document_relation_type") || !tables.has_table("document_relation_uri") {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(
        "SELECT COALESCE(t.relation_type, '') AS relation_type,
                COALESCE(u.relation_uri, '') AS relation_uri
         FROM document_relation_type t
         JOIN document_relation_uri u ON t.docid = u.docid AND t.pos = u.pos
         WHERE t.docid = ?1
         ORDER BY t.pos",
    )?;
    let relations = stmt
        .query_map(params![docid], |row| {
            let relation_type: String = row.get(0)?;
            let uri: String = row.get(1)?;
            Ok(Relation {
                relation_type,
                uri: format!("{base_url}{uri}"),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(relations)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::seeded_db;
    use super::*;

    #[test]
    fn reads_full_record() {
        let db = seeded_db().unwrap();
        let rec = db.read_record(1).unwrap();

        assert_eq!(rec.id, "https://repo.example.edu/id/eprint/1");
        assert_eq!(rec.title, "Foo");
        assert_eq!(rec.record_type, "article");
        assert_eq!(rec.datestamp, "2020-01-02 03:04:05");
        assert_eq!(rec.date, "2019-07");
        assert_eq!(rec.deposited_by, "Jane Doe");
        assert!(rec.is_public());

        let creators = rec.creators.as_ref().unwrap();
        assert_eq!(creators.len(), 2);
        assert_eq!(creators.at(0).unwrap().family(), "Doe");
        assert_eq!(creators.at(0).unwrap().orcid, "0000-0001-2345-6789");
        assert_eq!(creators.at(1).unwrap().family(), "Smith");

        let funders = rec.funders.as_ref().unwrap();
        assert_eq!(funders.at(0).unwrap().agency, "NSF");
        assert_eq!(funders.at(0).unwrap().grant_number, "AST-1");
    }

    #[test]
    fn keeps_latest_document_revision() {
        let db = seeded_db().unwrap();
        let rec = db.read_record(1).unwrap();

        assert_eq!(rec.documents.len(), 1);
        let doc = &rec.documents[0];
        assert_eq!(doc.rev_number, 2);
        assert_eq!(doc.date_embargo, "2030-01-01");
        assert_eq!(doc.files.len(), 1);
        assert_eq!(doc.files[0].url, "https://repo.example.edu/1/1/paper.pdf");
        assert_eq!(doc.files[0].id, "https://repo.example.edu/id/file/7");
        assert_eq!(doc.relation[0].uri, "https://repo.example.edu/id/document/11");
    }

    #[test]
    fn sublist_holes_keep_positions() {
        let db = seeded_db().unwrap();
        let rec = db.read_record(2).unwrap();
        let groups = rec.local_group.as_ref().unwrap();
        assert_eq!(groups.len(), 5);
        for (i, item) in groups.iter().enumerate() {
            assert_eq!(item.pos, i as i64);
        }
        assert!(groups.at(3).unwrap().value.is_empty());
        assert_eq!(groups.at(4).unwrap().value, "Five");
    }

    #[test]
    fn missing_record_is_not_found() {
        let db = seeded_db().unwrap();
        assert!(matches!(db.read_record(999), Err(CoreError::NotFound(_))));
    }
}
