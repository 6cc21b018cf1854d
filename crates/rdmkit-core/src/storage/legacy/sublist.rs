//! Position-ordered side tables (`eprint_<field>[_<part>]`) and how they fold
//! into [`ItemList`] entries.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use tracing::warn;

use super::catalog::TableMap;
use super::columns::quote_ident;
use crate::dates::{make_timestamp, parse_timestamp};
use crate::error::Result;
use crate::models::{Item, ItemList, LegacyRecord, Name, SubList};

/// Item attribute a plain text column lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Value,
    NameValue,
    Id,
    Orcid,
    Uri,
    Url,
    Role,
    Email,
    ShowEmail,
    Type,
    Description,
    Agency,
    GrantNumber,
    Ror,
    Status,
    ReportedBy,
    ResolvedBy,
    Comment,
}

impl Field {
    fn get(self, item: &Item) -> String {
        match self {
            Field::Value => item.value.clone(),
            Field::NameValue => item.name.as_ref().map(|n| n.value.clone()).unwrap_or_default(),
            Field::Id => item.id.clone(),
            Field::Orcid => item.orcid.clone(),
            Field::Uri => item.uri.clone(),
            Field::Url => item.url.clone(),
            Field::Role => item.role.clone(),
            Field::Email => item.email.clone(),
            Field::ShowEmail => item.show_email.clone(),
            Field::Type => item.item_type.clone(),
            Field::Description => item.description.clone(),
            Field::Agency => item.agency.clone(),
            Field::GrantNumber => item.grant_number.clone(),
            Field::Ror => item.ror.clone(),
            Field::Status => item.status.clone(),
            Field::ReportedBy => item.reported_by.clone(),
            Field::ResolvedBy => item.resolved_by.clone(),
            Field::Comment => item.comment.clone(),
        }
    }

    fn set(self, item: &mut Item, value: String) {
        let slot = match self {
            Field::NameValue => {
                if let Some(name) = Name::literal(&value) {
                    item.name = Some(name);
                }
                return;
            }
            Field::Value => &mut item.value,
            Field::Id => &mut item.id,
            Field::Orcid => &mut item.orcid,
            Field::Uri => &mut item.uri,
            Field::Url => &mut item.url,
            Field::Role => &mut item.role,
            Field::Email => &mut item.email,
            Field::ShowEmail => &mut item.show_email,
            Field::Type => &mut item.item_type,
            Field::Description => &mut item.description,
            Field::Agency => &mut item.agency,
            Field::GrantNumber => &mut item.grant_number,
            Field::Ror => &mut item.ror,
            Field::Status => &mut item.status,
            Field::ReportedBy => &mut item.reported_by,
            Field::ResolvedBy => &mut item.resolved_by,
            Field::Comment => &mut item.comment,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One text column.
    Text(Field),
    /// `<col>_honourific`, `<col>_given`, `<col>_family`, `<col>_lineage`.
    PersonName,
    /// `<col>_year` .. `<col>_second`.
    Timestamp,
}

/// One side table contributing to a sub-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideTable {
    pub table: String,
    pub column: String,
    pub shape: Shape,
}

impl SideTable {
    fn new(field: &str, part: Option<&str>, shape: Shape) -> Self {
        let column = match part {
            Some(p) => format!("{field}_{p}"),
            None => field.to_string(),
        };
        Self {
            table: format!("eprint_{column}"),
            column,
            shape,
        }
    }

    /// Physical columns this table stores for an item.
    pub fn physical_columns(&self) -> Vec<String> {
        let suffixes: &[&str] = match self.shape {
            Shape::Text(_) => return vec![self.column.clone()],
            Shape::PersonName => &["honourific", "given", "family", "lineage"],
            Shape::Timestamp => &["year", "month", "day", "hour", "minute", "second"],
        };
        suffixes.iter().map(|s| format!("{}_{s}", self.column)).collect()
    }
}

const PERSON_PARTS: [(&str, Field); 8] = [
    ("id", Field::Id),
    ("orcid", Field::Orcid),
    ("uri", Field::Uri),
    ("url", Field::Url),
    ("role", Field::Role),
    ("email", Field::Email),
    ("show_email", Field::ShowEmail),
    ("type", Field::Type),
];

/// Side tables for a sub-list, name-bearing table first.
pub fn side_tables(kind: SubList) -> Vec<SideTable> {
    let field = kind.field();
    let text = |part: &str, f: Field| SideTable::new(field, Some(part), Shape::Text(f));

    if kind.is_person_list() {
        let mut out = vec![SideTable::new(field, Some("name"), Shape::PersonName)];
        out.extend(PERSON_PARTS.iter().map(|(part, f)| text(*part, *f)));
        return out;
    }

    match kind {
        SubList::ConfCreators | SubList::CorpCreators | SubList::CorpContributors => vec![
            text("name", Field::NameValue),
            text("id", Field::Id),
            text("ror", Field::Ror),
            text("uri", Field::Uri),
        ],
        SubList::Funders => vec![
            text("agency", Field::Agency),
            text("grant_number", Field::GrantNumber),
            text("ror", Field::Ror),
        ],
        SubList::RelatedUrl => vec![
            text("url", Field::Url),
            text("type", Field::Type),
            text("description", Field::Description),
        ],
        SubList::OtherNumberingSystem => {
            vec![text("name", Field::NameValue), text("id", Field::Id)]
        }
        SubList::ItemIssues => vec![
            SideTable::new(field, Some("timestamp"), Shape::Timestamp),
            text("type", Field::Type),
            text("status", Field::Status),
            text("description", Field::Description),
            text("id", Field::Id),
            text("resolved_by", Field::ResolvedBy),
            text("reported_by", Field::ReportedBy),
            text("comment", Field::Comment),
        ],
        _ => vec![SideTable::new(field, None, Shape::Text(Field::Value))],
    }
}

/// `eprint_*` tables present in the database that no sub-list claims.
pub fn unmapped_side_tables(tables: &TableMap) -> Vec<String> {
    let known: Vec<String> = SubList::ALL
        .iter()
        .flat_map(|k| side_tables(*k))
        .map(|t| t.table)
        .collect();
    tables
        .table_names()
        .filter(|t| t.starts_with("eprint_") && *t != "eprint_keyword")
        .filter(|t| !known.iter().any(|k| k == t))
        .map(str::to_string)
        .collect()
}

// ─── Read ──────────────────────────────────────────────────

/// Assemble one sub-list. `Ok(None)` when no side table has rows for the record.
pub fn read_sublist(
    conn: &Connection,
    tables: &TableMap,
    kind: SubList,
    eprintid: i64,
) -> Result<Option<ItemList>> {
    let mut list = ItemList::new();
    let mut seen = false;

    for side in side_tables(kind) {
        if !tables.has_column(&side.table, "pos") {
            continue;
        }
        let columns: Vec<String> = side
            .physical_columns()
            .into_iter()
            .filter(|c| tables.has_column(&side.table, c))
            .collect();
        if columns.is_empty() {
            continue;
        }
        let zero = if side.shape == Shape::Timestamp { "0" } else { "''" };
        let select = columns
            .iter()
            .map(|c| format!("COALESCE({q}, {zero}) AS {q}", q = quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT COALESCE(pos, 0) AS pos, {select} FROM {} WHERE eprintid = ?1 ORDER BY eprintid, pos",
            quote_ident(&side.table)
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![eprintid])?;
        while let Some(row) = rows.next()? {
            let pos: i64 = row.get(0)?;
            if pos < 0 {
                continue;
            }
            seen = true;
            let item = list.at_mut(pos as usize);
            apply_row(&side, &columns, row, item)?;
        }
    }

    Ok(seen.then_some(list))
}

fn text_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<String> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Text(s) => s.trim().to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Real(f) => f.to_string(),
        _ => String::new(),
    })
}

fn int_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<i64> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Integer(n) => n,
        Value::Text(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn apply_row(
    side: &SideTable,
    columns: &[String],
    row: &rusqlite::Row,
    item: &mut Item,
) -> rusqlite::Result<()> {
    // Column 0 is pos; the physical columns follow in `columns` order.
    let lookup = |suffix: &str| {
        let wanted = format!("{}_{suffix}", side.column);
        columns.iter().position(|c| *c == wanted).map(|i| i + 1)
    };

    match side.shape {
        Shape::Text(field) => {
            let value = text_at(row, 1)?;
            if !value.is_empty() {
                field.set(item, value);
            }
        }
        Shape::PersonName => {
            let part = |suffix: &str| -> rusqlite::Result<String> {
                match lookup(suffix) {
                    Some(i) => text_at(row, i),
                    None => Ok(String::new()),
                }
            };
            let honourific = part("honourific")?;
            let given = part("given")?;
            let family = part("family")?;
            let lineage = part("lineage")?;
            if let Some(name) = Name::person(&honourific, &given, &family, &lineage) {
                item.name = Some(name);
            }
        }
        Shape::Timestamp => {
            let part = |suffix: &str| -> rusqlite::Result<i64> {
                match lookup(suffix) {
                    Some(i) => int_at(row, i),
                    None => Ok(0),
                }
            };
            let (y, mo, d) = (part("year")?, part("month")?, part("day")?);
            let (h, mi, s) = (part("hour")?, part("minute")?, part("second")?);
            item.timestamp = make_timestamp(y, mo, d, h, mi, s);
        }
    }
    Ok(())
}

// ─── Write ─────────────────────────────────────────────────

fn text_or_null(s: &str) -> Value {
    if s.is_empty() {
        Value::Null
    } else {
        Value::Text(s.to_string())
    }
}

fn item_values(side: &SideTable, item: &Item) -> Vec<Value> {
    match side.shape {
        Shape::Text(field) => vec![text_or_null(&field.get(item))],
        Shape::PersonName => {
            let name = item.name.clone().unwrap_or_default();
            vec![
                text_or_null(&name.honourific),
                text_or_null(&name.given),
                text_or_null(&name.family),
                text_or_null(&name.lineage),
            ]
        }
        Shape::Timestamp => {
            if item.timestamp.is_empty() {
                return vec![Value::Null; 6];
            }
            let (y, mo, d, h, mi, s) = parse_timestamp(&item.timestamp);
            [y, mo, d, h, mi, s].into_iter().map(Value::Integer).collect()
        }
    }
}

/// Replace every side-table row of `rec` with its in-memory sub-lists.
pub fn write_sublists(conn: &Connection, tables: &TableMap, rec: &LegacyRecord) -> Result<()> {
    for table in unmapped_side_tables(tables) {
        warn!(table = %table, eprintid = rec.eprintid, "no mapping for side table, skipped");
    }

    for kind in SubList::ALL {
        for side in side_tables(kind) {
            if !tables.has_column(&side.table, "eprintid") || !tables.has_column(&side.table, "pos") {
                continue;
            }
            let table = quote_ident(&side.table);
            conn.execute(&format!("DELETE FROM {table} WHERE eprintid = ?1"), params![rec.eprintid])?;

            let physical = side.physical_columns();
            let present: Vec<usize> = physical
                .iter()
                .enumerate()
                .filter(|(_, c)| tables.has_column(&side.table, c))
                .map(|(i, _)| i)
                .collect();
            if present.is_empty() {
                continue;
            }
            let column_list = present
                .iter()
                .map(|i| quote_ident(&physical[*i]))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (0..present.len() + 2)
                .map(|i| format!("?{}", i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("INSERT INTO {table} (eprintid, pos, {column_list}) VALUES ({placeholders})");
            let mut stmt = conn.prepare(&sql)?;

            for (pos, item) in rec.items(kind).iter().enumerate() {
                let values = item_values(&side, item);
                let mut row = vec![Value::Integer(rec.eprintid), Value::Integer(pos as i64)];
                row.extend(present.iter().map(|i| values[*i].clone()));
                stmt.execute(params_from_iter(row))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_tables_start_with_name() {
        let tables = side_tables(SubList::Creators);
        assert_eq!(tables[0].table, "eprint_creators_name");
        assert_eq!(
            tables[0].physical_columns(),
            vec![
                "creators_name_honourific",
                "creators_name_given",
                "creators_name_family",
                "creators_name_lineage"
            ]
        );
        assert!(tables.iter().any(|t| t.table == "eprint_creators_orcid"));
    }

    #[test]
    fn simple_list_uses_bare_column() {
        let tables = side_tables(SubList::LocalGroup);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].table, "eprint_local_group");
        assert_eq!(tables[0].column, "local_group");
    }

    #[test]
    fn funders_fan_out() {
        let names: Vec<String> = side_tables(SubList::Funders).into_iter().map(|t| t.table).collect();
        assert_eq!(
            names,
            vec!["eprint_funders_agency", "eprint_funders_grant_number", "eprint_funders_ror"]
        );
    }

    #[test]
    fn hole_is_preserved() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE eprint_creators_name (eprintid INTEGER, pos INTEGER,
                creators_name_honourific TEXT, creators_name_given TEXT,
                creators_name_family TEXT, creators_name_lineage TEXT);
            INSERT INTO eprint_creators_name VALUES (1, 0, NULL, 'A', 'Zero', NULL);
            INSERT INTO eprint_creators_name VALUES (1, 1, NULL, 'B', 'One', NULL);
            INSERT INTO eprint_creators_name VALUES (1, 2, NULL, 'C', 'Two', NULL);
            INSERT INTO eprint_creators_name VALUES (1, 4, NULL, 'E', 'Four', NULL);
            ",
        )
        .unwrap();
        let tables = TableMap::discover(&conn).unwrap();

        let list = read_sublist(&conn, &tables, SubList::Creators, 1).unwrap().unwrap();
        assert_eq!(list.len(), 5);
        for (i, item) in list.iter().enumerate() {
            assert_eq!(item.pos, i as i64);
        }
        assert!(list.at(3).unwrap().name.is_none());
        assert_eq!(list.at(4).unwrap().family(), "Four");
    }

    #[test]
    fn missing_tables_yield_none() {
        let conn = Connection::open_in_memory().unwrap();
        let tables = TableMap::discover(&conn).unwrap();
        assert!(read_sublist(&conn, &tables, SubList::Editors, 1).unwrap().is_none());
    }
}
