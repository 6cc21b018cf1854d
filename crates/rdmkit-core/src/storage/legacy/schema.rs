//! DDL for an EPrints-shaped database, generated from the column mappings.
//! Used to bootstrap an empty legacy database and to seed test fixtures.

use rusqlite::Connection;

use super::columns::{quote_ident, record_columns, ColumnKind, ColumnMapped};
use super::sublist::{side_tables, Shape};
use crate::error::Result;
use crate::models::{Document, LegacyFile, SubList};

fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Int => "INTEGER",
        ColumnKind::Text => "TEXT",
        ColumnKind::Real => "REAL",
    }
}

fn create_table(name: &str, columns: &[(String, &'static str)], key: &str) -> String {
    let cols = columns
        .iter()
        .map(|(c, t)| format!("    {} {t}", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{cols},\n    PRIMARY KEY ({key})\n);\n",
        quote_ident(name)
    )
}

fn mapped<T: ColumnMapped>(extra: &[(&'static str, ColumnKind)]) -> Vec<(String, &'static str)> {
    T::columns()
        .into_iter()
        .chain(extra.iter().copied())
        .map(|(c, k)| (c.to_string(), sql_type(k)))
        .collect()
}

/// Full schema script.
pub fn schema_sql() -> String {
    let mut sql = String::new();

    let main: Vec<(String, &'static str)> = record_columns()
        .into_iter()
        .map(|(c, k)| (c.to_string(), sql_type(k)))
        .collect();
    sql.push_str(&create_table("eprint", &main, "eprintid"));

    for kind in SubList::ALL {
        for side in side_tables(kind) {
            let mut cols = vec![
                ("eprintid".to_string(), "INTEGER"),
                ("pos".to_string(), "INTEGER"),
            ];
            let ty = if side.shape == Shape::Timestamp { "INTEGER" } else { "TEXT" };
            cols.extend(side.physical_columns().into_iter().map(|c| (c, ty)));
            sql.push_str(&create_table(&side.table, &cols, "eprintid, pos"));
        }
    }
    sql.push_str(&create_table(
        "eprint_keyword",
        &[
            ("eprintid".to_string(), "INTEGER"),
            ("pos".to_string(), "INTEGER"),
            ("keyword".to_string(), "TEXT"),
        ],
        "eprintid, pos",
    ));

    sql.push_str(&create_table("document", &mapped::<Document>(&[]), "docid"));
    for part in ["type", "uri"] {
        sql.push_str(&create_table(
            &format!("document_relation_{part}"),
            &[
                ("docid".to_string(), "INTEGER"),
                ("pos".to_string(), "INTEGER"),
                (format!("relation_{part}"), "TEXT"),
            ],
            "docid, pos",
        ));
    }
    sql.push_str(&create_table("file", &mapped::<LegacyFile>(&[]), "fileid"));

    sql.push_str(
        "
CREATE TABLE IF NOT EXISTS user (
    userid INTEGER PRIMARY KEY,
    username TEXT,
    usertype TEXT,
    email TEXT,
    name_honourific TEXT,
    name_given TEXT,
    name_family TEXT,
    name_lineage TEXT
);
CREATE TABLE IF NOT EXISTS subject (
    subjectid TEXT PRIMARY KEY,
    rev_number INTEGER,
    depositable TEXT
);
",
    );
    sql
}

/// Create every legacy table that does not exist yet.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(&schema_sql())?;
    Ok(())
}
