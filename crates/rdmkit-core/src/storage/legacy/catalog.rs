use std::collections::BTreeMap;

use rusqlite::{params, Connection};

use crate::error::Result;

const TABLE_PREFIXES: [&str; 3] = ["eprint", "document", "file"];

/// Table name → column names, for every record-related table in the database.
#[derive(Debug, Clone, Default)]
pub struct TableMap {
    tables: BTreeMap<String, Vec<String>>,
}

impl TableMap {
    /// Read `eprint%`, `document%` and `file%` tables and their columns from the catalog.
    /// Names containing `__` are scratch tables and are skipped.
    pub fn discover(conn: &Connection) -> Result<Self> {
        let mut tables = BTreeMap::new();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE ?1 ORDER BY name",
        )?;
        let mut col_stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;

        for prefix in TABLE_PREFIXES {
            let names = stmt
                .query_map(params![format!("{prefix}%")], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            for name in names.into_iter().filter(|n| !n.contains("__")) {
                let columns = col_stmt
                    .query_map(params![name], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                tables.insert(name, columns);
            }
        }
        Ok(Self { tables })
    }

    pub fn from_map(tables: BTreeMap<String, Vec<String>>) -> Self {
        Self { tables }
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|cols| cols.iter().any(|c| c == column))
    }

    pub fn columns(&self, table: &str) -> &[String] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_prefixed_tables_only() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE eprint (eprintid INTEGER, title TEXT);
            CREATE TABLE eprint_creators_name (eprintid INTEGER, pos INTEGER, creators_name_family TEXT);
            CREATE TABLE eprint__scratch (x INTEGER);
            CREATE TABLE document (docid INTEGER);
            CREATE TABLE user (userid INTEGER);
            ",
        )
        .unwrap();

        let map = TableMap::discover(&conn).unwrap();
        assert!(map.has_table("eprint"));
        assert!(map.has_table("document"));
        assert!(!map.has_table("eprint__scratch"));
        assert!(!map.has_table("user"));
        assert!(map.has_column("eprint_creators_name", "creators_name_family"));
        assert_eq!(map.columns("eprint"), ["eprintid", "title"]);
    }
}
