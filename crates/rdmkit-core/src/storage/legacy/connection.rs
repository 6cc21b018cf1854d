use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::debug;

use super::catalog::TableMap;
use crate::error::Result;

/// Connection to a legacy repository database plus its discovered table layout.
pub struct LegacyDb {
    path: Option<String>,
    connection: Mutex<Connection>,
    tables: TableMap,
    base_url: String,
}

impl LegacyDb {
    /// Open an existing database file and discover its tables.
    pub fn open(path: &Path, base_url: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let tables = TableMap::discover(&conn)?;
        debug!(path = %path.display(), tables = tables.len(), "opened legacy database");
        Ok(Self {
            path: Some(path.to_string_lossy().to_string()),
            connection: Mutex::new(conn),
            tables,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Wrap an already prepared connection (tests seed an in-memory schema first).
    pub fn from_connection(conn: Connection, base_url: &str) -> Result<Self> {
        let tables = TableMap::discover(&conn)?;
        Ok(Self {
            path: None,
            connection: Mutex::new(conn),
            tables,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn get_connection(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn tables(&self) -> &TableMap {
        &self.tables
    }

    /// Base URL used to build record, document and file URLs.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Re-read the catalog after the schema changed underneath us.
    pub fn refresh_tables(&mut self) -> Result<()> {
        let tables = TableMap::discover(&self.get_connection())?;
        self.tables = tables;
        Ok(())
    }
}
