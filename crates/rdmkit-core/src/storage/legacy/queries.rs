use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::connection::LegacyDb;
use crate::error::{CoreError, Result};
use crate::models::Name;

/// Datasets exposed by the REST replica, with their key column.
pub const DATASETS: [(&str, &str); 3] = [
    ("eprint", "eprintid"),
    ("user", "userid"),
    ("subject", "subjectid"),
];

/// `honourific given family lineage` for a user, `None` when unknown.
pub fn display_name_for(conn: &Connection, userid: i64) -> Result<Option<String>> {
    let name = conn
        .query_row(
            "SELECT COALESCE(name_honourific, ''), COALESCE(name_given, ''),
                    COALESCE(name_family, ''), COALESCE(name_lineage, '')
             FROM user WHERE userid = ?1",
            params![userid],
            |row| {
                Ok(Name::person(
                    &row.get::<_, String>(0)?,
                    &row.get::<_, String>(1)?,
                    &row.get::<_, String>(2)?,
                    &row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;
    Ok(name.flatten().map(|n| n.display()))
}

fn check_date(s: &str) -> Result<()> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| CoreError::Validation(format!("{s:?} is not a YYYY-MM-DD date")))
}

fn collect_ids(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(args, |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

impl LegacyDb {
    /// Every record id in ascending order.
    pub fn get_all_ids(&self) -> Result<Vec<i64>> {
        collect_ids(
            &self.get_connection(),
            "SELECT eprintid FROM eprint ORDER BY eprintid",
            [],
        )
    }

    pub fn ids_with_status(&self, status: &str) -> Result<Vec<i64>> {
        collect_ids(
            &self.get_connection(),
            "SELECT eprintid FROM eprint WHERE eprint_status = ?1 ORDER BY eprintid",
            params![status],
        )
    }

    /// Ids whose last-modified date falls in the inclusive `YYYY-MM-DD` range.
    pub fn modified_ids(&self, start: &str, end: &str) -> Result<Vec<i64>> {
        check_date(start)?;
        check_date(end)?;
        collect_ids(
            &self.get_connection(),
            "SELECT eprintid FROM eprint
             WHERE printf('%04d-%02d-%02d',
                          COALESCE(lastmod_year, 0), COALESCE(lastmod_month, 0), COALESCE(lastmod_day, 0))
                   BETWEEN ?1 AND ?2
             ORDER BY eprintid",
            params![start, end],
        )
    }

    /// True for `archive` records with `show` visibility.
    pub fn is_public(&self, eprintid: i64) -> Result<bool> {
        let row = self
            .get_connection()
            .query_row(
                "SELECT COALESCE(eprint_status, ''), COALESCE(metadata_visibility, '')
                 FROM eprint WHERE eprintid = ?1",
                params![eprintid],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        match row {
            Some((status, visibility)) => Ok(status == "archive" && visibility == "show"),
            None => Err(CoreError::NotFound(format!("eprint {eprintid}"))),
        }
    }

    pub fn user_display_name(&self, userid: i64) -> Result<Option<String>> {
        display_name_for(&self.get_connection(), userid)
    }

    /// Keys of a REST dataset. The eprint dataset lists archived records only.
    pub fn dataset_ids(&self, dataset: &str) -> Result<Vec<String>> {
        let sql = match dataset {
            "eprint" => {
                "SELECT CAST(eprintid AS TEXT) FROM eprint WHERE eprint_status = 'archive' ORDER BY eprintid"
            }
            "user" => "SELECT CAST(userid AS TEXT) FROM user ORDER BY userid",
            "subject" => "SELECT subjectid FROM subject ORDER BY subjectid",
            other => return Err(CoreError::Validation(format!("unknown dataset {other}"))),
        };
        let conn = self.get_connection();
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// `<archives>/<repo_id>/documents/<dir>/revisions/<rev_number>.xml`
    pub fn revision_xml_path(&self, archives: &Path, repo_id: &str, eprintid: i64) -> Result<PathBuf> {
        let row = self
            .get_connection()
            .query_row(
                "SELECT COALESCE(dir, ''), COALESCE(rev_number, 0) FROM eprint WHERE eprintid = ?1",
                params![eprintid],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        let (dir, rev) = row.ok_or_else(|| CoreError::NotFound(format!("eprint {eprintid}")))?;
        if dir.is_empty() {
            return Err(CoreError::NotFound(format!("eprint {eprintid} has no storage dir")));
        }
        Ok(archives
            .join(repo_id)
            .join("documents")
            .join(dir)
            .join("revisions")
            .join(format!("{rev}.xml")))
    }
}
