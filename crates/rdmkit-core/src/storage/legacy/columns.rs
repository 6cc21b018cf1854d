//! Name-based column access for the flat legacy tables (`eprint`, `document`, `file`).

use rusqlite::types::Value;
use tracing::debug;

use super::catalog::TableMap;
use crate::models::{Document, LegacyFile, LegacyRecord};

/// Storage class of a column; decides the `COALESCE` default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Text,
    Real,
}

impl ColumnKind {
    pub fn zero(self) -> &'static str {
        match self {
            ColumnKind::Int => "0",
            ColumnKind::Text => "''",
            ColumnKind::Real => "0.0",
        }
    }
}

/// Rust field types that can be filled from, and written to, a SQL value.
pub trait ColumnValue: Sized {
    const KIND: ColumnKind;
    fn from_value(value: Value) -> Self;
    fn to_value(&self) -> Value;
}

impl ColumnValue for i64 {
    const KIND: ColumnKind = ColumnKind::Int;

    fn from_value(value: Value) -> Self {
        match value {
            Value::Integer(n) => n,
            Value::Real(f) => f as i64,
            Value::Text(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }
}

impl ColumnValue for f64 {
    const KIND: ColumnKind = ColumnKind::Real;

    fn from_value(value: Value) -> Self {
        match value {
            Value::Integer(n) => n as f64,
            Value::Real(f) => f,
            Value::Text(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }
}

impl ColumnValue for String {
    const KIND: ColumnKind = ColumnKind::Text;

    fn from_value(value: Value) -> Self {
        match value {
            Value::Text(s) => s,
            Value::Integer(n) => n.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Blob(b) => String::from_utf8_lossy(&b).to_string(),
            Value::Null => String::new(),
        }
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

fn kind_of<T: ColumnValue>(_: &T) -> ColumnKind {
    T::KIND
}

/// Null-framed select expressions for the columns of `cols` that exist in `table`.
pub fn coalesce_columns(
    cols: Vec<(&'static str, ColumnKind)>,
    tables: &TableMap,
    table: &str,
) -> Vec<(&'static str, String)> {
    cols.into_iter()
        .filter(|(name, _)| tables.has_column(table, name))
        .map(|(name, kind)| {
            let quoted = quote_ident(name);
            (name, format!("COALESCE({quoted}, {}) AS {quoted}", kind.zero()))
        })
        .collect()
}

/// A struct whose fields map one-to-one onto columns of a table.
pub trait ColumnMapped: Default {
    /// Every mapped column with its storage class.
    fn columns() -> Vec<(&'static str, ColumnKind)>;
    /// Assign a column; returns false for columns the struct does not know.
    fn set_column(&mut self, name: &str, value: Value) -> bool;
    fn column_value(&self, name: &str) -> Option<Value>;

    /// `COALESCE(col, zero) AS col` for each mapped column present in `table`.
    fn select_list(tables: &TableMap, table: &str) -> Vec<(&'static str, String)> {
        coalesce_columns(Self::columns(), tables, table)
    }

    /// Build a value from a row produced by a query over `select_list` columns.
    fn from_row(names: &[&'static str], row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let mut out = Self::default();
        for (i, name) in names.iter().enumerate() {
            let value: Value = row.get(i)?;
            if !out.set_column(name, value) {
                debug!(column = *name, "unmapped column skipped");
            }
        }
        Ok(out)
    }
}

macro_rules! column_mapped {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl ColumnMapped for $ty {
            fn columns() -> Vec<(&'static str, ColumnKind)> {
                let probe = <$ty>::default();
                vec![$((stringify!($field), kind_of(&probe.$field))),*]
            }

            fn set_column(&mut self, name: &str, value: Value) -> bool {
                match name {
                    $(stringify!($field) => {
                        self.$field = ColumnValue::from_value(value);
                        true
                    })*
                    _ => false,
                }
            }

            fn column_value(&self, name: &str) -> Option<Value> {
                match name {
                    $(stringify!($field) => Some(self.$field.to_value()),)*
                    _ => None,
                }
            }
        }
    };
}

column_mapped!(LegacyRecord {
    eprintid,
    rev_number,
    eprint_status,
    userid,
    dir,
    datestamp_year,
    datestamp_month,
    datestamp_day,
    datestamp_hour,
    datestamp_minute,
    datestamp_second,
    lastmod_year,
    lastmod_month,
    lastmod_day,
    lastmod_hour,
    lastmod_minute,
    lastmod_second,
    status_changed_year,
    status_changed_month,
    status_changed_day,
    status_changed_hour,
    status_changed_minute,
    status_changed_second,
    metadata_visibility,
    title,
    ispublished,
    full_text_status,
    keywords,
    note,
    date_year,
    date_month,
    date_day,
    date_type,
    series,
    volume,
    number,
    publication,
    publisher,
    place_of_pub,
    edition,
    pagerange,
    pages,
    event_type,
    event_title,
    event_location,
    event_dates,
    id_number,
    refereed,
    isbn,
    issn,
    book_title,
    official_url,
    alt_url,
    rights,
    collection,
    reviewer,
    official_cit,
    monograph_type,
    suggestions,
    pres_type,
    succeeds,
    commentary,
    contact_email,
    latitude,
    longitude,
    department,
    output_media,
    num_pieces,
    composition_type,
    data_type,
    pedagogic_type,
    learning_level,
    completion_time,
    task_purpose,
    doi,
    pmc_id,
    pmid,
    parent_url,
    toc,
    interviewer,
    interviewdate,
    nonsubj_keywords,
    season,
    classification_code,
    patent_applicant,
    patent_number,
    patent_classification,
    institution,
    thesis_type,
    thesis_degree,
    thesis_degree_grantor,
    thesis_degree_date_year,
    thesis_degree_date_month,
    thesis_degree_date_day,
    thesis_submitted_date_year,
    thesis_submitted_date_month,
    thesis_submitted_date_day,
    thesis_defense_date_year,
    thesis_defense_date_month,
    thesis_defense_date_day,
    thesis_approved_date_year,
    thesis_approved_date_month,
    thesis_approved_date_day,
    thesis_public_date_year,
    thesis_public_date_month,
    thesis_public_date_day,
    thesis_author_email,
    hide_thesis_author_email,
    gradofc_approval_date_year,
    gradofc_approval_date_month,
    gradofc_approval_date_day,
    thesis_awards,
    review_status,
    copyright_statement,
    source,
    replacedby,
    item_issues_count,
    errata,
    coverage_dates,
    language,
});

// `type` and `abstract` are reserved words in Rust, so they are mapped by hand.
pub const RECORD_TYPE_COLUMN: &str = "type";
pub const RECORD_ABSTRACT_COLUMN: &str = "abstract";

column_mapped!(Document {
    docid,
    eprintid,
    pos,
    rev_number,
    format,
    formatdesc,
    language,
    security,
    license,
    main,
    date_embargo_year,
    date_embargo_month,
    date_embargo_day,
    content,
    placement,
    mime_type,
    media_duration,
    media_audio_codec,
    media_video_codec,
    media_width,
    media_height,
    media_aspect_ratio,
    media_sample_start,
    media_sample_stop,
});

column_mapped!(LegacyFile {
    fileid,
    datasetid,
    objectid,
    filename,
    mime_type,
    hash,
    hash_type,
    filesize,
    mtime_year,
    mtime_month,
    mtime_day,
    mtime_hour,
    mtime_minute,
    mtime_second,
});

/// Main-table columns including the two reserved-word columns.
pub fn record_columns() -> Vec<(&'static str, ColumnKind)> {
    let mut cols = LegacyRecord::columns();
    cols.push((RECORD_TYPE_COLUMN, ColumnKind::Text));
    cols.push((RECORD_ABSTRACT_COLUMN, ColumnKind::Text));
    cols
}

/// Assign a main-table column, including the reserved-word ones.
pub fn set_record_column(rec: &mut LegacyRecord, name: &str, value: Value) -> bool {
    match name {
        RECORD_TYPE_COLUMN => rec.record_type = String::from_value(value),
        RECORD_ABSTRACT_COLUMN => rec.abstract_text = String::from_value(value),
        _ => return rec.set_column(name, value),
    }
    true
}

pub fn record_column_value(rec: &LegacyRecord, name: &str) -> Option<Value> {
    match name {
        RECORD_TYPE_COLUMN => Some(rec.record_type.to_value()),
        RECORD_ABSTRACT_COLUMN => Some(rec.abstract_text.to_value()),
        _ => rec.column_value(name),
    }
}

/// Quote an identifier for SQLite (`type`, `abstract` and friends need it).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
