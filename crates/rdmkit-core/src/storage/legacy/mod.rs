//! Legacy (EPrints-style) relational store: catalog discovery, record
//! reconstruction, the inverse writer and id enumeration.

pub mod catalog;
pub mod columns;
mod connection;
pub mod pairtree;
pub mod queries;
mod reader;
pub mod schema;
pub mod sublist;
mod writer;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use catalog::TableMap;
pub use connection::LegacyDb;
pub use pairtree::{dir_value, pairtree};
pub use queries::DATASETS;
pub use reader::read_documents;
pub use schema::create_tables;
