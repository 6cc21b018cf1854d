pub mod legacy;
pub mod record_store;

pub use legacy::LegacyDb;
pub use record_store::{sanitize_key, JsonDirStore, RecordStore};
