//! Clients for the services records are fetched from.

pub mod crossref;
pub mod datacite;
pub mod oai;
pub mod rdm;
pub mod ror;

pub use crossref::{CrossRefClient, CrossRefWork};
pub use datacite::{DataCiteClient, DataCiteObject};
pub use oai::OaiClient;
pub use rdm::RdmClient;
pub use ror::RorClient;
