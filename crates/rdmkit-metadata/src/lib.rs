//! rdmkit metadata: governed HTTP clients for the Modern Repo, OAI-PMH,
//! CrossRef, DataCite and ROR, vocabulary maps, crosswalks between record
//! schemas, and the harvest driver.

pub mod crosswalk;
pub mod error;
pub mod harvest;
pub mod http;
pub mod identifiers;
pub mod sources;
pub mod vocab;

pub use crosswalk::{CrosswalkContext, Crosswalked, RorCache};
pub use error::{ErrorKind, MetadataError, Result};
pub use http::{GovernedClient, RateGovernor};
pub use vocab::Vocabularies;

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = concat!("rdmkit/", env!("CARGO_PKG_VERSION"));
