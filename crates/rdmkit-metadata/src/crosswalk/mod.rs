//! Schema-to-schema translations.
//!
//! Every crosswalk is a pure function returning the translated record
//! together with the non-fatal problems it noticed. Missing source fields are
//! never errors; only a missing primary identifier on the outbound side is.

mod citation;
mod crossref;
mod datacite;
mod legacy_to_modern;
mod modern_to_legacy;

use std::collections::HashMap;

use rdmkit_core::Config;

use crate::vocab::Vocabularies;

pub use citation::{legacy_to_citation, modern_to_citation};
pub use crossref::{crossref_to_modern, funder_ror_keys, pick_publication_date};
pub use datacite::datacite_to_modern;
pub use legacy_to_modern::{legacy_to_modern, normalize_pmcids};
pub use modern_to_legacy::modern_to_legacy;

/// Funder DOI suffix → ROR id (`None` once a lookup came back empty).
///
/// Filled by the caller for the length of one run and read by the CrossRef crosswalk.
pub type RorCache = HashMap<String, Option<String>>;

/// Crosswalk output plus the warnings gathered along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Crosswalked<T> {
    pub record: T,
    pub warnings: Vec<String>,
}

impl<T> Crosswalked<T> {
    pub fn new(record: T, warnings: Vec<String>) -> Self {
        Self { record, warnings }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Crosswalked<U> {
        Crosswalked {
            record: f(self.record),
            warnings: self.warnings,
        }
    }
}

/// Run-wide settings every crosswalk reads from.
#[derive(Debug, Clone, Default)]
pub struct CrosswalkContext {
    pub vocab: Vocabularies,
    /// Collection name used for record ids when the source carries none.
    pub collection: String,
    /// Modern Repo base URL, used to build record links.
    pub rdm_url: String,
}

impl CrosswalkContext {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            vocab: Vocabularies::from_config(cfg),
            collection: cfg.collection(),
            rdm_url: cfg.rdm_url.clone(),
        }
    }
}
