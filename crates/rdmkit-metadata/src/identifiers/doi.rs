use serde::{Deserialize, Serialize};

use crate::error::{MetadataError, Result};

const RESOLVER_PREFIXES: [&str; 4] = [
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doi {
    pub raw: String,
    /// Bare `10.xxxx/suffix`, case preserved.
    pub doi: String,
    pub url: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let stripped = RESOLVER_PREFIXES
            .iter()
            .find_map(|p| input.strip_prefix(p))
            .or_else(|| input.strip_prefix("doi:").map(str::trim_start))
            .or_else(|| input.strip_prefix("DOI:").map(str::trim_start))
            .unwrap_or(input);

        if !stripped.starts_with("10.") {
            return Err(MetadataError::InvalidDoi(input.to_string()));
        }
        let (_, suffix) = stripped
            .split_once('/')
            .ok_or_else(|| MetadataError::InvalidDoi(input.to_string()))?;
        if suffix.is_empty() {
            return Err(MetadataError::InvalidDoi(input.to_string()));
        }

        Ok(Self {
            raw: input.to_string(),
            doi: stripped.to_string(),
            url: format!("https://doi.org/{stripped}"),
        })
    }

    pub fn prefix(&self) -> &str {
        self.doi.split_once('/').map(|(p, _)| p).unwrap_or(&self.doi)
    }

    pub fn suffix(&self) -> &str {
        self.doi.split_once('/').map(|(_, s)| s).unwrap_or_default()
    }

    /// Case-insensitive comparison; DOIs are not case sensitive.
    pub fn same_as(&self, other: &str) -> bool {
        Doi::parse(other).is_ok_and(|o| o.doi.eq_ignore_ascii_case(&self.doi))
    }
}

fn is_link(s: &str) -> bool {
    let lower = s.get(..6).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http:") || lower.starts_with("https:")
}

/// Drop leading `http(s)://host/` layers from a DOI link, decoding each one,
/// until what is left is no longer a link. Anything that is not a link comes
/// back unchanged, so the result is a fixed point.
pub fn link_to_doi(s: &str) -> String {
    let mut current = s.to_string();
    while is_link(&current) {
        let rest = current.split_once("://").map(|(_, r)| r).unwrap_or(&current);
        let path = rest.split_once('/').map(|(_, p)| p).unwrap_or_default();
        let path = path.split(['?', '#']).next().unwrap_or_default();
        current = urlencoding::decode(path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| path.to_string());
    }
    current
}

/// Registrant prefix of a DOI or DOI link, e.g. `10.1029`.
pub fn doi_prefix(s: &str) -> Result<String> {
    let doi = link_to_doi(s.trim());
    match doi.split_once('/') {
        Some((prefix, _)) => Ok(prefix.to_string()),
        None => Err(MetadataError::InvalidDoi(format!("cannot determine prefix for {s:?}"))),
    }
}
