use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{MetadataError, Result};

/// DOI registrant arXiv mints its DataCite DOIs under.
pub const ARXIV_DOI_PREFIX: &str = "10.48550";

// YYMM.NNNNN with optional version
static NEW_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}\.\d{4,5})(?:v\d+)?$").unwrap());

// category/YYMMNNN
static OLD_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z\-]+(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivId {
    pub id: String,
}

impl ArxivId {
    /// Accepts `arXiv:2312.07215`, `2312.07215v2`, abs/pdf links and old-style ids.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let stripped = [
            "https://arxiv.org/abs/",
            "http://arxiv.org/abs/",
            "https://arxiv.org/pdf/",
            "http://arxiv.org/pdf/",
            "arXiv:",
            "arxiv:",
        ]
        .iter()
        .find_map(|p| input.strip_prefix(p))
        .unwrap_or(input)
        .trim_end_matches(".pdf");

        let caps = NEW_FORMAT
            .captures(stripped)
            .or_else(|| OLD_FORMAT.captures(stripped))
            .ok_or_else(|| MetadataError::InvalidDoi(format!("not an arXiv id: {input}")))?;
        Ok(Self {
            id: caps[1].to_string(),
        })
    }

    /// `10.48550/arXiv.<id>`
    pub fn doi(&self) -> String {
        format!("{ARXIV_DOI_PREFIX}/arXiv.{}", self.id)
    }
}

/// True when `s` looks like an arXiv id rather than a DOI.
pub fn is_arxiv_id(s: &str) -> bool {
    let s = s.trim();
    (s.starts_with("arXiv:") || s.starts_with("arxiv:") || s.contains("arxiv.org/"))
        && ArxivId::parse(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_to_datacite_doi() {
        let id = ArxivId::parse("arXiv:2312.07215").unwrap();
        assert_eq!(id.id, "2312.07215");
        assert_eq!(id.doi(), "10.48550/arXiv.2312.07215");
    }

    #[test]
    fn strips_versions_and_links() {
        assert_eq!(ArxivId::parse("2104.02480v3").unwrap().id, "2104.02480");
        assert_eq!(ArxivId::parse("https://arxiv.org/pdf/2104.02480.pdf").unwrap().id, "2104.02480");
        assert_eq!(ArxivId::parse("hep-th/9901001").unwrap().id, "hep-th/9901001");
    }

    #[test]
    fn detection() {
        assert!(is_arxiv_id("arXiv:2312.07215"));
        assert!(!is_arxiv_id("10.1021/acsami.7b15651"));
        assert!(!is_arxiv_id("2312.07215"));
    }
}
