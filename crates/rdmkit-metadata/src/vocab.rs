//! Controlled-vocabulary lookups shared by the crosswalks.
//!
//! Built once per run from [`Config`] and read-only afterwards.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use rdmkit_core::Config;

static RESOURCE_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // legacy record types
        ("article", "publication-article"),
        ("book", "publication-book"),
        ("book_section", "publication-section"),
        ("conference_item", "conference-paper"),
        ("dataset", "dataset"),
        ("experiment", "publication-deliverable"),
        ("journal_issue", "publication-issue"),
        ("lab_notes", "labnotebook"),
        ("monograph", "publication-report"),
        ("oral_history", "publication-oralhistory"),
        ("patent", "publication-patent"),
        ("software", "software"),
        ("teaching_resource", "teachingresource"),
        ("thesis", "publication-thesis"),
        ("video", "video"),
        ("geospatial_resource", "other"),
        ("website", "other"),
        ("image", "other"),
        ("other", "other"),
        // CrossRef work types
        ("journal-article", "publication-article"),
        ("book-chapter", "publication-section"),
        ("proceedings-article", "publication-section"),
        ("posted-content", "publication-preprint"),
        ("report", "publication-report"),
        ("dissertation", "publication-thesis"),
        ("monograph-book", "publication-book"),
        // DataCite citeproc types
        ("article-journal", "publication-article"),
        ("paper-conference", "conference-paper"),
        ("chapter", "publication-section"),
    ])
});

/// Library of Congress relator codes.
static RELATOR_ROLES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("aft", "other"),
        ("ant", "other"),
        ("aqt", "other"),
        ("aus", "screenwriter"),
        ("aut", "author"),
        ("clb", "collaborator"),
        ("com", "compiler"),
        ("ctb", "contributor"),
        ("drt", "director"),
        ("edt", "editor"),
        ("nrt", "narrator"),
        ("oth", "other"),
        ("pbd", "publishing_directory"),
        ("prg", "programmer"),
        ("rev", "reviewer"),
        ("rtm", "research_team"),
        ("spk", "speaker"),
        ("tch", "teacher"),
        ("trl", "translator"),
        ("prc", "contact_person"),
        ("dtc", "data_collector"),
        ("dtm", "data_manager"),
        ("dst", "distributor"),
        ("his", "hosting_institution"),
        ("pro", "producer"),
        ("pdr", "project_manager"),
        ("res", "researcher"),
        ("cph", "rights_holder"),
        ("spn", "sponsor"),
        ("ive", "interviewee"),
        ("ivr", "interviewer"),
    ])
});

/// Library-local role URIs outside the relator list.
static LOCAL_ROLES: [(&str, &str); 2] = [
    ("http://coda.library.caltech.edu/ARA", "author_section"),
    ("http://coda.library.caltech.edu/AST", "astronaut"),
];

/// Legacy per-role person id fields that carry the local people id.
const CLPID_SCHEMES: [&str; 7] = [
    "id",
    "author_id",
    "creator_id",
    "contributor_id",
    "editor_id",
    "thesis_advisor_id",
    "thesis_committee_id",
];

pub const FALLBACK_ROLE: &str = "contributor";

#[derive(Debug, Clone, Default)]
pub struct Vocabularies {
    resource_types: BTreeMap<String, String>,
    contributor_types: BTreeMap<String, String>,
    doi_prefix_publishers: BTreeMap<String, String>,
    issn_journals: BTreeMap<String, String>,
    issn_publishers: BTreeMap<String, String>,
}

impl Vocabularies {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            resource_types: cfg.resource_types.clone(),
            contributor_types: cfg.contributor_types.clone(),
            doi_prefix_publishers: cfg.doi_prefix_publishers.clone(),
            issn_journals: cfg.issn_journals.clone(),
            issn_publishers: cfg.issn_publishers.clone(),
        }
    }

    pub fn with_resource_type(mut self, from: &str, to: &str) -> Self {
        self.resource_types.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_issn_journal(mut self, issn: &str, journal: &str) -> Self {
        self.issn_journals.insert(issn.to_string(), journal.to_string());
        self
    }

    pub fn with_issn_publisher(mut self, issn: &str, publisher: &str) -> Self {
        self.issn_publishers.insert(issn.to_string(), publisher.to_string());
        self
    }

    pub fn with_doi_prefix_publisher(mut self, prefix: &str, publisher: &str) -> Self {
        self.doi_prefix_publishers.insert(prefix.to_string(), publisher.to_string());
        self
    }

    /// Overrides first, then the built-in table; unknown tags pass through.
    pub fn map_resource_type(&self, tag: &str) -> String {
        let tag = tag.trim();
        if let Some(v) = self.resource_types.get(tag) {
            return v.clone();
        }
        let lower = tag.to_lowercase();
        if let Some(v) = self.resource_types.get(&lower) {
            return v.clone();
        }
        RESOURCE_TYPES
            .get(lower.as_str())
            .map(|v| v.to_string())
            .unwrap_or_else(|| tag.to_string())
    }

    /// Role URI (usually a LoC relator link) to a short role id.
    pub fn map_contributor_role(&self, uri: &str) -> String {
        let uri = uri.trim();
        if let Some(v) = self.contributor_types.get(uri) {
            return v.clone();
        }
        if let Some((_, v)) = LOCAL_ROLES.iter().find(|(k, _)| *k == uri) {
            return v.to_string();
        }
        let code = uri.rsplit('/').next().unwrap_or(uri).to_lowercase();
        if uri.contains("loc.gov") || uri.len() == 3 {
            if let Some(v) = RELATOR_ROLES.get(code.as_str()) {
                return v.to_string();
            }
        }
        if RELATOR_ROLES.values().any(|v| *v == code) {
            return code;
        }
        FALLBACK_ROLE.to_string()
    }

    /// Prefer the journal name registered for any of `issns`.
    pub fn normalize_journal_name(&self, name: &str, issns: &[String]) -> String {
        issns
            .iter()
            .find_map(|issn| self.issn_journals.get(issn.trim()))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Prefer the publisher registered for an ISSN, then for the DOI prefix.
    pub fn normalize_publisher_name(&self, name: &str, issns: &[String], doi_prefix: &str) -> String {
        if let Some(p) = issns.iter().find_map(|issn| self.issn_publishers.get(issn.trim())) {
            return p.clone();
        }
        if let Some(p) = self.doi_prefix_publishers.get(doi_prefix.trim()) {
            return p.clone();
        }
        name.to_string()
    }
}

/// Legacy person-id scheme to the modern identifier scheme.
pub fn map_identifier_scheme(scheme: &str) -> String {
    if CLPID_SCHEMES.contains(&scheme) {
        "clpid".to_string()
    } else {
        scheme.to_string()
    }
}

/// Built-in inverse of the resource-type table used when writing legacy records.
pub fn legacy_record_type(resource_type: &str) -> String {
    let mapped = match resource_type {
        "publication-article" => "article",
        "publication-section" => "book_section",
        "publication-report" | "publication-preprint" | "publication-technicalnote" => "monograph",
        "publication-book" | "publication-conferenceproceeding" => "book",
        "publication-patent" => "patent",
        "publication-thesis" => "thesis",
        "publication-oralhistory" => "oral_history",
        "publication-deliverable" => "experiment",
        "publication-issue" => "journal_issue",
        "labnotebook" => "lab_notes",
        t if t.starts_with("conference-") => "conference_item",
        t if t.starts_with("teachingresource") => "teaching_resource",
        other => return other.replace('-', "_"),
    };
    mapped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_types_prefer_overrides() {
        let v = Vocabularies::default().with_resource_type("article", "publication-preprint");
        assert_eq!(v.map_resource_type("article"), "publication-preprint");
        assert_eq!(v.map_resource_type("journal-article"), "publication-article");
        assert_eq!(v.map_resource_type("book-chapter"), "publication-section");
        assert_eq!(v.map_resource_type("mystery-type"), "mystery-type");
    }

    #[test]
    fn relator_uris_map_to_roles() {
        let v = Vocabularies::default();
        assert_eq!(v.map_contributor_role("http://www.loc.gov/loc.terms/relators/EDT"), "editor");
        assert_eq!(v.map_contributor_role("https://www.loc.gov/loc.terms/relators/ivr"), "interviewer");
        assert_eq!(v.map_contributor_role("http://coda.library.caltech.edu/AST"), "astronaut");
        assert_eq!(v.map_contributor_role("translator"), "translator");
        assert_eq!(v.map_contributor_role("http://example.org/unknown"), "contributor");
        assert_eq!(v.map_contributor_role(""), "contributor");
    }

    #[test]
    fn identifier_schemes() {
        assert_eq!(map_identifier_scheme("author_id"), "clpid");
        assert_eq!(map_identifier_scheme("thesis_advisor_id"), "clpid");
        assert_eq!(map_identifier_scheme("orcid"), "orcid");
        assert_eq!(map_identifier_scheme("isni"), "isni");
    }

    #[test]
    fn names_follow_issn_then_prefix() {
        let v = Vocabularies::default()
            .with_issn_journal("1234-5678", "Journal of Foo")
            .with_issn_publisher("1234-5678", "Foo Society")
            .with_doi_prefix_publisher("10.1029", "AGU");
        let issns = vec!["0000-0000".to_string(), "1234-5678".to_string()];
        assert_eq!(v.normalize_journal_name("J. Foo", &issns), "Journal of Foo");
        assert_eq!(v.normalize_publisher_name("Wiley", &issns, "10.1029"), "Foo Society");
        assert_eq!(v.normalize_publisher_name("Wiley", &[], "10.1029"), "AGU");
        assert_eq!(v.normalize_publisher_name("Wiley", &[], "10.9999"), "Wiley");
    }

    #[test]
    fn reverse_types() {
        assert_eq!(legacy_record_type("publication-article"), "article");
        assert_eq!(legacy_record_type("conference-poster"), "conference_item");
        assert_eq!(legacy_record_type("teachingresource-lecturenotes"), "teaching_resource");
        assert_eq!(legacy_record_type("image-photo"), "image_photo");
    }
}
