use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Title map keyed by language, e.g. `{"en": "Article"}`.
pub type LangMap = BTreeMap<String, String>;

/// Persistent identifier attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentIdentifier {
    pub identifier: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Owner {
    pub user: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentAccess {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owned_by: Vec<Owner>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parent {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<ParentAccess>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Embargo {
    pub active: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub until: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordAccess {
    /// `public` or `restricted`.
    pub record: String,
    pub files: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embargo: Option<Embargo>,
}

impl Default for RecordAccess {
    fn default() -> Self {
        Self {
            record: "restricted".to_string(),
            files: "restricted".to_string(),
            embargo: None,
        }
    }
}

// ─── Metadata building blocks ──────────────────────────────

/// Reference into a controlled vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeRef {
    pub id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub title: LangMap,
}

impl TypeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: LangMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Identifier {
    pub scheme: String,
    pub identifier: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl Identifier {
    pub fn new(scheme: &str, identifier: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            identifier: identifier.to_string(),
            name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonOrOrg {
    /// `personal` or `organizational`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub given_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub family_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,
}

pub const PERSONAL: &str = "personal";
pub const ORGANIZATIONAL: &str = "organizational";

impl PersonOrOrg {
    pub fn person(family: &str, given: &str) -> Self {
        let name = match (family.is_empty(), given.is_empty()) {
            (false, false) => format!("{family}, {given}"),
            (false, true) => family.to_string(),
            _ => given.to_string(),
        };
        Self {
            kind: PERSONAL.to_string(),
            given_name: given.to_string(),
            family_name: family.to_string(),
            name,
            identifiers: Vec::new(),
        }
    }

    pub fn organization(name: &str) -> Self {
        Self {
            kind: ORGANIZATIONAL.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn is_personal(&self) -> bool {
        self.kind == PERSONAL
    }

    pub fn identifier(&self, scheme: &str) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|i| i.scheme == scheme)
            .map(|i| i.identifier.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Affiliation {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Creator {
    pub person_or_org: PersonOrOrg,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<TypeRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affiliations: Vec<Affiliation>,
}

impl Creator {
    pub fn new(person_or_org: PersonOrOrg, role: Option<&str>) -> Self {
        Self {
            person_or_org,
            role: role.map(TypeRef::new),
            affiliations: Vec::new(),
        }
    }

    pub fn role_id(&self) -> &str {
        self.role.as_ref().map(|r| r.id.as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleDetail {
    pub title: String,
    #[serde(rename = "type")]
    pub title_type: TypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<TypeRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Description {
    pub description: String,
    #[serde(rename = "type")]
    pub description_type: TypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<TypeRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub subject: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateType {
    pub date: String,
    #[serde(rename = "type")]
    pub date_type: TypeRef,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedIdentifier {
    pub identifier: String,
    pub scheme: String,
    pub relation_type: TypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<TypeRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Right {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub title: LangMap,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub description: LangMap,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Funder {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scheme: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Award {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scheme: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub title: LangMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Funding {
    pub funder: Funder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award: Option<Award>,
}

/// The `metadata` block of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub resource_type: TypeRef,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub creators: Vec<Creator>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<Creator>,
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_titles: Vec<TitleDetail>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_descriptions: Vec<Description>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publication_date: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Subject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<DateType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<TypeRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_identifiers: Vec<RelatedIdentifier>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rights: Vec<Right>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub funding: Vec<Funding>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl Metadata {
    pub fn identifier(&self, scheme: &str) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|i| i.scheme == scheme && !i.identifier.is_empty())
            .map(|i| i.identifier.as_str())
    }

    /// Add an identifier unless the same scheme/value pair is present.
    pub fn add_identifier(&mut self, scheme: &str, identifier: &str) {
        let identifier = identifier.trim();
        if identifier.is_empty()
            || self
                .identifiers
                .iter()
                .any(|i| i.scheme == scheme && i.identifier == identifier)
        {
            return;
        }
        self.identifiers.push(Identifier::new(scheme, identifier));
    }

    pub fn add_date(&mut self, date: &str, kind: &str, description: &str) {
        if date.is_empty() {
            return;
        }
        self.dates.push(DateType {
            date: date.to_string(),
            date_type: TypeRef::new(kind),
            description: description.to_string(),
        });
    }
}

// ─── Files ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEntry {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mimetype: String,
    /// `<algo>:<hex>`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub checksum: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Files {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_preview: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub entries: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tombstone {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_by: Option<Owner>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub removal_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub citation_text: String,
    pub is_visible: bool,
}

// ─── Record ────────────────────────────────────────────────

/// A record in the Modern (Invenio-RDM style) repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModernRecord {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "pids", skip_serializing_if = "BTreeMap::is_empty")]
    pub external_pids: BTreeMap<String, PersistentIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(rename = "access")]
    pub record_access: RecordAccess,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub custom_fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Files>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tombstone: Option<Tombstone>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated: String,
}

impl ModernRecord {
    /// Register a PID; blank identifiers are ignored.
    pub fn set_pid(&mut self, scheme: &str, identifier: &str, provider: &str) {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return;
        }
        self.external_pids.insert(
            scheme.to_string(),
            PersistentIdentifier {
                identifier: identifier.to_string(),
                provider: provider.to_string(),
                client: String::new(),
            },
        );
    }

    pub fn pid(&self, scheme: &str) -> Option<&str> {
        self.external_pids
            .get(scheme)
            .map(|p| p.identifier.as_str())
            .filter(|s| !s.is_empty())
    }

    /// DOI from the PIDs, falling back to the identifier list.
    pub fn doi(&self) -> Option<&str> {
        self.pid("doi").or_else(|| self.metadata.identifier("doi"))
    }

    /// String custom field, if present and non-empty.
    pub fn custom_str(&self, key: &str) -> Option<&str> {
        self.custom_fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn custom_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.custom_fields.get(key).and_then(Value::as_object)
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.parent
            .as_ref()
            .and_then(|p| p.access.as_ref())
            .and_then(|a| a.owned_by.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_invenio_keys() {
        let mut rec = ModernRecord {
            id: "abc12-3def4".into(),
            ..ModernRecord::default()
        };
        rec.set_pid("doi", "10.1/x", "external");
        rec.metadata.title = "Foo".into();
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["pids"]["doi"]["identifier"], "10.1/x");
        assert_eq!(v["access"]["record"], "restricted");
        assert_eq!(v["metadata"]["title"], "Foo");
    }

    #[test]
    fn blank_pid_ignored() {
        let mut rec = ModernRecord::default();
        rec.set_pid("issn", "  ", "");
        assert!(rec.external_pids.is_empty());
    }

    #[test]
    fn parses_rdm_response() {
        let body = r#"{
            "id": "kx7rs-abc12",
            "pids": {"doi": {"identifier": "10.22002/D1.1", "provider": "datacite"}},
            "parent": {"id": "p1", "access": {"owned_by": [{"user": 5}]}},
            "access": {"record": "public", "files": "public"},
            "metadata": {
                "resource_type": {"id": "publication-article", "title": {"en": "Journal Article"}},
                "title": "Example",
                "creators": [{"person_or_org": {"type": "personal", "family_name": "Doe", "given_name": "Jane"}}],
                "publication_date": "2022-01-01"
            },
            "custom_fields": {"journal:journal": {"title": "Nature"}},
            "created": "2022-01-01T00:00:00+00:00"
        }"#;
        let rec: ModernRecord = serde_json::from_str(body).unwrap();
        assert_eq!(rec.doi(), Some("10.22002/D1.1"));
        assert_eq!(rec.owner().map(|o| o.user), Some(5));
        assert_eq!(rec.metadata.creators[0].person_or_org.family_name, "Doe");
        assert!(rec.custom_object("journal:journal").is_some());
    }

    #[test]
    fn person_display_name() {
        assert_eq!(PersonOrOrg::person("Doe", "Jane").name, "Doe, Jane");
        assert_eq!(PersonOrOrg::person("Doe", "").name, "Doe");
    }
}
