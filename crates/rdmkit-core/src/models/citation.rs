use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A person or organisation named on a citation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agent {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub family_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lived_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub non_dropping_particle: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dropping_particle: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub suffix: String,
    /// Organisation (or otherwise unstructured) name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub literal: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub orcid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub isni: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub clpid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ror: String,
}

impl Agent {
    pub fn person(family: &str, given: &str) -> Self {
        Self {
            family_name: family.to_string(),
            lived_name: given.to_string(),
            ..Self::default()
        }
    }

    pub fn organization(name: &str) -> Self {
        Self {
            literal: name.to_string(),
            ..Self::default()
        }
    }

    pub fn is_organization(&self) -> bool {
        self.family_name.is_empty() && self.lived_name.is_empty() && !self.literal.is_empty()
    }
}

/// A dated event in both parsed and raw form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateObject {
    /// `[[y]]`, `[[y, m]]` or `[[y, m, d]]`.
    #[serde(rename = "date-parts")]
    pub date_parts: Vec<Vec<i64>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw: String,
}

/// Flattened, rendering-oriented bibliographic record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Citation {
    pub id: String,
    pub collection: String,
    pub collection_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cite_using_url: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternate_title: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<Agent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub editor: Vec<Agent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reviewer: Vec<Agent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub translator: Vec<Agent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub thesis_advisor: Vec<Agent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub thesis_committee: Vec<Agent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contributor: Vec<Agent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub local_group: Vec<Agent>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dates: BTreeMap<String, DateObject>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub place_of_publication: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publication: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publication_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub series: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub series_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub volume: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issue: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pages: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub edition: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub isbn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pmcid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doi: String,
    #[serde(rename = "abstract", skip_serializing_if = "String::is_empty")]
    pub abstract_text: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_degree: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_degree_grantor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_department: String,
}

impl Citation {
    /// Every agent across the role partitions, in partition order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.author
            .iter()
            .chain(&self.editor)
            .chain(&self.reviewer)
            .chain(&self.translator)
            .chain(&self.thesis_advisor)
            .chain(&self.thesis_committee)
            .chain(&self.contributor)
    }

    /// A citation needs its composite id and both halves of it.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() || self.collection.is_empty() || self.collection_id.is_empty() {
            return Err(CoreError::Validation(format!(
                "citation requires id, collection and collection_id (got {:?})",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_identity() {
        let mut c = Citation::default();
        assert!(c.validate().is_err());
        c.id = "authors:abc".into();
        c.collection = "authors".into();
        c.collection_id = "abc".into();
        assert!(c.validate().is_ok());
    }

    #[test]
    fn date_parts_serialize_hyphenated() {
        let mut c = Citation::default();
        c.dates.insert(
            "issued".into(),
            DateObject {
                date_parts: vec![vec![2001, 2]],
                raw: "2001-02".into(),
            },
        );
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["dates"]["issued"]["date-parts"][0][1], 2);
    }
}
