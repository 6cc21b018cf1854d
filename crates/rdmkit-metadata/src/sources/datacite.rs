use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MetadataError, Result};
use crate::http::GovernedClient;
use crate::identifiers::{is_arxiv_id, ArxivId, Doi};
use crate::USER_AGENT;

pub const DATACITE_API: &str = "https://api.datacite.org";

pub struct DataCiteClient {
    client: GovernedClient,
    base_url: String,
}

impl DataCiteClient {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(DATACITE_API, GovernedClient::new(USER_AGENT)?))
    }

    pub fn with_client(base_url: &str, client: GovernedClient) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /dois/{doi}`. An arXiv id is looked up under its `10.48550` DOI.
    pub async fn get_object(&self, doi_or_arxiv: &str) -> Result<DataCiteObject> {
        let doi = resolve_doi(doi_or_arxiv)?;
        let url = format!("{}/dois/{}", self.base_url, doi);
        let val: Value = self.client.get_json(&url).await?;
        DataCiteObject::from_json(val)
    }
}

/// DOI to query DataCite with; arXiv ids map onto the arXiv DOI prefix.
pub fn resolve_doi(input: &str) -> Result<String> {
    if is_arxiv_id(input) {
        return Ok(ArxivId::parse(input)?.doi());
    }
    Ok(Doi::parse(input)?.doi)
}

// ─── DataCiteObject ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataCitePerson {
    pub name: String,
    pub given: String,
    pub family: String,
    /// `Personal` or `Organizational` when the deposit says so.
    pub name_type: String,
    pub orcid: String,
    pub ror: String,
    pub affiliations: Vec<String>,
    pub contributor_type: String,
}

impl DataCitePerson {
    pub fn is_organization(&self) -> bool {
        self.name_type.eq_ignore_ascii_case("Organizational")
            || (self.family.is_empty() && self.given.is_empty() && !self.name.contains(','))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataCiteFunder {
    pub name: String,
    pub identifier: String,
    pub identifier_type: String,
    pub award_number: String,
    pub award_title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataCiteRight {
    pub rights: String,
    pub uri: String,
    pub identifier: String,
}

/// A `/dois/{doi}` JSON:API document, read through `data.attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataCiteObject {
    document: Value,
}

fn text(v: &Value) -> Option<String> {
    v.as_str()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| v.as_i64().map(|n| n.to_string()))
}

fn array(v: &Value) -> &[Value] {
    v.as_array().map(Vec::as_slice).unwrap_or_default()
}

fn name_identifier(person: &Value, scheme: &str) -> String {
    array(&person["nameIdentifiers"])
        .iter()
        .find(|id| {
            id["nameIdentifierScheme"]
                .as_str()
                .is_some_and(|s| s.eq_ignore_ascii_case(scheme))
        })
        .and_then(|id| text(&id["nameIdentifier"]))
        .map(|id| {
            id.trim_start_matches("https://orcid.org/")
                .trim_start_matches("http://orcid.org/")
                .to_string()
        })
        .unwrap_or_default()
}

fn person(v: &Value) -> DataCitePerson {
    let affiliations = array(&v["affiliation"])
        .iter()
        .filter_map(|a| text(a).or_else(|| text(&a["name"])))
        .collect();
    DataCitePerson {
        name: text(&v["name"]).unwrap_or_default(),
        given: text(&v["givenName"]).unwrap_or_default(),
        family: text(&v["familyName"]).unwrap_or_default(),
        name_type: text(&v["nameType"]).unwrap_or_default(),
        orcid: name_identifier(v, "ORCID"),
        ror: name_identifier(v, "ROR"),
        affiliations,
        contributor_type: text(&v["contributorType"]).unwrap_or_default(),
    }
}

impl DataCiteObject {
    pub fn from_json(document: Value) -> Result<Self> {
        if !document["data"]["attributes"].is_object() {
            return Err(MetadataError::Parse("DataCite response has no data.attributes".to_string()));
        }
        Ok(Self { document })
    }

    pub fn raw(&self) -> &Value {
        &self.document
    }

    fn attr(&self, key: &str) -> &Value {
        &self.document["data"]["attributes"][key]
    }

    pub fn resource_type(&self) -> Option<String> {
        text(&self.attr("types")["citeproc"])
            .or_else(|| text(&self.attr("types")["resourceTypeGeneral"]).map(|s| s.to_lowercase()))
    }

    pub fn doi(&self) -> Option<String> {
        text(self.attr("doi")).or_else(|| text(&self.document["data"]["id"]))
    }

    /// `identifiers[]` as `(type, value)` pairs.
    pub fn identifiers(&self) -> Vec<(String, String)> {
        array(self.attr("identifiers"))
            .iter()
            .filter_map(|i| {
                Some((
                    text(&i["identifierType"]).unwrap_or_default(),
                    text(&i["identifier"])?,
                ))
            })
            .collect()
    }

    /// Untyped title first, then subtitles and alternates.
    pub fn titles(&self) -> Vec<String> {
        let titles = array(self.attr("titles"));
        let primary = titles.iter().filter(|t| t["titleType"].is_null());
        let rest = titles.iter().filter(|t| !t["titleType"].is_null());
        primary.chain(rest).filter_map(|t| text(&t["title"])).collect()
    }

    pub fn abstract_text(&self) -> Option<String> {
        array(self.attr("descriptions"))
            .iter()
            .find(|d| d["descriptionType"].as_str() == Some("Abstract"))
            .and_then(|d| text(&d["description"]))
    }

    /// Publisher as a plain string or `{"name": ..}` object.
    pub fn publisher(&self) -> Option<String> {
        let p = self.attr("publisher");
        text(p).or_else(|| text(&p["name"]))
    }

    fn published_in(&self) -> Option<&Value> {
        array(self.attr("relatedItems"))
            .iter()
            .find(|i| i["relationType"].as_str() == Some("IsPublishedIn"))
    }

    pub fn publication(&self) -> Option<String> {
        let item = self.published_in()?;
        array(&item["titles"]).iter().find_map(|t| text(&t["title"]))
    }

    pub fn volume(&self) -> Option<String> {
        self.published_in().and_then(|i| text(&i["volume"]))
    }

    pub fn issue(&self) -> Option<String> {
        self.published_in().and_then(|i| text(&i["issue"]))
    }

    /// `first-last`, or `first-first` when only the first page is known.
    pub fn pages(&self) -> Option<String> {
        let item = self.published_in()?;
        let first = text(&item["firstPage"])?;
        let last = text(&item["lastPage"]).unwrap_or_else(|| first.clone());
        Some(format!("{first}-{last}"))
    }

    fn related(&self, kind: &str) -> Vec<String> {
        array(self.attr("relatedIdentifiers"))
            .iter()
            .filter(|r| r["relatedIdentifierType"].as_str() == Some(kind))
            .filter_map(|r| text(&r["relatedIdentifier"]))
            .collect()
    }

    pub fn isbns(&self) -> Vec<String> {
        self.related("ISBN")
    }

    pub fn issns(&self) -> Vec<String> {
        self.related("ISSN")
    }

    pub fn funders(&self) -> Vec<DataCiteFunder> {
        array(self.attr("fundingReferences"))
            .iter()
            .filter_map(|f| {
                Some(DataCiteFunder {
                    name: text(&f["funderName"])?,
                    identifier: text(&f["funderIdentifier"]).unwrap_or_default(),
                    identifier_type: text(&f["funderIdentifierType"]).unwrap_or_default(),
                    award_number: text(&f["awardNumber"]).unwrap_or_default(),
                    award_title: text(&f["awardTitle"]).unwrap_or_default(),
                })
            })
            .collect()
    }

    pub fn creators(&self) -> Vec<DataCitePerson> {
        array(self.attr("creators")).iter().map(person).collect()
    }

    pub fn contributors(&self) -> Vec<DataCitePerson> {
        array(self.attr("contributors")).iter().map(person).collect()
    }

    pub fn rights(&self) -> Vec<DataCiteRight> {
        array(self.attr("rightsList"))
            .iter()
            .map(|r| DataCiteRight {
                rights: text(&r["rights"]).unwrap_or_default(),
                uri: text(&r["rightsUri"]).unwrap_or_default(),
                identifier: text(&r["rightsIdentifier"]).unwrap_or_default(),
            })
            .filter(|r| !r.rights.is_empty() || !r.uri.is_empty())
            .collect()
    }

    pub fn subjects(&self) -> Vec<String> {
        array(self.attr("subjects"))
            .iter()
            .filter_map(|s| text(&s["subject"]))
            .collect()
    }

    /// First date of the given `dateType`.
    pub fn date(&self, date_type: &str) -> Option<String> {
        array(self.attr("dates"))
            .iter()
            .find(|d| d["dateType"].as_str() == Some(date_type))
            .and_then(|d| text(&d["date"]))
    }

    pub fn issued(&self) -> Option<String> {
        self.date("Issued")
            .or_else(|| text(self.attr("publicationYear")))
    }

    pub fn available(&self) -> Option<String> {
        self.date("Available")
    }

    pub fn accepted(&self) -> Option<String> {
        self.date("Accepted")
    }

    pub fn approved(&self) -> Option<String> {
        self.date("Approved")
    }

    pub fn url(&self) -> Option<String> {
        text(self.attr("url"))
    }
}
