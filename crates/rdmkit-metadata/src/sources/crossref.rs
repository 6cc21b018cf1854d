use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MetadataError, Result};
use crate::http::GovernedClient;
use crate::identifiers::doi::Doi;
use crate::USER_AGENT;

pub const CROSSREF_API: &str = "https://api.crossref.org";

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^>]*>").unwrap());
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub struct CrossRefClient {
    client: GovernedClient,
    base_url: String,
    mailto: String,
}

impl CrossRefClient {
    pub fn new(mailto: &str) -> Result<Self> {
        let user_agent = if mailto.is_empty() {
            USER_AGENT.to_string()
        } else {
            format!("{USER_AGENT} (mailto:{mailto})")
        };
        Ok(Self::with_client(CROSSREF_API, GovernedClient::new(&user_agent)?, mailto))
    }

    pub fn with_client(base_url: &str, client: GovernedClient, mailto: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            mailto: mailto.to_string(),
        }
    }

    /// `GET /works/{doi}`; the polite-pool address rides along as `mailto`.
    pub async fn get_work(&self, doi: &str) -> Result<CrossRefWork> {
        let doi = Doi::parse(doi)?;
        let mut url = format!("{}/works/{}", self.base_url, doi.doi);
        if !self.mailto.is_empty() {
            url.push_str(&format!("?mailto={}", urlencoding::encode(&self.mailto)));
        }
        let val: Value = self.client.get_json(&url).await?;
        CrossRefWork::from_json(&val["message"])
    }
}

// ─── CrossRefWork ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossRefPerson {
    pub given: String,
    pub family: String,
    pub name: String,
    pub orcid: String,
    pub affiliations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossRefFunder {
    pub name: String,
    pub doi: String,
    /// ROR asserted by the publisher, when the deposit carries one.
    pub ror: Option<String>,
    pub awards: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossRefLicense {
    pub url: String,
    pub content_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossRefLink {
    pub url: String,
    pub content_type: String,
}

/// The `message` object of a works response, read through accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossRefWork {
    message: Value,
}

fn text(v: &Value) -> Option<String> {
    v.as_str()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| v.as_i64().map(|n| n.to_string()))
}

fn strings(v: &Value) -> Vec<String> {
    v.as_array()
        .map(|a| a.iter().filter_map(text).collect())
        .unwrap_or_default()
}

/// `{"date-parts": [[2001, 2, 15]]}` → `2001-02-15`, keeping partial dates partial.
pub fn date_from_parts(v: &Value) -> Option<String> {
    let parts = v["date-parts"][0].as_array()?;
    let nums: Vec<i64> = parts
        .iter()
        .map_while(|p| p.as_i64().or_else(|| p.as_str().and_then(|s| s.parse().ok())))
        .collect();
    match nums.as_slice() {
        [y] => Some(format!("{y:04}")),
        [y, m] => Some(format!("{y:04}-{m:02}")),
        [y, m, d, ..] => Some(format!("{y:04}-{m:02}-{d:02}")),
        [] => None,
    }
}

/// Drop JATS/HTML markup and collapse whitespace.
pub fn strip_markup(s: &str) -> String {
    let plain = MARKUP.replace_all(s, " ");
    SPACES.replace_all(plain.trim(), " ").to_string()
}

impl CrossRefWork {
    pub fn from_json(v: &Value) -> Result<Self> {
        if !v.is_object() {
            return Err(MetadataError::Parse("CrossRef response has no message object".to_string()));
        }
        Ok(Self { message: v.clone() })
    }

    pub fn raw(&self) -> &Value {
        &self.message
    }

    pub fn resource_type(&self) -> Option<String> {
        text(&self.message["type"])
    }

    pub fn doi(&self) -> Option<String> {
        text(&self.message["DOI"])
    }

    /// Primary title first, subtitles and alternates after.
    pub fn titles(&self) -> Vec<String> {
        let mut titles = strings(&self.message["title"]);
        titles.extend(strings(&self.message["subtitle"]));
        titles.extend(strings(&self.message["original-title"]));
        titles
    }

    pub fn abstract_text(&self) -> Option<String> {
        text(&self.message["abstract"]).map(|s| strip_markup(&s)).filter(|s| !s.is_empty())
    }

    pub fn publisher(&self) -> Option<String> {
        text(&self.message["publisher"])
    }

    pub fn publisher_location(&self) -> Option<String> {
        text(&self.message["publisher-location"])
    }

    pub fn container_title(&self) -> Option<String> {
        strings(&self.message["container-title"]).into_iter().next()
    }

    pub fn volume(&self) -> Option<String> {
        text(&self.message["volume"])
    }

    pub fn issue(&self) -> Option<String> {
        text(&self.message["issue"]).or_else(|| text(&self.message["journal-issue"]["issue"]))
    }

    pub fn page(&self) -> Option<String> {
        text(&self.message["page"])
    }

    pub fn article_number(&self) -> Option<String> {
        text(&self.message["article-number"])
    }

    pub fn isbns(&self) -> Vec<String> {
        strings(&self.message["ISBN"])
    }

    pub fn issns(&self) -> Vec<String> {
        strings(&self.message["ISSN"])
    }

    pub fn funders(&self) -> Vec<CrossRefFunder> {
        let Some(funders) = self.message["funder"].as_array() else {
            return Vec::new();
        };
        funders
            .iter()
            .map(|f| {
                let ror = f["id"].as_array().and_then(|ids| {
                    ids.iter()
                        .find(|id| {
                            id["id-type"].as_str().is_some_and(|t| t.eq_ignore_ascii_case("ROR"))
                                && id["asserted-by"].as_str() == Some("publisher")
                        })
                        .and_then(|id| text(&id["id"]))
                });
                CrossRefFunder {
                    name: text(&f["name"]).unwrap_or_default(),
                    doi: text(&f["DOI"]).unwrap_or_default(),
                    ror,
                    awards: strings(&f["award"]),
                }
            })
            .collect()
    }

    pub fn links(&self) -> Vec<CrossRefLink> {
        self.message["link"]
            .as_array()
            .map(|links| {
                links
                    .iter()
                    .filter_map(|l| {
                        Some(CrossRefLink {
                            url: text(&l["URL"])?,
                            content_type: text(&l["content-type"]).unwrap_or_default(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn people(&self, key: &str) -> Vec<CrossRefPerson> {
        self.message[key]
            .as_array()
            .map(|people| {
                people
                    .iter()
                    .map(|p| CrossRefPerson {
                        given: text(&p["given"]).unwrap_or_default(),
                        family: text(&p["family"]).unwrap_or_default(),
                        name: text(&p["name"]).unwrap_or_default(),
                        orcid: text(&p["ORCID"])
                            .map(|o| o.rsplit('/').next().unwrap_or_default().to_string())
                            .unwrap_or_default(),
                        affiliations: p["affiliation"]
                            .as_array()
                            .map(|a| a.iter().filter_map(|x| text(&x["name"])).collect())
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn authors(&self) -> Vec<CrossRefPerson> {
        self.people("author")
    }

    pub fn editors(&self) -> Vec<CrossRefPerson> {
        self.people("editor")
    }

    pub fn translators(&self) -> Vec<CrossRefPerson> {
        self.people("translator")
    }

    pub fn chairs(&self) -> Vec<CrossRefPerson> {
        self.people("chair")
    }

    pub fn licenses(&self) -> Vec<CrossRefLicense> {
        self.message["license"]
            .as_array()
            .map(|ls| {
                ls.iter()
                    .map(|l| CrossRefLicense {
                        url: text(&l["URL"]).unwrap_or_default(),
                        content_version: text(&l["content-version"]).unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn subjects(&self) -> Vec<String> {
        strings(&self.message["subject"])
    }

    pub fn published(&self) -> Option<String> {
        date_from_parts(&self.message["published"])
    }

    pub fn published_print(&self) -> Option<String> {
        date_from_parts(&self.message["published-print"])
    }

    pub fn published_online(&self) -> Option<String> {
        date_from_parts(&self.message["published-online"])
    }

    pub fn accepted(&self) -> Option<String> {
        date_from_parts(&self.message["accepted"])
    }

    pub fn approved(&self) -> Option<String> {
        date_from_parts(&self.message["approved"])
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Server;
    use serde_json::json;

    use super::*;
    use crate::http::RateGovernor;

    fn sample_work() -> CrossRefWork {
        CrossRefWork::from_json(&json!({
            "DOI": "10.1021/acsami.7b15651",
            "type": "journal-article",
            "title": ["Foo Bar Materials"],
            "abstract": "<jats:p>An <jats:italic>abstract</jats:italic>.</jats:p>",
            "publisher": "American Chemical Society (ACS)",
            "container-title": ["ACS Applied Materials &amp; Interfaces"],
            "short-container-title": ["ACS Appl. Mater. Interfaces"],
            "volume": "10",
            "issue": "3",
            "page": "2001-2010",
            "ISSN": ["1944-8244", "1944-8252"],
            "author": [
                {"given": "Jane", "family": "Doe", "ORCID": "http://orcid.org/0000-0001-2345-6789",
                 "affiliation": [{"name": "Example University"}]},
                {"given": "John", "family": "Smith"}
            ],
            "editor": [{"given": "Eve", "family": "Editor"}],
            "funder": [
                {"name": "National Science Foundation", "DOI": "10.13039/100000001",
                 "award": ["DMR-1", "DMR-2"],
                 "id": [{"id": "021nxhr62", "id-type": "ROR", "asserted-by": "publisher"}]},
                {"name": "Sloan Foundation", "DOI": "10.13039/100000879"}
            ],
            "license": [
                {"URL": "https://creativecommons.org/licenses/by/4.0/", "content-version": "vor"},
                {"content-version": "tdm"}
            ],
            "link": [{"URL": "https://pubs.acs.org/doi/pdf/10.1021/acsami.7b15651", "content-type": "application/pdf"}],
            "subject": ["General Materials Science"],
            "published-print": {"date-parts": [[2018, 1, 24]]},
            "published-online": {"date-parts": [[2017, 12, 28]]}
        }))
        .unwrap()
    }

    #[test]
    fn accessors_normalise_values() {
        let w = sample_work();
        assert_eq!(w.doi().as_deref(), Some("10.1021/acsami.7b15651"));
        assert_eq!(w.abstract_text().as_deref(), Some("An abstract ."));
        assert_eq!(w.authors()[0].orcid, "0000-0001-2345-6789");
        assert_eq!(w.authors()[0].affiliations, ["Example University"]);
        assert_eq!(w.funders()[0].ror.as_deref(), Some("021nxhr62"));
        assert_eq!(w.funders()[1].ror, None);
        assert_eq!(w.funders()[0].awards, ["DMR-1", "DMR-2"]);
        assert_eq!(w.published_print().as_deref(), Some("2018-01-24"));
        assert_eq!(w.published(), None);
        assert_eq!(w.links()[0].content_type, "application/pdf");
    }

    #[test]
    fn partial_dates_stay_partial() {
        assert_eq!(date_from_parts(&json!({"date-parts": [[2001, 2]]})).as_deref(), Some("2001-02"));
        assert_eq!(date_from_parts(&json!({"date-parts": [[2001]]})).as_deref(), Some("2001"));
        assert_eq!(date_from_parts(&json!({"date-parts": [[null]]})), None);
        assert_eq!(date_from_parts(&json!(null)), None);
    }

    #[tokio::test]
    async fn fetches_work_by_doi() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/10.1021/acsami.7b15651")
            .match_query(mockito::Matcher::UrlEncoded("mailto".into(), "lib@example.edu".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"status": "ok", "message": sample_work().raw()}).to_string())
            .create_async()
            .await;

        let http = GovernedClient::with_options("rdmkit-test", Duration::from_secs(5), 0)
            .unwrap()
            .with_governor(RateGovernor::with_interval(Duration::ZERO));
        let client = CrossRefClient::with_client(&server.url(), http, "lib@example.edu");
        let work = client.get_work("https://doi.org/10.1021/acsami.7b15651").await.unwrap();
        assert_eq!(work.titles(), ["Foo Bar Materials"]);
        assert_eq!(work.authors().len(), 2);
    }

    #[tokio::test]
    async fn unknown_doi_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/10.1/missing")
            .with_status(404)
            .with_body("Resource not found.")
            .create_async()
            .await;
        let http = GovernedClient::with_options("rdmkit-test", Duration::from_secs(5), 0)
            .unwrap()
            .with_governor(RateGovernor::with_interval(Duration::ZERO));
        let client = CrossRefClient::with_client(&server.url(), http, "");
        let err = client.get_work("10.1/missing").await.unwrap_err();
        assert!(matches!(err, MetadataError::NotFound(_)));
    }
}
