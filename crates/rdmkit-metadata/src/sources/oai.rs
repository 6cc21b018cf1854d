use chrono::NaiveDate;
use futures::stream::{self, Stream, StreamExt};
use quick_xml::de::from_str;
use rdmkit_core::Config;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{MetadataError, Result};
use crate::http::GovernedClient;
use crate::USER_AGENT;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OaiResponse {
    #[serde(rename = "ListIdentifiers")]
    list_identifiers: Option<ListIdentifiers>,
    error: Option<OaiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListIdentifiers {
    #[serde(rename = "header")]
    headers: Vec<OaiHeader>,
    #[serde(rename = "resumptionToken")]
    resumption_token: Option<ResumptionToken>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OaiHeader {
    #[serde(rename = "@status")]
    status: Option<String>,
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResumptionToken {
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OaiError {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "$text")]
    message: String,
}

/// One parsed `ListIdentifiers` page.
#[derive(Debug, Default, PartialEq)]
pub struct IdentifierPage {
    pub ids: Vec<String>,
    pub resumption_token: Option<String>,
}

/// Error pages served in place of XML.
fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(14).collect::<String>().to_lowercase();
    head.starts_with("<html") || head.starts_with("<!doctype html")
}

/// `oai:host:recid` → `recid`
pub fn local_id(identifier: &str) -> &str {
    identifier.rsplit(':').next().unwrap_or(identifier).trim()
}

pub fn parse_list_identifiers(body: &str) -> Result<IdentifierPage> {
    if looks_like_html(body) {
        return Err(MetadataError::Protocol("HTML returned where OAI-PMH XML was expected".to_string()));
    }
    let resp: OaiResponse =
        from_str(body).map_err(|e| MetadataError::Parse(format!("invalid OAI-PMH xml: {e}")))?;
    if let Some(err) = resp.error {
        if err.code == "noRecordsMatch" {
            return Ok(IdentifierPage::default());
        }
        return Err(MetadataError::Protocol(format!("OAI-PMH {}: {}", err.code, err.message.trim())));
    }
    let Some(list) = resp.list_identifiers else {
        return Ok(IdentifierPage::default());
    };
    let ids = list
        .headers
        .iter()
        .filter(|h| h.status.as_deref() != Some("deleted"))
        .map(|h| local_id(&h.identifier))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    let resumption_token = list
        .resumption_token
        .map(|t| t.value.trim().to_string())
        .filter(|t| !t.is_empty());
    Ok(IdentifierPage { ids, resumption_token })
}

fn check_date(s: &str) -> Result<()> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| MetadataError::Config(format!("{s:?} is not a YYYY-MM-DD date")))
}

/// Identifier listing over the Modern Repo's OAI-PMH endpoint.
pub struct OaiClient {
    client: GovernedClient,
    base_url: String,
}

impl OaiClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        cfg.require_rdm()?;
        let client = GovernedClient::new(USER_AGENT)?.with_token(cfg.rdmtok.clone());
        Ok(Self::with_client(&cfg.rdm_url, client))
    }

    pub fn with_client(base_url: &str, client: GovernedClient) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn first_url(&self, from: Option<&str>, until: Option<&str>) -> String {
        let mut url = format!("{}/oai2d?verb=ListIdentifiers&metadataPrefix=oai_dc", self.base_url);
        if let Some(from) = from {
            url.push_str(&format!("&from={}", urlencoding::encode(from)));
        }
        if let Some(until) = until {
            url.push_str(&format!("&until={}", urlencoding::encode(until)));
        }
        url
    }

    fn resume_url(&self, token: &str) -> String {
        format!(
            "{}/oai2d?verb=ListIdentifiers&resumptionToken={}",
            self.base_url,
            urlencoding::encode(token)
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<IdentifierPage> {
        let resp = self.client.get_response(url, Some("application/xml")).await?;
        let page = parse_list_identifiers(&resp.body)?;
        debug!(url, ids = page.ids.len(), more = page.resumption_token.is_some(), "ListIdentifiers page");
        Ok(page)
    }

    /// Record ids in server order. An error ends the stream after it is yielded.
    pub fn list_identifiers<'a>(
        &'a self,
        from: Option<&str>,
        until: Option<&str>,
    ) -> impl Stream<Item = Result<String>> + 'a {
        let first = self.first_url(from, until);
        stream::unfold(Some(first), move |next| async move {
            let url = next?;
            match self.fetch_page(&url).await {
                Ok(page) => {
                    let next = page.resumption_token.as_deref().map(|t| self.resume_url(t));
                    let items: Vec<Result<String>> = page.ids.into_iter().map(Ok).collect();
                    Some((stream::iter(items), next))
                }
                Err(e) => Some((stream::iter(vec![Err(e)]), None)),
            }
        })
        .flatten()
    }

    async fn collect(&self, from: Option<&str>, until: Option<&str>) -> Result<Vec<String>> {
        let ids = self.list_identifiers(from, until);
        futures::pin_mut!(ids);
        let mut out = Vec::new();
        while let Some(id) = ids.next().await {
            out.push(id?);
            if out.len() % 500 == 0 {
                info!(count = out.len(), "ids harvested");
            }
        }
        info!(count = out.len(), "ids harvested (total)");
        Ok(out)
    }

    pub async fn get_all_ids(&self) -> Result<Vec<String>> {
        self.collect(None, None).await
    }

    /// Ids modified in the inclusive `YYYY-MM-DD` range.
    pub async fn get_modified_ids(&self, start: &str, end: &str) -> Result<Vec<String>> {
        check_date(start)?;
        check_date(end)?;
        self.collect(Some(start), Some(end)).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::{Matcher, Server};

    use super::*;
    use crate::http::RateGovernor;

    const PAGE_ONE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2024-01-01T00:00:00Z</responseDate>
  <request verb="ListIdentifiers">https://rdm.example.edu/oai2d</request>
  <ListIdentifiers>
    <header><identifier>oai:rdm.example.edu:abc12-00001</identifier><datestamp>2024-01-01</datestamp></header>
    <header status="deleted"><identifier>oai:rdm.example.edu:gone0-00000</identifier></header>
    <header><identifier>oai:rdm.example.edu:abc12-00002</identifier></header>
    <resumptionToken completeListSize="3" cursor="0">tok/1</resumptionToken>
  </ListIdentifiers>
</OAI-PMH>"#;

    const PAGE_TWO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <ListIdentifiers>
    <header><identifier>oai:rdm.example.edu:abc12-00003</identifier></header>
    <resumptionToken completeListSize="3" cursor="2"/>
  </ListIdentifiers>
</OAI-PMH>"#;

    fn client(server: &Server) -> OaiClient {
        let http = GovernedClient::with_options("rdmkit-test", Duration::from_secs(5), 0)
            .unwrap()
            .with_governor(RateGovernor::with_interval(Duration::ZERO));
        OaiClient::with_client(&server.url(), http)
    }

    #[test]
    fn parses_page() {
        let page = parse_list_identifiers(PAGE_ONE).unwrap();
        assert_eq!(page.ids, ["abc12-00001", "abc12-00002"]);
        assert_eq!(page.resumption_token.as_deref(), Some("tok/1"));

        let last = parse_list_identifiers(PAGE_TWO).unwrap();
        assert_eq!(last.ids, ["abc12-00003"]);
        assert_eq!(last.resumption_token, None);
    }

    #[test]
    fn html_is_a_protocol_error() {
        let err = parse_list_identifiers("<html><body>Too busy</body></html>").unwrap_err();
        assert!(matches!(err, MetadataError::Protocol(_)));
        let err = parse_list_identifiers("  <!DOCTYPE html><html></html>").unwrap_err();
        assert!(matches!(err, MetadataError::Protocol(_)));
    }

    #[test]
    fn no_records_is_empty() {
        let body = r#"<OAI-PMH><error code="noRecordsMatch">none</error></OAI-PMH>"#;
        assert_eq!(parse_list_identifiers(body).unwrap(), IdentifierPage::default());
        let body = r#"<OAI-PMH><error code="badResumptionToken">expired</error></OAI-PMH>"#;
        assert!(matches!(parse_list_identifiers(body), Err(MetadataError::Protocol(_))));
    }

    #[tokio::test]
    async fn follows_resumption_tokens() {
        let mut server = Server::new_async().await;
        let _first = server
            .mock("GET", "/oai2d")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("verb".into(), "ListIdentifiers".into()),
                Matcher::UrlEncoded("metadataPrefix".into(), "oai_dc".into()),
            ]))
            .with_status(200)
            .with_body(PAGE_ONE)
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/oai2d")
            .match_query(Matcher::UrlEncoded("resumptionToken".into(), "tok/1".into()))
            .with_status(200)
            .with_body(PAGE_TWO)
            .create_async()
            .await;

        let ids = client(&server).get_all_ids().await.unwrap();
        assert_eq!(ids, ["abc12-00001", "abc12-00002", "abc12-00003"]);
    }

    #[tokio::test]
    async fn html_page_ends_enumeration() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/oai2d")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;
        let err = client(&server).get_all_ids().await.unwrap_err();
        assert!(matches!(err, MetadataError::Protocol(_)));
    }

    #[tokio::test]
    async fn modified_range_is_validated() {
        let server = Server::new_async().await;
        let err = client(&server).get_modified_ids("2024-13-01", "2024-12-31").await.unwrap_err();
        assert!(matches!(err, MetadataError::Config(_)));
    }
}
