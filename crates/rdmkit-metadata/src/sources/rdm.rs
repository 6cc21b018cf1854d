use futures::stream::{self, Stream, StreamExt};
use rdmkit_core::models::ModernRecord;
use rdmkit_core::Config;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{MetadataError, Result};
use crate::http::GovernedClient;
use crate::USER_AGENT;

pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const DEFAULT_SORT: &str = "bestmatch";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryResponse {
    hits: Hits,
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Hits {
    hits: Vec<Value>,
    total: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Links {
    #[serde(rename = "self")]
    this: String,
    next: String,
}

/// Authenticated client for the Modern Repo records API.
pub struct RdmClient {
    client: GovernedClient,
    base_url: String,
}

impl RdmClient {
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

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/records/{id}`.
    pub async fn get_record(&self, id: &str) -> Result<ModernRecord> {
        let url = format!("{}/api/records/{}", self.base_url, urlencoding::encode(id.trim()));
        self.client.get_json(&url).await
    }

    fn query_url(&self, q: &str, sort: &str, size: usize) -> String {
        let size = if size == 0 { DEFAULT_PAGE_SIZE } else { size };
        let sort = if sort.is_empty() { DEFAULT_SORT } else { sort };
        format!(
            "{}/api/records?size={size}&sort={}&q={}",
            self.base_url,
            urlencoding::encode(sort),
            urlencoding::encode(q)
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<(Vec<ModernRecord>, Option<String>)> {
        let page: QueryResponse = self.client.get_json(url).await?;
        let total = page
            .hits
            .total
            .as_u64()
            .or_else(|| page.hits.total["value"].as_u64())
            .unwrap_or_default();
        debug!(url, total, hits = page.hits.hits.len(), "query page");

        let records = page
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                serde_json::from_value::<ModernRecord>(hit)
                    .map_err(|e| MetadataError::Parse(format!("query hit: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let next = (!page.links.next.is_empty() && page.links.next != page.links.this)
            .then_some(page.links.next);
        Ok((records, next))
    }

    /// One item per result page, following `links.next` until it is absent or equals `links.self`.
    pub fn query_pages<'a>(
        &'a self,
        q: &str,
        sort: &str,
        size: usize,
    ) -> impl Stream<Item = Result<Vec<ModernRecord>>> + 'a {
        let first = self.query_url(q, sort, size);
        stream::unfold(Some(first), move |next| async move {
            let url = next?;
            match self.fetch_page(&url).await {
                Ok((records, next)) => Some((Ok(records), next)),
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    pub async fn query(&self, q: &str, sort: &str, size: usize) -> Result<Vec<ModernRecord>> {
        let pages = self.query_pages(q, sort, size);
        futures::pin_mut!(pages);
        let mut records = Vec::new();
        while let Some(page) = pages.next().await {
            records.extend(page?);
        }
        info!(q, count = records.len(), "query complete");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::{Matcher, Server};

    use super::*;
    use crate::http::RateGovernor;

    fn client(server: &Server) -> RdmClient {
        let http = GovernedClient::with_options("rdmkit-test", Duration::from_secs(5), 0)
            .unwrap()
            .with_token("tok")
            .with_governor(RateGovernor::with_interval(Duration::ZERO));
        RdmClient::with_client(&server.url(), http)
    }

    #[tokio::test]
    async fn fetches_one_record() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/records/abc12-def34")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "abc12-def34",
                    "pids": {"doi": {"identifier": "10.1/x", "provider": "datacite"}},
                    "access": {"record": "public", "files": "public"},
                    "metadata": {"title": "Foo", "resource_type": {"id": "publication-article"}}
                }"#,
            )
            .create_async()
            .await;

        let rec = client(&server).get_record("abc12-def34").await.unwrap();
        assert_eq!(rec.id, "abc12-def34");
        assert_eq!(rec.doi(), Some("10.1/x"));
        assert_eq!(rec.record_access.record, "public");
        assert_eq!(rec.metadata.resource_type.id, "publication-article");
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/api/records/nope").with_status(404).create_async().await;
        let err = client(&server).get_record("nope").await.unwrap_err();
        assert!(matches!(err, MetadataError::NotFound(_)));
    }

    #[tokio::test]
    async fn query_follows_next_links() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let _first = server
            .mock("GET", "/api/records")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "title:foo".into()),
                Matcher::UrlEncoded("sort".into(), "bestmatch".into()),
                Matcher::UrlEncoded("size".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"{{"hits": {{"hits": [{{"id": "a"}}, {{"id": "b"}}], "total": 3}},
                    "links": {{"self": "{base}/api/records?page=1", "next": "{base}/api/records/page2"}}}}"#
            ))
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/api/records/page2")
            .with_status(200)
            .with_body(format!(
                r#"{{"hits": {{"hits": [{{"id": "c"}}], "total": 3}},
                    "links": {{"self": "{base}/api/records/page2", "next": "{base}/api/records/page2"}}}}"#
            ))
            .create_async()
            .await;

        let records = client(&server).query("title:foo", "", 2).await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
