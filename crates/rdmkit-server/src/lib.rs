//! Read-only replica of the legacy repository's REST listing.
//!
//! Serves `/rest/` (dataset index), `/rest/{eprint,record,user,subject}/`
//! (id lists) and `/rest/{eprint,record}/<id>.xml` (latest revision XML), all
//! from a cache rendered at startup. No authentication is performed.

mod cache;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::{Path as UrlPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use rdmkit_core::storage::LegacyDb;
use rdmkit_core::Config;
use tracing::info;

pub use cache::RestCache;

type AppState = Arc<RestCache>;

fn html(body: &str) -> Response {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body.to_string()).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

async fn index(State(cache): State<AppState>) -> Response {
    html(cache.index())
}

async fn dataset(State(cache): State<AppState>, UrlPath(name): UrlPath<String>) -> Response {
    match cache.dataset(&name) {
        Some(page) => html(page),
        None => not_found(),
    }
}

async fn record(State(cache): State<AppState>, UrlPath((name, file)): UrlPath<(String, String)>) -> Response {
    if name != "eprint" && name != "record" {
        return not_found();
    }
    let Some(id) = file.strip_suffix(".xml") else {
        return not_found();
    };
    match cache.record_xml(id) {
        Some(xml) => ([(header::CONTENT_TYPE, "application/xml")], xml.to_string()).into_response(),
        None => not_found(),
    }
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(req).await;
    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// Routes over a prepared cache.
pub fn router(cache: RestCache) -> Router {
    Router::new()
        .route("/rest/", get(index))
        .route("/rest/:dataset/", get(dataset))
        .route("/rest/:dataset/:file", get(record))
        .fallback(|| async { not_found() })
        .with_state(Arc::new(cache))
        .layer(middleware::from_fn(log_request))
}

/// Build the cache from the configured legacy database and archive tree,
/// then listen on `rest_port` until the process is stopped.
pub async fn serve(cfg: &Config) -> anyhow::Result<()> {
    let db_path = cfg.legacy_db_path()?;
    let db = LegacyDb::open(&db_path, &cfg.eprint_base_url())
        .with_context(|| format!("opening {}", db_path.display()))?;
    let cache = RestCache::build(&db, Path::new(&cfg.eprint_archives_path), &cfg.repo_id)?;

    let port: u16 = cfg
        .rest_port
        .trim_start_matches(':')
        .parse()
        .with_context(|| format!("invalid rest_port {:?}", cfg.rest_port))?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(repo_id = %cfg.repo_id, records = cache.record_count(), "starting REST replica on http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, router(cache)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use rdmkit_core::storage::legacy::fixtures::seeded_db;
    use tower::util::ServiceExt;

    use super::*;

    fn app() -> (Router, tempfile::TempDir) {
        let db = seeded_db().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = db.revision_xml_path(dir.path(), "authors", 1).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "<eprint><title>Foo</title></eprint>").unwrap();
        let cache = RestCache::build(&db, dir.path(), "authors").unwrap();
        (router(cache), dir)
    }

    async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn index_lists_datasets() {
        let (app, _dir) = app();
        let (status, body) = get_text(app, "/rest/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("authors REST: Datasets"));
    }

    #[tokio::test]
    async fn record_xml_under_both_names() {
        let (app, _dir) = app();
        let (status, body) = get_text(app.clone(), "/rest/eprint/1.xml").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<title>Foo</title>"));
        let (status, _) = get_text(app, "/rest/record/1.xml").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn dataset_pages() {
        let (app, _dir) = app();
        let (status, body) = get_text(app.clone(), "/rest/subject/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("physics.xml"));
        let (status, body) = get_text(app, "/rest/record/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/rest/eprint/1.xml"));
    }

    #[tokio::test]
    async fn unknown_paths_are_404() {
        let (app, _dir) = app();
        for uri in ["/", "/rest/eprint/2.xml", "/rest/user/5.xml", "/rest/widgets/", "/rest/eprint/1.json"] {
            let (status, _) = get_text(app.clone(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }
}
