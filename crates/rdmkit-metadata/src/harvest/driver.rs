use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rdmkit_core::storage::legacy::LegacyDb;
use rdmkit_core::storage::RecordStore;
use serde_json::Value;
use tracing::{info, warn};

use super::progress::{format_elapsed, Progress};
use crate::error::{MetadataError, Result};
use crate::sources::RdmClient;

/// Consecutive per-record failures tolerated before a run is stopped.
pub const MAX_CONSECUTIVE_FAILURES: usize = 100;

/// Anything a harvest can fetch records from, keyed by id.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Value>;
}

#[async_trait]
impl RecordSource for RdmClient {
    async fn fetch(&self, id: &str) -> Result<Value> {
        let rec = self.get_record(id).await?;
        Ok(serde_json::to_value(rec)?)
    }
}

#[async_trait]
impl RecordSource for LegacyDb {
    async fn fetch(&self, id: &str) -> Result<Value> {
        let eprintid: i64 = id
            .trim()
            .parse()
            .map_err(|_| MetadataError::Parse(format!("legacy ids are numeric, got {id:?}")))?;
        let rec = self.read_record(eprintid)?;
        Ok(serde_json::to_value(rec)?)
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub harvested: usize,
    pub errors: usize,
    pub elapsed: Duration,
}

impl fmt::Display for HarvestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} harvested, {} errors, running time {}",
            self.harvested,
            self.errors,
            format_elapsed(self.elapsed)
        )
    }
}

fn store_record(store: &dyn RecordStore, id: &str, value: &Value) -> rdmkit_core::Result<()> {
    if store.has(id) {
        store.update(id, value)
    } else {
        store.create(id, value)
    }
}

/// Fetch every id in order and write it to `store`, updating keys that
/// already exist and creating the rest.
///
/// Per-record failures are logged and counted. A fatal error, or more than
/// [`MAX_CONSECUTIVE_FAILURES`] failures in a row, stops the run.
pub async fn harvest(
    source: &dyn RecordSource,
    store: &dyn RecordStore,
    ids: &[String],
    name: &str,
) -> Result<HarvestSummary> {
    let mut progress = Progress::new(name, ids.len());
    let mut summary = HarvestSummary::default();
    let mut consecutive = 0;

    for (i, id) in ids.iter().enumerate() {
        let outcome = match source.fetch(id).await {
            Ok(value) => store_record(store, id, &value).map_err(MetadataError::from),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => {
                summary.harvested += 1;
                consecutive = 0;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(index = i, id = %id, error = %e, "failed to harvest record");
                summary.errors += 1;
                consecutive += 1;
                if consecutive > MAX_CONSECUTIVE_FAILURES {
                    return Err(MetadataError::Aborted(consecutive));
                }
            }
        }
        if let Some(line) = progress.tick(i, id) {
            info!("{line}");
        }
    }

    summary.elapsed = progress.elapsed();
    info!("{summary}");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use rdmkit_core::storage::legacy::fixtures::seeded_db;
    use rdmkit_core::storage::JsonDirStore;
    use rdmkit_core::CoreError;
    use serde_json::json;

    use super::*;

    /// Echoes the id back; ids listed in `missing` are not found.
    struct EchoSource {
        missing: Vec<String>,
    }

    #[async_trait]
    impl RecordSource for EchoSource {
        async fn fetch(&self, id: &str) -> Result<Value> {
            if self.missing.iter().any(|m| m == id) {
                return Err(MetadataError::NotFound(id.to_string()));
            }
            Ok(json!({ "id": id }))
        }
    }

    #[derive(Default)]
    struct CountingStore {
        records: Mutex<HashMap<String, Value>>,
        creates: Mutex<usize>,
        updates: Mutex<usize>,
    }

    impl RecordStore for CountingStore {
        fn has(&self, key: &str) -> bool {
            self.records.lock().unwrap().contains_key(key)
        }
        fn get(&self, key: &str) -> rdmkit_core::Result<Value> {
            self.records
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| CoreError::NotFound(key.to_string()))
        }
        fn put(&self, key: &str, value: &Value) -> rdmkit_core::Result<()> {
            self.records.lock().unwrap().insert(key.to_string(), value.clone());
            Ok(())
        }
        fn create(&self, key: &str, value: &Value) -> rdmkit_core::Result<()> {
            *self.creates.lock().unwrap() += 1;
            self.put(key, value)
        }
        fn update(&self, key: &str, value: &Value) -> rdmkit_core::Result<()> {
            *self.updates.lock().unwrap() += 1;
            self.put(key, value)
        }
        fn keys(&self) -> rdmkit_core::Result<Vec<String>> {
            Ok(self.records.lock().unwrap().keys().cloned().collect())
        }
    }

    #[tokio::test]
    async fn resumed_run_updates_existing_keys() {
        let ids: Vec<String> = (0..1000).map(|i| i.to_string()).collect();
        let store = CountingStore::default();
        for id in &ids[..500] {
            store.put(id, &json!({"id": id, "stale": true})).unwrap();
        }
        let source = EchoSource { missing: Vec::new() };

        let summary = harvest(&source, &store, &ids, "authors").await.unwrap();
        assert_eq!(summary.harvested, 1000);
        assert_eq!(summary.errors, 0);
        assert!(summary.to_string().starts_with("1000 harvested, 0 errors, running time"));
        assert_eq!(*store.updates.lock().unwrap(), 500);
        assert_eq!(*store.creates.lock().unwrap(), 500);
        assert_eq!(store.get("42").unwrap(), json!({"id": "42"}));

        // A second pass touches every record through update.
        let again = harvest(&source, &store, &ids, "authors").await.unwrap();
        assert_eq!(again.harvested, 1000);
        assert_eq!(*store.updates.lock().unwrap(), 1500);
    }

    #[tokio::test]
    async fn failures_are_counted_not_fatal() {
        let ids: Vec<String> = ["1", "2", "3"].map(String::from).to_vec();
        let source = EchoSource { missing: vec!["2".into()] };
        let store = CountingStore::default();
        let summary = harvest(&source, &store, &ids, "t").await.unwrap();
        assert_eq!((summary.harvested, summary.errors), (2, 1));
    }

    #[tokio::test]
    async fn stops_after_too_many_consecutive_failures() {
        let ids: Vec<String> = (0..150).map(|i| i.to_string()).collect();
        let source = EchoSource { missing: ids.clone() };
        let store = CountingStore::default();
        let err = harvest(&source, &store, &ids, "t").await.unwrap_err();
        assert!(matches!(err, MetadataError::Aborted(101)));
    }

    #[tokio::test]
    async fn legacy_records_harvest_into_json_dir() {
        let db = seeded_db().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let ids: Vec<String> = ["1", "3", "x"].map(String::from).to_vec();
        let summary = harvest(&db, &store, &ids, "legacy").await.unwrap();
        assert_eq!((summary.harvested, summary.errors), (2, 1));
        assert_eq!(store.get("1").unwrap()["title"], "Foo");
    }
}
