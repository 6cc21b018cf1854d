use std::collections::HashMap;
use std::path::Path;

use rdmkit_core::storage::legacy::DATASETS;
use rdmkit_core::storage::LegacyDb;
use tracing::{info, warn};

/// Dataset names with the label shown on their list page.
const LABELS: [(&str, &str); 3] = [("eprint", "EPrints"), ("user", "Users"), ("subject", "Subjects")];

fn index_page(repo_id: &str) -> String {
    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
  <title>{repo_id} REST: Datasets</title>
</head>
<body>
  <h1>{repo_id} REST: Datasets</h1>
<ul>
<li><a href='/rest/eprint/'>EPrints</a></li>
<li><a href='/rest/user/'>Users</a></li>
<li><a href='/rest/subject/'>Subjects</a></li>
</ul>
</body>
</html>"
    )
}

fn dataset_page(repo_id: &str, dataset: &str, label: &str, ids: &[String]) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|id| format!("<li><a href=\"/rest/{dataset}/{id}.xml\">{id}.xml</a></li>"))
        .collect();
    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
  <title>{repo_id} REST: {label} DataSet</title>
</head>
<body>
  <h1>{repo_id} REST: {label} DataSet</h1>
  <ul>
  {}
  </ul>
</body>
</html>",
        items.join("\n  ")
    )
}

/// Every page the replica serves, rendered once at startup.
#[derive(Debug, Default)]
pub struct RestCache {
    pub repo_id: String,
    index: String,
    datasets: HashMap<String, String>,
    /// eprint id → revision XML
    records: HashMap<String, String>,
}

impl RestCache {
    /// Render the list pages and read the latest revision XML of every
    /// archived record. Records whose XML cannot be read are skipped.
    pub fn build(db: &LegacyDb, archives: &Path, repo_id: &str) -> rdmkit_core::Result<Self> {
        let mut cache = Self {
            repo_id: repo_id.to_string(),
            index: index_page(repo_id),
            ..Self::default()
        };
        for (dataset, _) in DATASETS {
            let label = LABELS
                .iter()
                .find(|(d, _)| *d == dataset)
                .map(|(_, l)| *l)
                .unwrap_or(dataset);
            let ids = db.dataset_ids(dataset)?;
            cache
                .datasets
                .insert(dataset.to_string(), dataset_page(repo_id, dataset, label, &ids));

            if dataset == "eprint" {
                cache.load_records(db, archives, repo_id, &ids)?;
            }
        }
        Ok(cache)
    }

    fn load_records(&mut self, db: &LegacyDb, archives: &Path, repo_id: &str, ids: &[String]) -> rdmkit_core::Result<()> {
        let total = ids.len();
        for (i, id) in ids.iter().enumerate() {
            let Ok(eprintid) = id.parse::<i64>() else {
                continue;
            };
            let path = match db.revision_xml_path(archives, repo_id, eprintid) {
                Ok(path) => path,
                Err(e) => {
                    warn!(id = %id, error = %e, "skipping record");
                    continue;
                }
            };
            match std::fs::read_to_string(&path) {
                Ok(xml) => {
                    self.records.insert(id.clone(), xml);
                }
                Err(e) => warn!(id = %id, path = %path.display(), error = %e, "skipping record"),
            }
            if i % 1000 == 0 {
                info!("scanned {i}/{total} records, read {}", self.records.len());
            }
        }
        info!("found {}/{total} records", self.records.len());
        Ok(())
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// List page for `eprint`, `user` or `subject`; `record` is an alias of `eprint`.
    pub fn dataset(&self, name: &str) -> Option<&str> {
        let name = if name == "record" { "eprint" } else { name };
        self.datasets.get(name).map(String::as_str)
    }

    pub fn record_xml(&self, id: &str) -> Option<&str> {
        self.records.get(id).map(String::as_str)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use rdmkit_core::storage::legacy::fixtures::seeded_db;

    use super::*;

    #[test]
    fn lists_archived_records_and_reads_xml() {
        let db = seeded_db().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = db.revision_xml_path(dir.path(), "caltechauthors", 1).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "<eprint><eprintid>1</eprintid></eprint>").unwrap();

        let cache = RestCache::build(&db, dir.path(), "caltechauthors").unwrap();
        let eprints = cache.dataset("eprint").unwrap();
        assert!(eprints.contains("<li><a href=\"/rest/eprint/1.xml\">1.xml</a></li>"));
        assert!(eprints.contains("/rest/eprint/3.xml"));
        assert!(!eprints.contains("/rest/eprint/2.xml"));
        assert_eq!(cache.dataset("record"), Some(eprints));
        assert!(cache.dataset("user").unwrap().contains("5.xml"));
        assert!(cache.dataset("widgets").is_none());

        // Record 3 has no XML on disk and is skipped.
        assert_eq!(cache.record_count(), 1);
        assert!(cache.record_xml("1").unwrap().contains("<eprintid>1</eprintid>"));
    }
}
