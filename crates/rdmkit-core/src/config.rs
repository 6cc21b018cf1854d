use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const DEFAULT_REST_PORT: &str = ":8003";
pub const SECRET_PLACEHOLDER: &str = "__SECRET_GOES_HERE__";

/// Runtime configuration, loaded from a JSON file and overlaid with the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Modern Repo base URL, e.g. `https://authors.example.edu`.
    pub rdm_url: String,
    /// Bearer token for the Modern Repo REST API.
    pub rdmtok: String,

    pub eprint_host: String,
    pub eprint_user: String,
    pub eprint_password: String,
    pub eprint_archives_path: String,

    pub db_user: String,
    pub db_password: String,
    /// Legacy repository id; also names the schema.
    pub repo_id: String,
    /// SQLite file holding the legacy tables. Defaults to `<repo_id>.db`.
    pub db_path: String,

    /// Local record store location.
    pub c_name: String,
    /// Contact address for the CrossRef polite pool.
    pub mailto: String,
    pub rest_port: String,

    // ─── Vocabulary overrides ───
    pub resource_types: BTreeMap<String, String>,
    pub contributor_types: BTreeMap<String, String>,
    pub doi_prefix_publishers: BTreeMap<String, String>,
    pub issn_journals: BTreeMap<String, String>,
    pub issn_publishers: BTreeMap<String, String>,
}

/// Environment variable names paired with the field they fill.
const ENV_KEYS: &[&str] = &[
    "RDM_URL",
    "RDMTOK",
    "EPRINT_HOST",
    "EPRINT_USER",
    "EPRINT_PASSWORD",
    "EPRINT_ARCHIVES_PATH",
    "DB_USER",
    "DB_PASSWORD",
    "REPO_ID",
    "DB_PATH",
    "C_NAME",
    "MAILTO",
    "REST_PORT",
];

impl Config {
    /// Standard config file path: `$RDMKIT_CONFIG` or `~/.config/rdmkit/config.json`.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("RDMKIT_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("rdmkit")
            .join("config.json")
    }

    /// Load the file (when given) then fill empty fields from the process environment.
    pub fn load(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::default(),
        };
        cfg.apply_env(env_prefix, |name| std::env::var(name).ok());
        cfg.normalize();
        Ok(cfg)
    }

    /// Load a JSON config file. A missing file is a config error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::Config(format!("{} does not exist", path.display())));
        }
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The field an environment key fills, or `None` for keys this struct does not know.
    fn env_slot(&mut self, key: &str) -> Option<&mut String> {
        let slot = match key {
            "RDM_URL" => &mut self.rdm_url,
            "RDMTOK" => &mut self.rdmtok,
            "EPRINT_HOST" => &mut self.eprint_host,
            "EPRINT_USER" => &mut self.eprint_user,
            "EPRINT_PASSWORD" => &mut self.eprint_password,
            "EPRINT_ARCHIVES_PATH" => &mut self.eprint_archives_path,
            "DB_USER" => &mut self.db_user,
            "DB_PASSWORD" => &mut self.db_password,
            "REPO_ID" => &mut self.repo_id,
            "DB_PATH" => &mut self.db_path,
            "C_NAME" => &mut self.c_name,
            "MAILTO" => &mut self.mailto,
            "REST_PORT" => &mut self.rest_port,
            _ => return None,
        };
        Some(slot)
    }

    /// Fill empty fields from `lookup`. Populated fields are left alone.
    pub fn apply_env<F>(&mut self, prefix: &str, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ENV_KEYS {
            let Some(value) = lookup(&format!("{prefix}{key}")).filter(|v| !v.is_empty()) else {
                continue;
            };
            let Some(slot) = self.env_slot(key) else {
                continue;
            };
            if slot.is_empty() {
                *slot = value;
            }
        }
    }

    pub fn normalize(&mut self) {
        self.rdm_url = self.rdm_url.trim_end_matches('/').to_string();
        if self.rest_port.is_empty() {
            self.rest_port = DEFAULT_REST_PORT.to_string();
        } else if !self.rest_port.starts_with(':') {
            self.rest_port = format!(":{}", self.rest_port);
        }
    }

    /// Copy suitable for echoing back to a terminal.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        for secret in [&mut cfg.rdmtok, &mut cfg.eprint_password, &mut cfg.db_password] {
            if !secret.is_empty() {
                *secret = SECRET_PLACEHOLDER.to_string();
            }
        }
        cfg
    }

    /// Template written by `setup` when no config exists yet.
    pub fn sample() -> Self {
        Self {
            rdm_url: "https://localhost".to_string(),
            rdmtok: SECRET_PLACEHOLDER.to_string(),
            repo_id: "caltechauthors".to_string(),
            c_name: "authors.ds".to_string(),
            mailto: "helpdesk@example.edu".to_string(),
            rest_port: DEFAULT_REST_PORT.to_string(),
            ..Self::default()
        }
    }

    pub fn require_rdm(&self) -> Result<()> {
        if self.rdm_url.is_empty() {
            return Err(CoreError::Config("rdm_url (RDM_URL) is not set".to_string()));
        }
        if self.rdmtok.is_empty() {
            return Err(CoreError::Config("rdmtok (RDMTOK) is not set".to_string()));
        }
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Path to the legacy SQLite database.
    pub fn legacy_db_path(&self) -> Result<PathBuf> {
        if !self.db_path.is_empty() {
            return Ok(PathBuf::from(&self.db_path));
        }
        if self.repo_id.is_empty() {
            return Err(CoreError::Config("repo_id (REPO_ID) is not set".to_string()));
        }
        Ok(PathBuf::from(format!("{}.db", self.repo_id)))
    }

    /// Directory backing the local record store.
    pub fn store_dir(&self) -> Result<PathBuf> {
        if self.c_name.is_empty() {
            return Err(CoreError::Config("c_name (C_NAME) is not set".to_string()));
        }
        Ok(PathBuf::from(&self.c_name))
    }

    /// Collection name without a `.ds` suffix, used as a record id prefix.
    pub fn collection(&self) -> String {
        collection_name(&self.c_name)
    }

    /// Base URL of the legacy repository; a bare host gets `https://`.
    pub fn eprint_base_url(&self) -> String {
        let host = self.eprint_host.trim().trim_end_matches('/');
        if host.is_empty() || host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }
}

/// Basename of a store location with any `.ds` suffix trimmed.
pub fn collection_name(c_name: &str) -> String {
    let base = Path::new(c_name)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    base.trim_end_matches(".ds").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn env_fills_only_empty_fields() {
        let mut cfg = Config {
            rdm_url: "https://file.example".to_string(),
            ..Config::default()
        };
        let env: HashMap<&str, &str> = [
            ("TEST_RDM_URL", "https://env.example"),
            ("TEST_RDMTOK", "secret"),
            ("TEST_REST_PORT", "8080"),
        ]
        .into_iter()
        .collect();
        cfg.apply_env("TEST_", |k| env.get(k).map(|v| v.to_string()));
        cfg.normalize();

        assert_eq!(cfg.rdm_url, "https://file.example");
        assert_eq!(cfg.rdmtok, "secret");
        assert_eq!(cfg.rest_port, ":8080");
    }

    #[test]
    fn every_env_key_has_its_own_field() {
        let mut cfg = Config::default();
        for key in ENV_KEYS {
            let slot = cfg.env_slot(key).unwrap();
            assert!(slot.is_empty(), "{key} shares a field");
            *slot = (*key).to_string();
        }
        assert_eq!(cfg.rest_port, "REST_PORT");
        assert_eq!(cfg.mailto, "MAILTO");
        assert!(cfg.env_slot("UNKNOWN_KEY").is_none());
    }

    #[test]
    fn unprefixed_env_is_ignored_when_prefix_given() {
        let mut cfg = Config::default();
        cfg.apply_env("TEST_", |k| (k == "RDMTOK").then(|| "x".to_string()));
        assert!(cfg.rdmtok.is_empty());
    }

    #[test]
    fn rest_port_default_and_prefix() {
        let mut cfg = Config::default();
        cfg.normalize();
        assert_eq!(cfg.rest_port, ":8003");

        let mut cfg = Config { rest_port: ":9000".to_string(), ..Config::default() };
        cfg.normalize();
        assert_eq!(cfg.rest_port, ":9000");
    }

    #[test]
    fn redacted_hides_secrets() {
        let cfg = Config {
            rdmtok: "abc".to_string(),
            db_password: "pw".to_string(),
            ..Config::default()
        };
        let shown = cfg.redacted();
        assert_eq!(shown.rdmtok, SECRET_PLACEHOLDER);
        assert_eq!(shown.db_password, SECRET_PLACEHOLDER);
        assert!(shown.eprint_password.is_empty());
    }

    #[test]
    fn json_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rdmkit.json");
        let mut cfg = Config::sample();
        cfg.resource_types.insert("article".into(), "publication-article".into());
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = Config::load_from(Path::new("/tmp/nonexistent_rdmkit.json")).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn collection_name_trims_ds() {
        assert_eq!(collection_name("/data/CaltechAUTHORS.ds"), "CaltechAUTHORS");
        assert_eq!(collection_name("authors"), "authors");
    }

    #[test]
    fn eprint_base_url_adds_scheme() {
        let mut cfg = Config { eprint_host: "authors.example.edu".to_string(), ..Config::default() };
        assert_eq!(cfg.eprint_base_url(), "https://authors.example.edu");
        cfg.eprint_host = "http://localhost:8080/".to_string();
        assert_eq!(cfg.eprint_base_url(), "http://localhost:8080");
    }
}
