use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{CoreError, Result};

/// Keyed JSON store used as the harvest destination.
pub trait RecordStore {
    fn has(&self, key: &str) -> bool;
    fn get(&self, key: &str) -> Result<Value>;
    /// Write unconditionally.
    fn put(&self, key: &str, value: &Value) -> Result<()>;
    /// Write a key that must not exist yet.
    fn create(&self, key: &str, value: &Value) -> Result<()>;
    /// Replace a key that must already exist.
    fn update(&self, key: &str, value: &Value) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

/// Directory of `<key>.json` files.
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open (creating when missing) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let name = sanitize_key(key);
        if name.is_empty() {
            return Err(CoreError::Storage(format!("invalid key {key:?}")));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }

    fn write_atomic(&self, path: &Path, value: &Value) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl RecordStore for JsonDirStore {
    fn has(&self, key: &str) -> bool {
        self.path_for(key).is_ok_and(|p| p.exists())
    }

    fn get(&self, key: &str) -> Result<Value> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Err(CoreError::NotFound(key.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn put(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.path_for(key)?;
        debug!(key, path = %path.display(), "store put");
        self.write_atomic(&path, value)
    }

    fn create(&self, key: &str, value: &Value) -> Result<()> {
        if self.has(key) {
            return Err(CoreError::Storage(format!("{key} already exists")));
        }
        self.put(key, value)
    }

    fn update(&self, key: &str, value: &Value) -> Result<()> {
        if !self.has(key) {
            return Err(CoreError::NotFound(key.to_string()));
        }
        self.put(key, value)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                keys.push(stem.to_string_lossy().to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Map a record key onto a safe file stem.
pub fn sanitize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn create_then_update() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();

        store.create("abc12-def34", &json!({"title": "One"})).unwrap();
        assert!(store.has("abc12-def34"));
        assert!(store.create("abc12-def34", &json!({})).is_err());

        store.update("abc12-def34", &json!({"title": "Two"})).unwrap();
        assert_eq!(store.get("abc12-def34").unwrap()["title"], "Two");
    }

    #[test]
    fn update_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let err = store.update("nope", &json!({})).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn keys_are_sorted_and_skip_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        store.put("2", &json!(2)).unwrap();
        store.put("1", &json!(1)).unwrap();
        fs::write(dir.path().join("3.json.tmp"), "{}").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn sanitize_keeps_ids_and_escapes_paths() {
        assert_eq!(sanitize_key("abc12-def34"), "abc12-def34");
        assert_eq!(sanitize_key("../etc/passwd"), "_etc_passwd");
        assert_eq!(sanitize_key("10.1/x"), "10.1_x");
    }
}
