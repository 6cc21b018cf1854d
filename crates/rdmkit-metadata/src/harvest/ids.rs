use std::path::Path;

use rdmkit_core::CoreError;
use serde_json::Value;

use crate::error::{MetadataError, Result};

/// Ids from a JSON array (strings or numbers) or from lines of text, where
/// blank lines and `#` comments are skipped.
pub fn parse_ids(text: &str) -> Result<Vec<String>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(trimmed)?;
        return values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.trim().to_string()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(MetadataError::Parse(format!("unexpected id {other}"))),
            })
            .filter(|id| id.as_ref().map_or(true, |s| !s.is_empty()))
            .collect();
    }
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

pub fn read_ids_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(CoreError::from)?;
    parse_ids(&text)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn json_array_of_mixed_ids() {
        assert_eq!(parse_ids(r#"["abc12-3def4", 42, " 7 "]"#).unwrap(), ["abc12-3def4", "42", "7"]);
        assert!(parse_ids(r#"[{"id": 1}]"#).is_err());
    }

    #[test]
    fn one_per_line_with_comments() {
        let text = "# exported ids\n1\n\n  2  \n# done\n";
        assert_eq!(parse_ids(text).unwrap(), ["1", "2"]);
    }

    #[test]
    fn reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[1, 2, 3]").unwrap();
        assert_eq!(read_ids_file(f.path()).unwrap().len(), 3);
    }
}
