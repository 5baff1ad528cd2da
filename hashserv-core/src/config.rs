use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage settings shared by the staging area, the content store and the
/// upload path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding committed objects, one file per digest.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for uploads that have not been committed yet. Must live on
    /// the same volume as `data_dir`.
    #[serde(default = "default_process_dir")]
    pub process_dir: PathBuf,

    /// Accepted upload extensions, without the leading dot. Empty allows all.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    #[serde(default)]
    pub allow_empty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            process_dir: default_process_dir(),
            allowed_extensions: default_allowed_extensions(),
            allow_empty: false,
        }
    }
}

impl StoreConfig {
    /// Config rooted at `root`, with `data/` and `process/` beneath it.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join("data"),
            process_dir: root.join("process"),
            ..Self::default()
        }
    }

    pub fn normalized_extensions(&self) -> Vec<String> {
        self.allowed_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect()
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_process_dir() -> PathBuf {
    PathBuf::from("process")
}

fn default_allowed_extensions() -> Vec<String> {
    ["txt", "pdf", "png", "jpg", "jpeg", "gif", "shard"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_extensions_strip_dots() {
        let config = StoreConfig {
            allowed_extensions: vec![".shard".to_string(), " txt ".to_string(), "".to_string()],
            ..StoreConfig::default()
        };
        assert_eq!(config.normalized_extensions(), vec!["shard", "txt"]);
    }

    #[test]
    fn test_with_root() {
        let config = StoreConfig::with_root("/srv/hashserv");
        assert_eq!(config.data_dir, PathBuf::from("/srv/hashserv/data"));
        assert_eq!(config.process_dir, PathBuf::from("/srv/hashserv/process"));
        assert!(!config.allow_empty);
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.allowed_extensions.len(), 7);
    }
}
