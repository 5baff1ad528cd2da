use hashserv_core::{HashservError, Result, StoreConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Request body cap for uploads, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

impl Config {
    /// Load settings from `path` (optional) overlaid with `HASHSERV__*`
    /// environment variables, e.g. `HASHSERV__SERVER__BIND_ADDR`.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(::config::Environment::with_prefix("HASHSERV").separator("__"))
            .build()
            .map_err(|e| HashservError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| HashservError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.max_upload_bytes == 0 {
            return Err(HashservError::Config(
                "server.max_upload_bytes must be positive".to_string(),
            ));
        }

        if self.store.data_dir == self.store.process_dir {
            return Err(HashservError::Config(
                "store.data_dir and store.process_dir must differ".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "server:\n  bind_addr: 127.0.0.1:8080\nstore:\n  data_dir: /srv/data\n  process_dir: /srv/process\n  allowed_extensions: [txt]\n",
        )
        .unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.server.max_upload_bytes, 64 * 1024 * 1024);
        assert_eq!(config.store.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.store.allowed_extensions, vec!["txt".to_string()]);
        assert!(!config.store.allow_empty);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("absent.yaml");

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.store.process_dir, PathBuf::from("process"));
        assert_eq!(config.store.allowed_extensions.len(), 7);
    }

    #[test]
    fn test_rejects_shared_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "store:\n  data_dir: same\n  process_dir: same\n").unwrap();

        assert!(matches!(
            Config::from_file(path.to_str().unwrap()),
            Err(HashservError::Config(_))
        ));
    }
}
