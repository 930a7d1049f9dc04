use mybooks_core::ApiError;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    /// Root of the bookstore REST API, e.g. `http://localhost:8111`.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Which backend the client talks to. Chosen once at startup.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Http,
    /// In-memory data set, for running without a server.
    Fixture,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    #[default]
    Directory,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StorageSettings {
    #[serde(default)]
    pub kind: StorageKind,
    /// Where the directory storage keeps its JSON blobs.
    #[serde(default = "default_storage_directory")]
    pub directory: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            directory: default_storage_directory(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_storage_directory() -> PathBuf {
    PathBuf::from(".mybooks")
}

pub fn get_configuration() -> Result<Settings, ApiError> {
    mybooks_core::config::load_settings("mybooks-client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_minimal_settings() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "api": { "base_url": "http://localhost:8111" }
        }))
        .unwrap();

        assert_eq!(settings.api.timeout_secs, 10);
        assert_eq!(settings.backend, BackendKind::Http);
        assert_eq!(settings.storage.kind, StorageKind::Directory);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn fixture_backend_is_selectable() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "api": { "base_url": "http://unused" },
            "backend": "fixture",
            "storage": { "kind": "memory" }
        }))
        .unwrap();

        assert_eq!(settings.backend, BackendKind::Fixture);
        assert_eq!(settings.storage.kind, StorageKind::Memory);
    }
}
