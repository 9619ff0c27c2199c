//! Connection configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

/// Connection settings for the realtime database.
///
/// Matches the JSON config file handed out by the Firebase console, so the
/// same file works for the XR clients and for this crate.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub api_key: String,

    pub auth_domain: String,

    #[serde(rename = "databaseURL")]
    pub database_url: String,

    pub storage_bucket: String,
}

impl SyncConfig {
    /// Load the configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "apiKey": "abc123",
        "authDomain": "demo.firebaseapp.com",
        "databaseURL": "https://demo.firebaseio.com",
        "storageBucket": "demo.appspot.com"
    }"#;

    #[test]
    fn test_parse_console_config() {
        let config: SyncConfig = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.database_url, "https://demo.firebaseio.com");
    }

    #[test]
    fn test_missing_field_is_error() {
        assert!(serde_json::from_str::<SyncConfig>(r#"{"apiKey": "x"}"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firebase_config.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = SyncConfig::from_file(&path).unwrap();
        assert_eq!(config.auth_domain, "demo.firebaseapp.com");
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(SyncConfig::from_file("/nonexistent/config.json").is_err());
    }
}
