//! Realtime database REST client.
//!
//! Thin async wrapper over the Firebase JSON REST surface: every node of
//! the tree is addressable as `{database_url}/{path}.json`, GET reads,
//! PUT replaces, PATCH merges, DELETE removes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

const BUILT_KEYS_NODE: &str = "Built Keys";
const USERS_NODE: &str = "Users";

/// Async client for a Firebase-style realtime database.
pub struct RealtimeDatabase {
    client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
}

impl RealtimeDatabase {
    /// Create a client from connection settings.
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.database_url.trim_end_matches('/').to_string(),
            auth: None,
        }
    }

    /// Attach an auth token, sent as the `auth` query parameter.
    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(token.into());
        self
    }

    /// The REST URL for a slash-separated database path.
    fn url(&self, path: &str) -> SyncResult<String> {
        validate_path(path)?;
        let mut url = format!("{}/{}.json", self.base_url, path);
        if let Some(token) = &self.auth {
            url.push_str("?auth=");
            url.push_str(token);
        }
        Ok(url)
    }

    /// Read the value at a path, `None` when the node does not exist.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> SyncResult<Option<T>> {
        let url = self.url(path)?;
        let value: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // The database returns literal null for absent nodes
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Replace the value at a path.
    pub async fn set<T: Serialize + ?Sized>(&self, path: &str, data: &T) -> SyncResult<()> {
        let url = self.url(path)?;
        self.client
            .put(&url)
            .json(data)
            .send()
            .await?
            .error_for_status()?;
        log::debug!("set {}", path);
        Ok(())
    }

    /// Merge the given children into the node at a path.
    pub async fn update<T: Serialize + ?Sized>(&self, path: &str, data: &T) -> SyncResult<()> {
        let url = self.url(path)?;
        self.client
            .patch(&url)
            .json(data)
            .send()
            .await?
            .error_for_status()?;
        log::debug!("update {}", path);
        Ok(())
    }

    /// Remove the node at a path.
    pub async fn remove(&self, path: &str) -> SyncResult<()> {
        let url = self.url(path)?;
        self.client.delete(&url).send().await?.error_for_status()?;
        log::debug!("remove {}", path);
        Ok(())
    }

    /// Upload selected top-level keys of a JSON document under a parent
    /// node, one child per key.
    pub async fn set_from_file<P: AsRef<Path>>(
        &self,
        file: P,
        parent: &str,
        keys: &[&str],
    ) -> SyncResult<()> {
        let content = std::fs::read_to_string(file)?;
        let document: Value = serde_json::from_str(&content)?;

        for &key in keys {
            let value = document
                .get(key)
                .ok_or_else(|| SyncError::MissingKey(key.to_string()))?;
            self.set(&format!("{}/{}", parent, key), value).await?;
        }
        Ok(())
    }

    /// The node keys marked as built on site.
    pub async fn built_keys(&self) -> SyncResult<Vec<String>> {
        let keys: Option<BTreeMap<String, String>> = self.get(BUILT_KEYS_NODE).await?;
        Ok(keys.map(|m| m.into_values().collect()).unwrap_or_default())
    }

    /// Replace the set of built keys.
    pub async fn set_built_keys(&self, keys: &[String]) -> SyncResult<()> {
        let data: BTreeMap<&str, &str> = keys.iter().map(|k| (k.as_str(), k.as_str())).collect();
        self.set(BUILT_KEYS_NODE, &data).await
    }

    /// Mark a single key as built, leaving the others untouched.
    pub async fn add_built_key(&self, key: &str) -> SyncResult<()> {
        let mut data = BTreeMap::new();
        data.insert(key, key);
        self.update(BUILT_KEYS_NODE, &data).await
    }

    /// Unmark a built key.
    pub async fn remove_built_key(&self, key: &str) -> SyncResult<()> {
        self.remove(&format!("{}/{}", BUILT_KEYS_NODE, key)).await
    }

    /// Ids of the connected users.
    pub async fn user_ids(&self) -> SyncResult<Vec<String>> {
        let users: Option<BTreeMap<String, Value>> = self.get(USERS_NODE).await?;
        Ok(users.map(|m| m.into_keys().collect()).unwrap_or_default())
    }

    /// The given attribute of every connected user, where present.
    pub async fn user_attributes(&self, attribute: &str) -> SyncResult<Vec<Value>> {
        let users: Option<BTreeMap<String, Value>> = self.get(USERS_NODE).await?;
        Ok(users
            .map(|m| {
                m.into_values()
                    .filter_map(|user| user.get(attribute).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Validate a slash-separated database path.
///
/// Segments must be non-empty and free of the characters the database
/// forbids in keys.
fn validate_path(path: &str) -> SyncResult<()> {
    if path.is_empty() {
        return Err(SyncError::InvalidPath(path.to_string()));
    }
    for segment in path.split('/') {
        if segment.is_empty() || segment.contains(['.', '#', '$', '[', ']']) {
            return Err(SyncError::InvalidPath(path.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> SyncConfig {
        SyncConfig {
            api_key: "key".to_string(),
            auth_domain: "demo.firebaseapp.com".to_string(),
            database_url: "https://demo.firebaseio.com/".to_string(),
            storage_bucket: "demo.appspot.com".to_string(),
        }
    }

    #[test]
    fn test_url_building() {
        let db = RealtimeDatabase::new(&sample_config());
        assert_eq!(
            db.url("Built Keys").unwrap(),
            "https://demo.firebaseio.com/Built Keys.json"
        );
        assert_eq!(
            db.url("scenes/demo/nodes").unwrap(),
            "https://demo.firebaseio.com/scenes/demo/nodes.json"
        );
    }

    #[test]
    fn test_url_with_auth_token() {
        let db = RealtimeDatabase::new(&sample_config()).with_auth("token123");
        assert_eq!(
            db.url("Users").unwrap(),
            "https://demo.firebaseio.com/Users.json?auth=token123"
        );
    }

    #[tokio::test]
    async fn test_set_from_file_rejects_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, r#"{"nodes": {}}"#).unwrap();

        // Fails on key lookup, before anything touches the network
        let db = RealtimeDatabase::new(&sample_config());
        let err = db
            .set_from_file(&path, "scenes", &["missing"])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingKey(_)));
    }

    #[test]
    fn test_invalid_paths_rejected() {
        let db = RealtimeDatabase::new(&sample_config());
        for path in ["", "a//b", "/leading", "trailing/", "bad$key", "dots.are.bad"] {
            assert!(
                matches!(db.url(path), Err(SyncError::InvalidPath(_))),
                "path {:?} should be rejected",
                path
            );
        }
    }
}
