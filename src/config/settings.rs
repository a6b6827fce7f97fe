use async_trait::async_trait;
use log::{ debug, info };
use std::collections::HashMap;
use std::path::{ Path, PathBuf };
use tokio::sync::Mutex;

use crate::error::ChatError;

pub const API_KEY_SETTING: &str = "api_key";

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ChatError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), ChatError>;
}

/// Key/value settings kept in a JSON object on disk.
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonSettingsStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref().to_path_buf();
        let values = match tokio::fs::read_to_string(&path).await {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!("Settings loaded from {}", path.display());
        Ok(Self { path, values: Mutex::new(values) })
    }

    async fn persist(&self, values: &HashMap<String, String>) -> Result<(), ChatError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Settings written to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        let mut values = self.values.lock().await;
        let mut updated = values.clone();
        updated.insert(key.to_string(), value.to_string());
        self.persist(&updated).await?;
        *values = updated;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        self.values.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_settings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonSettingsStore::open(&path).await.unwrap();
        assert_eq!(store.get(API_KEY_SETTING).await.unwrap(), None);
        store.set(API_KEY_SETTING, "sk-test").await.unwrap();

        let reopened = JsonSettingsStore::open(&path).await.unwrap();
        assert_eq!(reopened.get(API_KEY_SETTING).await.unwrap(), Some("sk-test".to_string()));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("settings.json");
        let store = JsonSettingsStore::open(&path).await.unwrap();
        store.set(API_KEY_SETTING, "sk-old").await.unwrap();
        assert!(!dir.path().join("sub").join("settings.json.tmp").exists());

        tokio::fs::remove_dir_all(dir.path().join("sub")).await.unwrap();
        tokio::fs::write(dir.path().join("sub"), "").await.unwrap();

        assert!(store.set(API_KEY_SETTING, "sk-new").await.is_err());
        assert_eq!(store.get(API_KEY_SETTING).await.unwrap(), Some("sk-old".to_string()));
    }

    #[tokio::test]
    async fn test_corrupt_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "not json").await.unwrap();
        assert!(matches!(JsonSettingsStore::open(&path).await, Err(ChatError::Json(_))));
    }

    #[tokio::test]
    async fn test_memory_settings() {
        let store = MemorySettingsStore::new();
        store.set(API_KEY_SETTING, "a").await.unwrap();
        store.set(API_KEY_SETTING, "b").await.unwrap();
        assert_eq!(store.get(API_KEY_SETTING).await.unwrap(), Some("b".to_string()));
    }
}
