pub mod settings;

use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::error::ChatError;
use self::settings::{ JsonSettingsStore, SettingsStore, API_KEY_SETTING };

pub const SETTINGS_FILE: &str = "settings.json";

/// Opens the settings file under `data_dir` and seeds the API key when one was
/// supplied on the command line or through the environment.
pub async fn initialize_settings_store(
    data_dir: &Path,
    api_key: Option<&str>
) -> Result<Arc<dyn SettingsStore>, ChatError> {
    let store = JsonSettingsStore::open(data_dir.join(SETTINGS_FILE)).await?;
    if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
        store.set(API_KEY_SETTING, key).await?;
        info!("API key taken from configuration");
    }
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeds_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = initialize_settings_store(dir.path(), Some(" sk-env ")).await.unwrap();
        assert_eq!(store.get(API_KEY_SETTING).await.unwrap(), Some("sk-env".to_string()));

        let store = initialize_settings_store(dir.path(), Some("")).await.unwrap();
        assert_eq!(store.get(API_KEY_SETTING).await.unwrap(), Some("sk-env".to_string()));
    }
}
