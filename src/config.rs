//! Default constants and the on-disk client configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
pub const DEFAULT_DATABASE_ID: &str = "collection";
pub const DEFAULT_COLLECTION_ID: &str = "owned_cards";

/// Delay after the last edit to a card before its amount is written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Upper bound suggested to quantity inputs. Not enforced.
pub const MAX_SUGGESTED_AMOUNT: u32 = 99;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_NAMESPACE: &str = "translation";
pub const DEFAULT_LOAD_PATH: &str = "/locales/{{lng}}/{{ns}}.json";

/// Connection settings for the remote document store.
///
/// Every field is optional in the JSON file; missing fields take the
/// defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: Option<String>,
    pub database_id: String,
    pub collection_id: String,
    pub debounce_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project_id: String::new(),
            api_key: None,
            database_id: DEFAULT_DATABASE_ID.to_string(),
            collection_id: DEFAULT_COLLECTION_ID.to_string(),
            debounce_ms: u64::try_from(DEFAULT_DEBOUNCE.as_millis()).unwrap_or(u64::MAX),
            timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Read a configuration file written as JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the configuration as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(config) = dirs::config_dir() {
        config.join("card-collection-sdk").join("config.json")
    } else {
        PathBuf::from(".card-collection-sdk.json")
    }
}
