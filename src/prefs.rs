//! User preferences: saved recipient addresses and display settings

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::store::{load_json, save_json, KeyValueStore, RECIPIENTS_KEY, SETTINGS_KEY};

/// How many recipient addresses are remembered
pub const MAX_SAVED_RECIPIENTS: usize = 5;

/// Recently used recipient addresses, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedRecipients(Vec<String>);

impl SavedRecipients {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json(store, RECIPIENTS_KEY).unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), BridgeError> {
        save_json(store, RECIPIENTS_KEY, self)
    }

    /// Move (or insert) `address` to the front, dropping the oldest past the cap.
    pub fn remember(&mut self, address: &str) {
        let address = address.trim();
        if address.is_empty() {
            return;
        }
        self.0.retain(|a| !a.eq_ignore_ascii_case(address));
        self.0.insert(0, address.to_string());
        self.0.truncate(MAX_SAVED_RECIPIENTS);
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub language: String,
    pub theme: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            theme: "light".to_string(),
        }
    }
}

impl Settings {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_json(store, SETTINGS_KEY).unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), BridgeError> {
        save_json(store, SETTINGS_KEY, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;

    #[test]
    fn test_remember_is_mru_and_bounded() {
        let mut saved = SavedRecipients::default();
        for i in 0..7 {
            saved.remember(&format!("0x{:040x}", i));
        }
        assert_eq!(saved.as_slice().len(), MAX_SAVED_RECIPIENTS);
        assert_eq!(saved.as_slice()[0], format!("0x{:040x}", 6));
        assert_eq!(saved.as_slice()[4], format!("0x{:040x}", 2));
    }

    #[test]
    fn test_remember_dedupes_case_insensitively() {
        let mut saved = SavedRecipients::default();
        saved.remember("0xAbC");
        saved.remember("0xdef");
        saved.remember("0xabc");
        assert_eq!(saved.as_slice(), &["0xabc".to_string(), "0xdef".to_string()]);

        saved.remember("   ");
        assert_eq!(saved.as_slice().len(), 2);
    }

    #[test]
    fn test_persisted_prefs_roundtrip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        assert_eq!(Settings::load(&store), Settings::default());
        let settings = Settings {
            language: "zh".into(),
            theme: "dark".into(),
        };
        settings.save(&store).unwrap();
        assert_eq!(Settings::load(&store), settings);

        let mut saved = SavedRecipients::default();
        saved.remember("0x1");
        saved.save(&store).unwrap();
        assert_eq!(SavedRecipients::load(&store).as_slice(), &["0x1".to_string()]);
    }
}
