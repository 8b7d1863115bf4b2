//! Notification settings document (`settings/whatsapp`).

use std::sync::Arc;

use crate::domain::aggregates::NotificationSettings;
use crate::store::{self, DocumentStore, StoreError, SETTINGS};

pub const NOTIFICATION_SETTINGS_ID: &str = "whatsapp";

pub struct SettingsService {
    store: Arc<dyn DocumentStore>,
    default_contact: String,
}

impl SettingsService {
    pub fn new(store: Arc<dyn DocumentStore>, default_contact: impl Into<String>) -> Self {
        Self { store, default_contact: default_contact.into() }
    }

    pub fn defaults(&self) -> NotificationSettings { NotificationSettings::new(self.default_contact.clone()) }

    /// Stored settings, or the defaults when none were saved yet. A blank stored number
    /// falls back to the default contact.
    pub async fn load(&self) -> Result<NotificationSettings, StoreError> {
        let stored: Option<NotificationSettings> = store::fetch(self.store.as_ref(), SETTINGS, NOTIFICATION_SETTINGS_ID).await?;
        Ok(match stored {
            Some(mut s) => {
                if s.phone_number.trim().is_empty() { s.phone_number = self.default_contact.clone(); }
                s
            }
            None => self.defaults(),
        })
    }

    /// Like `load`, but a read failure is logged and answered with the defaults.
    pub async fn load_or_default(&self) -> NotificationSettings {
        self.load().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Error fetching settings, using defaults");
            self.defaults()
        })
    }

    pub async fn save(&self, settings: &NotificationSettings) -> Result<(), StoreError> {
        self.store.set(SETTINGS, NOTIFICATION_SETTINGS_ID, store::encode(settings)?).await?;
        tracing::info!(enabled = settings.enabled, "notification settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_defaults_then_saved_values() {
        let store = Arc::new(MemoryStore::new());
        let settings = SettingsService::new(store.clone(), "+2348052465801");
        assert_eq!(settings.load().await.unwrap(), NotificationSettings::new("+2348052465801"));

        let custom = NotificationSettings { phone_number: "+2348099999999".into(), enabled: false };
        settings.save(&custom).await.unwrap();
        assert_eq!(settings.load().await.unwrap(), custom);

        store.inject_fault(SETTINGS);
        assert!(settings.load().await.is_err());
        assert_eq!(settings.load_or_default().await, settings.defaults());
    }
}
