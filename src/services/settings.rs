//! Settings service
//!
//! Manages application settings persistence using JSON file storage:
//! flow preferences and the local user profile.

use crate::config::SETTINGS_FILE_NAME;
use crate::error::Result;
use crate::services::identity::CurrentUser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Worry-flow preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSettings {
    /// Run the cognitive-restructuring stage of the wizard
    #[serde(default = "default_restructure_enabled")]
    pub restructure_enabled: bool,
}

fn default_restructure_enabled() -> bool {
    true
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            restructure_enabled: default_restructure_enabled(),
        }
    }
}

/// All persisted settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub flow: FlowSettings,
    /// Local profile; created on first run
    #[serde(default)]
    pub profile: Option<CurrentUser>,
}

/// Loads and saves settings from the application data directory
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join(SETTINGS_FILE_NAME),
        }
    }

    /// Load settings, falling back to defaults when the file does not
    /// exist yet
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::debug!("No settings file yet, using defaults");
            return Ok(AppSettings::default());
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.settings_path, content).await?;

        tracing::debug!("Settings saved to {:?}", self.settings_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let service = SettingsService::new(temp.path().to_path_buf());

        let settings = service.load().await.unwrap();
        assert!(settings.flow.restructure_enabled);
        assert!(settings.profile.is_none());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let service = SettingsService::new(temp.path().to_path_buf());

        let mut settings = AppSettings::default();
        settings.flow.restructure_enabled = false;
        settings.profile = Some(CurrentUser {
            id: "user-1".to_string(),
            display_name: "Test User".to_string(),
        });

        service.save(&settings).await.unwrap();

        let reloaded = service.load().await.unwrap();
        assert!(!reloaded.flow.restructure_enabled);
        assert_eq!(reloaded.profile.unwrap().id, "user-1");
    }

    #[tokio::test]
    async fn test_unknown_fields_are_tolerated() {
        let temp = TempDir::new().unwrap();
        let service = SettingsService::new(temp.path().to_path_buf());

        let content = r#"{ "flow": { "restructure_enabled": false }, "theme": "dark" }"#;
        tokio::fs::write(temp.path().join(SETTINGS_FILE_NAME), content)
            .await
            .unwrap();

        let settings = service.load().await.unwrap();
        assert!(!settings.flow.restructure_enabled);
    }
}
