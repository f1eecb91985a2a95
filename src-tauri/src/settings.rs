use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{notifications::NotificationConfig, utils::fs::write_atomically};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupSettings {
    #[serde(default)]
    pub launch_at_startup: bool,
    #[serde(default)]
    pub start_minimized: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    #[serde(flatten)]
    startup: StartupSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notification: Option<NotificationConfig>,
}

/// Per-user JSON settings file. Every update rewrites the whole file;
/// the last writer wins.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn startup(&self) -> StartupSettings {
        self.read().startup
    }

    pub fn notification(&self) -> Option<NotificationConfig> {
        self.read().notification.clone()
    }

    pub fn set_launch_at_startup(&self, enabled: bool) -> Result<()> {
        self.update(|data| data.startup.launch_at_startup = enabled)
    }

    pub fn set_start_minimized(&self, enabled: bool) -> Result<()> {
        self.update(|data| data.startup.start_minimized = enabled)
    }

    pub fn update_notification(&self, config: NotificationConfig) -> Result<()> {
        self.update(|data| data.notification = Some(config))
    }

    /// Keeps the stored reminder but marks it disabled.
    pub fn disable_notification(&self) -> Result<()> {
        self.update(|data| {
            if let Some(config) = data.notification.as_mut() {
                config.enabled = false;
            }
        })
    }

    fn update(&self, apply: impl FnOnce(&mut UserSettings)) -> Result<()> {
        let mut guard = self.write();
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        write_atomically(&self.path, serialized.as_bytes())
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{ReminderTime, Weekday};
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        assert_eq!(store.startup(), StartupSettings::default());
        assert!(store.notification().is_none());
    }

    #[test]
    fn startup_flags_persist_in_camel_case() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        store.set_start_minimized(true).unwrap();
        store.set_launch_at_startup(true).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({ "launchAtStartup": true, "startMinimized": true })
        );

        let reopened = SettingsStore::new(path).unwrap();
        assert!(reopened.startup().start_minimized);
        assert!(reopened.startup().launch_at_startup);
    }

    #[test]
    fn notification_config_round_trips_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();
        let config = NotificationConfig {
            enabled: true,
            time: ReminderTime::new(8, 0).unwrap(),
            days: [Weekday::Sat].into_iter().collect(),
            message: "Weekend warmup".into(),
            duration: 15,
        };

        store.update_notification(config.clone()).unwrap();
        store.disable_notification().unwrap();

        let stored = SettingsStore::new(path).unwrap().notification().unwrap();
        assert!(!stored.enabled);
        assert_eq!(stored.message, config.message);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.startup(), StartupSettings::default());
    }
}
