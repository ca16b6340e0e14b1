//! Settings and session-state persistence.

use anyhow::{Context, Result};
use shared::session::SessionState;
use shared::settings::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};

/// Platform config directory, e.g. ~/.config/concierge on Linux
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com.local", "Concierge", "Concierge")
        .map(|proj| proj.config_dir().to_path_buf())
}

pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("settings.json"))
}

pub fn session_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("session.json"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

/// Load settings from `path`, falling back to defaults. A fresh install gets
/// the defaults written out so they can be edited.
pub fn load_settings_from(path: &Path) -> AppSettings {
    if path.exists() {
        match read_json(path) {
            Ok(settings) => return settings,
            Err(e) => tracing::warn!("ignoring unreadable settings: {:#}", e),
        }
        return AppSettings::default();
    }

    let settings = AppSettings::default();
    if let Err(e) = write_json(path, &settings) {
        tracing::warn!("could not write default settings: {:#}", e);
    }
    settings
}

pub fn load_settings_or_default() -> AppSettings {
    match settings_path() {
        Some(path) => load_settings_from(&path),
        None => AppSettings::default(),
    }
}

pub fn load_session_state_from(path: &Path) -> SessionState {
    if !path.exists() {
        return SessionState::default();
    }
    read_json(path).unwrap_or_else(|e| {
        tracing::warn!("ignoring unreadable session state: {:#}", e);
        SessionState::default()
    })
}

pub fn load_session_state() -> SessionState {
    session_path()
        .map(|path| load_session_state_from(&path))
        .unwrap_or_default()
}

pub fn save_session_state(state: &SessionState) {
    if let Some(path) = session_path() {
        if let Err(e) = write_json(&path, state) {
            tracing::warn!("could not save session state: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_install_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = load_settings_from(&path);
        assert_eq!(settings.model.gemini_model, "gemini-3-flash-preview");
        assert!(path.exists());
    }

    #[test]
    fn test_settings_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = AppSettings::default();
        settings.generation.base_temperature = 0.3;
        write_json(&path, &settings).unwrap();

        assert_eq!(load_settings_from(&path).generation.base_temperature, 0.3);
    }

    #[test]
    fn test_corrupt_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = dir.path().join("settings.json");
        let session = dir.path().join("session.json");
        fs::write(&settings, "{not json").unwrap();
        fs::write(&session, "admin").unwrap();

        assert_eq!(load_settings_from(&settings).apology, AppSettings::default().apology);
        assert_eq!(load_session_state_from(&session), SessionState::default());
    }

    #[test]
    fn test_session_state_missing_file() {
        let dir = TempDir::new().unwrap();
        let state = load_session_state_from(&dir.path().join("session.json"));
        assert!(!state.admin_unlocked);
    }
}
