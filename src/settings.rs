//! Settings and credential resolution.
//!
//! Handles:
//! - `.env.local` / `.env` loading
//! - API key lookup (env var, legacy env var, OS keychain via keyring)
//! - API key status shown at startup
//! - Model and data directory selection

use crate::llm::gemini::{GEMINI_ENV_KEY, GEMINI_MODEL};
use serde::Serialize;
use std::path::PathBuf;

/// Key name used by the browser-era `.env` files.
pub const LEGACY_API_KEY_ENV: &str = "VITE_GEMINI_API_KEY";
pub const MODEL_ENV: &str = "GEMINI_MODEL";
pub const DATA_DIR_ENV: &str = "UI_REFINE_DATA_DIR";

const KEYRING_SERVICE: &str = "ui-refine";
const KEYRING_USER: &str = "gemini";

/// Load `.env.local`, else `.env`, from the working directory.
///
/// Returns the file that was loaded, if any.
pub fn load_env_files() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    for env_file in [".env.local", ".env"] {
        let path = cwd.join(env_file);
        if path.exists() {
            match dotenvy::from_path(&path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            return Some(path);
        }
    }
    None
}

// ── Resolution ───────────────────────────────────────────────────────

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: String,
    pub data_dir: PathBuf,
}

impl Settings {
    /// Read settings from the process environment and the OS keychain.
    pub fn from_env() -> Self {
        let env = |name: &str| std::env::var(name).ok();
        Self {
            api_key: resolve_api_key_with(env).or_else(keychain_api_key),
            model: resolve_model_with(env),
            data_dir: resolve_data_dir_with(env),
        }
    }

    pub fn api_key_status(&self) -> ApiKeyStatus {
        ApiKeyStatus::from_key(self.api_key.as_deref())
    }
}

/// First non-blank of `GEMINI_API_KEY` and `VITE_GEMINI_API_KEY`.
pub fn resolve_api_key_with<F>(env: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    [GEMINI_ENV_KEY, LEGACY_API_KEY_ENV]
        .into_iter()
        .filter_map(|name| env(name))
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
}

pub fn resolve_model_with<F>(env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env(MODEL_ENV)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| GEMINI_MODEL.to_string())
}

pub fn resolve_data_dir_with<F>(env: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    match env(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ui-refine"),
    }
}

fn keychain_api_key() -> Option<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).ok()?;
    match entry.get_password() {
        Ok(key) if !key.trim().is_empty() => {
            log::info!("[SETTINGS] Loaded Gemini key from OS keychain");
            Some(key)
        }
        Ok(_) => None,
        Err(e) => {
            log::debug!("[SETTINGS] No keychain entry: {}", e);
            None
        }
    }
}

/// Save an API key to the OS keychain.
pub fn save_api_key(api_key: &str) -> Result<(), String> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err("API key must not be empty".to_string());
    }
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .map_err(|e| format!("Keyring error: {}", e))?;
    entry
        .set_password(api_key)
        .map_err(|e| format!("Failed to save key: {}", e))?;
    log::info!("[SETTINGS] Gemini API key saved to OS keychain");
    Ok(())
}

// ── Status ───────────────────────────────────────────────────────────

/// Startup check result, shown as a banner on every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKeyStatus {
    pub configured: bool,
    pub message: String,
}

impl ApiKeyStatus {
    pub fn from_key(api_key: Option<&str>) -> Self {
        Self::from_configured(api_key.is_some_and(|k| !k.trim().is_empty()))
    }

    pub fn from_configured(configured: bool) -> Self {
        if configured {
            Self {
                configured: true,
                message: "API Key is configured.".to_string(),
            }
        } else {
            Self {
                configured: false,
                message: format!(
                    "Error: Gemini API Key ({}) is not configured. Analysis will not work.",
                    GEMINI_ENV_KEY
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn primary_key_wins() {
        let env = env_of(&[(GEMINI_ENV_KEY, "primary"), (LEGACY_API_KEY_ENV, "legacy")]);
        assert_eq!(resolve_api_key_with(env).as_deref(), Some("primary"));
    }

    #[test]
    fn blank_primary_falls_back_to_legacy() {
        let env = env_of(&[(GEMINI_ENV_KEY, "  "), (LEGACY_API_KEY_ENV, "legacy")]);
        assert_eq!(resolve_api_key_with(env).as_deref(), Some("legacy"));
    }

    #[test]
    fn no_key_resolves_none() {
        assert_eq!(resolve_api_key_with(env_of(&[])), None);
    }

    #[test]
    fn model_override() {
        assert_eq!(resolve_model_with(env_of(&[])), GEMINI_MODEL);
        assert_eq!(
            resolve_model_with(env_of(&[(MODEL_ENV, "gemini-2.5-pro")])),
            "gemini-2.5-pro"
        );
    }

    #[test]
    fn data_dir_override() {
        let dir = resolve_data_dir_with(env_of(&[(DATA_DIR_ENV, "/tmp/ui-refine-test")]));
        assert_eq!(dir, PathBuf::from("/tmp/ui-refine-test"));
        assert!(resolve_data_dir_with(env_of(&[])).ends_with("ui-refine"));
    }

    #[test]
    fn status_messages() {
        assert!(ApiKeyStatus::from_key(Some("k")).configured);
        let missing = ApiKeyStatus::from_key(None);
        assert!(!missing.configured);
        assert!(missing.message.contains(GEMINI_ENV_KEY));
        assert_eq!(ApiKeyStatus::from_key(Some("  ")), missing);
        assert_eq!(ApiKeyStatus::from_configured(true), ApiKeyStatus::from_key(Some("k")));
    }
}
