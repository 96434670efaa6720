use std::path::Path;

use flow_core::Origin;
use serde_json::json;
use tracing::debug;

use crate::{
    AppSettings, Error, Result,
    json::{json_difference, merge_non_null_json_value},
};

pub const SETTINGS_FILE: &str = "settings.json";

pub(crate) static DEFAULTS: &str = include_str!("../assets/defaults.jsonc");

impl AppSettings {
    /// Built-in defaults with no customizations applied.
    pub fn defaults() -> Result<Self> {
        let defaults: serde_json::Value = serde_json_lenient::from_str(DEFAULTS)?;
        let settings: AppSettings = serde_json::from_value(defaults)?;
        Ok(settings)
    }

    /// Loads defaults, merges the user file over them and applies environment
    /// overrides. A missing file is created empty.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            create_dirs_then_write(config_path, "{}\n")?;
        }

        let customizations: serde_json::Value =
            serde_json_lenient::from_str(&read(config_path)?)?;
        let mut settings: serde_json::Value = serde_json_lenient::from_str(DEFAULTS)?;

        merge_non_null_json_value(customizations, &mut settings);

        let mut app_settings: AppSettings = serde_json::from_value(settings)?;
        app_settings.apply_overrides(|key| std::env::var(key).ok())?;
        app_settings.validate()?;

        debug!(path = %config_path.display(), "settings loaded");
        Ok(app_settings)
    }

    pub fn load_from_default_path_creating() -> Result<Self> {
        let config_dir = dirs::config_dir().ok_or(Error::NoConfigDir)?.join("social-client");
        AppSettings::load(config_dir.join(SETTINGS_FILE).as_path())
    }

    /// `API_BASE_URL` and `APP_ORIGIN` take precedence over anything on disk.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(endpoint) = lookup("API_BASE_URL") {
            self.api.endpoint = endpoint;
        }
        if let Some(origin) = lookup("APP_ORIGIN") {
            self.api.app_origin = Origin::parse(&origin).map_err(|e| Error::Invalid {
                key: "APP_ORIGIN",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.payment.max_attempts == 0 {
            return Err(Error::Invalid {
                key: "payment.maxAttempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.api.endpoint.trim().is_empty() {
            return Err(Error::Invalid {
                key: "api.endpoint",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Save only values that differ from what is currently on disk.
    pub fn save(&self, config_path: &Path) -> Result<()> {
        let current = serde_json::to_value(AppSettings::load(config_path)?)?;
        let update = serde_json::to_value(self)?;
        let diff = json_difference(current, &update);

        if diff == json!({}) {
            return Ok(());
        }

        let mut customizations: serde_json::Value =
            serde_json_lenient::from_str(&read(config_path)?)?;

        // TODO: comments in the user file are lost on save
        merge_non_null_json_value(diff, &mut customizations);
        create_dirs_then_write(config_path, serde_json::to_string_pretty(&customizations)?)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_owned(),
        source,
    })
}

fn create_dirs_then_write(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    let write_err = |source| Error::Write {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, contents).map_err(write_err)
}
