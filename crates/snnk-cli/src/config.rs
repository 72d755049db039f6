//! Persisted CLI configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Persisted CLI configuration, loaded from `~/.config/snnk/config.toml`
/// (or a path passed via `--config`).
#[derive(Debug, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default number of local threads for `simulate` when `--threads` is
    /// not given.
    pub default_threads: Option<usize>,
    /// Default logging level.
    pub log_level: Option<String>,
    /// User preferences.
    pub preferences: UserPreferences,
}

/// Output/formatting preferences.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Use colored terminal output.
    pub use_colors: bool,
    /// Default report format (`text` or `json`).
    pub output_format: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            default_threads: Some(1),
            log_level: Some("info".to_string()),
            preferences: UserPreferences {
                use_colors: true,
                output_format: "text".to_string(),
            },
        }
    }
}

impl CliConfig {
    /// Load configuration from `path`, or fall back to defaults if the file
    /// does not exist.
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| CliError::config(format!("invalid config file: {e}")))
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize this configuration to `path`, creating parent directories
    /// as needed.
    pub fn save_to_file(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("failed to serialize config: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The default config file location, `$XDG_CONFIG_HOME/snnk/config.toml`.
    pub fn default_config_path() -> CliResult<std::path::PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::config("could not determine config directory"))?;
        Ok(config_dir.join("snnk").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = CliConfig::load_from_file(Path::new("/nonexistent/snnk/config.toml")).unwrap();
        assert_eq!(cfg.default_threads, Some(1));
    }

    #[test]
    fn round_trips_through_a_temp_file() {
        let dir = std::env::temp_dir().join(format!("snnk-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut cfg = CliConfig::default();
        cfg.default_threads = Some(4);
        cfg.save_to_file(&path).unwrap();
        let loaded = CliConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.default_threads, Some(4));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
