use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::extractors::youtube::YT_DLP;
use crate::utils::is_valid_language;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// External tool settings
    pub tool: ToolConfig,

    /// Scratch directory settings
    pub scratch: ScratchConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Path or name of the yt-dlp executable
    pub yt_dlp_path: String,

    /// Caption language used when a request does not name one
    pub default_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Directory for subtitle files produced by yt-dlp
    pub dir: Option<PathBuf>,

    /// Files older than this are removed by the sweep
    pub max_age_hours: u64,

    /// How often the sweep runs while serving; `None` sweeps only at start-up
    pub sweep_interval_minutes: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log line format
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3003,
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: YT_DLP.to_string(),
            default_language: "es".to_string(),
        }
    }
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_age_hours: 24,
            sweep_interval_minutes: Some(60),
        }
    }
}

impl Config {
    /// Load configuration from file or fall back to defaults
    ///
    /// An explicit path must exist; otherwise `./config.yaml` and then the user config
    /// directory are tried.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::config_path().ok().filter(|path| path.exists()),
        };

        let config = match path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        serde_yaml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("yt-transcript-api").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be greater than 0");
        }

        if self.tool.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("tool.yt_dlp_path must not be empty");
        }

        if !is_valid_language(&self.tool.default_language) {
            anyhow::bail!(
                "tool.default_language '{}' is not a valid language code",
                self.tool.default_language
            );
        }

        if self.scratch.max_age_hours == 0 {
            anyhow::bail!("scratch.max_age_hours must be greater than 0");
        }

        if self.scratch.sweep_interval_minutes == Some(0) {
            anyhow::bail!("scratch.sweep_interval_minutes must be greater than 0");
        }

        Ok(())
    }

    /// Scratch directory, defaulting to `temp/` under the working directory
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("temp"))
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen Address: {}:{}", self.server.host, self.server.port);
        println!("  yt-dlp: {}", self.tool.yt_dlp_path);
        println!("  Default Language: {}", self.tool.default_language);
        println!("  Scratch Directory: {}", self.scratch_dir().display());
        println!("  Max File Age: {}h", self.scratch.max_age_hours);
        match self.scratch.sweep_interval_minutes {
            Some(minutes) => println!("  Sweep Interval: {}m", minutes),
            None => println!("  Sweep Interval: start-up only"),
        }
        println!("  Log Format: {:?}", self.logging.format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3003);
        assert_eq!(config.tool.default_language, "es");
        assert_eq!(config.scratch.max_age_hours, 24);
        assert_eq!(config.scratch_dir(), PathBuf::from("temp"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            "server:\n  port: 8080\ntool:\n  default_language: en\nlogging:\n  format: json\n",
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.tool.default_language, "en");
        assert_eq!(config.tool.yt_dlp_path, "yt-dlp");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.scratch.sweep_interval_minutes, Some(60));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scratch.max_age_hours = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tool.default_language = "es;ls".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.scratch.dir = Some(tmp.path().join("scratch"));
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.scratch_dir(), tmp.path().join("scratch"));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();

        assert!(Config::load(Some(&tmp.path().join("absent.yaml"))).is_err());
    }
}
