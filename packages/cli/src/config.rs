use domshot_capture::config::DEFAULT_CONFIG_NAME;
use domshot_capture::CaptureConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `domshot.config.json`: capture settings plus where the CLI writes files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(flatten)]
    pub capture: CaptureConfig,

    /// Output directory for .svg and preview files
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Write an HTML preview page next to each capture
    #[serde(default = "default_preview")]
    pub preview: bool,
}

fn default_out_dir() -> String {
    "screenshots".to_string()
}

fn default_preview() -> bool {
    true
}

impl Config {
    /// Load config from a directory, falling back to defaults
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn get_out_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.out_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            out_dir: default_out_dir(),
            preview: default_preview(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "padding": 4,
            "prefix": "__shot_",
            "outDir": "captures",
            "preview": false
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.capture.padding, 4.0);
        assert_eq!(config.capture.prefix, "__shot_");
        assert_eq!(config.capture.min_crop_size, 20.0);
        assert_eq!(config.out_dir, "captures");
        assert!(!config.preview);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.out_dir, "screenshots");
        assert!(config.preview);
        assert_eq!(config.capture, CaptureConfig::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load(&dir.path().display().to_string()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_NAME);
        let mut config = Config::default();
        config.capture.background = "#000".to_string();
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(Config::load_file(&path).unwrap(), config);
    }
}
