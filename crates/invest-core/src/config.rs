// Configuration structures for the investment threshold analyzer

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Analysis-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data_path: PathBuf,
    pub stop_loss: f64,
    pub include_flagged: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/observations.csv"),
            stop_loss: 0.3,
            include_flagged: false,
        }
    }
}

/// Grid-search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub step: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            x_min: 20_000.0,
            x_max: 1_000_000.0,
            y_min: 20_000.0,
            y_max: 1_000_000.0,
            step: 10_000.0,
        }
    }
}

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analysis: AnalysisConfig,
    pub search: SearchConfig,
}

impl Settings {
    /// Load settings from YAML config file
    pub fn from_yaml(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml_ng::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from environment variable CONFIG_FILE or default config.yaml
    pub fn load() -> anyhow::Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.yaml".to_string());
        Self::from_yaml(&config_file)
    }

    /// Load settings with environment variable overrides
    pub fn load_with_env() -> anyhow::Result<Self> {
        let mut settings = Self::load().unwrap_or_default();

        if let Ok(path) = std::env::var("INVEST_DATA_PATH") {
            settings.analysis.data_path = PathBuf::from(path);
        }

        if let Ok(stop_loss) = std::env::var("INVEST_STOP_LOSS") {
            if let Ok(value) = stop_loss.parse() {
                settings.analysis.stop_loss = value;
            }
        }

        if let Ok(step) = std::env::var("INVEST_SEARCH_STEP") {
            if let Ok(value) = step.parse() {
                settings.search.step = value;
            }
        }

        Ok(settings)
    }

    /// Save settings to YAML file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml_ng::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.analysis.stop_loss, 0.3);
        assert!(!settings.analysis.include_flagged);
        assert_eq!(settings.search.step, 10_000.0);
        assert_eq!(settings.search.x_min, 20_000.0);
    }

    #[test]
    fn test_serialize_deserialize() {
        let settings = Settings::default();
        let yaml = serde_yaml_ng::to_string(&settings).unwrap();
        let deserialized: Settings = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(deserialized.analysis.stop_loss, settings.analysis.stop_loss);
        assert_eq!(deserialized.search.x_max, settings.search.x_max);
    }

    #[test]
    fn test_yaml_roundtrip_via_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut settings = Settings::default();
        settings.analysis.stop_loss = 0.5;
        settings.save(&path).unwrap();
        let loaded = Settings::from_yaml(&path).unwrap();
        assert_eq!(loaded.analysis.stop_loss, 0.5);
    }
}
