use crate::error::{ReconError, Result};
use docrecon_common::{Reconciler, Scorer, DEFAULT_FUZZY_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const THRESHOLD_ENV: &str = "DOCRECON_THRESHOLD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fuzzy pass threshold (0-100)
    pub fuzzy_threshold: u8,
    pub scorer: Scorer,
    /// How many leading rows are searched for a header keyword
    pub header_scan_rows: usize,
    pub header_keyword: String,
    /// Relative tolerance for the totals cross-check
    pub total_tolerance: f64,
    pub cache_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            scorer: Scorer::Ratio,
            header_scan_rows: 20,
            header_keyword: "LINHA DE PESQUISA".into(),
            total_tolerance: 0.01,
            cache_enabled: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        // Environment wins over the file
        if let Ok(value) = std::env::var(THRESHOLD_ENV) {
            config.fuzzy_threshold = parse_threshold(&value)?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ReconError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("docrecon").join("config.json"))
    }

    pub fn set_threshold(&mut self, threshold: u8) -> Result<()> {
        if threshold > 100 {
            return Err(ReconError::Config(format!("threshold must be 0-100, got {}", threshold)));
        }
        self.fuzzy_threshold = threshold;
        self.save()
    }

    /// Reconciler configured from this file, with an optional per-run threshold.
    pub fn reconciler(&self, threshold_override: Option<u8>) -> Reconciler {
        Reconciler::new(threshold_override.unwrap_or(self.fuzzy_threshold)).with_scorer(self.scorer)
    }
}

fn parse_threshold(value: &str) -> Result<u8> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|t| *t <= 100)
        .ok_or_else(|| ReconError::Config(format!("{} must be 0-100, got '{}'", THRESHOLD_ENV, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fuzzy_threshold, 80);
        assert_eq!(config.header_scan_rows, 20);
        assert_eq!(config.reconciler(None).threshold, 80);
        assert_eq!(config.reconciler(Some(90)).threshold, 90);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"fuzzy_threshold": 70, "scorer": "token_sort_ratio"}"#).unwrap();
        assert_eq!(config.fuzzy_threshold, 70);
        assert_eq!(config.scorer, Scorer::TokenSortRatio);
        assert_eq!(config.header_keyword, "LINHA DE PESQUISA");
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold(" 85 ").unwrap(), 85);
        assert!(parse_threshold("101").is_err());
        assert!(parse_threshold("high").is_err());
    }
}
