//! Runner configuration

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use sheetsmith_engine::CompilerSettings;

/// What the runner prints after compiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Counts per kind and any skipped records
    Summary,
    /// The full compiled rule set
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "json" => Ok(Self::Json),
            other => bail!("unknown output format '{}' (expected summary or json)", other),
        }
    }
}

/// Runner configuration loaded from environment
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub output: OutputFormat,
    /// Optional JSON file with compiler settings
    pub settings_path: Option<PathBuf>,
    /// Overrides the experience multiplier of the settings
    pub experience_multiplier: Option<f64>,
}

impl RunnerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            output: var("SHEETSMITH_OUTPUT")
                .unwrap_or_else(|| "summary".to_string())
                .parse()
                .context("SHEETSMITH_OUTPUT must be summary or json")?,
            settings_path: var("SHEETSMITH_SETTINGS")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            experience_multiplier: var("SHEETSMITH_XP_MULTIPLIER")
                .map(|value| value.trim().parse::<f64>())
                .transpose()
                .context("SHEETSMITH_XP_MULTIPLIER must be a number")?,
        })
    }

    /// Compiler settings from the configured file, or the defaults.
    pub fn load_settings(&self) -> Result<CompilerSettings> {
        let mut settings = match &self.settings_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read settings file {}", path.display()))?;
                CompilerSettings::from_json(&json)
                    .with_context(|| format!("invalid settings file {}", path.display()))?
            }
            None => CompilerSettings::default(),
        };
        if let Some(multiplier) = self.experience_multiplier {
            settings.experience_multiplier = multiplier;
        }
        settings.validate().context("invalid compiler settings")?;
        Ok(settings)
    }
}
