use anyhow::{Context, Result, anyhow};
use chrono::NaiveTime;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Longest date range the NBP API serves in a single query.
pub const MAX_WINDOW_DAYS: i64 = 93;
/// Most decimal places a cross-rate can be rounded to without exceeding `f64` precision.
pub const MAX_PRECISION: u32 = 15;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NbpProviderConfig {
    pub base_url: String,
    pub table: String,
    pub timeout_secs: u64,
    pub retries: usize,
}

impl Default for NbpProviderConfig {
    fn default() -> Self {
        NbpProviderConfig {
            base_url: "http://api.nbp.pl".to_string(),
            table: "a".to_string(),
            timeout_secs: 30,
            retries: 0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CrossRatesConfig {
    pub target: String,
    pub convert: Vec<String>,
}

impl Default for CrossRatesConfig {
    fn default() -> Self {
        CrossRatesConfig {
            target: "USD".to_string(),
            convert: vec!["EUR".to_string(), "CHF".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub all: PathBuf,
    pub selected: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            all: PathBuf::from("all_currency_data.csv"),
            selected: PathBuf::from("selected_currency_data.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub provider: NbpProviderConfig,
    pub currencies: Vec<String>,
    pub cross_rates: CrossRatesConfig,
    pub window_days: i64,
    pub precision: u32,
    /// Local wall-clock time of the daily refresh, `HH:MM`.
    pub refresh_at: String,
    pub output: OutputConfig,
    pub save_prompt_attempts: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            provider: NbpProviderConfig::default(),
            currencies: vec!["EUR".to_string(), "USD".to_string(), "CHF".to_string()],
            cross_rates: CrossRatesConfig::default(),
            window_days: 60,
            precision: 4,
            refresh_at: "12:00".to_string(),
            output: OutputConfig::default(),
            save_prompt_attempts: 3,
        }
    }
}

impl AppConfig {
    /// Loads the default config file, falling back to built-in defaults when absent.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("pl", "nbp-rates", "nbp-rates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn refresh_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.refresh_at, "%H:%M")
            .with_context(|| format!("Invalid refresh_at time: '{}'", self.refresh_at))
    }

    fn validate(&self) -> Result<()> {
        if self.currencies.is_empty() {
            return Err(anyhow!("At least one currency must be configured"));
        }
        if self.window_days < 1 {
            return Err(anyhow!("window_days must be positive, got {}", self.window_days));
        }
        if self.window_days > MAX_WINDOW_DAYS {
            return Err(anyhow!(
                "window_days must be at most {MAX_WINDOW_DAYS}, got {}",
                self.window_days
            ));
        }
        if self.precision > MAX_PRECISION {
            return Err(anyhow!(
                "precision must be at most {MAX_PRECISION}, got {}",
                self.precision
            ));
        }
        let known = |code: &str| self.currencies.iter().any(|c| c.eq_ignore_ascii_case(code));
        if let Some(missing) = std::iter::once(&self.cross_rates.target)
            .chain(&self.cross_rates.convert)
            .find(|code| !known(code.as_str()))
        {
            return Err(anyhow!(
                "Cross-rate currency {missing} is not in the fetched currencies"
            ));
        }
        self.refresh_time()?;
        Ok(())
    }
}
