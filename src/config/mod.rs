pub mod settings;
pub mod toml_config;

use crate::core::controller::{ControllerOptions, DEFAULT_BASE_URL};
use crate::core::render::OutputFormat;
use crate::core::ApiKeyProvider;
use crate::domain::model::Locale;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::path::PathBuf;
use std::time::Duration;
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
use crate::domain::model::Location;
#[cfg(feature = "cli")]
use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "studentenfutter")]
#[command(about = "Shows the daily cafeteria menu")]
pub struct CliConfig {
    /// Day to show (yyyy-mm-dd), defaults to today
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Cafeteria name or index; remembered for the next run
    #[arg(short, long)]
    pub location: Option<Location>,

    #[arg(long, env = "STUDENTENFUTTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub base_url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    #[arg(long, value_enum)]
    pub locale: Option<Locale>,

    #[arg(long)]
    pub settings_path: Option<PathBuf>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Read commands (next, prev, today, date, location, refresh, quit) from stdin
    #[arg(short, long)]
    pub interactive: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

/// Effective configuration after merging defaults, the TOML file and the
/// command line (in that order of precedence, lowest first).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub locale: Locale,
    pub format: OutputFormat,
    pub settings_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_seconds: None,
            locale: Locale::default(),
            format: OutputFormat::default(),
            settings_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml(file: TomlConfig) -> Self {
        let defaults = Self::default();
        Self {
            base_url: file.api.base_url.unwrap_or(defaults.base_url),
            api_key: file.api.api_key,
            timeout_seconds: file.api.timeout_seconds,
            locale: file.display.locale.unwrap_or(defaults.locale),
            format: file.display.format.unwrap_or(defaults.format),
            settings_path: file.settings.path,
        }
    }

    #[cfg(feature = "cli")]
    pub fn from_cli(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };
        Ok(Self::from_toml(file).with_cli_overrides(cli))
    }

    #[cfg(feature = "cli")]
    fn with_cli_overrides(mut self, cli: &CliConfig) -> Self {
        if let Some(base_url) = &cli.base_url {
            self.base_url = base_url.clone();
        }
        if cli.api_key.is_some() {
            self.api_key = cli.api_key.clone();
        }
        if cli.timeout_seconds.is_some() {
            self.timeout_seconds = cli.timeout_seconds;
        }
        if let Some(locale) = cli.locale {
            self.locale = locale;
        }
        if let Some(format) = cli.format {
            self.format = format;
        }
        if cli.settings_path.is_some() {
            self.settings_path = cli.settings_path.clone();
        }
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            base_url: self.base_url.clone(),
            locale: self.locale,
        }
    }
}

impl ApiKeyProvider for AppConfig {
    fn api_key(&self) -> Option<String> {
        validation::normalize_api_key(self.api_key.as_deref())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.base_url)?;
        if let Some(timeout) = self.timeout_seconds {
            validation::validate_positive_number("api.timeout_seconds", timeout, 1)?;
        }
        Ok(())
    }
}
