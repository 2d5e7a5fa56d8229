pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{settings::FileSettingsStore, AppConfig};

pub use crate::core::{
    controller::{menu_url, Command, Controller, ControllerOptions},
    fetcher::Fetcher,
};
pub use domain::model::{FetchEvent, Locale, Location, MenuItem};
pub use utils::error::{MenuError, Result};
