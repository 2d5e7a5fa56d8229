pub mod controller;
pub mod fetcher;
pub mod parse;
pub mod render;

pub use crate::domain::model::{FetchEvent, FetchOutcome, Location, MenuItem, MenuState, Phase};
pub use crate::domain::ports::{ApiKeyProvider, FetchListener, Presenter, SettingsStore};
pub use crate::utils::error::Result;
