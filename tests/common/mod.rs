#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use studentenfutter::core::{Presenter, SettingsStore};
use studentenfutter::{
    AppConfig, Controller, ControllerOptions, Fetcher, Locale, Location, MenuItem, Result,
};

#[derive(Default)]
pub struct RecordingPresenter {
    pub titles: Vec<String>,
    pub reloads: Vec<Vec<MenuItem>>,
    pub loading: bool,
}

impl Presenter for RecordingPresenter {
    fn set_title(&mut self, title: &str) {
        self.titles.push(title.to_string());
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn reload(&mut self, items: &[MenuItem]) -> Result<()> {
        self.reloads.push(items.to_vec());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemorySettings {
    pub location: Arc<Mutex<Option<Location>>>,
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn load_location(&self) -> Result<Option<Location>> {
        Ok(*self.location.lock().unwrap())
    }

    async fn save_location(&self, location: Location) -> Result<()> {
        *self.location.lock().unwrap() = Some(location);
        Ok(())
    }
}

pub type TestController = Controller<AppConfig, MemorySettings, RecordingPresenter>;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn app_config(base_url: String, api_key: Option<&str>) -> AppConfig {
    AppConfig {
        base_url,
        api_key: api_key.map(str::to_string),
        ..AppConfig::default()
    }
}

pub fn controller(config: AppConfig, day: NaiveDate, location: Location) -> TestController {
    let options = ControllerOptions {
        base_url: config.base_url.clone(),
        locale: Locale::En,
    };
    Controller::new(
        Fetcher::new(config),
        MemorySettings::default(),
        RecordingPresenter::default(),
        options,
        day,
        location,
    )
}

pub fn names(items: &[MenuItem]) -> Vec<&str> {
    items.iter().map(|item| item.name.as_str()).collect()
}
