use crate::utils::error::{MenuError, Result};
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row of the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub name: String,
    pub additives_description: String,
    pub price: String,
    pub image_urls: Vec<String>,
}

impl MenuItem {
    pub fn from_record(record: LunchRecord) -> Self {
        Self {
            additives_description: record.additives.join(", "),
            name: record.name,
            price: record.price_student,
            image_urls: record.images,
        }
    }
}

/// Wire shape of a single entry in `/lunches/list/{date}/{location}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LunchRecord {
    pub name: String,
    #[serde(default)]
    pub additives: Vec<String>,
    #[serde(rename = "priceStudent")]
    pub price_student: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Cafeterias served by the API. The discriminant is the wire index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    Schlossgarten = 0,
    Westerberg = 1,
    Haste = 2,
    Caprivi = 3,
    Vechta = 4,
}

impl Location {
    pub const ALL: [Location; 5] = [
        Location::Schlossgarten,
        Location::Westerberg,
        Location::Haste,
        Location::Caprivi,
        Location::Vechta,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Location::Schlossgarten => "Schlossgarten",
            Location::Westerberg => "Westerberg",
            Location::Haste => "Haste",
            Location::Caprivi => "Caprivi",
            Location::Vechta => "Vechta",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Location {
    type Err = MenuError;

    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();
        if let Ok(index) = input.parse::<usize>() {
            return Self::from_index(index).ok_or_else(|| MenuError::UnknownLocation {
                input: input.to_string(),
            });
        }
        Self::ALL
            .iter()
            .copied()
            .find(|location| location.name().eq_ignore_ascii_case(input))
            .ok_or_else(|| MenuError::UnknownLocation {
                input: input.to_string(),
            })
    }
}

/// Language of the window title and status messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Locale {
    #[default]
    En,
    De,
}

impl Locale {
    pub fn loading_message(self) -> &'static str {
        match self {
            Locale::En => "Loading ...",
            Locale::De => "Laden ...",
        }
    }

    pub fn title(self, date: NaiveDate) -> String {
        let today = match self {
            Locale::En => "Today",
            Locale::De => "Heute",
        };
        format!("{}, {}", today, date.format("%d.%m.%Y"))
    }
}

/// A single outbound call. Lives only as long as the call itself.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub api_key: Option<String>,
}

/// Monotonic tag handed out by the fetcher for every `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Terminal payload of one request. Any combination of the three slots may be
/// absent: transport failures carry only `error`, HTTP answers carry `status`
/// and usually `body`.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub status: Option<StatusCode>,
    pub body: Option<Vec<u8>>,
    pub error: Option<MenuError>,
}

#[derive(Debug)]
pub enum FetchEvent {
    Started { id: RequestId },
    FallbackData { id: RequestId },
    Finished { id: RequestId, outcome: FetchOutcome },
}

impl FetchEvent {
    pub fn id(&self) -> RequestId {
        match self {
            FetchEvent::Started { id }
            | FetchEvent::FallbackData { id }
            | FetchEvent::Finished { id, .. } => *id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FetchEvent::Started { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Rendered,
    FallbackRendered,
    ErrorRendered,
}

impl Phase {
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            Phase::Rendered | Phase::FallbackRendered | Phase::ErrorRendered
        )
    }
}

/// Everything the controller owns between fetches.
#[derive(Debug, Clone)]
pub struct MenuState {
    pub date: NaiveDate,
    pub location: Location,
    pub items: Vec<MenuItem>,
    pub phase: Phase,
    pub title: String,
    pub latest_request: Option<RequestId>,
}

impl MenuState {
    pub fn new(date: NaiveDate, location: Location) -> Self {
        Self {
            date,
            location,
            items: Vec::new(),
            phase: Phase::Idle,
            title: String::new(),
            latest_request: None,
        }
    }
}
