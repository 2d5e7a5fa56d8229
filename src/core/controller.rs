use crate::core::fetcher::Fetcher;
use crate::core::parse::{parse_menu, sample_menu};
use crate::core::{ApiKeyProvider, Presenter, SettingsStore};
use crate::domain::model::{
    FetchEvent, FetchOutcome, Locale, Location, MenuState, Phase, RequestId,
};
use crate::utils::error::{MenuError, Result};
use chrono::{Duration, Local, NaiveDate};
use reqwest::StatusCode;
use std::str::FromStr;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const DEFAULT_BASE_URL: &str = "https://api.studentenfutter-os.de/lunches/list";

/// `{base}/{yyyy-mm-dd}/{location index}`
pub fn menu_url(base: &str, date: NaiveDate, location: Location) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        date.format("%Y-%m-%d"),
        location.index()
    )
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub base_url: String,
    pub locale: Locale,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            locale: Locale::default(),
        }
    }
}

/// Commands accepted by the interactive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Today,
    Date(NaiveDate),
    Location(Location),
    Refresh,
    Quit,
}

impl FromStr for Command {
    type Err = MenuError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
        let argument = parts.collect::<Vec<_>>().join(" ");

        match (verb.as_str(), argument.is_empty()) {
            ("next" | "n", true) => Ok(Command::Next),
            ("prev" | "previous" | "p", true) => Ok(Command::Previous),
            ("today" | "t", true) => Ok(Command::Today),
            ("refresh" | "r", true) => Ok(Command::Refresh),
            ("quit" | "exit" | "q", true) => Ok(Command::Quit),
            ("date" | "d", false) => NaiveDate::parse_from_str(&argument, "%Y-%m-%d")
                .map(Command::Date)
                .map_err(|e| MenuError::InvalidConfigValueError {
                    field: "date".to_string(),
                    value: argument.clone(),
                    reason: e.to_string(),
                }),
            ("location" | "loc" | "l", false) => argument.parse::<Location>().map(Command::Location),
            _ => Err(MenuError::InvalidConfigValueError {
                field: "command".to_string(),
                value: s.trim().to_string(),
                reason: "expected next, prev, today, date <yyyy-mm-dd>, location <name>, refresh or quit"
                    .to_string(),
            }),
        }
    }
}

/// Owns the selection and the rendered list; drives fetch -> parse -> render.
///
/// Fetch events arrive over a channel and are applied by whichever task calls
/// `run_until_settled`/`run_interactive`, so the presenter is only ever touched
/// from that task. Each fetch is tagged, and events of superseded requests are
/// dropped.
pub struct Controller<K, S, P>
where
    K: ApiKeyProvider,
    S: SettingsStore,
    P: Presenter,
{
    fetcher: Fetcher<K>,
    settings: S,
    presenter: P,
    options: ControllerOptions,
    state: MenuState,
    events_tx: UnboundedSender<FetchEvent>,
    events_rx: UnboundedReceiver<FetchEvent>,
}

impl<K, S, P> Controller<K, S, P>
where
    K: ApiKeyProvider,
    S: SettingsStore,
    P: Presenter,
{
    pub fn new(
        fetcher: Fetcher<K>,
        settings: S,
        presenter: P,
        options: ControllerOptions,
        date: NaiveDate,
        location: Location,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            settings,
            presenter,
            options,
            state: MenuState::new(date, location),
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &MenuState {
        &self.state
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }

    pub fn current_url(&self) -> String {
        menu_url(&self.options.base_url, self.state.date, self.state.location)
    }

    /// Every assignment refetches, even when the date does not change.
    pub fn set_date(&mut self, date: NaiveDate) -> RequestId {
        self.state.date = date;
        self.fetch()
    }

    /// Returns `None` and keeps the current date when the shift leaves
    /// chrono's calendar range.
    pub fn shift_days(&mut self, days: i64) -> Option<RequestId> {
        let date = Duration::try_days(days)
            .and_then(|delta| self.state.date.checked_add_signed(delta));
        match date {
            Some(date) => Some(self.set_date(date)),
            None => {
                tracing::warn!(
                    "Cannot move {} days from {}: date out of range",
                    days,
                    self.state.date
                );
                None
            }
        }
    }

    /// Remembers the choice for the next run, then refetches. A failing
    /// settings store does not prevent the fetch.
    pub async fn set_location(&mut self, location: Location) -> RequestId {
        self.state.location = location;
        if let Err(e) = self.settings.save_location(location).await {
            tracing::warn!("Could not persist location {}: {}", location, e);
        }
        self.fetch()
    }

    pub fn refresh(&mut self) -> RequestId {
        self.fetch()
    }

    fn fetch(&mut self) -> RequestId {
        self.state.items.clear();
        self.state.phase = Phase::Loading;
        self.presenter.set_loading(true);

        let url = self.current_url();
        tracing::debug!(
            "Fetching menu for {} at {}",
            self.state.date,
            self.state.location
        );
        let id = self.fetcher.load(&url, self.events_tx.clone());
        self.state.latest_request = Some(id);
        id
    }

    pub fn is_settled(&self) -> bool {
        self.state.latest_request.is_none() || self.state.phase.is_settled()
    }

    pub fn handle_event(&mut self, event: FetchEvent) -> Result<()> {
        let id = event.id();
        if self.state.latest_request != Some(id) {
            tracing::debug!("Ignoring event of superseded request {}", id);
            return Ok(());
        }

        match event {
            FetchEvent::Started { .. } => {
                let message = self.options.locale.loading_message();
                self.state.title = message.to_string();
                self.presenter.set_title(message);
                Ok(())
            }
            FetchEvent::FallbackData { .. } => {
                self.state.items = sample_menu();
                self.state.phase = Phase::FallbackRendered;
                self.render()
            }
            FetchEvent::Finished { outcome, .. } => {
                self.state.phase = self.apply_outcome(id, outcome);
                self.render()
            }
        }
    }

    fn apply_outcome(&mut self, id: RequestId, outcome: FetchOutcome) -> Phase {
        if let Some(error) = &outcome.error {
            tracing::warn!("Request {} failed: {}", id, error);
        }

        match (outcome.status, outcome.body) {
            (Some(status), Some(body)) if status == StatusCode::OK => match parse_menu(&body) {
                Ok(items) => {
                    tracing::info!("Loaded {} dishes for {}", items.len(), self.state.date);
                    self.state.items.extend(items);
                    Phase::Rendered
                }
                Err(e) => {
                    tracing::warn!("Cannot parse response of request {}: {}", id, e);
                    Phase::ErrorRendered
                }
            },
            (Some(status), None) if status == StatusCode::OK => Phase::ErrorRendered,
            (Some(status), _) => {
                tracing::warn!("Wrong HTTP response: {}", status);
                Phase::ErrorRendered
            }
            (None, _) => Phase::ErrorRendered,
        }
    }

    fn render(&mut self) -> Result<()> {
        self.presenter.set_loading(false);
        self.state.title = self.options.locale.title(self.state.date);
        self.presenter.set_title(&self.state.title);
        self.presenter.reload(&self.state.items)
    }

    /// Applies events until the most recent request has rendered.
    ///
    /// There is no watchdog: if the request never completes this waits for the
    /// HTTP client's own timeout.
    pub async fn run_until_settled(&mut self) -> Result<()> {
        while !self.is_settled() {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            self.handle_event(event)?;
        }
        Ok(())
    }

    /// Applies whatever events are already queued without waiting.
    pub fn drain_pending(&mut self) -> Result<usize> {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event)?;
            applied += 1;
        }
        Ok(applied)
    }

    pub async fn apply_command(&mut self, command: Command) -> Option<RequestId> {
        match command {
            Command::Next => self.shift_days(1),
            Command::Previous => self.shift_days(-1),
            Command::Today => Some(self.set_date(Local::now().date_naive())),
            Command::Date(date) => Some(self.set_date(date)),
            Command::Location(location) => Some(self.set_location(location).await),
            Command::Refresh => Some(self.refresh()),
            Command::Quit => None,
        }
    }

    /// Multiplexes user commands with fetch events. `Quit` returns at once;
    /// a closed command channel (stdin EOF) first lets the latest request
    /// render.
    pub async fn run_interactive(&mut self, mut commands: UnboundedReceiver<Command>) -> Result<()> {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Quit) => break,
                    None => return self.run_until_settled().await,
                    Some(command) => {
                        self.apply_command(command).await;
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::MenuItem;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct NoKey;

    impl ApiKeyProvider for NoKey {
        fn api_key(&self) -> Option<String> {
            None
        }
    }

    #[derive(Default, Clone)]
    struct MemorySettings {
        saved: Arc<Mutex<Vec<Location>>>,
    }

    #[async_trait]
    impl SettingsStore for MemorySettings {
        async fn load_location(&self) -> Result<Option<Location>> {
            Ok(self.saved.lock().unwrap().last().copied())
        }

        async fn save_location(&self, location: Location) -> Result<()> {
            self.saved.lock().unwrap().push(location);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingPresenter {
        titles: Vec<String>,
        reloads: Vec<Vec<MenuItem>>,
        loading: bool,
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

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn controller(
        settings: MemorySettings,
    ) -> Controller<NoKey, MemorySettings, RecordingPresenter> {
        Controller::new(
            Fetcher::new(NoKey),
            settings,
            RecordingPresenter::default(),
            ControllerOptions::default(),
            date(2024, 1, 10),
            Location::Schlossgarten,
        )
    }

    #[test]
    fn test_menu_url() {
        assert_eq!(
            menu_url("https://api.example-host/lunches/list", date(2024, 1, 10), Location::Schlossgarten),
            "https://api.example-host/lunches/list/2024-01-10/0"
        );
        assert_eq!(
            menu_url("http://localhost/list/", date(2023, 12, 31), Location::Caprivi),
            "http://localhost/list/2023-12-31/3"
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("next".parse::<Command>().unwrap(), Command::Next);
        assert_eq!(" P ".parse::<Command>().unwrap(), Command::Previous);
        assert_eq!(
            "date 2024-01-10".parse::<Command>().unwrap(),
            Command::Date(date(2024, 1, 10))
        );
        assert_eq!(
            "location westerberg".parse::<Command>().unwrap(),
            Command::Location(Location::Westerberg)
        );
        assert_eq!("l 4".parse::<Command>().unwrap(), Command::Location(Location::Vechta));
        assert!("date".parse::<Command>().is_err());
        assert!("date 10.01.2024".parse::<Command>().is_err());
        assert!("next 3".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[tokio::test]
    async fn test_fallback_renders_sample_menu() {
        let mut controller = controller(MemorySettings::default());
        controller.refresh();
        controller.run_until_settled().await.unwrap();

        let state = controller.state();
        assert_eq!(state.phase, Phase::FallbackRendered);
        assert_eq!(state.items, sample_menu());
        assert_eq!(state.title, "Today, 10.01.2024");

        let presenter = controller.presenter();
        assert_eq!(presenter.titles, vec!["Loading ...", "Today, 10.01.2024"]);
        assert_eq!(presenter.reloads.len(), 1);
        assert!(!presenter.loading);
    }

    #[tokio::test]
    async fn test_stale_events_are_ignored() {
        let mut controller = controller(MemorySettings::default());
        let first = controller.set_date(date(2024, 1, 10));
        let second = controller.shift_days(1).unwrap();
        assert!(second > first);

        controller.run_until_settled().await.unwrap();
        assert_eq!(controller.state().date, date(2024, 1, 11));
        // 只有最新的請求會觸發 reload
        assert_eq!(controller.presenter().reloads.len(), 1);

        controller.handle_event(FetchEvent::FallbackData { id: first }).unwrap();
        assert_eq!(controller.presenter().reloads.len(), 1);
    }

    #[tokio::test]
    async fn test_set_location_persists() {
        let settings = MemorySettings::default();
        let mut controller = controller(settings.clone());
        controller.set_location(Location::Haste).await;
        controller.run_until_settled().await.unwrap();

        assert_eq!(settings.load_location().await.unwrap(), Some(Location::Haste));
        assert!(controller.current_url().ends_with("/2024-01-10/2"));
    }

    #[tokio::test]
    async fn test_interactive_loop_quits() {
        let mut controller = controller(MemorySettings::default());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Command::Next).unwrap();
        tx.send(Command::Quit).unwrap();

        controller.run_interactive(rx).await.unwrap();
        assert_eq!(controller.state().date, date(2024, 1, 11));
    }

    #[tokio::test]
    async fn test_shift_past_calendar_end_keeps_date() {
        let mut controller = controller(MemorySettings::default());
        controller.set_date(NaiveDate::MAX);
        controller.run_until_settled().await.unwrap();

        assert!(controller.shift_days(1).is_none());
        assert!(controller.apply_command(Command::Next).await.is_none());
        assert_eq!(controller.state().date, NaiveDate::MAX);
        assert!(controller.is_settled());

        assert!(controller.shift_days(i64::MAX).is_none());
        assert!(controller.shift_days(-1).is_some());
    }

    #[tokio::test]
    async fn test_closed_command_channel_waits_for_latest_render() {
        let mut controller = controller(MemorySettings::default());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Command::Next).unwrap();
        drop(tx);

        controller.run_interactive(rx).await.unwrap();
        assert_eq!(controller.state().date, date(2024, 1, 11));
        assert_eq!(controller.state().phase, Phase::FallbackRendered);
        assert_eq!(controller.presenter().reloads.last(), Some(&sample_menu()));
    }

    #[tokio::test]
    async fn test_non_ok_status_renders_empty_list() {
        let mut controller = controller(MemorySettings::default());
        let id = controller.refresh();
        // 丟掉 fetcher 同步送出的 fallback 事件，改用手動構造的結果
        while controller.events_rx.try_recv().is_ok() {}

        controller
            .handle_event(FetchEvent::Finished {
                id,
                outcome: FetchOutcome {
                    status: Some(StatusCode::NOT_FOUND),
                    body: Some(b"[{\"name\":\"x\",\"priceStudent\":\"1\"}]".to_vec()),
                    error: None,
                },
            })
            .unwrap();

        assert_eq!(controller.state().phase, Phase::ErrorRendered);
        assert!(controller.state().items.is_empty());
        assert_eq!(controller.presenter().reloads, vec![Vec::<MenuItem>::new()]);
    }
}
