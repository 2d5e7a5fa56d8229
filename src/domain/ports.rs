use crate::domain::model::{FetchEvent, Location, MenuItem};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// Source of the API key. Asked on every `load`, so a provider may rotate keys.
pub trait ApiKeyProvider: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

impl<T: ApiKeyProvider + ?Sized> ApiKeyProvider for std::sync::Arc<T> {
    fn api_key(&self) -> Option<String> {
        (**self).api_key()
    }
}

/// User-scoped persistence of the last selected cafeteria.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load_location(&self) -> Result<Option<Location>>;
    async fn save_location(&self, location: Location) -> Result<()>;
}

/// Receives lifecycle events of a fetch. Implementations must not block: the
/// `Finished` event is delivered from a worker task.
pub trait FetchListener: Send + Sync + 'static {
    fn notify(&self, event: FetchEvent);
}

impl FetchListener for UnboundedSender<FetchEvent> {
    fn notify(&self, event: FetchEvent) {
        if let Err(e) = self.send(event) {
            tracing::debug!("Dropping fetch event {}: receiver closed", e.0.id());
        }
    }
}

/// Presentation side. All calls come from the controller's task.
pub trait Presenter {
    fn set_title(&mut self, title: &str);
    fn set_loading(&mut self, loading: bool);
    fn reload(&mut self, items: &[MenuItem]) -> Result<()>;
}
