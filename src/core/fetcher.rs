use crate::core::{ApiKeyProvider, FetchListener};
use crate::domain::model::{FetchEvent, FetchOutcome, FetchRequest, RequestId};
use crate::utils::error::{MenuError, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

/// Issues one authenticated GET per `load` and reports its lifecycle.
///
/// Every call emits `Started` first, then exactly one of `FallbackData`
/// (no API key, nothing sent) or `Finished`. HTTP status codes are not
/// interpreted here; a 500 is a normal `Finished`.
pub struct Fetcher<K: ApiKeyProvider> {
    client: Client,
    keys: K,
    next_id: AtomicU64,
}

impl<K: ApiKeyProvider> Fetcher<K> {
    pub fn new(keys: K) -> Self {
        Self::with_client(Client::new(), keys)
    }

    pub fn with_timeout(keys: K, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, keys))
    }

    pub fn with_client(client: Client, keys: K) -> Self {
        Self {
            client,
            keys,
            next_id: AtomicU64::new(0),
        }
    }

    /// Must be called from within a tokio runtime; the network call runs on a
    /// spawned task and `Finished` is delivered from there.
    pub fn load<L>(&self, target: &str, listener: L) -> RequestId
    where
        L: FetchListener,
    {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        listener.notify(FetchEvent::Started { id });

        let request = FetchRequest {
            url: target.to_string(),
            api_key: self.keys.api_key(),
        };

        let Some(api_key) = request.api_key.clone() else {
            tracing::info!("No API key configured, using sample menu for {}", id);
            listener.notify(FetchEvent::FallbackData { id });
            return id;
        };

        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Request {} has an unparseable URL '{}': {}", id, request.url, e);
                listener.notify(FetchEvent::Finished {
                    id,
                    outcome: FetchOutcome {
                        error: Some(MenuError::InvalidUrl {
                            url: request.url,
                            reason: e.to_string(),
                        }),
                        ..FetchOutcome::default()
                    },
                });
                return id;
            }
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            let outcome = execute(&client, url, &api_key).await;
            listener.notify(FetchEvent::Finished { id, outcome });
        });

        id
    }
}

async fn execute(client: &Client, url: Url, api_key: &str) -> FetchOutcome {
    tracing::debug!("Making API request to: {}", url);

    let response = match client.get(url).header(AUTHORIZATION, api_key).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Transport failure: {}", e);
            return FetchOutcome {
                error: Some(e.into()),
                ..FetchOutcome::default()
            };
        }
    };

    let status = response.status();
    tracing::debug!("API response status: {}", status);

    match response.bytes().await {
        Ok(body) => FetchOutcome {
            status: Some(status),
            body: Some(body.to_vec()),
            error: None,
        },
        // 狀態碼已收到但 body 中斷，兩者都交給 listener 判斷
        Err(e) => FetchOutcome {
            status: Some(status),
            body: None,
            error: Some(e.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::StatusCode;
    use tokio::sync::mpsc;

    struct StaticKey(Option<&'static str>);

    impl ApiKeyProvider for StaticKey {
        fn api_key(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[tokio::test]
    async fn test_no_key_emits_started_then_fallback() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET);
            then.status(200);
        });

        let fetcher = Fetcher::new(StaticKey(None));
        let (tx, mut rx) = mpsc::unbounded_channel::<FetchEvent>();
        let id = fetcher.load(&server.url("/lunches/list/2024-01-10/0"), tx);

        // 兩個事件都在 load 返回前同步送出
        assert!(matches!(rx.try_recv().unwrap(), FetchEvent::Started { id: got } if got == id));
        assert!(matches!(rx.try_recv().unwrap(), FetchEvent::FallbackData { id: got } if got == id));
        assert!(rx.recv().await.is_none());
        api_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_sends_authorization_header() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/lunches/list/2024-01-10/1")
                .header("Authorization", "secret-key");
            then.status(200).body("[]");
        });

        let fetcher = Fetcher::new(StaticKey(Some("secret-key")));
        let (tx, mut rx) = mpsc::unbounded_channel::<FetchEvent>();
        fetcher.load(&server.url("/lunches/list/2024-01-10/1"), tx);

        assert!(matches!(rx.recv().await, Some(FetchEvent::Started { .. })));
        match rx.recv().await {
            Some(FetchEvent::Finished { outcome, .. }) => {
                assert_eq!(outcome.status, Some(StatusCode::OK));
                assert_eq!(outcome.body.as_deref(), Some(&b"[]"[..]));
                assert!(outcome.error.is_none());
            }
            other => panic!("expected Finished, got {:?}", other),
        }
        api_mock.assert();
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(503).body("maintenance");
        });

        let fetcher = Fetcher::new(StaticKey(Some("k")));
        let (tx, mut rx) = mpsc::unbounded_channel::<FetchEvent>();
        fetcher.load(&server.url("/x"), tx);

        rx.recv().await;
        match rx.recv().await {
            Some(FetchEvent::Finished { outcome, .. }) => {
                assert_eq!(outcome.status, Some(StatusCode::SERVICE_UNAVAILABLE));
                assert!(outcome.error.is_none());
            }
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported_as_finished_error() {
        let fetcher = Fetcher::new(StaticKey(Some("k")));
        let (tx, mut rx) = mpsc::unbounded_channel::<FetchEvent>();
        fetcher.load("not a url", tx);

        assert!(matches!(rx.try_recv().unwrap(), FetchEvent::Started { .. }));
        match rx.try_recv().unwrap() {
            FetchEvent::Finished { outcome, .. } => {
                assert!(outcome.status.is_none());
                assert!(outcome.body.is_none());
                assert!(matches!(outcome.error, Some(MenuError::InvalidUrl { .. })));
            }
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_carries_error() {
        // 保留一個沒人在聽的埠
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let fetcher = Fetcher::new(StaticKey(Some("k")));
        let (tx, mut rx) = mpsc::unbounded_channel::<FetchEvent>();
        fetcher.load(&format!("http://127.0.0.1:{}/lunches", port), tx);

        rx.recv().await;
        match rx.recv().await {
            Some(FetchEvent::Finished { outcome, .. }) => {
                assert!(outcome.status.is_none());
                assert!(matches!(outcome.error, Some(MenuError::ApiError(_))));
            }
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_ids_increase() {
        let fetcher = Fetcher::new(StaticKey(None));
        let (tx, _rx) = mpsc::unbounded_channel::<FetchEvent>();
        let first = fetcher.load("http://localhost/a", tx.clone());
        let second = fetcher.load("http://localhost/b", tx);
        assert!(second > first);
    }
}
