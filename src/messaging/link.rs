//! Orchestrator side of the page channel

use super::agent::Inbound;
use super::protocol::{kinds, DetectReport, PageRequest};
use crate::config::AppConfig;
use crate::error::{GestureVaultError, Result};
use crate::input_injector::{FillOutcome, UsernameLookup};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Injects the page agent into a page context
pub trait ScriptInjector: Send + Sync {
    /// Inject a fresh agent and return its request channel
    fn inject(&self) -> Result<mpsc::Sender<Inbound>>;
}

/// One request/response exchange at a time, bounded by a timeout
#[derive(Debug, Clone)]
pub struct PageLink {
    requests: mpsc::Sender<Inbound>,
    timeout: Duration,
}

impl PageLink {
    pub fn new(requests: mpsc::Sender<Inbound>, timeout: Duration) -> Self {
        Self { requests, timeout }
    }

    pub async fn request(&self, kind: &str, params: Value) -> Result<Value> {
        let request = PageRequest::new(kind, params);
        let id = request.id;
        let (respond_to, response) = oneshot::channel();

        let exchange = async {
            let inbound = Inbound {
                request,
                respond_to,
            };
            if self.requests.send(inbound).await.is_err() {
                return Err(GestureVaultError::PageUnloaded);
            }

            match response.await {
                Ok(response) => Ok(response),
                // Agent gone entirely vs. agent alive but not answering
                Err(_) if self.requests.is_closed() => Err(GestureVaultError::PageUnloaded),
                Err(_) => Err(GestureVaultError::NoResponse(kind.to_string())),
            }
        };

        let response = timeout(self.timeout, exchange)
            .await
            .map_err(|_| GestureVaultError::InjectionTimeout(kind.to_string()))??;

        if response.id != id {
            return Err(GestureVaultError::ProtocolError(format!(
                "response id {} does not match request {}",
                response.id, id
            )));
        }
        if let Some(error) = response.error {
            return Err(GestureVaultError::ProtocolError(error));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

fn decode<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| GestureVaultError::ProtocolError(format!("bad '{}' result: {}", kind, e)))
}

/// Typed requests to one page, with a single re-injection on timeout
pub struct PageConnection {
    link: PageLink,
    injector: Option<Arc<dyn ScriptInjector>>,
    reinject_on_timeout: bool,
}

impl PageConnection {
    pub fn new(requests: mpsc::Sender<Inbound>, config: &AppConfig) -> Self {
        Self {
            link: PageLink::new(requests, config.message_timeout()),
            injector: None,
            reinject_on_timeout: config.reinject_on_timeout,
        }
    }

    pub fn with_injector(mut self, injector: Arc<dyn ScriptInjector>) -> Self {
        self.injector = Some(injector);
        self
    }

    /// Send one request. A timeout triggers at most one re-injection and
    /// retry when an injector is configured.
    pub async fn request(&mut self, kind: &str, params: Value) -> Result<Value> {
        self.request_with(kind, || params.clone()).await
    }

    /// Like `request`, but builds the params once per attempt so sensitive
    /// values live only as long as the exchange that carries them
    pub async fn request_with<F>(&mut self, kind: &str, params: F) -> Result<Value>
    where
        F: Fn() -> Value,
    {
        match self.link.request(kind, params()).await {
            Err(GestureVaultError::InjectionTimeout(_)) if self.reinject_on_timeout => {
                let Some(injector) = self.injector.clone() else {
                    return Err(GestureVaultError::InjectionTimeout(kind.to_string()));
                };
                warn!("Page did not answer '{}', re-injecting agent", kind);
                let requests = injector.inject()?;
                self.link = PageLink::new(requests, self.link.timeout);
                self.link.request(kind, params()).await
            }
            other => other,
        }
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.request(kinds::PING, Value::Null).await.map(|_| ())
    }

    pub async fn detect_fields(&mut self) -> Result<DetectReport> {
        let value = self.request(kinds::DETECT_FIELDS, Value::Null).await?;
        decode(kinds::DETECT_FIELDS, value)
    }

    /// Wait for a password field to show up, within the request timeout
    pub async fn await_fields(&mut self) -> Result<DetectReport> {
        let value = self.request(kinds::AWAIT_FIELDS, Value::Null).await?;
        decode(kinds::AWAIT_FIELDS, value)
    }

    pub async fn fill_password(&mut self, secret: &SecretString) -> Result<FillOutcome> {
        debug!("Requesting password fill");
        let value = self
            .request_with(kinds::FILL_PASSWORD, || {
                json!({ "secret": secret.expose_secret() })
            })
            .await?;
        decode(kinds::FILL_PASSWORD, value)
    }

    pub async fn fill_username(&mut self, username: &str) -> Result<FillOutcome> {
        let value = self
            .request(kinds::FILL_USERNAME, json!({ "username": username }))
            .await?;
        decode(kinds::FILL_USERNAME, value)
    }

    pub async fn get_username(&mut self) -> Result<UsernameLookup> {
        let value = self.request(kinds::GET_USERNAME, Value::Null).await?;
        decode(kinds::GET_USERNAME, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::agent::{PageAgent, SpawnedAgent};
    use crate::page::{InputKind, InputSpec, MemoryPage, PageDom};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn login_page() -> MemoryPage {
        let mut page = MemoryPage::new();
        let form = page.add_form();
        page.add_input(InputSpec::new(InputKind::Text).name("username").in_form(form));
        page.add_input(InputSpec::new(InputKind::Password).name("password").in_form(form));
        page
    }

    fn connect(page: MemoryPage, config: &AppConfig) -> (PageConnection, SpawnedAgent<MemoryPage>) {
        let spawned = PageAgent::spawn(page, config);
        (PageConnection::new(spawned.requests.clone(), config), spawned)
    }

    struct CountingInjector {
        injections: AtomicUsize,
        config: AppConfig,
    }

    impl ScriptInjector for CountingInjector {
        fn inject(&self) -> Result<mpsc::Sender<Inbound>> {
            self.injections.fetch_add(1, Ordering::SeqCst);
            Ok(PageAgent::spawn(login_page(), &self.config).requests)
        }
    }

    #[tokio::test]
    async fn test_fill_round_trip() {
        let config = AppConfig::default();
        let (mut conn, spawned) = connect(login_page(), &config);

        conn.ping().await.unwrap();
        let filled = conn.fill_username("alice").await.unwrap();
        assert!(filled.success);
        let outcome = conn.fill_password(&SecretString::from("pw")).await.unwrap();
        assert_eq!(outcome.filled, 1);
        assert_eq!(
            conn.get_username().await.unwrap(),
            UsernameLookup::Found("alice".to_string())
        );

        drop(conn);
        drop(spawned.requests);
        let page = spawned.task.await.unwrap();
        let values: Vec<String> = page.inputs().into_iter().map(|i| i.value).collect();
        assert_eq!(values, vec!["alice".to_string(), "pw".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_fields_resolves_when_form_renders_late() {
        let config = AppConfig::default();
        let (mut conn, spawned) = connect(MemoryPage::new(), &config);

        let render = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            spawned
                .page
                .run_script(|page: &mut MemoryPage| {
                    let (_, mutation) = page.add_inputs(vec![
                        InputSpec::new(InputKind::Email).name("email"),
                        InputSpec::new(InputKind::Password),
                    ]);
                    vec![mutation]
                })
                .await
        };

        let (report, rendered) = tokio::join!(conn.await_fields(), render);
        rendered.unwrap();
        let report = report.unwrap();
        assert_eq!(report.counts.password_fields, 1);
        assert_eq!(report.counts.username_fields, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_page_times_out() {
        let config = AppConfig::default();
        let (mut conn, spawned) = connect(login_page(), &config);
        spawned.page.stall(Duration::from_secs(10)).await.unwrap();

        assert!(matches!(
            conn.ping().await,
            Err(GestureVaultError::InjectionTimeout(kind)) if kind == kinds::PING
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reinjects_once() {
        let config = AppConfig::default();
        let (conn, spawned) = connect(login_page(), &config);
        let injector = Arc::new(CountingInjector {
            injections: AtomicUsize::new(0),
            config: config.clone(),
        });
        let mut conn = conn.with_injector(injector.clone());

        spawned.page.stall(Duration::from_secs(10)).await.unwrap();
        let report = conn.detect_fields().await.unwrap();
        assert_eq!(report.counts.password_fields, 1);
        assert_eq!(injector.injections.load(Ordering::SeqCst), 1);

        // The fresh agent answers directly from now on
        conn.ping().await.unwrap();
        assert_eq!(injector.injections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_agent_times_out() {
        // Channel held open but never read
        let (requests, _held) = mpsc::channel(1);
        let link = PageLink::new(requests, Duration::from_secs(2));
        assert!(matches!(
            link.request(kinds::PING, Value::Null).await,
            Err(GestureVaultError::InjectionTimeout(kind)) if kind == kinds::PING
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_params_built_once_per_attempt() {
        let config = AppConfig::default();
        let (conn, spawned) = connect(login_page(), &config);
        let injector = Arc::new(CountingInjector {
            injections: AtomicUsize::new(0),
            config: config.clone(),
        });
        let mut conn = conn.with_injector(injector);
        let builds = AtomicUsize::new(0);
        let params = || {
            builds.fetch_add(1, Ordering::SeqCst);
            json!({ "secret": "pw" })
        };

        conn.request_with(kinds::FILL_PASSWORD, params).await.unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        spawned.page.stall(Duration::from_secs(10)).await.unwrap();
        conn.request_with(kinds::FILL_PASSWORD, params).await.unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unknown_kind_gets_no_response() {
        let config = AppConfig::default();
        let (mut conn, _spawned) = connect(login_page(), &config);
        assert!(matches!(
            conn.request("teleport", Value::Null).await,
            Err(GestureVaultError::NoResponse(kind)) if kind == "teleport"
        ));
    }

    #[tokio::test]
    async fn test_bad_params_surface_as_protocol_error() {
        let config = AppConfig::default();
        let (mut conn, _spawned) = connect(login_page(), &config);
        assert!(matches!(
            conn.request(kinds::FILL_PASSWORD, json!({})).await,
            Err(GestureVaultError::ProtocolError(_))
        ));
    }

    #[tokio::test]
    async fn test_unloaded_page() {
        let config = AppConfig::default();
        let (mut conn, spawned) = connect(login_page(), &config);
        let SpawnedAgent {
            requests,
            page,
            task,
            ..
        } = spawned;

        page.unload().await.unwrap();
        task.await.unwrap();
        drop(requests);

        assert!(matches!(conn.ping().await, Err(GestureVaultError::PageUnloaded)));
    }
}
