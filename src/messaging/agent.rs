//! Page agent: the code that lives inside the page context
//!
//! One task owns the page. It answers requests from the orchestrator,
//! applies page-script changes, re-detects fields after a debounced burst
//! of mutations and runs highlight timers. Requests are handled strictly
//! one at a time in arrival order.

use super::protocol::{
    kinds, DetectReport, FieldSummary, FillPasswordParams, FillUsernameParams, PageEvent,
    PageRequest, PageResponse,
};
use crate::config::AppConfig;
use crate::field_detection::FieldDetector;
use crate::field_watcher::FieldWatcher;
use crate::input_injector::{HighlightPlan, InputInjector};
use crate::page::{ElementId, Mutation, PageDom};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

const REQUEST_QUEUE: usize = 32;
const COMMAND_QUEUE: usize = 32;

/// A request plus the channel its response goes back on
#[derive(Debug)]
pub struct Inbound {
    pub request: PageRequest,
    pub respond_to: oneshot::Sender<PageResponse>,
}

/// What a handler did with a request
#[derive(Debug)]
pub enum HandlerReply {
    /// Answer now
    Immediate(PageResponse),
    /// Answer later; the agent keeps the responder
    Deferred,
    /// Not ours; the responder is dropped and the caller sees no response
    Unhandled,
}

/// Page-script code that changes the DOM and reports what it did
pub type PageScript<P> = Box<dyn FnOnce(&mut P) -> Vec<Mutation> + Send>;

/// Things happening on the page side, outside our requests
pub enum PageCommand<P> {
    Script(PageScript<P>),
    /// The user clicked into an element
    UserFocus(ElementId),
    /// The page's event loop is busy; `started` fires as the stall begins
    Stall {
        duration: Duration,
        started: oneshot::Sender<()>,
    },
    /// Navigation or tab close; the agent goes away with the page
    Unload,
}

/// Drives page-side activity for demos and tests
pub struct PageHandle<P> {
    commands: mpsc::Sender<PageCommand<P>>,
}

impl<P> Clone for PageHandle<P> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<P: Send + 'static> PageHandle<P> {
    async fn send(&self, command: PageCommand<P>) -> crate::Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| crate::GestureVaultError::PageUnloaded)
    }

    pub async fn run_script(
        &self,
        script: impl FnOnce(&mut P) -> Vec<Mutation> + Send + 'static,
    ) -> crate::Result<()> {
        self.send(PageCommand::Script(Box::new(script))).await
    }

    pub async fn focus(&self, element: ElementId) -> crate::Result<()> {
        self.send(PageCommand::UserFocus(element)).await
    }

    /// Returns once the page is actually stalled
    pub async fn stall(&self, duration: Duration) -> crate::Result<()> {
        let (started, ack) = oneshot::channel();
        self.send(PageCommand::Stall { duration, started }).await?;
        ack.await.map_err(|_| crate::GestureVaultError::PageUnloaded)
    }

    pub async fn unload(&self) -> crate::Result<()> {
        self.send(PageCommand::Unload).await
    }
}

/// Everything `PageAgent::spawn` hands back
pub struct SpawnedAgent<P> {
    pub requests: mpsc::Sender<Inbound>,
    pub page: PageHandle<P>,
    pub events: mpsc::UnboundedReceiver<PageEvent>,
    /// Resolves to the page once the agent exits
    pub task: JoinHandle<P>,
}

#[derive(Debug)]
enum StyleChange {
    Apply { style: String, duration: Duration },
    Restore(String),
}

#[derive(Debug)]
struct PendingStyle {
    due: Instant,
    element: ElementId,
    change: StyleChange,
}

pub struct PageAgent<P> {
    page: P,
    detector: FieldDetector,
    watcher: FieldWatcher,
    injector: InputInjector,
    waiting: Vec<(Uuid, oneshot::Sender<PageResponse>)>,
    pending_styles: Vec<PendingStyle>,
    events: Option<mpsc::UnboundedSender<PageEvent>>,
}

fn reply<T: Serialize>(id: Uuid, value: &T) -> HandlerReply {
    match serde_json::to_value(value) {
        Ok(result) => HandlerReply::Immediate(PageResponse::success(id, result)),
        Err(e) => HandlerReply::Immediate(PageResponse::failure(id, e.to_string())),
    }
}

fn parse_params<T: DeserializeOwned>(request: &mut PageRequest) -> std::result::Result<T, String> {
    serde_json::from_value(std::mem::take(&mut request.params))
        .map_err(|e| format!("invalid params for '{}': {}", request.kind, e))
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400)
}

impl<P: PageDom + Send + 'static> PageAgent<P> {
    pub fn new(page: P, config: &AppConfig) -> Self {
        Self {
            page,
            detector: FieldDetector::new(),
            watcher: FieldWatcher::new(config.debounce()),
            injector: InputInjector::with_highlight(config.highlight.clone()),
            waiting: Vec::new(),
            pending_styles: Vec::new(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<PageEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Inject an agent into `page` and start it
    pub fn spawn(page: P, config: &AppConfig) -> SpawnedAgent<P> {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let agent = Self::new(page, config).with_events(event_tx);
        let task = tokio::spawn(agent.run(request_rx, command_rx));

        SpawnedAgent {
            requests: request_tx,
            page: PageHandle {
                commands: command_tx,
            },
            events: event_rx,
            task,
        }
    }

    /// Serve until the orchestrator hangs up or the page unloads
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<Inbound>,
        mut commands: mpsc::Receiver<PageCommand<P>>,
    ) -> P {
        self.reclassify();
        let mut commands_open = true;

        loop {
            let watch_deadline = self.watcher.deadline();
            let style_deadline = self.pending_styles.iter().map(|p| p.due).min();

            tokio::select! {
                inbound = requests.recv() => match inbound {
                    Some(inbound) => self.dispatch(inbound),
                    None => {
                        debug!("Orchestrator disconnected, page agent stopping");
                        break;
                    }
                },
                command = commands.recv(), if commands_open => match command {
                    Some(PageCommand::Unload) => {
                        info!("Page unloaded, dropping {} waiting requests", self.waiting.len());
                        break;
                    }
                    Some(command) => self.apply(command).await,
                    None => commands_open = false,
                },
                _ = sleep_until(watch_deadline.unwrap_or_else(far_future)), if watch_deadline.is_some() => {
                    self.reclassify();
                }
                _ = sleep_until(style_deadline.unwrap_or_else(far_future)), if style_deadline.is_some() => {
                    self.run_due_styles(Instant::now());
                }
            }
        }

        self.page
    }

    fn dispatch(&mut self, inbound: Inbound) {
        let Inbound {
            request,
            respond_to,
        } = inbound;
        let id = request.id;
        let kind = request.kind.clone();

        match self.handle(request) {
            HandlerReply::Immediate(response) => {
                // The caller may have timed out already
                let _ = respond_to.send(response);
            }
            HandlerReply::Deferred => {
                debug!("Deferring '{}' ({})", kind, id);
                self.prune_waiting();
                self.waiting.push((id, respond_to));
            }
            HandlerReply::Unhandled => {
                warn!("Unhandled page request '{}'", kind);
            }
        }
    }

    /// Route one request
    pub fn handle(&mut self, mut request: PageRequest) -> HandlerReply {
        let id = request.id;

        match request.kind.as_str() {
            kinds::PING => HandlerReply::Immediate(PageResponse::success(id, json!({"pong": true}))),

            kinds::DETECT_FIELDS => {
                self.reclassify();
                reply(id, &self.report())
            }

            kinds::AWAIT_FIELDS => {
                self.reclassify();
                if self.detector.password_fields().is_empty() {
                    HandlerReply::Deferred
                } else {
                    reply(id, &self.report())
                }
            }

            kinds::FILL_PASSWORD => {
                let params: FillPasswordParams = match parse_params(&mut request) {
                    Ok(p) => p,
                    Err(e) => return HandlerReply::Immediate(PageResponse::failure(id, e)),
                };
                let secret = SecretString::from(params.secret);

                self.reclassify();
                let (outcome, plan) = self.injector.fill_password(
                    &mut self.page,
                    self.detector.password_fields(),
                    &secret,
                );
                self.schedule_highlight(plan);
                reply(id, &outcome)
            }

            kinds::FILL_USERNAME => {
                let params: FillUsernameParams = match parse_params(&mut request) {
                    Ok(p) => p,
                    Err(e) => return HandlerReply::Immediate(PageResponse::failure(id, e)),
                };

                self.reclassify();
                let (outcome, plan) = self.injector.fill_username(
                    &mut self.page,
                    self.detector.active_username(),
                    &params.username,
                );
                self.schedule_highlight(plan);
                reply(id, &outcome)
            }

            kinds::GET_USERNAME => {
                self.reclassify();
                let lookup = InputInjector::read_username(&self.page, self.detector.active_username());
                reply(id, &lookup)
            }

            _ => HandlerReply::Unhandled,
        }
    }

    fn report(&self) -> DetectReport {
        DetectReport {
            counts: self.detector.counts(),
            password_fields: self
                .detector
                .password_fields()
                .iter()
                .map(FieldSummary::from)
                .collect(),
            username: self.detector.active_username().map(FieldSummary::from),
        }
    }

    /// Classify now, announce changed counts and release waiting requests
    fn reclassify(&mut self) {
        if let Some(counts) = self.watcher.fire(&mut self.detector, &self.page) {
            if let Some(events) = &self.events {
                let _ = events.send(PageEvent::FieldsChanged { counts });
            }
        }

        self.prune_waiting();
        if self.waiting.is_empty() || self.detector.password_fields().is_empty() {
            return;
        }

        let report = self.report();
        for (id, respond_to) in self.waiting.drain(..) {
            debug!("Releasing deferred request {}", id);
            let response = match serde_json::to_value(&report) {
                Ok(result) => PageResponse::success(id, result),
                Err(e) => PageResponse::failure(id, e.to_string()),
            };
            let _ = respond_to.send(response);
        }
    }

    /// Forget deferred requests whose caller has given up
    fn prune_waiting(&mut self) {
        let before = self.waiting.len();
        self.waiting.retain(|(_, respond_to)| !respond_to.is_closed());
        if self.waiting.len() < before {
            debug!("Dropped {} abandoned deferred requests", before - self.waiting.len());
        }
    }

    async fn apply(&mut self, command: PageCommand<P>) {
        match command {
            PageCommand::Script(script) => {
                let now = Instant::now();
                for mutation in script(&mut self.page) {
                    self.watcher.on_mutation(&mutation, now);
                }
            }
            PageCommand::UserFocus(element) => {
                if let Err(e) = self.page.focus(element) {
                    debug!("Focus on {} ignored: {}", element, e);
                }
                self.detector.note_focus(element);
            }
            PageCommand::Stall { duration, started } => {
                let _ = started.send(());
                sleep(duration).await;
            }
            PageCommand::Unload => {}
        }
    }

    fn schedule_highlight(&mut self, plan: HighlightPlan) {
        let now = Instant::now();
        for step in plan.steps {
            self.pending_styles.push(PendingStyle {
                due: now + step.delay,
                element: step.element,
                change: StyleChange::Apply {
                    style: plan.style.clone(),
                    duration: plan.duration,
                },
            });
        }
    }

    fn run_due_styles(&mut self, now: Instant) {
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_styles)
            .into_iter()
            .partition(|p| p.due <= now);
        self.pending_styles = later;

        for pending in due {
            match pending.change {
                StyleChange::Apply { style, duration } => {
                    // Overlapping highlights restore the style from before the first
                    let original = match self.pending_styles.iter().position(|p| {
                        p.element == pending.element && matches!(p.change, StyleChange::Restore(_))
                    }) {
                        Some(index) => match self.pending_styles.remove(index).change {
                            StyleChange::Restore(style) => style,
                            StyleChange::Apply { .. } => String::new(),
                        },
                        None => self.page.style(pending.element).unwrap_or_default(),
                    };

                    if let Err(e) = self.page.set_style(pending.element, &style) {
                        debug!("Highlight on {} skipped: {}", pending.element, e);
                        continue;
                    }
                    self.pending_styles.push(PendingStyle {
                        due: pending.due + duration,
                        element: pending.element,
                        change: StyleChange::Restore(original),
                    });
                }
                StyleChange::Restore(style) => {
                    if let Err(e) = self.page.set_style(pending.element, &style) {
                        debug!("Style restore on {} skipped: {}", pending.element, e);
                    }
                }
            }
        }
    }
}
