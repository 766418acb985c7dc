use super::types::{NetworkSession, RequestHook, UrlFilter};
use crate::engine::FilterManager;
use crate::pipeline::{Decision, DecisionPipeline, RequestDetails};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info, warn};

/// How long early requests may wait for the first rule build, counted from
/// the moment initialization starts.
pub const DEFAULT_INIT_WAIT: Duration = Duration::from_secs(2);

/// Result of the one-time filter refresh and build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InitOutcome {
    /// A RuleSet compiled from this many lines is live.
    Active { rules: usize },
    /// No rules could be loaded; classifier-only filtering.
    Disabled,
}

/// Wires the decision pipeline into every browsing session and owns the
/// single initialization token shared by all of them.
pub struct SessionBinder {
    pipeline: Arc<DecisionPipeline>,
    manager: Arc<dyn FilterManager>,
    init: OnceCell<InitOutcome>,
    init_started: AtomicBool,
    // Requests stop waiting for the first build at this instant.
    init_deadline: OnceLock<Instant>,
    init_wait: Duration,
    ready: watch::Sender<Option<InitOutcome>>,
}

impl SessionBinder {
    pub fn new(pipeline: Arc<DecisionPipeline>, manager: Arc<dyn FilterManager>) -> Arc<Self> {
        Self::with_init_wait(pipeline, manager, DEFAULT_INIT_WAIT)
    }

    /// Like [`SessionBinder::new`], with a custom bound on how long requests
    /// wait for the first rule build. Zero never waits.
    pub fn with_init_wait(
        pipeline: Arc<DecisionPipeline>,
        manager: Arc<dyn FilterManager>,
        init_wait: Duration,
    ) -> Arc<Self> {
        let (ready, _) = watch::channel(None);
        Arc::new(Self {
            pipeline,
            manager,
            init: OnceCell::new(),
            init_started: AtomicBool::new(false),
            init_deadline: OnceLock::new(),
            init_wait,
            ready,
        })
    }

    pub fn pipeline(&self) -> &Arc<DecisionPipeline> {
        &self.pipeline
    }

    /// Installs the pipeline hook on `session` unless it already carries one.
    /// Returns `true` when this call did the binding.
    pub fn bind_session(self: &Arc<Self>, session: &dyn NetworkSession) -> bool {
        // Tag first so a concurrent bind of the same session backs off.
        if !session.try_mark_bound() {
            debug!("Session {} already bound", session.id());
            return false;
        }

        session.clear_request_hook();
        session.on_before_request(UrlFilter::all_urls(), self.request_hook());
        info!("Bound adblock hook to session {}", session.id());

        // Start downloading as soon as the first session shows up.
        self.spawn_initialization();
        true
    }

    /// Runs `ensure_initialized` on its own task, once. Requests never drive
    /// the build themselves, so a request giving up cannot cancel it.
    fn spawn_initialization(self: &Arc<Self>) {
        if self.init_started.load(Ordering::Acquire) {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        if self.init_started.swap(true, Ordering::AcqRel) {
            return;
        }
        self.init_deadline.get_or_init(|| Instant::now() + self.init_wait);

        let binder = Arc::clone(self);
        handle.spawn(async move {
            binder.ensure_initialized().await;
        });
    }

    fn request_hook(self: &Arc<Self>) -> RequestHook {
        let binder = Arc::clone(self);
        Arc::new(move |details: RequestDetails| -> BoxFuture<'static, Decision> {
            let binder = Arc::clone(&binder);
            async move { binder.handle_request(details).await }.boxed()
        })
    }

    /// Resolves once filters are fresh and compiled. Only the first caller
    /// does the work; everyone else awaits the same outcome.
    pub async fn ensure_initialized(&self) -> InitOutcome {
        *self
            .init
            .get_or_init(|| async {
                info!("Initializing adblock filters...");
                let rules = self.manager.refresh().await;
                let outcome = match &rules {
                    Some(rules) => InitOutcome::Active {
                        rules: rules.line_count(),
                    },
                    None => InitOutcome::Disabled,
                };
                self.pipeline.install_rules(rules);
                info!("Adblock initialization finished: {:?}", outcome);
                self.ready.send_replace(Some(outcome));
                outcome
            })
            .await
    }

    /// `None` until initialization has completed.
    pub fn init_outcome(&self) -> Option<InitOutcome> {
        self.init.get().copied()
    }

    /// Decides one request. While the first build is in flight the request
    /// waits, but never past the shared deadline; after that it is decided
    /// with whatever rules are installed (classifier-only if none).
    pub async fn handle_request(self: &Arc<Self>, details: RequestDetails) -> Decision {
        // With the kill-switch off there is nothing to wait for.
        if self.pipeline.settings().is_adblock_enabled() && self.init.get().is_none() {
            self.spawn_initialization();
            self.wait_for_rules().await;
        }
        self.pipeline.decide(&details)
    }

    async fn wait_for_rules(&self) {
        let Some(&deadline) = self.init_deadline.get() else {
            return;
        };
        let mut ready = self.ready.subscribe();
        let wait = async {
            loop {
                let done = ready.borrow_and_update().is_some();
                if done || ready.changed().await.is_err() {
                    break;
                }
            }
        };
        if time::timeout_at(deadline, wait).await.is_err() {
            warn!("Filters not ready yet; deciding without generic rules");
        }
    }

    /// Re-runs refresh and build on `interval` and whenever `refresh_rx`
    /// receives a message. Ends once neither source can fire any more.
    pub fn spawn_periodic_refresh(
        self: &Arc<Self>,
        interval: Option<Duration>,
        mut refresh_rx: mpsc::Receiver<()>,
    ) -> JoinHandle<()> {
        let binder = Arc::clone(self);
        tokio::spawn(async move {
            let scheduled = interval.is_some();
            let mut ticker = time::interval(interval.unwrap_or(Duration::from_secs(3600)));
            // The first tick completes immediately
            ticker.tick().await;
            let mut manual_open = true;

            loop {
                tokio::select! {
                    _ = ticker.tick(), if scheduled => {
                        info!("Scheduled filter refresh...");
                    }
                    msg = refresh_rx.recv(), if manual_open => match msg {
                        Some(()) => {
                            info!("Manual filter refresh requested");
                            ticker.reset();
                        }
                        None => {
                            manual_open = false;
                            if !scheduled {
                                break;
                            }
                            continue;
                        }
                    },
                }

                // The initial build always comes first.
                binder.ensure_initialized().await;
                let rules = binder.manager.refresh().await;
                binder.pipeline.install_rules(rules);
            }
            debug!("Filter refresh loop stopped");
        })
    }
}
