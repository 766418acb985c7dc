//! Process-wide adblock service: owns settings, rules, the initialization
//! token and the background tasks, and hands sessions to the binder.

use crate::config::Config;
use crate::cosmetic;
use crate::engine::{
    spawn_settings_listener, FilterManager, GeneralSettings, SettingsState, SettingsUpdate,
    StandardManager,
};
use crate::init::init_decision_logger;
use crate::logger::{memory_sink, DecisionLogEntry, SharedLogBuffer};
use crate::pipeline::{Decision, DecisionPipeline, RequestDetails};
use crate::session::{InitOutcome, NetworkSession, SessionBinder};
use crate::stats::{StatsCollector, StatsSnapshot};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

pub struct AdblockService {
    config: Config,
    binder: Arc<SessionBinder>,
    stats: Arc<StatsCollector>,
    log_buffer: Option<SharedLogBuffer>,
    settings_tx: mpsc::Sender<SettingsUpdate>,
    refresh_tx: mpsc::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl AdblockService {
    /// Builds the service with the HTTP-backed filter manager.
    /// Must be called from inside a tokio runtime.
    pub fn start(config: Config) -> Result<Self> {
        let manager =
            StandardManager::new(&config).context("Failed to build filter download client")?;
        Ok(Self::with_manager(config, Arc::new(manager)))
    }

    pub fn with_manager(config: Config, manager: Arc<dyn FilterManager>) -> Self {
        let stats = StatsCollector::new();
        let (logger, log_buffer) = init_decision_logger(&config);
        let settings = SettingsState::new(GeneralSettings::default());

        let pipeline = Arc::new(DecisionPipeline::new(
            settings.clone(),
            config.video.aggressive_adblock,
            stats.clone(),
            logger,
        ));
        let binder = SessionBinder::with_init_wait(pipeline, manager, config.init_wait());

        let mut tasks = Vec::new();

        let (settings_tx, settings_rx) = mpsc::channel(16);
        tasks.push(spawn_settings_listener(settings, settings_rx));

        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        tasks.push(binder.spawn_periodic_refresh(config.refresh_interval(), refresh_rx));

        if config.stats.enable && config.stats.log_interval_seconds > 0 {
            tasks.push(
                stats.spawn_reporter(Duration::from_secs(config.stats.log_interval_seconds)),
            );
        }

        info!(
            "Adblock service ready ({} filter lists configured)",
            config.filters.lists.len()
        );

        Self {
            config,
            binder,
            stats,
            log_buffer,
            settings_tx,
            refresh_tx,
            tasks,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &Arc<DecisionPipeline> {
        self.binder.pipeline()
    }

    /// Attaches the pipeline to `session`. A no-op for an already bound one.
    pub fn bind_session(&self, session: &dyn NetworkSession) -> bool {
        self.binder.bind_session(session)
    }

    pub async fn ensure_initialized(&self) -> InitOutcome {
        self.binder.ensure_initialized().await
    }

    /// Decides a request directly, without going through a session.
    pub async fn handle_request(&self, details: RequestDetails) -> Decision {
        self.binder.handle_request(details).await
    }

    /// Channel for UI settings messages.
    pub fn settings_sender(&self) -> mpsc::Sender<SettingsUpdate> {
        self.settings_tx.clone()
    }

    /// Sending on this re-runs filter refresh and rebuild in the background.
    pub fn refresh_sender(&self) -> mpsc::Sender<()> {
        self.refresh_tx.clone()
    }

    pub fn set_adblock_enabled(&self, enabled: bool) {
        self.pipeline().settings().set_adblock_enabled(enabled);
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Recent decisions, oldest first. Empty unless the `memory` sink is on.
    pub fn recent_decisions(&self) -> Vec<DecisionLogEntry> {
        self.log_buffer
            .as_ref()
            .map(memory_sink::recent)
            .unwrap_or_default()
    }

    /// The DOM cleaner script for `page_url`, if one should be injected.
    pub fn dom_cleaner_for(&self, page_url: &str) -> Option<String> {
        (self.config.video.inject_dom_cleaner && cosmetic::should_inject_dom_cleaner(page_url))
            .then(cosmetic::video_dom_cleaner_script)
    }
}

impl Drop for AdblockService {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
