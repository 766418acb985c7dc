use super::types::{Decision, DecisionBranch, RequestContext, RequestDetails};
use crate::classifier;
use crate::engine::{RuleSet, SettingsState};
use crate::logger::{DecisionAction, DecisionLogEntry, DecisionLogger};
use crate::stats::StatsCollector;
use arc_swap::ArcSwapOption;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("request evaluation panicked: {0}")]
    Panicked(String),
}

/// Per-request decision logic shared by every bound session.
pub struct DecisionPipeline {
    settings: SettingsState,
    aggressive_video_adblock: bool,
    rules: ArcSwapOption<RuleSet>,
    stats: Arc<StatsCollector>,
    logger: Arc<DecisionLogger>,
}

impl DecisionPipeline {
    pub fn new(
        settings: SettingsState,
        aggressive_video_adblock: bool,
        stats: Arc<StatsCollector>,
        logger: Arc<DecisionLogger>,
    ) -> Self {
        Self {
            settings,
            aggressive_video_adblock,
            rules: ArcSwapOption::empty(),
            stats,
            logger,
        }
    }

    pub fn settings(&self) -> &SettingsState {
        &self.settings
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    /// Atomically replaces the live RuleSet. `None` drops to classifier-only mode.
    pub fn install_rules(&self, rules: Option<Arc<RuleSet>>) {
        match &rules {
            Some(r) => info!("Installing rule set ({} lines)", r.line_count()),
            None => info!("No rule set available; classifier-only filtering"),
        }
        self.rules.store(rules);
    }

    pub fn has_rules(&self) -> bool {
        self.rules.load().is_some()
    }

    /// Decides one request. Never fails: any internal error allows the request.
    pub fn decide(&self, details: &RequestDetails) -> Decision {
        let start = Instant::now();

        // Kill-switch first, before any parsing.
        if !self.settings.is_adblock_enabled() {
            return self.finish(details, "", start, Decision::Allow, DecisionBranch::Disabled);
        }

        let (decision, branch, hostname) = match self.evaluate_guarded(details) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Request filtering failed for {}: {}", details.url, e);
                (Decision::Allow, DecisionBranch::FailOpen, String::new())
            }
        };
        self.finish(details, &hostname, start, decision, branch)
    }

    fn evaluate_guarded(
        &self,
        details: &RequestDetails,
    ) -> Result<(Decision, DecisionBranch, String), PipelineError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            let ctx = RequestContext::from_details(details);
            let (decision, branch) = self.evaluate(&ctx);
            (decision, branch, ctx.hostname)
        }))
        .map_err(|payload| PipelineError::Panicked(panic_message(payload.as_ref())))
    }

    fn evaluate(&self, ctx: &RequestContext<'_>) -> (Decision, DecisionBranch) {
        // 1) Video platform: frames always pass, only known ad endpoints are
        //    cancelled, and the generic engine never sees these hosts.
        if classifier::is_known_video_host(&ctx.hostname) {
            let decision = if !ctx.resource_type.is_frame()
                && classifier::is_known_video_ad_endpoint(ctx.url, &ctx.hostname)
            {
                Decision::Cancel
            } else {
                Decision::Allow
            };
            return (decision, DecisionBranch::VideoHost);
        }

        // 2) Video CDN: playback passes unless it is a recognised ad stream.
        if classifier::is_video_cdn_host(&ctx.hostname) {
            let decision =
                if self.aggressive_video_adblock && classifier::is_known_video_ad_stream(ctx.url) {
                    Decision::Cancel
                } else {
                    Decision::Allow
                };
            return (decision, DecisionBranch::VideoCdn);
        }

        // 3) Generic filter lists.
        let guard = self.rules.load();
        let Some(rules) = guard.as_ref() else {
            return (Decision::Allow, DecisionBranch::NoRules);
        };
        let Some(request_url) = classifier::parse_http_url(ctx.url) else {
            return (Decision::Allow, DecisionBranch::Generic);
        };
        let origin_url =
            classifier::parse_http_url(ctx.origin).unwrap_or_else(|| request_url.clone());

        // First/third-party is not computed; every request is treated as third-party.
        let result = rules.query(
            request_url.as_str(),
            origin_url.as_str(),
            ctx.resource_type,
            true,
        );

        let decision = match result.redirect {
            Some(target) => Decision::Redirect(target),
            None if result.matched => Decision::Cancel,
            None => Decision::Allow,
        };
        (decision, DecisionBranch::Generic)
    }

    fn finish(
        &self,
        details: &RequestDetails,
        hostname: &str,
        start: Instant,
        decision: Decision,
        branch: DecisionBranch,
    ) -> Decision {
        self.stats.record(branch, &decision);

        let action = DecisionAction::from(&decision);
        if self.logger.wants(action) {
            let redirect = match &decision {
                Decision::Redirect(target) => Some(target.clone()),
                _ => None,
            };
            self.logger.log(DecisionLogEntry {
                url: details.url.clone(),
                hostname: hostname.to_string(),
                resource_type: classifier::map_resource_type(details.resource_type.as_str().into()),
                action,
                branch,
                redirect,
                latency_us: start.elapsed().as_micros() as u64,
            });
        }

        decision
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
