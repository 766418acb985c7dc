use crate::config::LoggingConfig;
use crate::logger::types::{DecisionAction, DecisionLogEntry, DecisionLogSink};
use tracing::info;

pub struct ConsoleLogSink {
    config: LoggingConfig,
}

impl ConsoleLogSink {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    fn should_log(&self, action: DecisionAction) -> bool {
        match action {
            DecisionAction::Cancelled | DecisionAction::Redirected => self.config.log_blocked,
            DecisionAction::Allowed => self.config.log_all_requests,
        }
    }
}

impl DecisionLogSink for ConsoleLogSink {
    fn accepts(&self, action: DecisionAction) -> bool {
        self.config.enable && self.should_log(action)
    }

    fn log(&self, entry: &DecisionLogEntry) {
        if !self.accepts(entry.action) {
            return;
        }

        if self.config.format == "json" {
            info!(
                target: "adblock_decision",
                url = %entry.url,
                host = %entry.hostname,
                r#type = entry.resource_type.as_filter_str(),
                action = ?entry.action,
                branch = ?entry.branch,
                redirect = ?entry.redirect,
                lat_us = entry.latency_us
            );
        } else {
            let action_str = match (&entry.action, &entry.redirect) {
                (DecisionAction::Redirected, Some(target)) => format!("redirected to {}", target),
                (DecisionAction::Redirected, None) => "redirected".to_string(),
                (DecisionAction::Cancelled, _) => "cancelled".to_string(),
                (DecisionAction::Allowed, _) => "allowed".to_string(),
            };

            info!(
                "[{}] {} -> {} by {:?} [{}us]",
                entry.resource_type.as_filter_str(),
                entry.url,
                action_str,
                entry.branch,
                entry.latency_us
            );
        }
    }
}
