//! Initialization helpers for the application startup.

use crate::config::Config;
use crate::logger::{ConsoleLogSink, DecisionLogSink, DecisionLogger, MemoryLogSink, SharedLogBuffer};
use std::sync::Arc;
use tracing::{info, warn};

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();

        // HTTP client internals are noisy at debug; keep them quiet unless asked for
        for noisy in ["hyper", "hyper_util", "reqwest", "rustls"] {
            if !filter.contains(noisy) {
                filter.push_str(&format!(",{noisy}=warn"));
            }
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    // A second call (tests, embedders) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

/// Builds the decision logger from `logging.decision_log_sinks`.
///
/// Returns the logger and, when the `memory` sink is configured, the buffer
/// it writes to so callers can read recent decisions back.
pub fn init_decision_logger(config: &Config) -> (Arc<DecisionLogger>, Option<SharedLogBuffer>) {
    if !config.logging.enable {
        info!("Decision logging disabled.");
        return (DecisionLogger::disabled(), None);
    }

    let mut sinks: Vec<Box<dyn DecisionLogSink>> = Vec::new();
    let mut buffer = None;

    for name in &config.logging.decision_log_sinks {
        match name.as_str() {
            "console" => sinks.push(Box::new(ConsoleLogSink::new(config.logging.clone()))),
            "memory" => {
                let sink = MemoryLogSink::new(config.logging.memory_capacity);
                buffer = Some(sink.clone_buffer());
                sinks.push(Box::new(sink));
            }
            other => warn!("Unknown decision log sink '{}', ignoring", other),
        }
    }

    info!("Decision log sinks: {:?}", config.logging.decision_log_sinks);
    (DecisionLogger::new(sinks), buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_selection() {
        let mut config = Config::default();
        config.logging.decision_log_sinks =
            vec!["memory".to_string(), "syslog".to_string(), "console".to_string()];
        let (logger, buffer) = init_decision_logger(&config);
        assert!(logger.is_enabled());
        assert!(buffer.is_some());

        config.logging.decision_log_sinks = vec!["console".to_string()];
        let (_, buffer) = init_decision_logger(&config);
        assert!(buffer.is_none());

        config.logging.enable = false;
        let (logger, _) = init_decision_logger(&config);
        assert!(!logger.is_enabled());
    }
}
