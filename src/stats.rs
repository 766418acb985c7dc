use crate::pipeline::{Decision, DecisionBranch};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::info;

#[derive(Debug, Default)]
pub struct StatsCollector {
    total_requests: AtomicU64,
    allowed: AtomicU64,
    cancelled: AtomicU64,
    redirected: AtomicU64,
    // Indexed by `DecisionBranch as usize`.
    by_branch: [AtomicU64; DecisionBranch::COUNT],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub allowed: u64,
    pub cancelled: u64,
    pub redirected: u64,
    pub disabled: u64,
    pub video_host: u64,
    pub video_cdn: u64,
    pub no_rules: u64,
    pub generic: u64,
    pub fail_open: u64,
}

impl StatsCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, branch: DecisionBranch, decision: &Decision) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let counter = match decision {
            Decision::Allow => &self.allowed,
            Decision::Cancel => &self.cancelled,
            Decision::Redirect(_) => &self.redirected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.by_branch[branch as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let branch = |b: DecisionBranch| self.by_branch[b as usize].load(Ordering::Relaxed);
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            redirected: self.redirected.load(Ordering::Relaxed),
            disabled: branch(DecisionBranch::Disabled),
            video_host: branch(DecisionBranch::VideoHost),
            video_cdn: branch(DecisionBranch::VideoCdn),
            no_rules: branch(DecisionBranch::NoRules),
            generic: branch(DecisionBranch::Generic),
            fail_open: branch(DecisionBranch::FailOpen),
        }
    }

    /// Periodically dumps the counters to the log.
    pub fn spawn_reporter(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let stats = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                stats.dump_stats();
            }
        })
    }

    fn dump_stats(&self) {
        let s = self.snapshot();
        let blocked = s.cancelled + s.redirected;
        info!(
            "STATS DUMP: Total: {}, Blocked: {} ({:.1}%), Redirected: {}, \
             Branches: [off: {}] [video: {}] [cdn: {}] [no-rules: {}] [generic: {}] [fail-open: {}]",
            s.total_requests,
            blocked,
            if s.total_requests > 0 {
                (blocked as f64 / s.total_requests as f64) * 100.0
            } else {
                0.0
            },
            s.redirected,
            s.disabled,
            s.video_host,
            s.video_cdn,
            s.no_rules,
            s.generic,
            s.fail_open
        );
    }
}
