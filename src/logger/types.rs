use crate::classifier::ResourceType;
use crate::pipeline::{Decision, DecisionBranch};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DecisionLogEntry {
    pub url: String,
    pub hostname: String,
    pub resource_type: ResourceType,
    pub action: DecisionAction,
    pub branch: DecisionBranch,
    pub redirect: Option<String>,
    pub latency_us: u64,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum DecisionAction {
    Allowed,
    Cancelled,
    Redirected,
}

impl From<&Decision> for DecisionAction {
    fn from(decision: &Decision) -> Self {
        match decision {
            Decision::Allow => Self::Allowed,
            Decision::Cancel => Self::Cancelled,
            Decision::Redirect(_) => Self::Redirected,
        }
    }
}

impl DecisionAction {
    pub const ALL: [DecisionAction; 3] = [Self::Allowed, Self::Cancelled, Self::Redirected];
}

pub trait DecisionLogSink: Send + Sync {
    fn log(&self, entry: &DecisionLogEntry);

    /// Whether entries with `action` would be recorded. Asked once, when the
    /// sink is registered.
    fn accepts(&self, _action: DecisionAction) -> bool {
        true
    }
}
