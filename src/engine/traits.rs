use super::RuleSet;
use crate::classifier::ResourceType;
use std::sync::Arc;

/// Result of a single rule query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// A blocking rule matched and no exception overrode it.
    pub matched: bool,
    /// Replacement resource for the request, if a redirect rule applied.
    pub redirect: Option<String>,
}

/// The "Hot Path" engine for checking requests.
pub trait RuleMatcher: Send + Sync {
    /// Never fails: malformed or non-HTTP(S) input is simply not matched.
    fn query(
        &self,
        request_url: &str,
        source_url: &str,
        resource_type: ResourceType,
        third_party: bool,
    ) -> MatchResult;
}

/// The "Control Plane" for updates.
#[async_trait::async_trait]
pub trait FilterManager: Send + Sync {
    /// Brings cached lists up to date and compiles a new RuleSet.
    /// `None` means no rules could be loaded.
    async fn refresh(&self) -> Option<Arc<RuleSet>>;
}
