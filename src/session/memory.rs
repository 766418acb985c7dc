use super::types::{NetworkSession, RequestHook, UrlFilter};
use crate::pipeline::{Decision, RequestDetails};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

/// In-process session: holds at most one hook and dispatches requests to it.
/// Used by the driver binary and by embedders without a real browser layer.
pub struct MemorySession {
    id: String,
    bound: AtomicBool,
    hook: RwLock<Option<(UrlFilter, RequestHook)>>,
    registrations: AtomicUsize,
}

impl MemorySession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bound: AtomicBool::new(false),
            hook: RwLock::new(None),
            registrations: AtomicUsize::new(0),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    pub fn has_hook(&self) -> bool {
        self.hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// How many times a hook was registered over the session's life.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::Relaxed)
    }

    /// Runs `details` through the registered hook. Requests outside the hook's
    /// URL filter, or arriving before any hook exists, are allowed.
    pub async fn dispatch(&self, details: RequestDetails) -> Decision {
        let hook = {
            let guard = self.hook.read().unwrap_or_else(PoisonError::into_inner);
            guard
                .as_ref()
                .filter(|(filter, _)| filter.matches(&details.url))
                .map(|(_, hook)| hook.clone())
        };
        match hook {
            Some(hook) => hook(details).await,
            None => Decision::Allow,
        }
    }
}

impl NetworkSession for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn try_mark_bound(&self) -> bool {
        self.bound
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn clear_request_hook(&self) {
        *self.hook.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn on_before_request(&self, filter: UrlFilter, hook: RequestHook) {
        *self.hook.write().unwrap_or_else(PoisonError::into_inner) = Some((filter, hook));
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }
}
