mod binder;
mod memory;
mod types;

pub use binder::{InitOutcome, SessionBinder};
pub use memory::MemorySession;
pub use types::{NetworkSession, RequestHook, UrlFilter};
