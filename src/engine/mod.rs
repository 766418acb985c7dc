mod manager;
mod matcher;
pub mod state;
pub mod store;
mod traits;

pub use manager::StandardManager;
pub use matcher::{AdblockMatcher, RuleSet};
pub use state::{spawn_settings_listener, GeneralSettings, SettingsState, SettingsUpdate};
pub use store::{DownloadError, FilterList, FilterStore};
pub use traits::{FilterManager, MatchResult, RuleMatcher};
