use super::matcher::{AdblockMatcher, RuleSet};
use super::store::{FilterList, FilterStore};
use super::traits::FilterManager;
use crate::config::Config;
use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{error, info};

pub struct StandardManager {
    store: FilterStore,
    lists: Vec<FilterList>,
    concurrent_downloads: usize,
}

impl StandardManager {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::with_store(
            FilterStore::from_config(config)?,
            config.get_filter_lists_sorted(),
            config.updates.concurrent_downloads,
        ))
    }

    pub fn with_store(
        store: FilterStore,
        lists: Vec<FilterList>,
        concurrent_downloads: usize,
    ) -> Self {
        Self {
            store,
            lists,
            concurrent_downloads: concurrent_downloads.max(1),
        }
    }

    /// Lists taking part in refresh and load. Disabled lists are skipped for both.
    pub fn enabled_lists(&self) -> Vec<FilterList> {
        self.lists.iter().filter(|l| l.enabled).cloned().collect()
    }

    /// Downloads whatever is missing or stale. Failures are logged and
    /// swallowed: a list that cannot be fetched just contributes fewer rules.
    pub async fn refresh_lists(&self, lists: &[FilterList]) {
        let tasks = lists.iter().cloned().map(|list| {
            let store = self.store.clone();
            async move {
                if let Err(e) = store.ensure_fresh(&list).await {
                    error!("Failed to download {}: {}", list.label, e);
                }
            }
        });

        stream::iter(tasks)
            .buffer_unordered(self.concurrent_downloads)
            .collect::<Vec<()>>()
            .await;
    }
}

#[async_trait::async_trait]
impl FilterManager for StandardManager {
    async fn refresh(&self) -> Option<Arc<RuleSet>> {
        info!("Refreshing filter lists...");
        let lists = self.enabled_lists();
        self.refresh_lists(&lists).await;

        let lines = FilterStore::load_all_rule_lines(&lists).await;
        info!(
            "Loaded {} filter lines from {} lists",
            lines.len(),
            lists.len()
        );

        // Compilation is CPU-bound; keep it off the async workers.
        match tokio::task::spawn_blocking(move || AdblockMatcher::build(&lines)).await {
            Ok(rules) => rules.map(Arc::new),
            Err(e) => {
                error!("Filter compilation task failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn list(dir: &std::path::Path, name: &str, enabled: bool) -> FilterList {
        FilterList {
            name: name.to_string(),
            label: name.to_string(),
            // Port 9 (discard) on loopback: connection refused, fails fast.
            url: format!("http://127.0.0.1:9/{name}.txt"),
            path: dir.join(format!("{name}.txt")),
            max_age: Duration::from_secs(7 * 86400),
            enabled,
        }
    }

    #[tokio::test]
    async fn test_refresh_builds_from_fresh_cache_only_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let on = list(dir.path(), "on", true);
        let off = list(dir.path(), "off", false);
        std::fs::write(&on.path, "||ads.example.com^\n").unwrap();
        std::fs::write(&off.path, "||other.example.com^\nx\ny\n").unwrap();

        let manager = StandardManager::with_store(
            FilterStore::new(reqwest::Client::new()),
            vec![off, on],
            2,
        );
        let rules = manager.refresh().await.expect("rules from cached list");
        assert_eq!(rules.line_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_any_rules_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StandardManager::with_store(
            FilterStore::new(reqwest::Client::new()),
            vec![list(dir.path(), "missing", true)],
            1,
        );
        assert!(manager.refresh().await.is_none());
    }
}
