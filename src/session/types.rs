use crate::pipeline::{Decision, RequestDetails};
use futures::future::BoxFuture;
use std::sync::Arc;
use url::Url;

/// Callback a session invokes once per outgoing request.
pub type RequestHook = Arc<dyn Fn(RequestDetails) -> BoxFuture<'static, Decision> + Send + Sync>;

/// Match patterns in the `<scheme>://<host>/<path>` form used by browser
/// request interception APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFilter {
    pub urls: Vec<String>,
}

impl UrlFilter {
    pub const ALL_URLS: &'static str = "*://*/*";

    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }

    /// Every origin, every path.
    pub fn all_urls() -> Self {
        Self::new(vec![Self::ALL_URLS.to_string()])
    }

    pub fn matches(&self, raw: &str) -> bool {
        let Ok(url) = Url::parse(raw) else {
            return false;
        };
        self.urls.iter().any(|pattern| pattern_matches(pattern, &url))
    }
}

fn pattern_matches(pattern: &str, url: &Url) -> bool {
    let Some((scheme, rest)) = pattern.split_once("://") else {
        return false;
    };
    let (host, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/*"),
    };

    let scheme_ok = match scheme {
        // `*` only covers web schemes, not file:// or data:
        "*" => matches!(url.scheme(), "http" | "https" | "ws" | "wss"),
        s => s.eq_ignore_ascii_case(url.scheme()),
    };
    if !scheme_ok {
        return false;
    }

    let url_host = url.host_str().unwrap_or_default();
    let host_ok = match host {
        "*" => true,
        h => match h.strip_prefix("*.") {
            Some(base) => {
                url_host.eq_ignore_ascii_case(base)
                    || url_host
                        .to_ascii_lowercase()
                        .ends_with(&format!(".{}", base.to_ascii_lowercase()))
            }
            None => url_host.eq_ignore_ascii_case(h),
        },
    };
    if !host_ok {
        return false;
    }

    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    glob_match(path, &target)
}

/// `*` matches any run of characters, everything else is literal.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        // No wildcard at all
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// One browsing-context network session (a tab, popup or embedded view).
pub trait NetworkSession: Send + Sync {
    fn id(&self) -> &str;

    /// Sets the session's bound tag. Returns `false` when it was already set.
    fn try_mark_bound(&self) -> bool;

    /// Drops whatever before-request hook is registered.
    fn clear_request_hook(&self);

    /// Registers `hook`, replacing any previous one.
    fn on_before_request(&self, filter: UrlFilter, hook: RequestHook);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_urls_covers_web_schemes_only() {
        let filter = UrlFilter::all_urls();
        assert!(filter.matches("https://ads.example.com/banner.js"));
        assert!(filter.matches("http://site.test/"));
        assert!(filter.matches("wss://live.site.test/socket?x=1"));
        assert!(!filter.matches("file:///etc/hosts"));
        assert!(!filter.matches("data:text/plain,hi"));
        assert!(!filter.matches("not a url"));
    }

    #[test]
    fn test_host_and_path_patterns() {
        let filter = UrlFilter::new(vec!["https://*.example.com/ads/*".to_string()]);
        assert!(filter.matches("https://example.com/ads/1.js"));
        assert!(filter.matches("https://cdn.Example.com/ads/x?y=1"));
        assert!(!filter.matches("https://notexample.com/ads/1.js"));
        assert!(!filter.matches("http://cdn.example.com/ads/1.js"));
        assert!(!filter.matches("https://cdn.example.com/img/1.png"));
    }

    #[test]
    fn test_glob() {
        assert!(glob_match("/*", "/anything?at=all"));
        assert!(glob_match("/a*b*c", "/a--b--c"));
        assert!(!glob_match("/a*b*c", "/a--c--b"));
        assert!(glob_match("/exact", "/exact"));
        assert!(!glob_match("/exact", "/exactly"));
    }
}
