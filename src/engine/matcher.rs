use super::traits::{MatchResult, RuleMatcher};
use crate::classifier::{parse_http_url, ResourceType};
use adblock::lists::{FilterSet, ParseOptions};
use adblock::request::Request;
use adblock::Engine;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{error, info, warn};

/// A compiled, read-only set of filter rules.
pub struct RuleSet {
    matcher: Arc<dyn RuleMatcher>,
    built_at: SystemTime,
    line_count: usize,
}

impl RuleSet {
    pub fn new(matcher: Arc<dyn RuleMatcher>, line_count: usize) -> Self {
        Self {
            matcher,
            built_at: SystemTime::now(),
            line_count,
        }
    }

    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    /// Number of raw lines the set was compiled from (comments included).
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn query(
        &self,
        request_url: &str,
        source_url: &str,
        resource_type: ResourceType,
        third_party: bool,
    ) -> MatchResult {
        self.matcher
            .query(request_url, source_url, resource_type, third_party)
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("built_at", &self.built_at)
            .field("line_count", &self.line_count)
            .finish_non_exhaustive()
    }
}

/// Filter-list matcher backed by adblock-rust (EasyList / uBlock syntax).
pub struct AdblockMatcher {
    engine: Engine,
}

impl AdblockMatcher {
    pub fn from_lines(lines: &[String]) -> Self {
        let mut filter_set = FilterSet::new(false);
        filter_set.add_filters(lines, ParseOptions::default());
        Self {
            engine: Engine::from_filter_set(filter_set, true),
        }
    }

    /// Compiles `lines` into a RuleSet. Returns `None` for empty input, and
    /// also when the filter parser panics on hostile list content.
    pub fn build(lines: &[String]) -> Option<RuleSet> {
        if lines.is_empty() {
            warn!("No filter rules loaded; generic blocking disabled");
            return None;
        }

        let start = Instant::now();
        match panic::catch_unwind(AssertUnwindSafe(|| Self::from_lines(lines))) {
            Ok(matcher) => {
                info!(
                    "Compiled {} filter lines in {}ms",
                    lines.len(),
                    start.elapsed().as_millis()
                );
                Some(RuleSet::new(Arc::new(matcher), lines.len()))
            }
            Err(_) => {
                error!("Filter compilation failed; generic blocking disabled");
                None
            }
        }
    }
}

impl RuleMatcher for AdblockMatcher {
    fn query(
        &self,
        request_url: &str,
        source_url: &str,
        resource_type: ResourceType,
        third_party: bool,
    ) -> MatchResult {
        let (Some(url), Some(source)) = (parse_http_url(request_url), parse_http_url(source_url))
        else {
            return MatchResult::default();
        };

        let request = Request::preparsed(
            url.as_str(),
            url.host_str().unwrap_or_default(),
            source.host_str().unwrap_or_default(),
            resource_type.as_filter_str(),
            third_party,
        );
        let result = self.engine.check_network_request(&request);

        MatchResult {
            matched: result.matched,
            redirect: result.redirect.filter(|r| !r.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_empty_input_disables_engine() {
        assert!(AdblockMatcher::build(&[]).is_none());
    }

    #[test]
    fn test_domain_rule_blocks_subresource() {
        let set = AdblockMatcher::build(&rules(&["! comment", "||ads.example.com^"])).unwrap();
        assert_eq!(set.line_count(), 2);

        let result = set.query(
            "https://ads.example.com/banner.js",
            "https://site.test/",
            ResourceType::Script,
            true,
        );
        assert!(result.matched);
        assert!(result.redirect.is_none());

        let result = set.query(
            "https://site.test/app.js",
            "https://site.test/",
            ResourceType::Script,
            true,
        );
        assert!(!result.matched);
    }

    #[test]
    fn test_exception_rule_overrides_block() {
        let set = AdblockMatcher::build(&rules(&[
            "||ads.example.com^",
            "@@||ads.example.com/allowed.js",
        ]))
        .unwrap();

        let blocked = set.query(
            "https://ads.example.com/banner.js",
            "https://site.test/",
            ResourceType::Script,
            true,
        );
        let allowed = set.query(
            "https://ads.example.com/allowed.js",
            "https://site.test/",
            ResourceType::Script,
            true,
        );
        assert!(blocked.matched);
        assert!(!allowed.matched);
    }

    #[test]
    fn test_resource_type_qualifier() {
        let set = AdblockMatcher::build(&rules(&["||cdn.example.org^$image"])).unwrap();

        let image = set.query(
            "https://cdn.example.org/pixel.png",
            "https://site.test/",
            ResourceType::Image,
            true,
        );
        let script = set.query(
            "https://cdn.example.org/lib.js",
            "https://site.test/",
            ResourceType::Script,
            true,
        );
        assert!(image.matched);
        assert!(!script.matched);
    }

    #[test]
    fn test_non_http_urls_never_match() {
        let set = AdblockMatcher::build(&rules(&["||ads.example.com^"])).unwrap();

        for url in ["ftp://ads.example.com/banner.js", "garbage", ""] {
            let result = set.query(url, "https://site.test/", ResourceType::Script, true);
            assert_eq!(result, MatchResult::default(), "{url}");
        }
        let result = set.query(
            "https://ads.example.com/banner.js",
            "about:blank",
            ResourceType::Script,
            true,
        );
        assert!(!result.matched);
    }
}
