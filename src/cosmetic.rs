//! Element hiding for the video platform's in-page ad containers, which
//! network filtering cannot reach.

use regex::Regex;
use std::sync::LazyLock;

/// Selectors hidden on video platform pages. Tied to the platform's current
/// DOM and expected to drift.
pub const VIDEO_AD_SELECTORS: &[&str] = &[
    "#masthead-ad",
    "#player-ads",
    ".video-ads",
    "ytd-promoted-video-renderer",
    "ytd-in-feed-ad-layout-renderer",
    "ytd-action-companion-ad-renderer",
    "ytd-display-ad-renderer",
    "ytd-video-masthead-ad-v3-renderer",
    "ytd-banner-promo-renderer",
    "ytd-companion-slot-renderer",
];

/// Attribute marking the injected style element.
pub const DOM_CLEANER_MARKER: &str = "data-adsieve-video-adblock";

// Unanchored: also hits pages that merely embed such a URL in their own.
static VIDEO_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(www\.)?youtube\.com/").expect("video page pattern is valid")
});

/// True when a finished page load should get the DOM cleaner script.
pub fn should_inject_dom_cleaner(page_url: &str) -> bool {
    VIDEO_PAGE_RE.is_match(page_url)
}

/// Self-contained script that appends one `display: none` stylesheet
/// covering [`VIDEO_AD_SELECTORS`]. Errors inside the page are swallowed.
pub fn video_dom_cleaner_script() -> String {
    let css = format!("{}{{ display: none !important; }}", VIDEO_AD_SELECTORS.join(","));
    let css_literal = serde_json::to_string(&css).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(function() {{\n  try {{\n    const style = document.createElement('style');\n    \
         style.setAttribute('{DOM_CLEANER_MARKER}', '1');\n    \
         style.textContent = {css_literal};\n    \
         document.documentElement.appendChild(style);\n  }} catch (e) {{}}\n}})();\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injects_on_video_pages_only() {
        assert!(should_inject_dom_cleaner("https://www.youtube.com/watch?v=abc"));
        assert!(should_inject_dom_cleaner("http://youtube.com/"));
        assert!(!should_inject_dom_cleaner("https://m.youtube.com/watch?v=abc"));
        assert!(!should_inject_dom_cleaner("https://www.youtube.com"));
        assert!(!should_inject_dom_cleaner("https://example.com/"));
    }

    #[test]
    fn test_embedded_video_url_also_matches() {
        assert!(should_inject_dom_cleaner(
            "https://blog.test/post?src=https://www.youtube.com/embed/abc"
        ));
        assert!(!should_inject_dom_cleaner("https://notyoutube.com/watch"));
    }

    #[test]
    fn test_script_hides_every_selector() {
        let script = video_dom_cleaner_script();
        for selector in VIDEO_AD_SELECTORS {
            assert!(script.contains(selector), "{selector}");
        }
        assert!(script.contains("display: none !important;"));
        assert!(script.contains(DOM_CLEANER_MARKER));
        assert!(script.starts_with("(function() {"));
    }
}
