//! Pure request classification: URL validation, resource-type mapping and
//! the video-platform special cases that run before the generic rule engine.

use serde::Serialize;
use url::Url;

/// Primary video-platform domains. Matching is exact or by dot-suffix, so
/// `www.` and `m.` subdomains are covered.
pub const VIDEO_HOST_DOMAINS: &[&str] = &["youtube.com", "youtube-nocookie.com"];

/// Substring identifying the video platform's stream CDN hostnames.
pub const VIDEO_CDN_MARKER: &str = "googlevideo.com";

const VIDEO_PLAYBACK_ENDPOINT: &str = "googlevideo.com/videoplayback";

const VIDEO_AD_ENDPOINTS: &[&str] = &[
    "doubleclick.net/pagead/",
    "doubleclick.net/gampad/",
    "doubleclick.net/pcs/",
    "doubleclick.net/adx/",
    "doubleclick.net/ad",
    "youtube.com/api/stats/ads",
    "youtube.com/pagead/",
    "youtube.com/get_midroll",
    "youtube.com/youtubei/v1/playerad",
    "youtube.com/youtubei/v1/ads",
    "youtube.com/youtubei/v1/nextad",
    "youtube.com/ptracking",
];

const VIDEO_AD_STREAM_PARAMS: &[&str] = &[
    "ctier=l",
    "oad",
    "oads",
    "adformat",
    "source=yt_otf",
    "label=ad",
];

/// Request types as reported by the host network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeResourceType {
    MainFrame,
    SubFrame,
    Script,
    Stylesheet,
    Image,
    Xhr,
    Media,
    Font,
    Object,
    Ping,
    CspReport,
    WebSocket,
    Other,
}

impl From<&str> for NativeResourceType {
    fn from(value: &str) -> Self {
        match value {
            "mainFrame" => Self::MainFrame,
            "subFrame" => Self::SubFrame,
            "script" => Self::Script,
            "stylesheet" => Self::Stylesheet,
            "image" => Self::Image,
            "xhr" | "xmlhttprequest" => Self::Xhr,
            "media" => Self::Media,
            "font" => Self::Font,
            "object" => Self::Object,
            "ping" => Self::Ping,
            "cspReport" => Self::CspReport,
            "webSocket" => Self::WebSocket,
            _ => Self::Other,
        }
    }
}

/// Request types in the filter-list taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Subdocument,
    Script,
    Stylesheet,
    Image,
    Xhr,
    Media,
    Font,
    Other,
}

impl ResourceType {
    /// Name understood by the filter engine's `$type` options.
    pub fn as_filter_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Subdocument => "subdocument",
            Self::Script => "script",
            Self::Stylesheet => "stylesheet",
            Self::Image => "image",
            Self::Xhr => "xmlhttprequest",
            Self::Media => "media",
            Self::Font => "font",
            Self::Other => "other",
        }
    }

    pub fn is_frame(self) -> bool {
        matches!(self, Self::Document | Self::Subdocument)
    }
}

pub fn map_resource_type(native: NativeResourceType) -> ResourceType {
    match native {
        NativeResourceType::MainFrame => ResourceType::Document,
        NativeResourceType::SubFrame => ResourceType::Subdocument,
        NativeResourceType::Script => ResourceType::Script,
        NativeResourceType::Stylesheet => ResourceType::Stylesheet,
        NativeResourceType::Image => ResourceType::Image,
        NativeResourceType::Xhr => ResourceType::Xhr,
        NativeResourceType::Media => ResourceType::Media,
        NativeResourceType::Font => ResourceType::Font,
        NativeResourceType::Object
        | NativeResourceType::Ping
        | NativeResourceType::CspReport
        | NativeResourceType::WebSocket
        | NativeResourceType::Other => ResourceType::Other,
    }
}

/// Parses `raw`, keeping it only if the scheme is `http` or `https`.
pub fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Best-effort hostname; empty when the URL is unparseable or not HTTP(S).
pub fn hostname_of(raw: &str) -> String {
    parse_http_url(raw)
        .and_then(|url| url.host_str().map(str::to_owned))
        .unwrap_or_default()
}

pub fn is_known_video_host(hostname: &str) -> bool {
    if hostname.is_empty() {
        return false;
    }
    let host = hostname.to_ascii_lowercase();
    VIDEO_HOST_DOMAINS.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

pub fn is_video_cdn_host(hostname: &str) -> bool {
    hostname.to_ascii_lowercase().contains(VIDEO_CDN_MARKER)
}

/// Substring match over the whole URL. Approximate: a query parameter that
/// happens to contain one of the markers also matches.
pub fn is_known_video_ad_endpoint(url: &str, _hostname: &str) -> bool {
    let url = url.to_lowercase();
    VIDEO_AD_ENDPOINTS.iter().any(|p| url.contains(p))
}

pub fn is_known_video_ad_stream(url: &str) -> bool {
    let url = url.to_lowercase();
    if !url.contains(VIDEO_PLAYBACK_ENDPOINT) {
        return false;
    }
    VIDEO_AD_STREAM_PARAMS.iter().any(|p| url.contains(p))
}
