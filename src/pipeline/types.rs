use crate::classifier::{self, NativeResourceType, ResourceType};
use serde::Serialize;

/// What the network layer answers for one intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Cancel,
    Redirect(String),
}

/// Which pipeline stage produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DecisionBranch {
    Disabled,
    VideoHost,
    VideoCdn,
    NoRules,
    Generic,
    FailOpen,
}

impl DecisionBranch {
    pub const COUNT: usize = 6;
}

/// Request as reported by the host, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDetails {
    pub url: String,
    /// Host taxonomy name such as `mainFrame` or `script`.
    pub resource_type: String,
    pub referrer: Option<String>,
    pub first_party_url: Option<String>,
}

impl RequestDetails {
    pub fn new(url: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_first_party_url(mut self, url: impl Into<String>) -> Self {
        self.first_party_url = Some(url.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    pub url: &'a str,
    pub resource_type: ResourceType,
    /// Referrer, else first-party URL, else the request URL itself.
    pub origin: &'a str,
    /// Empty when the URL did not parse as HTTP(S).
    pub hostname: String,
}

impl<'a> RequestContext<'a> {
    pub fn from_details(details: &'a RequestDetails) -> Self {
        let non_empty = |s: &'a Option<String>| s.as_deref().filter(|s| !s.is_empty());
        let origin = non_empty(&details.referrer)
            .or_else(|| non_empty(&details.first_party_url))
            .unwrap_or(details.url.as_str());

        Self {
            url: &details.url,
            resource_type: classifier::map_resource_type(NativeResourceType::from(
                details.resource_type.as_str(),
            )),
            origin,
            hostname: classifier::hostname_of(&details.url),
        }
    }
}
