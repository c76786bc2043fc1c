//! Media URL policy for story uploads.

use url::Url;

/// Checks that story media is hosted by the approved media provider.
#[derive(Debug, Clone)]
pub struct MediaPolicy {
    allowed_host: String,
}

impl MediaPolicy {
    pub fn new(allowed_host: impl Into<String>) -> Self {
        Self {
            allowed_host: allowed_host.into().trim().trim_start_matches('.').to_lowercase(),
        }
    }

    pub fn allowed_host(&self) -> &str {
        &self.allowed_host
    }

    /// True when `raw` parses as an http(s) URL whose host is the approved
    /// host or one of its subdomains.
    pub fn is_allowed(&self, raw: &str) -> bool {
        let Ok(url) = Url::parse(raw) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        host == self.allowed_host
            || host
                .strip_suffix(self.allowed_host.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}
