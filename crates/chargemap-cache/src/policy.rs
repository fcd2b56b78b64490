use reqwest::Url;

/// Path segments of bundler/build output that the host serves with its own
/// caching headers.
pub const DEFAULT_ASSET_SEGMENTS: [&str; 2] = ["/_next/", "/assets/"];

const EXTENSION_SCHEMES: [&str; 3] = ["chrome-extension", "moz-extension", "safari-web-extension"];

/// Decides which requests the offline cache may store.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    origin: Url,
    excluded_segments: Vec<String>,
}

impl CachePolicy {
    /// Policy for `origin` with the default excluded asset segments.
    #[must_use]
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            excluded_segments: DEFAULT_ASSET_SEGMENTS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[must_use]
    pub fn with_excluded_segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_segments = segments.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// A URL is cacheable when it is same-origin, not a browser-extension URL
    /// and not under an excluded build-asset segment.
    #[must_use]
    pub fn is_cacheable(&self, url: &Url) -> bool {
        if EXTENSION_SCHEMES.contains(&url.scheme()) {
            return false;
        }
        if url.origin() != self.origin.origin() {
            return false;
        }
        let path = url.path();
        !self
            .excluded_segments
            .iter()
            .any(|segment| path.contains(segment.as_str()))
    }
}
