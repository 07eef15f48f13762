use url::Url;

pub type TabId = u32;

/// A page context addressed by tab id, with the address it currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TabId,
    pub url: String,
}

impl Target {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self { id, url: url.into() }
    }

    pub fn is_restricted(&self) -> bool {
        is_restricted_surface(&self.url)
    }
}

const RESTRICTED_SCHEMES: &[&str] = &[
    "about",
    "brave",
    "chrome",
    "chrome-extension",
    "chrome-search",
    "chrome-untrusted",
    "devtools",
    "edge",
    "moz-extension",
    "opera",
    "resource",
    "view-source",
    "vivaldi",
];

const LEGACY_WEB_STORE_HOST: &str = "chrome.google.com";
const WEB_STORE_HOST: &str = "chromewebstore.google.com";

/// Whether script injection into `url` is forbidden by the host platform.
///
/// An address that does not parse cannot be injected into either, so it is
/// classified as restricted.
pub fn is_restricted_surface(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return true;
    };
    if RESTRICTED_SCHEMES
        .iter()
        .any(|scheme| parsed.scheme().eq_ignore_ascii_case(scheme))
    {
        return true;
    }
    match parsed.host_str() {
        Some(LEGACY_WEB_STORE_HOST) => parsed.path().starts_with("/webstore"),
        Some(host) => host == WEB_STORE_HOST,
        None => false,
    }
}
