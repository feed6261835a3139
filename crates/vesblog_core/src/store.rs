//! Current-store context and media URL rewriting.
//!
//! Media fields are persisted relative to the media root; anything handed to
//! a caller goes through [`StoreInfo::media_url`].

/// Path segment between a store base URL and a stored media path.
pub const MEDIA_SEGMENT: &str = "media/";

/// Identity and public base URL of the store serving the current call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    pub store_id: i64,
    /// Always ends with `/`.
    pub base_url: String,
}

impl StoreInfo {
    pub fn new(store_id: i64, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { store_id, base_url }
    }

    /// Absolute URL for a stored media path.
    ///
    /// Paths that are already absolute `http(s)` URLs pass through unchanged.
    pub fn media_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}{MEDIA_SEGMENT}{}",
            self.base_url,
            path.trim_start_matches('/')
        )
    }

    /// Rewrites an optional media field; blank paths become `None`.
    pub fn rewrite_media(&self, path: Option<String>) -> Option<String> {
        path.filter(|value| !value.trim().is_empty())
            .map(|value| self.media_url(value.trim()))
    }
}

/// Supplies the store context for the current call.
pub trait StoreManager {
    fn current_store(&self) -> StoreInfo;
}

impl<T: StoreManager + ?Sized> StoreManager for &T {
    fn current_store(&self) -> StoreInfo {
        (**self).current_store()
    }
}

/// Store manager pinned to one configured store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticStoreManager {
    store: StoreInfo,
}

impl StaticStoreManager {
    pub fn new(store_id: i64, base_url: impl Into<String>) -> Self {
        Self {
            store: StoreInfo::new(store_id, base_url),
        }
    }
}

impl StoreManager for StaticStoreManager {
    fn current_store(&self) -> StoreInfo {
        self.store.clone()
    }
}
