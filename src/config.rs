//! Configuration collaborator interface.
//!
//! Credential resolution (environment, files, keychains) lives outside
//! this crate; adapters only see the resolved values. There is no global
//! configuration singleton - a provider object is passed explicitly into
//! every adapter constructor.

use std::collections::HashMap;

use crate::providers::ProviderKind;

/// Resolves credentials and endpoints per vendor.
pub trait ConfigProvider: Send + Sync {
    /// Resolved API key (or bearer token) for a vendor, if any.
    fn api_key(&self, provider: ProviderKind) -> Option<String>;

    /// Resolved base URL override for a vendor, if any. Adapters fall back
    /// to their vendor default when absent.
    fn base_url(&self, provider: ProviderKind) -> Option<String>;
}

/// Map-backed [`ConfigProvider`] for tests and embedding applications.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    api_keys: HashMap<ProviderKind, String>,
    base_urls: HashMap<ProviderKind, String>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, provider: ProviderKind, key: impl Into<String>) -> Self {
        self.api_keys.insert(provider, key.into());
        self
    }

    pub fn with_base_url(mut self, provider: ProviderKind, url: impl Into<String>) -> Self {
        self.base_urls.insert(provider, url.into());
        self
    }
}

impl ConfigProvider for StaticConfig {
    fn api_key(&self, provider: ProviderKind) -> Option<String> {
        self.api_keys.get(&provider).cloned()
    }

    fn base_url(&self, provider: ProviderKind) -> Option<String> {
        self.base_urls.get(&provider).cloned()
    }
}
