//! Name-keyed registry of platform adapters.

use crate::adapter::PlatformAdapter;
use crate::error::{Result, ScrapeError};
use crate::indeed::IndeedAdapter;
use crate::linkedin::{LinkedInAdapter, EXTRA_HEADERS};
use jobhub_core::{FetchConfig, PlatformName};
use jobhub_fetch::Fetcher;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Registry of adapters, indexed by platform name.
///
/// Cloning is cheap; clones share the same adapters.
#[derive(Clone)]
pub struct PlatformRegistry {
    adapters: Arc<RwLock<HashMap<PlatformName, Arc<dyn PlatformAdapter>>>>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry with the Indeed and LinkedIn adapters, each with its own
    /// fetch session.
    pub fn with_defaults(config: &FetchConfig) -> Result<Self> {
        let registry = Self::new();

        let indeed_fetcher = Fetcher::new(config).map_err(|source| ScrapeError::Fetch {
            platform: PlatformName::new("indeed").expect("static platform name is valid"),
            source,
        })?;
        registry.insert(Arc::new(IndeedAdapter::new(Arc::new(indeed_fetcher))?));

        let linkedin_fetcher = Fetcher::new(config)
            .map_err(|source| ScrapeError::Fetch {
                platform: PlatformName::new("linkedin").expect("static platform name is valid"),
                source,
            })?
            .with_headers(EXTRA_HEADERS);
        registry.insert(Arc::new(LinkedInAdapter::new(Arc::new(linkedin_fetcher))?));

        info!(count = registry.count(), "registered platform adapters");
        Ok(registry)
    }

    /// Add or replace an adapter under its own name.
    pub fn insert(&self, adapter: Arc<dyn PlatformAdapter>) {
        let name = adapter.name();
        let mut adapters = self
            .adapters
            .write()
            .expect("acquire write lock on adapters");
        adapters.insert(name.clone(), adapter);

        debug!(platform = %name, "registered platform adapter");
    }

    /// Get the adapter for a platform.
    ///
    /// # Errors
    /// Returns `UnsupportedPlatform` if nothing is registered under `name`.
    pub fn get(&self, name: &PlatformName) -> Result<Arc<dyn PlatformAdapter>> {
        let adapters = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");

        adapters
            .get(name)
            .cloned()
            .ok_or_else(|| ScrapeError::UnsupportedPlatform(name.to_string()))
    }

    /// Check if a platform is registered.
    #[must_use]
    pub fn contains(&self, name: &PlatformName) -> bool {
        let adapters = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");

        adapters.contains_key(name)
    }

    /// Remove an adapter. Returns `true` if it was present.
    pub fn remove(&self, name: &PlatformName) -> bool {
        let mut adapters = self
            .adapters
            .write()
            .expect("acquire write lock on adapters");

        adapters.remove(name).is_some()
    }

    /// Registered platform names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<PlatformName> {
        let adapters = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");

        let mut names: Vec<_> = adapters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn count(&self) -> usize {
        let adapters = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");

        adapters.len()
    }

    /// Probe every registered platform, one after another.
    pub async fn test_connections(&self) -> BTreeMap<String, bool> {
        let adapters: Vec<Arc<dyn PlatformAdapter>> = {
            let adapters = self
                .adapters
                .read()
                .expect("acquire read lock on adapters");
            adapters.values().cloned().collect()
        };

        let mut results = BTreeMap::new();
        for adapter in adapters {
            let reachable = adapter.test_connection().await;
            results.insert(adapter.name().to_string(), reachable);
        }
        results
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::new()
    }
}
