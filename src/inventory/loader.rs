//! Load-or-fallback orchestration.
//!
//! [`Loader::load`] trusts a fresh cache file and only goes to the network
//! when the cache is stale or missing. [`Loader::reload`] always asks the
//! service and falls back to the cache file (fresh or not) when the request
//! fails at the network level. A successfully fetched document that does
//! not parse is an error: it is not retried from the cache.
//!
//! Each successful parse produces a new [`Inventory`] that is published by
//! swapping an `Arc`, so readers on other threads either see the previous
//! snapshot or the new one, never a mix. A failed load leaves the previously
//! published snapshot in place.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{CacheStore, Fetch, Inventory, InventoryBackend, InventoryParser, RemoteFetcher};
use crate::config::{BackendSettings, Config};
use crate::error::{Error, Result};

/// Where a published snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Fetched from the inventory service
    Remote,
    /// Read from the local cache file
    LocalCache,
}

impl std::fmt::Display for LoadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadSource::Remote => write!(f, "remote"),
            LoadSource::LocalCache => write!(f, "local cache"),
        }
    }
}

/// Loader lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    /// Constructed, nothing published yet
    Init,
    /// At least one snapshot has been published
    Loaded(LoadSource),
}

struct Published {
    inventory: Arc<Inventory>,
    source: Option<LoadSource>,
}

/// Loads the inventory from the service or the local cache
pub struct Loader<F: Fetch = RemoteFetcher> {
    settings: BackendSettings,
    cache: CacheStore,
    fetcher: F,
    parser: InventoryParser,
    current: RwLock<Published>,
}

impl Loader<RemoteFetcher> {
    /// Create a loader from configuration; nothing is loaded yet
    ///
    /// Fails with a configuration error before any network or file access
    /// when the service URL or the work groups are missing.
    pub fn new(config: &Config) -> Result<Self> {
        let settings = BackendSettings::from_config(config)?;
        let fetcher = RemoteFetcher::new()?;
        Ok(Self::with_fetcher(settings, fetcher))
    }

    /// Create a loader and load the inventory right away
    pub fn open(config: &Config) -> Result<Self> {
        let loader = Self::new(config)?;
        loader.load()?;
        Ok(loader)
    }
}

impl<F: Fetch> Loader<F> {
    /// Create a loader from validated settings and a custom transport
    pub fn with_fetcher(settings: BackendSettings, fetcher: F) -> Self {
        let cache = CacheStore::new(&settings.cache_dir, &settings.work_groups);
        let parser = InventoryParser::new(settings.malformed_entries);

        Self {
            settings,
            cache,
            fetcher,
            parser,
            current: RwLock::new(Published {
                inventory: Arc::new(Inventory::new()),
                source: None,
            }),
        }
    }

    /// Settings this loader was built from
    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    /// The cache store backing this loader
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Current lifecycle state
    pub fn state(&self) -> LoaderState {
        match self.current.read().source {
            Some(source) => LoaderState::Loaded(source),
            None => LoaderState::Init,
        }
    }

    /// Load the inventory, preferring a fresh local cache
    pub fn load(&self) -> Result<LoadSource> {
        if self.cache.is_fresh(self.settings.cache_ttl) {
            debug!(path = %self.cache.path().display(), "cache is fresh, loading locally");
            return self.load_local();
        }

        debug!(path = %self.cache.path().display(), "cache is stale or missing");
        self.reload()
    }

    /// Refresh the inventory from the service, falling back to the cache
    /// file on network failure
    pub fn reload(&self) -> Result<LoadSource> {
        match self.load_remote() {
            Ok(source) => Ok(source),
            Err(remote) if remote.is_network() => {
                warn!(error = %remote, "inventory service unavailable, using local cache");
                self.load_local().map_err(|local| Error::Unavailable {
                    remote: Box::new(remote),
                    local: Box::new(local),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn load_remote(&self) -> Result<LoadSource> {
        let data = self
            .fetcher
            .fetch(&self.settings.url, &self.settings.work_groups)?;
        let inventory = self.parser.parse(&data)?;
        self.publish(inventory, LoadSource::Remote);

        if let Err(e) = self.cache.write(&data) {
            warn!(error = %e, "failed to update inventory cache");
        }

        Ok(LoadSource::Remote)
    }

    fn load_local(&self) -> Result<LoadSource> {
        let data = self.cache.read()?;
        let inventory = self.parser.parse(&data)?;
        self.publish(inventory, LoadSource::LocalCache);
        Ok(LoadSource::LocalCache)
    }

    fn publish(&self, inventory: Inventory, source: LoadSource) {
        info!(
            source = %source,
            hosts = inventory.host_count(),
            groups = inventory.group_count(),
            datacenters = inventory.datacenters().len(),
            "inventory loaded"
        );

        *self.current.write() = Published {
            inventory: Arc::new(inventory),
            source: Some(source),
        };
    }
}

impl<F: Fetch> InventoryBackend for Loader<F> {
    fn load(&self) -> Result<LoadSource> {
        Loader::load(self)
    }

    fn reload(&self) -> Result<LoadSource> {
        Loader::reload(self)
    }

    fn snapshot(&self) -> Arc<Inventory> {
        Arc::clone(&self.current.read().inventory)
    }
}

impl<F: Fetch> std::fmt::Debug for Loader<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::fetch::MockFetch;
    use crate::inventory::MalformedEntryPolicy;
    use filetime::{set_file_mtime, FileTime};
    use mockall::predicate::eq;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const DOC_A: &str = r#"{"_meta":{"hostvars":{"a.x":{"dc":"dc1"}}},"g1":{"hosts":["a.x"],"children":["g2"]},"g2":{"hosts":[]}}"#;
    const DOC_B: &str = r#"{"_meta":{"hostvars":{"b.x":{"dc":"dc2"}}},"g3":{"hosts":["b.x"]}}"#;

    fn settings(dir: &TempDir) -> BackendSettings {
        BackendSettings {
            url: "http://conductor.test".to_string(),
            work_groups: vec!["infra".to_string()],
            cache_ttl: Duration::from_secs(3600),
            cache_dir: dir.path().to_path_buf(),
            malformed_entries: MalformedEntryPolicy::Skip,
        }
    }

    fn fetch_ok(doc: &'static str) -> MockFetch {
        let mut fetcher = MockFetch::new();
        fetcher
            .expect_fetch()
            .with(eq("http://conductor.test"), eq(vec!["infra".to_string()]))
            .times(1)
            .returning(move |_, _| Ok(doc.as_bytes().to_vec()));
        fetcher
    }

    fn fetch_status(status: u16) -> MockFetch {
        let mut fetcher = MockFetch::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(move |url, _| Err(Error::http_status(url, status, "error")));
        fetcher
    }

    fn make_stale(store: &CacheStore) {
        let old = SystemTime::now() - Duration::from_secs(2 * 3600);
        set_file_mtime(store.path(), FileTime::from_system_time(old)).unwrap();
    }

    fn host_names(loader: &impl InventoryBackend) -> Vec<String> {
        loader.hosts().into_iter().map(|h| h.fqdn).collect()
    }

    #[test]
    fn test_fresh_cache_skips_network() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = MockFetch::new();
        fetcher.expect_fetch().never();
        let loader = Loader::with_fetcher(settings(&dir), fetcher);
        loader.cache().write(DOC_A.as_bytes()).unwrap();

        assert_eq!(loader.load().unwrap(), LoadSource::LocalCache);
        assert_eq!(loader.state(), LoaderState::Loaded(LoadSource::LocalCache));
        assert_eq!(host_names(&loader), vec!["a.x"]);
    }

    #[test]
    fn test_missing_cache_fetches_and_persists() {
        let dir = TempDir::new().unwrap();
        let loader = Loader::with_fetcher(settings(&dir), fetch_ok(DOC_A));
        assert_eq!(loader.state(), LoaderState::Init);

        assert_eq!(loader.load().unwrap(), LoadSource::Remote);
        assert_eq!(loader.cache().read().unwrap(), DOC_A.as_bytes());

        let snapshot = loader.snapshot();
        assert_eq!(snapshot.get_group("g2").unwrap().parent_id, "g1");
        assert_eq!(snapshot.datacenters().len(), 1);
    }

    #[test]
    fn test_stale_cache_fetches() {
        let dir = TempDir::new().unwrap();
        let loader = Loader::with_fetcher(settings(&dir), fetch_ok(DOC_B));
        loader.cache().write(DOC_A.as_bytes()).unwrap();
        make_stale(loader.cache());

        assert_eq!(loader.load().unwrap(), LoadSource::Remote);
        assert_eq!(host_names(&loader), vec!["b.x"]);
        assert_eq!(loader.cache().read().unwrap(), DOC_B.as_bytes());
    }

    #[test]
    fn test_network_error_falls_back_to_stale_cache() {
        let dir = TempDir::new().unwrap();
        let loader = Loader::with_fetcher(settings(&dir), fetch_status(500));
        loader.cache().write(DOC_A.as_bytes()).unwrap();
        make_stale(loader.cache());
        let mtime = loader.cache().modified();

        assert_eq!(loader.load().unwrap(), LoadSource::LocalCache);
        assert_eq!(host_names(&loader), vec!["a.x"]);
        assert_eq!(loader.cache().modified(), mtime);
        assert_eq!(loader.cache().read().unwrap(), DOC_A.as_bytes());
    }

    #[test]
    fn test_network_error_without_cache_is_fatal() {
        let dir = TempDir::new().unwrap();
        let loader = Loader::with_fetcher(settings(&dir), fetch_status(500));

        let err = loader.reload().unwrap_err();
        match err {
            Error::Unavailable { remote, local } => {
                assert!(matches!(*remote, Error::Network { status: Some(500), .. }));
                assert!(matches!(*local, Error::LocalCache { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(loader.state(), LoaderState::Init);
        assert!(loader.snapshot().is_empty());
        assert!(!loader.cache().path().exists());
    }

    #[test]
    fn test_fetched_parse_error_does_not_fall_back() {
        let dir = TempDir::new().unwrap();
        let loader = Loader::with_fetcher(settings(&dir), fetch_ok(r#"{"g1":{}}"#));
        loader.cache().write(DOC_A.as_bytes()).unwrap();

        let err = loader.reload().unwrap_err();
        assert!(err.is_format());
        assert_eq!(loader.state(), LoaderState::Init);
        // The bad document never reaches the cache.
        assert_eq!(loader.cache().read().unwrap(), DOC_A.as_bytes());
    }

    #[test]
    fn test_fresh_cache_parse_error_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = MockFetch::new();
        fetcher.expect_fetch().never();
        let loader = Loader::with_fetcher(settings(&dir), fetcher);
        loader.cache().write(b"{ truncated").unwrap();

        assert!(loader.load().unwrap_err().is_format());
    }

    #[test]
    fn test_fallback_with_corrupt_cache_is_fatal() {
        let dir = TempDir::new().unwrap();
        let loader = Loader::with_fetcher(settings(&dir), fetch_status(502));
        loader.cache().write(b"{ truncated").unwrap();

        let err = loader.reload().unwrap_err();
        assert!(matches!(err, Error::Unavailable { ref local, .. } if local.is_format()));
    }

    #[test]
    fn test_cache_write_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut settings = settings(&dir);
        settings.cache_dir = blocker.join("cache");
        let loader = Loader::with_fetcher(settings, fetch_ok(DOC_A));

        assert_eq!(loader.reload().unwrap(), LoadSource::Remote);
        assert_eq!(host_names(&loader), vec!["a.x"]);
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = MockFetch::new();
        let mut calls = 0;
        fetcher.expect_fetch().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(DOC_A.as_bytes().to_vec())
            } else {
                Ok(b"[]".to_vec())
            }
        });
        let loader = Loader::with_fetcher(settings(&dir), fetcher);

        loader.reload().unwrap();
        let before = loader.snapshot();
        assert!(loader.reload().is_err());

        assert!(Arc::ptr_eq(&before, &loader.snapshot()));
        assert_eq!(loader.state(), LoaderState::Loaded(LoadSource::Remote));
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = MockFetch::new();
        let mut docs = vec![DOC_B, DOC_A];
        fetcher
            .expect_fetch()
            .times(2)
            .returning(move |_, _| Ok(docs.pop().unwrap().as_bytes().to_vec()));
        let loader = Loader::with_fetcher(settings(&dir), fetcher);

        loader.reload().unwrap();
        let old = loader.snapshot();
        loader.reload().unwrap();

        assert_eq!(old.hosts()[0].fqdn, "a.x");
        assert_eq!(loader.snapshot().hosts()[0].fqdn, "b.x");
    }

    #[test]
    fn test_work_groups_always_empty() {
        let dir = TempDir::new().unwrap();
        let loader = Loader::with_fetcher(settings(&dir), fetch_ok(DOC_A));
        loader.load().unwrap();
        assert!(loader.work_groups().is_empty());
    }

    #[test]
    fn test_new_rejects_missing_url() {
        let config = Config {
            backend: crate::config::BackendConfig {
                work_groups: Some("infra".to_string()),
                ..Default::default()
            },
            ..Config::default()
        };
        assert!(matches!(Loader::new(&config), Err(Error::Config(_))));
    }
}
