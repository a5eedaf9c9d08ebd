//! Memoizing caches keyed by directory identity.
//!
//! Discovery hits the same directories from many threads at once (every
//! project shares the working-directory manifest, plugins share install
//! locations). The caches here guarantee at most one real filesystem parse
//! per directory by memoizing the in-flight computation, not just its result.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use crate::core::errors::Error;
use crate::core::manifest::Manifest;

/// A map from key to a single-flight computation handle.
///
/// Concurrent first access for the same key resolves to exactly one
/// underlying computation; late arrivals block on the entry's `OnceLock`
/// and observe the identical value.
#[derive(Debug)]
pub struct OnceMap<K, V> {
    entries: Mutex<HashMap<K, Arc<OnceLock<V>>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> OnceMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        OnceMap {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cached value for `key`, computing it with `init` on first
    /// access. `init` runs outside the map lock, so a slow computation for
    /// one key never blocks lookups of other keys.
    pub fn get_or_init(&self, key: &K, init: impl FnOnce() -> V) -> V {
        let cell = {
            let mut entries = self.entries.lock().unwrap();
            Arc::clone(
                entries
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(OnceLock::new())),
            )
        };
        cell.get_or_init(init).clone()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for OnceMap<K, V> {
    fn default() -> Self {
        OnceMap::new()
    }
}

/// Memoizes the parsed manifest (or its failure) per directory.
///
/// A parse failure is cached and replayed identically on every subsequent
/// lookup for the same directory. Callers observing an error can rely on it
/// being the same error the first caller saw.
#[derive(Debug, Default)]
pub struct ManifestCache {
    entries: OnceMap<PathBuf, Result<Arc<Manifest>, Error>>,
}

impl ManifestCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        ManifestCache::default()
    }

    /// Parse the manifest in `dir`, or replay the cached outcome.
    pub fn parse(&self, dir: &Path) -> Result<Arc<Manifest>, Error> {
        self.entries
            .get_or_init(&dir.to_path_buf(), || Manifest::load(dir).map(Arc::new))
    }
}

/// Memoizes, per directory, whether that directory's manifest marks the
/// package as a plugin.
///
/// Eligibility swallows manifest failures: a broken plugin manifest must not
/// abort the whole workspace scan, so any parse error here reads as
/// "not a plugin". This is deliberately laxer than [`ManifestCache`], which
/// replays failures.
#[derive(Debug, Default)]
pub struct PluginCache {
    entries: OnceMap<PathBuf, bool>,
}

impl PluginCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        PluginCache::default()
    }

    /// Whether the package installed in `dir` is a flotilla plugin, i.e. its
    /// manifest declares a regular dependency on the marker package.
    pub fn is_plugin(&self, dir: &Path, manifests: &ManifestCache) -> bool {
        self.entries.get_or_init(&dir.to_path_buf(), || {
            match manifests.parse(dir) {
                Ok(manifest) => manifest
                    .dependencies
                    .contains_key(crate::core::PLUGIN_MARKER_PACKAGE),
                Err(err) => {
                    tracing::debug!(
                        "treating {} as non-plugin: {}",
                        dir.display(),
                        err
                    );
                    false
                }
            }
        })
    }
}

/// The two caches shared across concurrent project construction.
#[derive(Debug, Default)]
pub struct Caches {
    /// Parsed manifests by directory.
    pub manifests: ManifestCache,
    /// Plugin eligibility by directory.
    pub plugins: PluginCache,
}

impl Caches {
    /// Create empty caches.
    pub fn new() -> Self {
        Caches::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_once_map_single_flight() {
        let map: Arc<OnceMap<u32, usize>> = Arc::new(OnceMap::new());
        let computations = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let map = Arc::clone(&map);
                let computations = Arc::clone(&computations);
                std::thread::spawn(move || {
                    map.get_or_init(&7, || {
                        computations.fetch_add(1, Ordering::SeqCst);
                        42
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(computations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manifest_cache_replays_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Anchor.toml"), "not [valid toml").unwrap();

        let cache = ManifestCache::new();
        let first = cache.parse(tmp.path()).unwrap_err();
        // Fixing the file on disk must not change the cached outcome.
        std::fs::write(
            tmp.path().join("Anchor.toml"),
            "[package]\nname = \"fixed\"\n",
        )
        .unwrap();
        let second = cache.parse(tmp.path()).unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_plugin_cache_swallows_parse_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Anchor.toml"), "not [valid toml").unwrap();

        let manifests = ManifestCache::new();
        let plugins = PluginCache::new();
        assert!(!plugins.is_plugin(tmp.path(), &manifests));
        // The manifest cache itself still replays the failure.
        assert!(manifests.parse(tmp.path()).is_err());
    }
}
