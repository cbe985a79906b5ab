//! Module Registry with lazy loading and preloading
//!
//! Provides a registry for tool modules with:
//! - Lazy loading via per-tool `ModuleLoader` factories
//! - A shared import cache, so concurrent and repeated loads run the
//!   loader at most once per successful import
//! - Background preloading of a configured "popular" subset
//! - Data-driven export resolution: naming convention, overridable per id

use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use dk_core::widget::{ComponentConstructor, Container, ToolWidget};

use crate::error::{LoaderError, Result};
use crate::module::{export_name_for, ModuleLoader, ToolModule};

type SharedModule = Shared<BoxFuture<'static, Result<Arc<ToolModule>>>>;

/// A registered tool: how to import it and which export to instantiate
#[derive(Clone)]
struct ModuleEntry {
    loader: ModuleLoader,
    export_name: String,
}

/// Registry configuration
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Ids imported by [`ModuleRegistry::preload_popular_tools`]
    pub popular_tools: Vec<String>,
    /// Export names for ids that do not follow the naming convention
    pub export_overrides: HashMap<String, String>,
}

impl LoaderConfig {
    pub fn with_popular_tools<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.popular_tools = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_export_override(mut self, id: impl Into<String>, export: impl Into<String>) -> Self {
        self.export_overrides.insert(id.into(), export.into());
        self
    }
}

/// Statistics about the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    pub total_registered: usize,
    /// Times any loader factory was invoked
    pub loader_invocations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub failed_imports: u64,
    pub preloaded: u64,
}

/// Outcome of a preload pass
#[derive(Debug, Clone, Default)]
pub struct PreloadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, LoaderError)>,
}

/// Tool id -> lazily imported module
pub struct ModuleRegistry {
    entries: RwLock<HashMap<String, ModuleEntry>>,
    /// In-flight or resolved imports; successful entries are never evicted
    cache: Mutex<HashMap<String, SharedModule>>,
    config: LoaderConfig,
    stats: Mutex<LoaderStats>,
}

impl ModuleRegistry {
    /// Create a new registry with default config
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    /// Create a new registry with custom config
    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
            config,
            stats: Mutex::new(LoaderStats::default()),
        }
    }

    /// Register a loader; the export name follows the override table or the
    /// naming convention.
    pub fn register(&self, id: &str, loader: ModuleLoader) {
        let export_name = self
            .config
            .export_overrides
            .get(id)
            .cloned()
            .unwrap_or_else(|| export_name_for(id));
        self.insert(id, ModuleEntry { loader, export_name });
    }

    /// Register a loader with an explicit export name
    pub fn register_with_export(&self, id: &str, loader: ModuleLoader, export_name: &str) {
        self.insert(
            id,
            ModuleEntry {
                loader,
                export_name: export_name.to_string(),
            },
        );
    }

    fn insert(&self, id: &str, entry: ModuleEntry) {
        debug!("Registered module for {} (export {})", id, entry.export_name);
        let replaced = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), entry)
            .is_some();

        if replaced {
            warn!("Replacing module registration for {}", id);
            self.lock_cache().remove(id);
        } else {
            self.lock_stats().total_registered += 1;
        }
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Registered ids, sorted
    pub fn registered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Export name the registry will instantiate for `id`
    pub fn export_name(&self, id: &str) -> Option<String> {
        self.entry(id).map(|e| e.export_name)
    }

    /// Whether the module for `id` has finished importing successfully
    pub fn is_loaded(&self, id: &str) -> bool {
        self.lock_cache()
            .get(id)
            .and_then(|shared| shared.peek().map(|r| r.is_ok()))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> LoaderStats {
        self.lock_stats().clone()
    }

    pub fn popular_tools(&self) -> &[String] {
        &self.config.popular_tools
    }

    /// Import (or reuse the import of) the module for `id`
    pub async fn resolve_module(&self, id: &str) -> Result<Arc<ToolModule>> {
        let pending = self.module_future(id)?;
        let result = pending.clone().await;

        if result.is_err() {
            // Drop the failed import so a retry calls the loader again
            let mut cache = self.lock_cache();
            if cache.get(id).is_some_and(|cached| cached.ptr_eq(&pending)) {
                cache.remove(id);
            }
            drop(cache);
            self.lock_stats().failed_imports += 1;
        }
        result
    }

    /// Resolve the constructor `id` exports under its registered name
    pub async fn resolve_component(&self, id: &str) -> Result<ComponentConstructor> {
        let module = self.resolve_module(id).await?;
        let export = self
            .export_name(id)
            .ok_or_else(|| LoaderError::NotRegistered(id.to_string()))?;

        module.get(&export).cloned().ok_or_else(|| {
            warn!(
                "Module for {} exports {:?}, expected {}",
                id,
                module.export_names(),
                export
            );
            LoaderError::MissingExport {
                id: id.to_string(),
                export,
            }
        })
    }

    /// Import the module for `id` and instantiate its component in `container`
    pub async fn load_tool(&self, id: &str, container: Container) -> Result<Box<dyn ToolWidget>> {
        let constructor = self.resolve_component(id).await?;
        constructor(container).map_err(|e| LoaderError::Construct {
            id: id.to_string(),
            reason: format!("{:#}", e),
        })
    }

    /// Start imports for every popular tool in parallel.
    ///
    /// Each id fails independently; the in-flight imports stay cached so a
    /// later `load_tool` reuses them.
    pub async fn preload_popular_tools(&self) -> PreloadReport {
        let ids = self.config.popular_tools.clone();
        if ids.is_empty() {
            return PreloadReport::default();
        }

        debug!("Preloading {} popular tools", ids.len());
        let results = join_all(ids.iter().map(|id| self.resolve_module(id))).await;

        let mut report = PreloadReport::default();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(_) => report.loaded.push(id),
                Err(e) => {
                    warn!("Failed to preload {}: {}", id, e);
                    report.failed.push((id, e));
                }
            }
        }

        self.lock_stats().preloaded += report.loaded.len() as u64;
        info!(
            "Preloaded {} tools ({} failed)",
            report.loaded.len(),
            report.failed.len()
        );
        report
    }

    /// Preload popular tools on a background task after `delay`
    pub fn spawn_preload(self: &Arc<Self>, delay: Duration) -> JoinHandle<PreloadReport> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.preload_popular_tools().await
        })
    }

    fn module_future(&self, id: &str) -> Result<SharedModule> {
        // Held until the new import is cached so concurrent first loads share it.
        // The loader only builds a future here; nothing is awaited under the lock.
        let mut cache = self.lock_cache();
        if let Some(existing) = cache.get(id).cloned() {
            self.lock_stats().cache_hits += 1;
            return Ok(existing);
        }

        let entry = self
            .entry(id)
            .ok_or_else(|| LoaderError::NotRegistered(id.to_string()))?;

        let owned_id = id.to_string();
        let import = (entry.loader)();
        let pending: SharedModule = async move {
            import.await.map(Arc::new).map_err(|e| LoaderError::ImportFailed {
                id: owned_id,
                reason: format!("{:#}", e),
            })
        }
        .boxed()
        .shared();

        {
            let mut stats = self.lock_stats();
            stats.loader_invocations += 1;
            stats.cache_misses += 1;
        }

        cache.insert(id.to_string(), pending.clone());
        Ok(pending)
    }

    fn entry(&self, id: &str) -> Option<ModuleEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, SharedModule>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_stats(&self) -> MutexGuard<'_, LoaderStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
