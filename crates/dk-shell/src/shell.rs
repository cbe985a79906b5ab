//! Shell wiring
//!
//! Builds every component once from a [`ShellConfig`] and injects them into
//! each other. The tool view follows the controller's events and mounts the
//! selected tool into its container.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use dk_catalog::{export_overrides, ToolCatalog};
use dk_core::{Container, KeyValueStore, ShellConfig, Tool};
use dk_favorites::FavoriteStore;
use dk_loader::{LoaderConfig, ModuleRegistry, MountOutcome, PreloadReport, ToolHost};
use dk_router::{History, Router};
use dk_tools::{builtin_metadata, register_builtin_tools};

use crate::controller::AppController;
use crate::events::{AppEvent, EventKind};

type MountTask = JoinHandle<dk_loader::Result<MountOutcome>>;

/// Mounts the selected tool and releases it when the home view is shown
pub struct ToolView {
    host: Arc<ToolHost>,
    container: Container,
    pending: Mutex<Option<MountTask>>,
}

impl ToolView {
    pub fn attach(controller: &AppController, host: Arc<ToolHost>, container: Container) -> Arc<Self> {
        let view = Arc::new(Self {
            host,
            container,
            pending: Mutex::new(None),
        });

        let this = Arc::clone(&view);
        controller.on(EventKind::ToolSelected, move |event| match event {
            AppEvent::ToolSelected { tool } => this.show(&tool.id),
            _ => Ok(()),
        });
        let this = Arc::clone(&view);
        controller.on(EventKind::ShowHome, move |_| {
            this.hide();
            Ok(())
        });

        view
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Wait for the most recent mount to finish
    pub async fn settle(&self) -> Option<dk_loader::Result<MountOutcome>> {
        let task = self.lock_pending().take()?;
        match task.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("Mount task did not complete: {}", e);
                None
            }
        }
    }

    fn show(&self, tool_id: &str) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Handle::try_current()?;
        let ticket = self.host.begin_mount();
        let host = Arc::clone(&self.host);
        let container = self.container.clone();
        let id = tool_id.to_string();
        let task = runtime.spawn(async move { host.mount_with(ticket, &id, container).await });

        if let Some(previous) = self.lock_pending().replace(task) {
            previous.abort();
        }
        debug!("Mounting {}", tool_id);
        Ok(())
    }

    fn hide(&self) {
        if let Some(previous) = self.lock_pending().take() {
            previous.abort();
        }
        self.host.unmount();
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<MountTask>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Every shell component, constructed once and shared
pub struct Shell {
    pub config: ShellConfig,
    pub registry: Arc<ModuleRegistry>,
    pub catalog: Arc<ToolCatalog>,
    pub favorites: Arc<FavoriteStore>,
    pub router: Arc<Router>,
    pub host: Arc<ToolHost>,
    pub controller: Arc<AppController>,
    pub view: Arc<ToolView>,
}

impl Shell {
    /// Shell with the builtin tools, or the metadata file named in `config`
    pub fn new(config: ShellConfig, storage: Arc<dyn KeyValueStore>, history: Arc<dyn History>) -> Self {
        let metadata = catalog_metadata(&config);
        let loader_config = LoaderConfig {
            popular_tools: config.popular_tools.clone(),
            export_overrides: export_overrides(&metadata),
        };
        let registry = Arc::new(ModuleRegistry::with_config(loader_config));
        register_builtin_tools(&registry);

        Self::with_registry(config, storage, history, registry, metadata)
    }

    /// Shell over a caller-populated registry
    pub fn with_registry(
        config: ShellConfig,
        storage: Arc<dyn KeyValueStore>,
        history: Arc<dyn History>,
        registry: Arc<ModuleRegistry>,
        metadata: Vec<Tool>,
    ) -> Self {
        let catalog = Arc::new(ToolCatalog::new(metadata, Arc::clone(&registry)));
        let favorites = Arc::new(FavoriteStore::new(Arc::clone(&storage)));
        let router = Arc::new(Router::with_base_path(history, &config.base_path));
        let host = Arc::new(ToolHost::new(Arc::clone(&registry)));
        let controller = AppController::new(
            Arc::clone(&catalog),
            Arc::clone(&favorites),
            Arc::clone(&router),
            storage,
        );
        let view = ToolView::attach(&controller, Arc::clone(&host), Container::new("tool-container"));

        Self {
            config,
            registry,
            catalog,
            favorites,
            router,
            host,
            controller,
            view,
        }
    }

    /// Start the controller and schedule background preloading
    pub async fn bootstrap(&self) -> JoinHandle<PreloadReport> {
        self.controller.bootstrap().await;
        info!(
            "Preloading {} popular tools in {:?}",
            self.registry.popular_tools().len(),
            self.config.preload_delay
        );
        self.registry.spawn_preload(self.config.preload_delay)
    }

    /// Route to a tool and wait for its widget to mount.
    ///
    /// `None` means the id was not in the catalog and the home view is shown.
    pub async fn open_tool(&self, tool_id: &str) -> Option<dk_loader::Result<MountOutcome>> {
        self.controller.select_tool(tool_id)?;
        self.view.settle().await
    }
}

/// Catalog metadata; a metadata file that cannot be read yields an empty catalog
pub fn catalog_metadata(config: &ShellConfig) -> Vec<Tool> {
    match &config.catalog_file {
        None => builtin_metadata(),
        Some(path) => ToolCatalog::load_metadata_file(path).unwrap_or_else(|e| {
            warn!("Failed to load tool metadata from {}: {}", path.display(), e);
            Vec::new()
        }),
    }
}
