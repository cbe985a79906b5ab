//! Application controller
//!
//! Owns the shell state (theme, sidebar, search query, current tool) and
//! publishes every change on the [`EventBus`]. The router, catalog and
//! favorite store are injected; route handlers and the favorites bridge hold
//! weak references back to the controller.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use dk_catalog::{ToolCatalog, ToolList};
use dk_core::listeners::ListenerId;
use dk_core::{KeyValueStore, NavItem, ThemeMode, ToolRef};
use dk_favorites::{FavoriteChange, FavoriteChangeKind, FavoriteStore};
use dk_router::{RouteContext, Router};

use crate::events::{AppEvent, EventBus, EventKind, SubscriptionId};
use crate::settings::Settings;

/// Route of the home view
pub const HOME_ROUTE: &str = "/";
/// Route of a single tool; `:id` is the tool id
pub const TOOL_ROUTE: &str = "/tool/:id";

#[derive(Debug, Default)]
struct ShellState {
    theme: ThemeMode,
    sidebar_collapsed: bool,
    search_query: String,
    current_tool: Option<ToolRef>,
    tools: ToolList,
}

pub struct AppController {
    catalog: Arc<ToolCatalog>,
    favorites: Arc<FavoriteStore>,
    router: Arc<Router>,
    storage: Arc<dyn KeyValueStore>,
    bus: EventBus,
    state: RwLock<ShellState>,
    ready: watch::Sender<bool>,
    favorites_bridge: Mutex<Option<ListenerId>>,
}

impl AppController {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        favorites: Arc<FavoriteStore>,
        router: Arc<Router>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Arc<Self> {
        let (ready, _) = watch::channel(false);
        Arc::new(Self {
            catalog,
            favorites,
            router,
            storage,
            bus: EventBus::new(),
            state: RwLock::new(ShellState::default()),
            ready,
            favorites_bridge: Mutex::new(None),
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Load the catalog and settings, install routes and mark ready.
    ///
    /// Calling it again after the first success does nothing.
    pub fn init(self: &Arc<Self>) {
        if self.is_ready() {
            return;
        }

        let tools = self.catalog.discover_tools();
        let settings = Settings::load(self.storage.as_ref());
        {
            let mut state = self.write_state();
            state.tools = tools;
            state.theme = settings.theme;
            state.sidebar_collapsed = settings.sidebar_collapsed;
        }

        self.install_routes();
        self.bridge_favorites();

        self.ready.send_replace(true);
        info!(
            "Shell ready: {} tools, theme {}, {} favorites",
            self.read_state().tools.len(),
            settings.theme.as_str(),
            self.favorites.count()
        );
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolve once [`init`](Self::init) has completed
    pub async fn wait_until_ready(&self) {
        let mut ready = self.ready.subscribe();
        // the sender lives as long as self, so this only returns once ready
        let _ = ready.wait_for(|ready| *ready).await;
    }

    /// Resolve the current location
    pub fn start(&self) {
        self.router.handle_route();
    }

    /// `init`, wait for readiness, then `start`
    pub async fn bootstrap(self: &Arc<Self>) {
        self.init();
        self.wait_until_ready().await;
        self.start();
    }

    fn install_routes(self: &Arc<Self>) {
        let this = Arc::downgrade(self);
        self.router.add_route(HOME_ROUTE, move |_ctx: &RouteContext| {
            if let Some(controller) = this.upgrade() {
                controller.show_home();
            }
        });

        let this = Arc::downgrade(self);
        self.router.add_route(TOOL_ROUTE, move |ctx: &RouteContext| {
            if let Some(controller) = this.upgrade() {
                controller.show_tool(ctx.param("id").unwrap_or_default());
            }
        });
    }

    fn bridge_favorites(self: &Arc<Self>) {
        let this: Weak<Self> = Arc::downgrade(self);
        let id = self.favorites.add_listener(move |change: &FavoriteChange| {
            if let Some(controller) = this.upgrade() {
                controller.publish_favorites(change);
            }
            Ok(())
        });
        *self
            .favorites_bridge
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(id);
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn on<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&AppEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.on(kind, callback)
    }

    pub fn off(&self, subscription: SubscriptionId) -> bool {
        self.bus.off(subscription)
    }

    pub fn emit(&self, event: AppEvent) {
        let failed = self.bus.emit(&event);
        if failed > 0 {
            warn!("{} listener(s) failed handling {}", failed, event.kind());
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Route to a tool. Unknown ids end up on the home view.
    ///
    /// Returns the tool that is current after routing.
    pub fn select_tool(&self, tool_id: &str) -> Option<ToolRef> {
        self.router.navigate(&format!("/tool/{}", tool_id));
        self.current_tool()
    }

    /// Clear the current tool and search, then route home
    pub fn go_home(&self) {
        {
            let mut state = self.write_state();
            state.current_tool = None;
            state.search_query.clear();
        }
        self.router.navigate(HOME_ROUTE);
    }

    fn show_home(&self) {
        self.write_state().current_tool = None;
        debug!("Showing home");
        self.emit(AppEvent::ShowHome);
    }

    fn show_tool(&self, tool_id: &str) {
        let Some(tool) = self.catalog.get_tool(tool_id) else {
            warn!("Unknown tool {}, returning home", tool_id);
            self.router.navigate(HOME_ROUTE);
            return;
        };

        self.write_state().current_tool = Some(Arc::clone(&tool));
        debug!("Selected tool {}", tool.id);
        self.emit(AppEvent::ToolSelected { tool });
    }

    pub fn current_tool(&self) -> Option<ToolRef> {
        self.read_state().current_tool.clone()
    }

    // ------------------------------------------------------------------
    // Favorites
    // ------------------------------------------------------------------

    /// Flip membership; events are published by the favorites bridge
    pub fn toggle_favorite(&self, tool_id: &str) -> bool {
        self.favorites.toggle_favorite(tool_id)
    }

    pub fn clear_favorites(&self) {
        self.favorites.clear_all();
    }

    pub fn is_favorite(&self, tool_id: &str) -> bool {
        self.favorites.is_favorite(tool_id)
    }

    /// Favorites resolved against the catalog; unknown ids are skipped
    pub fn favorite_tools(&self) -> Vec<ToolRef> {
        self.favorites
            .favorites()
            .iter()
            .filter_map(|id| self.catalog.get_tool(id))
            .collect()
    }

    fn publish_favorites(&self, change: &FavoriteChange) {
        match change.kind {
            FavoriteChangeKind::Added | FavoriteChangeKind::Removed => {
                if let Some(tool_id) = &change.tool_id {
                    self.emit(AppEvent::FavoriteChanged {
                        tool_id: tool_id.clone(),
                        is_favorite: change.kind == FavoriteChangeKind::Added,
                    });
                }
                self.emit(AppEvent::FavoritesUpdated {
                    favorites: change.favorites.clone(),
                });
            }
            FavoriteChangeKind::Cleared => self.emit(AppEvent::FavoritesCleared),
            FavoriteChangeKind::Imported => self.emit(AppEvent::FavoritesUpdated {
                favorites: change.favorites.clone(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Search the catalog; a blank query clears the search instead
    pub fn search(&self, query: &str) -> Vec<ToolRef> {
        if query.trim().is_empty() {
            self.clear_search();
            return Vec::new();
        }

        let results = self.catalog.search_tools(query);
        self.write_state().search_query = query.to_string();
        debug!("Search {:?} matched {} tools", query, results.len());
        self.emit(AppEvent::SearchResults {
            query: query.to_string(),
            results: results.clone(),
        });
        results
    }

    pub fn clear_search(&self) {
        self.write_state().search_query.clear();
        self.emit(AppEvent::SearchCleared);
    }

    pub fn search_query(&self) -> String {
        self.read_state().search_query.clone()
    }

    // ------------------------------------------------------------------
    // Theme and sidebar
    // ------------------------------------------------------------------

    pub fn theme(&self) -> ThemeMode {
        self.read_state().theme
    }

    pub fn toggle_theme(&self) -> ThemeMode {
        let theme = self.theme().toggled();
        self.set_theme(theme);
        theme
    }

    pub fn set_theme(&self, theme: ThemeMode) {
        self.write_state().theme = theme;
        Settings::save_theme(self.storage.as_ref(), theme);
        self.emit(AppEvent::ThemeChanged { theme });
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.read_state().sidebar_collapsed
    }

    pub fn toggle_sidebar(&self) -> bool {
        let collapsed = {
            let mut state = self.write_state();
            state.sidebar_collapsed = !state.sidebar_collapsed;
            state.sidebar_collapsed
        };
        Settings::save_sidebar(self.storage.as_ref(), collapsed);
        self.emit(AppEvent::SidebarToggled { collapsed });
        collapsed
    }

    // ------------------------------------------------------------------
    // Catalog views
    // ------------------------------------------------------------------

    /// Catalog snapshot taken at init
    pub fn tools(&self) -> ToolList {
        Arc::clone(&self.read_state().tools)
    }

    pub fn nav_items(&self) -> Vec<NavItem> {
        self.catalog.nav_items()
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    pub fn favorites(&self) -> &Arc<FavoriteStore> {
        &self.favorites
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ShellState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ShellState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AppController {
    fn drop(&mut self) {
        let bridge = self
            .favorites_bridge
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = bridge {
            self.favorites.remove_listener(id);
        }
    }
}
