//! Typed publish/subscribe bus
//!
//! Every event kind owns its own listener set. Dispatch is synchronous and
//! follows registration order; a listener that errors or panics is logged and
//! does not stop the others.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use dk_core::listeners::{ListenerId, ListenerSet};
use dk_core::{ThemeMode, ToolRef};

/// Names of the events the controller publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    ThemeChanged,
    SidebarToggled,
    ToolSelected,
    ShowHome,
    SearchResults,
    SearchCleared,
    FavoriteChanged,
    FavoritesUpdated,
    FavoritesCleared,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::ThemeChanged,
        EventKind::SidebarToggled,
        EventKind::ToolSelected,
        EventKind::ShowHome,
        EventKind::SearchResults,
        EventKind::SearchCleared,
        EventKind::FavoriteChanged,
        EventKind::FavoritesUpdated,
        EventKind::FavoritesCleared,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ThemeChanged => "theme-changed",
            EventKind::SidebarToggled => "sidebar-toggled",
            EventKind::ToolSelected => "tool-selected",
            EventKind::ShowHome => "show-home",
            EventKind::SearchResults => "search-results",
            EventKind::SearchCleared => "search-cleared",
            EventKind::FavoriteChanged => "favorite-changed",
            EventKind::FavoritesUpdated => "favorites-updated",
            EventKind::FavoritesCleared => "favorites-cleared",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event together with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    ThemeChanged { theme: ThemeMode },
    SidebarToggled { collapsed: bool },
    ToolSelected { tool: ToolRef },
    ShowHome,
    SearchResults { query: String, results: Vec<ToolRef> },
    SearchCleared,
    FavoriteChanged { tool_id: String, is_favorite: bool },
    FavoritesUpdated { favorites: Vec<String> },
    FavoritesCleared,
}

impl AppEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AppEvent::ThemeChanged { .. } => EventKind::ThemeChanged,
            AppEvent::SidebarToggled { .. } => EventKind::SidebarToggled,
            AppEvent::ToolSelected { .. } => EventKind::ToolSelected,
            AppEvent::ShowHome => EventKind::ShowHome,
            AppEvent::SearchResults { .. } => EventKind::SearchResults,
            AppEvent::SearchCleared => EventKind::SearchCleared,
            AppEvent::FavoriteChanged { .. } => EventKind::FavoriteChanged,
            AppEvent::FavoritesUpdated { .. } => EventKind::FavoritesUpdated,
            AppEvent::FavoritesCleared => EventKind::FavoritesCleared,
        }
    }
}

/// Handle returned by [`EventBus::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    kind: EventKind,
    id: ListenerId,
}

impl SubscriptionId {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

pub struct EventBus {
    channels: HashMap<EventKind, ListenerSet<AppEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        let channels = EventKind::ALL
            .into_iter()
            .map(|kind| (kind, ListenerSet::new(kind.as_str())))
            .collect();
        Self { channels }
    }

    /// Subscribe to one event kind
    pub fn on<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&AppEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.channel(kind).add(callback);
        SubscriptionId { kind, id }
    }

    /// Returns false if the subscription was already removed
    pub fn off(&self, subscription: SubscriptionId) -> bool {
        self.channel(subscription.kind).remove(subscription.id)
    }

    /// Deliver `event` to the listeners of its kind; returns how many failed
    pub fn emit(&self, event: &AppEvent) -> usize {
        self.channel(event.kind()).notify(event)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.channel(kind).len()
    }

    fn channel(&self, kind: EventKind) -> &ListenerSet<AppEvent> {
        // every kind is inserted in new()
        &self.channels[&kind]
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
