//! devkit shell - application controller and wiring
//!
//! # Modules
//!
//! - `controller`: Shell state, routes and the public controller API
//! - `events`: Typed event bus with per-listener failure isolation
//! - `settings`: Persisted theme and sidebar state
//! - `shell`: Builds and connects every component from a `ShellConfig`

pub mod controller;
pub mod events;
pub mod settings;
pub mod shell;

pub use controller::{AppController, HOME_ROUTE, TOOL_ROUTE};
pub use events::{AppEvent, EventBus, EventKind, SubscriptionId};
pub use settings::Settings;
pub use shell::{catalog_metadata, Shell, ToolView};
