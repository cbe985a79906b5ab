//! devkit loader - lazy tool modules
//!
//! - `ModuleRegistry`: tool id -> async module loader + component export name
//! - shared in-flight import cache, reused by the background preloader
//! - `ToolHost`: the single mount slot for the active tool, with a generation
//!   token so late imports never mount into a stale container

pub mod error;
pub mod host;
pub mod module;
pub mod registry;

pub use error::{LoaderError, Result};
pub use host::{MountOutcome, MountTicket, ToolHost};
pub use module::{export_name_for, loader, ModuleLoader, ToolModule, EXPORT_SUFFIX};
pub use registry::{LoaderConfig, LoaderStats, ModuleRegistry, PreloadReport};
