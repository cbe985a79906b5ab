//! Core types and utilities for the devkit shell
//!
//! # Modules
//!
//! - `config`: Environment file loading and shell configuration
//! - `error`: Error types and Result alias
//! - `listeners`: Failure-isolated callback invocation
//! - `storage`: Local key-value persistence
//! - `types`: Tool metadata, categories and navigation records
//! - `widget`: Container and widget contract shared by the loader and tools

pub mod config;
pub mod error;
pub mod listeners;
pub mod storage;
pub mod types;
pub mod widget;

// Re-exports
pub use config::ShellConfig;
pub use error::{Error, Result};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use types::*;
pub use widget::{ComponentConstructor, Container, ToolWidget};
