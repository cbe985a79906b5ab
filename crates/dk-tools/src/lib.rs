//! dk-tools: builtin tool widgets
//!
//! Each tool is a small form wrapping a pure conversion. Tools are exposed to
//! the shell as lazily loaded modules plus a metadata record for the catalog.

pub mod builtin;

pub use builtin::{builtin_metadata, register_builtin_tools};
