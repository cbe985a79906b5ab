//! devkit router - client-side path routing
//!
//! Maps `/`-delimited path templates (with `:param` segments) to handlers and
//! keeps a [`History`] in sync with navigation.

pub mod history;
pub mod router;

pub use history::{History, MemoryHistory};
pub use router::{Resolution, RouteContext, RouteHandler, Router};
