//! Tool modules and their loaders

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dk_core::widget::{ComponentConstructor, Container, ToolWidget};

/// Suffix appended to the PascalCase id to form the default export name
pub const EXPORT_SUFFIX: &str = "Tool";

/// Resolved module namespace: export name -> component constructor
#[derive(Clone, Default)]
pub struct ToolModule {
    exports: HashMap<String, ComponentConstructor>,
}

impl ToolModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an export (builder style)
    pub fn export<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Container) -> anyhow::Result<Box<dyn ToolWidget>> + Send + Sync + 'static,
    {
        self.exports.insert(name.into(), Arc::new(constructor));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ComponentConstructor> {
        self.exports.get(name)
    }

    pub fn export_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.exports.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ToolModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolModule")
            .field("exports", &self.export_names())
            .finish()
    }
}

/// Zero-argument factory that asynchronously resolves a module
pub type ModuleLoader = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<ToolModule>> + Send + Sync>;

/// Wrap an async closure as a [`ModuleLoader`]
pub fn loader<F, Fut>(f: F) -> ModuleLoader
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ToolModule>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Default export name for a tool id: kebab-case -> PascalCase + suffix.
///
/// `base64-encoder` becomes `Base64EncoderTool`.
pub fn export_name_for(id: &str) -> String {
    let mut name = String::with_capacity(id.len() + EXPORT_SUFFIX.len());
    for part in id.split('-').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    name.push_str(EXPORT_SUFFIX);
    name
}
