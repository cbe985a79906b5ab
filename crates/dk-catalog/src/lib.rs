//! Tool catalog for discovering and searching tools
//!
//! The catalog starts from a static metadata list and exposes only the tools
//! the module registry can actually load. Discovery runs once; later calls
//! share the cached list until [`ToolCatalog::reset_cache`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use dk_core::{Category, NavItem, Result, Tool, ToolRef};
use dk_loader::ModuleRegistry;

/// Discovered tools, shared between the catalog and its callers
pub type ToolList = Arc<Vec<ToolRef>>;

/// Export names declared by metadata records that set `component`
pub fn export_overrides(metadata: &[Tool]) -> HashMap<String, String> {
    metadata
        .iter()
        .filter_map(|t| t.component.as_ref().map(|c| (t.id.clone(), c.clone())))
        .collect()
}

/// Static tool metadata cross-checked against the module registry
pub struct ToolCatalog {
    metadata: Vec<Tool>,
    registry: Arc<ModuleRegistry>,
    discovered: RwLock<Option<ToolList>>,
}

impl ToolCatalog {
    pub fn new(metadata: Vec<Tool>, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            metadata,
            registry,
            discovered: RwLock::new(None),
        }
    }

    /// Read a JSON array of tool records
    pub fn load_metadata_file(path: impl AsRef<Path>) -> Result<Vec<Tool>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let tools: Vec<Tool> = serde_json::from_str(&content)?;
        debug!("Read {} tool records from {}", tools.len(), path.display());
        Ok(tools)
    }

    /// Tools whose ids have a registered module.
    ///
    /// The first call filters the metadata (warning about every dropped entry)
    /// and caches the result; repeat calls return the same list.
    pub fn discover_tools(&self) -> ToolList {
        if let Some(cached) = self
            .discovered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Arc::clone(cached);
        }

        let mut discovered = self.discovered.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = discovered.as_ref() {
            return Arc::clone(cached);
        }

        let mut seen = HashSet::new();
        let mut tools = Vec::with_capacity(self.metadata.len());
        for tool in &self.metadata {
            if !seen.insert(tool.id.as_str()) {
                warn!("Duplicate tool id {} in catalog, keeping the first entry", tool.id);
                continue;
            }
            if !self.registry.has(&tool.id) {
                warn!("Tool {} has no registered module, excluding it from the catalog", tool.id);
                continue;
            }
            tools.push(Arc::new(tool.clone()));
        }

        info!(
            "Discovered {} tools ({} metadata entries)",
            tools.len(),
            self.metadata.len()
        );
        let list: ToolList = Arc::new(tools);
        *discovered = Some(Arc::clone(&list));
        list
    }

    /// Forget the discovered list; the next call rediscovers
    pub fn reset_cache(&self) {
        *self.discovered.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn get_tool(&self, id: &str) -> Option<ToolRef> {
        self.discover_tools().iter().find(|t| t.id == id).cloned()
    }

    pub fn tools_by_category(&self, category: Category) -> Vec<ToolRef> {
        self.discover_tools()
            .iter()
            .filter(|t| t.category == category)
            .cloned()
            .collect()
    }

    pub fn featured_tools(&self) -> Vec<ToolRef> {
        self.discover_tools()
            .iter()
            .filter(|t| t.featured)
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search over name, description and keywords.
    ///
    /// A blank query matches every tool.
    pub fn search_tools(&self, query: &str) -> Vec<ToolRef> {
        let needle = query.trim().to_lowercase();
        self.discover_tools()
            .iter()
            .filter(|t| needle.is_empty() || t.matches(&needle))
            .cloned()
            .collect()
    }

    /// Categories that contain at least one tool, in sidebar order
    pub fn categories(&self) -> Vec<Category> {
        let tools = self.discover_tools();
        Category::ALL
            .into_iter()
            .filter(|c| tools.iter().any(|t| t.category == *c))
            .collect()
    }

    /// Sidebar navigation grouped by category
    pub fn nav_items(&self) -> Vec<NavItem> {
        self.categories()
            .into_iter()
            .map(|category| NavItem::new(category, self.tools_by_category(category)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dk_loader::{loader, ToolModule};

    fn tool(id: &str, category: Category, featured: bool, keywords: &[&str]) -> Tool {
        Tool {
            id: id.to_string(),
            name: id.replace('-', " "),
            description: format!("The {} tool", id),
            category,
            icon: String::new(),
            component: None,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            featured,
        }
    }

    fn catalog(registered: &[&str]) -> ToolCatalog {
        let registry = Arc::new(ModuleRegistry::new());
        for id in registered {
            registry.register(id, loader(|| async { Ok(ToolModule::new()) }));
        }
        let metadata = vec![
            tool("base64-encoder", Category::Encoders, true, &["decode", "btoa"]),
            tool("hash-generator", Category::Crypto, true, &["SHA256", "md5"]),
            tool("regex-tester", Category::Text, false, &["pattern"]),
            tool("url-encoder", Category::Encoders, false, &["percent"]),
        ];
        ToolCatalog::new(metadata, registry)
    }

    #[test]
    fn test_discover_excludes_unregistered() {
        let catalog = catalog(&["base64-encoder", "regex-tester", "url-encoder"]);
        let ids: Vec<String> = catalog.discover_tools().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["base64-encoder", "regex-tester", "url-encoder"]);
        assert!(catalog.get_tool("hash-generator").is_none());
    }

    #[test]
    fn test_discover_is_cached() {
        let catalog = catalog(&["base64-encoder"]);
        let first = catalog.discover_tools();
        let second = catalog.discover_tools();
        assert!(Arc::ptr_eq(&first, &second));

        catalog.reset_cache();
        let third = catalog.discover_tools();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let catalog = catalog(&["base64-encoder", "hash-generator", "regex-tester", "url-encoder"]);

        let ids = |q: &str| -> Vec<String> {
            catalog.search_tools(q).iter().map(|t| t.id.clone()).collect()
        };
        assert_eq!(ids("sha256"), vec!["hash-generator"]);
        assert_eq!(ids("ENCODER"), vec!["base64-encoder", "url-encoder"]);
        assert_eq!(ids("the regex"), vec!["regex-tester"]);
        assert!(ids("nothing-matches").is_empty());
        assert_eq!(ids("  ").len(), 4);
    }

    #[test]
    fn test_filters_and_nav_items() {
        let catalog = catalog(&["base64-encoder", "hash-generator", "url-encoder"]);

        assert_eq!(catalog.tools_by_category(Category::Encoders).len(), 2);
        assert_eq!(catalog.featured_tools().len(), 2);
        assert_eq!(catalog.categories(), vec![Category::Encoders, Category::Crypto]);

        let nav = catalog.nav_items();
        assert_eq!(nav.len(), 2);
        assert_eq!(nav[0].label, Category::Encoders.label());
        assert_eq!(nav[0].tools.len(), 2);
        assert!(nav[0].expanded);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let registry = Arc::new(ModuleRegistry::new());
        registry.register("a", loader(|| async { Ok(ToolModule::new()) }));
        let mut second = tool("a", Category::Text, false, &[]);
        second.name = "Second".to_string();
        let catalog = ToolCatalog::new(vec![tool("a", Category::Utilities, false, &[]), second], registry);

        let tools = catalog.discover_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].category, Category::Utilities);
    }

    #[test]
    fn test_export_overrides_from_component() {
        let mut hash = tool("hash-generator", Category::Crypto, true, &[]);
        hash.component = Some("HashTool".to_string());
        let overrides = export_overrides(&[tool("a", Category::Text, false, &[]), hash]);
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["hash-generator"], "HashTool");
    }

    #[test]
    fn test_load_metadata_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        fs::write(
            &path,
            r#"[{"id":"a","name":"A","description":"d","category":"text","featured":true}]"#,
        )
        .unwrap();

        let tools = ToolCatalog::load_metadata_file(&path).unwrap();
        assert_eq!(tools.len(), 1);
        assert!(tools[0].featured);

        fs::write(&path, "not json").unwrap();
        assert!(ToolCatalog::load_metadata_file(&path).is_err());
        assert!(ToolCatalog::load_metadata_file(dir.path().join("missing.json")).is_err());
    }
}
