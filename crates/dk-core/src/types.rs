//! Common types used across the devkit shell

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Error;

/// Fixed set of tool categories, in sidebar order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Encoders,
    Formatters,
    Generators,
    Converters,
    Text,
    Crypto,
    Network,
    Utilities,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Encoders,
        Category::Formatters,
        Category::Generators,
        Category::Converters,
        Category::Text,
        Category::Crypto,
        Category::Network,
        Category::Utilities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Encoders => "encoders",
            Category::Formatters => "formatters",
            Category::Generators => "generators",
            Category::Converters => "converters",
            Category::Text => "text",
            Category::Crypto => "crypto",
            Category::Network => "network",
            Category::Utilities => "utilities",
        }
    }

    /// Sidebar heading
    pub fn label(&self) -> &'static str {
        match self {
            Category::Encoders => "Encoders & Decoders",
            Category::Formatters => "Formatters",
            Category::Generators => "Generators",
            Category::Converters => "Converters",
            Category::Text => "Text Tools",
            Category::Crypto => "Crypto & Hashing",
            Category::Network => "Network",
            Category::Utilities => "Utilities",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Encoders => "code",
            Category::Formatters => "align-left",
            Category::Generators => "zap",
            Category::Converters => "repeat",
            Category::Text => "type",
            Category::Crypto => "lock",
            Category::Network => "globe",
            Category::Utilities => "tool",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_argument(format!("unknown category: {}", s)))
    }
}

/// Tool metadata record, immutable once the catalog is loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Stable kebab-case identifier, also the `/tool/:id` route parameter
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub icon: String,
    /// Explicit component export name; derived from the id when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

impl Tool {
    /// Case-insensitive substring match over name, description and keywords.
    ///
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self
                .keywords
                .iter()
                .any(|k| k.to_lowercase().contains(needle))
    }
}

/// Shared handle to a catalog entry
pub type ToolRef = Arc<Tool>;

/// Sidebar group of tools for one category
#[derive(Debug, Clone)]
pub struct NavItem {
    pub category: Category,
    pub label: String,
    pub tools: Vec<ToolRef>,
    pub icon: String,
    /// Transient UI state, never persisted
    pub expanded: bool,
}

impl NavItem {
    pub fn new(category: Category, tools: Vec<ToolRef>) -> Self {
        Self {
            category,
            label: category.label().to_string(),
            tools,
            icon: category.icon().to_string(),
            expanded: true,
        }
    }
}

/// Two-valued colour scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

impl FromStr for ThemeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            other => Err(Error::invalid_argument(format!("unknown theme: {}", other))),
        }
    }
}
