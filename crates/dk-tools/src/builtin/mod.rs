//! Builtin tools
//!
//! Every tool renders a small panel into its container and re-renders on
//! input. Conversion errors are shown in the panel, never returned.

mod base64_tool;
mod hash_tool;
mod json_tool;
mod regex_tool;
mod url_tool;

use dk_core::{Category, Container, Tool};
use dk_loader::{loader, ModuleRegistry, ToolModule};
use tracing::debug;

pub use base64_tool::Base64EncoderTool;
pub use hash_tool::HashTool;
pub use json_tool::JsonFormatterTool;
pub use regex_tool::RegexTesterTool;
pub use url_tool::UrlEncoderTool;

type ModuleFn = fn() -> ToolModule;

/// Tool id, module, and the export name when it differs from the convention
const MODULES: &[(&str, ModuleFn, Option<&str>)] = &[
    ("base64-encoder", base64_tool::module, None),
    ("url-encoder", url_tool::module, None),
    ("json-formatter", json_tool::module, None),
    ("hash-generator", hash_tool::module, Some(hash_tool::EXPORT)),
    ("regex-tester", regex_tool::module, None),
];

/// Register a lazy loader for every builtin tool
pub fn register_builtin_tools(registry: &ModuleRegistry) -> usize {
    for (id, module, export) in MODULES.iter().copied() {
        let module_loader = loader(move || async move { Ok(module()) });
        match export {
            Some(export) => registry.register_with_export(id, module_loader, export),
            None => registry.register(id, module_loader),
        }
    }
    debug!("Registered {} builtin tool modules", MODULES.len());
    MODULES.len()
}

/// Catalog metadata for the builtin tools
pub fn builtin_metadata() -> Vec<Tool> {
    vec![
        tool(
            "base64-encoder",
            "Base64 Encoder/Decoder",
            "Encode text to Base64 and decode Base64 back to text",
            Category::Encoders,
            "file-code",
            &["base64", "encode", "decode", "btoa", "atob"],
            true,
        ),
        tool(
            "url-encoder",
            "URL Encoder/Decoder",
            "Percent-encode text for URLs and decode encoded strings",
            Category::Encoders,
            "link",
            &["url", "percent", "uri", "escape"],
            false,
        ),
        tool(
            "json-formatter",
            "JSON Formatter",
            "Validate, pretty print and minify JSON documents",
            Category::Formatters,
            "braces",
            &["json", "beautify", "minify", "validate"],
            true,
        ),
        Tool {
            component: Some(hash_tool::EXPORT.to_string()),
            ..tool(
                "hash-generator",
                "Hash Generator",
                "Compute MD5, SHA-256 and SHA-512 digests of text",
                Category::Crypto,
                "hash",
                &["md5", "sha256", "sha512", "digest", "checksum"],
                true,
            )
        },
        tool(
            "regex-tester",
            "Regex Tester",
            "Test a regular expression against sample text",
            Category::Text,
            "search",
            &["regex", "regexp", "pattern", "match"],
            false,
        ),
    ]
}

fn tool(
    id: &str,
    name: &str,
    description: &str,
    category: Category,
    icon: &str,
    keywords: &[&str],
    featured: bool,
) -> Tool {
    Tool {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        icon: icon.to_string(),
        component: None,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        featured,
    }
}

/// Render a titled panel of label/value rows
pub(crate) fn render_panel(container: &Container, tool_id: &str, title: &str, rows: &[(&str, String)]) {
    let mut markup = format!(
        r#"<section class="tool" data-tool="{}"><h2>{}</h2>"#,
        tool_id,
        escape_html(title)
    );
    for (label, value) in rows {
        markup.push_str(&format!(
            r#"<div class="row"><label>{}</label><output>{}</output></div>"#,
            escape_html(label),
            escape_html(value)
        ));
    }
    markup.push_str("</section>");
    container.render(markup);
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
