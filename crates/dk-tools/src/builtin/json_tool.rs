use dk_core::{Container, ToolWidget};
use dk_loader::ToolModule;
use serde_json::Value;

use super::render_panel;

const ID: &str = "json-formatter";

pub fn module() -> ToolModule {
    ToolModule::new().export("JsonFormatterTool", |container| {
        Ok(Box::new(JsonFormatterTool::new(container)) as Box<dyn ToolWidget>)
    })
}

/// Validates JSON and shows pretty and minified forms
pub struct JsonFormatterTool {
    container: Container,
}

impl JsonFormatterTool {
    pub fn new(container: Container) -> Self {
        render_panel(&container, ID, "JSON Formatter", &[("Status", "Waiting for input".to_string())]);
        Self { container }
    }
}

impl ToolWidget for JsonFormatterTool {
    fn on_input(&mut self, input: &str) -> anyhow::Result<()> {
        let rows = match serde_json::from_str::<Value>(input) {
            Ok(value) => vec![
                ("Status", "Valid JSON".to_string()),
                ("Formatted", serde_json::to_string_pretty(&value)?),
                ("Minified", serde_json::to_string(&value)?),
            ],
            Err(e) => vec![(
                "Status",
                format!("Invalid JSON at line {}, column {}: {}", e.line(), e.column(), e),
            )],
        };
        render_panel(&self.container, ID, "JSON Formatter", &rows);
        Ok(())
    }
}
