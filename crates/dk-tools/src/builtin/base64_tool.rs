use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dk_core::{Container, ToolWidget};
use dk_loader::ToolModule;

use super::render_panel;

const ID: &str = "base64-encoder";

pub fn module() -> ToolModule {
    ToolModule::new().export("Base64EncoderTool", |container| {
        Ok(Box::new(Base64EncoderTool::new(container)) as Box<dyn ToolWidget>)
    })
}

/// Shows the Base64 encoding of the input and, when the input is valid
/// Base64, its decoding
pub struct Base64EncoderTool {
    container: Container,
}

impl Base64EncoderTool {
    pub fn new(container: Container) -> Self {
        let tool = Self { container };
        tool.render("");
        tool
    }

    fn render(&self, input: &str) {
        let encoded = STANDARD.encode(input.as_bytes());
        let decoded = match STANDARD.decode(input.trim()) {
            Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| "(binary data)".to_string()),
            Err(e) => format!("Invalid Base64: {}", e),
        };
        render_panel(
            &self.container,
            ID,
            "Base64 Encoder/Decoder",
            &[("Encoded", encoded), ("Decoded", decoded)],
        );
    }
}

impl ToolWidget for Base64EncoderTool {
    fn on_input(&mut self, input: &str) -> anyhow::Result<()> {
        self.render(input);
        Ok(())
    }
}
