use dk_core::{Container, ToolWidget};
use dk_loader::ToolModule;

use super::render_panel;

const ID: &str = "url-encoder";

pub fn module() -> ToolModule {
    ToolModule::new().export("UrlEncoderTool", |container| {
        Ok(Box::new(UrlEncoderTool::new(container)) as Box<dyn ToolWidget>)
    })
}

/// Percent-encodes the input and decodes it
pub struct UrlEncoderTool {
    container: Container,
}

impl UrlEncoderTool {
    pub fn new(container: Container) -> Self {
        let tool = Self { container };
        tool.render("");
        tool
    }

    fn render(&self, input: &str) {
        let encoded = urlencoding::encode(input).into_owned();
        let decoded = match urlencoding::decode(input) {
            Ok(text) => text.into_owned(),
            Err(e) => format!("Invalid encoding: {}", e),
        };
        render_panel(
            &self.container,
            ID,
            "URL Encoder/Decoder",
            &[("Encoded", encoded), ("Decoded", decoded)],
        );
    }
}

impl ToolWidget for UrlEncoderTool {
    fn on_input(&mut self, input: &str) -> anyhow::Result<()> {
        self.render(input);
        Ok(())
    }
}
