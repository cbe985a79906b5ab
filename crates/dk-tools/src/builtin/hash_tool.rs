use dk_core::{Container, ToolWidget};
use dk_loader::ToolModule;
use sha2::{Digest, Sha256, Sha512};

use super::render_panel;

const ID: &str = "hash-generator";

/// Export name; not the conventional `HashGeneratorTool`
pub const EXPORT: &str = "HashTool";

pub fn module() -> ToolModule {
    ToolModule::new().export(EXPORT, |container| {
        Ok(Box::new(HashTool::new(container)) as Box<dyn ToolWidget>)
    })
}

/// Hex digests of the input text
pub struct HashTool {
    container: Container,
}

impl HashTool {
    pub fn new(container: Container) -> Self {
        let tool = Self { container };
        tool.render("");
        tool
    }

    fn render(&self, input: &str) {
        let bytes = input.as_bytes();
        render_panel(
            &self.container,
            ID,
            "Hash Generator",
            &[
                ("MD5", format!("{:x}", md5::compute(bytes))),
                ("SHA-256", hex(&Sha256::digest(bytes))),
                ("SHA-512", hex(&Sha512::digest(bytes))),
            ],
        );
    }
}

impl ToolWidget for HashTool {
    fn on_input(&mut self, input: &str) -> anyhow::Result<()> {
        self.render(input);
        Ok(())
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        let container = Container::new(ID);
        let mut tool = HashTool::new(container.clone());
        tool.on_input("abc").unwrap();

        let content = container.content();
        assert!(content.contains("900150983cd24fb0d6963f7d28e17f72"));
        assert!(content.contains("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"));
    }
}
