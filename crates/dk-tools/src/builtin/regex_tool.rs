use dk_core::{Container, ToolWidget};
use dk_loader::ToolModule;
use regex::Regex;

use super::render_panel;

const ID: &str = "regex-tester";

pub fn module() -> ToolModule {
    ToolModule::new().export("RegexTesterTool", |container| {
        Ok(Box::new(RegexTesterTool::new(container)) as Box<dyn ToolWidget>)
    })
}

/// Input is the pattern on the first line followed by the sample text
pub struct RegexTesterTool {
    container: Container,
}

impl RegexTesterTool {
    pub fn new(container: Container) -> Self {
        render_panel(
            &container,
            ID,
            "Regex Tester",
            &[("Usage", "First line: pattern. Remaining lines: text.".to_string())],
        );
        Self { container }
    }
}

impl ToolWidget for RegexTesterTool {
    fn on_input(&mut self, input: &str) -> anyhow::Result<()> {
        let (pattern, text) = input.split_once('\n').unwrap_or((input, ""));

        let rows = match Regex::new(pattern) {
            Ok(re) => {
                let matches: Vec<&str> = re.find_iter(text).map(|m| m.as_str()).collect();
                vec![
                    ("Pattern", pattern.to_string()),
                    ("Matches", matches.len().to_string()),
                    ("Found", matches.join(", ")),
                ]
            }
            Err(e) => vec![("Pattern", pattern.to_string()), ("Error", e.to_string())],
        };
        render_panel(&self.container, ID, "Regex Tester", &rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_matches() {
        let container = Container::new(ID);
        let mut tool = RegexTesterTool::new(container.clone());

        tool.on_input("\\d+\nabc 12 de 345").unwrap();
        let content = container.content();
        assert!(content.contains("<output>2</output>"));
        assert!(content.contains("12, 345"));
    }

    #[test]
    fn test_invalid_pattern_is_shown() {
        let container = Container::new(ID);
        let mut tool = RegexTesterTool::new(container.clone());

        tool.on_input("(unclosed\ntext").unwrap();
        assert!(container.content().contains("Error"));
    }
}
