//! Widget contract between the shell and individual tools
//!
//! A tool module exports one or more component constructors. The shell calls
//! the constructor with a [`Container`]; the widget renders itself into it and
//! is released through [`ToolWidget::destroy`] before the next tool mounts.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Render surface handed to a widget, the headless stand-in for a DOM element.
///
/// Cloning yields another handle to the same surface.
#[derive(Clone)]
pub struct Container {
    id: Arc<str>,
    content: Arc<Mutex<String>>,
}

impl Container {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            content: Arc::new(Mutex::new(String::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the rendered content
    pub fn render(&self, markup: impl Into<String>) {
        *self.content.lock().unwrap_or_else(PoisonError::into_inner) = markup.into();
    }

    /// Append to the rendered content
    pub fn append(&self, markup: &str) {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(markup);
    }

    pub fn content(&self) -> String {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_empty(&self) -> bool {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Whether two handles refer to the same surface
    pub fn same_as(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.content, &other.content)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container").field("id", &self.id).finish()
    }
}

/// A mounted tool instance
pub trait ToolWidget: Send {
    /// Feed user input to the widget; it re-renders into its container.
    fn on_input(&mut self, _input: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release listeners and timers before the widget is unmounted.
    fn destroy(&mut self) {}
}

/// Exported component constructor: `new Component(container)`
pub type ComponentConstructor =
    Arc<dyn Fn(Container) -> anyhow::Result<Box<dyn ToolWidget>> + Send + Sync>;
