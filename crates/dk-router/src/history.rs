//! Session history abstraction

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Browser-style session history.
///
/// URLs are absolute paths including the base prefix and optional query.
pub trait History: Send + Sync {
    /// Append an entry after the current one, dropping any forward entries
    fn push(&self, url: &str);

    /// URL of the current entry
    fn location(&self) -> String;

    /// Step back; returns false at the first entry
    fn back(&self) -> bool;

    /// Step forward; returns false at the last entry
    fn forward(&self) -> bool;
}

struct Entries {
    stack: Vec<String>,
    cursor: usize,
}

/// In-memory history used headless and in tests
pub struct MemoryHistory {
    entries: Mutex<Entries>,
}

impl MemoryHistory {
    /// Start with a single entry at `initial`
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(Entries {
                stack: vec![initial.into()],
                cursor: 0,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().stack.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl History for MemoryHistory {
    fn push(&self, url: &str) {
        let mut entries = self.lock();
        let keep = entries.cursor + 1;
        entries.stack.truncate(keep);
        entries.stack.push(url.to_string());
        entries.cursor = keep;
    }

    fn location(&self) -> String {
        let entries = self.lock();
        entries.stack[entries.cursor].clone()
    }

    fn back(&self) -> bool {
        let mut entries = self.lock();
        if entries.cursor == 0 {
            return false;
        }
        entries.cursor -= 1;
        true
    }

    fn forward(&self) -> bool {
        let mut entries = self.lock();
        if entries.cursor + 1 >= entries.stack.len() {
            return false;
        }
        entries.cursor += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_truncates_forward_entries() {
        let history = MemoryHistory::default();
        history.push("/a");
        history.push("/b");
        assert!(history.back());
        assert_eq!(history.location(), "/a");

        history.push("/c");
        assert!(!history.forward());
        assert_eq!(history.len(), 3);
        assert!(history.back());
        assert_eq!(history.location(), "/a");
        assert!(history.back());
        assert!(!history.back());
        assert_eq!(history.location(), "/");
    }
}
