//! Failure-isolated listener sets
//!
//! Both the event bus and the favorite store fan a value out to an ordered set
//! of callbacks. A callback that returns an error or panics is logged and the
//! remaining callbacks still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::error;

/// Handle returned by [`ListenerSet::add`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Callback receiving a borrowed value
pub type Listener<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// Run `f`, logging instead of propagating an error or panic.
///
/// Returns whether the callback completed successfully.
pub fn invoke_isolated<F>(label: &str, f: F) -> bool
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("{} listener failed: {:#}", label, e);
            false
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("{} listener panicked: {}", label, msg);
            false
        }
    }
}

/// Registration-ordered set of listeners
pub struct ListenerSet<T: ?Sized> {
    label: &'static str,
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T: ?Sized> ListenerSet<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the id was not subscribed
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Call every listener in registration order.
    ///
    /// The set is snapshotted first, so listeners may subscribe or unsubscribe
    /// while being notified. Returns the number of listeners that failed.
    pub fn notify(&self, value: &T) -> usize {
        let snapshot: Vec<Listener<T>> = self.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        snapshot
            .iter()
            .filter(|listener| !invoke_isolated(self.label, || listener(value)))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener<T>)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
