//! Mount slot for the active tool widget
//!
//! At most one widget is mounted at a time. Every mount or unmount bumps a
//! generation counter; a mount whose import resolves after a newer request
//! finds the counter moved on and discards itself without constructing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use dk_core::widget::{Container, ToolWidget};

use crate::error::{LoaderError, Result};
use crate::registry::ModuleRegistry;

/// How a mount request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// The widget is constructed and owns the container
    Mounted,
    /// A newer mount or unmount superseded this request
    Stale,
}

/// Position in the mount order, reserved before the mount starts running
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MountTicket(u64);

struct MountedTool {
    tool_id: String,
    container: Container,
    widget: Box<dyn ToolWidget>,
}

/// Owner of the currently mounted tool widget
pub struct ToolHost {
    registry: Arc<ModuleRegistry>,
    generation: AtomicU64,
    slot: Mutex<Option<MountedTool>>,
    last_request: Mutex<Option<(String, Container)>>,
}

impl ToolHost {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            generation: AtomicU64::new(0),
            slot: Mutex::new(None),
            last_request: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Release the current widget, then import and mount `tool_id`.
    ///
    /// Load failures render an error panel into `container` and are returned.
    /// If another mount or unmount happens while the import is pending the
    /// result is discarded and `Stale` is returned.
    pub async fn mount(&self, tool_id: &str, container: Container) -> Result<MountOutcome> {
        let ticket = self.begin_mount();
        self.mount_with(ticket, tool_id, container).await
    }

    /// Reserve the next mount position.
    ///
    /// Tickets order mounts by when they were taken, not by when their mount
    /// starts running. Any later ticket or unmount makes this one stale.
    pub fn begin_mount(&self) -> MountTicket {
        MountTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// [`mount`](Self::mount) under a previously reserved ticket
    pub async fn mount_with(&self, ticket: MountTicket, tool_id: &str, container: Container) -> Result<MountOutcome> {
        let generation = ticket.0;
        if !self.claim(generation, tool_id, &container) {
            debug!("Skipping superseded mount of {} (generation {})", tool_id, generation);
            return Ok(MountOutcome::Stale);
        }

        let resolved = self.registry.resolve_component(tool_id).await;

        let mut slot = self.lock_slot();
        if !self.is_current(generation) {
            debug!("Discarding stale mount of {} (generation {})", tool_id, generation);
            return Ok(MountOutcome::Stale);
        }

        let constructor = match resolved {
            Ok(constructor) => constructor,
            Err(e) => {
                warn!("Failed to load tool {}: {}", tool_id, e);
                container.render(error_markup(&e));
                return Err(e);
            }
        };

        container.clear();
        match constructor(container.clone()) {
            Ok(widget) => {
                *slot = Some(MountedTool {
                    tool_id: tool_id.to_string(),
                    container,
                    widget,
                });
                debug!("Mounted {} (generation {})", tool_id, generation);
                Ok(MountOutcome::Mounted)
            }
            Err(e) => {
                let err = LoaderError::Construct {
                    id: tool_id.to_string(),
                    reason: format!("{:#}", e),
                };
                warn!("{}", err);
                container.render(error_markup(&err));
                Err(err)
            }
        }
    }

    /// Mount the most recently requested tool again (error panel retry)
    pub async fn retry(&self) -> Option<Result<MountOutcome>> {
        let (tool_id, container) = self.lock_request().clone()?;
        Some(self.mount(&tool_id, container).await)
    }

    /// Release the current widget and invalidate pending mounts
    pub fn unmount(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.lock_request().take();
        self.release();
    }

    /// Id of the mounted tool, if any
    pub fn current_tool_id(&self) -> Option<String> {
        self.lock_slot().as_ref().map(|m| m.tool_id.clone())
    }

    /// Forward user input to the mounted widget
    pub fn send_input(&self, input: &str) -> anyhow::Result<()> {
        let mut slot = self.lock_slot();
        let mounted = slot
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no tool is mounted"))?;
        mounted.widget.on_input(input)
    }

    fn release(&self) {
        let previous = self.lock_slot().take();
        if let Some(mounted) = previous {
            destroy(mounted);
        }
    }

    /// Release the current widget and show the loading state, unless
    /// `generation` has been superseded.
    ///
    /// Runs under the slot lock so a superseded mount never touches a newer
    /// mount's widget or container. Widget `destroy` must not call back into
    /// the host.
    fn claim(&self, generation: u64, tool_id: &str, container: &Container) -> bool {
        let mut slot = self.lock_slot();
        if !self.is_current(generation) {
            return false;
        }
        if let Some(previous) = slot.take() {
            destroy(previous);
        }
        *self.lock_request() = Some((tool_id.to_string(), container.clone()));
        container.render(loading_markup());
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<MountedTool>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_request(&self) -> MutexGuard<'_, Option<(String, Container)>> {
        self.last_request.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn destroy(mut mounted: MountedTool) {
    mounted.widget.destroy();
    mounted.container.clear();
    debug!("Released {}", mounted.tool_id);
}

fn loading_markup() -> &'static str {
    r#"<div class="tool-loading">Loading...</div>"#
}

fn error_markup(err: &LoaderError) -> String {
    format!(
        concat!(
            r#"<div class="tool-error">"#,
            r#"<h3>Failed to load tool</h3>"#,
            r#"<p>{}</p>"#,
            r#"<button data-action="retry">Retry</button>"#,
            r#"</div>"#
        ),
        escape(&err.to_string())
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{loader, ToolModule};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    struct Recorder {
        name: &'static str,
        container: Container,
        destroyed: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ToolWidget for Recorder {
        fn on_input(&mut self, input: &str) -> anyhow::Result<()> {
            self.container.render(format!("{}:{}", self.name, input));
            Ok(())
        }

        fn destroy(&mut self) {
            self.destroyed.lock().unwrap().push(self.name);
        }
    }

    fn module(name: &'static str, export: &'static str, destroyed: Arc<Mutex<Vec<&'static str>>>) -> ToolModule {
        ToolModule::new().export(export, move |container: Container| {
            container.render(name);
            Ok(Box::new(Recorder {
                name,
                container,
                destroyed: Arc::clone(&destroyed),
            }) as Box<dyn ToolWidget>)
        })
    }

    fn registry_with(ids: &[(&'static str, &'static str)], destroyed: &Arc<Mutex<Vec<&'static str>>>) -> Arc<ModuleRegistry> {
        let registry = Arc::new(ModuleRegistry::new());
        for (id, export) in ids.iter().copied() {
            let destroyed = Arc::clone(destroyed);
            registry.register(id, loader(move || {
                let destroyed = Arc::clone(&destroyed);
                async move { Ok(module(id, export, destroyed)) }
            }));
        }
        registry
    }

    #[tokio::test]
    async fn test_mount_releases_previous() {
        let destroyed = Arc::new(Mutex::new(Vec::new()));
        let host = ToolHost::new(registry_with(&[("a", "ATool"), ("b", "BTool")], &destroyed));
        let container = Container::new("tool");

        assert_eq!(host.mount("a", container.clone()).await.unwrap(), MountOutcome::Mounted);
        assert_eq!(container.content(), "a");

        assert_eq!(host.mount("b", container.clone()).await.unwrap(), MountOutcome::Mounted);
        assert_eq!(container.content(), "b");
        assert_eq!(*destroyed.lock().unwrap(), vec!["a"]);
        assert_eq!(host.current_tool_id().as_deref(), Some("b"));

        host.unmount();
        assert_eq!(*destroyed.lock().unwrap(), vec!["a", "b"]);
        assert!(host.current_tool_id().is_none());
        assert!(container.is_empty());
    }

    #[tokio::test]
    async fn test_late_import_is_discarded() {
        let destroyed = Arc::new(Mutex::new(Vec::new()));
        let registry = registry_with(&[("fast", "FastTool")], &destroyed);
        let constructed = Arc::new(AtomicUsize::new(0));

        let (release_tx, release_rx) = oneshot::channel::<()>();
        let gate = Arc::new(Mutex::new(Some(release_rx)));
        let counter = Arc::clone(&constructed);
        registry.register("slow", loader(move || {
            let gate = gate.lock().unwrap().take();
            let counter = Arc::clone(&counter);
            async move {
                if let Some(rx) = gate {
                    let _ = rx.await;
                }
                Ok(ToolModule::new().export("SlowTool", move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    anyhow::bail!("stale constructor must not run")
                }))
            }
        }));

        let host = Arc::new(ToolHost::new(registry));
        let stale_container = Container::new("stale");
        let pending = {
            let host = Arc::clone(&host);
            let container = stale_container.clone();
            tokio::spawn(async move { host.mount("slow", container).await })
        };
        tokio::task::yield_now().await;

        let container = Container::new("current");
        assert_eq!(host.mount("fast", container.clone()).await.unwrap(), MountOutcome::Mounted);

        release_tx.send(()).unwrap();
        assert_eq!(pending.await.unwrap().unwrap(), MountOutcome::Stale);
        assert_eq!(constructed.load(Ordering::SeqCst), 0);
        assert_eq!(host.current_tool_id().as_deref(), Some("fast"));
        assert_eq!(container.content(), "fast");
    }

    #[tokio::test]
    async fn test_older_ticket_started_late_is_stale() {
        let destroyed = Arc::new(Mutex::new(Vec::new()));
        let host = ToolHost::new(registry_with(&[("a", "ATool"), ("b", "BTool")], &destroyed));
        let container = Container::new("tool");

        let older = host.begin_mount();
        let newer = host.begin_mount();
        assert!(older < newer);

        let mounted = host.mount_with(newer, "b", container.clone()).await.unwrap();
        assert_eq!(mounted, MountOutcome::Mounted);
        let late = host.mount_with(older, "a", container.clone()).await.unwrap();
        assert_eq!(late, MountOutcome::Stale);

        assert_eq!(host.current_tool_id().as_deref(), Some("b"));
        assert_eq!(container.content(), "b");
        assert!(destroyed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_panel_and_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(ModuleRegistry::new());
        let counter = Arc::clone(&attempts);
        registry.register("flaky", loader(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    anyhow::bail!("<chunk> failed");
                }
                Ok(module("flaky", "FlakyTool", Arc::new(Mutex::new(Vec::new()))))
            }
        }));

        let host = ToolHost::new(registry);
        let container = Container::new("tool");

        let err = host.mount("flaky", container.clone()).await.unwrap_err();
        assert!(matches!(err, LoaderError::ImportFailed { .. }));
        assert!(container.content().contains("tool-error"));
        assert!(container.content().contains("&lt;chunk&gt;"));

        let retried = host.retry().await.unwrap().unwrap();
        assert_eq!(retried, MountOutcome::Mounted);
        assert_eq!(container.content(), "flaky");
    }

    #[tokio::test]
    async fn test_unregistered_tool_renders_error() {
        let host = ToolHost::new(Arc::new(ModuleRegistry::new()));
        let container = Container::new("tool");

        let err = host.mount("nope", container.clone()).await.unwrap_err();
        assert_eq!(err, LoaderError::NotRegistered("nope".to_string()));
        assert!(container.content().contains("Retry"));
    }

    #[tokio::test]
    async fn test_send_input_reaches_widget() {
        let destroyed = Arc::new(Mutex::new(Vec::new()));
        let host = ToolHost::new(registry_with(&[("echo", "EchoTool")], &destroyed));
        let container = Container::new("tool");

        assert!(host.send_input("ignored").is_err());
        host.mount("echo", container.clone()).await.unwrap();
        host.send_input("hello").unwrap();
        assert_eq!(container.content(), "echo:hello");
    }
}
