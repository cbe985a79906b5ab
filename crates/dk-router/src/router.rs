//! Path router
//!
//! An exact pattern match wins, otherwise the first registered pattern with
//! the same number of segments whose literal segments match. Registration
//! order decides ties, not specificity. Trailing slashes are not normalized.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use dk_core::config::normalize_base_path;

use crate::history::History;

/// Path the router falls back to when nothing matches
pub const HOME_PATH: &str = "/";

/// Data handed to a route handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteContext {
    /// Logical path, without base prefix or query
    pub path: String,
    /// Values bound by `:name` segments
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

impl RouteContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Path segment by position, `/tool/42` has `tool` at 1 and `42` at 2
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.path.split('/').nth(index)
    }
}

pub type RouteHandler = Arc<dyn Fn(&RouteContext) + Send + Sync>;

/// Which handler a resolution ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A registered route, identified by its pattern
    Route(String),
    /// The not-found handler
    NotFound,
    /// No handler matched and the router redirected home
    Redirected,
    /// Nothing matched, not even the home path
    Unhandled,
}

struct Route {
    pattern: String,
    segments: Vec<String>,
    handler: RouteHandler,
}

/// Client-side router bound to a [`History`]
pub struct Router {
    base_path: String,
    history: Arc<dyn History>,
    routes: RwLock<Vec<Route>>,
    not_found: RwLock<Option<RouteHandler>>,
}

impl Router {
    pub fn new(history: Arc<dyn History>) -> Self {
        Self::with_base_path(history, "")
    }

    /// Router whose paths live under `base_path` (e.g. `/devkit`)
    pub fn with_base_path(history: Arc<dyn History>, base_path: &str) -> Self {
        Self {
            base_path: normalize_base_path(base_path),
            history,
            routes: RwLock::new(Vec::new()),
            not_found: RwLock::new(None),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Register a path template; `:name` segments match any single segment
    pub fn add_route<F>(&self, pattern: &str, handler: F)
    where
        F: Fn(&RouteContext) + Send + Sync + 'static,
    {
        let route = Route {
            pattern: pattern.to_string(),
            segments: pattern.split('/').map(str::to_string).collect(),
            handler: Arc::new(handler),
        };
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
        debug!("Added route {}", pattern);
    }

    /// Handler for unmatched paths; without one the router redirects home
    pub fn set_not_found<F>(&self, handler: F)
    where
        F: Fn(&RouteContext) + Send + Sync + 'static,
    {
        *self.not_found.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    /// Push `path` onto the history and resolve it synchronously
    pub fn navigate(&self, path: &str) -> Resolution {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        self.history.push(&format!("{}{}", self.base_path, path));
        self.handle_route()
    }

    /// Resolve the history's current location and run the winning handler.
    ///
    /// No router lock is held while the handler runs, so handlers may
    /// navigate.
    pub fn handle_route(&self) -> Resolution {
        let path = self.current_path();
        let context_for = |params| RouteContext {
            path: path.clone(),
            params,
            query: self.query_params(),
        };

        if let Some((pattern, handler, params)) = self.find_route(&path) {
            debug!("Route {} matched {}", pattern, path);
            handler(&context_for(params));
            return Resolution::Route(pattern);
        }

        let not_found = self
            .not_found
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = not_found {
            debug!("No route for {}, running not-found handler", path);
            handler(&context_for(HashMap::new()));
            return Resolution::NotFound;
        }

        if path == HOME_PATH {
            warn!("No route registered for {}", HOME_PATH);
            return Resolution::Unhandled;
        }

        debug!("No route for {}, redirecting home", path);
        self.navigate(HOME_PATH);
        Resolution::Redirected
    }

    /// History popstate: resolve the current entry without pushing
    pub fn on_pop_state(&self) -> Resolution {
        self.handle_route()
    }

    /// Step back in history; `None` at the first entry
    pub fn back(&self) -> Option<Resolution> {
        self.history.back().then(|| self.on_pop_state())
    }

    /// Step forward in history; `None` at the last entry
    pub fn forward(&self) -> Option<Resolution> {
        self.history.forward().then(|| self.on_pop_state())
    }

    /// Logical path of the current history entry
    pub fn current_path(&self) -> String {
        let location = self.history.location();
        let path = split_location(&location).0;
        let stripped = path.strip_prefix(self.base_path.as_str()).unwrap_or(path);

        if stripped.is_empty() {
            HOME_PATH.to_string()
        } else if stripped.starts_with('/') {
            stripped.to_string()
        } else {
            // base `/app` must not match `/application`
            path.to_string()
        }
    }

    /// Decoded query string of the current history entry
    pub fn query_params(&self) -> HashMap<String, String> {
        let location = self.history.location();
        let query = split_location(&location).1;
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect()
    }

    fn find_route(&self, path: &str) -> Option<(String, RouteHandler, HashMap<String, String>)> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(route) = routes.iter().find(|r| r.pattern == path) {
            return Some((route.pattern.clone(), Arc::clone(&route.handler), HashMap::new()));
        }

        let segments: Vec<&str> = path.split('/').collect();
        routes.iter().find_map(|route| {
            match_segments(&route.segments, &segments)
                .map(|params| (route.pattern.clone(), Arc::clone(&route.handler), params))
        })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<String> = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| r.pattern.clone())
            .collect();
        f.debug_struct("Router")
            .field("base_path", &self.base_path)
            .field("routes", &patterns)
            .finish()
    }
}

fn match_segments(pattern: &[String], path: &[&str]) -> Option<HashMap<String, String>> {
    if pattern.len() != path.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (expected, actual) in pattern.iter().zip(path) {
        if let Some(name) = expected.strip_prefix(':') {
            params.insert(name.to_string(), actual.to_string());
        } else if expected != actual {
            return None;
        }
    }
    Some(params)
}

/// Form-style decoding: `+` is a space, invalid escapes are kept verbatim
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Split `path?query#fragment` into path and query
fn split_location(location: &str) -> (&str, &str) {
    let without_fragment = location.split_once('#').map_or(location, |(l, _)| l);
    without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<String>>>;

    fn router_with_history(base: &str) -> (Arc<MemoryHistory>, Arc<Router>, Calls) {
        let history = Arc::new(MemoryHistory::new(format!("{}/", base)));
        let router = Arc::new(Router::with_base_path(history.clone(), base));
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));

        let c = Arc::clone(&calls);
        router.add_route("/", move |_| c.lock().unwrap().push("home".to_string()));
        let c = Arc::clone(&calls);
        router.add_route("/tool/:id", move |ctx| {
            c.lock().unwrap().push(format!("tool:{}", ctx.param("id").unwrap_or_default()))
        });
        (history, router, calls)
    }

    #[test]
    fn test_navigate_then_current_path() {
        let (history, router, _) = router_with_history("/devkit");

        for path in ["/", "/tool/base64-encoder", "/tool/42"] {
            router.navigate(path);
            assert_eq!(router.current_path(), path);
        }
        assert_eq!(history.location(), "/devkit/tool/42");
    }

    #[test]
    fn test_navigate_normalizes_relative_path() {
        let (_, router, calls) = router_with_history("");
        assert_eq!(router.navigate("tool/x"), Resolution::Route("/tool/:id".to_string()));
        assert_eq!(router.current_path(), "/tool/x");
        assert_eq!(*calls.lock().unwrap(), vec!["tool:x"]);
    }

    #[test]
    fn test_param_route_handler_reads_segment() {
        let history = Arc::new(MemoryHistory::default());
        let router = Arc::new(Router::new(history));
        let seen = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&router);
        let s = Arc::clone(&seen);
        router.add_route("/tool/:id", move |ctx| {
            let path = weak.upgrade().map(|r| r.current_path()).unwrap_or_default();
            let second = path.split('/').filter(|seg| !seg.is_empty()).nth(1).map(str::to_string);
            *s.lock().unwrap() = Some((second, ctx.segment(2).map(str::to_string)));
        });

        router.navigate("/tool/42");
        assert_eq!(
            *seen.lock().unwrap(),
            Some((Some("42".to_string()), Some("42".to_string())))
        );
    }

    #[test]
    fn test_unknown_path_runs_home_once() {
        let (_, router, calls) = router_with_history("");

        assert_eq!(router.navigate("/does/not/exist"), Resolution::Redirected);
        assert_eq!(*calls.lock().unwrap(), vec!["home"]);
        assert_eq!(router.current_path(), "/");
    }

    #[test]
    fn test_not_found_handler_preferred() {
        let (_, router, calls) = router_with_history("");
        let c = Arc::clone(&calls);
        router.set_not_found(move |ctx| c.lock().unwrap().push(format!("404:{}", ctx.path)));

        assert_eq!(router.navigate("/nope"), Resolution::NotFound);
        assert_eq!(*calls.lock().unwrap(), vec!["404:/nope"]);
    }

    #[test]
    fn test_missing_home_route_does_not_loop() {
        let router = Router::new(Arc::new(MemoryHistory::default()));
        assert_eq!(router.navigate("/x"), Resolution::Unhandled);
    }

    #[test]
    fn test_first_match_wins() {
        let router = Router::new(Arc::new(MemoryHistory::default()));
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let c = Arc::clone(&calls);
        router.add_route("/tool/:id", move |_| c.lock().unwrap().push("param".to_string()));
        let c = Arc::clone(&calls);
        router.add_route("/tool/settings", move |_| c.lock().unwrap().push("literal".to_string()));

        router.navigate("/tool/settings");
        // Exact matches beat registration order
        assert_eq!(*calls.lock().unwrap(), vec!["literal"]);

        let c = Arc::clone(&calls);
        router.add_route("/:section/settings", move |_| c.lock().unwrap().push("late".to_string()));
        router.navigate("/tool/other");
        router.navigate("/user/settings");
        assert_eq!(*calls.lock().unwrap(), vec!["literal", "param", "late"]);
    }

    #[test]
    fn test_back_and_forward_do_not_push() {
        let (history, router, calls) = router_with_history("");
        router.navigate("/tool/a");
        router.navigate("/tool/b");
        let entries = history.len();

        assert_eq!(router.back(), Some(Resolution::Route("/tool/:id".to_string())));
        assert_eq!(router.current_path(), "/tool/a");
        assert_eq!(router.back(), Some(Resolution::Route("/".to_string())));
        assert_eq!(router.back(), None);
        assert!(router.forward().is_some());

        assert_eq!(history.len(), entries);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["tool:a", "tool:b", "tool:a", "home", "tool:a"]
        );
    }

    #[test]
    fn test_query_params() {
        let (_, router, _) = router_with_history("/app");
        router.navigate("/tool/url-encoder?input=a%20b&mode=de+code#top");

        assert_eq!(router.current_path(), "/tool/url-encoder");
        let query = router.query_params();
        assert_eq!(query.get("input").map(String::as_str), Some("a b"));
        assert_eq!(query.get("mode").map(String::as_str), Some("de code"));
    }

    #[test]
    fn test_base_prefix_is_segment_aware() {
        let history = Arc::new(MemoryHistory::new("/application"));
        let router = Router::with_base_path(history, "/app");
        assert_eq!(router.current_path(), "/application");
    }

    #[test]
    fn test_handler_may_navigate() {
        let history = Arc::new(MemoryHistory::default());
        let router = Arc::new(Router::new(history));
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));

        let c = Arc::clone(&calls);
        router.add_route("/", move |_| c.lock().unwrap().push("home".to_string()));
        let weak = Arc::downgrade(&router);
        router.add_route("/old", move |_| {
            if let Some(router) = weak.upgrade() {
                router.navigate("/");
            }
        });

        router.navigate("/old");
        assert_eq!(router.current_path(), "/");
        assert_eq!(*calls.lock().unwrap(), vec!["home"]);
    }
}
