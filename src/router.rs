//! Compiled route table.
//!
//! Routes are kept in registration order and tried one after another; the
//! first route whose method and pattern both match wins. No reflection, no
//! mutation after startup: build the table once and share it behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::pattern::Pattern;

struct Route {
    method: Method,
    pattern: Pattern,
    handler: BoxedHandler,
}

/// Outcome of a route-table lookup.
pub enum Match {
    Found { handler: BoxedHandler, params: HashMap<String, String> },
    NotFound,
    /// The path is known, but not for this method.
    MethodNotAllowed { allowed: Vec<Method> },
}

/// The application route table.
///
/// Each registration returns `self` so calls chain naturally.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a handler for a method + pattern pair.
    ///
    /// See [`crate::pattern`] for the placeholder syntax:
    ///
    /// ```rust,no_run
    /// # use storefront::{Error, Method, Request, Response, Router};
    /// # async fn get_order(_: Request) -> Result<Response, Error> { Ok(Response::text("")) }
    /// # async fn file(_: Request) -> Result<Response, Error> { Ok(Response::text("")) }
    /// Router::new()
    ///     .on(Method::Get, r"/orders/{id:\d+}", get_order)
    ///     .on(Method::Get, r"/uploads/{file:.*\.\w+}", file);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `pattern` does not compile. Routes are fixed at startup, so a
    /// bad pattern is a programming error.
    pub fn on(mut self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        let compiled = Pattern::parse(pattern)
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
        self.routes.push(Route { method, pattern: compiled, handler: handler.into_boxed_handler() });
        self
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Patch, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, pattern, handler)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolves a request line to a handler.
    ///
    /// `HEAD` falls back to the first matching `GET` route when no `HEAD`
    /// route matches. Extension methods never match, but still produce
    /// `MethodNotAllowed` for known paths.
    pub fn lookup(&self, method: &http::Method, path: &str) -> Match {
        let wanted = Method::try_from(method).ok();
        let mut allowed: Vec<Method> = Vec::new();
        let mut head_fallback = None;

        for route in &self.routes {
            if Some(route.method) == wanted {
                if let Some(params) = route.pattern.captures(path) {
                    return Match::Found { handler: Arc::clone(&route.handler), params };
                }
                continue;
            }

            if wanted == Some(Method::Head) && route.method == Method::Get && head_fallback.is_none() {
                if let Some(params) = route.pattern.captures(path) {
                    head_fallback = Some((Arc::clone(&route.handler), params));
                }
            }

            if route.pattern.is_match(path) && !allowed.contains(&route.method) {
                allowed.push(route.method);
            }
        }

        if let Some((handler, params)) = head_fallback {
            return Match::Found { handler, params };
        }
        if allowed.is_empty() {
            return Match::NotFound;
        }
        if allowed.contains(&Method::Get) && !allowed.contains(&Method::Head) {
            allowed.push(Method::Head);
        }
        Match::MethodNotAllowed { allowed }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
