use crate::{
    errors::{Error, Result},
    http::{request::Request, response::Response},
};
use std::{fmt, sync::Arc};

/// Produces a [`Response`] for a [`Request`].
///
/// Implemented for every `Fn(&Request) -> Response` closure, so most routes
/// are registered as closures. Implement it directly for handlers that carry
/// their own state.
///
/// # Examples
/// ```
/// use reactor_web::{Handler, Request, Response};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Counter(AtomicUsize);
///
/// impl Handler for Counter {
///     fn handle(&self, _: &Request) -> Response {
///         let hits = self.0.fetch_add(1, Ordering::Relaxed) + 1;
///         Response::ok(hits.to_string())
///     }
/// }
///
/// let counter = Counter(AtomicUsize::new(0));
/// assert_eq!(counter.handle(&Request::default()).body_text(), "1");
/// ```
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &Request) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Response + Send + Sync + 'static,
{
    #[inline]
    fn handle(&self, request: &Request) -> Response {
        self(request)
    }
}

#[derive(Clone)]
pub(crate) struct Route {
    method: String,
    path: String,
    handler: Arc<dyn Handler>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Ordered `(method, path) -> handler` table with exact matching.
#[derive(Debug, Default)]
pub(crate) struct Router {
    routes: Vec<Route>,
}

impl Router {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a route. A `(method, path)` pair can be registered once.
    pub(crate) fn register<H: Handler>(&mut self, method: &str, path: &str, handler: H) -> Result<()> {
        if self.routes.iter().any(|route| route.method == method && route.path == path) {
            return Err(Error::duplicate_route(method, path));
        }

        self.routes.push(Route {
            method: method.to_string(),
            path: path.to_string(),
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// The first handler registered for the request's method and path.
    #[inline]
    fn find(&self, request: &Request) -> Option<&dyn Handler> {
        self.routes
            .iter()
            .find(|route| route.method == request.method && route.path == request.path)
            .map(|route| route.handler.as_ref())
    }

    /// Runs the matching handler, or answers `404` naming the path.
    #[inline]
    pub(crate) fn route(&self, request: &Request) -> Response {
        match self.find(request) {
            Some(handler) => handler.handle(request),
            None => Response::not_found(&request.path),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }
}
