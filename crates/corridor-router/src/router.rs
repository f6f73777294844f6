//! Route registration and matching.

use corridor_http::Middleware;
use hyper::Method;
use std::sync::Arc;

use crate::dispatch::RoutesHandler;
use crate::pattern::PatternError;
use crate::route::Route;

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterOptions {
	/// Router-level override of the path used for matching, taking
	/// precedence over both the context-level override and the parsed URL
	/// path.
	pub router_path: Option<String>,
	/// Whether 500 payloads produced by the error boundary include a
	/// captured backtrace. Defaults to on for debug builds only; production
	/// deployments should leave this off.
	pub expose_stack_traces: bool,
}

impl Default for RouterOptions {
	fn default() -> Self {
		Self {
			router_path: None,
			expose_stack_traces: cfg!(debug_assertions),
		}
	}
}

impl RouterOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_router_path(mut self, path: impl Into<String>) -> Self {
		self.router_path = Some(path.into());
		self
	}

	pub fn with_expose_stack_traces(mut self, expose: bool) -> Self {
		self.expose_stack_traces = expose;
		self
	}
}

/// Result of matching a request path against the route table: the matched
/// routes, ancestors first, and whether a terminal route matched.
pub struct Matched {
	pub route: bool,
	pub path: Vec<Arc<Route>>,
}

/// The route table plus chain-wide middleware.
///
/// Registration completes before serving begins: [`Router::routes`] takes a
/// read-only snapshot, so the table is never mutated during dispatch.
///
/// # Examples
///
/// ```
/// use corridor_router::Router;
/// use corridor_http::{handler_fn, Context};
///
/// let mut router = Router::new();
/// router
///     .get("/", handler_fn(|ctx: Context| async move {
///         ctx.set_body("Hello World!");
///         Ok(())
///     }))
///     .unwrap();
/// let handler = router.routes();
/// ```
#[derive(Default)]
pub struct Router {
	routes: Vec<Route>,
	middleware: Vec<Arc<dyn Middleware>>,
	options: RouterOptions,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_options(options: RouterOptions) -> Self {
		Self {
			options,
			..Self::default()
		}
	}

	pub fn options(&self) -> &RouterOptions {
		&self.options
	}

	/// Append a chain-wide middleware, run before every matched route's
	/// stack.
	pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
		self.middleware.push(Arc::new(middleware));
		self
	}

	/// Register a handler under a pattern, optionally scoped to a method
	/// and optionally naming the route. Handlers registered under the same
	/// pattern share one route and run in registration order.
	pub fn register(
		&mut self,
		method: Option<Method>,
		pattern: &str,
		name: Option<&str>,
		handler: impl Middleware + 'static,
	) -> Result<&mut Self, PatternError> {
		let handler: Arc<dyn Middleware> = Arc::new(handler);
		match self.routes.iter_mut().find(|route| route.path() == pattern) {
			Some(route) => {
				if let Some(name) = name {
					route.set_name(name);
				}
				route.push(method, handler);
			}
			None => {
				let mut route = Route::new(pattern)?;
				if let Some(name) = name {
					route.set_name(name);
				}
				route.push(method, handler);
				self.routes.push(route);
			}
		}
		Ok(self)
	}

	/// Register a handler that applies to every method.
	pub fn process(
		&mut self,
		pattern: &str,
		handler: impl Middleware + 'static,
	) -> Result<&mut Self, PatternError> {
		self.register(None, pattern, None, handler)
	}

	pub fn get(
		&mut self,
		pattern: &str,
		handler: impl Middleware + 'static,
	) -> Result<&mut Self, PatternError> {
		self.register(Some(Method::GET), pattern, None, handler)
	}

	pub fn post(
		&mut self,
		pattern: &str,
		handler: impl Middleware + 'static,
	) -> Result<&mut Self, PatternError> {
		self.register(Some(Method::POST), pattern, None, handler)
	}

	pub fn put(
		&mut self,
		pattern: &str,
		handler: impl Middleware + 'static,
	) -> Result<&mut Self, PatternError> {
		self.register(Some(Method::PUT), pattern, None, handler)
	}

	pub fn patch(
		&mut self,
		pattern: &str,
		handler: impl Middleware + 'static,
	) -> Result<&mut Self, PatternError> {
		self.register(Some(Method::PATCH), pattern, None, handler)
	}

	pub fn delete(
		&mut self,
		pattern: &str,
		handler: impl Middleware + 'static,
	) -> Result<&mut Self, PatternError> {
		self.register(Some(Method::DELETE), pattern, None, handler)
	}

	pub fn head(
		&mut self,
		pattern: &str,
		handler: impl Middleware + 'static,
	) -> Result<&mut Self, PatternError> {
		self.register(Some(Method::HEAD), pattern, None, handler)
	}

	/// Match a path against the table. Routes are returned in registration
	/// order, so the most specific (innermost) registration comes last.
	pub fn match_path(&self, path: &str) -> Matched {
		let matched: Vec<Arc<Route>> = self
			.routes
			.iter()
			.filter(|route| route.is_match(path))
			.map(|route| Arc::new(route.clone()))
			.collect();
		Matched {
			route: !matched.is_empty(),
			path: matched,
		}
	}

	/// Snapshot the table into a request handler, directly usable as a
	/// transport request listener or installable as a middleware in an
	/// enclosing chain.
	pub fn routes(&self) -> RoutesHandler {
		RoutesHandler::new(
			self.routes.iter().map(|route| Arc::new(route.clone())).collect(),
			self.middleware.clone(),
			self.options.clone(),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use corridor_http::{Context, handler_fn};

	fn noop() -> impl Middleware {
		handler_fn(|_ctx: Context| async move { Ok(()) })
	}

	#[test]
	fn same_pattern_registrations_share_a_route() {
		let mut router = Router::new();
		router.get("/things", noop()).unwrap();
		router.post("/things", noop()).unwrap();
		let matched = router.match_path("/things");
		assert!(matched.route);
		assert_eq!(matched.path.len(), 1);
		assert_eq!(matched.path[0].stack().len(), 2);
	}

	#[test]
	fn unmatched_paths_report_no_terminal_route() {
		let mut router = Router::new();
		router.get("/things", noop()).unwrap();
		let matched = router.match_path("/ololo");
		assert!(!matched.route);
		assert!(matched.path.is_empty());
	}

	#[test]
	fn wildcard_and_literal_both_match_in_order() {
		let mut router = Router::new();
		router.process("/api/(.*)", noop()).unwrap();
		router.get("/api/users", noop()).unwrap();
		let matched = router.match_path("/api/users");
		assert!(matched.route);
		assert_eq!(matched.path.len(), 2);
		assert_eq!(matched.path[0].path(), "/api/(.*)");
		assert_eq!(matched.path[1].path(), "/api/users");
	}

	#[test]
	fn invalid_patterns_surface_at_registration() {
		let mut router = Router::new();
		assert!(router.get("/broken/{", noop()).is_err());
	}
}
