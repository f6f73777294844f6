//! The dispatch pipeline: match, chain, execute, finalize.
//!
//! Each request runs a state machine that is terminal on the first
//! finalization or on the first error surfaced past the boundary: resolve
//! the matching path, accumulate matched routes on the context, build the
//! per-request chain (binding link plus method-filtered stack per route,
//! with the not-found fallback as the final link), execute it through the
//! composition primitive, and finalize the response from the body slot.

use async_trait::async_trait;
use bytes::Bytes;
use corridor_http::{
	Chain, Context, Error, Middleware, Next, OutgoingResponse, ResponsePayload, Result, compose,
};
use hyper::{HeaderMap, Method, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::route::Route;
use crate::router::{Matched, RouterOptions};

/// A snapshot of a router, usable as a transport request listener or as a
/// middleware inside an enclosing chain.
pub struct RoutesHandler {
	shared: Arc<RouterShared>,
}

struct RouterShared {
	routes: Vec<Arc<Route>>,
	middleware: Vec<Arc<dyn Middleware>>,
	options: RouterOptions,
}

impl RouterShared {
	fn match_path(&self, path: &str) -> Matched {
		let matched: Vec<Arc<Route>> = self
			.routes
			.iter()
			.filter(|route| route.is_match(path))
			.cloned()
			.collect();
		Matched {
			route: !matched.is_empty(),
			path: matched,
		}
	}
}

impl RoutesHandler {
	pub(crate) fn new(
		routes: Vec<Arc<Route>>,
		middleware: Vec<Arc<dyn Middleware>>,
		options: RouterOptions,
	) -> Self {
		Self {
			shared: Arc::new(RouterShared {
				routes,
				middleware,
				options,
			}),
		}
	}

	/// The path used for matching: router-level override, then the
	/// context-level override, then the parsed URL path.
	fn resolve_path(&self, ctx: &Context) -> String {
		self.shared
			.options
			.router_path
			.clone()
			.or_else(|| ctx.router_path())
			.unwrap_or_else(|| ctx.path())
	}

	fn build_chain(&self, matched: &Matched, path: &str, method: &Method) -> Chain {
		let mut stack: Vec<Arc<dyn Middleware>> = Vec::new();
		stack.extend(self.shared.middleware.iter().cloned());
		for route in &matched.path {
			stack.push(Arc::new(BindRoute {
				route: route.clone(),
				path: path.to_owned(),
			}));
			stack.extend(route.stack_for(method));
		}
		stack.push(Arc::new(NotFound));
		compose(stack)
	}

	/// Run the pipeline for one request.
	///
	/// With no terminal match and an enclosing continuation, routing is
	/// delegated outward; otherwise the built chain runs, ending at the
	/// not-found fallback when no handler produced a response.
	pub async fn dispatch(&self, ctx: Context, next: Option<Next>) -> Result<()> {
		let path = self.resolve_path(&ctx);
		let method = ctx.method();
		let matched = self.shared.match_path(&path);
		tracing::debug!(
			method = %method,
			path = %path,
			matched = matched.path.len(),
			terminal = matched.route,
			"dispatching request"
		);

		ctx.push_matched(matched.path.iter().map(|route| route.summary()));

		if !matched.route {
			// Delegate to the enclosing chain when there is one; at the
			// outer edge the fallback chain below answers instead.
			if let Some(next) = next.filter(|next| !next.is_empty()) {
				return next.run(ctx).await;
			}
		} else if let Some(most_specific) = matched.path.last() {
			ctx.set_matched_route(most_specific.path());
			if let Some(name) = most_specific.name() {
				ctx.set_matched_route_name(name);
			}
		}

		self.build_chain(&matched, &path, &method).run(ctx).await
	}

	/// Handle one request end-to-end: boundary, dispatch, finalization.
	/// This is the transport-listener entry point.
	pub async fn respond(&self, ctx: Context) -> OutgoingResponse {
		let boundary = ErrorBoundary::new(self.shared.options.expose_stack_traces);
		invoke(self, ctx, &boundary).await
	}
}

#[async_trait]
impl Middleware for RoutesHandler {
	async fn handle(&self, ctx: Context, next: Next) -> Result<()> {
		self.dispatch(ctx, Some(next)).await
	}
}

/// Per-route binding link: computes captures, layers params over bindings
/// from enclosing routers, and records the route name before continuing.
struct BindRoute {
	route: Arc<Route>,
	path: String,
}

#[async_trait]
impl Middleware for BindRoute {
	async fn handle(&self, ctx: Context, next: Next) -> Result<()> {
		let captures = self.route.captures(&self.path);
		let params = self.route.params(&captures, &ctx.params());
		ctx.set_captures(captures);
		ctx.set_params(params);
		ctx.set_router_name(self.route.name().map(str::to_owned));
		next.run(ctx).await
	}
}

/// Fallback appended as the final link of every built chain; fires whenever
/// no earlier handler short-circuited the chain.
struct NotFound;

#[async_trait]
impl Middleware for NotFound {
	async fn handle(&self, ctx: Context, _next: Next) -> Result<()> {
		let _ = ctx.set_status(404);
		ctx.json(&json!({"status": 404, "message": "Not Found"}))
	}
}

/// Recovers errors from the downstream chain exactly once, converting them
/// into a structured 500 response.
pub struct ErrorBoundary {
	expose_stack_traces: bool,
}

impl ErrorBoundary {
	pub fn new(expose_stack_traces: bool) -> Self {
		Self { expose_stack_traces }
	}

	/// Run an application with this boundary at the outer edge. Any error
	/// ends the response with a 500 JSON payload; nothing escapes to the
	/// transport layer.
	pub async fn run(&self, app: &dyn Middleware, ctx: Context) {
		if let Err(err) = app.handle(ctx.clone(), Next::empty()).await {
			self.fail(&ctx, &err);
		}
	}

	fn fail(&self, ctx: &Context, err: &Error) {
		tracing::error!(error = %err, name = err.name(), "request handler failed");
		let mut error_body = json!({
			"name": err.name(),
			"message": err.to_string(),
		});
		if self.expose_stack_traces {
			error_body["stack"] = Value::String(
				std::backtrace::Backtrace::force_capture().to_string(),
			);
		}
		let _ = ctx.set_status(500);
		ctx.set_message("Internal Server Error");
		if ctx.json(&json!({"status": 500, "error": error_body})).is_err() {
			ctx.end(Bytes::from_static(b"{\"status\":500}"));
		}
	}
}

/// The generic invocation contract: run any application through the boundary
/// and finalize the response from the context.
pub async fn invoke(
	app: &dyn Middleware,
	ctx: Context,
	boundary: &ErrorBoundary,
) -> OutgoingResponse {
	boundary.run(app, ctx.clone()).await;
	match ctx.finalize() {
		Ok(response) => response,
		Err(err) => {
			tracing::error!(error = %err, "response finalization failed");
			OutgoingResponse {
				status: StatusCode::INTERNAL_SERVER_ERROR,
				message: None,
				headers: HeaderMap::new(),
				payload: ResponsePayload::Full(Bytes::from_static(b"{\"status\":500}")),
			}
		}
	}
}
