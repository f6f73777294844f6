//! # Corridor
//!
//! A small HTTP framework core built around two pieces: a **context
//! adapter**, which exposes a uniform, mutation-tracked surface (status,
//! headers, body) over one request/response pair, and a **dispatch
//! pipeline**, which matches the request path against registered routes,
//! composes the matched handler stacks into a single chain, executes it,
//! and finalizes the response from whatever value the chain left in the
//! body slot.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use corridor::{handler_fn, Context, HttpServer, Router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let mut router = Router::new();
//! router
//!     .get("/users/{id}", handler_fn(|ctx: Context| async move {
//!         let id = ctx.params().get("id").cloned().unwrap_or_default();
//!         ctx.set_body(serde_json::json!({ "id": id }));
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! HttpServer::new(Arc::new(router.routes()))
//!     .listen("127.0.0.1:8080".parse()?)
//!     .await
//! # }
//! ```
//!
//! ## Crates
//!
//! - [`http`]: the [`Context`], header facade, body coercion, and the
//!   [`Middleware`] trait with its explicit [`Next`] continuation.
//! - [`router`]: path patterns, route registration, the dispatch pipeline
//!   and the error boundary.
//! - [`server`]: hyper transport glue.

pub use corridor_http as http;
pub use corridor_router as router;
pub use corridor_server as server;

pub use corridor_http::{
	Body, BodyKind, BodyStream, BoxError, Chain, Context, Error, MatchedRoute, Middleware, Next,
	OutgoingResponse, ResponsePayload, Result, compose, handler_fn, middleware_fn,
};
pub use corridor_router::{
	ErrorBoundary, Matched, PathPattern, PatternError, Route, Router, RouterOptions, RoutesHandler,
};
pub use corridor_server::{HttpServer, delegate_http};

#[cfg(feature = "test-utils")]
pub use corridor_test as test;
