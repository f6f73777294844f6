//! # Corridor Router
//!
//! Route matching and the dispatch pipeline: registered patterns are matched
//! against the request path, the matched routes' method-scoped handler
//! stacks are composed into one chain per request, and the response is
//! finalized from whatever the chain left in the context's body slot. An
//! error boundary at the outer edge converts any failure into a structured
//! 500 response.
//!
//! ```
//! use corridor_router::Router;
//! use corridor_http::{handler_fn, Context};
//!
//! let mut router = Router::new();
//! router
//!     .get("/users/{id}", handler_fn(|ctx: Context| async move {
//!         let id = ctx.params().get("id").cloned().unwrap_or_default();
//!         ctx.set_body(format!("user {id}"));
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! // `routes()` yields the request handler used by the transport layer.
//! let handler = router.routes();
//! ```

pub mod dispatch;
pub mod pattern;
pub mod route;
pub mod router;

pub use dispatch::{ErrorBoundary, RoutesHandler, invoke};
pub use pattern::{PathPattern, PatternError};
pub use route::{Route, RouteEntry};
pub use router::{Matched, Router, RouterOptions};
