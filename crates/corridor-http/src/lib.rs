//! # Corridor HTTP
//!
//! The context layer of the Corridor framework: a framework-neutral,
//! mutation-tracked surface over one incoming request / outgoing response
//! pair, plus the middleware trait the dispatch pipeline composes.
//!
//! The [`Context`] exposes request metadata, a header facade that is safe to
//! poke after the response has started, and a body slot whose assignments
//! drive content-header coercion. Handlers implement [`Middleware`] and pass
//! control down the chain through an explicit [`Next`] continuation.
//!
//! ```
//! use corridor_http::{handler_fn, Context, Middleware, Next};
//! use hyper::{HeaderMap, Method, Uri};
//! use bytes::Bytes;
//!
//! # tokio_test::block_on(async {
//! let hello = handler_fn(|ctx: Context| async move {
//!     ctx.set_body("Hello World!");
//!     Ok(())
//! });
//!
//! let ctx = Context::new(Method::GET, Uri::from_static("/"), HeaderMap::new(), Bytes::new());
//! hello.handle(ctx.clone(), Next::empty()).await.unwrap();
//! assert_eq!(ctx.get("Content-Type"), "text/plain");
//! # });
//! ```

pub mod body;
pub mod context;
pub mod error;
pub mod middleware;
pub mod response;

pub use body::{Body, BodyKind, BodyStream, BoxError, ErrorHook, ResponseFlags};
pub use context::{Context, MatchedRoute};
pub use error::{Error, Result};
pub use middleware::{
	Chain, FnHandler, FnMiddleware, Middleware, Next, compose, handler_fn, middleware_fn,
};
pub use response::{OutgoingResponse, ResponsePayload};
