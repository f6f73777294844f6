//! # Corridor Server
//!
//! Transport glue between hyper and a Corridor application: an HTTP/1
//! accept loop plus [`delegate_http`], which adapts a raw request/response
//! pair into the framework's generic invocation contract.
//!
//! ```no_run
//! use std::sync::Arc;
//! use corridor_http::{handler_fn, Context};
//! use corridor_router::Router;
//! use corridor_server::HttpServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let mut router = Router::new();
//! router
//!     .get("/", handler_fn(|ctx: Context| async move {
//!         ctx.set_body("Hello World!");
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let server = HttpServer::new(Arc::new(router.routes()));
//! server.listen("127.0.0.1:8080".parse()?).await?;
//! # Ok(())
//! # }
//! ```

pub mod http;

pub use http::{HttpServer, ResponseBody, delegate_http, into_hyper_response};
