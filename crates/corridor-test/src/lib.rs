//! # Corridor Test
//!
//! In-memory harness for exercising the pipeline without sockets: build a
//! request, run it through any [`Middleware`] behind the error boundary,
//! and inspect the finalized response as plain data.
//!
//! ```
//! use corridor_http::{handler_fn, Context};
//! use corridor_router::Router;
//! use corridor_test::TestRequest;
//!
//! # tokio_test::block_on(async {
//! let mut router = Router::new();
//! router
//!     .get("/", handler_fn(|ctx: Context| async move {
//!         ctx.set_body("Hello World!");
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! let response = TestRequest::get("/").dispatch(&router.routes()).await;
//! assert_eq!(response.status, 200);
//! assert_eq!(response.text(), "Hello World!");
//! # });
//! ```

use bytes::Bytes;
use corridor_http::{Context, Middleware, OutgoingResponse, ResponsePayload};
use corridor_router::{ErrorBoundary, invoke};
use futures::StreamExt;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Uri};
use serde::Serialize;
use serde_json::Value;

/// Builder for one in-memory request.
pub struct TestRequest {
	method: Method,
	uri: String,
	headers: HeaderMap,
	payload: Bytes,
	expose_stack_traces: bool,
}

impl TestRequest {
	pub fn new(method: Method, uri: impl Into<String>) -> Self {
		Self {
			method,
			uri: uri.into(),
			headers: HeaderMap::new(),
			payload: Bytes::new(),
			expose_stack_traces: false,
		}
	}

	pub fn get(uri: impl Into<String>) -> Self {
		Self::new(Method::GET, uri)
	}

	pub fn post(uri: impl Into<String>) -> Self {
		Self::new(Method::POST, uri)
	}

	pub fn put(uri: impl Into<String>) -> Self {
		Self::new(Method::PUT, uri)
	}

	pub fn delete(uri: impl Into<String>) -> Self {
		Self::new(Method::DELETE, uri)
	}

	pub fn head(uri: impl Into<String>) -> Self {
		Self::new(Method::HEAD, uri)
	}

	/// Add a request header.
	pub fn header(mut self, name: &str, value: &str) -> Self {
		let name = HeaderName::from_bytes(name.as_bytes()).expect("valid test header name");
		let value = HeaderValue::from_str(value).expect("valid test header value");
		self.headers.append(name, value);
		self
	}

	/// Attach a raw payload.
	pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
		self.payload = payload.into();
		self
	}

	/// Attach a JSON payload.
	pub fn json<T: Serialize>(self, value: &T) -> Self {
		let payload = serde_json::to_vec(value).expect("serializable test payload");
		self.header("content-type", "application/json").payload(payload)
	}

	/// Let the error boundary include backtraces in 500 payloads.
	pub fn expose_stack_traces(mut self) -> Self {
		self.expose_stack_traces = true;
		self
	}

	/// Decorate the request into a [`Context`] without running anything.
	pub fn build(self) -> Context {
		let uri: Uri = self.uri.parse().expect("valid test uri");
		Context::new(self.method, uri, self.headers, self.payload)
	}

	/// Run the request through an application and snapshot the finalized
	/// response.
	pub async fn dispatch(self, app: &dyn Middleware) -> ResponseSnapshot {
		let boundary = ErrorBoundary::new(self.expose_stack_traces);
		let ctx = self.build();
		let response = invoke(app, ctx, &boundary).await;
		ResponseSnapshot::collect(response).await
	}
}

/// A finalized response, fully buffered for assertions.
pub struct ResponseSnapshot {
	pub status: u16,
	pub message: Option<String>,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl ResponseSnapshot {
	/// Collect an [`OutgoingResponse`], draining a streaming payload into
	/// the body buffer.
	pub async fn collect(response: OutgoingResponse) -> Self {
		let body = match response.payload {
			ResponsePayload::None => Bytes::new(),
			ResponsePayload::Full(bytes) => bytes,
			ResponsePayload::Stream(mut stream) => {
				let mut collected = Vec::new();
				while let Some(chunk) = stream.next().await {
					match chunk {
						Ok(bytes) => collected.extend_from_slice(&bytes),
						Err(_) => break,
					}
				}
				Bytes::from(collected)
			}
		};
		Self {
			status: response.status.as_u16(),
			message: response.message,
			headers: response.headers,
			body,
		}
	}

	/// The body as text.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).to_string()
	}

	/// The body parsed as JSON.
	pub fn json(&self) -> serde_json::Result<Value> {
		serde_json::from_slice(&self.body)
	}

	/// Response header lookup, case-insensitive.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use corridor_http::handler_fn;
	use corridor_router::Router;

	#[tokio::test]
	async fn builder_decorates_method_uri_and_payload() {
		let ctx = TestRequest::post("/things?a=1")
			.json(&serde_json::json!({"z": 999}))
			.build();
		assert_eq!(ctx.method(), Method::POST);
		assert_eq!(ctx.path(), "/things");
		assert_eq!(ctx.query().get("a").map(String::as_str), Some("1"));
		assert_eq!(ctx.data(), Some(serde_json::json!({"z": 999})));
	}

	#[tokio::test]
	async fn dispatch_runs_the_full_pipeline() {
		let mut router = Router::new();
		router
			.get("/ping", handler_fn(|ctx: Context| async move {
				ctx.set_body("pong");
				Ok(())
			}))
			.unwrap();

		let response = TestRequest::get("/ping").dispatch(&router.routes()).await;
		assert_eq!(response.status, 200);
		assert_eq!(response.text(), "pong");
		assert_eq!(response.header("content-type"), Some("text/plain"));
	}
}
