//! The response body slot and its finalization machinery.
//!
//! Whatever a handler assigns to the body is kept as a [`Body`] tag until the
//! pipeline finalizes the response. Coercion of content headers happens at
//! assignment time (see [`Context::set_body`](crate::Context::set_body));
//! conversion to actual bytes happens exactly once, at finalization.

use bytes::Bytes;
use futures::stream::Stream;
use parking_lot::Mutex;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context as TaskContext, Poll};

/// Boxed error type carried by streaming bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for a streaming body: a push-based, unbounded source of bytes
/// that is piped to the transport rather than buffered.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send + Sync>>;

/// Hook invoked when a streaming body emits an error.
pub type ErrorHook = Arc<dyn Fn(BoxError) + Send + Sync>;

/// The value left in the response body slot.
///
/// `Empty` means nothing was ever assigned; `Null` is an explicit assignment
/// that forces a 204 and strips entity headers. The remaining variants each
/// select a finalization strategy.
pub enum Body {
	Empty,
	Null,
	Bytes(Bytes),
	Text(String),
	Stream(BodyStream),
	Json(Value),
}

/// Discriminant-only view of [`Body`], for introspection and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
	Empty,
	Null,
	Bytes,
	Text,
	Stream,
	Json,
}

impl Body {
	/// The explicit-null body.
	pub fn null() -> Self {
		Body::Null
	}

	/// Wrap a byte stream as a response body.
	pub fn stream<S>(stream: S) -> Self
	where
		S: Stream<Item = Result<Bytes, BoxError>> + Send + Sync + 'static,
	{
		Body::Stream(Box::pin(stream))
	}

	pub fn kind(&self) -> BodyKind {
		match self {
			Body::Empty => BodyKind::Empty,
			Body::Null => BodyKind::Null,
			Body::Bytes(_) => BodyKind::Bytes,
			Body::Text(_) => BodyKind::Text,
			Body::Stream(_) => BodyKind::Stream,
			Body::Json(_) => BodyKind::Json,
		}
	}
}

impl From<&str> for Body {
	fn from(value: &str) -> Self {
		Body::Text(value.to_owned())
	}
}

impl From<String> for Body {
	fn from(value: String) -> Self {
		Body::Text(value)
	}
}

impl From<Bytes> for Body {
	fn from(value: Bytes) -> Self {
		Body::Bytes(value)
	}
}

impl From<Vec<u8>> for Body {
	fn from(value: Vec<u8>) -> Self {
		Body::Bytes(Bytes::from(value))
	}
}

impl From<Value> for Body {
	fn from(value: Value) -> Self {
		Body::Json(value)
	}
}

/// Text bodies starting with optional whitespace then `<` are served as HTML.
pub(crate) fn looks_like_html(text: &str) -> bool {
	text.trim_start().starts_with('<')
}

/// Shared completion state of one response.
///
/// The flag outlives the [`Context`](crate::Context): a streaming body keeps a
/// handle to it so the response can be marked ended after the context has been
/// finalized and dropped. Observers registered via [`ResponseFlags::on_end`]
/// fire exactly once, whether the response ends through `end`, through
/// finalization, or through the stream completing or being abandoned.
pub struct ResponseFlags {
	ended: AtomicBool,
	observers: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl ResponseFlags {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self {
			ended: AtomicBool::new(false),
			observers: Mutex::new(Vec::new()),
		})
	}

	/// Whether the response has ended on the transport.
	pub fn ended(&self) -> bool {
		self.ended.load(Ordering::Acquire)
	}

	/// Register a one-time completion observer. If the response already
	/// ended, the observer runs immediately.
	///
	/// Observers must not touch the originating context.
	pub fn on_end(&self, observer: impl FnOnce() + Send + 'static) {
		if self.ended() {
			observer();
			return;
		}
		self.observers.lock().push(Box::new(observer));
	}

	pub(crate) fn mark_ended(&self) {
		if self.ended.swap(true, Ordering::AcqRel) {
			return;
		}
		let observers: Vec<_> = self.observers.lock().drain(..).collect();
		for observer in observers {
			observer();
		}
	}
}

/// Wraps a streaming body so completion and failure are observed.
///
/// On exhaustion the shared ended flag flips and observers fire; on error the
/// error is routed into the context's error hook and the stream is terminated
/// (the transport sees a truncated body, which is the only honest signal once
/// headers are on the wire). Dropping the guard before exhaustion, which is
/// what happens when the client disconnects mid-stream, still marks the
/// response ended so backing resources are released.
pub(crate) struct CompletionGuard {
	inner: BodyStream,
	flags: Arc<ResponseFlags>,
	error_hook: ErrorHook,
	done: bool,
}

impl CompletionGuard {
	pub(crate) fn new(inner: BodyStream, flags: Arc<ResponseFlags>, error_hook: ErrorHook) -> Self {
		Self {
			inner,
			flags,
			error_hook,
			done: false,
		}
	}
}

impl Stream for CompletionGuard {
	type Item = Result<Bytes, BoxError>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
		if self.done {
			return Poll::Ready(None);
		}
		match self.inner.as_mut().poll_next(cx) {
			Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(chunk))),
			Poll::Ready(Some(Err(err))) => {
				(self.error_hook)(err);
				self.done = true;
				self.flags.mark_ended();
				Poll::Ready(None)
			}
			Poll::Ready(None) => {
				self.done = true;
				self.flags.mark_ended();
				Poll::Ready(None)
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

impl Drop for CompletionGuard {
	fn drop(&mut self) {
		if !self.done {
			self.flags.mark_ended();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::StreamExt;
	use std::sync::atomic::AtomicUsize;

	fn chunks(parts: Vec<Result<&'static str, &'static str>>) -> BodyStream {
		Box::pin(futures::stream::iter(parts.into_iter().map(|part| {
			part.map(Bytes::from)
				.map_err(|msg| Box::from(msg) as BoxError)
		})))
	}

	#[test]
	fn html_sniffing_tolerates_leading_whitespace() {
		assert!(looks_like_html("<h1>hi</h1>"));
		assert!(looks_like_html("  \n\t<div/>"));
		assert!(!looks_like_html("plain text"));
		assert!(!looks_like_html("  plain < text"));
	}

	#[test]
	fn body_kind_matches_variant() {
		assert_eq!(Body::from("x").kind(), BodyKind::Text);
		assert_eq!(Body::from(Bytes::from_static(b"x")).kind(), BodyKind::Bytes);
		assert_eq!(Body::null().kind(), BodyKind::Null);
		assert_eq!(Body::from(serde_json::json!({"a": 1})).kind(), BodyKind::Json);
	}

	#[tokio::test]
	async fn completion_guard_fires_observer_exactly_once() {
		let flags = ResponseFlags::new();
		let fired = Arc::new(AtomicUsize::new(0));
		let counter = fired.clone();
		flags.on_end(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		let hook: ErrorHook = Arc::new(|_| {});
		let mut guard = CompletionGuard::new(
			chunks(vec![Ok("a"), Ok("b")]),
			flags.clone(),
			hook,
		);
		let mut collected = Vec::new();
		while let Some(item) = guard.next().await {
			collected.push(item.unwrap());
		}
		drop(guard);

		assert_eq!(collected, vec![Bytes::from("a"), Bytes::from("b")]);
		assert!(flags.ended());
		assert_eq!(fired.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn completion_guard_routes_errors_and_truncates() {
		let flags = ResponseFlags::new();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		let hook: ErrorHook = Arc::new(move |err| sink.lock().push(err.to_string()));

		let mut guard = CompletionGuard::new(
			chunks(vec![Ok("a"), Err("backing store gone"), Ok("never")]),
			flags.clone(),
			hook,
		);
		let first = guard.next().await;
		assert_eq!(first.unwrap().unwrap(), Bytes::from("a"));
		assert!(guard.next().await.is_none());

		assert!(flags.ended());
		assert_eq!(seen.lock().as_slice(), ["backing store gone"]);
	}

	#[tokio::test]
	async fn dropping_guard_marks_response_ended() {
		let flags = ResponseFlags::new();
		let hook: ErrorHook = Arc::new(|_| {});
		let guard = CompletionGuard::new(chunks(vec![Ok("pending")]), flags.clone(), hook);
		assert!(!flags.ended());
		drop(guard);
		assert!(flags.ended());
	}
}
