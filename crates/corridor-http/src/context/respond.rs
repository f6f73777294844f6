//! Response intent: status, message, the body slot and its coercion rules,
//! and the terminal operations that bypass the finalizer.

use bytes::Bytes;
use hyper::StatusCode;
use serde::Serialize;

use super::{Context, ContextState};
use crate::body::{Body, CompletionGuard, looks_like_html};
use crate::error::{Error, Result};

pub(crate) const CONTENT_TYPE: &str = "Content-Type";
pub(crate) const CONTENT_LENGTH: &str = "Content-Length";
pub(crate) const TRANSFER_ENCODING: &str = "Transfer-Encoding";

const TYPE_BINARY: &str = "application/octet-stream";
const TYPE_HTML: &str = "text/html";
const TYPE_TEXT: &str = "text/plain";
const TYPE_JSON: &str = "application/json";

impl ContextState {
	/// Translate a body assignment into content headers and a finalization
	/// strategy. First matching rule wins; an explicitly set Content-Type is
	/// never overridden.
	fn coerce_body(&mut self, value: Body) {
		let previous = std::mem::replace(&mut self.body, Body::Empty);

		match value {
			Body::Null => {
				self.status = 204;
				self.remove_header(CONTENT_TYPE);
				self.remove_header(CONTENT_LENGTH);
				self.remove_header(TRANSFER_ENCODING);
				self.body = Body::Null;
			}
			Body::Bytes(bytes) => {
				if !self.has_header(CONTENT_TYPE) {
					self.set_header(CONTENT_TYPE, TYPE_BINARY);
				}
				let length = bytes.len();
				self.set_header(CONTENT_LENGTH, &length.to_string());
				self.body = Body::Bytes(bytes);
			}
			Body::Stream(stream) => {
				// Overwriting a previously assigned body leaves a stale
				// Content-Length behind; a stream's length is unknown.
				if !matches!(previous, Body::Null) {
					self.remove_header(CONTENT_LENGTH);
				}
				if !self.has_header(CONTENT_TYPE) {
					self.set_header(CONTENT_TYPE, TYPE_BINARY);
				}
				let guarded = CompletionGuard::new(
					stream,
					self.flags.clone(),
					self.error_hook.clone(),
				);
				self.body = Body::Stream(Box::pin(guarded));
			}
			Body::Text(text) => {
				if !self.has_header(CONTENT_TYPE) {
					let inferred = if looks_like_html(&text) {
						TYPE_HTML
					} else {
						TYPE_TEXT
					};
					self.set_header(CONTENT_TYPE, inferred);
				}
				let length = text.len();
				self.set_header(CONTENT_LENGTH, &length.to_string());
				self.body = Body::Text(text);
			}
			Body::Json(value) => {
				// Length is computed lazily at finalization from the
				// serialized form.
				self.remove_header(CONTENT_LENGTH);
				if !self.has_header(CONTENT_TYPE) {
					self.set_header(CONTENT_TYPE, TYPE_JSON);
				}
				self.body = Body::Json(value);
			}
			Body::Empty => {
				self.body = Body::Empty;
			}
		}
	}
}

impl Context {
	/// Response status code.
	pub fn status(&self) -> u16 {
		self.lock().status
	}

	/// Set the response status. Writes outside `100..=999` fail fast and
	/// leave the previous status unchanged.
	///
	/// # Examples
	///
	/// ```
	/// use corridor_http::Context;
	/// use hyper::{HeaderMap, Method, Uri};
	/// use bytes::Bytes;
	///
	/// let ctx = Context::new(Method::GET, Uri::from_static("/"), HeaderMap::new(), Bytes::new());
	/// ctx.set_status(201).unwrap();
	/// assert_eq!(ctx.status(), 201);
	/// assert!(ctx.set_status(1000).is_err());
	/// assert_eq!(ctx.status(), 201);
	/// ```
	pub fn set_status(&self, code: u16) -> Result<()> {
		if !(100..=999).contains(&code) {
			return Err(Error::InvalidStatus(code));
		}
		self.lock().status = code;
		Ok(())
	}

	/// Status reason text. Falls back to the canonical reason phrase when no
	/// custom message was set.
	pub fn message(&self) -> String {
		let state = self.lock();
		if let Some(message) = &state.message {
			return message.clone();
		}
		StatusCode::from_u16(state.status)
			.ok()
			.and_then(|status| status.canonical_reason())
			.unwrap_or("")
			.to_owned()
	}

	pub fn set_message(&self, message: impl Into<String>) {
		self.lock().message = Some(message.into());
	}

	/// Assign the response body, running the coercion rules.
	pub fn set_body(&self, body: impl Into<Body>) {
		self.lock().coerce_body(body.into());
	}

	/// Discriminant of the current body slot.
	pub fn body_kind(&self) -> crate::body::BodyKind {
		self.lock().body.kind()
	}

	/// Media-type portion of the Content-Type header, without parameters.
	pub fn content_type(&self) -> String {
		let content_type = self.get(CONTENT_TYPE);
		if content_type.is_empty() {
			return String::new();
		}
		content_type
			.split(';')
			.next()
			.unwrap_or("")
			.to_owned()
	}

	/// Set or, when given an empty string, remove the Content-Type header.
	pub fn set_content_type(&self, content_type: &str) {
		if content_type.is_empty() {
			self.remove(CONTENT_TYPE);
		} else {
			self.set(CONTENT_TYPE, content_type);
		}
	}

	/// Resolved response length.
	///
	/// An existing Content-Length header wins (unparseable values read as
	/// zero); otherwise the length is computed from the pending body, and is
	/// unknown for empty and streaming bodies.
	pub fn length(&self) -> Option<u64> {
		let state = self.lock();
		if state.has_header(CONTENT_LENGTH) {
			return Some(state.get_header(CONTENT_LENGTH).parse().unwrap_or(0));
		}
		match &state.body {
			Body::Empty | Body::Null | Body::Stream(_) => None,
			Body::Bytes(bytes) => Some(bytes.len() as u64),
			Body::Text(text) => Some(text.len() as u64),
			Body::Json(value) => serde_json::to_vec(value)
				.ok()
				.map(|serialized| serialized.len() as u64),
		}
	}

	/// Write the Content-Length header.
	pub fn set_length(&self, length: u64) {
		self.set(CONTENT_LENGTH, length);
	}

	/// Terminate the transport response immediately with the given payload,
	/// bypassing the finalizer.
	pub fn end(&self, payload: impl Into<Bytes>) {
		let flags = {
			let mut state = self.lock();
			if state.flags.ended() {
				return;
			}
			state.ended_payload = Some(payload.into());
			state.headers_sent = true;
			state.flags.clone()
		};
		flags.mark_ended();
	}

	/// Alias of [`end`](Context::end).
	pub fn send(&self, payload: impl Into<Bytes>) {
		self.end(payload);
	}

	/// Terminate the response with a JSON-serialized payload. Sets no
	/// headers; status and type are the caller's business.
	pub fn json<T>(&self, value: &T) -> Result<()>
	where
		T: Serialize + ?Sized,
	{
		let serialized = serde_json::to_vec(value)?;
		self.end(serialized);
		Ok(())
	}

	/// Redirect to `location` with status 302 and a plain-text notice.
	///
	/// `"back"` substitutes the request's Referrer header, then `alt`, then
	/// `/`.
	pub fn redirect(&self, location: &str, alt: Option<&str>) {
		let target = if location == "back" {
			let referrer = {
				let via_referer = self.req_header("referer");
				if via_referer.is_empty() {
					self.req_header("referrer")
				} else {
					via_referer
				}
			};
			if referrer.is_empty() {
				alt.unwrap_or("/").to_owned()
			} else {
				referrer
			}
		} else {
			location.to_owned()
		};

		self.set("Location", &target);
		self.lock().status = 302;
		self.set_content_type("text/plain; charset=utf-8");
		self.set_body(format!("Redirecting to {target}."));
	}

	/// True until the transport response has ended.
	pub fn writable(&self) -> bool {
		!self.lock().flags.ended()
	}
}
