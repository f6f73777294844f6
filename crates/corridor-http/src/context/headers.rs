//! Header facade over the outgoing response.
//!
//! All mutating operations are idempotently safe after the response has
//! started streaming: once headers are sent they become silent no-ops, so
//! defensive writes from the error boundary or the finalizer never fail.

use hyper::HeaderMap;
use hyper::header::{HeaderName, HeaderValue};

use super::{Context, ContextState};

impl ContextState {
	pub(crate) fn has_header(&self, field: &str) -> bool {
		HeaderName::from_bytes(field.as_bytes())
			.map(|name| self.headers.contains_key(&name))
			.unwrap_or(false)
	}

	pub(crate) fn get_header(&self, field: &str) -> String {
		let Ok(name) = HeaderName::from_bytes(field.as_bytes()) else {
			return String::new();
		};
		let values: Vec<&str> = self
			.headers
			.get_all(&name)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.collect();
		values.join(", ")
	}

	pub(crate) fn set_header(&mut self, field: &str, value: &str) {
		if self.headers_sent {
			return;
		}
		let Ok(name) = HeaderName::from_bytes(field.as_bytes()) else {
			tracing::warn!(field, "ignoring invalid header name");
			return;
		};
		let Ok(value) = HeaderValue::from_str(value) else {
			tracing::warn!(field, "ignoring invalid header value");
			return;
		};
		self.headers.insert(name, value);
	}

	pub(crate) fn append_header(&mut self, field: &str, value: &str) {
		if self.headers_sent {
			return;
		}
		let Ok(name) = HeaderName::from_bytes(field.as_bytes()) else {
			tracing::warn!(field, "ignoring invalid header name");
			return;
		};
		let Ok(value) = HeaderValue::from_str(value) else {
			tracing::warn!(field, "ignoring invalid header value");
			return;
		};
		self.headers.append(name, value);
	}

	pub(crate) fn remove_header(&mut self, field: &str) {
		if self.headers_sent {
			return;
		}
		if let Ok(name) = HeaderName::from_bytes(field.as_bytes()) {
			self.headers.remove(&name);
		}
	}
}

impl Context {
	/// Set one outgoing header. Non-string values are stringified.
	///
	/// No-op once headers have been sent.
	///
	/// # Examples
	///
	/// ```
	/// use corridor_http::Context;
	/// use hyper::{HeaderMap, Method, Uri};
	/// use bytes::Bytes;
	///
	/// let ctx = Context::new(Method::GET, Uri::from_static("/"), HeaderMap::new(), Bytes::new());
	/// ctx.set("X-Request-Id", 42);
	/// assert_eq!(ctx.get("x-request-id"), "42");
	/// ```
	pub fn set(&self, field: &str, value: impl ToString) {
		self.lock().set_header(field, &value.to_string());
	}

	/// Set a mapping of headers, iterating entries through the single-field
	/// form.
	pub fn set_all<K, V>(&self, fields: impl IntoIterator<Item = (K, V)>)
	where
		K: AsRef<str>,
		V: ToString,
	{
		let mut state = self.lock();
		for (field, value) in fields {
			state.set_header(field.as_ref(), &value.to_string());
		}
	}

	/// Set a header to a list of values, stringified element-wise.
	pub fn set_list(&self, field: &str, values: &[impl ToString]) {
		let mut state = self.lock();
		if state.headers_sent {
			return;
		}
		state.remove_header(field);
		for value in values {
			state.append_header(field, &value.to_string());
		}
	}

	/// Case-insensitive lookup of an outgoing header; empty string when
	/// absent. Multi-valued headers are joined with `", "`.
	pub fn get(&self, field: &str) -> String {
		self.lock().get_header(field)
	}

	/// The full outgoing header mapping.
	pub fn header_map(&self) -> HeaderMap {
		self.lock().headers.clone()
	}

	/// Case-insensitive presence check.
	pub fn has(&self, field: &str) -> bool {
		self.lock().has_header(field)
	}

	/// Delete an outgoing header. No-op once headers have been sent.
	pub fn remove(&self, field: &str) {
		self.lock().remove_header(field);
	}

	/// Whether response headers have been flushed to the transport.
	pub fn headers_sent(&self) -> bool {
		self.lock().headers_sent
	}
}
