//! The per-request context.
//!
//! A [`Context`] adapts one incoming request / outgoing response pair into a
//! uniform, mutation-tracked surface: request metadata on the read side,
//! status, headers and the body slot on the write side, plus the routing
//! state accumulated during dispatch. The handle is cheap to clone; all
//! clones observe the same underlying record. The chain runs links
//! sequentially, so interior locking is uncontended and is never held across
//! an await point.

mod headers;
pub(crate) mod respond;

use bytes::Bytes;
use hyper::{HeaderMap, Method, Uri};
use parking_lot::{Mutex, MutexGuard};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::body::{Body, ErrorHook, ResponseFlags};

/// Summary of a route that matched during dispatch, kept for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
	pub path: String,
	pub name: Option<String>,
}

pub(crate) struct ContextState {
	// request side
	pub(crate) method: Method,
	pub(crate) uri: Uri,
	pub(crate) req_headers: HeaderMap,
	pub(crate) query: HashMap<String, String>,
	pub(crate) data: Option<Value>,

	// response side
	pub(crate) status: u16,
	pub(crate) message: Option<String>,
	pub(crate) headers: HeaderMap,
	pub(crate) body: Body,
	pub(crate) headers_sent: bool,
	pub(crate) respond: bool,
	pub(crate) ended_payload: Option<Bytes>,
	pub(crate) flags: Arc<ResponseFlags>,
	pub(crate) error_hook: ErrorHook,

	// routing state
	pub(crate) router_path: Option<String>,
	pub(crate) matched: Vec<MatchedRoute>,
	pub(crate) matched_route: Option<String>,
	pub(crate) matched_route_name: Option<String>,
	pub(crate) router_name: Option<String>,
	pub(crate) params: HashMap<String, String>,
	pub(crate) captures: Vec<String>,
}

/// Cheaply cloneable handle to the per-request record.
#[derive(Clone)]
pub struct Context {
	state: Arc<Mutex<ContextState>>,
}

impl Context {
	/// Decorate a transport request into a context.
	///
	/// The query string is parsed eagerly; for mutation methods the payload
	/// is parsed as JSON, falling back to raw text when it does not parse.
	///
	/// # Examples
	///
	/// ```
	/// use corridor_http::Context;
	/// use hyper::{HeaderMap, Method, Uri};
	/// use bytes::Bytes;
	///
	/// let ctx = Context::new(
	///     Method::GET,
	///     Uri::from_static("/users?page=2"),
	///     HeaderMap::new(),
	///     Bytes::new(),
	/// );
	/// assert_eq!(ctx.path(), "/users");
	/// assert_eq!(ctx.query().get("page"), Some(&"2".to_string()));
	/// ```
	pub fn new(method: Method, uri: Uri, req_headers: HeaderMap, payload: Bytes) -> Self {
		let query = parse_query(&uri);
		let data = parse_payload(&method, &payload);
		let state = ContextState {
			method,
			uri,
			req_headers,
			query,
			data,
			status: 200,
			message: None,
			headers: HeaderMap::new(),
			body: Body::Empty,
			headers_sent: false,
			respond: true,
			ended_payload: None,
			flags: ResponseFlags::new(),
			error_hook: Arc::new(|err| {
				tracing::error!(error = %err, "response body stream error");
			}),
			router_path: None,
			matched: Vec::new(),
			matched_route: None,
			matched_route_name: None,
			router_name: None,
			params: HashMap::new(),
			captures: Vec::new(),
		};
		Self {
			state: Arc::new(Mutex::new(state)),
		}
	}

	pub(crate) fn lock(&self) -> MutexGuard<'_, ContextState> {
		self.state.lock()
	}

	/// HTTP method of the request.
	pub fn method(&self) -> Method {
		self.lock().method.clone()
	}

	/// The raw request target as received from the transport.
	pub fn url(&self) -> String {
		self.lock().uri.to_string()
	}

	/// Path portion of the request target.
	pub fn path(&self) -> String {
		self.lock().uri.path().to_owned()
	}

	/// Decoded query-string mapping.
	pub fn query(&self) -> HashMap<String, String> {
		self.lock().query.clone()
	}

	/// Parsed request payload for mutation methods.
	///
	/// JSON payloads parse to a structured value; anything that fails to
	/// parse is passed through as raw text rather than failing the request.
	pub fn data(&self) -> Option<Value> {
		self.lock().data.clone()
	}

	/// Request header lookup, case-insensitive; empty string when absent.
	pub fn req_header(&self, field: &str) -> String {
		let state = self.lock();
		state
			.req_headers
			.get(field.to_ascii_lowercase())
			.and_then(|value| value.to_str().ok())
			.unwrap_or("")
			.to_owned()
	}

	/// Whether the finalizer should produce the response. Handlers that end
	/// the transport themselves can opt out.
	pub fn respond(&self) -> bool {
		self.lock().respond
	}

	pub fn set_respond(&self, respond: bool) {
		self.lock().respond = respond;
	}

	/// Completion state shared with any streaming body.
	pub fn response_flags(&self) -> Arc<ResponseFlags> {
		self.lock().flags.clone()
	}

	/// Replace the hook that receives streaming-body errors.
	pub fn set_error_hook(&self, hook: ErrorHook) {
		self.lock().error_hook = hook;
	}

	// --- routing state, maintained by the dispatch pipeline ---

	/// Routes matched so far, ancestors first, accumulated across nested
	/// routers.
	pub fn matched(&self) -> Vec<MatchedRoute> {
		self.lock().matched.clone()
	}

	pub fn push_matched(&self, routes: impl IntoIterator<Item = MatchedRoute>) {
		self.lock().matched.extend(routes);
	}

	/// Pattern of the most specific matched route.
	pub fn matched_route(&self) -> Option<String> {
		self.lock().matched_route.clone()
	}

	pub fn set_matched_route(&self, path: impl Into<String>) {
		self.lock().matched_route = Some(path.into());
	}

	pub fn matched_route_name(&self) -> Option<String> {
		self.lock().matched_route_name.clone()
	}

	pub fn set_matched_route_name(&self, name: impl Into<String>) {
		self.lock().matched_route_name = Some(name.into());
	}

	/// Name of the route whose handler stack is currently executing.
	pub fn router_name(&self) -> Option<String> {
		self.lock().router_name.clone()
	}

	pub fn set_router_name(&self, name: Option<String>) {
		self.lock().router_name = name;
	}

	/// Context-level override of the path used for route matching.
	pub fn router_path(&self) -> Option<String> {
		self.lock().router_path.clone()
	}

	pub fn set_router_path(&self, path: impl Into<String>) {
		self.lock().router_path = Some(path.into());
	}

	/// Named path captures bound by the most specific matched route.
	pub fn params(&self) -> HashMap<String, String> {
		self.lock().params.clone()
	}

	pub fn set_params(&self, params: HashMap<String, String>) {
		self.lock().params = params;
	}

	/// Positional captures from the most recent route binding.
	pub fn captures(&self) -> Vec<String> {
		self.lock().captures.clone()
	}

	pub fn set_captures(&self, captures: Vec<String>) {
		self.lock().captures = captures;
	}
}

fn parse_query(uri: &Uri) -> HashMap<String, String> {
	uri.query()
		.map(|q| {
			q.split('&')
				.filter(|pair| !pair.is_empty())
				.filter_map(|pair| {
					// Split on first '=' only to preserve '=' in values
					let mut parts = pair.splitn(2, '=');
					let key = parts.next()?;
					let value = parts.next().unwrap_or("");
					Some((
						percent_decode_str(key).decode_utf8_lossy().to_string(),
						percent_decode_str(value).decode_utf8_lossy().to_string(),
					))
				})
				.collect()
		})
		.unwrap_or_default()
}

fn parse_payload(method: &Method, payload: &Bytes) -> Option<Value> {
	let mutation = matches!(
		*method,
		Method::POST | Method::PUT | Method::PATCH | Method::DELETE
	);
	if !mutation || payload.is_empty() {
		return None;
	}
	match serde_json::from_slice(payload) {
		Ok(value) => Some(value),
		Err(_) => Some(Value::String(
			String::from_utf8_lossy(payload).to_string(),
		)),
	}
}
