//! Route definitions: a path pattern plus its method-scoped handler stack.

use corridor_http::{MatchedRoute, Middleware};
use hyper::Method;
use std::collections::HashMap;
use std::sync::Arc;

use crate::pattern::{PathPattern, PatternError};

/// One handler in a route's stack, optionally scoped to an HTTP method.
/// Untagged entries apply to all methods.
#[derive(Clone)]
pub struct RouteEntry {
	pub method: Option<Method>,
	pub handler: Arc<dyn Middleware>,
}

/// A registered route: a stable path pattern, an optional name, and an
/// ordered handler stack.
#[derive(Clone)]
pub struct Route {
	path: String,
	name: Option<String>,
	pattern: PathPattern,
	stack: Vec<RouteEntry>,
}

impl Route {
	pub fn new(path: &str) -> Result<Self, PatternError> {
		Ok(Self {
			path: path.to_owned(),
			name: None,
			pattern: PathPattern::new(path)?,
			stack: Vec::new(),
		})
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub(crate) fn set_name(&mut self, name: impl Into<String>) {
		self.name = Some(name.into());
	}

	pub(crate) fn push(&mut self, method: Option<Method>, handler: Arc<dyn Middleware>) {
		self.stack.push(RouteEntry { method, handler });
	}

	pub fn is_match(&self, path: &str) -> bool {
		self.pattern.is_match(path)
	}

	/// Positional matches of a path against this route's pattern.
	pub fn captures(&self, path: &str) -> Vec<String> {
		self.pattern.captures(path)
	}

	/// Merge captures into named parameters, layered over bindings from
	/// enclosing routers.
	pub fn params(
		&self,
		captures: &[String],
		existing: &HashMap<String, String>,
	) -> HashMap<String, String> {
		self.pattern.params(captures, existing)
	}

	pub fn stack(&self) -> &[RouteEntry] {
		&self.stack
	}

	/// The handlers applicable to a request method: untagged entries plus
	/// those tagged with the method, in registration order.
	pub fn stack_for(&self, method: &Method) -> Vec<Arc<dyn Middleware>> {
		self.stack
			.iter()
			.filter(|entry| match &entry.method {
				Some(tagged) => tagged == method,
				None => true,
			})
			.map(|entry| entry.handler.clone())
			.collect()
	}

	pub fn summary(&self) -> MatchedRoute {
		MatchedRoute {
			path: self.path.clone(),
			name: self.name.clone(),
		}
	}
}
