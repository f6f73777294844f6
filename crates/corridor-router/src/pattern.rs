//! Compiled path patterns.
//!
//! A pattern is a literal path with optional `{name}` capture segments and
//! `(.*)` wildcards, compiled once at registration. Matching yields the
//! positional captures; named parameters are produced by merging captures
//! into an existing parameter map, so nested routers layer their bindings
//! instead of clobbering each other.

use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
	#[error("invalid path pattern `{pattern}`: {reason}")]
	Invalid { pattern: String, reason: String },
}

/// A path pattern compiled to an anchored regex.
#[derive(Debug, Clone)]
pub struct PathPattern {
	raw: String,
	regex: Regex,
	names: Vec<Option<String>>,
}

impl PathPattern {
	/// Compile a pattern.
	///
	/// # Examples
	///
	/// ```
	/// use corridor_router::PathPattern;
	///
	/// let pattern = PathPattern::new("/users/{id}/posts/{post}").unwrap();
	/// assert!(pattern.is_match("/users/7/posts/42"));
	/// assert_eq!(pattern.captures("/users/7/posts/42"), vec!["7", "42"]);
	/// ```
	pub fn new(pattern: &str) -> Result<Self, PatternError> {
		let (source, names) = compile(pattern)?;
		let regex = Regex::new(&source).map_err(|err| PatternError::Invalid {
			pattern: pattern.to_owned(),
			reason: err.to_string(),
		})?;
		Ok(Self {
			raw: pattern.to_owned(),
			regex,
			names,
		})
	}

	/// The pattern as registered.
	pub fn raw(&self) -> &str {
		&self.raw
	}

	pub fn is_match(&self, path: &str) -> bool {
		self.regex.is_match(path)
	}

	/// Positional capture values for a path; empty when the path does not
	/// match.
	pub fn captures(&self, path: &str) -> Vec<String> {
		let Some(captures) = self.regex.captures(path) else {
			return Vec::new();
		};
		captures
			.iter()
			.skip(1)
			.map(|group| group.map(|m| m.as_str().to_owned()).unwrap_or_default())
			.collect()
	}

	/// Merge positional captures into named parameters, layered over an
	/// existing map.
	pub fn params(
		&self,
		captures: &[String],
		existing: &HashMap<String, String>,
	) -> HashMap<String, String> {
		let mut params = existing.clone();
		for (name, value) in self.names.iter().zip(captures) {
			if let Some(name) = name {
				params.insert(name.clone(), value.clone());
			}
		}
		params
	}
}

fn compile(pattern: &str) -> Result<(String, Vec<Option<String>>), PatternError> {
	let mut source = String::from("^");
	let mut names = Vec::new();
	let mut rest = pattern;

	while !rest.is_empty() {
		if let Some(after) = rest.strip_prefix("(.*)") {
			source.push_str("(.*)");
			names.push(None);
			rest = after;
		} else if let Some(after) = rest.strip_prefix('{') {
			let Some(end) = after.find('}') else {
				return Err(PatternError::Invalid {
					pattern: pattern.to_owned(),
					reason: "unclosed `{` capture segment".to_owned(),
				});
			};
			let name = &after[..end];
			if name.is_empty() {
				return Err(PatternError::Invalid {
					pattern: pattern.to_owned(),
					reason: "empty capture name".to_owned(),
				});
			}
			source.push_str("([^/]+)");
			names.push(Some(name.to_owned()));
			rest = &after[end + 1..];
		} else {
			let mut chars = rest.chars();
			let Some(ch) = chars.next() else { break };
			source.push_str(&regex::escape(&ch.to_string()));
			rest = chars.as_str();
		}
	}

	// Tolerate a trailing slash on the request path.
	if !source.ends_with('/') {
		source.push_str("/?");
	}
	source.push('$');
	Ok((source, names))
}
