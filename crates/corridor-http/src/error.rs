use thiserror::Error;

/// Errors surfaced by the context adapter and the handler chain.
///
/// Validation errors (`InvalidStatus`) are returned at the point of the
/// invalid mutation so a handler aborts with `?`. Everything else funnels
/// into the error boundary at the outer edge of the dispatch chain.
#[derive(Debug, Error)]
pub enum Error {
	/// Status code writes outside the valid range are rejected and leave
	/// the previous status untouched.
	#[error("invalid status code: {0}, must be a number & in range 100 ~ 999")]
	InvalidStatus(u16),

	/// Structured-body serialization failed.
	#[error("json serialization failed: {0}")]
	Json(#[from] serde_json::Error),

	/// Application-level failure raised by a handler.
	#[error("{0}")]
	Handler(String),

	/// Any other failure bubbling out of a handler.
	#[error(transparent)]
	Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
	/// Create a handler error from a message.
	///
	/// # Examples
	///
	/// ```
	/// use corridor_http::Error;
	///
	/// let err = Error::handler("payment declined");
	/// assert_eq!(err.to_string(), "payment declined");
	/// ```
	pub fn handler(message: impl Into<String>) -> Self {
		Error::Handler(message.into())
	}

	/// Stable name of the error variant, used by the error boundary when
	/// shaping the structured 500 payload.
	pub fn name(&self) -> &'static str {
		match self {
			Error::InvalidStatus(_) => "InvalidStatus",
			Error::Json(_) => "SerializationError",
			Error::Handler(_) => "HandlerError",
			Error::Other(_) => "Error",
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
