//! Finalization: converting the context's body slot into the payload that is
//! actually written to the transport.

use bytes::Bytes;
use hyper::{HeaderMap, StatusCode};

use crate::body::{Body, BodyStream};
use crate::context::Context;
use crate::context::respond::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use crate::error::{Error, Result};

/// What finalization leaves for the transport to write.
pub enum ResponsePayload {
	/// Status and headers only.
	None,
	/// A fully buffered payload.
	Full(Bytes),
	/// A streaming payload, piped rather than buffered.
	Stream(BodyStream),
}

impl ResponsePayload {
	pub fn is_stream(&self) -> bool {
		matches!(self, ResponsePayload::Stream(_))
	}
}

/// The finalized response handed to the transport layer.
pub struct OutgoingResponse {
	pub status: StatusCode,
	pub message: Option<String>,
	pub headers: HeaderMap,
	pub payload: ResponsePayload,
}

impl Context {
	/// Finalize the response from whatever the chain left behind.
	///
	/// Runs exactly once per request, after the handler chain completes. A
	/// response already ended through [`end`](Context::end) keeps its stored
	/// payload untouched; a context flagged non-responding yields status and
	/// headers as-is with no payload.
	pub fn finalize(&self) -> Result<OutgoingResponse> {
		let (response, flags, stream_pending) = {
			let mut state = self.lock();
			let status = StatusCode::from_u16(state.status)
				.map_err(|_| Error::InvalidStatus(state.status))?;

			let mut stream_pending = false;
			let payload = if !state.respond {
				ResponsePayload::None
			} else if state.flags.ended() {
				ResponsePayload::Full(state.ended_payload.take().unwrap_or_default())
			} else if matches!(status.as_u16(), 204 | 205 | 304) {
				state.body = Body::Null;
				state.remove_header(CONTENT_TYPE);
				state.remove_header(CONTENT_LENGTH);
				state.remove_header(TRANSFER_ENCODING);
				ResponsePayload::None
			} else if state.method == hyper::Method::HEAD {
				if !state.has_header(CONTENT_LENGTH) {
					let pending = match &state.body {
						Body::Bytes(bytes) => Some(bytes.len()),
						Body::Text(text) => Some(text.len()),
						Body::Json(value) => {
							serde_json::to_vec(value).ok().map(|b| b.len())
						}
						Body::Empty | Body::Null | Body::Stream(_) => None,
					};
					if let Some(length) = pending {
						state.set_header(CONTENT_LENGTH, &length.to_string());
					}
				}
				ResponsePayload::None
			} else {
				match std::mem::replace(&mut state.body, Body::Empty) {
					Body::Stream(stream) => {
						stream_pending = true;
						ResponsePayload::Stream(stream)
					}
					Body::Empty | Body::Null => {
						state.remove_header(CONTENT_TYPE);
						state.remove_header(TRANSFER_ENCODING);
						ResponsePayload::None
					}
					Body::Bytes(bytes) => ResponsePayload::Full(bytes),
					Body::Text(text) => ResponsePayload::Full(Bytes::from(text)),
					Body::Json(value) => {
						let serialized = serde_json::to_vec(&value)?;
						if !state.headers_sent {
							let length = serialized.len();
							state.set_header(CONTENT_LENGTH, &length.to_string());
						}
						ResponsePayload::Full(Bytes::from(serialized))
					}
				}
			};

			state.headers_sent = true;
			let response = OutgoingResponse {
				status,
				message: state.message.clone(),
				headers: state.headers.clone(),
				payload,
			};
			(response, state.flags.clone(), stream_pending)
		};

		// A streaming payload ends when the stream completes; everything
		// else ends now.
		if !stream_pending {
			flags.mark_ended();
		}
		Ok(response)
	}
}
