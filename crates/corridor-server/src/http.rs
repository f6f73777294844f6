//! HTTP/1 transport: accept loop and the request/response adapters.

use bytes::Bytes;
use corridor_http::{BoxError, Context, Middleware, OutgoingResponse, ResponsePayload};
use corridor_router::{ErrorBoundary, invoke};
use futures::StreamExt;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// Body type written back to hyper: fully buffered or piped from the
/// context's streaming body.
pub type ResponseBody = BoxBody<Bytes, BoxError>;

/// HTTP server driving an application through the generic invocation
/// contract. The application is any [`Middleware`]; a router's
/// [`RoutesHandler`](corridor_router::RoutesHandler) plugs in directly.
pub struct HttpServer {
	app: Arc<dyn Middleware>,
	expose_stack_traces: bool,
}

impl HttpServer {
	pub fn new(app: Arc<dyn Middleware>) -> Self {
		Self {
			app,
			expose_stack_traces: cfg!(debug_assertions),
		}
	}

	/// Control backtrace exposure in error-boundary payloads.
	pub fn with_expose_stack_traces(mut self, expose: bool) -> Self {
		self.expose_stack_traces = expose;
		self
	}

	/// Bind and serve until an accept error occurs.
	pub async fn listen(self, addr: SocketAddr) -> Result<(), BoxError> {
		let listener = TcpListener::bind(addr).await?;
		self.serve(listener).await
	}

	/// Serve connections from an existing listener.
	pub async fn serve(self, listener: TcpListener) -> Result<(), BoxError> {
		let addr = listener.local_addr()?;
		tracing::info!(%addr, "server listening");

		loop {
			let (stream, remote) = listener.accept().await?;
			let app = self.app.clone();
			let expose = self.expose_stack_traces;

			tokio::task::spawn(async move {
				if let Err(err) = handle_connection(stream, remote, app, expose).await {
					tracing::warn!(%remote, error = %err, "connection error");
				}
			});
		}
	}
}

async fn handle_connection(
	stream: TcpStream,
	remote: SocketAddr,
	app: Arc<dyn Middleware>,
	expose_stack_traces: bool,
) -> Result<(), BoxError> {
	tracing::debug!(%remote, "connection accepted");
	let io = TokioIo::new(stream);
	let service = service_fn(move |request| {
		let app = app.clone();
		async move {
			Ok::<_, std::convert::Infallible>(delegate_http(&*app, request, expose_stack_traces).await)
		}
	});
	http1::Builder::new().serve_connection(io, service).await?;
	Ok(())
}

/// Adapt one transport request/response pair into the application's generic
/// invocation contract: decorate a context, run the app behind the error
/// boundary, and convert the finalized response back to hyper.
pub async fn delegate_http(
	app: &dyn Middleware,
	request: Request<Incoming>,
	expose_stack_traces: bool,
) -> Response<ResponseBody> {
	let (parts, body) = request.into_parts();
	let payload = match body.collect().await {
		Ok(collected) => collected.to_bytes(),
		Err(err) => {
			tracing::warn!(error = %err, "failed reading request payload");
			return status_only(StatusCode::BAD_REQUEST);
		}
	};

	let ctx = Context::new(parts.method, parts.uri, parts.headers, payload);
	let boundary = ErrorBoundary::new(expose_stack_traces);
	into_hyper_response(invoke(app, ctx, &boundary).await)
}

/// Convert a finalized response into a hyper response, piping streaming
/// payloads frame by frame.
pub fn into_hyper_response(outgoing: OutgoingResponse) -> Response<ResponseBody> {
	let body: ResponseBody = match outgoing.payload {
		ResponsePayload::None => empty_body(),
		ResponsePayload::Full(bytes) => Full::new(bytes).map_err(|never| match never {}).boxed(),
		ResponsePayload::Stream(stream) => {
			BodyExt::boxed(StreamBody::new(stream.map(|chunk| chunk.map(Frame::data))))
		}
	};

	let mut response = Response::new(body);
	*response.status_mut() = outgoing.status;
	*response.headers_mut() = outgoing.headers;
	response
}

fn empty_body() -> ResponseBody {
	Full::new(Bytes::new()).map_err(|never| match never {}).boxed()
}

fn status_only(status: StatusCode) -> Response<ResponseBody> {
	let mut response = Response::new(empty_body());
	*response.status_mut() = status;
	response
}
