//! End-to-end tests over a real socket: the accept loop, the request
//! adapter, and streaming response bodies.

use bytes::Bytes;
use corridor_http::{Body, BoxError, Context, Error, handler_fn};
use corridor_router::Router;
use corridor_server::HttpServer;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

fn test_router() -> Router {
	let mut router = Router::new();
	router
		.get("/", handler_fn(|ctx: Context| async move {
			ctx.set_body("Hello World!");
			Ok(())
		}))
		.unwrap();
	router
		.post("/echo", handler_fn(|ctx: Context| async move {
			ctx.set_body(json!({"query": ctx.query(), "body": ctx.data()}));
			Ok(())
		}))
		.unwrap();
	router
		.get("/stream", handler_fn(|ctx: Context| async move {
			let chunks = futures::stream::iter([
				Ok::<_, BoxError>(Bytes::from_static(b"alpha-")),
				Ok(Bytes::from_static(b"beta-")),
				Ok(Bytes::from_static(b"gamma")),
			]);
			ctx.set_body(Body::stream(chunks));
			Ok(())
		}))
		.unwrap();
	router
		.get("/boom", handler_fn(|_ctx: Context| async move {
			Err(Error::handler("kaboom"))
		}))
		.unwrap();
	router
}

async fn spawn_server() -> SocketAddr {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
		.await
		.expect("bind ephemeral port");
	let addr = listener.local_addr().expect("local addr");
	let server =
		HttpServer::new(Arc::new(test_router().routes())).with_expose_stack_traces(false);
	tokio::spawn(async move {
		let _ = server.serve(listener).await;
	});
	addr
}

#[tokio::test]
async fn serves_text_bodies_with_inferred_type() {
	let addr = spawn_server().await;
	let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
	assert_eq!(response.status(), 200);
	assert_eq!(
		response.headers()["content-type"].to_str().unwrap(),
		"text/plain"
	);
	assert_eq!(response.text().await.unwrap(), "Hello World!");
}

#[tokio::test]
async fn adapts_payload_and_query_through_the_context() {
	let addr = spawn_server().await;
	let client = reqwest::Client::new();
	let response = client
		.post(format!("http://{addr}/echo?a=1"))
		.json(&json!({"z": 999}))
		.send()
		.await
		.unwrap();
	assert_eq!(response.status(), 200);
	let body: serde_json::Value = response.json().await.unwrap();
	assert_eq!(body["query"]["a"], "1");
	assert_eq!(body["body"]["z"], 999);
}

#[tokio::test]
async fn pipes_stream_bodies_byte_identical() {
	let addr = spawn_server().await;
	let response = reqwest::get(format!("http://{addr}/stream")).await.unwrap();
	assert_eq!(response.status(), 200);
	let bytes = response.bytes().await.unwrap();
	assert_eq!(bytes, Bytes::from_static(b"alpha-beta-gamma"));
}

#[tokio::test]
async fn unknown_paths_return_the_structured_404() {
	let addr = spawn_server().await;
	let response = reqwest::get(format!("http://{addr}/missing")).await.unwrap();
	assert_eq!(response.status(), 404);
	let body: serde_json::Value = response.json().await.unwrap();
	assert_eq!(body["message"], "Not Found");
}

#[tokio::test]
async fn handler_errors_surface_as_500_json() {
	let addr = spawn_server().await;
	let response = reqwest::get(format!("http://{addr}/boom")).await.unwrap();
	assert_eq!(response.status(), 500);
	let body: serde_json::Value = response.json().await.unwrap();
	assert_eq!(body["error"]["name"], "HandlerError");
	assert_eq!(body["error"]["message"], "kaboom");
}
