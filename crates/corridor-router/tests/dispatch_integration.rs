//! Integration tests for the dispatch pipeline: matching, chain execution,
//! the not-found fallback, the error boundary, and finalization.

use bytes::Bytes;
use corridor_http::{Body, BoxError, Context, Error, handler_fn, middleware_fn};
use corridor_router::Router;
use corridor_test::TestRequest;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================
// Basic routing
// ============================================================

#[tokio::test]
async fn hello_world_roundtrip() {
	let mut router = Router::new();
	router
		.get("/", handler_fn(|ctx: Context| async move {
			ctx.set_status(200)?;
			ctx.set_body("Hello World!");
			Ok(())
		}))
		.unwrap();

	let response = TestRequest::get("/").dispatch(&router.routes()).await;
	assert_eq!(response.status, 200);
	assert_eq!(response.header("content-type"), Some("text/plain"));
	assert_eq!(response.text(), "Hello World!");
}

#[tokio::test]
async fn unregistered_paths_get_a_structured_404() {
	let mut router = Router::new();
	router
		.get("/", handler_fn(|ctx: Context| async move {
			ctx.set_body("Hello World!");
			Ok(())
		}))
		.unwrap();

	let response = TestRequest::get("/ololo").dispatch(&router.routes()).await;
	assert_eq!(response.status, 404);
	let body = response.json().unwrap();
	assert_eq!(body, json!({"status": 404, "message": "Not Found"}));
}

#[tokio::test]
async fn method_scoped_handlers_do_not_answer_other_methods() {
	let mut router = Router::new();
	router
		.get("/things", handler_fn(|ctx: Context| async move {
			ctx.set_body("listed");
			Ok(())
		}))
		.unwrap();

	let ok = TestRequest::get("/things").dispatch(&router.routes()).await;
	assert_eq!(ok.status, 200);

	let wrong_method = TestRequest::post("/things").dispatch(&router.routes()).await;
	assert_eq!(wrong_method.status, 404);
}

#[tokio::test]
async fn process_registers_for_every_method() {
	let mut router = Router::new();
	router
		.process("/anything", handler_fn(|ctx: Context| async move {
			ctx.set_body(ctx.method().to_string());
			Ok(())
		}))
		.unwrap();

	let get = TestRequest::get("/anything").dispatch(&router.routes()).await;
	assert_eq!(get.text(), "GET");
	let post = TestRequest::post("/anything").dispatch(&router.routes()).await;
	assert_eq!(post.text(), "POST");
}

#[tokio::test]
async fn captures_bind_named_params() {
	let mut router = Router::new();
	router
		.get("/users/{id}/posts/{post}", handler_fn(|ctx: Context| async move {
			let params = ctx.params();
			ctx.set_body(json!({
				"id": params.get("id"),
				"post": params.get("post"),
				"captures": ctx.captures(),
			}));
			Ok(())
		}))
		.unwrap();

	let response = TestRequest::get("/users/7/posts/42")
		.dispatch(&router.routes())
		.await;
	assert_eq!(response.status, 200);
	let body = response.json().unwrap();
	assert_eq!(body["id"], "7");
	assert_eq!(body["post"], "42");
	assert_eq!(body["captures"], json!(["7", "42"]));
}

// ============================================================
// Request payload and query
// ============================================================

#[tokio::test]
async fn posted_json_and_query_echo_back() {
	let mut router = Router::new();
	router
		.post("/body/query", handler_fn(|ctx: Context| async move {
			ctx.set_body(json!({
				"query": ctx.query(),
				"body": ctx.data(),
			}));
			Ok(())
		}))
		.unwrap();

	let response = TestRequest::post("/body/query?a=1")
		.json(&json!({"z": 999}))
		.dispatch(&router.routes())
		.await;
	assert_eq!(response.status, 200);
	let body = response.json().unwrap();
	assert_eq!(body["query"]["a"], "1");
	assert_eq!(body["body"]["z"], 999);
}

#[tokio::test]
async fn malformed_json_payload_arrives_as_raw_text() {
	let mut router = Router::new();
	router
		.post("/echo", handler_fn(|ctx: Context| async move {
			ctx.set_body(json!({"data": ctx.data()}));
			Ok(())
		}))
		.unwrap();

	let response = TestRequest::post("/echo")
		.payload("definitely {not json")
		.dispatch(&router.routes())
		.await;
	assert_eq!(response.status, 200);
	assert_eq!(response.json().unwrap()["data"], "definitely {not json");
}

// ============================================================
// Terminal operations
// ============================================================

#[tokio::test]
async fn send_and_end_bypass_the_finalizer() {
	let mut router = Router::new();
	router
		.get("/route/1", handler_fn(|ctx: Context| async move {
			ctx.end("Hello World!1");
			Ok(())
		}))
		.unwrap();
	router
		.get("/route/2", handler_fn(|ctx: Context| async move {
			ctx.send("Hello World!2");
			Ok(())
		}))
		.unwrap();

	let routes = router.routes();
	let first = TestRequest::get("/route/1").dispatch(&routes).await;
	assert_eq!(first.text(), "Hello World!1");
	let second = TestRequest::get("/route/2").dispatch(&routes).await;
	assert_eq!(second.text(), "Hello World!2");
}

#[tokio::test]
async fn redirects_set_location_and_302() {
	let mut router = Router::new();
	router
		.get("/route", handler_fn(|ctx: Context| async move {
			ctx.redirect("/", None);
			Ok(())
		}))
		.unwrap();
	router
		.get("/route/2", handler_fn(|ctx: Context| async move {
			ctx.redirect("back", None);
			Ok(())
		}))
		.unwrap();

	let routes = router.routes();
	let explicit = TestRequest::get("/route").dispatch(&routes).await;
	assert_eq!(explicit.status, 302);
	assert_eq!(explicit.header("location"), Some("/"));
	assert_eq!(explicit.text(), "Redirecting to /.");

	// No Referrer header: `back` defaults to the root.
	let back = TestRequest::get("/route/2").dispatch(&routes).await;
	assert_eq!(back.status, 302);
	assert_eq!(back.header("location"), Some("/"));

	let back_with_referrer = TestRequest::get("/route/2")
		.header("referer", "/came-from")
		.dispatch(&routes)
		.await;
	assert_eq!(back_with_referrer.header("location"), Some("/came-from"));
}

#[tokio::test]
async fn null_body_finalizes_as_204() {
	let mut router = Router::new();
	router
		.get("/", handler_fn(|ctx: Context| async move {
			ctx.set_body(Body::null());
			Ok(())
		}))
		.unwrap();

	let response = TestRequest::get("/").dispatch(&router.routes()).await;
	assert_eq!(response.status, 204);
	assert!(response.header("content-type").is_none());
	assert!(response.body.is_empty());
}

#[tokio::test]
async fn head_requests_carry_length_but_no_payload() {
	let mut router = Router::new();
	router
		.head("/doc", handler_fn(|ctx: Context| async move {
			ctx.set_body("Hello World!");
			ctx.remove("Content-Length");
			Ok(())
		}))
		.unwrap();

	let response = TestRequest::head("/doc").dispatch(&router.routes()).await;
	assert_eq!(response.status, 200);
	assert_eq!(response.header("content-length"), Some("12"));
	assert!(response.body.is_empty());
}

// ============================================================
// Streaming bodies
// ============================================================

#[tokio::test]
async fn stream_bodies_pipe_byte_identical_and_observe_completion() {
	let fired = Arc::new(AtomicUsize::new(0));
	let observer_count = fired.clone();

	let mut router = Router::new();
	router
		.get("/stream", handler_fn(move |ctx: Context| {
			let fired = observer_count.clone();
			async move {
				ctx.set_status(200)?;
				let chunks = futures::stream::iter([
					Ok::<_, BoxError>(Bytes::from_static(b"chunk-one:")),
					Ok(Bytes::from_static(b"chunk-two")),
				]);
				ctx.set_body(Body::stream(chunks));
				ctx.response_flags().on_end(move || {
					fired.fetch_add(1, Ordering::SeqCst);
				});
				Ok(())
			}
		}))
		.unwrap();

	let response = TestRequest::get("/stream").dispatch(&router.routes()).await;
	assert_eq!(response.status, 200);
	assert_eq!(response.body, Bytes::from_static(b"chunk-one:chunk-two"));
	assert_eq!(fired.load(Ordering::SeqCst), 1);
}

// ============================================================
// Error boundary
// ============================================================

#[tokio::test]
async fn throwing_handlers_become_structured_500s() {
	let mut router = Router::new();
	router
		.get("/", handler_fn(|_ctx: Context| async move {
			Err(Error::handler("something went wrong"))
		}))
		.unwrap();

	let response = TestRequest::get("/").dispatch(&router.routes()).await;
	assert_eq!(response.status, 500);
	let body = response.json().unwrap();
	assert_eq!(body["status"], 500);
	assert_eq!(body["error"]["name"], "HandlerError");
	assert_eq!(body["error"]["message"], "something went wrong");
	assert!(body["error"].get("stack").is_none());
}

#[tokio::test]
async fn stack_traces_appear_only_when_exposed() {
	let mut router = Router::new();
	router
		.get("/", handler_fn(|_ctx: Context| async move {
			Err(Error::handler("boom"))
		}))
		.unwrap();

	let response = TestRequest::get("/")
		.expose_stack_traces()
		.dispatch(&router.routes())
		.await;
	let body = response.json().unwrap();
	assert!(body["error"]["stack"].is_string());
}

#[tokio::test]
async fn invalid_status_writes_abort_the_handler() {
	let mut router = Router::new();
	router
		.get("/", handler_fn(|ctx: Context| async move {
			ctx.set_status(1000)?;
			ctx.set_body("unreachable");
			Ok(())
		}))
		.unwrap();

	let response = TestRequest::get("/").dispatch(&router.routes()).await;
	assert_eq!(response.status, 500);
	assert_eq!(response.json().unwrap()["error"]["name"], "InvalidStatus");
}

// ============================================================
// Chain composition
// ============================================================

#[tokio::test]
async fn chain_wide_middleware_runs_before_route_stacks() {
	let mut router = Router::new();
	router.use_middleware(middleware_fn(|ctx: Context, next: corridor_http::Next| async move {
		ctx.set("X-Seen-By", "outer");
		next.run(ctx).await
	}));
	router
		.get("/", handler_fn(|ctx: Context| async move {
			let seen = ctx.get("X-Seen-By");
			ctx.set_body(format!("seen by {seen}"));
			Ok(())
		}))
		.unwrap();

	let response = TestRequest::get("/").dispatch(&router.routes()).await;
	assert_eq!(response.text(), "seen by outer");
	assert_eq!(response.header("x-seen-by"), Some("outer"));
}

#[tokio::test]
async fn handlers_that_continue_fall_through_to_not_found() {
	let mut router = Router::new();
	router
		.get("/observed", middleware_fn(|ctx: Context, next: corridor_http::Next| async move {
			ctx.set("X-Observed", "yes");
			next.run(ctx).await
		}))
		.unwrap();

	let response = TestRequest::get("/observed").dispatch(&router.routes()).await;
	assert_eq!(response.status, 404);
	assert_eq!(response.header("x-observed"), Some("yes"));
}

#[tokio::test]
async fn matched_route_metadata_is_recorded() {
	let mut router = Router::new();
	router
		.register(
			Some(hyper::Method::GET),
			"/users/{id}",
			Some("user-detail"),
			handler_fn(|ctx: Context| async move {
				ctx.set_body(json!({
					"matched_route": ctx.matched_route(),
					"matched_route_name": ctx.matched_route_name(),
					"router_name": ctx.router_name(),
					"matched": ctx.matched().len(),
				}));
				Ok(())
			}),
		)
		.unwrap();

	let response = TestRequest::get("/users/3").dispatch(&router.routes()).await;
	let body = response.json().unwrap();
	assert_eq!(body["matched_route"], "/users/{id}");
	assert_eq!(body["matched_route_name"], "user-detail");
	assert_eq!(body["router_name"], "user-detail");
	assert_eq!(body["matched"], 1);
}
