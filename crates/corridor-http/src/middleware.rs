//! Middleware trait and chain composition.
//!
//! A middleware receives the request [`Context`] and an explicit [`Next`]
//! continuation. Calling `next.run(ctx)` hands control to the rest of the
//! chain; returning without calling it short-circuits every later link,
//! including the not-found fallback. `Next` is consumed by `run`, so a
//! continuation cannot be invoked twice.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;

/// A single link in the request-handling chain.
#[async_trait]
pub trait Middleware: Send + Sync {
	/// Handle the request, optionally continuing to the next link.
	async fn handle(&self, ctx: Context, next: Next) -> Result<()>;
}

/// Blanket implementation so `Arc<dyn Middleware>` composes like any link.
#[async_trait]
impl<T: Middleware + ?Sized> Middleware for Arc<T> {
	async fn handle(&self, ctx: Context, next: Next) -> Result<()> {
		(**self).handle(ctx, next).await
	}
}

/// The remaining chain after the current link.
#[derive(Clone)]
pub struct Next {
	stack: Arc<[Arc<dyn Middleware>]>,
	index: usize,
}

impl Next {
	/// A continuation that does nothing, for invoking a chain at its edge.
	pub fn empty() -> Self {
		Self {
			stack: Arc::from(Vec::new()),
			index: 0,
		}
	}

	/// True when no links remain; running such a continuation resolves
	/// immediately.
	pub fn is_empty(&self) -> bool {
		self.index >= self.stack.len()
	}

	/// Run the rest of the chain. Consumes the continuation.
	pub async fn run(self, ctx: Context) -> Result<()> {
		match self.stack.get(self.index).cloned() {
			Some(link) => {
				let next = Next {
					stack: self.stack,
					index: self.index + 1,
				};
				link.handle(ctx, next).await
			}
			None => Ok(()),
		}
	}
}

/// A middleware list composed into a single sequential chain.
///
/// Execution is strictly in order; each link decides whether to continue.
/// When installed as a middleware itself, a chain is self-contained: the
/// enclosing continuation is not threaded into it.
pub struct Chain {
	stack: Arc<[Arc<dyn Middleware>]>,
}

impl Chain {
	pub fn new(handlers: Vec<Arc<dyn Middleware>>) -> Self {
		Self {
			stack: Arc::from(handlers),
		}
	}

	/// Execute the chain against a context.
	pub async fn run(&self, ctx: Context) -> Result<()> {
		Next {
			stack: self.stack.clone(),
			index: 0,
		}
		.run(ctx)
		.await
	}
}

#[async_trait]
impl Middleware for Chain {
	async fn handle(&self, ctx: Context, _next: Next) -> Result<()> {
		self.run(ctx).await
	}
}

/// Compose a handler list into one middleware, sequential with explicit
/// continuation semantics.
pub fn compose(handlers: Vec<Arc<dyn Middleware>>) -> Chain {
	Chain::new(handlers)
}

/// Adapter turning an `async fn(Context, Next)` into a [`Middleware`].
pub struct FnMiddleware<F> {
	func: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
	F: Fn(Context, Next) -> Fut + Send + Sync,
	Fut: Future<Output = Result<()>> + Send,
{
	async fn handle(&self, ctx: Context, next: Next) -> Result<()> {
		(self.func)(ctx, next).await
	}
}

/// Wrap a function as a pass-through-capable middleware.
pub fn middleware_fn<F, Fut>(func: F) -> FnMiddleware<F>
where
	F: Fn(Context, Next) -> Fut + Send + Sync,
	Fut: Future<Output = Result<()>> + Send,
{
	FnMiddleware { func }
}

/// Adapter turning an `async fn(Context)` into a terminal [`Middleware`].
///
/// Terminal handlers never continue the chain, so anything registered after
/// them (notably the not-found fallback) is skipped once they run.
pub struct FnHandler<F> {
	func: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnHandler<F>
where
	F: Fn(Context) -> Fut + Send + Sync,
	Fut: Future<Output = Result<()>> + Send,
{
	async fn handle(&self, ctx: Context, _next: Next) -> Result<()> {
		(self.func)(ctx).await
	}
}

/// Wrap a function as a terminal handler.
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
	F: Fn(Context) -> Fut + Send + Sync,
	Fut: Future<Output = Result<()>> + Send,
{
	FnHandler { func }
}
