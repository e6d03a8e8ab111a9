//! Tower integration: run every request of a service as a command.

use crate::CommandExecutor;
use command_resilience_core::{CommandError, CommandKey};
use futures::future::BoxFuture;
use std::future::Future;
use std::task::{Context, Poll};
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

/// A Tower layer that routes each request through [`CommandExecutor::execute`].
///
/// The wrapped service is the primary action and `fallback(request)` is the
/// fallback. All requests of the layer share one command key, so they share
/// one circuit, one bulkhead and one metric stream.
///
/// # Example
///
/// ```rust
/// use command_resilience_executor::{CommandExecutor, CommandLayer};
/// use tower::{service_fn, Layer, ServiceExt};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = CommandExecutor::new();
/// let layer = CommandLayer::new(executor, "echo", |req: String| async move {
///     Ok::<_, std::io::Error>(format!("cached {}", req))
/// });
///
/// let service = layer.layer(service_fn(|req: String| async move {
///     Ok::<_, std::io::Error>(req)
/// }));
///
/// let response = service.oneshot("hi".to_string()).await.unwrap();
/// assert_eq!(response, "hi");
/// # }
/// ```
#[derive(Clone)]
pub struct CommandLayer<F> {
    executor: CommandExecutor,
    key: CommandKey,
    fallback: F,
}

impl<F> CommandLayer<F> {
    /// Creates a layer executing under `key` with `fallback` as the fallback.
    pub fn new(executor: CommandExecutor, key: impl Into<CommandKey>, fallback: F) -> Self {
        Self {
            executor,
            key: key.into(),
            fallback,
        }
    }
}

impl<S, F: Clone> Layer<S> for CommandLayer<F> {
    type Service = CommandService<S, F>;

    fn layer(&self, service: S) -> Self::Service {
        CommandService {
            inner: service,
            executor: self.executor.clone(),
            key: self.key.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

/// Service produced by [`CommandLayer`].
///
/// Readiness of the inner service is awaited inside the primary action, so
/// a service that is never ready times out like any slow dependency.
#[derive(Clone)]
pub struct CommandService<S, F> {
    inner: S,
    executor: CommandExecutor,
    key: CommandKey,
    fallback: F,
}

impl<S, F> CommandService<S, F> {
    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// The command key requests run under.
    pub fn command_key(&self) -> &CommandKey {
        &self.key
    }
}

impl<S, F, FutB, Req> Service<Req> for CommandService<S, F>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    F: Fn(Req) -> FutB + Clone + Send + 'static,
    FutB: Future<Output = Result<S::Response, S::Error>> + Send + 'static,
    Req: Clone + Send + 'static,
{
    type Response = S::Response;
    type Error = CommandError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let inner = self.inner.clone();
        let executor = self.executor.clone();
        let key = self.key.clone();
        let fallback = self.fallback.clone();
        let fallback_req = req.clone();

        Box::pin(async move {
            executor
                .execute(
                    key,
                    move || inner.oneshot(req),
                    move || fallback(fallback_req),
                )
                .await
        })
    }
}
