//! Request dispatcher
//!
//! ```text
//! send(request)
//!   │
//!   ▼
//! ┌──────────────┐   next   ┌──────────────┐   next   ┌──────────┐
//! │ behavior #0  │ ───────▶ │ behavior #1  │ ───────▶ │ handler  │
//! └──────────────┘          └──────────────┘          └──────────┘
//! ```
//!
//! Handlers are looked up in a registry keyed by [`RequestKind`], filled once
//! through [`MediatorBuilder`]. Behaviors wrap the handler call in
//! registration order; each receives the request and a [`Next`] continuation
//! and may run code before or after it, or return without calling it.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{ProductError, ProductResult};
use crate::requests::{Request, RequestEnvelope, RequestKind, ResponseEnvelope};

/// Continuation into the rest of the pipeline
pub type Next<'a> =
    Box<dyn FnOnce(RequestEnvelope) -> BoxFuture<'a, ProductResult<ResponseEnvelope>> + Send + 'a>;

/// Cross-cutting stage wrapped around handler invocation
pub trait PipelineBehavior: Send + Sync {
    fn handle<'a>(
        &'a self,
        request: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, ProductResult<ResponseEnvelope>>;
}

/// The single piece of logic bound to one request type
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(&self, request: R, cancel: &CancellationToken) -> ProductResult<R::Response>;
}

#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn handle(
        &self,
        request: RequestEnvelope,
        cancel: &CancellationToken,
    ) -> ProductResult<ResponseEnvelope>;
}

struct Registered<R, H> {
    handler: H,
    _request: PhantomData<fn() -> R>,
}

#[async_trait]
impl<R, H> ErasedHandler for Registered<R, H>
where
    R: Request,
    H: RequestHandler<R>,
{
    async fn handle(
        &self,
        request: RequestEnvelope,
        cancel: &CancellationToken,
    ) -> ProductResult<ResponseEnvelope> {
        let kind = request.kind();
        let request = R::from_envelope(request).ok_or_else(|| {
            ProductError::Internal(format!("{} handler received a {} request", R::KIND, kind))
        })?;
        let response = self.handler.handle(request, cancel).await?;
        Ok(R::wrap_response(response))
    }
}

#[derive(Default)]
pub struct MediatorBuilder {
    handlers: HashMap<RequestKind, Vec<Arc<dyn ErasedHandler>>>,
    behaviors: Vec<Arc<dyn PipelineBehavior>>,
}

impl MediatorBuilder {
    /// Register a handler for `R`
    ///
    /// Registering a second handler for the same kind is accepted here and
    /// reported as [`ProductError::NoHandlerRegistered`] when dispatched.
    pub fn handler<R, H>(mut self, handler: H) -> Self
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        let registered: Arc<dyn ErasedHandler> = Arc::new(Registered {
            handler,
            _request: PhantomData::<fn() -> R>,
        });
        self.handlers.entry(R::KIND).or_default().push(registered);
        self
    }

    /// Append a behavior; the first registered is the outermost
    pub fn behavior<B>(mut self, behavior: B) -> Self
    where
        B: PipelineBehavior + 'static,
    {
        self.behaviors.push(Arc::new(behavior));
        self
    }

    pub fn build(self) -> Mediator {
        Mediator {
            handlers: self.handlers,
            behaviors: self.behaviors,
        }
    }
}

/// Routes a request to its one handler through the behavior pipeline
#[derive(Clone)]
pub struct Mediator {
    handlers: HashMap<RequestKind, Vec<Arc<dyn ErasedHandler>>>,
    behaviors: Vec<Arc<dyn PipelineBehavior>>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::default()
    }

    /// Fail fast unless every request kind has exactly one handler
    pub fn verify(&self) -> ProductResult<()> {
        for kind in RequestKind::iter() {
            self.resolve(kind)?;
        }
        Ok(())
    }

    pub fn handler_count(&self, kind: RequestKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    fn resolve(&self, kind: RequestKind) -> ProductResult<&dyn ErasedHandler> {
        match self.handlers.get(&kind).map(Vec::as_slice).unwrap_or_default() {
            [handler] => Ok(handler.as_ref()),
            others => Err(ProductError::NoHandlerRegistered {
                kind,
                found: others.len(),
            }),
        }
    }

    /// Dispatch a request and wait for its response
    #[instrument(skip_all, fields(kind = %R::KIND, command = R::KIND.is_command()))]
    pub async fn send<R: Request>(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> ProductResult<R::Response> {
        let handler = self.resolve(R::KIND)?;
        let response = self
            .dispatch(0, request.into_envelope(), handler, cancel)
            .await?;
        let kind = response.kind();
        R::unwrap_response(response).ok_or_else(|| {
            ProductError::Internal(format!("{} request answered with a {} response", R::KIND, kind))
        })
    }

    fn dispatch<'a>(
        &'a self,
        index: usize,
        request: RequestEnvelope,
        handler: &'a dyn ErasedHandler,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, ProductResult<ResponseEnvelope>> {
        match self.behaviors.get(index) {
            Some(behavior) => {
                let next: Next<'a> = Box::new(move |request: RequestEnvelope| {
                    self.dispatch(index + 1, request, handler, cancel)
                });
                behavior.handle(request, next)
            }
            None => handler.handle(request, cancel),
        }
    }
}

impl fmt::Debug for Mediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: HashMap<RequestKind, usize> = self
            .handlers
            .iter()
            .map(|(kind, registered)| (*kind, registered.len()))
            .collect();
        f.debug_struct("Mediator")
            .field("handlers", &handlers)
            .field("behaviors", &self.behaviors.len())
            .finish()
    }
}
