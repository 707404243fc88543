use std::fmt;
use std::sync::Arc;

use crate::container::{Container, ContainerError};
use crate::context::{ExecutionContext, ResponseBuilder};
use crate::exception::Exception;

/// Pipeline stages a middleware list can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewareStage {
    Request,
    Response,
}

impl fmt::Display for MiddlewareStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareStage::Request => write!(f, "request"),
            MiddlewareStage::Response => write!(f, "response"),
        }
    }
}

/// Outcome of one middleware step.
pub enum Flow {
    /// Hand the (possibly mutated) context to the next stage
    Continue(ExecutionContext),
    /// Short-circuit: render this response immediately, skipping every
    /// remaining stage including validators and the handler
    Respond(ResponseBuilder),
}

/// A pipeline stage that may inspect or mutate the context, or answer the
/// request itself.
pub trait Middleware: Send + Sync {
    fn next(&self, ctx: ExecutionContext) -> Result<Flow, Exception>;
}

/// Container-resolvable reference to a middleware type attached to a route
/// or registered globally.
#[derive(Clone)]
pub struct MiddlewareRef {
    pub type_name: &'static str,
    resolve: Arc<dyn Fn(&Container) -> Result<Arc<dyn Middleware>, ContainerError> + Send + Sync>,
}

impl MiddlewareRef {
    #[must_use]
    pub fn of<M: Middleware + Send + Sync + 'static>() -> Self {
        Self {
            type_name: std::any::type_name::<M>(),
            resolve: Arc::new(|container| {
                container
                    .resolve::<M>()
                    .map(|instance| instance as Arc<dyn Middleware>)
            }),
        }
    }

    pub fn resolve(&self, container: &Container) -> Result<Arc<dyn Middleware>, ContainerError> {
        (*self.resolve)(container)
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRef")
            .field("type_name", &self.type_name)
            .finish()
    }
}
