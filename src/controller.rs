use crate::context::{ExecutionContext, ResponseBuilder};
use crate::exception::Exception;

/// The unit of business logic invoked once per matched, authorized,
/// validated request.
///
/// Controllers are constructed by the dependency container (singleton by
/// default when registered through the route registry) and must therefore be
/// shareable across concurrently running request coroutines.
pub trait Controller: Send + Sync {
    fn action(&self, ctx: &mut ExecutionContext) -> Result<ResponseBuilder, Exception>;
}
