use tracing::info;

use super::{Flow, Middleware};
use crate::context::ExecutionContext;
use crate::exception::Exception;

/// Logs the request line and the response status as the context passes
/// through. Register it at the request stage, the response stage, or both.
pub struct TraceMiddleware;

impl Middleware for TraceMiddleware {
    fn next(&self, ctx: ExecutionContext) -> Result<Flow, Exception> {
        info!(
            request_id = %ctx.request.id,
            method = %ctx.request.method,
            path = %ctx.request.path,
            ip = %ctx.request.ip,
            status = ctx.response.status(),
            "Context passing trace middleware"
        );
        Ok(Flow::Continue(ctx))
    }
}
