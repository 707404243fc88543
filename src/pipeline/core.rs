use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::container::Container;
use crate::context::{ExecutionContext, RenderedResponse, ResponseBuilder};
use crate::exception::Exception;
use crate::middleware::{Flow, MiddlewareRef, MiddlewareStage};
use crate::registry::{HandlerRef, RouteDefinition};
use crate::security::enforce_roles;
use crate::validation::{validation_exception, ValidationStage};

/// Pipeline failure routed to the mapper. Not-found keeps its own arm so a
/// custom not-found controller can be picked over the generic error handler.
pub(crate) enum Failure {
    NotFound(Exception),
    Error(Exception),
}

enum StageOutcome {
    Completed(ExecutionContext),
    /// A middleware answered the request; remaining stages were skipped
    ShortCircuit(ResponseBuilder),
}

/// Orchestrator for the per-request stage machine.
///
/// Stage order is fixed: route presence check, global request middlewares,
/// route request middlewares, role check, params/payload/queries validators,
/// handler invocation, response validators, route response middlewares,
/// global response middlewares, rendering. Any middleware may short-circuit
/// with a ready response; any stage may fail with an [`Exception`] that the
/// mapper renders. Failures never escape [`Pipeline::execute`].
pub struct Pipeline {
    pub(crate) container: Arc<Container>,
    global_middlewares: HashMap<MiddlewareStage, Vec<MiddlewareRef>>,
    pub(crate) not_found: Option<HandlerRef>,
    pub(crate) error_handler: Option<HandlerRef>,
}

impl Pipeline {
    #[must_use]
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            global_middlewares: HashMap::new(),
            not_found: None,
            error_handler: None,
        }
    }

    /// Append a middleware to a global stage; execution follows registration
    /// order.
    pub fn add_global_middleware(&mut self, stage: MiddlewareStage, middleware: MiddlewareRef) {
        self.global_middlewares
            .entry(stage)
            .or_default()
            .push(middleware);
    }

    /// Controller invoked instead of the generic 404 envelope.
    pub fn set_not_found_handler(&mut self, handler: HandlerRef) {
        self.not_found = Some(handler);
    }

    /// Controller invoked instead of the generic error envelope.
    pub fn set_error_handler(&mut self, handler: HandlerRef) {
        self.error_handler = Some(handler);
    }

    #[must_use]
    fn global_middlewares(&self, stage: MiddlewareStage) -> &[MiddlewareRef] {
        self.global_middlewares
            .get(&stage)
            .map_or(&[], Vec::as_slice)
    }

    /// Drive one context through every stage and render the wire response.
    ///
    /// This is the single catch boundary for request-time failures: typed
    /// exceptions and panics alike end up at the mapper, so the coroutine
    /// driving this request never crashes on an uncaught error.
    #[must_use]
    pub fn execute(&self, ctx: ExecutionContext) -> RenderedResponse {
        let request = ctx.request.clone();

        match catch_unwind(AssertUnwindSafe(|| self.run(ctx))) {
            Ok(Ok(StageOutcome::Completed(ctx))) => ctx.response.build(&ctx.request),
            Ok(Ok(StageOutcome::ShortCircuit(response))) => response.build(&request),
            Ok(Err(failure)) => self.map_failure(&request, failure),
            Err(panic) => {
                error!(
                    request_id = %request.id,
                    panic = ?panic,
                    "Pipeline stage panicked"
                );
                self.map_failure(&request, Failure::Error(Exception::from_panic(&*panic)))
            }
        }
    }

    /// Render an exception without running any stage; used by the transport
    /// adapter for failures raised before a context can carry a route
    /// (e.g. method mismatch).
    #[must_use]
    pub fn fail(
        &self,
        request: &crate::context::RequestView,
        exception: Exception,
    ) -> RenderedResponse {
        let failure = match exception.status {
            Some(404) => Failure::NotFound(exception),
            _ => Failure::Error(exception),
        };
        self.map_failure(request, failure)
    }

    fn run(&self, mut ctx: ExecutionContext) -> Result<StageOutcome, Failure> {
        let Some(route) = ctx.route.clone() else {
            return Err(Failure::NotFound(Exception::not_found(format!(
                "No route for {} {}",
                ctx.request.method, ctx.request.path
            ))));
        };

        // Request middlewares: global first, then route-level.
        for (scope, refs) in [
            ("global", self.global_middlewares(MiddlewareStage::Request)),
            ("route", route.middlewares(MiddlewareStage::Request)),
        ] {
            match self.run_middlewares(ctx, refs, scope, MiddlewareStage::Request)? {
                Flow::Continue(next) => ctx = next,
                Flow::Respond(response) => return Ok(StageOutcome::ShortCircuit(response)),
            }
        }

        if let Some(user) = ctx.user.clone() {
            if !route.roles.is_empty() {
                enforce_roles(&route.roles, user.as_ref()).map_err(Failure::Error)?;
            }
        }

        for stage in [
            ValidationStage::Params,
            ValidationStage::Payload,
            ValidationStage::Queries,
        ] {
            if route.validators(stage).is_empty() {
                continue;
            }
            let data = Self::stage_data(&ctx, stage);
            self.run_validators(&ctx, &route, stage, &data)?;
        }

        self.invoke_handler(&mut ctx, &route)?;

        if ctx.response.has_data() && !route.validators(ValidationStage::Response).is_empty() {
            let data = ctx.response.data().clone();
            self.run_validators(&ctx, &route, ValidationStage::Response, &data)?;
        }

        // Response middlewares: route-level first, then global.
        for (scope, refs) in [
            ("route", route.middlewares(MiddlewareStage::Response)),
            ("global", self.global_middlewares(MiddlewareStage::Response)),
        ] {
            match self.run_middlewares(ctx, refs, scope, MiddlewareStage::Response)? {
                Flow::Continue(next) => ctx = next,
                Flow::Respond(response) => return Ok(StageOutcome::ShortCircuit(response)),
            }
        }

        Ok(StageOutcome::Completed(ctx))
    }

    fn run_middlewares(
        &self,
        mut ctx: ExecutionContext,
        refs: &[MiddlewareRef],
        scope: &'static str,
        stage: MiddlewareStage,
    ) -> Result<Flow, Failure> {
        for mw_ref in refs {
            let middleware = mw_ref
                .resolve(&self.container)
                .map_err(|err| Failure::Error(err.into()))?;

            debug!(
                request_id = %ctx.request.id,
                middleware = mw_ref.type_name,
                scope = scope,
                stage = %stage,
                "Running middleware"
            );

            match middleware.next(ctx).map_err(Failure::Error)? {
                Flow::Continue(next) => ctx = next,
                Flow::Respond(response) => {
                    info!(
                        middleware = mw_ref.type_name,
                        scope = scope,
                        stage = %stage,
                        status = response.status(),
                        "Middleware returned early response"
                    );
                    return Ok(Flow::Respond(response));
                }
            }
        }
        Ok(Flow::Continue(ctx))
    }

    fn run_validators(
        &self,
        ctx: &ExecutionContext,
        route: &RouteDefinition,
        stage: ValidationStage,
        data: &Value,
    ) -> Result<(), Failure> {
        for v_ref in route.validators(stage) {
            let validator = v_ref
                .resolve(&self.container)
                .map_err(|err| Failure::Error(err.into()))?;

            let errors = validator.validate(data);
            if !errors.is_empty() {
                warn!(
                    request_id = %ctx.request.id,
                    validator = v_ref.type_name,
                    stage = %stage,
                    error_count = errors.len(),
                    "Validation failed"
                );
                return Err(Failure::Error(validation_exception(stage, errors)));
            }
        }
        Ok(())
    }

    fn invoke_handler(
        &self,
        ctx: &mut ExecutionContext,
        route: &RouteDefinition,
    ) -> Result<(), Failure> {
        let handler_ref = route.handler().ok_or_else(|| {
            Failure::Error(Exception::internal(format!(
                "route '{}' has no handler",
                route.name
            )))
        })?;

        let controller = handler_ref
            .resolve(&self.container)
            .map_err(|err| Failure::Error(err.into()))?;

        info!(
            request_id = %ctx.request.id,
            handler = handler_ref.type_name,
            route_name = %route.name,
            "Handler execution start"
        );

        match catch_unwind(AssertUnwindSafe(|| controller.action(&mut *ctx))) {
            Ok(Ok(response)) => {
                info!(
                    request_id = %ctx.request.id,
                    handler = handler_ref.type_name,
                    status = response.status(),
                    "Handler execution complete"
                );
                ctx.response = response;
                Ok(())
            }
            Ok(Err(exception)) => {
                warn!(
                    request_id = %ctx.request.id,
                    handler = handler_ref.type_name,
                    error = %exception,
                    "Handler returned an exception"
                );
                Err(Failure::Error(exception))
            }
            Err(panic) => {
                error!(
                    request_id = %ctx.request.id,
                    handler = handler_ref.type_name,
                    panic = ?panic,
                    "Handler panicked - CRITICAL"
                );
                Err(Failure::Error(Exception::from_panic(&*panic)))
            }
        }
    }

    fn stage_data(ctx: &ExecutionContext, stage: ValidationStage) -> Value {
        match stage {
            ValidationStage::Params => Value::Object(ctx.request.params.clone()),
            ValidationStage::Payload => ctx.request.payload.clone(),
            ValidationStage::Queries => Value::Object(ctx.request.queries.clone()),
            ValidationStage::Response => ctx.response.data().clone(),
        }
    }
}
