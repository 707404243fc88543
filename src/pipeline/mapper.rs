use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info, warn};

use super::core::{Failure, Pipeline};
use crate::context::{ExecutionContext, RenderedResponse, RequestView, ResponseBuilder};
use crate::exception::Exception;
use crate::registry::HandlerRef;

impl Pipeline {
    /// Turn a pipeline failure into the wire response.
    ///
    /// When a custom not-found or error controller is configured, it is
    /// resolved and invoked with a fresh route-less context carrying
    /// `exception`; its response is rendered instead of the generic
    /// envelope. A failing custom controller falls back to the generic
    /// envelope - the error path must always produce a response.
    pub(crate) fn map_failure(
        &self,
        request: &RequestView,
        failure: Failure,
    ) -> RenderedResponse {
        let (exception, custom) = match failure {
            Failure::NotFound(exception) => (exception, self.not_found.as_ref()),
            Failure::Error(exception) => (exception, self.error_handler.as_ref()),
        };

        info!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            status = exception.status_or(500),
            error = %exception.message,
            "Mapping exception to response"
        );

        if let Some(handler_ref) = custom {
            if let Some(rendered) = self.invoke_custom(request, handler_ref, &exception) {
                return rendered;
            }
        }

        let status = exception.status_or(500);
        ResponseBuilder::exception(exception.message.clone(), exception.data.clone(), status)
            .build(request)
    }

    /// Invoke a user-registered not-found/error controller. Returns `None`
    /// when resolution, invocation or the controller itself fails, letting
    /// the caller fall back to the generic envelope.
    fn invoke_custom(
        &self,
        request: &RequestView,
        handler_ref: &HandlerRef,
        exception: &Exception,
    ) -> Option<RenderedResponse> {
        let controller = match handler_ref.resolve(&self.container) {
            Ok(controller) => controller,
            Err(err) => {
                error!(
                    handler = handler_ref.type_name,
                    error = %err,
                    "Failed to resolve custom exception controller"
                );
                return None;
            }
        };

        let mut ctx = ExecutionContext {
            state: HashMap::new(),
            request: request.clone(),
            response: ResponseBuilder::with_cookies(request.cookies.clone()),
            route: None,
            user: None,
            exception: Some(exception.clone()),
        };

        match catch_unwind(AssertUnwindSafe(|| controller.action(&mut ctx))) {
            Ok(Ok(response)) => Some(response.build(request)),
            Ok(Err(err)) => {
                warn!(
                    handler = handler_ref.type_name,
                    error = %err,
                    "Custom exception controller returned an exception"
                );
                None
            }
            Err(panic) => {
                error!(
                    handler = handler_ref.type_name,
                    panic = ?panic,
                    "Custom exception controller panicked"
                );
                None
            }
        }
    }
}
