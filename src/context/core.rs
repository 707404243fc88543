use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::request::RequestView;
use super::response::ResponseBuilder;
use crate::exception::Exception;
use crate::registry::RouteDefinition;
use crate::security::Principal;

/// The per-request bag threading state through all pipeline stages.
///
/// Created fresh per inbound request, mutated in place by middlewares (which
/// may replace `response` or parts of `state`), consumed to completion by the
/// pipeline executor, and discarded after the response is sent. Contexts are
/// never shared or reused across requests.
pub struct ExecutionContext {
    /// Open scratch map owned by middlewares and handlers
    pub state: HashMap<String, Value>,
    pub request: RequestView,
    pub response: ResponseBuilder,
    /// The matched route, absent on the error-handling path
    pub route: Option<Arc<RouteDefinition>>,
    /// Authenticated principal, set by an authentication middleware
    pub user: Option<Arc<dyn Principal>>,
    /// Set only on the error path, for custom error controllers
    pub exception: Option<Exception>,
}

impl ExecutionContext {
    #[must_use]
    pub fn state_value(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }
}
