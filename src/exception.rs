use serde_json::Value;
use std::fmt;
use std::time::SystemTime;

/// Error value carried through the request pipeline.
///
/// An `Exception` is constructed at the point of failure, propagated up to the
/// pipeline boundary and consumed exactly once by the exception mapper. Only
/// `message`, `status` and `data` are ever rendered to the wire; stack traces
/// and internal detail stay in the logs.
#[derive(Debug, Clone)]
pub struct Exception {
    /// Human-readable summary of the failure
    pub message: String,
    /// HTTP status to render, `None` defaults to 500 at mapping time
    pub status: Option<u16>,
    /// Structured payload (e.g. validation details)
    pub data: Option<Value>,
    /// Creation timestamp
    pub date: SystemTime,
}

impl Exception {
    /// Create an exception with no fixed status (renders as 500)
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            data: None,
            date: SystemTime::now(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// 404 - no route matched the request path
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message).with_status(404)
    }

    /// 401 - the authenticated principal failed the route's role check
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message).with_status(401)
    }

    /// 400 - a configured validator rejected the request; `details` carries
    /// the structured per-property error list
    #[must_use]
    pub fn validation(message: impl Into<String>, details: Value) -> Self {
        Self::new(message)
            .with_status(400)
            .with_data(serde_json::json!({ "details": details }))
    }

    /// 405 - the path is registered but not for this method
    #[must_use]
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(message).with_status(405)
    }

    /// 500 - wiring or invariant failure surfaced at request time
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message).with_status(500)
    }

    /// Wrap a caught handler panic payload into the single error shape the
    /// mapper deals with. The panic detail is logged by the caller, never
    /// rendered.
    #[must_use]
    pub fn from_panic(panic: &(dyn std::any::Any + Send)) -> Self {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_string());
        Self::internal(message)
    }

    /// Status to render, falling back to the given default
    #[must_use]
    pub fn status_or(&self, default: u16) -> u16 {
        self.status.unwrap_or(default)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Exception {}

impl From<anyhow::Error> for Exception {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}
