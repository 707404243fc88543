use serde_json::{json, Value};
use std::collections::HashMap;

use super::request::RequestView;

/// Wire-ready response: status, headers and serialized body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Mutable response under construction, owned by the context.
///
/// Starts empty with status 200, seeded with the inbound request's cookies so
/// cookie mutations compose with request-scoped cookie state. Rendering wraps
/// the data in the uniform envelope; see [`ResponseBuilder::build`].
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    status: u16,
    data: Value,
    message: Option<String>,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    redirect: Option<String>,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            status: 200,
            data: Value::Object(serde_json::Map::new()),
            message: None,
            headers: HashMap::new(),
            cookies: HashMap::new(),
            redirect: None,
        }
    }
}

impl ResponseBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh builder carrying the request's cookies.
    #[must_use]
    pub fn with_cookies(cookies: HashMap<String, String>) -> Self {
        Self {
            cookies,
            ..Self::default()
        }
    }

    /// Convenience constructor for handlers returning a JSON payload.
    #[must_use]
    pub fn json(data: Value, status: u16) -> Self {
        let mut builder = Self::new();
        builder.set_json(data, status, "utf-8");
        builder
    }

    /// Convenience constructor for the error path (default 500).
    #[must_use]
    pub fn exception(message: impl Into<String>, data: Option<Value>, status: u16) -> Self {
        let mut builder = Self::new();
        builder.set_exception(message, data, status);
        builder
    }

    /// Convenience constructor for redirects (307 Temporary Redirect).
    #[must_use]
    pub fn redirect(url: impl Into<String>) -> Self {
        let mut builder = Self::new();
        builder.set_redirect(url, 307);
        builder
    }

    pub fn set_json(&mut self, data: Value, status: u16, charset: &str) -> &mut Self {
        self.data = data;
        self.status = status;
        self.headers.remove("Accept");
        self.headers.remove("Content-Type");
        self.headers
            .insert("Accept".to_string(), "application/json".to_string());
        self.headers.insert(
            "Content-Type".to_string(),
            format!("application/json; charset={charset}"),
        );
        self
    }

    pub fn set_exception(
        &mut self,
        message: impl Into<String>,
        data: Option<Value>,
        status: u16,
    ) -> &mut Self {
        self.message = Some(message.into());
        self.data = data.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        self.status = status;
        self.headers.remove("Accept");
        self.headers
            .insert("Accept".to_string(), "application/json".to_string());
        self.headers.insert(
            "Content-Type".to_string(),
            "application/json".to_string(),
        );
        self
    }

    pub fn set_not_found(
        &mut self,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> &mut Self {
        self.set_exception(message, data, 404)
    }

    pub fn set_redirect(&mut self, url: impl Into<String>, status: u16) -> &mut Self {
        self.redirect = Some(url.into());
        self.status = status;
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Whether the response carries a non-empty data payload.
    #[must_use]
    pub fn has_data(&self) -> bool {
        match &self.data {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        }
    }

    #[must_use]
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status)
    }

    #[must_use]
    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Render into the wire format, echoing request metadata into the
    /// uniform envelope. Redirects render as a bare `Location` response.
    #[must_use]
    pub fn build(&self, request: &RequestView) -> RenderedResponse {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.sort();
        for (name, value) in &self.cookies {
            headers.push(("Set-Cookie".to_string(), format!("{name}={value}")));
        }

        if let Some(url) = &self.redirect {
            headers.push(("Location".to_string(), url.clone()));
            return RenderedResponse {
                status: self.status,
                headers,
                body: Vec::new(),
            };
        }

        if !self.headers.contains_key("Content-Type") {
            headers.push((
                "Content-Type".to_string(),
                "application/json".to_string(),
            ));
        }

        let envelope = json!({
            "data": self.data,
            "message": self.message,
            "success": self.is_successful(),
            "status": self.status,
            "path": request.path,
            "method": request.method.as_str(),
            "params": request.params,
            "payload": request.payload,
            "queries": request.queries,
            "ip": request.ip,
            "host": request.host,
            "language": request.language,
        });

        RenderedResponse {
            status: self.status,
            headers,
            body: serde_json::to_vec(&envelope).unwrap_or_default(),
        }
    }
}
