use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

use super::core::ExecutionContext;
use super::multipart::parse_form;
use super::request::{negotiate_language, parse_scalar, RequestView};
use super::response::ResponseBuilder;
use crate::ids::RequestId;
use crate::registry::RouteDefinition;
use crate::server::ParsedRequest;

/// Assemble a fresh [`ExecutionContext`] from a parsed inbound request.
///
/// A body that fails to parse as JSON or as a form is not an error here: the
/// payload falls back to an empty object and the form to empty state, and
/// configured validators report payload problems later. Client IP prefers the
/// transport peer address, then an explicitly supplied value, then
/// `"unknown"`. The response builder starts at 200 seeded with the request's
/// cookies. No routing decision happens here: the route, when already
/// matched, is passed in by the caller, and the builder is equally usable
/// without one for the error path.
#[must_use]
pub fn build_context(
    parsed: &ParsedRequest,
    path_params: &[(Arc<str>, String)],
    peer_addr: Option<SocketAddr>,
    fallback_ip: Option<&str>,
    route: Option<Arc<RouteDefinition>>,
) -> ExecutionContext {
    let payload = if parsed.body.is_empty() {
        Value::Object(Map::new())
    } else {
        match serde_json::from_slice::<Value>(&parsed.body) {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "Body is not JSON, substituting empty payload");
                Value::Object(Map::new())
            }
        }
    };

    let (form, files) = parse_form(
        parsed.headers.get("content-type").map(String::as_str),
        &parsed.body,
    )
    .unwrap_or_default();

    let ip = peer_addr
        .map(|addr| addr.ip().to_string())
        .or_else(|| fallback_ip.map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    let host = parsed
        .headers
        .get("host")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());

    let language = negotiate_language(
        parsed.headers.get("x-custom-lang").map(String::as_str),
        parsed.headers.get("accept-language").map(String::as_str),
    );

    let id = RequestId::from_header_or_new(parsed.headers.get("x-request-id").map(String::as_str));

    let params: Map<String, Value> = path_params
        .iter()
        .map(|(name, value)| (name.to_string(), parse_scalar(value)))
        .collect();

    let queries: Map<String, Value> = parsed
        .query_params
        .iter()
        .map(|(name, value)| (name.clone(), parse_scalar(value)))
        .collect();

    let request = RequestView {
        id,
        method: parsed.method.clone(),
        path: parsed.path.clone(),
        headers: parsed.headers.clone(),
        params,
        payload,
        queries,
        cookies: parsed.cookies.clone(),
        form,
        files,
        ip,
        host,
        language,
    };

    let response = ResponseBuilder::with_cookies(request.cookies.clone());

    ExecutionContext {
        state: HashMap::new(),
        request,
        response,
        route,
        user: None,
        exception: None,
    }
}
