use http::Method;
use may_minihttp::Request;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info, warn};

/// Parsed HTTP request data handed to the context builder.
///
/// Header keys are lowercased. The body is kept as raw bytes; JSON and form
/// parsing happen in the context builder, where failures are swallowed
/// rather than treated as transport errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ParsedRequest {
    /// Build a request by hand; the query string, when present, is split off
    /// the path and parsed. Intended for tests and embedding.
    #[must_use]
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let path = path_and_query
            .split('?')
            .next()
            .unwrap_or("/")
            .to_string();
        Self {
            method,
            path,
            headers: HashMap::new(),
            cookies: HashMap::new(),
            query_params: parse_query_params(path_and_query),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        if name.eq_ignore_ascii_case("cookie") {
            self.cookies = parse_cookies(&self.headers);
        }
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Parse cookies out of an already-lowercased header map.
#[must_use]
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse query string parameters from a URL path.
///
/// Extracts everything after the `?` character and URL-decodes parameter
/// names and values.
#[must_use]
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    if let Some(pos) = path.find('?') {
        let query_str = &path[pos + 1..];
        url::form_urlencoded::parse(query_str.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    } else {
        HashMap::new()
    }
}

/// Extract method, path, headers, cookies, query params and raw body from a
/// `may_minihttp` request.
#[must_use]
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = match req.method().parse::<Method>() {
        Ok(method) => method,
        Err(_) => {
            warn!(method = req.method(), "Unknown HTTP method, treating as GET");
            Method::GET
        }
    };
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    debug!(
        header_count = headers.len(),
        header_names = ?headers.keys().take(20).collect::<Vec<_>>(),
        "Headers extracted"
    );

    let cookies = parse_cookies(&headers);
    debug!(cookie_count = cookies.len(), "Cookies extracted");

    let query_params = parse_query_params(&raw_path);
    debug!(param_count = query_params.len(), "Query params parsed");

    let mut body = Vec::new();
    if let Err(err) = req.body().read_to_end(&mut body) {
        warn!(error = %err, "Failed to read request body, treating as empty");
        body.clear();
    }

    info!(
        method = %method,
        path = %path,
        headers_count = headers.len(),
        body_size_bytes = body.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        cookies,
        query_params,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookies() {
        let mut h = HashMap::new();
        h.insert("cookie".to_string(), "a=b; c=d".to_string());
        let cookies = parse_cookies(&h);
        assert_eq!(cookies.get("a"), Some(&"b".to_string()));
        assert_eq!(cookies.get("c"), Some(&"d".to_string()));
    }

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("/p?x=1&y=2");
        assert_eq!(q.get("x"), Some(&"1".to_string()));
        assert_eq!(q.get("y"), Some(&"2".to_string()));
    }

    #[test]
    fn test_builder_splits_query() {
        let parsed = ParsedRequest::new(Method::GET, "/users?limit=10");
        assert_eq!(parsed.path, "/users");
        assert_eq!(parsed.query_params.get("limit"), Some(&"10".to_string()));
    }
}
