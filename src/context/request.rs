use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::multipart::UploadedFile;
use crate::ids::RequestId;

/// Negotiated language: ISO code plus optional region
/// (`en-US` -> `en` / `US`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Language {
    pub code: String,
    pub region: Option<String>,
}

impl Default for Language {
    fn default() -> Self {
        Self {
            code: "en".to_string(),
            region: None,
        }
    }
}

/// Pick the request language: an `X-Custom-Lang` header wins outright,
/// otherwise the highest-weighted `Accept-Language` entry.
#[must_use]
pub fn negotiate_language(custom: Option<&str>, accept: Option<&str>) -> Language {
    if let Some(code) = custom {
        let code = code.trim();
        if !code.is_empty() {
            return Language {
                code: code.to_string(),
                region: None,
            };
        }
    }

    let accept = match accept {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Language::default(),
    };

    let mut best: Option<(f64, &str)> = None;
    for entry in accept.split(',') {
        let mut parts = entry.trim().split(';');
        let tag = parts.next().unwrap_or("").trim();
        if tag.is_empty() || tag == "*" {
            continue;
        }
        let quality = parts
            .find_map(|p| p.trim().strip_prefix("q="))
            .and_then(|q| q.parse::<f64>().ok())
            .unwrap_or(1.0);
        // Strictly greater keeps the first entry on q ties, matching header order.
        if best.map_or(true, |(q, _)| quality > q) {
            best = Some((quality, tag));
        }
    }

    match best {
        Some((_, tag)) => {
            let mut pieces = tag.splitn(2, '-');
            let code = pieces.next().unwrap_or("en").to_string();
            let region = pieces.next().map(|r| r.to_string());
            Language { code, region }
        }
        None => Language::default(),
    }
}

/// Coerce a raw string parameter into a typed scalar: integer, float and
/// boolean literals become their JSON types, everything else stays a string.
#[must_use]
pub fn parse_scalar(value: &str) -> Value {
    if let Ok(n) = value.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(n) = value.parse::<f64>() {
        return Value::from(n);
    }
    if let Ok(b) = value.parse::<bool>() {
        return Value::from(b);
    }
    Value::String(value.to_string())
}

/// Read-only view of the inbound request consumed by middlewares, validators
/// and handlers.
///
/// Header keys are lowercased at parse time; lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct RequestView {
    pub id: RequestId,
    pub method: Method,
    pub path: String,
    pub(crate) headers: HashMap<String, String>,
    /// Path parameters, scalar-coerced (`"42"` -> `42`)
    pub params: Map<String, Value>,
    /// Parsed JSON body; an empty object when absent or unparseable
    pub payload: Value,
    /// Query string parameters, scalar-coerced
    pub queries: Map<String, Value>,
    pub cookies: HashMap<String, String>,
    /// Form fields from a multipart or urlencoded body
    pub form: HashMap<String, String>,
    /// Uploaded files from a multipart body
    pub files: Vec<UploadedFile>,
    pub ip: String,
    pub host: String,
    pub language: Language,
}

impl RequestView {
    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn referer(&self) -> Option<&str> {
        self.header("referer")
    }

    /// Token from an `Authorization: Bearer ...` header
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|auth| auth.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}
