use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::core::{Registry, RouteDefinition};

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have <=4 path params (e.g., /users/{id}/posts/{post_id}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the static route table
/// built at start-up; values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request path to a route definition.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteDefinition>,
    /// Path parameters extracted from the URL (e.g., `{id}` -> `("id", "123")`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name.
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths, returns the last occurrence.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to a HashMap. This allocates; prefer
    /// `get_path_param` on the hot path.
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Outcome of a request-time lookup.
#[derive(Debug, Clone)]
pub enum RouteLookup {
    Found(RouteMatch),
    /// The path is registered but not for this method (renders as 405)
    MethodMismatch { allowed: Vec<Method> },
    NotFound,
}

/// Compiled path -> method -> handler table, built once from the registry
/// after registration finishes and shared read-only across request
/// coroutines.
pub struct RouteTable {
    entries: Vec<(Method, Regex, Arc<RouteDefinition>, Vec<Arc<str>>)>,
}

impl RouteTable {
    /// Compile every registered definition into a regex matcher.
    #[must_use]
    pub fn compile(registry: &Registry) -> Self {
        let mut entries = Vec::new();
        for defs in registry.routes().values() {
            for def in defs {
                let (regex, param_names) = Self::path_to_regex(&def.path);
                entries.push((
                    def.method.clone(),
                    regex,
                    Arc::new(def.clone()),
                    param_names,
                ));
            }
        }

        let routes_summary: Vec<String> = entries
            .iter()
            .take(10)
            .map(|(method, _, def, _)| format!("{} {}", method, def.path))
            .collect();
        info!(
            routes_count = entries.len(),
            routes_summary = ?routes_summary,
            "Routing table compiled"
        );

        Self { entries }
    }

    /// Match an HTTP request to a route.
    ///
    /// Distinguishes "no such path" from "path exists under other methods" so
    /// the pipeline can answer 404 and 405 respectively.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> RouteLookup {
        debug!(method = %method, path = %path, "Route match attempt");

        let mut allowed: Vec<Method> = Vec::new();
        for (entry_method, regex, def, param_names) in &self.entries {
            let Some(caps) = regex.captures(path) else {
                continue;
            };
            if entry_method != method {
                if !allowed.contains(entry_method) {
                    allowed.push(entry_method.clone());
                }
                continue;
            }

            let mut path_params = ParamVec::new();
            for (idx, name) in param_names.iter().enumerate() {
                if let Some(value) = caps.get(idx + 1) {
                    path_params.push((Arc::clone(name), value.as_str().to_string()));
                }
            }

            info!(
                method = %method,
                path = %path,
                route_name = %def.name,
                route_pattern = %def.path,
                path_params = ?path_params,
                "Route matched"
            );
            return RouteLookup::Found(RouteMatch {
                route: Arc::clone(def),
                path_params,
            });
        }

        if !allowed.is_empty() {
            warn!(
                method = %method,
                path = %path,
                allowed = ?allowed,
                "Path registered under other methods"
            );
            return RouteLookup::MethodMismatch { allowed };
        }

        warn!(method = %method, path = %path, "No route matched");
        RouteLookup::NotFound
    }

    /// Convert a path template to a regex and extract parameter names.
    ///
    /// `/users/{id}` becomes `^/users/([^/]+)$` with parameter names `["id"]`.
    pub(crate) fn path_to_regex(path: &str) -> (Regex, Vec<Arc<str>>) {
        if path == "/" {
            return (
                Regex::new(r"^/$").expect("Failed to compile path regex"),
                Vec::new(),
            );
        }

        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/') {
            if segment.starts_with('{') && segment.ends_with('}') {
                let param_name = segment.trim_start_matches('{').trim_end_matches('}');
                pattern.push_str("/([^/]+)");
                param_names.push(Arc::from(param_name));
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(segment);
            }
        }

        pattern.push('$');
        let regex = Regex::new(&pattern).expect("Failed to compile path regex");

        (regex, param_names)
    }
}
