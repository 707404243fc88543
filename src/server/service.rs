use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;

use super::request::parse_request;
use super::response::write_rendered;
use crate::context::build_context;
use crate::exception::Exception;
use crate::pipeline::Pipeline;
use crate::registry::{RouteLookup, RouteTable};

/// `HttpService` implementation driving one request through match, context
/// assembly and the pipeline.
///
/// One instance is cloned per connection coroutine; the compiled route table
/// and pipeline are shared read-only behind `Arc`s.
#[derive(Clone)]
pub struct AppService {
    pub table: Arc<RouteTable>,
    pub pipeline: Arc<Pipeline>,
}

impl AppService {
    #[must_use]
    pub fn new(table: Arc<RouteTable>, pipeline: Arc<Pipeline>) -> Self {
        Self { table, pipeline }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);
        // may_minihttp does not surface the peer address; a forwarding proxy
        // supplies it instead.
        let forwarded_ip = parsed
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string());

        let rendered = match self.table.match_route(&parsed.method, &parsed.path) {
            RouteLookup::Found(matched) => {
                let ctx = build_context(
                    &parsed,
                    &matched.path_params,
                    None,
                    forwarded_ip.as_deref(),
                    Some(matched.route),
                );
                self.pipeline.execute(ctx)
            }
            RouteLookup::MethodMismatch { allowed } => {
                let ctx = build_context(&parsed, &[], None, forwarded_ip.as_deref(), None);
                let allowed: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
                self.pipeline.fail(
                    &ctx.request,
                    Exception::method_not_allowed(format!(
                        "{} is not allowed on {} (allowed: {})",
                        parsed.method,
                        parsed.path,
                        allowed.join(", ")
                    )),
                )
            }
            RouteLookup::NotFound => {
                // The pipeline raises the not-found exception itself on a
                // route-less context, so custom not-found controllers apply.
                let ctx = build_context(&parsed, &[], None, forwarded_ip.as_deref(), None);
                self.pipeline.execute(ctx)
            }
        };

        write_rendered(res, rendered);
        Ok(())
    }
}
