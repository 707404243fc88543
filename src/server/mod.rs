//! HTTP transport adapter on `may_minihttp`: request parsing, the
//! `HttpService` implementation that drives the pipeline, and a thin server
//! wrapper.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_cookies, parse_query_params, parse_request, ParsedRequest};
pub use response::write_rendered;
pub use service::AppService;
