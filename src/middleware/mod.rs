mod core;
mod trace;

pub use core::{Flow, Middleware, MiddlewareRef, MiddlewareStage};
pub use trace::TraceMiddleware;
