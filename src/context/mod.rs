//! Per-request execution state: the read-only request view, the mutable
//! response builder, and the context bag threaded through pipeline stages.

mod build;
mod core;
mod multipart;
mod request;
mod response;

pub use build::build_context;
pub use core::ExecutionContext;
pub use multipart::{parse_form, UploadedFile};
pub use request::{negotiate_language, parse_scalar, Language, RequestView};
pub use response::{RenderedResponse, ResponseBuilder};
