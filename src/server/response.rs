use may_minihttp::Response;

use crate::context::RenderedResponse;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Write a rendered response onto the wire.
pub fn write_rendered(res: &mut Response, rendered: RenderedResponse) {
    res.status_code(rendered.status as usize, status_reason(rendered.status));
    for (name, value) in &rendered.headers {
        // may_minihttp takes &'static str headers; leak the formatted line
        let header = format!("{name}: {value}").into_boxed_str();
        res.header(Box::leak(header));
    }
    res.body_vec(rendered.body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(405), "Method Not Allowed");
        assert_eq!(status_reason(404), "Not Found");
    }
}
