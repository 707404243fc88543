//! Tests for the exception mapper: generic envelopes and user-registered
//! not-found/error controllers.

use http::Method;
use serde_json::{json, Value};
use std::sync::Arc;

use goshawk::container::Container;
use goshawk::context::{build_context, ExecutionContext, ResponseBuilder};
use goshawk::controller::Controller;
use goshawk::exception::Exception;
use goshawk::registration::RegistrationError;
use goshawk::registry::{Registry, RouteDefinition, RouteLookup};
use goshawk::server::{AppService, ParsedRequest};
use goshawk::App;

use tracing_util::TestTracing;

struct MissingPageController;

impl Controller for MissingPageController {
    fn action(&self, ctx: &mut ExecutionContext) -> Result<ResponseBuilder, Exception> {
        Ok(ResponseBuilder::json(
            json!({ "missing": ctx.request.path }),
            404,
        ))
    }
}

struct ErrorPageController;

impl Controller for ErrorPageController {
    fn action(&self, ctx: &mut ExecutionContext) -> Result<ResponseBuilder, Exception> {
        let message = ctx
            .exception
            .as_ref()
            .map(|exc| exc.message.clone())
            .unwrap_or_default();
        Ok(ResponseBuilder::json(
            json!({ "handled": true, "original": message }),
            500,
        ))
    }
}

struct BrokenTeapotController;

impl Controller for BrokenTeapotController {
    fn action(&self, _ctx: &mut ExecutionContext) -> Result<ResponseBuilder, Exception> {
        Err(Exception::new("kettle on fire").with_status(503))
    }
}

struct Unsuffixed;

impl Controller for Unsuffixed {
    fn action(&self, _ctx: &mut ExecutionContext) -> Result<ResponseBuilder, Exception> {
        Ok(ResponseBuilder::new())
    }
}

fn dispatch(service: &AppService, parsed: ParsedRequest) -> (u16, Value) {
    let ctx = match service.table.match_route(&parsed.method, &parsed.path) {
        RouteLookup::Found(matched) => build_context(
            &parsed,
            &matched.path_params,
            None,
            None,
            Some(matched.route),
        ),
        _ => build_context(&parsed, &[], None, None, None),
    };
    let rendered = service.pipeline.execute(ctx);
    let body: Value = serde_json::from_slice(&rendered.body).unwrap_or(Value::Null);
    (rendered.status, body)
}

#[test]
fn test_custom_not_found_controller_is_invoked() {
    let _tracing = TestTracing::init();
    let container = Arc::new(Container::new());
    let registry = Registry::new(Arc::clone(&container));

    let service = App::new(registry)
        .on_not_found::<MissingPageController, _>(|_| Ok(MissingPageController))
        .unwrap()
        .into_service();

    let (status, body) = dispatch(&service, ParsedRequest::new(Method::GET, "/lost"));
    assert_eq!(status, 404);
    assert_eq!(body["data"]["missing"], json!("/lost"));
    assert_eq!(body["success"], json!(false));
}

#[test]
fn test_custom_error_controller_sees_the_exception() {
    let _tracing = TestTracing::init();
    let container = Arc::new(Container::new());
    let mut registry = Registry::new(Arc::clone(&container));
    registry
        .add_route(
            RouteDefinition::get("/teapot")
                .name("teapot")
                .controller::<BrokenTeapotController, _>(|_| Ok(BrokenTeapotController)),
        )
        .unwrap();

    let service = App::new(registry)
        .on_error::<ErrorPageController, _>(|_| Ok(ErrorPageController))
        .unwrap()
        .into_service();

    let (status, body) = dispatch(&service, ParsedRequest::new(Method::GET, "/teapot"));
    assert_eq!(status, 500);
    assert_eq!(body["data"]["handled"], json!(true));
    assert_eq!(body["data"]["original"], json!("kettle on fire"));
}

#[test]
fn test_error_controller_does_not_swallow_not_found() {
    let _tracing = TestTracing::init();
    let container = Arc::new(Container::new());
    let registry = Registry::new(Arc::clone(&container));

    // Only an error controller is configured; 404s keep the generic shape.
    let service = App::new(registry)
        .on_error::<ErrorPageController, _>(|_| Ok(ErrorPageController))
        .unwrap()
        .into_service();

    let (status, body) = dispatch(&service, ParsedRequest::new(Method::GET, "/lost"));
    assert_eq!(status, 404);
    assert_eq!(body["data"], json!({}));
    assert_eq!(body["success"], json!(false));
}

#[test]
fn test_custom_handlers_enforce_controller_suffix() {
    let _tracing = TestTracing::init();
    let container = Arc::new(Container::new());
    let registry = Registry::new(Arc::clone(&container));

    let err = App::new(registry)
        .on_not_found::<Unsuffixed, _>(|_| Ok(Unsuffixed))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::NamingConvention {
            expected_suffix: "Controller",
            ..
        }
    ));
}
