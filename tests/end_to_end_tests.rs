//! End-to-end tests over a live server: register routes, start the
//! listener on a random port, speak raw HTTP and assert on the envelope.

use http::Method;
use serde_json::{json, Value};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use goshawk::container::{Container, Lifetime};
use goshawk::context::{ExecutionContext, ResponseBuilder};
use goshawk::controller::Controller;
use goshawk::exception::Exception;
use goshawk::middleware::{MiddlewareRef, MiddlewareStage, TraceMiddleware};
use goshawk::registration::{register_middleware, register_validator};
use goshawk::registry::{Registry, RouteDefinition};
use goshawk::server::ServerHandle;
use goshawk::validation::{FieldError, Validator};
use goshawk::App;

use tracing_util::TestTracing;

struct CreateUserController;

impl Controller for CreateUserController {
    fn action(&self, ctx: &mut ExecutionContext) -> Result<ResponseBuilder, Exception> {
        let name = ctx
            .request
            .payload
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(ResponseBuilder::json(json!({ "id": 1, "name": name }), 201))
    }
}

struct ListUsersController;

impl Controller for ListUsersController {
    fn action(&self, _ctx: &mut ExecutionContext) -> Result<ResponseBuilder, Exception> {
        Ok(ResponseBuilder::json(json!({ "users": [] }), 200))
    }
}

struct UserPayloadValidator;

impl Validator for UserPayloadValidator {
    fn validate(&self, data: &Value) -> Vec<FieldError> {
        let name = data.get("name").and_then(Value::as_str).unwrap_or("");
        if name.len() < 3 {
            vec![FieldError::new("name", json!(name)).constraint(
                "min_length",
                "name must be at least 3 characters",
            )]
        } else {
            Vec::new()
        }
    }
}

/// RAII server fixture: random port, ready-waited on construction, stopped
/// on drop.
struct TestServer {
    _tracing: TestTracing,
    handle: Option<ServerHandle>,
    addr: SocketAddr,
}

impl TestServer {
    fn start() -> Self {
        may::config().set_stack_size(0x8000);
        let tracing = TestTracing::init();

        let container = Arc::new(Container::new());
        register_validator::<UserPayloadValidator, _>(&container, Lifetime::Singleton, |_| {
            Ok(UserPayloadValidator)
        })
        .unwrap();
        register_middleware::<TraceMiddleware, _>(&container, Lifetime::Singleton, |_| {
            Ok(TraceMiddleware)
        })
        .unwrap();

        let mut registry = Registry::new(Arc::clone(&container));
        registry
            .add_route(
                RouteDefinition::post("/users")
                    .name("create_user")
                    .describe("Create a user from a JSON payload")
                    .payload_validator::<UserPayloadValidator>()
                    .controller::<CreateUserController, _>(|_| Ok(CreateUserController)),
            )
            .unwrap()
            .add_route(
                RouteDefinition::get("/users")
                    .name("list_users")
                    .controller::<ListUsersController, _>(|_| Ok(ListUsersController)),
            )
            .unwrap();

        registry.dump_routes();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = App::new(registry)
            .middleware(MiddlewareStage::Request, MiddlewareRef::of::<TraceMiddleware>())
            .middleware(MiddlewareStage::Response, MiddlewareRef::of::<TraceMiddleware>())
            .into_service();
        let handle = goshawk::server::HttpServer(service).start(addr).unwrap();
        handle.wait_ready().unwrap();

        Self {
            _tracing: tracing,
            handle: Some(handle),
            addr,
        }
    }

    fn request(&self, method: &str, path: &str, body: Option<&str>) -> (u16, Value) {
        let mut stream = TcpStream::connect(self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let mut raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
        if let Some(body) = body {
            raw.push_str(&format!(
                "Content-Type: application/json\r\nContent-Length: {}\r\n",
                body.len()
            ));
        }
        raw.push_str("\r\n");
        if let Some(body) = body {
            raw.push_str(body);
        }
        stream.write_all(raw.as_bytes()).unwrap();

        // Read until the body announced by Content-Length is complete;
        // keep-alive servers will not close the connection for us.
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(pos) = header_end(&buf) {
                        let headers = String::from_utf8_lossy(&buf[..pos]);
                        let content_length = headers
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                if name.eq_ignore_ascii_case("content-length") {
                                    value.trim().parse::<usize>().ok()
                                } else {
                                    None
                                }
                            })
                            .unwrap_or(0);
                        if buf.len() >= pos + 4 + content_length {
                            break;
                        }
                    }
                }
                Err(_) => break,
            }
        }
        let text = String::from_utf8_lossy(&buf);

        let status = text
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let body = text
            .split("\r\n\r\n")
            .nth(1)
            .and_then(|b| serde_json::from_str(b.trim()).ok())
            .unwrap_or(Value::Null);
        (status, body)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

#[test]
fn test_short_name_is_rejected_with_details() {
    let server = TestServer::start();

    let (status, body) = server.request("POST", "/users", Some(r#"{"name":"a"}"#));
    assert_eq!(status, 400);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("name must be at least 3 characters"));
    assert_eq!(body["data"]["details"][0]["property"], json!("name"));
    assert_eq!(body["path"], json!("/users"));
    assert_eq!(body["method"], json!("POST"));
}

#[test]
fn test_valid_payload_reaches_the_controller() {
    let server = TestServer::start();

    let (status, body) = server.request("POST", "/users", Some(r#"{"name":"alice"}"#));
    assert_eq!(status, 201);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["status"], json!(201));
    assert_eq!(body["data"], json!({ "id": 1, "name": "alice" }));
    assert_eq!(body["payload"], json!({ "name": "alice" }));
}

#[test]
fn test_shared_path_dispatches_by_method() {
    let server = TestServer::start();

    let (status, body) = server.request("GET", "/users", None);
    assert_eq!(status, 200);
    assert_eq!(body["data"]["users"], json!([]));
}

#[test]
fn test_unknown_path_renders_404_envelope() {
    let server = TestServer::start();

    let (status, body) = server.request("GET", "/unknown", None);
    assert_eq!(status, 404);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["path"], json!("/unknown"));
}

#[test]
fn test_known_path_wrong_method_renders_405() {
    let server = TestServer::start();

    let (status, body) = server.request("DELETE", "/users", None);
    assert_eq!(status, 405);
    assert_eq!(body["success"], json!(false));
}

#[test]
fn test_registry_lookup_by_name_survives_registration() {
    let _tracing = TestTracing::init();
    let container = Arc::new(Container::new());
    let mut registry = Registry::new(Arc::clone(&container));
    registry
        .add_route(
            RouteDefinition::post("/users")
                .name("create_user")
                .describe("Create a user")
                .controller::<CreateUserController, _>(|_| Ok(CreateUserController)),
        )
        .unwrap();

    let def = registry.find_by_name("create_user").unwrap();
    assert_eq!(def.method, Method::POST);
    assert_eq!(def.description, "Create a user");
}
