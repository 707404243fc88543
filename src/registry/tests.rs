use http::Method;
use serde_json::json;
use std::sync::Arc;

use super::core::{Registry, RouteDefinition};
use super::matcher::{RouteLookup, RouteTable};
use crate::container::{Container, Lifetime};
use crate::context::{ExecutionContext, ResponseBuilder};
use crate::controller::Controller;
use crate::exception::Exception;
use crate::registration::RegistrationError;

struct EchoController;

impl Controller for EchoController {
    fn action(&self, ctx: &mut ExecutionContext) -> Result<ResponseBuilder, Exception> {
        Ok(ResponseBuilder::json(
            json!({ "path": ctx.request.path }),
            200,
        ))
    }
}

struct Unsuffixed;

impl Controller for Unsuffixed {
    fn action(&self, _ctx: &mut ExecutionContext) -> Result<ResponseBuilder, Exception> {
        Ok(ResponseBuilder::new())
    }
}

fn registry() -> Registry {
    Registry::new(Arc::new(Container::new()))
}

fn echo_route(method: Method, path: &str, name: &str) -> RouteDefinition {
    let def = if method == Method::POST {
        RouteDefinition::post(path)
    } else if method == Method::PUT {
        RouteDefinition::put(path)
    } else {
        RouteDefinition::get(path)
    };
    def.name(name).controller::<EchoController, _>(|_| Ok(EchoController))
}

#[test]
fn test_duplicate_name_fails_and_leaves_registry_untouched() {
    let mut registry = registry();
    registry
        .add_route(echo_route(Method::GET, "/pets", "list_pets"))
        .unwrap();

    let err = registry
        .add_route(echo_route(Method::POST, "/pets/other", "list_pets"))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::DuplicateRouteName { .. }));

    // No partial registration: the failing path never appeared.
    assert!(registry.find_by_path("/pets/other").is_none());
    assert_eq!(registry.find_by_path("/pets").unwrap().len(), 1);
}

#[test]
fn test_same_path_different_methods_coexist() {
    let mut registry = registry();
    registry
        .add_route(echo_route(Method::GET, "/pets", "list_pets"))
        .unwrap()
        .add_route(echo_route(Method::POST, "/pets", "create_pet"))
        .unwrap();

    let defs = registry.find_by_path("/pets").unwrap();
    assert_eq!(defs.len(), 2);
    assert_eq!(defs[0].method, Method::GET);
    assert_eq!(defs[1].method, Method::POST);
}

#[test]
fn test_find_by_name_scans_all_paths() {
    let mut registry = registry();
    registry
        .add_route(echo_route(Method::GET, "/pets", "list_pets"))
        .unwrap()
        .add_route(echo_route(Method::GET, "/users", "list_users"))
        .unwrap();

    let def = registry.find_by_name("list_users").unwrap();
    assert_eq!(def.path, "/users");
    assert!(registry.find_by_name("missing").is_none());
}

#[test]
fn test_add_route_binds_handler_as_singleton_by_default() {
    let container = Arc::new(Container::new());
    let mut registry = Registry::new(Arc::clone(&container));
    registry
        .add_route(echo_route(Method::GET, "/pets", "list_pets"))
        .unwrap();

    let a = container.resolve::<EchoController>().unwrap();
    let b = container.resolve::<EchoController>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_add_route_respects_explicit_scope() {
    let container = Arc::new(Container::new());
    let mut registry = Registry::new(Arc::clone(&container));
    registry
        .add_route(
            RouteDefinition::get("/pets")
                .name("list_pets")
                .scope(Lifetime::Transient)
                .controller::<EchoController, _>(|_| Ok(EchoController)),
        )
        .unwrap();

    let a = container.resolve::<EchoController>().unwrap();
    let b = container.resolve::<EchoController>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_handler_without_controller_suffix_is_rejected() {
    let mut registry = registry();
    let err = registry
        .add_route(
            RouteDefinition::get("/x")
                .name("x")
                .controller::<Unsuffixed, _>(|_| Ok(Unsuffixed)),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::NamingConvention {
            expected_suffix: "Controller",
            ..
        }
    ));
}

#[test]
fn test_route_without_handler_is_rejected() {
    let mut registry = registry();
    let err = registry
        .add_route(RouteDefinition::get("/x").name("x"))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::MissingHandler { .. }));
}

#[test]
fn test_route_names_default_to_generated_ids() {
    let mut registry = registry();
    registry
        .add_route(
            RouteDefinition::get("/a").controller::<EchoController, _>(|_| Ok(EchoController)),
        )
        .unwrap()
        .add_route(
            RouteDefinition::get("/b").controller::<EchoController, _>(|_| Ok(EchoController)),
        )
        .unwrap();
    // Two generated names, no collision.
    assert_eq!(registry.routes().len(), 2);
}

#[test]
fn test_table_extracts_path_params() {
    let mut registry = registry();
    registry
        .add_route(echo_route(Method::GET, "/users/{user_id}/posts/{post_id}", "get_post"))
        .unwrap();

    let table = RouteTable::compile(&registry);
    match table.match_route(&Method::GET, "/users/7/posts/42") {
        RouteLookup::Found(m) => {
            assert_eq!(m.get_path_param("user_id"), Some("7"));
            assert_eq!(m.get_path_param("post_id"), Some("42"));
            assert_eq!(m.route.name, "get_post");
        }
        other => panic!("expected match, got {other:?}"),
    }
}

#[test]
fn test_table_reports_method_mismatch() {
    let mut registry = registry();
    registry
        .add_route(echo_route(Method::GET, "/pets", "list_pets"))
        .unwrap();

    let table = RouteTable::compile(&registry);
    match table.match_route(&Method::PUT, "/pets") {
        RouteLookup::MethodMismatch { allowed } => {
            assert_eq!(allowed, vec![Method::GET]);
        }
        other => panic!("expected method mismatch, got {other:?}"),
    }
}

#[test]
fn test_table_reports_not_found() {
    let registry = registry();
    let table = RouteTable::compile(&registry);
    assert!(matches!(
        table.match_route(&Method::GET, "/nowhere"),
        RouteLookup::NotFound
    ));
}

#[test]
fn test_root_path_matches_exactly() {
    let mut registry = registry();
    registry
        .add_route(echo_route(Method::GET, "/", "root"))
        .unwrap();

    let table = RouteTable::compile(&registry);
    assert!(matches!(
        table.match_route(&Method::GET, "/"),
        RouteLookup::Found(_)
    ));
    assert!(matches!(
        table.match_route(&Method::GET, "/other"),
        RouteLookup::NotFound
    ));
}

#[test]
fn test_path_to_regex_segments() {
    let (regex, params) = RouteTable::path_to_regex("/users/{id}");
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].as_ref(), "id");
    assert!(regex.is_match("/users/123"));
    assert!(!regex.is_match("/users/123/extra"));
}
