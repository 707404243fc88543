//! # Goshawk
//!
//! **Goshawk** is a coroutine-powered HTTP request-dispatch core for Rust:
//! a route registry, a dependency-resolution container, and a layered
//! request pipeline running on the `may` runtime over `may_minihttp`.
//!
//! ## Overview
//!
//! Routes are registered explicitly at start-up against a [`registry::Registry`];
//! handlers, middlewares and validators are constructible types wired through
//! the [`container::Container`]. At request time the compiled
//! [`registry::RouteTable`] resolves the target definition, the context
//! builder assembles a fresh [`context::ExecutionContext`], and the
//! [`pipeline::Pipeline`] drives it through a fixed stage order before
//! rendering the uniform JSON envelope.
//!
//! ## Architecture
//!
//! - **[`container`]** - factory-based dependency bindings with
//!   singleton/transient/request lifetimes, recursive resolution and cycle
//!   detection
//! - **[`registry`]** - the route table: unique-by-name definitions plus the
//!   compiled regex matcher used on the hot path
//! - **[`context`]** - per-request state: read-only request view, mutable
//!   response builder, uploaded files, negotiated language
//! - **[`pipeline`]** - the stage machine: middlewares, role check,
//!   validators, handler invocation, exception mapping
//! - **[`registration`]** - typed registration calls enforcing per-kind
//!   naming conventions at start-up
//! - **[`server`]** - the `may_minihttp` transport adapter
//! - **[`middleware`]** / **[`validation`]** / **[`security`]** /
//!   **[`storage`]** - the contracts cross-cutting types implement
//!
//! ## Request flow
//!
//! 1. The transport parses the raw request and matches it against the
//!    compiled table (404 for unknown paths, 405 for known paths under other
//!    methods).
//! 2. The context builder produces an [`context::ExecutionContext`]: parse
//!    failures for body and form are swallowed into empty values, the
//!    response builder starts at 200 seeded with the request's cookies.
//! 3. The pipeline runs global then route request middlewares (each may
//!    short-circuit with a ready response), checks roles, runs
//!    params/payload/queries validators, resolves the controller through the
//!    container and invokes it, validates the response payload, runs
//!    response middlewares, and renders.
//! 4. Every failure - typed exception or panic - is mapped exactly once into
//!    the JSON envelope; a request coroutine never crashes on an uncaught
//!    error.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use goshawk::{App, Container, Registry, RouteDefinition};
//!
//! let container = Arc::new(Container::new());
//! let mut registry = Registry::new(Arc::clone(&container));
//! registry.add_route(
//!     RouteDefinition::get("/pets/{id}")
//!         .name("get_pet")
//!         .controller::<GetPetController, _>(|_| Ok(GetPetController::default())),
//! )?;
//!
//! let handle = App::new(registry).port(8080).run()?;
//! handle.join().unwrap();
//! ```
//!
//! ## Runtime considerations
//!
//! Goshawk uses the `may` coroutine runtime, not tokio. Each inbound request
//! drives one coroutine through the pipeline stages sequentially; contexts
//! are never shared across requests. The only cross-request shared state is
//! the container's singleton cache (race-free per-binding initialization)
//! and the frozen route table. Stack size is configurable via
//! `GOSHAWK_STACK_SIZE`.

pub mod app;
pub mod container;
pub mod context;
pub mod controller;
pub mod exception;
pub mod ids;
pub mod middleware;
pub mod pipeline;
pub mod registration;
pub mod registry;
pub mod runtime_config;
pub mod security;
pub mod server;
pub mod storage;
pub mod validation;

pub use app::{init_tracing, App};
pub use container::{Container, ContainerError, Lifetime, Resolver};
pub use context::{build_context, ExecutionContext, RenderedResponse, RequestView, ResponseBuilder};
pub use controller::Controller;
pub use exception::Exception;
pub use middleware::{Flow, Middleware, MiddlewareRef, MiddlewareStage, TraceMiddleware};
pub use registration::RegistrationError;
pub use registry::{Registry, RouteDefinition, RouteTable};
pub use security::Principal;
pub use validation::{Constraint, FieldError, ValidationStage, Validator, ValidatorRef};
