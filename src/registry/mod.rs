//! # Registry Module
//!
//! The registry holds the build-time table of route definitions and the
//! compiled matcher used on the request path.
//!
//! ## Overview
//!
//! Registration happens once at start-up: each [`RouteDefinition`] names its
//! path template, method, handler type and optional roles, validators and
//! middlewares, and [`Registry::add_route`] enforces the registry-wide
//! invariants (globally unique route names, `Controller` type-name suffix)
//! before binding the handler into the dependency container. Registration
//! failures are fatal; the registry never reaches request handling in a
//! partially registered state.
//!
//! ## Two-phase matching
//!
//! 1. **Compilation**: once registration finishes, [`RouteTable::compile`]
//!    converts every path template (`/pets/{id}`) into a regex matcher with
//!    named parameter slots.
//! 2. **Matching**: each incoming request is tested against the compiled
//!    entries; a hit yields a [`RouteMatch`] with extracted path parameters,
//!    a path that only exists under other methods reports
//!    [`RouteLookup::MethodMismatch`] so the pipeline can answer 405.

mod core;
mod matcher;
#[cfg(test)]
mod tests;

pub use core::{HandlerRef, Registry, RouteDefinition};
pub use matcher::{ParamVec, RouteLookup, RouteMatch, RouteTable, MAX_INLINE_PARAMS};
