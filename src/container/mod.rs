//! # Container Module
//!
//! Factory-based dependency resolution: constructible types are registered
//! under a [`Lifetime`] policy and resolved recursively, with no runtime
//! reflection.
//!
//! ## Overview
//!
//! A binding maps a type to a factory; the factory receives a [`Resolver`]
//! and pulls its own dependencies with `resolver.resolve::<Dep>()`. Singleton
//! bindings construct exactly once and cache the instance for the process
//! lifetime; transient (and request, its documented alias) bindings
//! construct fresh on every resolution. A resolution chain that revisits a
//! type still under construction fails with
//! [`ContainerError::Circular`] instead of recursing forever.
//!
//! Re-binding a type replaces the previous binding rather than failing -
//! unlike the route registry, where a name collision is a hard error.

mod core;

pub use core::{Container, ContainerError, Lifetime, Resolver};
