//! Typed registration calls for every registrable kind.
//!
//! Each function checks the type-name suffix its kind demands and binds the
//! type into the container under the given lifetime. Violations are
//! registration-time fatal errors: they abort start-up and are never
//! surfaced to request-time callers.

use std::fmt;

use crate::container::{Container, ContainerError, Lifetime, Resolver};
use crate::controller::Controller;
use crate::middleware::Middleware;
use crate::validation::Validator;

/// Start-up-time wiring failure. Fatal: the process must not begin accepting
/// traffic after one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A route with this name already exists in the registry
    DuplicateRouteName { name: String },
    /// A type was registered through a kind whose naming convention it breaks
    NamingConvention {
        kind: &'static str,
        type_name: &'static str,
        expected_suffix: &'static str,
    },
    /// A route reached the registry without a controller
    MissingHandler { name: String },
    Container(ContainerError),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::DuplicateRouteName { name } => {
                write!(f, "route with name '{}' already exists", name)
            }
            RegistrationError::NamingConvention {
                kind,
                type_name,
                expected_suffix,
            } => {
                write!(
                    f,
                    "{} registration rejected: '{}' must end with the '{}' suffix",
                    kind, type_name, expected_suffix
                )
            }
            RegistrationError::MissingHandler { name } => {
                write!(f, "route '{}' has no controller attached", name)
            }
            RegistrationError::Container(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RegistrationError {}

impl From<ContainerError> for RegistrationError {
    fn from(err: ContainerError) -> Self {
        RegistrationError::Container(err)
    }
}

/// Last path segment of a fully qualified type name.
#[must_use]
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}

/// Enforce a kind's type-name suffix.
pub(crate) fn ensure_suffix(
    kind: &'static str,
    type_name: &'static str,
    expected_suffix: &'static str,
) -> Result<(), RegistrationError> {
    if short_type_name(type_name).ends_with(expected_suffix) {
        Ok(())
    } else {
        Err(RegistrationError::NamingConvention {
            kind,
            type_name,
            expected_suffix,
        })
    }
}

macro_rules! plain_registration {
    ($(#[$doc:meta])* $fn_name:ident, $kind:literal, $suffix:literal) => {
        $(#[$doc])*
        pub fn $fn_name<T, F>(
            container: &Container,
            lifetime: Lifetime,
            factory: F,
        ) -> Result<(), RegistrationError>
        where
            T: Send + Sync + 'static,
            F: Fn(&Resolver<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
        {
            ensure_suffix($kind, std::any::type_name::<T>(), $suffix)?;
            container.bind::<T, F>(lifetime, factory);
            Ok(())
        }
    };
}

/// Register a route handler type; its name must end in `Controller`.
pub fn register_controller<C, F>(
    container: &Container,
    lifetime: Lifetime,
    factory: F,
) -> Result<(), RegistrationError>
where
    C: Controller + 'static,
    F: Fn(&Resolver<'_>) -> Result<C, ContainerError> + Send + Sync + 'static,
{
    ensure_suffix("controller", std::any::type_name::<C>(), "Controller")?;
    container.bind::<C, F>(lifetime, factory);
    Ok(())
}

/// Register a middleware type; its name must end in `Middleware`.
pub fn register_middleware<M, F>(
    container: &Container,
    lifetime: Lifetime,
    factory: F,
) -> Result<(), RegistrationError>
where
    M: Middleware + 'static,
    F: Fn(&Resolver<'_>) -> Result<M, ContainerError> + Send + Sync + 'static,
{
    ensure_suffix("middleware", std::any::type_name::<M>(), "Middleware")?;
    container.bind::<M, F>(lifetime, factory);
    Ok(())
}

/// Register a validator type; its name must end in `Validator`.
pub fn register_validator<V, F>(
    container: &Container,
    lifetime: Lifetime,
    factory: F,
) -> Result<(), RegistrationError>
where
    V: Validator + 'static,
    F: Fn(&Resolver<'_>) -> Result<V, ContainerError> + Send + Sync + 'static,
{
    ensure_suffix("validator", std::any::type_name::<V>(), "Validator")?;
    container.bind::<V, F>(lifetime, factory);
    Ok(())
}

plain_registration!(
    /// Register a configuration type; its name must end in `Config`.
    register_config, "config", "Config"
);
plain_registration!(
    /// Register a service type; its name must end in `Service`.
    register_service, "service", "Service"
);
plain_registration!(
    /// Register a database type; its name must end in `Database`.
    register_database, "database", "Database"
);
plain_registration!(
    /// Register a mailer type; its name must end in `Mailer`.
    register_mailer, "mailer", "Mailer"
);
plain_registration!(
    /// Register a role provider type; its name must end in `Role`.
    register_role, "role", "Role"
);
plain_registration!(
    /// Register a repository type; its name must end in `Repository`.
    register_repository, "repository", "Repository"
);
plain_registration!(
    /// Register a model type; its name must end in `Model`.
    register_model, "model", "Model"
);
plain_registration!(
    /// Register a storage backend type; its name must end in `Storage`.
    register_storage, "storage", "Storage"
);
