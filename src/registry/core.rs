use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::container::{Container, ContainerError, Lifetime, Resolver};
use crate::controller::Controller;
use crate::middleware::{MiddlewareRef, MiddlewareStage};
use crate::registration::{ensure_suffix, RegistrationError};
use crate::validation::{ValidationStage, ValidatorRef};

/// Reference to a route's handler type: carries the closures that bind the
/// concrete type into the container and resolve it back as a trait object.
#[derive(Clone)]
pub struct HandlerRef {
    pub type_name: &'static str,
    bind: Arc<dyn Fn(&Container, Lifetime) -> bool + Send + Sync>,
    resolve: Arc<dyn Fn(&Container) -> Result<Arc<dyn Controller>, ContainerError> + Send + Sync>,
}

impl HandlerRef {
    #[must_use]
    pub fn of<C, F>(factory: F) -> Self
    where
        C: Controller + 'static,
        F: Fn(&Resolver<'_>) -> Result<C, ContainerError> + Send + Sync + 'static,
    {
        let factory = Arc::new(factory);
        Self {
            type_name: std::any::type_name::<C>(),
            bind: Arc::new(move |container, lifetime| {
                let factory = Arc::clone(&factory);
                container.bind_if_absent::<C, _>(lifetime, move |resolver| (*factory)(resolver))
            }),
            resolve: Arc::new(|container| {
                container
                    .resolve::<C>()
                    .map(|instance| instance as Arc<dyn Controller>)
            }),
        }
    }

    /// Bind the handler type unless already bound; returns `true` when the
    /// binding was added.
    pub(crate) fn bind(&self, container: &Container, lifetime: Lifetime) -> bool {
        (*self.bind)(container, lifetime)
    }

    pub fn resolve(&self, container: &Container) -> Result<Arc<dyn Controller>, ContainerError> {
        (*self.resolve)(container)
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRef")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// One registered route: a (path, method) pair bound to a handler plus
/// optional roles, validators and middlewares.
///
/// Built fluently and handed to [`Registry::add_route`]:
///
/// ```rust,ignore
/// RouteDefinition::post("/users")
///     .name("create_user")
///     .controller::<CreateUserController, _>(|_| Ok(CreateUserController::new()))
///     .payload_validator::<CreateUserValidator>()
///     .request_middleware::<SessionMiddleware>()
/// ```
#[derive(Clone)]
pub struct RouteDefinition {
    /// Unique across the whole registry; defaults to a generated ULID
    pub name: String,
    pub path: String,
    pub method: Method,
    pub description: String,
    /// Allowed role identifiers; empty means no role check
    pub roles: Vec<String>,
    pub(crate) handler: Option<HandlerRef>,
    /// Container lifetime the handler is bound under (singleton by default)
    pub(crate) scope: Lifetime,
    validators: HashMap<ValidationStage, Vec<ValidatorRef>>,
    middlewares: HashMap<MiddlewareStage, Vec<MiddlewareRef>>,
}

impl RouteDefinition {
    fn route(method: Method, path: impl Into<String>) -> Self {
        Self {
            name: ulid::Ulid::new().to_string(),
            path: path.into(),
            method,
            description: String::new(),
            roles: Vec::new(),
            handler: None,
            scope: Lifetime::Singleton,
            validators: HashMap::new(),
            middlewares: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::route(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::route(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::route(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::route(Method::DELETE, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::route(Method::PATCH, path)
    }

    #[must_use]
    pub fn options(path: impl Into<String>) -> Self {
        Self::route(Method::OPTIONS, path)
    }

    #[must_use]
    pub fn head(path: impl Into<String>) -> Self {
        Self::route(Method::HEAD, path)
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Container lifetime for the handler binding created by
    /// [`Registry::add_route`].
    #[must_use]
    pub fn scope(mut self, lifetime: Lifetime) -> Self {
        self.scope = lifetime;
        self
    }

    /// Attach the handler type and its factory.
    #[must_use]
    pub fn controller<C, F>(mut self, factory: F) -> Self
    where
        C: Controller + 'static,
        F: Fn(&Resolver<'_>) -> Result<C, ContainerError> + Send + Sync + 'static,
    {
        self.handler = Some(HandlerRef::of::<C, F>(factory));
        self
    }

    #[must_use]
    pub fn params_validator<V: crate::validation::Validator + 'static>(self) -> Self {
        self.validator::<V>(ValidationStage::Params)
    }

    #[must_use]
    pub fn payload_validator<V: crate::validation::Validator + 'static>(self) -> Self {
        self.validator::<V>(ValidationStage::Payload)
    }

    #[must_use]
    pub fn queries_validator<V: crate::validation::Validator + 'static>(self) -> Self {
        self.validator::<V>(ValidationStage::Queries)
    }

    #[must_use]
    pub fn response_validator<V: crate::validation::Validator + 'static>(self) -> Self {
        self.validator::<V>(ValidationStage::Response)
    }

    #[must_use]
    pub fn validator<V: crate::validation::Validator + 'static>(
        mut self,
        stage: ValidationStage,
    ) -> Self {
        self.validators
            .entry(stage)
            .or_default()
            .push(ValidatorRef::of::<V>());
        self
    }

    #[must_use]
    pub fn request_middleware<M: crate::middleware::Middleware + 'static>(self) -> Self {
        self.middleware::<M>(MiddlewareStage::Request)
    }

    #[must_use]
    pub fn response_middleware<M: crate::middleware::Middleware + 'static>(self) -> Self {
        self.middleware::<M>(MiddlewareStage::Response)
    }

    #[must_use]
    pub fn middleware<M: crate::middleware::Middleware + 'static>(
        mut self,
        stage: MiddlewareStage,
    ) -> Self {
        self.middlewares
            .entry(stage)
            .or_default()
            .push(MiddlewareRef::of::<M>());
        self
    }

    #[must_use]
    pub fn handler(&self) -> Option<&HandlerRef> {
        self.handler.as_ref()
    }

    /// Validators attached to a stage, in attachment order.
    #[must_use]
    pub fn validators(&self, stage: ValidationStage) -> &[ValidatorRef] {
        self.validators.get(&stage).map_or(&[], Vec::as_slice)
    }

    /// Middlewares attached to a stage, in attachment order.
    #[must_use]
    pub fn middlewares(&self, stage: MiddlewareStage) -> &[MiddlewareRef] {
        self.middlewares.get(&stage).map_or(&[], Vec::as_slice)
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("method", &self.method)
            .field("handler", &self.handler.as_ref().map(|h| h.type_name))
            .field("roles", &self.roles)
            .finish()
    }
}

/// Table of path -> route definitions, built incrementally at start-up and
/// read-only during request handling. Entries are never removed.
pub struct Registry {
    container: Arc<Container>,
    routes: HashMap<String, Vec<RouteDefinition>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl Registry {
    #[must_use]
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            routes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Register a route.
    ///
    /// Scans every existing definition for a name collision, enforces the
    /// `Controller` suffix on the handler type, then appends the definition
    /// to its path's list and binds the handler into the container
    /// (singleton lifetime unless the route says otherwise, skipped when the
    /// type is already bound). Returns `&mut Self` for chained registration.
    ///
    /// # Errors
    ///
    /// Fails without mutating the registry: `DuplicateRouteName`,
    /// `MissingHandler`, or `NamingConvention`. These are fatal at start-up
    /// time; do not start accepting traffic after one.
    pub fn add_route(&mut self, def: RouteDefinition) -> Result<&mut Self, RegistrationError> {
        let collision = self
            .routes
            .values()
            .flatten()
            .any(|existing| existing.name == def.name);
        if collision {
            return Err(RegistrationError::DuplicateRouteName {
                name: def.name,
            });
        }

        let handler = def
            .handler
            .as_ref()
            .ok_or_else(|| RegistrationError::MissingHandler {
                name: def.name.clone(),
            })?;
        ensure_suffix("controller", handler.type_name, "Controller")?;

        let bound = handler.bind(&self.container, def.scope);
        info!(
            name = %def.name,
            method = %def.method,
            path = %def.path,
            handler = handler.type_name,
            handler_bound = bound,
            "Route registered"
        );

        self.routes.entry(def.path.clone()).or_default().push(def);
        Ok(self)
    }

    /// All definitions registered under a path, in registration order.
    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<&[RouteDefinition]> {
        self.routes.get(path).map(Vec::as_slice)
    }

    /// Linear scan across all paths. Registration happens once at start-up
    /// and name lookups are infrequent; the request path goes through the
    /// compiled [`super::RouteTable`] instead.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&RouteDefinition> {
        self.routes
            .values()
            .flatten()
            .find(|def| def.name == name)
    }

    /// The full path -> definitions mapping, read-only.
    #[must_use]
    pub fn routes(&self) -> &HashMap<String, Vec<RouteDefinition>> {
        &self.routes
    }

    /// Print all registered routes to stdout.
    pub fn dump_routes(&self) {
        let count: usize = self.routes.values().map(Vec::len).sum();
        println!("[routes] count={count}");
        for defs in self.routes.values() {
            for def in defs {
                println!(
                    "[route] {} {} -> {} ({})",
                    def.method,
                    def.path,
                    def.handler.as_ref().map_or("<none>", |h| h.type_name),
                    def.name
                );
            }
        }
    }
}
