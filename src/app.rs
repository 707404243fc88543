use std::io;
use std::sync::Arc;
use tracing::info;

use crate::container::{ContainerError, Lifetime, Resolver};
use crate::controller::Controller;
use crate::middleware::{MiddlewareRef, MiddlewareStage};
use crate::pipeline::Pipeline;
use crate::registration::{ensure_suffix, RegistrationError};
use crate::registry::{HandlerRef, Registry, RouteTable};
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer, ServerHandle};

/// Install a process-global tracing subscriber honoring `RUST_LOG`.
///
/// Call once at start-up before [`App::run`]; repeated calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .try_init();
}

/// Application configuration: the registry plus everything that wraps it -
/// bind address, global middlewares, and the custom not-found/error
/// controllers.
///
/// ```rust,ignore
/// let container = Arc::new(Container::new());
/// let mut registry = Registry::new(Arc::clone(&container));
/// registry.add_route(
///     RouteDefinition::post("/users")
///         .name("create_user")
///         .controller::<CreateUserController, _>(|_| Ok(CreateUserController::new())),
/// )?;
///
/// App::new(registry)
///     .hostname("0.0.0.0")
///     .port(8080)
///     .middleware(MiddlewareStage::Request, MiddlewareRef::of::<TraceMiddleware>())
///     .run()?;
/// ```
pub struct App {
    hostname: String,
    port: u16,
    registry: Registry,
    pipeline: Pipeline,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl App {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        let container = Arc::clone(registry.container());
        Self {
            hostname: "0.0.0.0".to_string(),
            port: 80,
            registry,
            pipeline: Pipeline::new(container),
        }
    }

    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Append a global middleware; stages execute in registration order.
    #[must_use]
    pub fn middleware(mut self, stage: MiddlewareStage, middleware: MiddlewareRef) -> Self {
        self.pipeline.add_global_middleware(stage, middleware);
        self
    }

    /// Controller invoked for unmatched paths instead of the generic 404
    /// envelope. Start-up fatal when the type name lacks the `Controller`
    /// suffix.
    pub fn on_not_found<C, F>(mut self, factory: F) -> Result<Self, RegistrationError>
    where
        C: Controller + 'static,
        F: Fn(&Resolver<'_>) -> Result<C, ContainerError> + Send + Sync + 'static,
    {
        let handler = HandlerRef::of::<C, F>(factory);
        ensure_suffix("controller", handler.type_name, "Controller")?;
        handler.bind(self.registry.container(), Lifetime::Singleton);
        self.pipeline.set_not_found_handler(handler);
        Ok(self)
    }

    /// Controller invoked on the error path instead of the generic envelope.
    /// Start-up fatal when the type name lacks the `Controller` suffix.
    pub fn on_error<C, F>(mut self, factory: F) -> Result<Self, RegistrationError>
    where
        C: Controller + 'static,
        F: Fn(&Resolver<'_>) -> Result<C, ContainerError> + Send + Sync + 'static,
    {
        let handler = HandlerRef::of::<C, F>(factory);
        ensure_suffix("controller", handler.type_name, "Controller")?;
        handler.bind(self.registry.container(), Lifetime::Singleton);
        self.pipeline.set_error_handler(handler);
        Ok(self)
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Freeze the registry into a compiled route table and produce the
    /// transport service. Registration is over once this runs.
    #[must_use]
    pub fn into_service(self) -> AppService {
        let table = Arc::new(RouteTable::compile(&self.registry));
        AppService::new(table, Arc::new(self.pipeline))
    }

    /// Configure the coroutine runtime and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error when the bind address is invalid or the port cannot
    /// be bound.
    pub fn run(self) -> io::Result<ServerHandle> {
        let runtime = RuntimeConfig::from_env();
        may::config().set_stack_size(runtime.stack_size);

        let addr = format!("{}:{}", self.hostname, self.port);
        info!(
            addr = %addr,
            stack_size = runtime.stack_size,
            "Starting server"
        );

        HttpServer(self.into_service()).start(addr)
    }
}
