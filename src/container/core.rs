use once_cell::sync::OnceCell;
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Instance-reuse policy attached to a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Constructed on first resolution, cached for the container's lifetime
    Singleton,
    /// Constructed fresh on every resolution
    Transient,
    /// Alias of [`Lifetime::Transient`]: a fresh instance per resolution, not
    /// per request context. Kept as a distinct variant so registrations read
    /// the same as the scopes they were written with.
    Request,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "singleton"),
            Lifetime::Transient => write!(f, "transient"),
            Lifetime::Request => write!(f, "request"),
        }
    }
}

/// Container failure, raised while wiring at start-up or on resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// No binding exists for the requested type
    Unresolved { type_name: &'static str },
    /// A resolution chain revisited a type already being constructed on the
    /// same call stack
    Circular { chain: Vec<&'static str> },
    /// A factory failed to construct its instance
    Construction {
        type_name: &'static str,
        message: String,
    },
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::Unresolved { type_name } => {
                write!(f, "no binding registered for type '{}'", type_name)
            }
            ContainerError::Circular { chain } => {
                write!(
                    f,
                    "circular dependency detected while resolving: {}",
                    chain.join(" -> ")
                )
            }
            ContainerError::Construction { type_name, message } => {
                write!(f, "failed to construct '{}': {}", type_name, message)
            }
        }
    }
}

impl std::error::Error for ContainerError {}

impl From<ContainerError> for crate::exception::Exception {
    fn from(err: ContainerError) -> Self {
        crate::exception::Exception::internal(err.to_string())
    }
}

type AnyInstance = Arc<dyn Any + Send + Sync>;
type AnyFactory = Arc<dyn Fn(&Resolver<'_>) -> Result<AnyInstance, ContainerError> + Send + Sync>;

/// A registered constructible type: lifetime policy, factory, and (for
/// singletons) the lazily initialized instance slot.
struct Binding {
    type_name: &'static str,
    lifetime: Lifetime,
    factory: AnyFactory,
    instance: OnceCell<AnyInstance>,
}

/// Registry of constructible types and their lifetime policies.
///
/// Factories declare their own dependencies by calling
/// [`Resolver::resolve`] recursively; no runtime reflection is involved.
/// Re-binding a type replaces the previous binding (fresh instance slot)
/// rather than failing - this differs from the route registry's strict
/// name uniqueness.
///
/// Singleton construction is race-free across coroutines and threads: the
/// per-binding [`OnceCell`] guarantees the factory runs exactly once, and a
/// cached instance, once observed, is always the instance returned.
pub struct Container {
    bindings: RwLock<HashMap<TypeId, Arc<Binding>>>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Record or replace the binding for `T`.
    pub fn bind<T, F>(&self, lifetime: Lifetime, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        let binding = Arc::new(Binding {
            type_name: type_name::<T>(),
            lifetime,
            factory: Arc::new(move |resolver| {
                factory(resolver).map(|value| Arc::new(value) as AnyInstance)
            }),
            instance: OnceCell::new(),
        });

        let replaced = self
            .bindings
            .write()
            .unwrap()
            .insert(TypeId::of::<T>(), binding)
            .is_some();

        info!(
            type_name = type_name::<T>(),
            lifetime = %lifetime,
            replaced = replaced,
            "Container binding recorded"
        );
    }

    /// Record a binding for `T` unless one already exists.
    ///
    /// Returns `true` when the binding was added. Used by the route registry,
    /// which binds handlers under singleton lifetime by default but must not
    /// clobber an explicit registration.
    pub fn bind_if_absent<T, F>(&self, lifetime: Lifetime, factory: F) -> bool
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        if self.is_bound::<T>() {
            return false;
        }
        self.bind::<T, F>(lifetime, factory);
        true
    }

    #[must_use]
    pub fn is_bound<T: 'static>(&self) -> bool {
        self.bindings
            .read()
            .unwrap()
            .contains_key(&TypeId::of::<T>())
    }

    /// Resolve an instance of `T`, recursively constructing its dependencies.
    ///
    /// # Errors
    ///
    /// `Unresolved` when no binding exists, `Circular` when the resolution
    /// chain revisits a type under construction, `Construction` when a
    /// factory fails.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let chain = RefCell::new(Vec::new());
        let resolver = Resolver {
            container: self,
            chain: &chain,
        };
        resolver.resolve::<T>()
    }
}

/// Handle passed to factories; carries the in-flight resolution chain used
/// for cycle detection.
pub struct Resolver<'a> {
    container: &'a Container,
    chain: &'a RefCell<Vec<(TypeId, &'static str)>>,
}

impl Resolver<'_> {
    /// Resolve a dependency from within a factory.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let instance = self.resolve_erased(TypeId::of::<T>(), type_name::<T>())?;
        instance
            .downcast::<T>()
            .map_err(|_| ContainerError::Construction {
                type_name: type_name::<T>(),
                message: "bound instance has a different concrete type".to_string(),
            })
    }

    fn resolve_erased(
        &self,
        id: TypeId,
        name: &'static str,
    ) -> Result<AnyInstance, ContainerError> {
        let binding = self
            .container
            .bindings
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ContainerError::Unresolved { type_name: name })?;

        if self.chain.borrow().iter().any(|(tid, _)| *tid == id) {
            let mut cycle: Vec<&'static str> =
                self.chain.borrow().iter().map(|(_, n)| *n).collect();
            cycle.push(name);
            return Err(ContainerError::Circular { chain: cycle });
        }

        debug!(
            type_name = name,
            lifetime = %binding.lifetime,
            depth = self.chain.borrow().len(),
            "Resolving binding"
        );

        // Fast path: a published singleton is returned without touching the
        // chain or the factory.
        if binding.lifetime == Lifetime::Singleton {
            if let Some(cached) = binding.instance.get() {
                return Ok(Arc::clone(cached));
            }
        }

        self.chain.borrow_mut().push((id, name));
        let constructed = match binding.lifetime {
            Lifetime::Singleton => binding
                .instance
                .get_or_try_init(|| (*binding.factory)(self))
                .map(Arc::clone),
            Lifetime::Transient | Lifetime::Request => (*binding.factory)(self),
        };
        self.chain.borrow_mut().pop();

        constructed
    }
}
