//! Dependency resolution container
//!
//! The `Container` is the core of the crate. It owns the registration
//! table, the instance caches, and the interceptor chain, and resolves
//! fully wired object graphs on demand.

use crate::error::{BoxError, DiError, Result};
use crate::identity::ServiceId;
use crate::interceptor::{InterceptorChain, InterceptorFn};
use crate::registration::{
    ErasedRecipe, Instance, Lifecycle, Produce, Recipe, Registration, ResolvedDeps,
};
use crate::scope::{absent_if_unregistered, Scope, ScopeToken};
use crate::store::ScopeStore;
use crate::table::RegistrationTable;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Identities currently under construction on this resolution's call chain.
///
/// Private to one top-level resolve call and never shared across threads,
/// so cycle detection only ever sees the calling thread's own recursive
/// chain. Exists only for the duration of the call.
struct ResolutionPath {
    stack: Vec<ServiceId>,
}

impl ResolutionPath {
    fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// If `id` is already on the path, return the full cycle: the ordered
    /// identities from the first occurrence of `id` back to itself.
    fn find_cycle(&self, id: &ServiceId) -> Option<Vec<ServiceId>> {
        self.stack.iter().position(|entry| entry == id).map(|start| {
            let mut cycle = self.stack[start..].to_vec();
            cycle.push(id.clone());
            cycle
        })
    }

    fn push(&mut self, id: ServiceId) {
        self.stack.push(id);
    }

    fn pop(&mut self) {
        self.stack.pop();
    }
}

/// Thread-safe dependency resolution container.
///
/// Maps service identities to registrations (fixed instance, provider
/// closure, or recipe with an explicit declared-dependency list) and
/// resolves instances under three lifecycles: singleton, transient, and
/// scoped. Cloning a `Container` is cheap and shares all state.
///
/// # Examples
///
/// ```rust
/// use wirebox::{Container, Recipe};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// let container = Container::new();
/// container.register_instance(Config { url: "postgres://localhost".into() });
/// container.register_singleton(
///     Recipe::builder()
///         .needs::<Config>()
///         .assemble(|mut deps| {
///             let config: Arc<Config> = deps.take()?;
///             Ok(Database { url: config.url.clone() })
///         }),
/// );
///
/// let db = container.resolve::<Database>().unwrap();
/// assert_eq!(db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    table: Arc<RegistrationTable>,
    store: Arc<ScopeStore>,
    interceptors: Arc<InterceptorChain>,
}

impl Container {
    /// Create an empty container.
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "wirebox", "Creating container");

        Self {
            table: Arc::new(RegistrationTable::new()),
            store: Arc::new(ScopeStore::new()),
            interceptors: Arc::new(InterceptorChain::new()),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a fixed instance under the unnamed identity of `T`.
    ///
    /// Fixed instances are singletons: every resolution returns the stored
    /// value (still subject to interceptors).
    pub fn register_instance<T: Send + Sync + 'static>(&self, value: T) {
        self.insert(Registration::new(
            ServiceId::of::<T>(),
            Lifecycle::Singleton,
            Produce::Instance(Arc::new(value)),
        ));
    }

    /// Register a fixed instance under a named identity.
    pub fn register_instance_named<T: Send + Sync + 'static>(
        &self,
        name: impl Into<Arc<str>>,
        value: T,
    ) {
        self.insert(Registration::new(
            ServiceId::named::<T>(name),
            Lifecycle::Singleton,
            Produce::Instance(Arc::new(value)),
        ));
    }

    /// Register a provider closure under the given lifecycle.
    ///
    /// Providers take no arguments; they obtain their own inputs through
    /// captured state rather than through the container.
    pub fn register_provider<T, F>(&self, lifecycle: Lifecycle, provider: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert(Registration::new(
            ServiceId::of::<T>(),
            lifecycle,
            Produce::Provider(Arc::new(move || Ok(Arc::new(provider()) as Instance))),
        ));
    }

    /// Register a named provider closure under the given lifecycle.
    pub fn register_provider_named<T, F>(
        &self,
        name: impl Into<Arc<str>>,
        lifecycle: Lifecycle,
        provider: F,
    ) where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert(Registration::new(
            ServiceId::named::<T>(name),
            lifecycle,
            Produce::Provider(Arc::new(move || Ok(Arc::new(provider()) as Instance))),
        ));
    }

    /// Register a fallible provider. A returned error surfaces as
    /// [`DiError::ConstructionFailed`] with the cause attached.
    pub fn register_try_provider<T, E, F>(&self, lifecycle: Lifecycle, provider: F)
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        self.insert(Registration::new(
            ServiceId::of::<T>(),
            lifecycle,
            Produce::Provider(Arc::new(move || {
                provider()
                    .map(|value| Arc::new(value) as Instance)
                    .map_err(Into::into)
            })),
        ));
    }

    /// Register a recipe as a singleton.
    pub fn register_singleton<T: Send + Sync + 'static>(&self, recipe: Recipe<T>) {
        self.register_recipe(Lifecycle::Singleton, recipe);
    }

    /// Register a recipe as a transient.
    pub fn register_transient<T: Send + Sync + 'static>(&self, recipe: Recipe<T>) {
        self.register_recipe(Lifecycle::Transient, recipe);
    }

    /// Register a recipe as scoped.
    pub fn register_scoped<T: Send + Sync + 'static>(&self, recipe: Recipe<T>) {
        self.register_recipe(Lifecycle::Scoped, recipe);
    }

    /// Register a recipe for `T` under an explicit lifecycle.
    pub fn register_recipe<T: Send + Sync + 'static>(
        &self,
        lifecycle: Lifecycle,
        recipe: Recipe<T>,
    ) {
        self.insert(Registration::new(
            ServiceId::of::<T>(),
            lifecycle,
            Produce::Recipe(recipe.into_erased()),
        ));
    }

    /// Register a named recipe for `T` under an explicit lifecycle.
    pub fn register_recipe_named<T: Send + Sync + 'static>(
        &self,
        name: impl Into<Arc<str>>,
        lifecycle: Lifecycle,
        recipe: Recipe<T>,
    ) {
        self.insert(Registration::new(
            ServiceId::named::<T>(name),
            lifecycle,
            Produce::Recipe(recipe.into_erased()),
        ));
    }

    /// Insert a registration, last-write-wins. Overwriting evicts any
    /// instances cached under the replaced registration.
    fn insert(&self, registration: Registration) {
        let id = registration.id().clone();
        let replaced = self.table.insert(registration);
        if replaced.is_some() {
            self.store.invalidate(&id);
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the unnamed service of type `T`.
    ///
    /// Returns `Arc<T>` for zero-copy sharing. Fails with
    /// [`DiError::NotRegistered`] if no registration exists,
    /// [`DiError::CircularDependency`] if resolution would revisit an
    /// identity already under construction on this call, or a
    /// construction error from the provider or recipe.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolve_typed::<T>(ServiceId::of::<T>(), None)
    }

    /// Resolve the service of type `T` registered under `name`.
    pub fn resolve_named<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.resolve_typed::<T>(ServiceId::named::<T>(name), None)
    }

    /// Like [`Container::resolve`], but converts [`DiError::NotRegistered`]
    /// into `Ok(None)`. All other failures still propagate.
    pub fn try_resolve<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        absent_if_unregistered(self.resolve::<T>())
    }

    /// Named form of [`Container::try_resolve`].
    pub fn try_resolve_named<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<T>>> {
        absent_if_unregistered(self.resolve_named::<T>(name))
    }

    pub(crate) fn resolve_in_scope<T: Send + Sync + 'static>(
        &self,
        token: ScopeToken,
    ) -> Result<Arc<T>> {
        self.resolve_typed::<T>(ServiceId::of::<T>(), Some(token))
    }

    pub(crate) fn resolve_named_in_scope<T: Send + Sync + 'static>(
        &self,
        name: &str,
        token: ScopeToken,
    ) -> Result<Arc<T>> {
        self.resolve_typed::<T>(ServiceId::named::<T>(name), Some(token))
    }

    fn resolve_typed<T: Send + Sync + 'static>(
        &self,
        id: ServiceId,
        token: Option<ScopeToken>,
    ) -> Result<Arc<T>> {
        let mut path = ResolutionPath::new();
        let instance = self.resolve_erased(&id, token, &mut path)?;
        instance.downcast::<T>().map_err(|_| DiError::ConstructionFailed {
            id,
            source: "an interceptor replaced the instance with a different concrete type".into(),
        })
    }

    /// The resolution algorithm: cycle check, registration lookup,
    /// lifecycle branch, construction, interception.
    fn resolve_erased(
        &self,
        id: &ServiceId,
        token: Option<ScopeToken>,
        path: &mut ResolutionPath,
    ) -> Result<Instance> {
        if let Some(cycle) = path.find_cycle(id) {
            return Err(DiError::CircularDependency(cycle));
        }

        let registration = self
            .table
            .lookup(id)
            .ok_or_else(|| DiError::NotRegistered(id.clone()))?;

        #[cfg(feature = "logging")]
        trace!(
            target: "wirebox",
            service = %id,
            lifecycle = registration.lifecycle().label(),
            "Resolving service"
        );

        let instance = match registration.lifecycle() {
            Lifecycle::Singleton => self
                .store
                .get_or_create_singleton(id, || self.construct(&registration, token, path))?,
            Lifecycle::Scoped => {
                let token = token.ok_or_else(|| DiError::NoActiveScope(id.clone()))?;
                self.store
                    .get_or_create_scoped(token, id, || self.construct(&registration, Some(token), path))?
            }
            Lifecycle::Transient => self.construct(&registration, token, path)?,
        };

        Ok(self.interceptors.apply(id, instance))
    }

    /// Construct an instance with `id` pushed onto the resolution path for
    /// the duration of the build.
    fn construct(
        &self,
        registration: &Registration,
        token: Option<ScopeToken>,
        path: &mut ResolutionPath,
    ) -> Result<Instance> {
        path.push(registration.id().clone());
        let result = self.construct_inner(registration, token, path);
        path.pop();
        result
    }

    fn construct_inner(
        &self,
        registration: &Registration,
        token: Option<ScopeToken>,
        path: &mut ResolutionPath,
    ) -> Result<Instance> {
        match registration.produce() {
            Produce::Instance(value) => Ok(Arc::clone(value)),
            Produce::Provider(provider) => {
                provider().map_err(|source| DiError::ConstructionFailed {
                    id: registration.id().clone(),
                    source,
                })
            }
            Produce::Recipe(recipe) => self.assemble(registration, recipe, token, path),
        }
    }

    /// Resolve a recipe's declared dependencies in order, then invoke its
    /// assemble closure with the resolved values.
    fn assemble(
        &self,
        registration: &Registration,
        recipe: &ErasedRecipe,
        token: Option<ScopeToken>,
        path: &mut ResolutionPath,
    ) -> Result<Instance> {
        let mut values = Vec::with_capacity(recipe.deps().len());
        for dep in recipe.deps() {
            let value = match self.resolve_erased(dep.id(), token, path) {
                Ok(value) => value,
                Err(err) => match (dep.default(), err) {
                    (Some(default), DiError::NotRegistered(_)) => {
                        #[cfg(feature = "logging")]
                        trace!(
                            target: "wirebox",
                            service = %registration.id(),
                            dependency = %dep.id(),
                            "Substituting default for unregistered optional dependency"
                        );
                        Arc::clone(default)
                    }
                    // Cycles are never wrapped; the caller needs the full path.
                    (_, err @ DiError::CircularDependency(_)) => return Err(err),
                    (_, err) => {
                        return Err(DiError::DependencyUnsatisfied {
                            owner: registration.id().clone(),
                            dependency: dep.id().clone(),
                            source: Box::new(err),
                        })
                    }
                },
            };
            values.push((dep.id().clone(), value));
        }

        (recipe.assemble())(ResolvedDeps::new(values)).map_err(|source| {
            DiError::ConstructionFailed {
                id: registration.id().clone(),
                source,
            }
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether the unnamed identity of `T` is registered.
    pub fn is_registered<T: Send + Sync + 'static>(&self) -> bool {
        self.table.contains(&ServiceId::of::<T>())
    }

    /// Whether the identity of `T` under `name` is registered.
    pub fn is_registered_named<T: Send + Sync + 'static>(&self, name: &str) -> bool {
        self.table.contains(&ServiceId::named::<T>(name))
    }

    /// Snapshot of all registrations. Iteration order is unspecified and
    /// not preserved across overwrites.
    pub fn registrations(&self) -> Vec<Arc<Registration>> {
        self.table.snapshot()
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no identities are registered.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    // =========================================================================
    // Scopes and interceptors
    // =========================================================================

    /// Open a scoped resolution session with a fresh, globally unique token.
    pub fn open_scope(&self) -> Scope {
        Scope::open(self.clone())
    }

    /// Append an interceptor applied to every resolved instance, cache hits
    /// included, in registration order (composed left-to-right).
    ///
    /// Hooks must hand back an instance of the same concrete type they
    /// received; typed resolution fails otherwise. Hooks that are not
    /// idempotent run on every access.
    pub fn add_interceptor<F>(&self, hook: F)
    where
        F: Fn(&ServiceId, Instance) -> Instance + Send + Sync + 'static,
    {
        #[cfg(feature = "logging")]
        debug!(target: "wirebox", "Adding interceptor");

        self.interceptors.add(Arc::new(hook) as InterceptorFn);
    }

    #[inline]
    pub(crate) fn store(&self) -> &ScopeStore {
        &self.store
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.len())
            .field("active_scopes", &self.store.active_scopes())
            .finish()
    }
}
