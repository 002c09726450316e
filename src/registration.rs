//! Registrations: how instances are produced and under which lifecycle
//!
//! A [`Registration`] pairs a [`ServiceId`] with a [`Lifecycle`] and exactly
//! one production mode: a fixed instance, a zero-argument provider closure,
//! or a [`Recipe`] carrying an explicit declared-dependency list. There is
//! no runtime constructor introspection; a recipe names its full dependency
//! list up front, which keeps dependency graphs statically inspectable.

use crate::error::BoxError;
use crate::identity::ServiceId;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased service instance shared out of the container.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Service lifecycle specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// Single instance shared across all resolutions, created on first access
    #[default]
    Singleton,

    /// New instance created on every resolution, never cached
    Transient,

    /// One instance per open scope session
    Scoped,
}

impl Lifecycle {
    /// Lowercase label used in logs and `Debug` output.
    pub fn label(&self) -> &'static str {
        match self {
            Lifecycle::Singleton => "singleton",
            Lifecycle::Transient => "transient",
            Lifecycle::Scoped => "scoped",
        }
    }
}

/// Type-erased provider function
pub(crate) type ProviderFn = Arc<dyn Fn() -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// Type-erased recipe assemble function
pub(crate) type AssembleFn =
    Arc<dyn Fn(ResolvedDeps) -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// How instances for a registration are produced
pub(crate) enum Produce {
    /// Fixed value stored at registration time
    Instance(Instance),
    /// Zero-argument closure; obtains its own inputs via captured state
    Provider(ProviderFn),
    /// Declared dependency identities plus an assemble function
    Recipe(ErasedRecipe),
}

impl Produce {
    fn label(&self) -> &'static str {
        match self {
            Produce::Instance(_) => "instance",
            Produce::Provider(_) => "provider",
            Produce::Recipe(_) => "recipe",
        }
    }
}

/// Immutable registration entry: identity, lifecycle, production mode.
///
/// Registrations never mutate once stored; replacing one means inserting a
/// new registration at the same identity.
pub struct Registration {
    id: ServiceId,
    lifecycle: Lifecycle,
    produce: Produce,
}

impl Registration {
    pub(crate) fn new(id: ServiceId, lifecycle: Lifecycle, produce: Produce) -> Self {
        Self { id, lifecycle, produce }
    }

    /// Identity this registration produces instances for.
    #[inline]
    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    /// Lifecycle scope of produced instances.
    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Declared dependencies, empty unless this is a recipe registration.
    pub fn dependencies(&self) -> &[Dep] {
        match &self.produce {
            Produce::Recipe(recipe) => &recipe.deps,
            _ => &[],
        }
    }

    #[inline]
    pub(crate) fn produce(&self) -> &Produce {
        &self.produce
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle.label())
            .field("mode", &self.produce.label())
            .field("dependencies", &self.dependencies().len())
            .finish()
    }
}

/// One declared dependency of a recipe.
///
/// An optional dependency carries a default instance substituted when no
/// registration exists for the dependency identity.
#[derive(Clone)]
pub struct Dep {
    id: ServiceId,
    default: Option<Instance>,
}

impl Dep {
    /// Identity of the dependency.
    #[inline]
    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    /// Whether this dependency falls back to a default when unregistered.
    #[inline]
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }

    #[inline]
    pub(crate) fn default(&self) -> Option<&Instance> {
        self.default.as_ref()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("optional", &self.is_optional())
            .finish()
    }
}

/// Recipe internals after the produced type has been erased for storage.
pub(crate) struct ErasedRecipe {
    deps: Vec<Dep>,
    assemble: AssembleFn,
}

impl ErasedRecipe {
    #[inline]
    pub(crate) fn deps(&self) -> &[Dep] {
        &self.deps
    }

    #[inline]
    pub(crate) fn assemble(&self) -> &AssembleFn {
        &self.assemble
    }
}

/// Construction recipe for `T`: declared dependency identities plus an
/// assemble closure invoked with the resolved values in declared order.
///
/// # Examples
///
/// ```rust
/// use wirebox::Recipe;
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// let recipe = Recipe::builder()
///     .needs::<Config>()
///     .assemble(|mut deps| {
///         let config: Arc<Config> = deps.take()?;
///         Ok(Database { url: config.url.clone() })
///     });
///
/// assert_eq!(recipe.dependency_ids().len(), 1);
/// ```
pub struct Recipe<T> {
    inner: ErasedRecipe,
    _produces: PhantomData<fn() -> T>,
}

impl Recipe<()> {
    /// Start declaring a recipe. The produced type is fixed by the closure
    /// handed to [`RecipeBuilder::assemble`].
    pub fn builder() -> RecipeBuilder {
        RecipeBuilder { deps: Vec::new() }
    }
}

impl<T> Recipe<T> {
    /// Identities of the declared dependencies, in declared order.
    pub fn dependency_ids(&self) -> Vec<&ServiceId> {
        self.inner.deps.iter().map(Dep::id).collect()
    }

    pub(crate) fn into_erased(self) -> ErasedRecipe {
        self.inner
    }
}

impl<T> fmt::Debug for Recipe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("produces", &std::any::type_name::<T>())
            .field("deps", &self.inner.deps)
            .finish()
    }
}

/// Builder for [`Recipe`]: declare dependencies, then attach the assemble
/// closure with [`RecipeBuilder::assemble`].
pub struct RecipeBuilder {
    deps: Vec<Dep>,
}

impl RecipeBuilder {
    /// Declare a required dependency on the unnamed registration of `D`.
    pub fn needs<D: Send + Sync + 'static>(mut self) -> Self {
        self.deps.push(Dep { id: ServiceId::of::<D>(), default: None });
        self
    }

    /// Declare a required dependency on the registration of `D` under `name`.
    pub fn needs_named<D: Send + Sync + 'static>(mut self, name: impl Into<Arc<str>>) -> Self {
        self.deps.push(Dep { id: ServiceId::named::<D>(name), default: None });
        self
    }

    /// Declare an optional dependency on `D`, substituting `default` when
    /// no registration for `D` exists.
    pub fn optional_with_default<D: Send + Sync + 'static>(mut self, default: D) -> Self {
        self.deps.push(Dep {
            id: ServiceId::of::<D>(),
            default: Some(Arc::new(default) as Instance),
        });
        self
    }

    /// Declare an optional named dependency with a fallback default.
    pub fn optional_named_with_default<D: Send + Sync + 'static>(
        mut self,
        name: impl Into<Arc<str>>,
        default: D,
    ) -> Self {
        self.deps.push(Dep {
            id: ServiceId::named::<D>(name),
            default: Some(Arc::new(default) as Instance),
        });
        self
    }

    /// Finish the recipe with an assemble closure.
    ///
    /// The closure receives the resolved dependency values in declared order
    /// via a [`ResolvedDeps`] cursor and returns the constructed service.
    pub fn assemble<T, F>(self, assemble: F) -> Recipe<T>
    where
        T: Send + Sync + 'static,
        F: Fn(ResolvedDeps) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Recipe {
            inner: ErasedRecipe {
                deps: self.deps,
                assemble: Arc::new(move |deps| assemble(deps).map(|v| Arc::new(v) as Instance)),
            },
            _produces: PhantomData,
        }
    }
}

/// Cursor over the resolved dependency values of one recipe invocation.
///
/// Values are consumed in declared order with [`ResolvedDeps::take`].
pub struct ResolvedDeps {
    values: std::vec::IntoIter<(ServiceId, Instance)>,
}

impl ResolvedDeps {
    pub(crate) fn new(values: Vec<(ServiceId, Instance)>) -> Self {
        Self { values: values.into_iter() }
    }

    /// Consume the next resolved dependency, downcasting it to `D`.
    ///
    /// Fails if the recipe consumes more values than it declared, or if `D`
    /// does not match the declared dependency at this position.
    pub fn take<D: Send + Sync + 'static>(&mut self) -> std::result::Result<Arc<D>, BoxError> {
        let (id, value) = self.values.next().ok_or_else(|| -> BoxError {
            format!(
                "recipe consumed more dependencies than declared (next requested: {})",
                std::any::type_name::<D>()
            )
            .into()
        })?;
        value.downcast::<D>().map_err(|_| -> BoxError {
            format!(
                "declared dependency {id} does not downcast to {}",
                std::any::type_name::<D>()
            )
            .into()
        })
    }

    /// Number of resolved values not yet consumed.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}
