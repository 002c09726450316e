//! # Wirebox - Dependency Resolution Container for Rust
//!
//! A thread-safe container that maps service identities to construction
//! recipes and resolves fully wired object graphs on demand, enforcing
//! lifecycle, scoping, and acyclicity guarantees.
//!
//! ## Features
//!
//! - **Explicit recipes** - Dependencies are declared lists, not runtime
//!   reflection, so graphs are statically inspectable
//! - **Three lifecycles** - Singleton, transient, and scoped instances
//! - **Named registrations** - The same type can be registered under
//!   multiple names
//! - **Cycle detection** - Circular graphs fail with the full cycle path
//! - **Race-free construction** - Concurrent first resolutions of a
//!   singleton construct exactly once
//! - **Scope handles** - RAII sessions whose cached instances drop on close
//! - **Interceptors** - Ordered post-resolution hooks for decoration and
//!   instrumentation
//! - **Observable** - Optional `tracing` integration with JSON or pretty
//!   output
//!
//! ## Quick Start
//!
//! ```rust
//! use wirebox::{Container, Recipe};
//! use std::sync::Arc;
//!
//! struct Config { url: String }
//! struct Database { url: String }
//!
//! let container = Container::new();
//!
//! container.register_instance(Config { url: "postgres://localhost".into() });
//! container.register_singleton(
//!     Recipe::builder()
//!         .needs::<Config>()
//!         .assemble(|mut deps| {
//!             let config: Arc<Config> = deps.take()?;
//!             Ok(Database { url: config.url.clone() })
//!         }),
//! );
//!
//! // Resolve - returns Arc<T> for zero-copy sharing
//! let db = container.resolve::<Database>().unwrap();
//! assert_eq!(db.url, "postgres://localhost");
//! ```
//!
//! ## Service Lifecycles
//!
//! ```rust
//! use wirebox::{Container, Lifecycle};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static COUNTER: AtomicU64 = AtomicU64::new(0);
//!
//! struct AppConfig { debug: bool }
//! struct RequestId(u64);
//!
//! let container = Container::new();
//!
//! // Singleton - constructed once, shared everywhere
//! container.register_provider(Lifecycle::Singleton, || AppConfig { debug: true });
//!
//! // Transient - new instance every resolution
//! container.register_provider(Lifecycle::Transient, || {
//!     RequestId(COUNTER.fetch_add(1, Ordering::SeqCst))
//! });
//!
//! let id1 = container.resolve::<RequestId>().unwrap();
//! let id2 = container.resolve::<RequestId>().unwrap();
//! assert_ne!(id1.0, id2.0);
//! ```
//!
//! ## Scoped Sessions
//!
//! ```rust
//! use wirebox::{Container, Lifecycle};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static UNITS: AtomicU64 = AtomicU64::new(0);
//!
//! struct UnitOfWork(u64);
//!
//! let container = Container::new();
//! container.register_provider(Lifecycle::Scoped, || {
//!     UnitOfWork(UNITS.fetch_add(1, Ordering::SeqCst))
//! });
//!
//! let scope = container.open_scope();
//! let a = scope.resolve::<UnitOfWork>().unwrap();
//! let b = scope.resolve::<UnitOfWork>().unwrap();
//! assert_eq!(a.0, b.0); // one instance per scope session
//! scope.close();        // cached instances dropped here
//! ```

mod container;
mod error;
mod identity;
mod interceptor;
#[cfg(feature = "logging")]
pub mod logging;
mod registration;
mod scope;
mod store;
mod table;

pub use container::Container;
pub use error::{BoxError, DiError, Result};
pub use identity::ServiceId;
pub use registration::{Dep, Instance, Lifecycle, Recipe, RecipeBuilder, Registration, ResolvedDeps};
pub use scope::{Scope, ScopeToken};

// Re-export tracing macros for convenience when logging is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Container, DiError, Lifecycle, Recipe, Result, Scope, ScopeToken, ServiceId,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Barrier;

    struct Config {
        url: String,
    }

    struct Pool {
        label: String,
    }

    struct Metrics {
        enabled: bool,
    }

    struct Repository {
        url: String,
        pool: String,
        metrics: bool,
    }

    #[test]
    fn full_graph_with_named_and_optional_dependencies() {
        let container = Container::new();
        container.register_instance(Config { url: "postgres://db".into() });
        container.register_instance_named("primary", Pool { label: "primary-pool".into() });
        // Metrics deliberately unregistered; the recipe declares a default.
        container.register_singleton(
            Recipe::builder()
                .needs::<Config>()
                .needs_named::<Pool>("primary")
                .optional_with_default(Metrics { enabled: false })
                .assemble(|mut deps| {
                    let config: Arc<Config> = deps.take()?;
                    let pool: Arc<Pool> = deps.take()?;
                    let metrics: Arc<Metrics> = deps.take()?;
                    Ok(Repository {
                        url: config.url.clone(),
                        pool: pool.label.clone(),
                        metrics: metrics.enabled,
                    })
                }),
        );

        let repo = container.resolve::<Repository>().unwrap();
        assert_eq!(repo.url, "postgres://db");
        assert_eq!(repo.pool, "primary-pool");
        assert!(!repo.metrics);
    }

    #[test]
    fn concurrent_first_construction_happens_exactly_once() {
        static CONSTRUCTIONS: AtomicU32 = AtomicU32::new(0);

        struct Expensive;

        let container = Container::new();
        container.register_provider(Lifecycle::Singleton, || {
            CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
            Expensive
        });

        const THREADS: usize = 16;
        let barrier = Barrier::new(THREADS);

        let instances: Vec<Arc<Expensive>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        container.resolve::<Expensive>().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 1);
        for instance in &instances[1..] {
            assert!(Arc::ptr_eq(&instances[0], instance));
        }
    }

    #[test]
    fn concurrent_scoped_construction_happens_exactly_once_per_scope() {
        static CONSTRUCTIONS: AtomicU32 = AtomicU32::new(0);

        struct Session;

        let container = Container::new();
        container.register_provider(Lifecycle::Scoped, || {
            CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
            Session
        });

        let scope = container.open_scope();
        let barrier = Barrier::new(8);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    barrier.wait();
                    scope.resolve::<Session>().unwrap();
                });
            }
        });

        assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parallel_resolutions_never_see_false_cycles() {
        // Resolution paths are private per top-level call, so two threads
        // racing through a shared (acyclic) diamond must never report a
        // circular dependency.
        struct Left;
        struct Right;
        struct Shared;

        let container = Container::new();
        container.register_provider(Lifecycle::Transient, || Shared);
        container.register_transient(
            Recipe::builder().needs::<Shared>().assemble(|mut deps| {
                let _shared: Arc<Shared> = deps.take()?;
                Ok(Left)
            }),
        );
        container.register_transient(
            Recipe::builder().needs::<Shared>().assemble(|mut deps| {
                let _shared: Arc<Shared> = deps.take()?;
                Ok(Right)
            }),
        );

        std::thread::scope(|s| {
            let a = s.spawn(|| {
                for _ in 0..200 {
                    container.resolve::<Left>().unwrap();
                }
            });
            let b = s.spawn(|| {
                for _ in 0..200 {
                    container.resolve::<Right>().unwrap();
                }
            });
            a.join().unwrap();
            b.join().unwrap();
        });
    }

    #[test]
    fn a_real_cycle_on_one_thread_does_not_poison_others() {
        #[derive(Debug)]
        struct Chicken;
        struct Egg;
        struct Innocent;

        let container = Container::new();
        container.register_transient(
            Recipe::builder().needs::<Egg>().assemble(|mut deps| {
                let _egg: Arc<Egg> = deps.take()?;
                Ok(Chicken)
            }),
        );
        container.register_transient(
            Recipe::builder().needs::<Chicken>().assemble(|mut deps| {
                let _chicken: Arc<Chicken> = deps.take()?;
                Ok(Egg)
            }),
        );
        container.register_provider(Lifecycle::Transient, || Innocent);

        std::thread::scope(|s| {
            let cyclic = s.spawn(|| {
                for _ in 0..100 {
                    let err = container.resolve::<Chicken>().unwrap_err();
                    assert!(matches!(err, DiError::CircularDependency(_)));
                }
            });
            let healthy = s.spawn(|| {
                for _ in 0..100 {
                    container.resolve::<Innocent>().unwrap();
                }
            });
            cyclic.join().unwrap();
            healthy.join().unwrap();
        });
    }

    #[test]
    fn scopes_on_different_threads_stay_isolated() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        struct Unit(u32);

        let container = Container::new();
        container.register_provider(Lifecycle::Scoped, || {
            Unit(COUNTER.fetch_add(1, Ordering::SeqCst))
        });

        let values: Vec<u32> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        let scope = container.open_scope();
                        let unit = scope.resolve::<Unit>().unwrap();
                        unit.0
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut sorted = values.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), values.len(), "each scope got its own instance");
    }

    #[test]
    fn interceptor_decorates_dependencies_as_well_as_roots() {
        static INTERCEPTED: AtomicU32 = AtomicU32::new(0);

        struct Inner;
        struct Outer;

        let container = Container::new();
        container.register_provider(Lifecycle::Transient, || Inner);
        container.register_transient(
            Recipe::builder().needs::<Inner>().assemble(|mut deps| {
                let _inner: Arc<Inner> = deps.take()?;
                Ok(Outer)
            }),
        );
        container.add_interceptor(|_, instance| {
            INTERCEPTED.fetch_add(1, Ordering::SeqCst);
            instance
        });

        container.resolve::<Outer>().unwrap();
        // Both the dependency and the root pass through the chain.
        assert_eq!(INTERCEPTED.load(Ordering::SeqCst), 2);
    }
}
