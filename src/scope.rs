//! Scope tokens and handles
//!
//! A [`Scope`] bounds one scoped resolution session. Opening a scope mints
//! a globally unique [`ScopeToken`]; every scoped-lifecycle lookup during
//! the session is keyed by that token. Closing the handle (explicitly or
//! by drop) discards the session's cache slice on every exit path.

use crate::container::Container;
use crate::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Opaque identifier of one scoped resolution session.
///
/// Tokens are process-unique and never reused. They deliberately carry no
/// thread affinity: any thread or task holding the owning [`Scope`] handle
/// may resolve against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeToken(u64);

impl ScopeToken {
    /// Mint the next unique token.
    #[inline]
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw token value, for logging and debugging.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ScopeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Handle owning one scoped resolution session.
///
/// The handle exclusively owns its slice of the scope store: when it closes,
/// all instances cached under its token are dropped, and the container keeps
/// no reference to the token afterwards. Dropping the handle closes it, so
/// cleanup happens on early returns and panics alike.
///
/// # Examples
///
/// ```rust
/// use wirebox::{Container, Lifecycle};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// static UNITS: AtomicU64 = AtomicU64::new(0);
///
/// struct UnitOfWork(u64);
///
/// let container = Container::new();
/// container.register_provider(Lifecycle::Scoped, || {
///     UnitOfWork(UNITS.fetch_add(1, Ordering::SeqCst))
/// });
///
/// let scope = container.open_scope();
/// let first = scope.resolve::<UnitOfWork>().unwrap();
/// let again = scope.resolve::<UnitOfWork>().unwrap();
/// assert_eq!(first.0, again.0); // same instance within the session
/// scope.close();
///
/// let next = container.open_scope();
/// let fresh = next.resolve::<UnitOfWork>().unwrap();
/// assert_ne!(first.0, fresh.0); // nothing leaks out of a closed scope
/// ```
pub struct Scope {
    container: Container,
    token: ScopeToken,
}

impl Scope {
    pub(crate) fn open(container: Container) -> Self {
        let token = ScopeToken::next();
        container.store().open_scope(token);
        Self { container, token }
    }

    /// The token identifying this session.
    #[inline]
    pub fn token(&self) -> ScopeToken {
        self.token
    }

    /// Resolve a service within this scope.
    ///
    /// Scoped registrations cache per this scope's token; singleton and
    /// transient registrations behave exactly as they do on the container.
    #[inline]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.container.resolve_in_scope::<T>(self.token)
    }

    /// Resolve a named service within this scope.
    #[inline]
    pub fn resolve_named<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.container.resolve_named_in_scope::<T>(name, self.token)
    }

    /// Like [`Scope::resolve`], but an unregistered service is `Ok(None)`.
    #[inline]
    pub fn try_resolve<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        absent_if_unregistered(self.resolve::<T>())
    }

    /// Like [`Scope::resolve_named`], but an unregistered service is `Ok(None)`.
    #[inline]
    pub fn try_resolve_named<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<T>>> {
        absent_if_unregistered(self.resolve_named::<T>(name))
    }

    /// Close the scope, dropping every instance cached under its token.
    ///
    /// Consuming `self` makes use-after-close unrepresentable; `Drop` does
    /// the same work, so simply letting the handle fall out of scope is
    /// equivalent.
    pub fn close(self) {
        // Drop impl releases the cache slice.
    }
}

pub(crate) fn absent_if_unregistered<T>(result: Result<Arc<T>>) -> Result<Option<Arc<T>>> {
    match result {
        Ok(instance) => Ok(Some(instance)),
        Err(err) if err.is_not_registered() => Ok(None),
        Err(err) => Err(err),
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        #[cfg(feature = "logging")]
        debug!(target: "wirebox", scope = %self.token, "Scope handle dropped");

        self.container.store().close_scope(self.token);
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").field("token", &self.token).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::Lifecycle;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Session(u64);

    fn scoped_container(counter: &'static AtomicU64) -> Container {
        let container = Container::new();
        container.register_provider(Lifecycle::Scoped, move || {
            Session(counter.fetch_add(1, Ordering::SeqCst))
        });
        container
    }

    #[test]
    fn tokens_are_unique() {
        let a = ScopeToken::next();
        let b = ScopeToken::next();
        let c = ScopeToken::next();
        assert_ne!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn token_display_is_stable() {
        let token = ScopeToken::next();
        assert_eq!(token.to_string(), format!("scope-{}", token.id()));
    }

    #[test]
    fn two_scopes_get_distinct_instances() {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let container = scoped_container(&COUNTER);

        let a = container.open_scope();
        let b = container.open_scope();

        let in_a = a.resolve::<Session>().unwrap();
        let in_b = b.resolve::<Session>().unwrap();
        assert_ne!(in_a.0, in_b.0);

        // Within one scope the instance is stable.
        assert!(Arc::ptr_eq(&in_a, &a.resolve::<Session>().unwrap()));
    }

    #[test]
    fn close_releases_the_cache_slice() {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let container = scoped_container(&COUNTER);

        let scope = container.open_scope();
        let first = scope.resolve::<Session>().unwrap();
        scope.close();

        let reopened = container.open_scope();
        let fresh = reopened.resolve::<Session>().unwrap();
        assert_ne!(first.0, fresh.0);
    }

    #[test]
    fn drop_closes_on_every_exit_path() {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let container = scoped_container(&COUNTER);

        {
            let scope = container.open_scope();
            let _ = scope.resolve::<Session>().unwrap();
            // No explicit close; drop handles it.
        }

        assert_eq!(container.store().active_scopes(), 0);
    }

    #[test]
    fn try_resolve_in_scope_absents_missing_services() {
        let container = Container::new();
        let scope = container.open_scope();

        struct Unregistered;
        assert!(scope.try_resolve::<Unregistered>().unwrap().is_none());
    }
}
