//! Post-resolution interception
//!
//! Interceptors are hooks applied to every resolved instance immediately
//! before it is handed to the caller, in registration order. They decorate
//! or observe instances without touching providers or recipes.

use crate::identity::ServiceId;
use crate::registration::Instance;
use std::sync::{Arc, RwLock};

#[cfg(feature = "logging")]
use tracing::trace;

/// Type-erased interceptor hook.
pub(crate) type InterceptorFn = Arc<dyn Fn(&ServiceId, Instance) -> Instance + Send + Sync>;

/// Ordered, append-only chain of interceptors.
///
/// The chain runs on every hand-off, cache hits included, so a hook that
/// is not idempotent runs on every access. Callers wanting decorate-once
/// semantics implement the idempotence inside the hook itself.
pub(crate) struct InterceptorChain {
    hooks: RwLock<Vec<InterceptorFn>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self { hooks: RwLock::new(Vec::new()) }
    }

    /// Append a hook. There is no removal.
    pub fn add(&self, hook: InterceptorFn) {
        self.hooks.write().unwrap().push(hook);
    }

    /// Run every hook over `instance`, left-to-right in registration order.
    pub fn apply(&self, id: &ServiceId, instance: Instance) -> Instance {
        // Snapshot under the read lock; a hook registering further hooks
        // must not deadlock against this traversal.
        let hooks: Vec<InterceptorFn> = self.hooks.read().unwrap().clone();
        if hooks.is_empty() {
            return instance;
        }

        #[cfg(feature = "logging")]
        trace!(
            target: "wirebox",
            service = %id,
            hooks = hooks.len(),
            "Applying interceptor chain"
        );

        hooks.into_iter().fold(instance, |value, hook| hook(id, value))
    }

    pub fn len(&self) -> usize {
        self.hooks.read().unwrap().len()
    }
}

impl Default for InterceptorChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("hooks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeting(String);

    fn append(marker: &'static str) -> InterceptorFn {
        Arc::new(move |_id, instance| {
            let greeting = instance.downcast::<Greeting>().unwrap();
            Arc::new(Greeting(format!("{}{}", greeting.0, marker))) as Instance
        })
    }

    #[test]
    fn hooks_compose_left_to_right() {
        let chain = InterceptorChain::new();
        chain.add(append(".f"));
        chain.add(append(".g"));

        let out = chain.apply(
            &ServiceId::of::<Greeting>(),
            Arc::new(Greeting("base".into())) as Instance,
        );
        let greeting = out.downcast::<Greeting>().unwrap();
        assert_eq!(greeting.0, "base.f.g");
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = InterceptorChain::new();
        let instance = Arc::new(Greeting("untouched".into())) as Instance;
        let out = chain.apply(&ServiceId::of::<Greeting>(), Arc::clone(&instance));
        assert!(Arc::ptr_eq(&instance, &out));
    }

    #[test]
    fn hooks_see_the_service_identity() {
        let chain = InterceptorChain::new();
        chain.add(Arc::new(|id, instance| {
            assert!(id.type_name().contains("Greeting"));
            instance
        }));
        chain.apply(
            &ServiceId::of::<Greeting>(),
            Arc::new(Greeting("x".into())) as Instance,
        );
    }
}
