//! Service identities
//!
//! A [`ServiceId`] is the key under which a registration is stored: the
//! `TypeId` of the service type plus an optional name. Two registrations
//! with the same type but different names are distinct services.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Unique identity of a requested capability: a type plus an optional name.
///
/// Equality and hashing cover the `TypeId` and the name only; the
/// human-readable type name is carried for diagnostics and never
/// participates in comparisons.
///
/// # Examples
///
/// ```rust
/// use wirebox::ServiceId;
///
/// struct Pool;
///
/// let anonymous = ServiceId::of::<Pool>();
/// let primary = ServiceId::named::<Pool>("primary");
/// let replica = ServiceId::named::<Pool>("replica");
///
/// assert_ne!(anonymous, primary);
/// assert_ne!(primary, replica);
/// assert_eq!(primary, ServiceId::named::<Pool>("primary"));
/// ```
#[derive(Clone)]
pub struct ServiceId {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<Arc<str>>,
}

impl ServiceId {
    /// Identity of the unnamed registration for `T`.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: None,
        }
    }

    /// Identity of the registration for `T` under `name`.
    #[inline]
    pub fn named<T: 'static>(name: impl Into<Arc<str>>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: Some(name.into()),
        }
    }

    /// The `TypeId` component of this identity.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Human-readable type name (diagnostics only).
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The name component, if this is a named identity.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for ServiceId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for ServiceId {}

impl Hash for ServiceId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", self.type_name, name),
            None => f.write_str(self.type_name),
        }
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceId")
            .field("type", &self.type_name)
            .field("name", &self.name)
            .finish()
    }
}
