//! Error types for container operations

use crate::identity::ServiceId;
use thiserror::Error;

/// Boxed error type carried as the cause of construction failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during registration lookup and resolution
#[derive(Error, Debug)]
pub enum DiError {
    /// No registration exists for the requested identity
    #[error("service not registered: {0}")]
    NotRegistered(ServiceId),

    /// Resolution revisited an identity already on the current resolution path.
    ///
    /// The payload is the full cycle, ordered from the first occurrence of
    /// the offending identity back to itself.
    #[error("circular dependency detected: {}", fmt_cycle(.0))]
    CircularDependency(Vec<ServiceId>),

    /// A scoped service was resolved without an open scope
    #[error("no active scope while resolving scoped service: {0}")]
    NoActiveScope(ServiceId),

    /// A provider or recipe constructor returned an error
    #[error("failed to construct {id}: {source}")]
    ConstructionFailed {
        id: ServiceId,
        #[source]
        source: BoxError,
    },

    /// A declared, non-optional dependency of a recipe could not be resolved
    #[error("dependency {dependency} of {owner} unsatisfied: {source}")]
    DependencyUnsatisfied {
        owner: ServiceId,
        dependency: ServiceId,
        #[source]
        source: Box<DiError>,
    },
}

fn fmt_cycle(cycle: &[ServiceId]) -> String {
    cycle
        .iter()
        .map(ServiceId::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl DiError {
    /// Identity this error is about (for cycles, the identity that closed the loop).
    pub fn service(&self) -> Option<&ServiceId> {
        match self {
            Self::NotRegistered(id) | Self::NoActiveScope(id) => Some(id),
            Self::CircularDependency(cycle) => cycle.last(),
            Self::ConstructionFailed { id, .. } => Some(id),
            Self::DependencyUnsatisfied { owner, .. } => Some(owner),
        }
    }

    /// Returns true for [`DiError::NotRegistered`], the only failure
    /// `try_resolve` converts into an absent result.
    pub fn is_not_registered(&self) -> bool {
        matches!(self, Self::NotRegistered(_))
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, DiError>;
