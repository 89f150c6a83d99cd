//! Setup-time errors for property availability.

use std::error::Error;
use std::fmt;

use crate::property::Property;

/// A property cannot be exposed by this engine.
///
/// Raised at setup time, before any descriptor is built. Not retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyError {
    /// The engine lacks the per-particle bookkeeping the property needs.
    MissingPrecondition {
        /// The requested property.
        property: Property,
        /// What the engine must enable first.
        requirement: &'static str,
    },
    /// The property has no row in the registry in use.
    Unregistered {
        /// The requested property.
        property: Property,
    },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPrecondition {
                property,
                requirement,
            } => write!(f, "cannot expose {property}: {requirement}"),
            Self::Unregistered { property } => {
                write!(f, "property {property} is not registered")
            }
        }
    }
}

impl Error for PropertyError {}
