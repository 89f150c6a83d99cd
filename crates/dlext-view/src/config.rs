//! Sampler configuration, fix-argument parsing, and setup errors.
//!
//! [`SamplerConfig`] says which residency and which properties a
//! [`Sampler`](crate::Sampler) exposes. [`validate()`](SamplerConfig::validate)
//! checks it against a concrete engine before the first step, so every
//! failure here is fatal at setup time and nothing is retried later.

use std::error::Error;
use std::fmt;

use dlext_core::{AccessMode, ExecutionSpace, ParticleEngine, Property, PropertyError};
use smallvec::SmallVec;

use crate::registry::PropertyRegistry;

/// Properties every sampler must expose.
pub const REQUIRED_PROPERTIES: [Property; 3] =
    [Property::Positions, Property::Velocities, Property::Forces];

/// Style keyword in `fix <id> <group> dlext ...`.
pub const FIX_STYLE: &str = "dlext";

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while setting up a sampler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Fix arguments are malformed.
    IllegalArguments {
        /// What was wrong with them.
        reason: String,
    },
    /// Device residency requested from an engine built without an
    /// accelerator backend.
    DeviceUnavailable,
    /// The property list is empty.
    NoProperties,
    /// One of [`REQUIRED_PROPERTIES`] is absent.
    MissingRequired {
        /// The absent property.
        property: Property,
    },
    /// A property is listed more than once.
    DuplicateProperty {
        /// The repeated property.
        property: Property,
    },
    /// A listed property cannot be exposed by this engine.
    Property(PropertyError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalArguments { reason } => write!(f, "illegal fix dlext command: {reason}"),
            Self::DeviceUnavailable => {
                write!(f, "device space requested but no accelerator backend is built in")
            }
            Self::NoProperties => write!(f, "no properties configured"),
            Self::MissingRequired { property } => {
                write!(f, "required property {property} is not configured")
            }
            Self::DuplicateProperty { property } => {
                write!(f, "property {property} is configured more than once")
            }
            Self::Property(e) => write!(f, "property: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Property(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PropertyError> for ConfigError {
    fn from(e: PropertyError) -> Self {
        Self::Property(e)
    }
}

// ── SamplerConfig ──────────────────────────────────────────────────

/// What a sampler exposes each step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Requested residency. Resolved against the engine at each wrap.
    pub space: ExecutionSpace,
    /// Requested access. Recorded only; forces are always synced for
    /// writing and everything else for reading.
    pub mode: AccessMode,
    /// Properties to expose. Order is irrelevant; callbacks always see
    /// [`Property::CALLBACK_ORDER`].
    pub properties: SmallVec<[Property; 8]>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            space: ExecutionSpace::Host,
            mode: AccessMode::Read,
            properties: SmallVec::from_slice(&REQUIRED_PROPERTIES),
        }
    }
}

impl SamplerConfig {
    /// Default config on `space`.
    pub fn on(space: ExecutionSpace) -> Self {
        Self {
            space,
            ..Self::default()
        }
    }

    /// Add `property` if not already present.
    pub fn with(mut self, property: Property) -> Self {
        if !self.properties.contains(&property) {
            self.properties.push(property);
        }
        self
    }

    /// Every property, on `space`.
    pub fn all(space: ExecutionSpace) -> Self {
        Self {
            space,
            properties: SmallVec::from_slice(&Property::ALL),
            ..Self::default()
        }
    }

    /// Properties sorted into callback order.
    pub fn ordered(&self) -> SmallVec<[Property; 8]> {
        let mut ordered = self.properties.clone();
        ordered.sort_by_key(|p| p.callback_rank());
        ordered
    }

    /// Check structural invariants and engine support.
    ///
    /// A device request on an engine whose backend is built in but not
    /// engaged is accepted with a warning; wraps then fall back to host.
    pub fn validate(
        &self,
        engine: &dyn ParticleEngine,
        registry: &PropertyRegistry,
    ) -> Result<(), ConfigError> {
        if self.properties.is_empty() {
            return Err(ConfigError::NoProperties);
        }
        for (i, property) in self.properties.iter().enumerate() {
            if self.properties[..i].contains(property) {
                return Err(ConfigError::DuplicateProperty {
                    property: *property,
                });
            }
        }
        for property in REQUIRED_PROPERTIES {
            if !self.properties.contains(&property) {
                return Err(ConfigError::MissingRequired { property });
            }
        }
        for &property in &self.properties {
            let spec = registry
                .spec(property)
                .ok_or(PropertyError::Unregistered { property })?;
            if let Some(precondition) = spec.precondition {
                precondition(engine)
                    .map_err(|requirement| PropertyError::MissingPrecondition {
                        property,
                        requirement,
                    })?;
            }
        }
        if self.space == ExecutionSpace::Device {
            match engine.accelerator() {
                None => return Err(ConfigError::DeviceUnavailable),
                Some(accelerator) if !accelerator.active => {
                    log::warn!(
                        "accelerator {:?} is built in but not engaged; sampler will expose host arrays",
                        accelerator.device_type
                    );
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

// ── FixArgs ────────────────────────────────────────────────────────

/// Parsed `fix <id> <group> dlext [space host|device]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixArgs {
    /// Fix identifier.
    pub fix_id: String,
    /// Group the fix applies to.
    pub group_id: String,
    /// Requested residency; host unless given.
    pub space: ExecutionSpace,
}

impl FixArgs {
    /// Parse fix arguments without the leading `fix` keyword.
    ///
    /// Exactly three or five words are accepted.
    pub fn parse(args: &[&str]) -> Result<Self, ConfigError> {
        let illegal = |reason: String| ConfigError::IllegalArguments { reason };
        if args.len() != 3 && args.len() != 5 {
            return Err(illegal(format!("expected 3 or 5 arguments, got {}", args.len())));
        }
        if args[2] != FIX_STYLE {
            return Err(illegal(format!("unknown fix style '{}'", args[2])));
        }
        let space = if args.len() == 5 {
            if args[3] != "space" {
                return Err(illegal(format!("unknown keyword '{}'", args[3])));
            }
            args[4]
                .parse::<ExecutionSpace>()
                .map_err(|_| illegal(format!("unknown space '{}'", args[4])))?
        } else {
            ExecutionSpace::Host
        };
        Ok(Self {
            fix_id: args[0].to_owned(),
            group_id: args[1].to_owned(),
            space,
        })
    }

    /// Parse a whitespace-separated command line, with or without `fix`.
    pub fn parse_line(line: &str) -> Result<Self, ConfigError> {
        let mut words: Vec<&str> = line.split_whitespace().collect();
        if words.first() == Some(&"fix") {
            words.remove(0);
        }
        Self::parse(&words)
    }

    /// Default sampler config on the parsed residency.
    pub fn into_config(self) -> SamplerConfig {
        SamplerConfig::on(self.space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlext_core::DeviceType;
    use dlext_test_utils::MockEngine;

    fn registry() -> PropertyRegistry {
        PropertyRegistry::standard()
    }

    #[test]
    fn default_config_is_valid_on_host() {
        let engine = MockEngine::new(4, 1);
        assert!(SamplerConfig::default().validate(&engine, &registry()).is_ok());
    }

    #[test]
    fn empty_properties_rejected() {
        let cfg = SamplerConfig {
            properties: SmallVec::new(),
            ..SamplerConfig::default()
        };
        let engine = MockEngine::new(4, 1);
        assert_eq!(cfg.validate(&engine, &registry()), Err(ConfigError::NoProperties));
    }

    #[test]
    fn missing_forces_rejected() {
        let cfg = SamplerConfig {
            properties: SmallVec::from_slice(&[Property::Positions, Property::Velocities]),
            ..SamplerConfig::default()
        };
        let engine = MockEngine::new(4, 1);
        assert_eq!(
            cfg.validate(&engine, &registry()),
            Err(ConfigError::MissingRequired {
                property: Property::Forces
            })
        );
    }

    #[test]
    fn duplicate_rejected() {
        let mut cfg = SamplerConfig::default();
        cfg.properties.push(Property::Positions);
        let engine = MockEngine::new(4, 1);
        assert_eq!(
            cfg.validate(&engine, &registry()),
            Err(ConfigError::DuplicateProperty {
                property: Property::Positions
            })
        );
    }

    #[test]
    fn with_ignores_repeats() {
        let cfg = SamplerConfig::default().with(Property::Tags).with(Property::Tags);
        assert_eq!(cfg.properties.len(), 4);
    }

    #[test]
    fn tags_without_ids_rejected() {
        let cfg = SamplerConfig::default().with(Property::Tags);
        let engine = MockEngine::new(4, 1).without_tags();
        let err = cfg.validate(&engine, &registry()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Property(PropertyError::MissingPrecondition {
                property: Property::Tags,
                ..
            })
        ));
        assert!(err.source().is_some());
    }

    #[test]
    fn device_without_backend_rejected() {
        let engine = MockEngine::new(4, 1);
        assert_eq!(
            SamplerConfig::on(ExecutionSpace::Device).validate(&engine, &registry()),
            Err(ConfigError::DeviceUnavailable)
        );
    }

    #[test]
    fn device_with_idle_backend_accepted() {
        let engine = MockEngine::new(4, 1).with_accelerator(DeviceType::Cuda, false);
        assert!(SamplerConfig::on(ExecutionSpace::Device)
            .validate(&engine, &registry())
            .is_ok());
    }

    #[test]
    fn ordered_follows_callback_order() {
        let cfg = SamplerConfig::all(ExecutionSpace::Host);
        assert_eq!(cfg.ordered().as_slice(), &Property::CALLBACK_ORDER);
    }

    #[test]
    fn parse_three_args() {
        let args = FixArgs::parse(&["1", "all", "dlext"]).unwrap();
        assert_eq!(args.fix_id, "1");
        assert_eq!(args.group_id, "all");
        assert_eq!(args.space, ExecutionSpace::Host);
    }

    #[test]
    fn parse_five_args() {
        let args = FixArgs::parse_line("fix sampler all dlext space device").unwrap();
        assert_eq!(args.space, ExecutionSpace::Device);
        assert_eq!(args.into_config().space, ExecutionSpace::Device);
    }

    #[test]
    fn parse_rejects_other_arities() {
        for n in [0usize, 1, 2, 4, 6] {
            let words = vec!["x"; n];
            assert!(
                matches!(
                    FixArgs::parse(&words),
                    Err(ConfigError::IllegalArguments { .. })
                ),
                "arity {n} accepted"
            );
        }
    }

    #[test]
    fn parse_rejects_bad_keywords() {
        assert!(FixArgs::parse(&["1", "all", "external"]).is_err());
        assert!(FixArgs::parse(&["1", "all", "dlext", "mode", "host"]).is_err());
        let err = FixArgs::parse(&["1", "all", "dlext", "space", "gpu"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "illegal fix dlext command: unknown space 'gpu'"
        );
    }
}
