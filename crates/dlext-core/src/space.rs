//! Residency and access-mode selectors.

use std::fmt;
use std::str::FromStr;

/// Where a caller wants the data to live.
///
/// `Device` is a request, not a guarantee: when the engine has no engaged
/// accelerator the resolver silently downgrades it to `Host`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecutionSpace {
    /// Host (CPU) memory.
    #[default]
    Host,
    /// Accelerator memory.
    Device,
}

impl ExecutionSpace {
    /// Stable integer code used across the C ABI (host = 0, device = 1).
    pub fn code(self) -> i32 {
        match self {
            Self::Host => 0,
            Self::Device => 1,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Host),
            1 => Some(Self::Device),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Device => f.write_str("device"),
        }
    }
}

impl FromStr for ExecutionSpace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Self::Host),
            "device" => Ok(Self::Device),
            other => Err(format!("unknown execution space '{other}'")),
        }
    }
}

/// How the consumer intends to touch the data.
///
/// Informational. Only writable properties (forces) change the sync
/// behaviour, and those are always treated as [`ReadWrite`](Self::ReadWrite).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Read only.
    #[default]
    Read,
    /// Read and modify in place.
    ReadWrite,
    /// Overwrite without reading.
    Overwrite,
}

impl AccessMode {
    /// C ABI code (read = 0, read-write = 1, overwrite = 2).
    pub fn code(self) -> i32 {
        match self {
            Self::Read => 0,
            Self::ReadWrite => 1,
            Self::Overwrite => 2,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Read),
            1 => Some(Self::ReadWrite),
            2 => Some(Self::Overwrite),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_codes_round_trip() {
        for s in [ExecutionSpace::Host, ExecutionSpace::Device] {
            assert_eq!(ExecutionSpace::from_code(s.code()), Some(s));
        }
        assert_eq!(ExecutionSpace::from_code(2), None);
    }

    #[test]
    fn space_parses_keywords() {
        assert_eq!("host".parse(), Ok(ExecutionSpace::Host));
        assert_eq!("device".parse(), Ok(ExecutionSpace::Device));
        assert!("gpu".parse::<ExecutionSpace>().is_err());
    }

    #[test]
    fn mode_codes_are_stable() {
        assert_eq!(AccessMode::default().code(), 0);
        assert_eq!(AccessMode::from_code(1), Some(AccessMode::ReadWrite));
        assert_eq!(AccessMode::from_code(2), Some(AccessMode::Overwrite));
        assert_eq!(AccessMode::from_code(-1), None);
        assert_eq!(AccessMode::from_code(3), None);
    }
}
