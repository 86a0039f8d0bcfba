//! Access policies for combined groups.
//!
//! The policy governs which supervisors retain access to a merged unit.
//! This crate validates and carries the chosen value; interpretation is
//! the access-control collaborator's job.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// Every supervisor of either source group.
    #[default]
    All,
    /// Only supervisors of the initiating group.
    First,
    /// An explicit caller-supplied subset.
    Specific,
    /// No automatic grants.
    Manual,
}

impl AccessPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPolicy::All => "all",
            AccessPolicy::First => "first",
            AccessPolicy::Specific => "specific",
            AccessPolicy::Manual => "manual",
        }
    }
}

impl std::str::FromStr for AccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AccessPolicy::All),
            "first" => Ok(AccessPolicy::First),
            "specific" => Ok(AccessPolicy::Specific),
            "manual" => Ok(AccessPolicy::Manual),
            other => Err(format!(
                "invalid access policy '{other}' (expected all|first|specific|manual)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for p in [
            AccessPolicy::All,
            AccessPolicy::First,
            AccessPolicy::Specific,
            AccessPolicy::Manual,
        ] {
            assert_eq!(p.as_str().parse::<AccessPolicy>(), Ok(p));
        }
    }

    #[test]
    fn test_invalid_rejected() {
        assert!("everyone".parse::<AccessPolicy>().is_err());
        assert!("".parse::<AccessPolicy>().is_err());
    }

    #[test]
    fn test_default_is_all() {
        assert_eq!(AccessPolicy::default(), AccessPolicy::All);
    }
}
