//! Scoring discipline requested from judge models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How harshly judges apply the rubric.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RubricEnforcement {
    /// Give credit for partial compliance.
    Lenient,
    /// Score as written.
    #[default]
    Standard,
    /// Penalise every deviation.
    Strict,
}

impl RubricEnforcement {
    /// Lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lenient => "lenient",
            Self::Standard => "standard",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for RubricEnforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RubricEnforcement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "standard" => Ok(Self::Standard),
            "strict" => Ok(Self::Strict),
            other => Err(Error::UnknownRubric(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" Strict ".parse::<RubricEnforcement>().unwrap(), RubricEnforcement::Strict);
        assert_eq!(RubricEnforcement::default(), RubricEnforcement::Standard);
        assert!("harsh".parse::<RubricEnforcement>().is_err());
    }
}
