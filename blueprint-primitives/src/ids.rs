//! Identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

const MAX_ID_LEN: usize = 64;

/// Unique identifier for one matrix experiment run.
///
/// A fresh id is minted per run so cells produced by different runs can never be
/// confused in caller-side storage.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentId(Uuid);

impl ExperimentId {
    /// Generates a random experiment identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for ExperimentId {
    fn default() -> Self {
        Self::random()
    }
}

impl Display for ExperimentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for ExperimentId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let uuid = Uuid::parse_str(s).map_err(Error::from)?;
        Ok(Self(uuid))
    }
}

/// Validates a catalog or template identifier such as `professional` or
/// `blueprint-architect`.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] if the identifier is empty, too long, or
/// contains characters outside lowercase alphanumerics, dash, underscore, or dot.
pub fn validate_identifier(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidIdentifier {
            id: String::new(),
            reason: "identifier cannot be empty".into(),
        });
    }

    if id.len() > MAX_ID_LEN {
        return Err(Error::InvalidIdentifier {
            id: id.into(),
            reason: format!("identifier length must be <= {MAX_ID_LEN}"),
        });
    }

    if !id
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_' | '.'))
    {
        return Err(Error::InvalidIdentifier {
            id: id.into(),
            reason: "identifier must contain lowercase alphanumeric, dash, underscore, or dot"
                .into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_id_parses_display_form() {
        let id = ExperimentId::random();
        let parsed = id.to_string().parse::<ExperimentId>().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_uppercase_identifiers() {
        let err = validate_identifier("Professional").expect_err("uppercase rejected");
        assert!(matches!(err, Error::InvalidIdentifier { .. }));
        assert!(validate_identifier("social_post").is_ok());
    }
}
