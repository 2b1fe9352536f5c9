//! Matrix cell coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One concrete tone/length/format combination drawn from a matrix.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Combo {
    /// Tone identifier.
    pub tone: String,
    /// Length identifier.
    pub length: String,
    /// Format identifier.
    pub format: String,
}

impl Combo {
    /// Creates a combo from the three axis values.
    #[must_use]
    pub fn new(tone: impl Into<String>, length: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            tone: tone.into(),
            length: length.into(),
            format: format.into(),
        }
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tone, self.length, self.format)
    }
}
