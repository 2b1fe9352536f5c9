//! Closed set of output types a blueprint can target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of artefact the downstream model is asked to produce.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    /// Free-form text with no type-specific attributes.
    #[default]
    Text,
    /// Email message.
    Email,
    /// Marketing and conversion copy.
    Copywriting,
    /// Post for a social platform.
    SocialPost,
    /// Long-form article or blog post.
    Article,
    /// Source code.
    Code,
    /// Prompt for an image generation model.
    Image,
}

impl OutputType {
    /// Every output type, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Text,
        Self::Email,
        Self::Copywriting,
        Self::SocialPost,
        Self::Article,
        Self::Code,
        Self::Image,
    ];

    /// Returns the wire identifier (e.g. `social_post`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Copywriting => "copywriting",
            Self::SocialPost => "social_post",
            Self::Article => "article",
            Self::Code => "code",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| Error::UnknownOutputType(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("social_post".parse::<OutputType>().unwrap(), OutputType::SocialPost);
        assert!(matches!(
            "podcast".parse::<OutputType>(),
            Err(Error::UnknownOutputType(name)) if name == "podcast"
        ));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&OutputType::SocialPost).unwrap();
        assert_eq!(json, "\"social_post\"");
    }
}
