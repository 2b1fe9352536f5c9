//! Per-output-type attributes as an explicit sum type.

use blueprint_primitives::OutputType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Email attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailAttributes {
    /// e.g. `cold_outreach`, `follow_up`, `newsletter`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,
    /// Suggested subject line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_line: Option<String>,
    /// Recipient name or role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Call to action the email should end on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<String>,
    /// Whether to include a signature block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_signature: Option<bool>,
}

/// Copywriting attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopywritingAttributes {
    /// e.g. `landing_page`, `ad`, `product_description`, `tagline`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_type: Option<String>,
    /// e.g. `urgency`, `trust`, `aspiration`, `fomo`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotional_appeal: Option<String>,
    /// Product or offer being promoted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// Call to action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<String>,
    /// Benefits to highlight. An empty list in a merge patch leaves the
    /// existing list in place.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_benefits: Vec<String>,
}

/// Social post attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialPostAttributes {
    /// e.g. `linkedin`, `x`, `instagram`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Maximum post length in characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_limit: Option<u32>,
    /// Whether hashtags should be included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_hashtags: Option<bool>,
    /// Whether emoji are allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_emoji: Option<bool>,
}

/// Article attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleAttributes {
    /// e.g. `how_to`, `listicle`, `opinion`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_type: Option<String>,
    /// SEO keywords. An empty list in a merge patch leaves the existing list
    /// in place.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target_keywords: Vec<String>,
    /// Desired number of sections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_count: Option<u32>,
    /// Whether to open with an outline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_outline: Option<bool>,
}

/// Code attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeAttributes {
    /// Programming language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Framework or runtime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    /// Whether tests are expected alongside the code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_tests: Option<bool>,
    /// Whether inline comments are expected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_comments: Option<bool>,
}

/// Image prompt attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageAttributes {
    /// Visual style, e.g. `photorealistic`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Aspect ratio as `W:H`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// Main subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Things the image must not contain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

/// Type-specific attributes, one variant per output type that has any.
///
/// [`OutputType::Text`] carries none.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeSpecific {
    /// Email attributes.
    Email(EmailAttributes),
    /// Copywriting attributes.
    Copywriting(CopywritingAttributes),
    /// Social post attributes.
    SocialPost(SocialPostAttributes),
    /// Article attributes.
    Article(ArticleAttributes),
    /// Code attributes.
    Code(CodeAttributes),
    /// Image prompt attributes.
    Image(ImageAttributes),
}

impl TypeSpecific {
    /// Output type this variant belongs to.
    #[must_use]
    pub const fn output_type(&self) -> OutputType {
        match self {
            Self::Email(_) => OutputType::Email,
            Self::Copywriting(_) => OutputType::Copywriting,
            Self::SocialPost(_) => OutputType::SocialPost,
            Self::Article(_) => OutputType::Article,
            Self::Code(_) => OutputType::Code,
            Self::Image(_) => OutputType::Image,
        }
    }

    /// Empty attributes for an output type, or `None` for [`OutputType::Text`].
    #[must_use]
    pub fn empty_for(output_type: OutputType) -> Option<Self> {
        match output_type {
            OutputType::Text => None,
            OutputType::Email => Some(Self::Email(EmailAttributes::default())),
            OutputType::Copywriting => Some(Self::Copywriting(CopywritingAttributes::default())),
            OutputType::SocialPost => Some(Self::SocialPost(SocialPostAttributes::default())),
            OutputType::Article => Some(Self::Article(ArticleAttributes::default())),
            OutputType::Code => Some(Self::Code(CodeAttributes::default())),
            OutputType::Image => Some(Self::Image(ImageAttributes::default())),
        }
    }

    /// Shallow-merges `patch` over `self`.
    ///
    /// Fields present in the patch overwrite, absent fields are kept. A patch of a
    /// different variant replaces the value wholesale.
    ///
    /// `None` and empty lists both count as absent, so a patch cannot clear a
    /// list. Assign a fresh value instead of merging to drop list entries.
    #[must_use]
    pub fn merged(&self, patch: &Self) -> Self {
        if self.output_type() != patch.output_type() {
            return patch.clone();
        }

        let (Ok(Value::Object(mut base)), Ok(Value::Object(overlay))) =
            (serde_json::to_value(self), serde_json::to_value(patch))
        else {
            return patch.clone();
        };
        for (key, value) in overlay {
            if !value.is_null() {
                base.insert(key, value);
            }
        }

        serde_json::from_value(Value::Object(base)).unwrap_or_else(|err| {
            debug!(%err, "type-specific merge failed to decode; using patch");
            patch.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_absent_fields() {
        let base = TypeSpecific::Code(CodeAttributes {
            language: Some("rust".into()),
            include_tests: Some(true),
            ..CodeAttributes::default()
        });
        let patch = TypeSpecific::Code(CodeAttributes {
            framework: Some("axum".into()),
            include_tests: Some(false),
            ..CodeAttributes::default()
        });

        let TypeSpecific::Code(merged) = base.merged(&patch) else {
            panic!("variant changed");
        };
        assert_eq!(merged.language.as_deref(), Some("rust"));
        assert_eq!(merged.framework.as_deref(), Some("axum"));
        assert_eq!(merged.include_tests, Some(false));
    }

    #[test]
    fn empty_list_in_patch_keeps_existing_entries() {
        let base = TypeSpecific::Article(ArticleAttributes {
            target_keywords: vec!["rust".into(), "async".into()],
            ..ArticleAttributes::default()
        });
        let patch = TypeSpecific::Article(ArticleAttributes {
            section_count: Some(4),
            ..ArticleAttributes::default()
        });

        let TypeSpecific::Article(merged) = base.merged(&patch) else {
            panic!("variant changed");
        };
        assert_eq!(merged.target_keywords, ["rust", "async"]);
        assert_eq!(merged.section_count, Some(4));
    }

    #[test]
    fn merge_with_other_variant_replaces() {
        let base = TypeSpecific::Code(CodeAttributes::default());
        let patch = TypeSpecific::Email(EmailAttributes {
            email_type: Some("follow_up".into()),
            ..EmailAttributes::default()
        });
        assert_eq!(base.merged(&patch), patch);
    }

    #[test]
    fn serialises_with_kind_tag() {
        let value = serde_json::to_value(TypeSpecific::SocialPost(SocialPostAttributes {
            platform: Some("linkedin".into()),
            ..SocialPostAttributes::default()
        }))
        .unwrap();
        assert_eq!(value["kind"], "social_post");
        assert_eq!(value["platform"], "linkedin");
    }
}
