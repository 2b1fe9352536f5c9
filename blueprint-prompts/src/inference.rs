//! Pattern-based guesses about a brief: output type and per-type attributes.

use std::fmt::Write as _;
use std::sync::LazyLock;

use blueprint_primitives::OutputType;
use blueprint_spec::{CodeAttributes, CopywritingAttributes, EmailAttributes, SocialPostAttributes, TypeSpecific};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A detected value together with the reason it was picked.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Detected<T> {
    /// The detected value.
    pub value: T,
    /// Human-readable explanation.
    pub reason: String,
}

/// Everything [`infer_settings`] could guess from a brief.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct InferredSettings {
    /// Guessed output type.
    pub output_type: Option<Detected<OutputType>>,
    /// Guessed email type.
    pub email_type: Option<Detected<String>>,
    /// Guessed copy type.
    pub copy_type: Option<Detected<String>>,
    /// Guessed emotional appeal.
    pub emotional_appeal: Option<Detected<String>>,
    /// Guessed social platform.
    pub platform: Option<Detected<String>>,
    /// Guessed programming language.
    pub language: Option<Detected<String>>,
}

struct Pattern<T> {
    value: T,
    regex: Regex,
    label: &'static str,
}

fn table<T: Copy>(entries: &[(T, &'static str, &'static str)]) -> Vec<Pattern<T>> {
    entries
        .iter()
        .map(|&(value, pattern, label)| Pattern {
            value,
            regex: Regex::new(&format!("(?i){pattern}")).expect("static pattern compiles"),
            label,
        })
        .collect()
}

static OUTPUT_TYPES: LazyLock<Vec<Pattern<OutputType>>> = LazyLock::new(|| {
    table(&[
        (OutputType::Email, r"\b(e-?mail|newsletter|inbox|subject line)\b", "mentions email"),
        (
            OutputType::SocialPost,
            r"\b(tweet|linkedin|instagram|facebook|threads|social( media)? post|hashtags?)\b",
            "mentions a social platform",
        ),
        (
            OutputType::Copywriting,
            r"\b(landing page|ad copy|advert|tagline|slogan|product description|sales page|headline)\b",
            "mentions marketing copy",
        ),
        (
            OutputType::Article,
            r"\b(article|blog( post)?|essay|guide|tutorial|whitepaper)\b",
            "mentions long-form writing",
        ),
        (
            OutputType::Image,
            r"\b(image|picture|illustration|photo|logo|artwork|midjourney|dall-?e)\b",
            "mentions visual output",
        ),
        (
            OutputType::Code,
            r"\b(function|script|code|class|api|endpoint|regex|sql|python|rust|javascript|typescript|golang|bash)\b",
            "mentions programming",
        ),
    ])
});

static EMAIL_TYPES: LazyLock<Vec<Pattern<&'static str>>> = LazyLock::new(|| {
    table(&[
        ("follow_up", r"\bfollow[- ]?up\b", "asks for a follow-up"),
        ("cold_outreach", r"\b(cold (email|outreach)|introduc\w*|reach out)\b", "reaches out to a new contact"),
        ("newsletter", r"\bnewsletter\b", "mentions a newsletter"),
        ("announcement", r"\bannounc\w*\b", "announces something"),
    ])
});

static COPY_TYPES: LazyLock<Vec<Pattern<&'static str>>> = LazyLock::new(|| {
    table(&[
        ("landing_page", r"\blanding page\b", "mentions a landing page"),
        ("product_description", r"\bproduct description\b", "mentions a product description"),
        ("tagline", r"\b(tagline|slogan)\b", "asks for a tagline"),
        ("sales_page", r"\bsales page\b", "mentions a sales page"),
        ("ad", r"\b(ads?|advert\w*|ad copy)\b", "mentions advertising"),
    ])
});

static APPEALS: LazyLock<Vec<Pattern<&'static str>>> = LazyLock::new(|| {
    table(&[
        ("fomo", r"(\bdon'?t miss\b|\blast chance\b|\bexclusive\b|\bsold out\b|\bfomo\b)", "scarcity language"),
        ("urgency", r"\b(urgent|limited time|today only|deadline|hurry|act now)\b", "time pressure"),
        ("trust", r"\b(trust\w*|reliable|secure|proven|guarantee\w*)\b", "reassurance language"),
        ("aspiration", r"\b(dream|aspire|transform|achieve|elevate|luxury)\b", "aspirational language"),
    ])
});

static PLATFORMS: LazyLock<Vec<Pattern<&'static str>>> = LazyLock::new(|| {
    table(&[
        ("linkedin", r"\blinkedin\b", "mentions LinkedIn"),
        ("x", r"\b(tweet|twitter|x\.com)\b", "mentions X/Twitter"),
        ("instagram", r"\b(instagram|insta)\b", "mentions Instagram"),
        ("facebook", r"\bfacebook\b", "mentions Facebook"),
        ("threads", r"\bthreads\b", "mentions Threads"),
    ])
});

static LANGUAGES: LazyLock<Vec<Pattern<&'static str>>> = LazyLock::new(|| {
    table(&[
        ("rust", r"\brust\b", "names Rust"),
        ("python", r"\bpython\b", "names Python"),
        ("typescript", r"\btypescript\b", "names TypeScript"),
        ("javascript", r"\b(javascript|node\.?js)\b", "names JavaScript"),
        ("go", r"\bgolang\b", "names Go"),
        ("sql", r"\bsql\b", "names SQL"),
        ("bash", r"\b(bash|shell script)\b", "names Bash"),
    ])
});

fn first_match<T: Clone>(patterns: &[Pattern<T>], text: &str) -> Option<Detected<T>> {
    patterns.iter().find_map(|pattern| {
        pattern.regex.find(text).map(|found| Detected {
            value: pattern.value.clone(),
            reason: format!("{} (\"{}\")", pattern.label, found.as_str()),
        })
    })
}

fn owned(detected: Option<Detected<&'static str>>) -> Option<Detected<String>> {
    detected.map(|d| Detected {
        value: d.value.to_owned(),
        reason: d.reason,
    })
}

/// Runs every pattern table over `text`.
#[must_use]
pub fn infer_settings(text: &str) -> InferredSettings {
    InferredSettings {
        output_type: first_match(&OUTPUT_TYPES, text),
        email_type: owned(first_match(&EMAIL_TYPES, text)),
        copy_type: owned(first_match(&COPY_TYPES, text)),
        emotional_appeal: owned(first_match(&APPEALS, text)),
        platform: owned(first_match(&PLATFORMS, text)),
        language: owned(first_match(&LANGUAGES, text)),
    }
}

impl InferredSettings {
    /// Type-specific attributes implied by the detections for `output_type`.
    #[must_use]
    pub fn type_specific(&self, output_type: OutputType) -> Option<TypeSpecific> {
        let value = |d: &Option<Detected<String>>| d.as_ref().map(|d| d.value.clone());
        let attributes = match output_type {
            OutputType::Email => TypeSpecific::Email(EmailAttributes {
                email_type: value(&self.email_type),
                ..EmailAttributes::default()
            }),
            OutputType::Copywriting => TypeSpecific::Copywriting(CopywritingAttributes {
                copy_type: value(&self.copy_type),
                emotional_appeal: value(&self.emotional_appeal),
                ..CopywritingAttributes::default()
            }),
            OutputType::SocialPost => TypeSpecific::SocialPost(SocialPostAttributes {
                platform: value(&self.platform),
                ..SocialPostAttributes::default()
            }),
            OutputType::Code => TypeSpecific::Code(CodeAttributes {
                language: value(&self.language),
                ..CodeAttributes::default()
            }),
            OutputType::Text | OutputType::Article | OutputType::Image => return None,
        };
        (TypeSpecific::empty_for(output_type).as_ref() != Some(&attributes)).then_some(attributes)
    }

    /// Detections relevant to `output_type`, as `(field, value, reason)` rows.
    #[must_use]
    pub fn relevant_rows(&self, output_type: OutputType) -> Vec<(&'static str, String, String)> {
        let row = |field: &'static str, d: &Option<Detected<String>>| {
            d.as_ref().map(|d| (field, d.value.clone(), d.reason.clone()))
        };
        let rows = match output_type {
            OutputType::Email => vec![row("email type", &self.email_type)],
            OutputType::Copywriting => vec![
                row("copy type", &self.copy_type),
                row("emotional appeal", &self.emotional_appeal),
            ],
            OutputType::SocialPost => vec![row("platform", &self.platform)],
            OutputType::Code => vec![row("language", &self.language)],
            OutputType::Text | OutputType::Article | OutputType::Image => Vec::new(),
        };
        rows.into_iter().flatten().collect()
    }
}

/// Renders an "auto-detected settings" note from `(field, value, reason)` rows.
#[must_use]
pub fn auto_detected_note(rows: &[(&str, String, String)]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let mut note = String::from("Auto-detected settings (the caller did not choose these explicitly):");
    for (field, value, reason) in rows {
        let _ = write!(note, "\n- {field}: {value} ({reason})");
    }
    Some(note)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_email_briefs() {
        let settings = infer_settings("write an email to follow up after the demo");
        assert_eq!(settings.output_type.unwrap().value, OutputType::Email);
        assert_eq!(settings.email_type.unwrap().value, "follow_up");
    }

    #[test]
    fn detects_copy_attributes() {
        let settings = infer_settings("Landing page for our luxury watch, limited time offer");
        assert_eq!(settings.output_type.as_ref().unwrap().value, OutputType::Copywriting);
        let Some(TypeSpecific::Copywriting(copy)) = settings.type_specific(OutputType::Copywriting)
        else {
            panic!("expected copy attributes");
        };
        assert_eq!(copy.copy_type.as_deref(), Some("landing_page"));
        assert_eq!(copy.emotional_appeal.as_deref(), Some("urgency"));
    }

    #[test]
    fn detects_code_language() {
        let settings = infer_settings("A Rust function that parses CSV");
        assert_eq!(settings.output_type.unwrap().value, OutputType::Code);
        assert_eq!(settings.language.unwrap().value, "rust");
    }

    #[test]
    fn plain_brief_detects_nothing() {
        let settings = infer_settings("thoughts on gardening");
        assert_eq!(settings, InferredSettings::default());
        assert!(settings.type_specific(OutputType::Email).is_none());
        assert!(auto_detected_note(&settings.relevant_rows(OutputType::Email)).is_none());
    }

    #[test]
    fn note_lists_each_detection() {
        let rows = vec![("platform", "linkedin".to_owned(), "mentions LinkedIn".to_owned())];
        let note = auto_detected_note(&rows).unwrap();
        assert!(note.starts_with("Auto-detected settings"));
        assert!(note.contains("- platform: linkedin (mentions LinkedIn)"));
    }
}
