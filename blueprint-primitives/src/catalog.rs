//! Immutable lookup tables for the tone, length, format, and output-type axes.
//!
//! A [`Catalog`] is built once (from [`Catalog::standard`] or JSON) and shared
//! read-only by the assembler and the matrix runner. Tests substitute their own
//! fixtures by building a catalog with [`CatalogBuilder`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::ids::validate_identifier;
use crate::output_type::OutputType;

/// Human-readable description of one axis value (a tone, a length, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Stable identifier, e.g. `professional`.
    pub id: String,
    /// Short display label.
    pub label: String,
    /// Instruction text injected into prompts when this value is selected.
    #[serde(default)]
    pub guidance: String,
    /// Extra attributes exposed to templates verbatim (word ranges, etc.).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Descriptor {
    /// Creates a descriptor with no extra attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, guidance: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            guidance: guidance.into(),
            attributes: Map::new(),
        }
    }

    /// Adds an extra attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Minimal descriptor used when a caller selects an id the catalog lacks.
    #[must_use]
    pub fn unknown(id: &str) -> Self {
        Self::new(id, id, "")
    }

    /// Converts the descriptor into a JSON object for template contexts.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Read-only registry of axis descriptors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    tones: Vec<Descriptor>,
    lengths: Vec<Descriptor>,
    formats: Vec<Descriptor>,
    #[serde(default)]
    output_types: BTreeMap<OutputType, Descriptor>,
}

impl Catalog {
    /// Starts building a catalog.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Decodes and validates a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] if the JSON does not decode, or
    /// [`Error::InvalidIdentifier`] if an entry id is malformed or duplicated.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Self = serde_json::from_str(json).map_err(|err| Error::InvalidCatalog {
            reason: err.to_string(),
        })?;
        let mut builder = Self::builder();
        for tone in raw.tones {
            builder = builder.tone(tone)?;
        }
        for length in raw.lengths {
            builder = builder.length(length)?;
        }
        for format in raw.formats {
            builder = builder.format(format)?;
        }
        for (output_type, descriptor) in raw.output_types {
            builder = builder.output_type(output_type, descriptor);
        }
        Ok(builder.build())
    }

    /// Built-in tables used when the caller supplies no catalog of its own.
    #[must_use]
    pub fn standard() -> Self {
        let tones = [
            ("professional", "Professional", "Polished, precise, and businesslike. Avoid slang."),
            ("casual", "Casual", "Relaxed and conversational, like talking to a colleague."),
            ("friendly", "Friendly", "Warm and approachable while staying clear."),
            ("persuasive", "Persuasive", "Benefit-led and confident, building toward a clear call to action."),
            ("authoritative", "Authoritative", "Expert and assured, backing claims with specifics."),
            ("playful", "Playful", "Light, witty, and energetic without losing the point."),
            ("empathetic", "Empathetic", "Acknowledges the reader's situation before offering help."),
        ];
        let formats = [
            ("paragraph", "Paragraphs", "Flowing prose organised into short paragraphs."),
            ("bullet_points", "Bullet points", "Scannable bullet points, one idea per bullet."),
            ("numbered_list", "Numbered list", "Ordered, numbered steps or items."),
            ("markdown", "Markdown", "Markdown with headings, lists, and emphasis where useful."),
            ("email", "Email", "Subject line, greeting, body, and sign-off."),
            ("table", "Table", "A table with labelled columns."),
        ];

        let mut builder = Self::builder();
        for (id, label, guidance) in tones {
            builder.tones.push(Descriptor::new(id, label, guidance));
        }
        builder.lengths.push(
            Descriptor::new("short", "Short", "Keep it brief: roughly 50 to 150 words.")
                .with_attribute("min_words", 50)
                .with_attribute("max_words", 150),
        );
        builder.lengths.push(
            Descriptor::new("medium", "Medium", "Moderate depth: roughly 150 to 400 words.")
                .with_attribute("min_words", 150)
                .with_attribute("max_words", 400),
        );
        builder.lengths.push(
            Descriptor::new("long", "Long", "Thorough coverage: roughly 400 to 1000 words.")
                .with_attribute("min_words", 400)
                .with_attribute("max_words", 1000),
        );
        for (id, label, guidance) in formats {
            builder.formats.push(Descriptor::new(id, label, guidance));
        }

        let output_types = [
            (OutputType::Text, "Text", "General-purpose written content."),
            (OutputType::Email, "Email", "An email ready to send."),
            (OutputType::Copywriting, "Copywriting", "Marketing copy written to convert."),
            (OutputType::SocialPost, "Social post", "A post tailored to a social platform."),
            (OutputType::Article, "Article", "A structured long-form article or blog post."),
            (OutputType::Code, "Code", "Working, idiomatic source code."),
            (OutputType::Image, "Image prompt", "A detailed prompt for an image generation model."),
        ];
        for (ty, label, guidance) in output_types {
            builder = builder.output_type(ty, Descriptor::new(ty.as_str(), label, guidance));
        }

        builder.build()
    }

    /// Looks up a tone descriptor by id.
    #[must_use]
    pub fn tone(&self, id: &str) -> Option<&Descriptor> {
        self.tones.iter().find(|d| d.id == id)
    }

    /// Looks up a length descriptor by id.
    #[must_use]
    pub fn length(&self, id: &str) -> Option<&Descriptor> {
        self.lengths.iter().find(|d| d.id == id)
    }

    /// Looks up a format descriptor by id.
    #[must_use]
    pub fn format(&self, id: &str) -> Option<&Descriptor> {
        self.formats.iter().find(|d| d.id == id)
    }

    /// Looks up the descriptor for an output type.
    #[must_use]
    pub fn output_type(&self, output_type: OutputType) -> Option<&Descriptor> {
        self.output_types.get(&output_type)
    }

    /// All tone descriptors in catalog order.
    #[must_use]
    pub fn tones(&self) -> &[Descriptor] {
        &self.tones
    }

    /// All length descriptors in catalog order.
    #[must_use]
    pub fn lengths(&self) -> &[Descriptor] {
        &self.lengths
    }

    /// All format descriptors in catalog order.
    #[must_use]
    pub fn formats(&self) -> &[Descriptor] {
        &self.formats
    }
}

/// Builder for [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    tones: Vec<Descriptor>,
    lengths: Vec<Descriptor>,
    formats: Vec<Descriptor>,
    output_types: BTreeMap<OutputType, Descriptor>,
}

impl CatalogBuilder {
    /// Adds a tone descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if the id is malformed or already present.
    pub fn tone(mut self, descriptor: Descriptor) -> Result<Self> {
        push_unique(&mut self.tones, descriptor)?;
        Ok(self)
    }

    /// Adds a length descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if the id is malformed or already present.
    pub fn length(mut self, descriptor: Descriptor) -> Result<Self> {
        push_unique(&mut self.lengths, descriptor)?;
        Ok(self)
    }

    /// Adds a format descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if the id is malformed or already present.
    pub fn format(mut self, descriptor: Descriptor) -> Result<Self> {
        push_unique(&mut self.formats, descriptor)?;
        Ok(self)
    }

    /// Sets the descriptor for an output type, replacing any previous entry.
    #[must_use]
    pub fn output_type(mut self, output_type: OutputType, descriptor: Descriptor) -> Self {
        self.output_types.insert(output_type, descriptor);
        self
    }

    /// Finalises the catalog.
    #[must_use]
    pub fn build(self) -> Catalog {
        Catalog {
            tones: self.tones,
            lengths: self.lengths,
            formats: self.formats,
            output_types: self.output_types,
        }
    }
}

fn push_unique(entries: &mut Vec<Descriptor>, descriptor: Descriptor) -> Result<()> {
    validate_identifier(&descriptor.id)?;
    if entries.iter().any(|d| d.id == descriptor.id) {
        return Err(Error::InvalidIdentifier {
            id: descriptor.id,
            reason: "identifier already registered".into(),
        });
    }
    entries.push(descriptor);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_resolves_axis_values() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.tone("professional").unwrap().label, "Professional");
        assert_eq!(
            catalog.length("short").unwrap().attributes["max_words"],
            Value::from(150)
        );
        assert!(catalog.format("email").is_some());
        assert!(catalog.output_type(OutputType::Code).is_some());
        assert!(catalog.tone("sarcastic").is_none());
    }

    #[test]
    fn builder_rejects_duplicate_ids() {
        let err = Catalog::builder()
            .tone(Descriptor::new("calm", "Calm", ""))
            .unwrap()
            .tone(Descriptor::new("calm", "Calm again", ""))
            .expect_err("duplicate");
        assert!(matches!(err, Error::InvalidIdentifier { .. }));
    }

    #[test]
    fn loads_from_json() {
        let json = r#"{
            "tones": [{ "id": "dry", "label": "Dry", "guidance": "Deadpan." }],
            "lengths": [{ "id": "tiny", "label": "Tiny" }],
            "formats": []
        }"#;
        let catalog = Catalog::from_json(json).expect("catalog");
        assert_eq!(catalog.tone("dry").unwrap().guidance, "Deadpan.");
        assert_eq!(catalog.length("tiny").unwrap().guidance, "");
        assert!(catalog.formats().is_empty());
    }
}
