//! Provider API keys.

use std::{env, fmt};

use crate::traits::Provider;

/// Environment variable holding the `OpenAI` key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable holding the Anthropic key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
/// Environment variable holding the Gemini key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Per-provider API keys. `Debug` never prints key material.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    openai: Option<String>,
    anthropic: Option<String>,
    gemini: Option<String>,
}

impl Credentials {
    /// No keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every provider key from its environment variable.
    #[must_use]
    pub fn from_env() -> Self {
        Provider::ALL.into_iter().fold(Self::new(), |creds, provider| {
            match env::var(Self::env_var(provider)) {
                Ok(key) => creds.with(provider, key),
                Err(_) => creds,
            }
        })
    }

    /// Environment variable read for `provider`.
    #[must_use]
    pub const fn env_var(provider: Provider) -> &'static str {
        match provider {
            Provider::OpenAi => OPENAI_API_KEY_ENV,
            Provider::Anthropic => ANTHROPIC_API_KEY_ENV,
            Provider::Gemini => GEMINI_API_KEY_ENV,
        }
    }

    /// Sets the key for `provider`. Blank keys clear it.
    #[must_use]
    pub fn with(mut self, provider: Provider, key: impl Into<String>) -> Self {
        let key = key.into();
        let key = (!key.trim().is_empty()).then(|| key.trim().to_owned());
        *self.slot(provider) = key;
        self
    }

    /// Returns the key for `provider`.
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::OpenAi => self.openai.as_deref(),
            Provider::Anthropic => self.anthropic.as_deref(),
            Provider::Gemini => self.gemini.as_deref(),
        }
    }

    /// Returns `true` when a key for `provider` is present.
    #[must_use]
    pub fn has(&self, provider: Provider) -> bool {
        self.get(provider).is_some()
    }

    fn slot(&mut self, provider: Provider) -> &mut Option<String> {
        match provider {
            Provider::OpenAi => &mut self.openai,
            Provider::Anthropic => &mut self.anthropic,
            Provider::Gemini => &mut self.gemini,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for provider in Provider::ALL.into_iter().filter(|p| self.has(*p)) {
            list.entry(&provider);
        }
        list.finish()
    }
}
