use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use std::{env, fmt, fs};

use blueprint_primitives::RubricEnforcement;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueprintConfig {
    /// Model gateway behaviour.
    pub gateway: GatewaySettings,
    /// Matrix experiment defaults.
    pub matrix: MatrixSettings,
    /// Logging setup.
    pub telemetry: TelemetrySettings,
}

/// Timeout and retry settings for model calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after "temporarily unavailable" responses.
    pub unavailable_retries: u32,
    /// Retries after other transient failures.
    pub transient_retries: u32,
    /// Backoff delays in seconds; the last entry repeats.
    pub backoff_secs: Vec<u64>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            unavailable_retries: 2,
            transient_retries: 5,
            backoff_secs: vec![1, 2, 4, 8, 16],
        }
    }
}

impl GatewaySettings {
    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff table as durations.
    #[must_use]
    pub fn backoff(&self) -> Vec<Duration> {
        self.backoff_secs.iter().copied().map(Duration::from_secs).collect()
    }
}

/// Defaults for matrix experiments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixSettings {
    /// Largest cartesian product a single run may expand to.
    pub max_cells: usize,
    /// Whether the judge phase runs.
    pub judge_enabled: bool,
    /// Whether two judges score each cell.
    pub dual_judge: bool,
    /// Judge scoring discipline.
    pub rubric: RubricEnforcement,
}

impl Default for MatrixSettings {
    fn default() -> Self {
        Self {
            max_cells: 64,
            judge_enabled: true,
            dual_judge: false,
            rubric: RubricEnforcement::Standard,
        }
    }
}

/// Tracing subscriber settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Whether log lines include the event target.
    pub with_target: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            with_target: false,
        }
    }
}

impl BlueprintConfig {
    /// Defaults adjusted by `BLUEPRINT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable does not parse.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Parses a JSON document. Absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document does not decode.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON file, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`], [`ConfigError::Parse`], or
    /// [`ConfigError::InvalidValue`].
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_json_str(&content)?.with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    ///
    /// Recognised keys: `BLUEPRINT_TIMEOUT_SECS`, `BLUEPRINT_UNAVAILABLE_RETRIES`,
    /// `BLUEPRINT_TRANSIENT_RETRIES`, `BLUEPRINT_BACKOFF_SECS` (comma separated),
    /// `BLUEPRINT_MAX_CELLS`, `BLUEPRINT_JUDGE_ENABLED`, `BLUEPRINT_DUAL_JUDGE`,
    /// `BLUEPRINT_RUBRIC`, `BLUEPRINT_LOG`, `BLUEPRINT_LOG_TARGET`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a value does not parse.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(v) = get("BLUEPRINT_TIMEOUT_SECS") {
            self.gateway.timeout_secs = parse("BLUEPRINT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("BLUEPRINT_UNAVAILABLE_RETRIES") {
            self.gateway.unavailable_retries = parse("BLUEPRINT_UNAVAILABLE_RETRIES", &v)?;
        }
        if let Some(v) = get("BLUEPRINT_TRANSIENT_RETRIES") {
            self.gateway.transient_retries = parse("BLUEPRINT_TRANSIENT_RETRIES", &v)?;
        }
        if let Some(v) = get("BLUEPRINT_BACKOFF_SECS") {
            self.gateway.backoff_secs = v
                .split(',')
                .map(|item| parse("BLUEPRINT_BACKOFF_SECS", item))
                .collect::<ConfigResult<_>>()?;
        }
        if let Some(v) = get("BLUEPRINT_MAX_CELLS") {
            self.matrix.max_cells = parse("BLUEPRINT_MAX_CELLS", &v)?;
        }
        if let Some(v) = get("BLUEPRINT_JUDGE_ENABLED") {
            self.matrix.judge_enabled = parse_flag("BLUEPRINT_JUDGE_ENABLED", &v)?;
        }
        if let Some(v) = get("BLUEPRINT_DUAL_JUDGE") {
            self.matrix.dual_judge = parse_flag("BLUEPRINT_DUAL_JUDGE", &v)?;
        }
        if let Some(v) = get("BLUEPRINT_RUBRIC") {
            self.matrix.rubric = parse("BLUEPRINT_RUBRIC", &v)?;
        }
        if let Some(v) = get("BLUEPRINT_LOG") {
            self.telemetry.filter = v.trim().to_owned();
        }
        if let Some(v) = get("BLUEPRINT_LOG_TARGET") {
            self.telemetry.with_target = parse_flag("BLUEPRINT_LOG_TARGET", &v)?;
        }
        Ok(self)
    }
}

fn parse<T>(key: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|err: T::Err| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
        reason: err.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
            reason: "expected a boolean".to_owned(),
        }),
    }
}
