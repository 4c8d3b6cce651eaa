//! Codec configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via AMFWIRE_CONFIG or --config)
//! 3. Environment variables

use amfwire_core::Value;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Codec configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Date handling.
    pub dates: DatesConfig,
    /// Values written as null.
    pub nullable: NullableConfig,
    /// Decoder behaviour.
    pub deserialization: DeserializationConfig,
    /// Encoder behaviour.
    pub serialization: SerializationConfig,
    /// Error body contents.
    pub faults: FaultsConfig,
}

impl CodecConfig {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("AMFWIRE_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: CodecConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.dates.apply_env_overrides();
        self.nullable.apply_env_overrides();
        self.deserialization.apply_env_overrides();
        self.serialization.apply_env_overrides();
        self.faults.apply_env_overrides();
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.deserialization.validate()
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.to_lowercase() == "true")
}

/// How v0 date timezone offsets and local clocks are applied on decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimezoneCompensation {
    /// Dates stay in UTC.
    #[default]
    None,
    /// The offset carried on the wire is added to the wall-clock time.
    Auto,
    /// Dates are converted to the host's local time.
    Server,
    /// Dates stay in UTC; the UTC kind is not propagated to consumers.
    IgnoreUtcKind,
}

impl TimezoneCompensation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "auto" => Some(Self::Auto),
            "server" => Some(Self::Server),
            "ignore_utc_kind" | "ignoreutckind" => Some(Self::IgnoreUtcKind),
            _ => None,
        }
    }
}

/// Date handling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatesConfig {
    pub timezone_compensation: TimezoneCompensation,
}

impl DatesConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(policy) = std::env::var("AMFWIRE_TIMEZONE_COMPENSATION") {
            if let Some(parsed) = TimezoneCompensation::parse(&policy) {
                self.timezone_compensation = parsed;
            }
        }
    }
}

/// Sentinel values that encode as null.
///
/// Lets services that cannot express "no value" for scalar fields pick a
/// marker value instead (for example `i32::MIN` or the epoch).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullableConfig {
    /// Sentinels are only honoured when enabled.
    pub enabled: bool,
    pub integer: Option<i32>,
    pub number: Option<f64>,
    pub string: Option<String>,
    /// Date sentinel as milliseconds since the epoch.
    pub date_millis: Option<i64>,
    pub boolean: Option<bool>,
}

impl NullableConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(enabled) = env_flag("AMFWIRE_ACCEPT_NULL_VALUES") {
            self.enabled = enabled;
        }
    }

    /// Returns whether `value` equals the sentinel configured for its kind.
    pub fn matches(&self, value: &Value) -> bool {
        if !self.enabled {
            return false;
        }
        match value {
            Value::Integer(i) => self.integer == Some(*i),
            Value::Number(n) => self.number == Some(*n),
            Value::String(s) => self.string.as_deref() == Some(&**s),
            Value::Date(d) => self.date_millis == Some(d.timestamp_millis()),
            Value::Boolean(b) => self.boolean == Some(*b),
            _ => false,
        }
    }
}

/// Decoder behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeserializationConfig {
    /// Record body decode failures instead of failing the whole message.
    pub fault_tolerant: bool,
    /// Maximum nesting of arrays and objects.
    pub max_depth: usize,
}

impl Default for DeserializationConfig {
    fn default() -> Self {
        Self {
            fault_tolerant: true,
            max_depth: 512,
        }
    }
}

impl DeserializationConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(enabled) = env_flag("AMFWIRE_FAULT_TOLERANT") {
            self.fault_tolerant = enabled;
        }

        if let Ok(depth) = std::env::var("AMFWIRE_MAX_DEPTH") {
            if let Ok(n) = depth.parse() {
                self.max_depth = n;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ValidationError(
                "deserialization.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Encoder behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationConfig {
    /// Replace a body that fails to encode with an error body.
    pub isolate_body_faults: bool,
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            isolate_body_faults: true,
        }
    }
}

impl SerializationConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(enabled) = env_flag("AMFWIRE_ISOLATE_BODY_FAULTS") {
            self.isolate_body_faults = enabled;
        }
    }
}

/// Error body contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultsConfig {
    /// Include the error's debug rendering as `details`.
    pub include_details: bool,
}

impl FaultsConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(enabled) = env_flag("AMFWIRE_FAULT_DETAILS") {
            self.include_details = enabled;
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use amfwire_core::Date;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CodecConfig::default();
        assert_eq!(config.dates.timezone_compensation, TimezoneCompensation::None);
        assert!(config.deserialization.fault_tolerant);
        assert_eq!(config.deserialization.max_depth, 512);
        assert!(config.serialization.isolate_body_faults);
        assert!(!config.faults.include_details);
        assert!(!config.nullable.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = CodecConfig::default();
        config.dates.timezone_compensation = TimezoneCompensation::IgnoreUtcKind;
        config.nullable.integer = Some(i32::MIN);
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("ignore_utc_kind"));
        let parsed: CodecConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let parsed: CodecConfig =
            serde_yaml::from_str("dates:\n  timezone_compensation: auto\n").unwrap();
        assert_eq!(parsed.dates.timezone_compensation, TimezoneCompensation::Auto);
        assert!(parsed.deserialization.fault_tolerant);
    }

    #[test]
    fn test_from_file_and_save() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "faults:\n  include_details: true").unwrap();
        let config = CodecConfig::from_file(file.path()).unwrap();
        assert!(config.faults.include_details);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codec.yaml");
        config.save(&path).unwrap();
        assert_eq!(CodecConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_from_file_errors() {
        let err = CodecConfig::from_file("/nonexistent/amfwire.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_, _)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dates: [unclosed").unwrap();
        let err = CodecConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse config file"));
    }

    #[test]
    fn test_validation_rejects_zero_depth() {
        let mut config = CodecConfig::default();
        config.deserialization.max_depth = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_timezone_parse() {
        assert_eq!(TimezoneCompensation::parse("AUTO"), Some(TimezoneCompensation::Auto));
        assert_eq!(
            TimezoneCompensation::parse("IgnoreUTCKind"),
            Some(TimezoneCompensation::IgnoreUtcKind)
        );
        assert_eq!(TimezoneCompensation::parse("utc"), None);
    }

    #[test]
    fn test_nullable_sentinels() {
        let mut nullable = NullableConfig {
            integer: Some(-1),
            string: Some(String::new()),
            date_millis: Some(0),
            ..NullableConfig::default()
        };
        assert!(!nullable.matches(&Value::Integer(-1)));

        nullable.enabled = true;
        assert!(nullable.matches(&Value::Integer(-1)));
        assert!(!nullable.matches(&Value::Integer(0)));
        assert!(nullable.matches(&Value::string("")));
        assert!(nullable.matches(&Value::Date(Date::from_timestamp_millis(0).unwrap())));
        assert!(!nullable.matches(&Value::Number(-1.0)));
        assert!(!nullable.matches(&Value::array(Vec::new())));
    }
}
