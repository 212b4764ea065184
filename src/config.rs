//! Translator configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! identity_field = "_id"
//! text_type = "VARCHAR(255)"
//! float_type = "FLOAT"
//! boolean_type = "BOOLEAN"
//! # integer_type = "BIGINT"
//! error_policy = "skip_entry"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{TranslateError, TranslateResult};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "OPLOG2SQL_CONFIG";

/// What the translator does when a single entry cannot be translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the run on the first failing entry.
    #[default]
    FailFast,
    /// Drop the failing entry, record the error and keep going.
    SkipEntry,
}

/// Main translator configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslatorConfig {
    /// Field treated as the document's primary key
    pub identity_field: String,

    /// Column type for string fields
    pub text_type: String,

    /// Column type for numeric fields
    pub float_type: String,

    /// Column type for boolean fields
    pub boolean_type: String,

    /// Column type for numeric fields whose first value is integral.
    /// Unset means every number widens to `float_type`.
    pub integer_type: Option<String>,

    pub error_policy: ErrorPolicy,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            identity_field: "_id".to_string(),
            text_type: "VARCHAR(255)".to_string(),
            float_type: "FLOAT".to_string(),
            boolean_type: "BOOLEAN".to_string(),
            integer_type: None,
            error_policy: ErrorPolicy::FailFast,
        }
    }
}

impl TranslatorConfig {
    /// Create a new configuration builder
    pub fn builder() -> TranslatorConfigBuilder {
        TranslatorConfigBuilder::default()
    }

    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> TranslateResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| TranslateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> TranslateResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TranslateError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Resolve the config: explicit path, then `$OPLOG2SQL_CONFIG`, then the
    /// user config dir, then defaults.
    pub fn discover(explicit: Option<&Path>) -> TranslateResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(PathBuf::from(path));
        }
        match default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> TranslateResult<()> {
        let required = [
            ("identity_field", &self.identity_field),
            ("text_type", &self.text_type),
            ("float_type", &self.float_type),
            ("boolean_type", &self.boolean_type),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(TranslateError::Config(format!("{} must not be empty", key)));
            }
        }
        if matches!(&self.integer_type, Some(t) if t.trim().is_empty()) {
            return Err(TranslateError::Config("integer_type must not be empty".to_string()));
        }
        Ok(())
    }
}

/// `<config dir>/oplog2sql/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("oplog2sql").join("config.toml"))
}

/// Builder for TranslatorConfig
#[derive(Debug, Default)]
pub struct TranslatorConfigBuilder {
    config: TranslatorConfig,
}

impl TranslatorConfigBuilder {
    pub fn identity_field(mut self, field: impl Into<String>) -> Self {
        self.config.identity_field = field.into();
        self
    }

    pub fn text_type(mut self, ty: impl Into<String>) -> Self {
        self.config.text_type = ty.into();
        self
    }

    pub fn float_type(mut self, ty: impl Into<String>) -> Self {
        self.config.float_type = ty.into();
        self
    }

    pub fn boolean_type(mut self, ty: impl Into<String>) -> Self {
        self.config.boolean_type = ty.into();
        self
    }

    /// Type integral numbers with `ty` instead of widening to float.
    pub fn integer_type(mut self, ty: impl Into<String>) -> Self {
        self.config.integer_type = Some(ty.into());
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.error_policy = policy;
        self
    }

    /// Build the configuration
    pub fn build(self) -> TranslatorConfig {
        self.config
    }
}
