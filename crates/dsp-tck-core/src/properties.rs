// crates/dsp-tck-core/src/properties.rs
// ============================================================================
// Module: TCK Properties
// Description: Flat dotted-key configuration for a TCK run.
// Purpose: Load, override, and read typed configuration values.
// Dependencies: thiserror, toml
// ============================================================================

//! ## Overview
//! [`TckProperties`] is the single configuration surface of the TCK. Values are
//! strings keyed by dotted names (`dataspacetck.dsp.local.connector`) so that
//! TOML files, command-line overrides, and per-scenario parameters
//! (`CN_01_01_DATASETID`) share one namespace.
//! Invariants:
//! - Nested TOML tables flatten to dotted keys.
//! - Scalar TOML values are stored in their display form; arrays and inline
//!   arrays of tables are rejected.
//! - Typed getters never panic; malformed values surface as [`PropertyError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix shared by every TCK property.
pub const TCK_PREFIX: &str = "dataspacetck";
/// Address the connector under test uses to reach the TCK.
pub const TCK_CALLBACK_ADDRESS: &str = "dataspacetck.callback.address";
/// Host the callback server binds.
pub const TCK_HOST: &str = "dataspacetck.host";
/// Port the callback server binds.
pub const TCK_PORT: &str = "dataspacetck.port";
/// Name of the system launcher to start.
pub const TCK_LAUNCHER: &str = "dataspacetck.launcher";
/// Enables debug output.
pub const TCK_DEBUG: &str = "dataspacetck.debug";
/// Default callback address.
pub const TCK_DEFAULT_CALLBACK_ADDRESS: &str = "http://localhost:8083";
/// Default bind host.
pub const TCK_DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port.
pub const TCK_DEFAULT_PORT: u16 = 8083;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Property loading and lookup errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// Properties file could not be read.
    #[error("failed to read properties file {path}: {message}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error text.
        message: String,
    },
    /// Properties document is not valid TOML.
    #[error("invalid properties document: {0}")]
    Parse(String),
    /// A TOML value cannot be represented as a property.
    #[error("unsupported value for property {key}: {kind}")]
    UnsupportedValue {
        /// Flattened key.
        key: String,
        /// TOML value kind.
        kind: String,
    },
    /// A property value could not be converted to the requested type.
    #[error("invalid value for property {key}: {value}")]
    InvalidValue {
        /// Property key.
        key: String,
        /// Raw value.
        value: String,
    },
    /// A required property is absent.
    #[error("Required configuration not set: {0}")]
    Missing(String),
    /// Override text is not a `key=value` pair.
    #[error("invalid property override (expected key=value): {0}")]
    InvalidOverride(String),
}

// ============================================================================
// SECTION: Properties
// ============================================================================

/// Flat property set keyed by dotted names.
///
/// # Invariants
/// - Keys are unique; later inserts replace earlier values.
/// - Iteration order is lexical by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TckProperties {
    /// Property values keyed by dotted name.
    values: BTreeMap<String, String>,
}

impl TckProperties {
    /// Creates an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document, flattening nested tables into dotted keys.
    ///
    /// # Errors
    /// Returns [`PropertyError::Parse`] for invalid TOML and
    /// [`PropertyError::UnsupportedValue`] for arrays.
    pub fn from_toml_str(text: &str) -> Result<Self, PropertyError> {
        let table = toml::from_str::<toml::Table>(text)
            .map_err(|err| PropertyError::Parse(err.to_string()))?;
        let mut properties = Self::new();
        flatten_table("", &table, &mut properties.values)?;
        Ok(properties)
    }

    /// Reads and parses a TOML properties file.
    ///
    /// # Errors
    /// Returns [`PropertyError::Io`] when the file cannot be read, plus any
    /// error from [`TckProperties::from_toml_str`].
    pub fn from_toml_file(path: &Path) -> Result<Self, PropertyError> {
        let text = fs::read_to_string(path).map_err(|err| PropertyError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Sets a property, replacing any existing value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Copies every entry of `other` into this set.
    pub fn extend(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Applies a `key=value` override.
    ///
    /// # Errors
    /// Returns [`PropertyError::InvalidOverride`] when no `=` is present or
    /// the key is empty.
    pub fn apply_override(&mut self, text: &str) -> Result<(), PropertyError> {
        let (key, value) =
            text.split_once('=').ok_or_else(|| PropertyError::InvalidOverride(text.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(PropertyError::InvalidOverride(text.to_string()));
        }
        self.insert(key, value.trim());
        Ok(())
    }

    /// Returns the raw value for a key.
    #[must_use]
    pub fn string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the value for a key or the provided default.
    #[must_use]
    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.string(key).unwrap_or(default).to_string()
    }

    /// Returns a required, non-blank value.
    ///
    /// # Errors
    /// Returns [`PropertyError::Missing`] when the key is absent or blank.
    pub fn require(&self, key: &str) -> Result<&str, PropertyError> {
        match self.string(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(PropertyError::Missing(key.to_string())),
        }
    }

    /// Returns a boolean value or the default when absent.
    ///
    /// # Errors
    /// Returns [`PropertyError::InvalidValue`] when the value is not a bool.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, PropertyError> {
        match self.string(key) {
            None => Ok(default),
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(PropertyError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            },
        }
    }

    /// Parses a value with [`FromStr`] or returns the default when absent.
    ///
    /// # Errors
    /// Returns [`PropertyError::InvalidValue`] when parsing fails.
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, PropertyError> {
        match self.string(key) {
            None => Ok(default),
            Some(value) => value.trim().parse::<T>().map_err(|_| PropertyError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Iterates entries whose key starts with `prefix`.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.values
            .range(prefix.to_string()..)
            .take_while(move |(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Iterates all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no entries are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TckProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (key, value) in iter {
            properties.insert(key, value);
        }
        properties
    }
}

// ============================================================================
// SECTION: Flattening
// ============================================================================

/// Flattens a TOML table into dotted keys.
fn flatten_table(
    prefix: &str,
    table: &toml::Table,
    out: &mut BTreeMap<String, String>,
) -> Result<(), PropertyError> {
    for (name, value) in table {
        let key = if prefix.is_empty() { name.clone() } else { format!("{prefix}.{name}") };
        match value {
            toml::Value::Table(nested) => flatten_table(&key, nested, out)?,
            toml::Value::String(text) => {
                out.insert(key, text.clone());
            }
            toml::Value::Integer(number) => {
                out.insert(key, number.to_string());
            }
            toml::Value::Float(number) => {
                out.insert(key, number.to_string());
            }
            toml::Value::Boolean(flag) => {
                out.insert(key, flag.to_string());
            }
            toml::Value::Datetime(datetime) => {
                out.insert(key, datetime.to_string());
            }
            toml::Value::Array(_) => {
                return Err(PropertyError::UnsupportedValue {
                    key,
                    kind: "array".to_string(),
                });
            }
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
