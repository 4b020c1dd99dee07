//! Typed order metadata values.
//!
//! Clients attach arbitrary key/value annotations to an order. Only scalar
//! JSON values are accepted; each one is stored in the column matching its
//! [`DataType`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors raised when converting a JSON value into a [`DataValue`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataValueError {
    /// The value is an array, object or null.
    #[error("unsupported value type '{found}' for key '{key}': only strings, numbers and booleans are allowed")]
    Unsupported {
        /// Metadata key the value was submitted under.
        key: String,
        /// JSON type that was found.
        found: &'static str,
    },
    /// A number that cannot be represented as `f64`.
    #[error("number for key '{key}' is out of range")]
    OutOfRange {
        /// Metadata key the value was submitted under.
        key: String,
    },
    /// Stored type tag is not recognized.
    #[error("unknown data type: {0}")]
    UnknownType(String),
}

/// Storage type tag of a metadata row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Bool,
}

impl DataType {
    /// Lowercase tag as stored in the `type` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = DataValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "bool" => Ok(Self::Bool),
            other => Err(DataValueError::UnknownType(other.to_owned())),
        }
    }
}

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl DataValue {
    /// Convert a submitted JSON value, rejecting non-scalar shapes.
    ///
    /// # Errors
    ///
    /// Returns [`DataValueError::Unsupported`] for arrays, objects and null.
    pub fn from_json(key: &str, value: &Value) -> Result<Self, DataValueError> {
        match value {
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => n
                .as_f64()
                .map(Self::Number)
                .ok_or_else(|| DataValueError::OutOfRange {
                    key: key.to_owned(),
                }),
            Value::Array(_) => Err(unsupported(key, "array")),
            Value::Object(_) => Err(unsupported(key, "object")),
            Value::Null => Err(unsupported(key, "null")),
        }
    }

    /// The storage type of this value.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Number(_) => DataType::Number,
            Self::Bool(_) => DataType::Bool,
        }
    }

    /// Rebuild a value from its stored columns.
    ///
    /// # Errors
    ///
    /// Returns [`DataValueError::UnknownType`] if the tag is not recognized.
    pub fn from_columns(
        data_type: &str,
        string_value: Option<String>,
        numeric_value: Option<f64>,
        bool_value: Option<bool>,
    ) -> Result<Self, DataValueError> {
        Ok(match data_type.parse::<DataType>()? {
            DataType::String => Self::String(string_value.unwrap_or_default()),
            DataType::Number => Self::Number(numeric_value.unwrap_or_default()),
            DataType::Bool => Self::Bool(bool_value.unwrap_or_default()),
        })
    }
}

fn unsupported(key: &str, found: &'static str) -> DataValueError {
    DataValueError::Unsupported {
        key: key.to_owned(),
        found,
    }
}
