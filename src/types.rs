use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlDelegateError;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Values that can be bound as query parameters or read back from a row.
///
/// ```rust
/// use sql_delegate::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::from(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            RowValues::Timestamp(value) => Some(*value),
            RowValues::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Int(v) => write!(f, "{v}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Text(v) => write!(f, "{v:?}"),
            RowValues::Bool(v) => write!(f, "{v}"),
            RowValues::Timestamp(v) => write!(f, "{v}"),
            RowValues::Null => f.write_str("NULL"),
            RowValues::JSON(v) => write!(f, "{v}"),
            RowValues::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

macro_rules! row_values_from {
    ($($source:ty => $variant:ident $(as $cast:ty)?),+ $(,)?) => {
        $(
            impl From<$source> for RowValues {
                fn from(value: $source) -> Self {
                    RowValues::$variant(value $(as $cast)?)
                }
            }
        )+
    };
}

row_values_from!(
    i64 => Int,
    i32 => Int as i64,
    i16 => Int as i64,
    f64 => Float,
    f32 => Float as f64,
    bool => Bool,
    String => Text,
    NaiveDateTime => Timestamp,
    JsonValue => JSON,
    Vec<u8> => Blob,
);

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Coercion tag carried by a delegate.
///
/// The tag is rendered as a cast on the placeholder marker (`$1::int8`) and the value bound to
/// the placeholder is converted to the matching `RowValues` variant before it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeHint {
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Text,
    Bool,
    Bytea,
    Timestamp,
    Json,
    Jsonb,
}

impl TypeHint {
    /// Postgres type name used in the cast suffix.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            TypeHint::Int2 => "int2",
            TypeHint::Int4 => "int4",
            TypeHint::Int8 => "int8",
            TypeHint::Float4 => "float4",
            TypeHint::Float8 => "float8",
            TypeHint::Text => "text",
            TypeHint::Bool => "bool",
            TypeHint::Bytea => "bytea",
            TypeHint::Timestamp => "timestamp",
            TypeHint::Json => "json",
            TypeHint::Jsonb => "jsonb",
        }
    }

    /// Convert `value` into the representation this tag expects.
    ///
    /// `Null` passes through every tag.
    ///
    /// # Errors
    /// Returns `SqlDelegateError::ParameterError` when the value cannot be represented.
    pub fn coerce(self, value: RowValues) -> Result<RowValues, SqlDelegateError> {
        if value.is_null() {
            return Ok(value);
        }
        let coerced = match (self, value) {
            (TypeHint::Int2 | TypeHint::Int4 | TypeHint::Int8, value) => {
                let int = match &value {
                    RowValues::Int(i) => Some(*i),
                    #[allow(clippy::cast_possible_truncation)]
                    RowValues::Float(f) if f.fract() == 0.0 => Some(*f as i64),
                    RowValues::Bool(b) => Some(i64::from(*b)),
                    RowValues::Text(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                let in_range = |i: i64| match self {
                    TypeHint::Int2 => i16::try_from(i).is_ok(),
                    TypeHint::Int4 => i32::try_from(i).is_ok(),
                    _ => true,
                };
                match int {
                    Some(i) if in_range(i) => RowValues::Int(i),
                    _ => return Err(self.mismatch(&value)),
                }
            }
            (TypeHint::Float4 | TypeHint::Float8, value) => match value {
                RowValues::Float(f) => RowValues::Float(f),
                #[allow(clippy::cast_precision_loss)]
                RowValues::Int(i) => RowValues::Float(i as f64),
                RowValues::Text(ref s) => match s.trim().parse::<f64>() {
                    Ok(f) => RowValues::Float(f),
                    Err(_) => return Err(self.mismatch(&value)),
                },
                other => return Err(self.mismatch(&other)),
            },
            (TypeHint::Text, value) => match value {
                RowValues::Text(s) => RowValues::Text(s),
                RowValues::Int(i) => RowValues::Text(i.to_string()),
                RowValues::Float(f) => RowValues::Text(f.to_string()),
                RowValues::Bool(b) => RowValues::Text(b.to_string()),
                RowValues::Timestamp(ts) => RowValues::Text(ts.to_string()),
                RowValues::JSON(json) => RowValues::Text(json.to_string()),
                other => return Err(self.mismatch(&other)),
            },
            (TypeHint::Bool, value) => match value {
                RowValues::Bool(b) => RowValues::Bool(b),
                RowValues::Int(0) => RowValues::Bool(false),
                RowValues::Int(1) => RowValues::Bool(true),
                RowValues::Text(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                    "t" | "true" | "1" | "yes" | "on" => RowValues::Bool(true),
                    "f" | "false" | "0" | "no" | "off" => RowValues::Bool(false),
                    _ => return Err(self.mismatch(&value)),
                },
                other => return Err(self.mismatch(&other)),
            },
            (TypeHint::Bytea, value) => match value {
                RowValues::Blob(bytes) => RowValues::Blob(bytes),
                RowValues::Text(s) => RowValues::Blob(s.into_bytes()),
                other => return Err(self.mismatch(&other)),
            },
            (TypeHint::Timestamp, value) => match value.as_timestamp() {
                Some(ts) => RowValues::Timestamp(ts),
                None => return Err(self.mismatch(&value)),
            },
            (TypeHint::Json | TypeHint::Jsonb, value) => match value {
                RowValues::JSON(json) => RowValues::JSON(json),
                RowValues::Text(ref s) => match serde_json::from_str(s) {
                    Ok(json) => RowValues::JSON(json),
                    Err(_) => return Err(self.mismatch(&value)),
                },
                RowValues::Int(i) => RowValues::JSON(i.into()),
                RowValues::Float(f) => RowValues::JSON(f.into()),
                RowValues::Bool(b) => RowValues::JSON(b.into()),
                other => return Err(self.mismatch(&other)),
            },
        };
        Ok(coerced)
    }

    fn mismatch(self, value: &RowValues) -> SqlDelegateError {
        SqlDelegateError::ParameterError(format!("cannot coerce {value} to {}", self.as_sql()))
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for TypeHint {
    type Err = SqlDelegateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hint = match s.trim().to_ascii_lowercase().as_str() {
            "int2" | "smallint" => TypeHint::Int2,
            "int4" | "int" | "integer" => TypeHint::Int4,
            "int8" | "bigint" => TypeHint::Int8,
            "float4" | "real" => TypeHint::Float4,
            "float8" | "float" | "double precision" => TypeHint::Float8,
            "text" | "varchar" => TypeHint::Text,
            "bool" | "boolean" => TypeHint::Bool,
            "bytea" => TypeHint::Bytea,
            "timestamp" | "timestamp without time zone" => TypeHint::Timestamp,
            "json" => TypeHint::Json,
            "jsonb" => TypeHint::Jsonb,
            other => {
                return Err(SqlDelegateError::ConfigError(format!(
                    "unknown type tag `{other}`"
                )));
            }
        };
        Ok(hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_and_aliases() {
        assert_eq!("bigint".parse::<TypeHint>().unwrap(), TypeHint::Int8);
        assert_eq!(" Boolean ".parse::<TypeHint>().unwrap(), TypeHint::Bool);
        assert!(matches!(
            "money".parse::<TypeHint>(),
            Err(SqlDelegateError::ConfigError(_))
        ));
    }

    #[test]
    fn coerces_text_into_numbers() {
        assert_eq!(
            TypeHint::Int8.coerce(RowValues::from("42")).unwrap(),
            RowValues::Int(42)
        );
        assert_eq!(
            TypeHint::Float8.coerce(RowValues::Int(2)).unwrap(),
            RowValues::Float(2.0)
        );
        assert!(TypeHint::Int2.coerce(RowValues::Int(70_000)).is_err());
    }

    #[test]
    fn null_passes_every_tag() {
        for hint in [TypeHint::Int4, TypeHint::Text, TypeHint::Jsonb] {
            assert_eq!(hint.coerce(RowValues::Null).unwrap(), RowValues::Null);
        }
    }

    #[test]
    fn coerces_booleans_and_timestamps() {
        assert_eq!(
            TypeHint::Bool.coerce(RowValues::from("off")).unwrap(),
            RowValues::Bool(false)
        );
        let ts = TypeHint::Timestamp
            .coerce(RowValues::from("2024-03-01 10:20:30"))
            .unwrap();
        assert!(matches!(ts, RowValues::Timestamp(_)));
        assert!(matches!(
            TypeHint::Bool.coerce(RowValues::Float(0.5)),
            Err(SqlDelegateError::ParameterError(_))
        ));
    }
}
