//! Deferred values for query templates.
//!
//! A [`Delegate`] stands in for a value that is only known when a query runs. Delegates are
//! embedded in structured query descriptions (or in a [`Query`](crate::query::Query) directly)
//! and later resolved against a [`Replacements`](crate::resolve::Replacements) mapping:
//!
//! ```rust
//! use sql_delegate::prelude::*;
//!
//! let select = Select::from("users").filter("id", delegate("id"));
//! let query = PostgresCompiler.compile(&select.into())?;
//! assert_eq!(query.sql(), "SELECT * FROM users WHERE id = $1");
//!
//! let params = resolve(&query, &Replacements::new().bind("id", 5))?;
//! assert_eq!(params, vec![RowValues::Int(5)]);
//! # Ok::<(), SqlDelegateError>(())
//! ```

use crate::error::SqlDelegateError;
use crate::types::{RowValues, TypeHint};

/// A named or positional placeholder with an optional default and coercion tag.
///
/// An empty name marks a positional placeholder, bound from the positional values of a
/// replacement mapping in slot order.
#[derive(Debug, Clone, PartialEq)]
pub struct Delegate {
    name: String,
    default: Option<RowValues>,
    type_hint: Option<TypeHint>,
}

impl Delegate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            type_hint: None,
        }
    }

    /// Anonymous placeholder bound by position.
    #[must_use]
    pub fn positional() -> Self {
        Self::new(String::new())
    }

    /// Value used when the replacement mapping does not mention this placeholder.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<RowValues>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, hint: TypeHint) -> Self {
        self.type_hint = Some(hint);
        self
    }

    /// Attach a coercion tag given by its SQL type name (`"int8"`, `"text"`, ...).
    ///
    /// # Errors
    /// Returns `SqlDelegateError::ConfigError` for an unknown tag.
    pub fn with_type_tag(self, tag: &str) -> Result<Self, SqlDelegateError> {
        Ok(self.with_type(tag.parse()?))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_positional(&self) -> bool {
        self.name.is_empty()
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&RowValues> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn type_hint(&self) -> Option<TypeHint> {
        self.type_hint
    }

    /// True when resolution must be given a value for this placeholder.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl From<&str> for Delegate {
    fn from(name: &str) -> Self {
        Delegate::new(name)
    }
}

impl From<String> for Delegate {
    fn from(name: String) -> Self {
        Delegate::new(name)
    }
}

/// Right-hand side of a column in a structured query description.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Bound as a parameter.
    Value(RowValues),
    /// Spliced into the generated SQL as written, never bound.
    Verbatim(String),
    /// Bound later, when the query is resolved.
    Delegate(Delegate),
}

impl From<Delegate> for Operand {
    fn from(delegate: Delegate) -> Self {
        Operand::Delegate(delegate)
    }
}

macro_rules! operand_from_value {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for Operand {
                fn from(value: $source) -> Self {
                    Operand::Value(value.into())
                }
            }
        )+
    };
}

operand_from_value!(RowValues, i64, i32, i16, f64, f32, bool, String, &str, Vec<u8>);

/// Named placeholder with no default and no coercion tag.
pub fn delegate(name: impl Into<String>) -> Delegate {
    Delegate::new(name)
}

/// `(column, placeholder)` entry for condition and assignment lists; the placeholder takes the
/// column's name.
///
/// ```rust
/// use sql_delegate::prelude::*;
///
/// let (column, operand) = delegate_pair(delegate("age").with_default(18));
/// assert_eq!(column, "age");
/// # let _ = operand;
/// ```
pub fn delegate_pair(delegate: impl Into<Delegate>) -> (String, Operand) {
    let delegate = delegate.into();
    (delegate.name().to_owned(), Operand::Delegate(delegate))
}

/// One `(column, placeholder)` entry per name, without defaults or tags.
pub fn delegate_pairs<I, S>(names: I) -> Vec<(String, Operand)>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .map(|name| delegate_pair(Delegate::new(name)))
        .collect()
}

/// Literal SQL such as `DEFAULT` or `now()`, written into the statement instead of bound.
pub fn value(raw: impl Into<String>) -> Operand {
    Operand::Verbatim(raw.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_use_names_as_columns() {
        let pairs = delegate_pairs(["a", "b"]);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].0, "b");
        assert_eq!(pairs[1].1, Operand::Delegate(delegate("b")));
    }

    #[test]
    fn builder_sets_default_and_tag() {
        let d = delegate("limit").with_default(10).with_type_tag("int8").unwrap();
        assert_eq!(d.default_value(), Some(&RowValues::Int(10)));
        assert_eq!(d.type_hint(), Some(TypeHint::Int8));
        assert!(!d.is_required());
        assert!(delegate("x").with_type_tag("nope").is_err());
    }

    #[test]
    fn verbatim_is_distinct_from_text() {
        assert_eq!(value("DEFAULT"), Operand::Verbatim("DEFAULT".into()));
        assert_eq!(
            Operand::from("DEFAULT"),
            Operand::Value(RowValues::Text("DEFAULT".into()))
        );
    }
}
