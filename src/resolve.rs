use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::SqlDelegateError;
use crate::query::{Arg, Query};
use crate::types::RowValues;

/// Values supplied for the delegates of a query at execution time.
///
/// Named values bind named delegates; positional values bind positional delegates in slot order.
/// ```rust
/// use sql_delegate::prelude::*;
///
/// let replacements = Replacements::new().bind("id", 5).bind("name", "alice");
/// let positional = Replacements::from_positional(vec![RowValues::Int(1)]);
/// # let _ = (replacements, positional);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replacements {
    named: HashMap<String, RowValues>,
    positional: Vec<RowValues>,
}

impl Replacements {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_positional(values: Vec<RowValues>) -> Self {
        Self {
            named: HashMap::new(),
            positional: values,
        }
    }

    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn push(mut self, value: impl Into<RowValues>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RowValues>) {
        self.named.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RowValues> {
        self.named.get(name)
    }

    #[must_use]
    pub fn positional(&self) -> &[RowValues] {
        &self.positional
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}

impl<K: Into<String>, V: Into<RowValues>> FromIterator<(K, V)> for Replacements {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut replacements = Replacements::new();
        for (name, value) in iter {
            replacements.insert(name, value);
        }
        replacements
    }
}

impl From<HashMap<String, RowValues>> for Replacements {
    fn from(named: HashMap<String, RowValues>) -> Self {
        Self {
            named,
            positional: Vec::new(),
        }
    }
}

/// Turn the slots of `query` into the concrete parameter list, in slot order.
///
/// A delegate takes its value from `replacements`, else its default; the value is then coerced
/// by the delegate's type tag. Positional delegates are reported as `#k`, their 1-based rank
/// among the positional values.
///
/// # Errors
/// - `UnresolvedPlaceholder` for a delegate with neither a replacement nor a default.
/// - `UnknownPlaceholder` for a replacement that no delegate consumed, checked after every slot
///   resolved; extra named keys are reported in lexical order before extra positional values.
/// - `ParameterError` when a value cannot be coerced to the delegate's tag.
pub fn resolve(
    query: &Query,
    replacements: &Replacements,
) -> Result<Vec<RowValues>, SqlDelegateError> {
    let mut params = Vec::with_capacity(query.args().len());
    let mut consumed: HashSet<&str> = HashSet::new();
    let mut next_positional = 0;

    for arg in query.args() {
        let delegate = match arg {
            Arg::Value(value) => {
                params.push(value.clone());
                continue;
            }
            Arg::Delegate(delegate) => delegate,
        };

        let supplied = if delegate.is_positional() {
            let supplied = replacements.positional.get(next_positional);
            next_positional += 1;
            supplied
        } else {
            let supplied = replacements.named.get(delegate.name());
            if supplied.is_some() {
                consumed.insert(delegate.name());
            }
            supplied
        };

        let value = match supplied.or(delegate.default_value()) {
            Some(value) => value.clone(),
            None if delegate.is_positional() => {
                return Err(SqlDelegateError::UnresolvedPlaceholder(format!(
                    "#{next_positional}"
                )));
            }
            None => {
                return Err(SqlDelegateError::UnresolvedPlaceholder(
                    delegate.name().to_owned(),
                ));
            }
        };

        params.push(match delegate.type_hint() {
            Some(hint) => hint.coerce(value)?,
            None => value,
        });
    }

    let unknown: BTreeSet<&str> = replacements
        .named
        .keys()
        .map(String::as_str)
        .filter(|name| !consumed.contains(name))
        .collect();
    if let Some(name) = unknown.first() {
        return Err(SqlDelegateError::UnknownPlaceholder((*name).to_owned()));
    }
    if replacements.positional.len() > next_positional {
        return Err(SqlDelegateError::UnknownPlaceholder(format!(
            "#{}",
            next_positional + 1
        )));
    }

    Ok(params)
}
