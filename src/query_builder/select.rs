use serde::{Deserialize, Serialize};

use crate::delegate::Operand;
use crate::error::SqlDelegateError;

use super::SqlWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Join {
    table: String,
    left: String,
    right: String,
}

/// `SELECT` description: projection, inner joins, equality filters, ordering and paging.
///
/// ```rust
/// use sql_delegate::prelude::*;
///
/// let select = Select::from("users")
///     .columns(["id", "name"])
///     .filter("active", true)
///     .filter("team", delegate("team"))
///     .order_by("name", Order::Asc)
///     .limit(delegate("limit").with_default(50));
/// let query = PostgresCompiler.compile(&select.into())?;
/// assert_eq!(
///     query.sql(),
///     "SELECT id, name FROM users WHERE active = $1 AND team = $2 ORDER BY name ASC LIMIT $3"
/// );
/// # Ok::<(), SqlDelegateError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    table: String,
    columns: Vec<String>,
    joins: Vec<Join>,
    conditions: Vec<(String, Operand)>,
    order: Vec<(String, Order)>,
    limit: Option<Operand>,
    offset: Option<Operand>,
}

impl Select {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Projected columns; `*` when never called.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// `JOIN table ON left = right`.
    #[must_use]
    pub fn join(
        mut self,
        table: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.joins.push(Join {
            table: table.into(),
            left: left.into(),
            right: right.into(),
        });
        self
    }

    #[must_use]
    pub fn filter(mut self, column: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.conditions.push((column.into(), operand.into()));
        self
    }

    /// Add every `(column, operand)` pair, e.g. from [`delegate_pairs`](crate::delegate::delegate_pairs).
    #[must_use]
    pub fn filters<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (String, Operand)>,
    {
        self.conditions.extend(conditions);
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: impl Into<Operand>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: impl Into<Operand>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    pub(super) fn write(&self, w: &mut SqlWriter) -> Result<(), SqlDelegateError> {
        w.push("SELECT ");
        if self.columns.is_empty() {
            w.push("*");
        } else {
            w.push_identifiers(&self.columns)?;
        }
        w.push(" FROM ");
        w.push_identifier(&self.table)?;
        for join in &self.joins {
            w.push(" JOIN ");
            w.push_identifier(&join.table)?;
            w.push(" ON ");
            w.push_identifier(&join.left)?;
            w.push(" = ");
            w.push_identifier(&join.right)?;
        }
        w.push_conditions(&self.conditions)?;
        for (i, (column, order)) in self.order.iter().enumerate() {
            w.push(if i == 0 { " ORDER BY " } else { ", " });
            w.push_identifier(column)?;
            w.push(" ");
            w.push(order.as_sql());
        }
        if let Some(limit) = &self.limit {
            w.push(" LIMIT ");
            w.push_operand(limit);
        }
        if let Some(offset) = &self.offset {
            w.push(" OFFSET ");
            w.push_operand(offset);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::{delegate, delegate_pairs};
    use crate::query::Arg;
    use crate::query_builder::{Compile, PostgresCompiler};
    use crate::types::RowValues;

    #[test]
    fn condition_map_with_delegate() {
        let query = PostgresCompiler
            .compile(&Select::from("t").filter("id", delegate("id")).into())
            .unwrap();
        assert_eq!(query.sql(), "SELECT * FROM t WHERE id = $1");
        assert_eq!(query.args(), &[Arg::Delegate(delegate("id"))]);
    }

    #[test]
    fn joins_nulls_and_paging() {
        let select = Select::from("users")
            .columns(["users.id", "orders.total"])
            .join("orders", "orders.user_id", "users.id")
            .filter("deleted_at", RowValues::Null)
            .filters(delegate_pairs(["region"]))
            .order_by("orders.total", Order::Desc)
            .limit(10)
            .offset(delegate("offset"));
        let query = PostgresCompiler.compile(&select.into()).unwrap();
        assert_eq!(
            query.sql(),
            "SELECT users.id, orders.total FROM users JOIN orders ON orders.user_id = users.id \
             WHERE deleted_at IS NULL AND region = $1 ORDER BY orders.total DESC LIMIT $2 OFFSET $3"
        );
        assert_eq!(query.args()[1], Arg::Value(RowValues::Int(10)));
        assert!(query.validate().is_ok());
    }
}
