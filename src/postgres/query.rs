use std::pin::pin;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures_util::TryStreamExt;
use serde_json::Value;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Row, Statement};

use crate::error::SqlDelegateError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Execute a prepared statement and collect its rows and affected-row count.
///
/// # Errors
/// Returns the driver's error, or `ExecutionError` when a column cannot be extracted.
pub(crate) async fn run_statement(
    client: &Client,
    statement: &Statement,
    params: &[RowValues],
) -> Result<ResultSet, SqlDelegateError> {
    if params.len() != statement.params().len() {
        return Err(SqlDelegateError::ParameterError(format!(
            "statement expects {} parameter(s), got {}",
            statement.params().len(),
            params.len()
        )));
    }

    let mut result_set = ResultSet::with_columns(
        statement
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect(),
    );
    let mut rows = pin!(client.query_raw(statement, params.iter()).await?);
    while let Some(row) = rows.try_next().await? {
        result_set.add_row_values(extract_row(&row)?);
    }
    if let Some(affected) = rows.rows_affected() {
        result_set.rows_affected = usize::try_from(affected).map_err(|e| {
            SqlDelegateError::ExecutionError(format!("affected rows out of range: {e}"))
        })?;
    }
    Ok(result_set)
}

fn extract_row(row: &Row) -> Result<Vec<RowValues>, SqlDelegateError> {
    (0..row.columns().len())
        .map(|idx| extract_value(row, idx))
        .collect()
}

/// Extracts a `RowValues` from a `tokio_postgres` row at the given index.
///
/// Types without a dedicated variant are read as text when the driver allows it.
///
/// # Errors
/// Returns `ExecutionError` if the column cannot be read.
pub(crate) fn extract_value(row: &Row, idx: usize) -> Result<RowValues, SqlDelegateError> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let read = |e: tokio_postgres::Error| {
        SqlDelegateError::ExecutionError(format!(
            "column `{}` ({ty}) could not be read: {e}",
            column.name()
        ))
    };

    let value = match *ty {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .map_err(read)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .map_err(read)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)
            .map_err(read)?
            .map(RowValues::Int),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .map_err(read)?
            .map(|v| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)
            .map_err(read)?
            .map(RowValues::Float),
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)
            .map_err(read)?
            .map(RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(read)?
            .map(RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(read)?
            .map(|v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)
            .map_err(read)?
            .and_then(|v| v.and_hms_opt(0, 0, 0))
            .map(RowValues::Timestamp),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<Value>>(idx)
            .map_err(read)?
            .map(RowValues::JSON),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .map_err(read)?
            .map(RowValues::Blob),
        _ => row
            .try_get::<_, Option<String>>(idx)
            .map_err(read)?
            .map(RowValues::Text),
    };
    Ok(value.unwrap_or(RowValues::Null))
}
