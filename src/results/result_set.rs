use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlMiddlewareDbError;
use crate::types::RowValues;

/// Execution statistics the remote service reports for one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryMeta {
    pub changed_db: bool,
    pub changes: i64,
    /// Server-side duration in milliseconds
    pub duration: f64,
    pub last_row_id: i64,
    pub rows_read: u64,
    pub rows_written: u64,
    pub size_after: u64,
}

/// The rectangular result of one statement: column names, rows, and metadata.
///
/// Every row holds exactly one value per column; the constructors enforce it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Arc<Vec<String>>,
    rows: Vec<Vec<RowValues>>,
    meta: QueryMeta,
}

impl ResultSet {
    /// Build a result set from already-decoded rows.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::TransportError` when a row's width differs from the
    /// number of columns.
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Vec<RowValues>>,
        meta: QueryMeta,
    ) -> Result<Self, SqlMiddlewareDbError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(SqlMiddlewareDbError::TransportError(format!(
                "row {idx} has {} values for {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            columns: Arc::new(columns),
            rows,
            meta,
        })
    }

    /// Build a result set from wire JSON rows in the column-list/row-list shape.
    ///
    /// # Errors
    ///
    /// Same as [`ResultSet::new`].
    pub fn from_json_rows(
        columns: Vec<String>,
        rows: Vec<Vec<JsonValue>>,
        meta: QueryMeta,
    ) -> Result<Self, SqlMiddlewareDbError> {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(RowValues::from).collect())
            .collect();
        Self::new(columns, rows, meta)
    }

    pub(crate) fn from_parts(
        columns: Arc<Vec<String>>,
        rows: Vec<Vec<RowValues>>,
        meta: QueryMeta,
    ) -> Self {
        Self {
            columns,
            rows,
            meta,
        }
    }

    /// Result set with columns and no rows.
    #[must_use]
    pub fn empty(columns: Vec<String>, meta: QueryMeta) -> Self {
        Self {
            columns: Arc::new(columns),
            rows: Vec::new(),
            meta,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Shared handle to the column names, for building name-keyed rows without copying.
    #[must_use]
    pub fn column_names(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.columns)
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<RowValues>] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[RowValues]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn meta(&self) -> &QueryMeta {
        &self.meta
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<RowValues>> {
        self.rows
    }
}
