use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as JsonValue};

use super::result_set::{QueryMeta, ResultSet};
use crate::coerce::{Coerce, from_value};
use crate::error::SqlMiddlewareDbError;
use crate::types::RowValues;

/// A row from a query result, addressable by column name.
///
/// Rows of one result share their column names and lookup index.
#[derive(Debug, Clone)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub rows: Vec<RowValues>,
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl CustomDbRow {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `rows` - The values for this row
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        let cache = Arc::new(column_index(&column_names));
        Self {
            column_names,
            rows,
            column_index_cache: cache,
        }
    }

    fn with_index(
        column_names: Arc<Vec<String>>,
        column_index_cache: Arc<HashMap<String, usize>>,
        rows: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            rows,
            column_index_cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        // Fall back to a case-insensitive search
        self.column_names
            .iter()
            .position(|col| col.eq_ignore_ascii_case(column_name))
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.rows.get(index)
    }

    /// Get a column converted to `T` through the coercion rules.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::NotFound` for an unknown column, or a conversion
    /// error annotated with the column name.
    pub fn get_as<T: Coerce>(&self, column_name: &str) -> Result<T, SqlMiddlewareDbError> {
        let value = self
            .get(column_name)
            .ok_or_else(|| SqlMiddlewareDbError::NotFound(format!("column {column_name}")))?;
        from_value(value).map_err(|err| SqlMiddlewareDbError::in_column(column_name, err.into()))
    }

    /// Column names in result order; the key set of this row.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.column_names
    }
}

fn column_index(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

/// The name-keyed result of one statement.
///
/// The column list travels with the rows, so a zero-row result still reports its
/// columns.
#[derive(Debug, Clone, Default)]
pub struct NamedResult {
    /// The rows returned by the statement
    pub results: Vec<CustomDbRow>,
    pub meta: QueryMeta,
    column_names: Arc<Vec<String>>,
}

impl NamedResult {
    /// Build from name-keyed wire objects.
    ///
    /// Column names come from the key set of the first object, in the order the service
    /// sent them. When there are no rows, `columns` supplies them instead. Keys missing
    /// from later objects read as NULL.
    #[must_use]
    pub fn from_json_objects(
        objects: Vec<JsonMap<String, JsonValue>>,
        columns: Vec<String>,
        meta: QueryMeta,
    ) -> Self {
        let column_names = Arc::new(
            objects
                .first()
                .map_or(columns, |first| first.keys().cloned().collect()),
        );
        let index = Arc::new(column_index(&column_names));
        let results = objects
            .into_iter()
            .map(|mut object| {
                let values = column_names
                    .iter()
                    .map(|col| object.remove(col).map_or(RowValues::Null, RowValues::from))
                    .collect();
                CustomDbRow::with_index(Arc::clone(&column_names), Arc::clone(&index), values)
            })
            .collect();
        Self {
            results,
            meta,
            column_names,
        }
    }

    /// Column names for this result.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Convert back to the rectangular shape.
    #[must_use]
    pub fn into_result_set(self) -> ResultSet {
        let rows = self.results.into_iter().map(|row| row.rows).collect();
        // every row was built against column_names, so widths match
        ResultSet::from_parts(self.column_names, rows, self.meta)
    }
}

impl From<ResultSet> for NamedResult {
    fn from(result: ResultSet) -> Self {
        let column_names = result.column_names();
        let index = Arc::new(column_index(&column_names));
        let meta = result.meta().clone();
        let results = result
            .into_rows()
            .into_iter()
            .map(|values| {
                CustomDbRow::with_index(Arc::clone(&column_names), Arc::clone(&index), values)
            })
            .collect();
        Self {
            results,
            meta,
            column_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: JsonValue) -> JsonMap<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn columns_follow_first_object_key_order() {
        let named = NamedResult::from_json_objects(
            vec![
                object(json!({"name": "Alice", "id": 1})),
                object(json!({"id": 2})),
            ],
            Vec::new(),
            QueryMeta::default(),
        );
        assert_eq!(named.columns(), ["name".to_string(), "id".to_string()]);
        assert_eq!(named.results[0].get("name").unwrap().as_text(), Some("Alice"));
        assert_eq!(named.results[1].get("name"), Some(&RowValues::Null));
        assert_eq!(named.results[1].get_as::<i64>("ID").unwrap(), 2);
    }

    #[test]
    fn zero_rows_keep_carried_columns() {
        let named = NamedResult::from_json_objects(
            Vec::new(),
            vec!["id".into(), "name".into()],
            QueryMeta::default(),
        );
        assert!(named.is_empty());
        assert_eq!(named.columns().len(), 2);
    }

    #[test]
    fn typed_getter_reports_missing_and_bad_columns() {
        let rs = ResultSet::new(
            vec!["id".into()],
            vec![vec![RowValues::Text("x".into())]],
            QueryMeta::default(),
        )
        .unwrap();
        let named = NamedResult::from(rs);
        let row = &named.results[0];
        assert!(matches!(
            row.get_as::<i64>("missing"),
            Err(SqlMiddlewareDbError::NotFound(_))
        ));
        assert!(matches!(
            row.get_as::<i64>("id"),
            Err(SqlMiddlewareDbError::Column { .. })
        ));
        assert_eq!(row.get_as::<String>("id").unwrap(), "x");
    }

    #[test]
    fn round_trips_to_rectangular_shape() {
        let rs = ResultSet::new(
            vec!["id".into()],
            vec![vec![RowValues::Int(1)], vec![RowValues::Int(2)]],
            QueryMeta::default(),
        )
        .unwrap();
        let back = NamedResult::from(rs.clone()).into_result_set();
        assert_eq!(back, rs);
    }
}
