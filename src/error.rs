use thiserror::Error;

use crate::types::{RowValues, ValueKind};

/// Remote error code the service uses when the SQLite engine rejected a statement.
pub const ENGINE_ERROR_CODE: i64 = 7500;

/// Marker separating the human-readable message from the engine error token.
const ENGINE_TOKEN_MARKER: &str = ": SQLITE_";

/// Engine token used when the remote message carries none.
const DEFAULT_ENGINE_TOKEN: &str = "SQLITE_ERROR";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SqlMiddlewareDbError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("D1 API error {code}: {message}")]
    RemoteService { code: i64, message: String },

    #[error(transparent)]
    Statement(#[from] StatementError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("column {column}: {source}")]
    Column {
        column: String,
        #[source]
        source: Box<SqlMiddlewareDbError>,
    },

    #[error("row {index}: {source}")]
    Row {
        index: usize,
        #[source]
        source: Box<SqlMiddlewareDbError>,
    },

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("no rows in result set")]
    NoRows,

    #[error("driver declined the operation; fall back to caller-side handling")]
    Skip,

    #[error("driver connection is closed or was never resolved")]
    BadConn,

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl SqlMiddlewareDbError {
    /// True for the "no rows" sentinel, including when it is wrapped by column context.
    #[must_use]
    pub fn is_no_rows(&self) -> bool {
        match self {
            SqlMiddlewareDbError::NoRows => true,
            SqlMiddlewareDbError::Column { source, .. } | SqlMiddlewareDbError::Row { source, .. } => {
                source.is_no_rows()
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_statement_error(&self) -> bool {
        matches!(self, SqlMiddlewareDbError::Statement(_))
    }

    pub(crate) fn in_row(index: usize, source: SqlMiddlewareDbError) -> Self {
        SqlMiddlewareDbError::Row {
            index,
            source: Box::new(source),
        }
    }

    pub(crate) fn in_column(column: impl Into<String>, source: SqlMiddlewareDbError) -> Self {
        SqlMiddlewareDbError::Column {
            column: column.into(),
            source: Box::new(source),
        }
    }
}

/// A value could not be converted into the requested destination type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot convert value {value} (type {source_kind}) to destination type {destination}")]
pub struct ConversionError {
    /// Rendering of the offending source value
    pub value: String,
    pub source_kind: ValueKind,
    /// Rust type name of the destination
    pub destination: &'static str,
}

impl ConversionError {
    #[must_use]
    pub fn new<T: ?Sized>(value: &RowValues) -> Self {
        Self {
            value: value.to_string(),
            source_kind: value.kind(),
            destination: std::any::type_name::<T>(),
        }
    }
}

/// The SQLite engine rejected a statement.
///
/// Carries the statement text and the bound parameters so the failure can be
/// reported with full context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}: {engine_code}")]
pub struct StatementError {
    pub message: String,
    pub query: String,
    pub bindings: Vec<RowValues>,
    /// Engine error token such as `SQLITE_CONSTRAINT` or `SQLITE_AUTH`
    pub engine_code: String,
}

/// Re-classify an engine-coded remote error as a [`StatementError`].
///
/// Errors with any other code, and errors of any other kind, are returned unchanged.
#[must_use]
pub fn classify_remote_error(
    err: SqlMiddlewareDbError,
    query: &str,
    bindings: &[RowValues],
) -> SqlMiddlewareDbError {
    match err {
        SqlMiddlewareDbError::RemoteService { code, message } if code == ENGINE_ERROR_CODE => {
            let (message, engine_code) = match message.split_once(ENGINE_TOKEN_MARKER) {
                Some((head, token)) => (head.to_string(), format!("SQLITE_{token}")),
                None => (message, DEFAULT_ENGINE_TOKEN.to_string()),
            };
            tracing::debug!(%engine_code, "remote engine rejected statement");
            SqlMiddlewareDbError::Statement(StatementError {
                message,
                query: query.to_string(),
                bindings: bindings.to_vec(),
                engine_code,
            })
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(code: i64, message: &str) -> SqlMiddlewareDbError {
        SqlMiddlewareDbError::RemoteService {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn engine_code_becomes_statement_error() {
        let params = vec![RowValues::Int(1)];
        let err = classify_remote_error(
            remote(ENGINE_ERROR_CODE, "near line 3: SQLITE_CONSTRAINT"),
            "INSERT INTO t VALUES (?1)",
            &params,
        );
        let SqlMiddlewareDbError::Statement(stmt) = err else {
            panic!("expected statement error, got {err:?}");
        };
        assert_eq!(stmt.message, "near line 3");
        assert_eq!(stmt.engine_code, "SQLITE_CONSTRAINT");
        assert_eq!(stmt.query, "INSERT INTO t VALUES (?1)");
        assert_eq!(stmt.bindings, params);
        assert_eq!(stmt.to_string(), "near line 3: SQLITE_CONSTRAINT");
    }

    #[test]
    fn missing_marker_falls_back_to_generic_token() {
        let err = classify_remote_error(remote(ENGINE_ERROR_CODE, "no such table: t"), "q", &[]);
        let SqlMiddlewareDbError::Statement(stmt) = err else {
            panic!("expected statement error");
        };
        assert_eq!(stmt.message, "no such table: t");
        assert_eq!(stmt.engine_code, "SQLITE_ERROR");
    }

    #[test]
    fn other_errors_pass_through() {
        let err = classify_remote_error(remote(10000, "Authentication error"), "q", &[]);
        assert!(matches!(
            err,
            SqlMiddlewareDbError::RemoteService { code: 10000, .. }
        ));
        let err = classify_remote_error(SqlMiddlewareDbError::NoRows, "q", &[]);
        assert!(err.is_no_rows());
    }

    #[test]
    fn conversion_error_names_both_types() {
        let err = ConversionError::new::<i32>(&RowValues::Text("abc".into()));
        assert_eq!(
            err.to_string(),
            "cannot convert value \"abc\" (type text) to destination type i32"
        );
    }

    #[test]
    fn column_context_keeps_sentinel_visible() {
        let err = SqlMiddlewareDbError::in_column("0", SqlMiddlewareDbError::NoRows);
        assert!(err.is_no_rows());
        assert_eq!(err.to_string(), "column 0: no rows in result set");
    }
}
