//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::coerce::{Coerce, ScanTarget, coerce, from_value, scan_values};
pub use crate::config::{D1Options, D1OptionsBuilder};
pub use crate::driver::{
    Connector, D1Conn, D1Connector, D1Driver, DriverConn, DriverResult, DriverRows, DriverStmt,
    NamedValue, values_to_named,
};
pub use crate::error::{ConversionError, SqlMiddlewareDbError, StatementError};
pub use crate::executor::{CallContext, DatabaseDetails, RemoteExecutor};
pub use crate::handle::Handle;
pub use crate::mapping::{FieldSpec, ScanRecord, scan_records};
pub use crate::params::Params;
pub use crate::results::{CustomDbRow, NamedResult, QueryMeta, ResultSet, Row, Rows};
pub use crate::types::{RowValues, ValueKind};

pub use crate::{coerce_newtype, impl_scan_record};
