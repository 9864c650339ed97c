//! Decoded statement results and the cursors over them.
//!
//! - `result_set`: the rectangular column-list/row-list shape and its metadata
//! - `row`: the name-keyed ergonomic shape
//! - `cursor`: forward-only `Row`/`Rows` cursors

mod cursor;
mod result_set;
mod row;

pub use cursor::{Row, Rows};
pub use result_set::{QueryMeta, ResultSet};
pub use row::{CustomDbRow, NamedResult};
