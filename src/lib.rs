//! Result decoding, typed row scanning, and a driver adapter for Cloudflare D1-style
//! remote SQLite databases.
//!
//! The remote service answers every statement batch with loosely typed JSON. This crate
//! turns those answers into [`ResultSet`](results::ResultSet)s, walks them with the
//! [`Row`](results::Row) and [`Rows`](results::Rows) cursors, and converts each value into
//! the caller's destination type through one static coercion table. The HTTP transport is
//! supplied by the caller as a [`RemoteExecutor`](executor::RemoteExecutor).
//!
//! ```rust
//! use sql_middleware_d1::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl_scan_record!(User {
//!     id: [db = "user_id"],
//!     name,
//! });
//!
//! let rs = ResultSet::new(
//!     vec!["user_id".into(), "name".into()],
//!     vec![
//!         vec![RowValues::Int(1), RowValues::Text("Alice".into())],
//!         vec![RowValues::Text("2".into()), RowValues::Text("Bob".into())],
//!     ],
//!     QueryMeta::default(),
//! )?;
//!
//! let mut rows = Rows::new(vec![rs]);
//! let users: Vec<User> = rows.collect_records()?;
//! assert_eq!(users[1].id, 2);
//! assert_eq!(users[1].name, "Bob");
//! # Ok::<(), SqlMiddlewareDbError>(())
//! ```

pub mod coerce;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod handle;
pub mod mapping;
pub mod params;
pub mod prelude;
pub mod results;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{D1Options, D1OptionsBuilder};
pub use error::SqlMiddlewareDbError;
pub use handle::Handle;
pub use results::{CustomDbRow, NamedResult, QueryMeta, ResultSet, Row, Rows};
pub use types::RowValues;
