//! Column-name to record-field binding.
//!
//! A record type lists its fields once through [`ScanRecord::fields`]. Each field may
//! carry up to three binding tags, consulted in the order `db`, `sql`, `json`; the first
//! tag present decides the column key, and the tag value `"-"` keeps the field out of
//! the mapping. Untagged fields bind to their lower-cased name.
//!
//! ```rust
//! use sql_middleware_d1::impl_scan_record;
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     internal_flags: u32,
//! }
//!
//! impl_scan_record!(User {
//!     id: [db = "user_id"],
//!     name,
//!     internal_flags: [db = "-"],
//! });
//! ```

use std::any::TypeId;
use std::collections::HashMap;

use crate::coerce::{ScanTarget, coerce};
use crate::error::SqlMiddlewareDbError;
use crate::types::RowValues;

/// Tag value that excludes a field from the mapping.
pub const SKIP_MARKER: &str = "-";

/// Binding description for one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub db: Option<&'static str>,
    pub sql: Option<&'static str>,
    pub json: Option<&'static str>,
}

impl FieldSpec {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            db: None,
            sql: None,
            json: None,
        }
    }

    #[must_use]
    pub const fn db(mut self, tag: &'static str) -> Self {
        self.db = Some(tag);
        self
    }

    #[must_use]
    pub const fn sql(mut self, tag: &'static str) -> Self {
        self.sql = Some(tag);
        self
    }

    #[must_use]
    pub const fn json(mut self, tag: &'static str) -> Self {
        self.json = Some(tag);
        self
    }

    /// Column key for this field, or `None` when the field is skipped.
    #[must_use]
    pub fn column_key(&self) -> Option<String> {
        let tagged = [self.db, self.sql, self.json]
            .into_iter()
            .flatten()
            .find(|tag| !tag.is_empty());
        match tagged {
            Some(SKIP_MARKER) => None,
            Some(tag) => Some(tag.to_lowercase()),
            None => Some(self.name.to_lowercase()),
        }
    }
}

/// A record type whose fields can be filled from named columns.
///
/// Usually implemented through [`impl_scan_record!`](crate::impl_scan_record).
pub trait ScanRecord: 'static {
    /// Field descriptions, in declaration order.
    fn fields() -> Vec<FieldSpec>;

    /// Mutable access to the fields, in the same order as [`ScanRecord::fields`].
    fn scan_targets(&mut self) -> Vec<&mut dyn ScanTarget>;
}

/// Lower-cased column key to field index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    keys: HashMap<String, usize>,
}

impl FieldMap {
    #[must_use]
    pub fn get(&self, column: &str) -> Option<usize> {
        self.keys.get(&column.to_lowercase()).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Build the column mapping for `T`.
#[must_use]
pub fn build_field_map<T: ScanRecord>() -> FieldMap {
    let keys = T::fields()
        .iter()
        .enumerate()
        .filter_map(|(idx, spec)| spec.column_key().map(|key| (key, idx)))
        .collect();
    FieldMap { keys }
}

/// A field map remembered together with the record type it was built for.
///
/// Cursors hold one of these so consecutive rows scanned into the same type reuse it.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldMapCache {
    cached: Option<(TypeId, FieldMap)>,
}

impl FieldMapCache {
    pub(crate) fn get_or_build<T: ScanRecord>(&mut self) -> &FieldMap {
        let type_id = TypeId::of::<T>();
        if !matches!(&self.cached, Some((cached, _)) if *cached == type_id) {
            self.cached = None;
        }
        &self
            .cached
            .get_or_insert_with(|| (type_id, build_field_map::<T>()))
            .1
    }
}

/// Fill `dest` from one row.
///
/// Columns without a mapped field are ignored; fields without a matching column keep
/// their current value.
///
/// # Errors
///
/// Returns the first conversion failure, annotated with the column name.
pub fn scan_into_record<T: ScanRecord>(
    columns: &[String],
    row: &[RowValues],
    dest: &mut T,
    field_map: &FieldMap,
) -> Result<(), SqlMiddlewareDbError> {
    let mut targets = dest.scan_targets();
    for (column, value) in columns.iter().zip(row) {
        let Some(field_idx) = field_map.get(column) else {
            continue;
        };
        if let Some(target) = targets.get_mut(field_idx) {
            coerce(&mut **target, value)
                .map_err(|err| SqlMiddlewareDbError::in_column(column.clone(), err))?;
        }
    }
    Ok(())
}

/// Scan every row into a fresh `T`, building the field map once.
///
/// # Errors
///
/// Returns the first failure, annotated with the row index.
pub fn scan_records<T: ScanRecord + Default>(
    columns: &[String],
    rows: &[Vec<RowValues>],
) -> Result<Vec<T>, SqlMiddlewareDbError> {
    let field_map = build_field_map::<T>();
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut record = T::default();
            scan_into_record(columns, row, &mut record, &field_map)
                .map_err(|err| SqlMiddlewareDbError::in_row(idx, err))?;
            Ok(record)
        })
        .collect()
}

/// Implement [`ScanRecord`] for a struct by listing its fields and optional tags.
///
/// Tags go in brackets after the field name: `field: [db = "col", json = "alt"]`.
#[macro_export]
macro_rules! impl_scan_record {
    ($record:ty { $($field:ident $(: [$($tag:ident = $value:literal),* $(,)?])?),* $(,)? }) => {
        impl $crate::mapping::ScanRecord for $record {
            fn fields() -> ::std::vec::Vec<$crate::mapping::FieldSpec> {
                ::std::vec![
                    $(
                        $crate::mapping::FieldSpec::new(stringify!($field))
                            $($(.$tag($value))*)?
                    ),*
                ]
            }

            fn scan_targets(&mut self) -> ::std::vec::Vec<&mut dyn $crate::coerce::ScanTarget> {
                ::std::vec![$(&mut self.$field as &mut dyn $crate::coerce::ScanTarget),*]
            }
        }
    };
}
