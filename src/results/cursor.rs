//! Forward-only cursors over decoded result sets.
//!
//! Neither cursor is internally synchronized; drive each from one task at a time.

use std::cell::RefCell;

use super::result_set::{QueryMeta, ResultSet};
use crate::coerce::{ScanTarget, scan_values};
use crate::error::SqlMiddlewareDbError;
use crate::mapping::{FieldMapCache, ScanRecord, scan_into_record};
use crate::types::RowValues;

static NO_ROWS: SqlMiddlewareDbError = SqlMiddlewareDbError::NoRows;

/// The first row of a single-row query, or the error that prevented it.
///
/// ```rust
/// use sql_middleware_d1::prelude::*;
///
/// let rs = ResultSet::new(
///     vec!["id".into(), "name".into()],
///     vec![vec![RowValues::Int(1), RowValues::Text("Alice".into())]],
///     QueryMeta::default(),
/// )?;
/// let row = Row::new(Some(rs));
///
/// let mut id = 0_i64;
/// let mut name = String::new();
/// row.scan(&mut [&mut id, &mut name])?;
/// assert_eq!((id, name.as_str()), (1, "Alice"));
/// # Ok::<(), SqlMiddlewareDbError>(())
/// ```
#[derive(Debug, Default)]
pub struct Row {
    result: Option<ResultSet>,
    err: Option<SqlMiddlewareDbError>,
    field_map: RefCell<FieldMapCache>,
}

impl Row {
    #[must_use]
    pub fn new(result: Option<ResultSet>) -> Self {
        Self {
            result,
            err: None,
            field_map: RefCell::default(),
        }
    }

    #[must_use]
    pub fn from_error(err: SqlMiddlewareDbError) -> Self {
        Self {
            result: None,
            err: Some(err),
            field_map: RefCell::default(),
        }
    }

    /// The carried error, the "no rows" sentinel when there is nothing to read, or `None`.
    #[must_use]
    pub fn err(&self) -> Option<&SqlMiddlewareDbError> {
        if let Some(err) = &self.err {
            return Some(err);
        }
        match &self.result {
            Some(rs) if !rs.is_empty() => None,
            _ => Some(&NO_ROWS),
        }
    }

    fn first_row(&self) -> Result<(&ResultSet, &[RowValues]), SqlMiddlewareDbError> {
        if let Some(err) = self.err() {
            return Err(err.clone());
        }
        self.result
            .as_ref()
            .and_then(|rs| rs.row(0).map(|row| (rs, row)))
            .ok_or(SqlMiddlewareDbError::NoRows)
    }

    /// Copy the first row's values into `dest`, positionally.
    ///
    /// # Errors
    ///
    /// Returns [`Row::err`] when it is set, otherwise the first conversion failure.
    pub fn scan(&self, dest: &mut [&mut dyn ScanTarget]) -> Result<(), SqlMiddlewareDbError> {
        let (_, row) = self.first_row()?;
        scan_values(row, dest)
    }

    /// Fill a record from the first row, matching columns to fields by name.
    ///
    /// # Errors
    ///
    /// Returns [`Row::err`] when it is set, otherwise the first conversion failure.
    pub fn scan_record<T: ScanRecord>(&self, dest: &mut T) -> Result<(), SqlMiddlewareDbError> {
        let (rs, row) = self.first_row()?;
        let mut cache = self.field_map.borrow_mut();
        scan_into_record(rs.columns(), row, dest, cache.get_or_build::<T>())
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.result.as_ref().map_or(&[], ResultSet::columns)
    }

    #[must_use]
    pub fn meta(&self) -> Option<&QueryMeta> {
        self.result.as_ref().map(ResultSet::meta)
    }
}

/// Cursor over every result set of a batch.
///
/// Starts before the first row of the first set. [`Rows::next`] walks rows within the
/// active set; [`Rows::next_set`] moves to the following statement's set.
///
/// An empty active set reports the "no rows" sentinel from [`Rows::err`], which also
/// stops [`Rows::next_set`]; use [`Rows::result_sets`] to inspect every set directly.
#[derive(Debug, Default)]
pub struct Rows {
    sets: Vec<ResultSet>,
    current_set: usize,
    active: usize,
    current: isize,
    err: Option<SqlMiddlewareDbError>,
    field_map: FieldMapCache,
}

impl Rows {
    #[must_use]
    pub fn new(sets: Vec<ResultSet>) -> Self {
        Self {
            sets,
            current_set: 0,
            active: 0,
            current: -1,
            err: None,
            field_map: FieldMapCache::default(),
        }
    }

    #[must_use]
    pub fn from_error(err: SqlMiddlewareDbError) -> Self {
        Self {
            err: Some(err),
            ..Self::new(Vec::new())
        }
    }

    fn active(&self) -> Option<&ResultSet> {
        self.sets.get(self.active)
    }

    fn active_len(&self) -> isize {
        self.active()
            .map_or(0, |rs| isize::try_from(rs.row_count()).unwrap_or(isize::MAX))
    }

    /// The carried error, the "no rows" sentinel when the cursor has nothing to read, or
    /// `None`. Safe to call at any position.
    #[must_use]
    pub fn err(&self) -> Option<&SqlMiddlewareDbError> {
        if let Some(err) = &self.err {
            return Some(err);
        }
        match self.sets.get(self.current_set) {
            Some(rs) if !rs.is_empty() => None,
            _ => Some(&NO_ROWS),
        }
    }

    /// Advance to the next row of the active set.
    ///
    /// Returns `false` once the set is exhausted; further calls leave the cursor in place.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.err().is_some() {
            return false;
        }
        let len = self.active_len();
        if self.current < len {
            self.current += 1;
        }
        self.current < len
    }

    /// Move to the next result set, positioned before its first row.
    ///
    /// Returns `false` when there is no further set. The row position is still reset and
    /// the previous set stays active for [`Rows::columns`] and [`Rows::meta`].
    pub fn next_set(&mut self) -> bool {
        if self.err().is_some() {
            return false;
        }
        self.current = -1;
        if self.current_set < self.sets.len() {
            self.current_set += 1;
        }
        let advanced = self.current_set < self.sets.len();
        if advanced {
            self.active = self.current_set;
        }
        tracing::trace!(set = self.current_set, advanced, "result set transition");
        advanced
    }

    fn current_row(&self) -> Result<(&ResultSet, &[RowValues]), SqlMiddlewareDbError> {
        if let Some(err) = self.err() {
            return Err(err.clone());
        }
        let rs = self.active().ok_or(SqlMiddlewareDbError::NoRows)?;
        usize::try_from(self.current)
            .ok()
            .and_then(|idx| rs.row(idx))
            .map(|row| (rs, row))
            .ok_or(SqlMiddlewareDbError::NoRows)
    }

    /// Copy the current row's values into `dest`, positionally.
    ///
    /// # Errors
    ///
    /// Returns [`Rows::err`] when it is set, the "no rows" sentinel when the cursor is not
    /// on a row, otherwise the first conversion failure.
    pub fn scan(&self, dest: &mut [&mut dyn ScanTarget]) -> Result<(), SqlMiddlewareDbError> {
        let (_, row) = self.current_row()?;
        scan_values(row, dest)
    }

    /// Fill a record from the current row, matching columns to fields by name.
    ///
    /// The field map is built on first use and reused while the record type stays the same.
    ///
    /// # Errors
    ///
    /// Same as [`Rows::scan`].
    pub fn scan_record<T: ScanRecord>(&mut self, dest: &mut T) -> Result<(), SqlMiddlewareDbError> {
        if let Some(err) = self.err() {
            return Err(err.clone());
        }
        let Self {
            sets,
            active,
            current,
            field_map,
            ..
        } = self;
        let rs = sets.get(*active).ok_or(SqlMiddlewareDbError::NoRows)?;
        let row = usize::try_from(*current)
            .ok()
            .and_then(|idx| rs.row(idx))
            .ok_or(SqlMiddlewareDbError::NoRows)?;
        scan_into_record(rs.columns(), row, dest, field_map.get_or_build::<T>())
    }

    /// Drain the remaining rows of the active set into records.
    ///
    /// # Errors
    ///
    /// Returns [`Rows::err`] when it is set before iteration starts, otherwise the first
    /// conversion failure annotated with its row index.
    pub fn collect_records<T: ScanRecord + Default>(
        &mut self,
    ) -> Result<Vec<T>, SqlMiddlewareDbError> {
        if let Some(err) = self.err() {
            return Err(err.clone());
        }
        let mut records = Vec::new();
        while self.next() {
            let mut record = T::default();
            let index = usize::try_from(self.current).unwrap_or_default();
            self.scan_record(&mut record)
                .map_err(|err| SqlMiddlewareDbError::in_row(index, err))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Column names of the active set.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.active().map_or(&[], ResultSet::columns)
    }

    /// Metadata of the active set.
    #[must_use]
    pub fn meta(&self) -> Option<&QueryMeta> {
        self.active().map(ResultSet::meta)
    }

    #[must_use]
    pub fn result_sets(&self) -> &[ResultSet] {
        &self.sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    crate::impl_scan_record!(User {
        id: [db = "id"],
        name,
    });

    fn people() -> ResultSet {
        ResultSet::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![RowValues::Int(1), RowValues::Text("Alice".into())],
                vec![RowValues::Int(2), RowValues::Text("Bob".into())],
            ],
            QueryMeta::default(),
        )
        .unwrap()
    }

    fn scores() -> ResultSet {
        ResultSet::new(
            vec!["score".into()],
            vec![vec![RowValues::Float(9.5)]],
            QueryMeta::default(),
        )
        .unwrap()
    }

    #[test]
    fn rows_iterate_then_report_exhaustion() {
        let mut rows = Rows::new(vec![people()]);
        let mut seen = Vec::new();
        while rows.next() {
            let mut id = 0_i64;
            let mut name = String::new();
            rows.scan(&mut [&mut id, &mut name]).unwrap();
            seen.push((id, name));
        }
        assert_eq!(seen, vec![(1, "Alice".to_string()), (2, "Bob".to_string())]);
        assert!(!rows.next());
        assert!(!rows.next());
        assert_eq!(rows.scan(&mut []), Err(SqlMiddlewareDbError::NoRows));
    }

    #[test]
    fn scan_before_first_next_is_no_rows() {
        let rows = Rows::new(vec![people()]);
        let mut id = 0_i64;
        assert!(rows.err().is_none());
        assert_eq!(rows.scan(&mut [&mut id]), Err(SqlMiddlewareDbError::NoRows));
    }

    #[test]
    fn next_set_crosses_boundaries_and_resets_row_cursor() {
        let mut rows = Rows::new(vec![people(), scores()]);
        assert!(rows.next());
        assert!(rows.next());
        assert!(rows.next_set());
        assert_eq!(rows.columns(), ["score".to_string()]);
        assert!(rows.next());
        let mut score = 0.0_f64;
        rows.scan(&mut [&mut score]).unwrap();
        assert!((score - 9.5).abs() < f64::EPSILON);
        assert!(!rows.next());
        assert!(!rows.next_set());
        assert!(rows.err().unwrap().is_no_rows());
        assert_eq!(rows.columns(), ["score".to_string()]);
        assert!(!rows.next());
        assert!(!rows.next_set());
    }

    #[test]
    fn records_reuse_field_map_across_rows() {
        let mut rows = Rows::new(vec![people()]);
        assert!(rows.next());
        let mut user = User::default();
        rows.scan_record(&mut user).unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "Alice".into()
            }
        );
        let rest: Vec<User> = rows.collect_records().unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].name, "Bob");
    }

    #[test]
    fn empty_or_absent_sets_report_no_rows() {
        let empty = ResultSet::empty(vec!["id".into()], QueryMeta::default());
        let mut rows = Rows::new(vec![empty]);
        assert!(rows.err().unwrap().is_no_rows());
        assert!(!rows.next());
        assert!(!rows.next_set());

        let mut none = Rows::new(Vec::new());
        assert!(none.err().unwrap().is_no_rows());
        assert!(!none.next());
        assert!(none.columns().is_empty());
    }

    #[test]
    fn carried_error_fails_every_operation() {
        let failure = SqlMiddlewareDbError::TransportError("connection reset".into());
        let mut rows = Rows::from_error(failure.clone());
        assert_eq!(rows.err(), Some(&failure));
        assert!(!rows.next());
        assert!(!rows.next_set());
        let mut a = 0_i64;
        let mut b = String::new();
        assert_eq!(rows.scan(&mut []), Err(failure.clone()));
        assert_eq!(rows.scan(&mut [&mut a, &mut b]), Err(failure.clone()));
        assert_eq!(rows.scan_record(&mut User::default()), Err(failure.clone()));

        let row = Row::from_error(failure.clone());
        assert_eq!(row.err(), Some(&failure));
        assert_eq!(row.scan(&mut [&mut a]), Err(failure.clone()));
        assert_eq!(row.scan_record(&mut User::default()), Err(failure));
    }

    #[test]
    fn row_scans_first_row_only() {
        let row = Row::new(Some(people()));
        assert!(row.err().is_none());
        let mut user = User::default();
        row.scan_record(&mut user).unwrap();
        assert_eq!(user.id, 1);

        let mut id = 0_i64;
        let mut name = String::new();
        let mut untouched = 42_i64;
        row.scan(&mut [&mut id, &mut name, &mut untouched]).unwrap();
        assert_eq!((id, name.as_str(), untouched), (1, "Alice", 42));
    }

    #[test]
    fn empty_row_leaves_destinations_alone() {
        let row = Row::new(Some(ResultSet::empty(
            vec!["id".into()],
            QueryMeta::default(),
        )));
        let mut id = 7_i64;
        assert_eq!(row.err(), Some(&SqlMiddlewareDbError::NoRows));
        assert_eq!(row.scan(&mut [&mut id]), Err(SqlMiddlewareDbError::NoRows));
        assert_eq!(id, 7);
        assert!(Row::new(None).err().unwrap().is_no_rows());
    }
}
