use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{SqlMiddlewareDbError, classify_remote_error};
use crate::executor::{CallContext, RemoteExecutor};
use crate::params::Params;
use crate::results::{NamedResult, QueryMeta, ResultSet, Row, Rows};
use crate::types::RowValues;

lazy_static! {
    static ref DATABASE_ID_RE: Option<Regex> = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    )
    .ok();
}

/// True when `value` has the canonical database identifier shape
/// (`aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee`).
#[must_use]
pub fn is_database_id(value: &str) -> bool {
    DATABASE_ID_RE
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

#[derive(Debug, Default)]
struct HandleStats {
    rows_read: u64,
    rows_written: u64,
    last_row_id: i64,
    last_meta: QueryMeta,
}

/// A pseudo-connection to one remote database.
///
/// The service keeps no session between calls; the handle only remembers which database
/// it targets and accumulates the statistics the service reports. Every call goes through
/// the executor as one independent batch.
pub struct Handle {
    executor: Arc<dyn RemoteExecutor>,
    database_id: String,
    stats: Mutex<HandleStats>,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("database_id", &self.database_id)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Handle {
    /// Handle for an already-known database identifier.
    #[must_use]
    pub fn new(executor: Arc<dyn RemoteExecutor>, database_id: impl Into<String>) -> Self {
        Self {
            executor,
            database_id: database_id.into(),
            stats: Mutex::default(),
        }
    }

    /// Resolve a database name or identifier and return a handle for it.
    ///
    /// Identifiers pass through untouched. Names are looked up through the executor and
    /// the first database whose name matches exactly wins.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::NotFound` when no database has that name, or the
    /// executor's error when the lookup itself fails.
    pub async fn resolve(
        executor: Arc<dyn RemoteExecutor>,
        ctx: &CallContext,
        name_or_id: &str,
    ) -> Result<Self, SqlMiddlewareDbError> {
        if is_database_id(name_or_id) {
            tracing::debug!(database_id = name_or_id, "using database identifier as given");
            return Ok(Self::new(executor, name_or_id));
        }
        ctx.check()?;
        let candidates = executor.list_databases(ctx, name_or_id).await?;
        let found = candidates
            .into_iter()
            .find(|db| db.name == name_or_id)
            .ok_or_else(|| SqlMiddlewareDbError::NotFound(format!("database {name_or_id}")))?;
        tracing::debug!(name = name_or_id, database_id = %found.uuid, "resolved database name");
        Ok(Self::new(executor, found.uuid))
    }

    #[must_use]
    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    fn stats(&self) -> MutexGuard<'_, HandleStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record<'a>(&self, metas: impl IntoIterator<Item = &'a QueryMeta>) {
        let mut stats = self.stats();
        for meta in metas {
            stats.rows_read = stats.rows_read.saturating_add(meta.rows_read);
            stats.rows_written = stats.rows_written.saturating_add(meta.rows_written);
            stats.last_row_id = meta.last_row_id;
            stats.last_meta = meta.clone();
        }
    }

    async fn run_named(
        &self,
        ctx: &CallContext,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<NamedResult>, SqlMiddlewareDbError> {
        ctx.check()?;
        let params = Params::convert(params);
        tracing::debug!(
            database_id = %self.database_id,
            sql_len = sql.len(),
            params = params.as_slice().len(),
            "submitting query"
        );
        let results = self
            .executor
            .query(ctx, &self.database_id, sql, params.as_slice())
            .await
            .map_err(|err| classify_remote_error(err, sql, params.as_slice()))?;
        self.record(results.iter().map(|r| &r.meta));
        Ok(results)
    }

    async fn run_raw(
        &self,
        ctx: &CallContext,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<ResultSet>, SqlMiddlewareDbError> {
        ctx.check()?;
        let params = Params::convert(params);
        tracing::debug!(
            database_id = %self.database_id,
            sql_len = sql.len(),
            params = params.as_slice().len(),
            "submitting raw query"
        );
        let results = self
            .executor
            .raw_query(ctx, &self.database_id, sql, params.as_slice())
            .await
            .map_err(|err| classify_remote_error(err, sql, params.as_slice()))?;
        self.record(results.iter().map(ResultSet::meta));
        Ok(results)
    }

    /// Run a batch and return the first statement's rows, keyed by column name.
    ///
    /// # Errors
    ///
    /// Returns the executor's error, with engine failures classified as statement errors.
    pub async fn query(
        &self,
        ctx: &CallContext,
        sql: &str,
        params: &[RowValues],
    ) -> Result<NamedResult, SqlMiddlewareDbError> {
        Ok(self
            .run_named(ctx, sql, params)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    /// Run a batch and return every statement's rows, keyed by column name.
    ///
    /// # Errors
    ///
    /// Same as [`Handle::query`].
    pub async fn query_all(
        &self,
        ctx: &CallContext,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<NamedResult>, SqlMiddlewareDbError> {
        self.run_named(ctx, sql, params).await
    }

    /// Run a batch whose rows are not needed; returns the final statement's metadata.
    ///
    /// # Errors
    ///
    /// Same as [`Handle::query`].
    pub async fn execute(
        &self,
        ctx: &CallContext,
        sql: &str,
        params: &[RowValues],
    ) -> Result<QueryMeta, SqlMiddlewareDbError> {
        let results = self.run_named(ctx, sql, params).await?;
        Ok(results.last().map(|r| r.meta.clone()).unwrap_or_default())
    }

    /// Run a query and keep only its first row.
    ///
    /// Failures are carried by the returned [`Row`] and surface from [`Row::err`] and
    /// its scan methods.
    pub async fn query_row(
        &self,
        ctx: &CallContext,
        sql: &str,
        params: &[RowValues],
    ) -> Row {
        match self.run_raw(ctx, sql, params).await {
            Ok(sets) => Row::new(sets.into_iter().next()),
            Err(err) => Row::from_error(err),
        }
    }

    /// Run a batch and return a cursor over every statement's result set.
    ///
    /// Failures are carried by the returned [`Rows`].
    pub async fn query_rows(
        &self,
        ctx: &CallContext,
        sql: &str,
        params: &[RowValues],
    ) -> Rows {
        match self.run_raw(ctx, sql, params).await {
            Ok(sets) => Rows::new(sets),
            Err(err) => Rows::from_error(err),
        }
    }

    /// Check that the database answers a trivial query.
    ///
    /// # Errors
    ///
    /// Same as [`Handle::query`].
    pub async fn ping(&self, ctx: &CallContext) -> Result<(), SqlMiddlewareDbError> {
        self.run_named(ctx, "SELECT 1", &[]).await.map(|_| ())
    }

    #[must_use]
    pub fn last_row_id(&self) -> i64 {
        self.stats().last_row_id
    }

    /// Metadata of the final statement of the most recent batch.
    #[must_use]
    pub fn last_meta(&self) -> QueryMeta {
        self.stats().last_meta.clone()
    }

    /// Rows read by every batch run through this handle.
    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.stats().rows_read
    }

    #[must_use]
    pub fn rows_written(&self) -> u64 {
        self.stats().rows_written
    }

    pub fn reset_counters(&self) {
        let mut stats = self.stats();
        stats.rows_read = 0;
        stats.rows_written = 0;
    }
}
