use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{
    Connector, DriverConn, DriverResult, DriverRows, DriverStmt, DriverTx, NamedValue, TxOptions,
    named_to_values,
};
use crate::config::D1Options;
use crate::error::SqlMiddlewareDbError;
use crate::executor::{CallContext, RemoteExecutor};
use crate::handle::Handle;
use crate::results::{CustomDbRow, NamedResult};
use crate::types::RowValues;

/// Builds the executor a connector talks through.
pub type ExecutorFactory = Arc<
    dyn Fn(&D1Options) -> Result<Arc<dyn RemoteExecutor>, SqlMiddlewareDbError> + Send + Sync,
>;

/// Entry point of the D1 driver adapter.
///
/// Constructed directly with the executor factory it should use; there is no global
/// registration.
#[derive(Clone)]
pub struct D1Driver {
    factory: ExecutorFactory,
}

impl fmt::Debug for D1Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("D1Driver").finish_non_exhaustive()
    }
}

impl D1Driver {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&D1Options) -> Result<Arc<dyn RemoteExecutor>, SqlMiddlewareDbError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Driver that hands every connector the same executor.
    #[must_use]
    pub fn with_executor(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self::new(move |_| Ok(Arc::clone(&executor)))
    }

    /// Validate `options` and bind them to a connector.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::ConfigError` for an incomplete descriptor.
    pub fn open_connector(&self, options: D1Options) -> Result<D1Connector, SqlMiddlewareDbError> {
        options.validate()?;
        Ok(D1Connector {
            driver: self.clone(),
            options,
        })
    }

    /// Open a connector and connect it in one step.
    ///
    /// # Errors
    ///
    /// Same as [`D1Driver::open_connector`] and [`Connector::connect`].
    pub async fn open(
        &self,
        ctx: &CallContext,
        options: D1Options,
    ) -> Result<D1Conn, SqlMiddlewareDbError> {
        self.open_connector(options)?.connect(ctx).await
    }
}

/// A validated descriptor bound to its driver.
#[derive(Debug, Clone)]
pub struct D1Connector {
    driver: D1Driver,
    options: D1Options,
}

impl D1Connector {
    #[must_use]
    pub fn driver(&self) -> &D1Driver {
        &self.driver
    }

    #[must_use]
    pub fn options(&self) -> &D1Options {
        &self.options
    }
}

#[async_trait]
impl Connector for D1Connector {
    type Conn = D1Conn;

    /// Resolve the target database once and wrap it in a connection.
    async fn connect(&self, ctx: &CallContext) -> Result<D1Conn, SqlMiddlewareDbError> {
        let executor = (self.driver.factory)(&self.options)?;
        let handle = Handle::resolve(executor, ctx, &self.options.database).await?;
        tracing::debug!(database_id = handle.database_id(), "driver connection opened");
        Ok(D1Conn {
            handle: Some(Arc::new(handle)),
        })
    }
}

/// Driver connection over a resolved [`Handle`].
///
/// Holds no network session; closing only forgets the handle.
#[derive(Debug)]
pub struct D1Conn {
    handle: Option<Arc<Handle>>,
}

impl D1Conn {
    /// Connection over an existing handle.
    #[must_use]
    pub fn from_handle(handle: Arc<Handle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// The underlying handle, for its counters and ergonomic API.
    #[must_use]
    pub fn handle(&self) -> Option<&Arc<Handle>> {
        self.handle.as_ref()
    }

    fn live_handle(&self) -> Result<&Handle, SqlMiddlewareDbError> {
        self.handle.as_deref().ok_or(SqlMiddlewareDbError::BadConn)
    }
}

#[async_trait]
impl DriverConn for D1Conn {
    type Stmt<'a> = D1Stmt<'a>;
    type Rows = D1DriverRows;
    type Outcome = D1ExecResult;

    /// Binding waits until execution, so preparing never talks to the service.
    fn prepare<'a>(&'a self, query: &str) -> Result<D1Stmt<'a>, SqlMiddlewareDbError> {
        Ok(D1Stmt {
            conn: self,
            query: query.to_string(),
        })
    }

    async fn exec(
        &self,
        ctx: &CallContext,
        query: &str,
        args: &[NamedValue],
    ) -> Result<D1ExecResult, SqlMiddlewareDbError> {
        let meta = self
            .live_handle()?
            .execute(ctx, query, &named_to_values(args))
            .await?;
        Ok(D1ExecResult {
            last_insert_id: meta.last_row_id,
            rows_affected: i64::try_from(meta.rows_written).unwrap_or(i64::MAX),
        })
    }

    async fn query(
        &self,
        ctx: &CallContext,
        query: &str,
        args: &[NamedValue],
    ) -> Result<D1DriverRows, SqlMiddlewareDbError> {
        let handle = self.live_handle()?;
        let result = handle.query(ctx, query, &named_to_values(args)).await?;
        Ok(D1DriverRows::new(result))
    }

    async fn ping(&self, ctx: &CallContext) -> Result<(), SqlMiddlewareDbError> {
        self.live_handle()?.ping(ctx).await
    }

    async fn reset_session(&self, _ctx: &CallContext) -> Result<(), SqlMiddlewareDbError> {
        Ok(())
    }

    /// Always declines: every batch is its own round trip, so there is no boundary to hold
    /// a transaction open across. Batches may still carry their own `BEGIN`/`COMMIT`.
    async fn begin(&self, _ctx: &CallContext) -> Result<Box<dyn DriverTx>, SqlMiddlewareDbError> {
        Err(SqlMiddlewareDbError::Skip)
    }

    async fn begin_tx(
        &self,
        _ctx: &CallContext,
        _opts: TxOptions,
    ) -> Result<Box<dyn DriverTx>, SqlMiddlewareDbError> {
        Err(SqlMiddlewareDbError::Skip)
    }

    fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    fn close(&mut self) -> Result<(), SqlMiddlewareDbError> {
        self.handle = None;
        Ok(())
    }
}

/// Statement text bound to its connection; parameters are positional and 1-based.
#[derive(Debug)]
pub struct D1Stmt<'a> {
    conn: &'a D1Conn,
    query: String,
}

impl D1Stmt<'_> {
    #[must_use]
    pub fn query_text(&self) -> &str {
        &self.query
    }
}

#[async_trait]
impl<'a> DriverStmt for D1Stmt<'a> {
    type Rows = D1DriverRows;
    type Outcome = D1ExecResult;

    fn num_input(&self) -> Option<usize> {
        None
    }

    async fn exec(
        &self,
        ctx: &CallContext,
        args: &[NamedValue],
    ) -> Result<D1ExecResult, SqlMiddlewareDbError> {
        self.conn.exec(ctx, &self.query, args).await
    }

    async fn query(
        &self,
        ctx: &CallContext,
        args: &[NamedValue],
    ) -> Result<D1DriverRows, SqlMiddlewareDbError> {
        self.conn.query(ctx, &self.query, args).await
    }

    fn close(&mut self) -> Result<(), SqlMiddlewareDbError> {
        Ok(())
    }
}

/// Rows of one driver query, in the column order of the first row.
#[derive(Debug, Clone)]
pub struct D1DriverRows {
    columns: Vec<String>,
    rows: Vec<CustomDbRow>,
    current: usize,
}

impl D1DriverRows {
    fn new(result: NamedResult) -> Self {
        let columns = result
            .results
            .first()
            .map_or_else(|| result.columns().to_vec(), |row| row.keys().to_vec());
        Self {
            columns,
            rows: result.results,
            current: 0,
        }
    }
}

impl DriverRows for D1DriverRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self, dest: &mut [RowValues]) -> Result<bool, SqlMiddlewareDbError> {
        let Some(row) = self.rows.get(self.current) else {
            return Ok(false);
        };
        for (slot, column) in dest.iter_mut().zip(&self.columns) {
            *slot = row.get(column).cloned().unwrap_or_default();
        }
        self.current += 1;
        Ok(true)
    }

    fn close(&mut self) -> Result<(), SqlMiddlewareDbError> {
        Ok(())
    }
}

/// Outcome of a driver `exec`, taken from the handle's latest metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct D1ExecResult {
    last_insert_id: i64,
    rows_affected: i64,
}

impl DriverResult for D1ExecResult {
    fn last_insert_id(&self) -> Result<i64, SqlMiddlewareDbError> {
        Ok(self.last_insert_id)
    }

    fn rows_affected(&self) -> Result<i64, SqlMiddlewareDbError> {
        Ok(self.rows_affected)
    }
}
