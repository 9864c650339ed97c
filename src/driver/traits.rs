use async_trait::async_trait;

use crate::error::SqlMiddlewareDbError;
use crate::executor::CallContext;
use crate::types::RowValues;

/// A positional argument as the driver contract passes it.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    /// 1-based position of the argument
    pub ordinal: usize,
    /// Parameter name, when the caller bound by name
    pub name: Option<String>,
    pub value: RowValues,
}

/// Wrap plain values as positional arguments numbered from 1.
#[must_use]
pub fn values_to_named(values: &[RowValues]) -> Vec<NamedValue> {
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| NamedValue {
            ordinal: idx + 1,
            name: None,
            value: value.clone(),
        })
        .collect()
}

/// Unwrap driver arguments back into the ordered parameter list.
#[must_use]
pub fn named_to_values(args: &[NamedValue]) -> Vec<RowValues> {
    args.iter().map(|arg| arg.value.clone()).collect()
}

/// Options for beginning a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub read_only: bool,
}

/// Outcome of a statement that returns no rows.
pub trait DriverResult {
    /// # Errors
    ///
    /// Implementations may not support the value.
    fn last_insert_id(&self) -> Result<i64, SqlMiddlewareDbError>;

    /// # Errors
    ///
    /// Implementations may not support the value.
    fn rows_affected(&self) -> Result<i64, SqlMiddlewareDbError>;
}

/// Forward-only cursor handed back by a driver query.
pub trait DriverRows: Send {
    fn columns(&self) -> &[String];

    /// Fill `dest` with the next row's values in column order.
    ///
    /// Returns `Ok(false)` once every row has been consumed.
    ///
    /// # Errors
    ///
    /// Implementation specific.
    fn next(&mut self, dest: &mut [RowValues]) -> Result<bool, SqlMiddlewareDbError>;

    /// # Errors
    ///
    /// Implementation specific.
    fn close(&mut self) -> Result<(), SqlMiddlewareDbError>;
}

/// An explicit transaction.
pub trait DriverTx: Send {
    /// # Errors
    ///
    /// Implementation specific.
    fn commit(self: Box<Self>) -> Result<(), SqlMiddlewareDbError>;

    /// # Errors
    ///
    /// Implementation specific.
    fn rollback(self: Box<Self>) -> Result<(), SqlMiddlewareDbError>;
}

/// A prepared statement.
#[async_trait]
pub trait DriverStmt: Send + Sync {
    type Rows: DriverRows;
    type Outcome: DriverResult + Send;

    /// Number of placeholders, or `None` when the driver cannot tell.
    fn num_input(&self) -> Option<usize>;

    async fn exec(
        &self,
        ctx: &CallContext,
        args: &[NamedValue],
    ) -> Result<Self::Outcome, SqlMiddlewareDbError>;

    async fn query(
        &self,
        ctx: &CallContext,
        args: &[NamedValue],
    ) -> Result<Self::Rows, SqlMiddlewareDbError>;

    /// # Errors
    ///
    /// Implementation specific.
    fn close(&mut self) -> Result<(), SqlMiddlewareDbError>;
}

/// A connection in the conventional relational-access contract.
#[async_trait]
pub trait DriverConn: Send + Sync {
    type Stmt<'a>: DriverStmt
    where
        Self: 'a;
    type Rows: DriverRows;
    type Outcome: DriverResult + Send;

    /// # Errors
    ///
    /// Implementation specific.
    fn prepare<'a>(&'a self, query: &str) -> Result<Self::Stmt<'a>, SqlMiddlewareDbError>;

    async fn exec(
        &self,
        ctx: &CallContext,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Self::Outcome, SqlMiddlewareDbError>;

    async fn query(
        &self,
        ctx: &CallContext,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Self::Rows, SqlMiddlewareDbError>;

    async fn ping(&self, ctx: &CallContext) -> Result<(), SqlMiddlewareDbError>;

    async fn reset_session(&self, ctx: &CallContext) -> Result<(), SqlMiddlewareDbError>;

    async fn begin(&self, ctx: &CallContext) -> Result<Box<dyn DriverTx>, SqlMiddlewareDbError>;

    async fn begin_tx(
        &self,
        ctx: &CallContext,
        opts: TxOptions,
    ) -> Result<Box<dyn DriverTx>, SqlMiddlewareDbError>;

    fn is_valid(&self) -> bool;

    /// # Errors
    ///
    /// Implementation specific.
    fn close(&mut self) -> Result<(), SqlMiddlewareDbError>;
}

/// Produces connections from a fixed descriptor.
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: DriverConn;

    async fn connect(&self, ctx: &CallContext) -> Result<Self::Conn, SqlMiddlewareDbError>;
}
