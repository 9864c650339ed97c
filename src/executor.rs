//! The remote query executor this crate decodes results from.
//!
//! An executor performs the actual HTTP/JSON round trip. It receives parameters already
//! normalized by [`Params::convert`](crate::params::Params::convert) and reports service
//! failures as [`SqlMiddlewareDbError::RemoteService`]; the [`Handle`](crate::handle::Handle)
//! re-classifies engine errors.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::SqlMiddlewareDbError;
use crate::results::{NamedResult, ResultSet};
use crate::types::RowValues;

/// Information about one remote database, as returned by a name search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseDetails {
    pub uuid: String,
    pub name: String,
    pub version: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub file_size: u64,
    pub num_tables: u64,
}

/// Cancellation and deadline signal passed through every remote call.
///
/// Cancelling stops new calls from starting. A call already in flight is only aborted if
/// the executor itself watches [`CallContext::cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl CallContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Tie this context to an externally owned token.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fail when the context was cancelled or its deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::Cancelled`.
    pub fn check(&self) -> Result<(), SqlMiddlewareDbError> {
        if self.token.is_cancelled() {
            return Err(SqlMiddlewareDbError::Cancelled(
                "context cancelled".to_string(),
            ));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(SqlMiddlewareDbError::Cancelled(
                "deadline exceeded".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

/// A remote D1-style query service.
///
/// Statement text may hold several semicolon-separated statements; each yields one
/// result in the returned batch, in order.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a batch and return the name-keyed shape.
    async fn query(
        &self,
        ctx: &CallContext,
        database_id: &str,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<NamedResult>, SqlMiddlewareDbError>;

    /// Run a batch and return the column-list/row-list shape.
    async fn raw_query(
        &self,
        ctx: &CallContext,
        database_id: &str,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<ResultSet>, SqlMiddlewareDbError>;

    /// Databases whose name contains `name`; every database when `name` is empty.
    async fn list_databases(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<Vec<DatabaseDetails>, SqlMiddlewareDbError>;
}
