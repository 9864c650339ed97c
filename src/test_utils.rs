//! In-memory stand-in for the remote service, for unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::SqlMiddlewareDbError;
use crate::executor::{CallContext, DatabaseDetails, RemoteExecutor};
use crate::results::{NamedResult, ResultSet};
use crate::types::RowValues;

/// Which executor entry point a call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Query,
    RawQuery,
    ListDatabases,
}

/// One call observed by a [`ScriptedExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub database_id: String,
    /// Statement text, or the name filter for database listings
    pub sql: String,
    pub params: Vec<RowValues>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Raw(Vec<ResultSet>),
    Named(Vec<NamedResult>),
    Error(SqlMiddlewareDbError),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Executor that replays queued responses in order and records every call.
///
/// With nothing queued, a batch answers with one empty result set.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    databases: Vec<DatabaseDetails>,
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a database visible to name lookups.
    #[must_use]
    pub fn with_database(mut self, name: impl Into<String>, uuid: impl Into<String>) -> Self {
        self.databases.push(DatabaseDetails {
            name: name.into(),
            uuid: uuid.into(),
            ..DatabaseDetails::default()
        });
        self
    }

    /// Queue a batch answer in the column-list/row-list shape.
    pub fn push_result(&self, sets: Vec<ResultSet>) {
        lock(&self.responses).push_back(Scripted::Raw(sets));
    }

    /// Queue a batch answer in the name-keyed shape.
    pub fn push_named(&self, results: Vec<NamedResult>) {
        lock(&self.responses).push_back(Scripted::Named(results));
    }

    pub fn push_error(&self, err: SqlMiddlewareDbError) {
        lock(&self.responses).push_back(Scripted::Error(err));
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, kind: CallKind, database_id: &str, sql: &str, params: &[RowValues]) {
        lock(&self.calls).push(RecordedCall {
            kind,
            database_id: database_id.to_string(),
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }

    fn next_response(&self) -> Scripted {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Scripted::Raw(vec![ResultSet::default()]))
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn query(
        &self,
        _ctx: &CallContext,
        database_id: &str,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<NamedResult>, SqlMiddlewareDbError> {
        self.record(CallKind::Query, database_id, sql, params);
        match self.next_response() {
            Scripted::Raw(sets) => Ok(sets.into_iter().map(NamedResult::from).collect()),
            Scripted::Named(results) => Ok(results),
            Scripted::Error(err) => Err(err),
        }
    }

    async fn raw_query(
        &self,
        _ctx: &CallContext,
        database_id: &str,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<ResultSet>, SqlMiddlewareDbError> {
        self.record(CallKind::RawQuery, database_id, sql, params);
        match self.next_response() {
            Scripted::Raw(sets) => Ok(sets),
            Scripted::Named(results) => Ok(results
                .into_iter()
                .map(NamedResult::into_result_set)
                .collect()),
            Scripted::Error(err) => Err(err),
        }
    }

    async fn list_databases(
        &self,
        _ctx: &CallContext,
        name: &str,
    ) -> Result<Vec<DatabaseDetails>, SqlMiddlewareDbError> {
        self.record(CallKind::ListDatabases, "", name, &[]);
        {
            let mut responses = lock(&self.responses);
            if matches!(responses.front(), Some(Scripted::Error(_))) {
                if let Some(Scripted::Error(err)) = responses.pop_front() {
                    return Err(err);
                }
            }
        }
        Ok(self
            .databases
            .iter()
            .filter(|db| db.name.contains(name))
            .cloned()
            .collect())
    }
}
