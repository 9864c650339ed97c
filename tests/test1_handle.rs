#![cfg(feature = "test-utils")]

use std::sync::Arc;

use sql_middleware_d1::error::ENGINE_ERROR_CODE;
use sql_middleware_d1::executor::{CallContext, RemoteExecutor};
use sql_middleware_d1::test_utils::{CallKind, ScriptedExecutor};
use sql_middleware_d1::{Handle, QueryMeta, ResultSet, RowValues, SqlMiddlewareDbError};
use tokio::runtime::Runtime;

const DB_ID: &str = "6f1c1e7a-2b5d-4c3e-9f0a-1b2c3d4e5f60";

fn meta(rows_read: u64, rows_written: u64, last_row_id: i64) -> QueryMeta {
    QueryMeta {
        rows_read,
        rows_written,
        last_row_id,
        ..QueryMeta::default()
    }
}

fn people(meta: QueryMeta) -> Result<ResultSet, SqlMiddlewareDbError> {
    ResultSet::new(
        vec!["id".into(), "name".into()],
        vec![
            vec![RowValues::Int(1), RowValues::Text("Alice".into())],
            vec![RowValues::Int(2), RowValues::Text("Bob".into())],
        ],
        meta,
    )
}

fn handle(executor: &Arc<ScriptedExecutor>) -> Handle {
    Handle::new(Arc::clone(executor) as Arc<dyn RemoteExecutor>, DB_ID)
}

#[test]
fn counters_accumulate_across_every_statement() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.push_result(vec![people(meta(2, 0, 0))?, people(meta(3, 1, 9))?]);
        executor.push_result(vec![people(meta(5, 2, 11))?]);
        let handle = handle(&executor);
        let ctx = CallContext::new();

        let all = handle.query_all(&ctx, "SELECT 1; SELECT 2", &[]).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(handle.rows_read(), 5);
        assert_eq!(handle.rows_written(), 1);
        assert_eq!(handle.last_row_id(), 9);

        let meta = handle.execute(&ctx, "INSERT INTO t VALUES (1)", &[]).await?;
        assert_eq!(meta.last_row_id, 11);
        assert_eq!(handle.last_meta(), meta);
        assert_eq!(handle.rows_read(), 10);
        assert_eq!(handle.rows_written(), 3);

        handle.reset_counters();
        assert_eq!(handle.rows_read(), 0);
        assert_eq!(handle.rows_written(), 0);
        assert_eq!(handle.last_row_id(), 11);
        Ok(())
    })
}

#[test]
fn parameters_are_normalized_before_submission() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let executor = Arc::new(ScriptedExecutor::new());
        let handle = handle(&executor);
        let ctx = CallContext::new();
        let stamp = chrono::DateTime::from_timestamp(1_700_000_000, 0).ok_or("timestamp")?;
        handle
            .execute(
                &ctx,
                "UPDATE t SET active = ?1, seen = ?2 WHERE name = ?3",
                &[
                    RowValues::Bool(true),
                    RowValues::Timestamp(stamp),
                    RowValues::Text("Alice".into()),
                ],
            )
            .await?;

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, CallKind::Query);
        assert_eq!(calls[0].database_id, DB_ID);
        assert_eq!(
            calls[0].params,
            vec![
                RowValues::Int(1),
                RowValues::Int(1_700_000_000),
                RowValues::Text("Alice".into()),
            ]
        );
        Ok(())
    })
}

#[test]
fn engine_errors_carry_statement_and_bindings() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.push_error(SqlMiddlewareDbError::RemoteService {
            code: ENGINE_ERROR_CODE,
            message: "UNIQUE constraint failed: users.id: SQLITE_CONSTRAINT".into(),
        });
        executor.push_error(SqlMiddlewareDbError::RemoteService {
            code: 10000,
            message: "Authentication error".into(),
        });
        let handle = handle(&executor);
        let ctx = CallContext::new();
        let sql = "INSERT INTO users (id) VALUES (?1)";

        let err = handle
            .execute(&ctx, sql, &[RowValues::Bool(false)])
            .await
            .unwrap_err();
        let SqlMiddlewareDbError::Statement(stmt) = err else {
            panic!("expected statement error, got {err:?}");
        };
        assert_eq!(stmt.message, "UNIQUE constraint failed: users.id");
        assert_eq!(stmt.engine_code, "SQLITE_CONSTRAINT");
        assert_eq!(stmt.query, sql);
        assert_eq!(stmt.bindings, vec![RowValues::Int(0)]);

        let row = handle.query_row(&ctx, "SELECT 1", &[]).await;
        assert!(matches!(
            row.err(),
            Some(SqlMiddlewareDbError::RemoteService { code: 10000, .. })
        ));
        Ok(())
    })
}

#[test]
fn names_resolve_through_exact_match() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .with_database("prod-archive", "00000000-0000-0000-0000-000000000001")
                .with_database("prod", DB_ID),
        );
        let ctx = CallContext::new();
        let as_dyn = || Arc::clone(&executor) as Arc<dyn RemoteExecutor>;

        let handle = Handle::resolve(as_dyn(), &ctx, "prod").await?;
        assert_eq!(handle.database_id(), DB_ID);

        let handle = Handle::resolve(as_dyn(), &ctx, DB_ID).await?;
        assert_eq!(handle.database_id(), DB_ID);
        assert_eq!(
            executor
                .calls()
                .iter()
                .filter(|call| call.kind == CallKind::ListDatabases)
                .count(),
            1
        );

        let err = Handle::resolve(as_dyn(), &ctx, "pro").await.unwrap_err();
        assert!(matches!(err, SqlMiddlewareDbError::NotFound(_)));
        Ok(())
    })
}

#[test]
fn cancelled_context_stops_new_calls() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let executor = Arc::new(ScriptedExecutor::new());
        let handle = handle(&executor);
        let ctx = CallContext::new();
        ctx.cancel();

        let err = handle.ping(&ctx).await.unwrap_err();
        assert!(matches!(err, SqlMiddlewareDbError::Cancelled(_)));
        let rows = handle.query_rows(&ctx, "SELECT 1", &[]).await;
        assert!(matches!(rows.err(), Some(SqlMiddlewareDbError::Cancelled(_))));
        assert!(executor.calls().is_empty());
        Ok(())
    })
}

#[test]
fn ping_and_query_use_first_statement() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.push_result(vec![people(QueryMeta::default())?, ResultSet::default()]);
        let handle = handle(&executor);
        let ctx = CallContext::new();

        let named = handle.query(&ctx, "SELECT id, name FROM users; SELECT 1", &[]).await?;
        assert_eq!(named.len(), 2);
        assert_eq!(named.results[1].get_as::<String>("name")?, "Bob");

        handle.ping(&ctx).await?;
        assert_eq!(executor.calls()[1].sql, "SELECT 1");
        Ok(())
    })
}
