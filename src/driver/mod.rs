// Driver adapter module - the conventional connection/statement/rows contract and its D1 binding
//
// - traits: the contract (connector, connection, statement, rows, result, transaction)
// - d1: the D1 implementation over a resolved `Handle`

pub mod d1;
pub mod traits;

pub use d1::{D1Conn, D1Connector, D1Driver, D1DriverRows, D1ExecResult, D1Stmt, ExecutorFactory};
pub use traits::{
    Connector, DriverConn, DriverResult, DriverRows, DriverStmt, DriverTx, NamedValue, TxOptions,
    named_to_values, values_to_named,
};
