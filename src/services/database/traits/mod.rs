//! Adapter abstraction traits and types.
//!
//! - **Types** (`types`): the engine enum
//! - **Row/Value** (`row`): normalized cell values
//! - **Connection** (`connection`): the adapter contract and query results
//! - **Schema** (`schema`): catalog metadata

pub mod connection;
pub mod row;
pub mod schema;
pub mod types;

pub use connection::{
    BoxedAdapter, ConnectParams, ConnectionInfo, DatabaseAdapter, QueryResult,
    SchemaIntrospection,
};

pub use row::{Row, Value};

pub use schema::{ColumnInfo, TableInfo};

pub use types::DatabaseType;
