//! Database driver implementations.
//!
//! One adapter per engine, each behind its cargo feature:
//!
//! - **MySQL** (`mysql`): MySQL/MariaDB via SQLx
//! - **PostgreSQL** (`postgres`): via SQLx
//! - **SQL Server** (`mssql`): via Tiberius
//! - **DM8** (`dm8`): via the vendor ODBC driver and odbc-api
//! - **SQLite** (`sqlite`): embedded, via SQLx
//!
//! Each driver implements the `DatabaseAdapter` and `SchemaIntrospection`
//! traits.

mod factory;
pub mod statement;

#[cfg(feature = "dm8")]
pub mod dm;
#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use factory::AdapterFactory;
