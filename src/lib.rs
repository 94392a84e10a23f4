//! MCP server exposing one uniform set of SQL tools over MySQL, PostgreSQL,
//! SQL Server, DM8 and SQLite.

pub mod config;
pub mod server;
pub mod services;
pub mod tools;
