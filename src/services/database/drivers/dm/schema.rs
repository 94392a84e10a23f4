//! DM8 schema introspection implementation.
//!
//! DM folds unquoted identifiers to upper case, so owner and table names are
//! upper-cased before they are bound. Without a schema the `USER_*` views of
//! the logged-in user are read.

use async_trait::async_trait;
use odbc_api::IntoParameter;
use tracing::warn;

use super::connection::{DmAdapter, fetch};
use crate::services::database::traits::{
    ColumnInfo, DatabaseAdapter, SchemaIntrospection, TableInfo,
};

const LIST_OWNER_TABLES: &str = r#"
    SELECT TABLE_NAME, OWNER
    FROM ALL_TABLES
    WHERE OWNER = ?
    ORDER BY TABLE_NAME
"#;

const LIST_USER_TABLES: &str = r#"
    SELECT TABLE_NAME
    FROM USER_TABLES
    ORDER BY TABLE_NAME
"#;

const DESCRIBE_OWNER_TABLE: &str = r#"
    SELECT
        c.COLUMN_NAME,
        c.DATA_TYPE,
        c.NULLABLE,
        CASE WHEN pk.COLUMN_NAME IS NOT NULL THEN 'Y' ELSE 'N' END AS IS_PK,
        c.DATA_DEFAULT
    FROM ALL_TAB_COLUMNS c
    LEFT JOIN (
        SELECT cols.COLUMN_NAME
        FROM ALL_CONSTRAINTS cons
        JOIN ALL_CONS_COLUMNS cols
            ON cons.CONSTRAINT_NAME = cols.CONSTRAINT_NAME
            AND cons.OWNER = cols.OWNER
        WHERE cons.CONSTRAINT_TYPE = 'P'
            AND cons.OWNER = ?
            AND cons.TABLE_NAME = ?
    ) pk ON c.COLUMN_NAME = pk.COLUMN_NAME
    WHERE c.OWNER = ? AND c.TABLE_NAME = ?
    ORDER BY c.COLUMN_ID
"#;

const DESCRIBE_USER_TABLE: &str = r#"
    SELECT
        c.COLUMN_NAME,
        c.DATA_TYPE,
        c.NULLABLE,
        CASE WHEN pk.COLUMN_NAME IS NOT NULL THEN 'Y' ELSE 'N' END AS IS_PK,
        c.DATA_DEFAULT
    FROM USER_TAB_COLUMNS c
    LEFT JOIN (
        SELECT cols.COLUMN_NAME
        FROM USER_CONSTRAINTS cons
        JOIN USER_CONS_COLUMNS cols ON cons.CONSTRAINT_NAME = cols.CONSTRAINT_NAME
        WHERE cons.CONSTRAINT_TYPE = 'P'
            AND cons.TABLE_NAME = ?
    ) pk ON c.COLUMN_NAME = pk.COLUMN_NAME
    WHERE c.TABLE_NAME = ?
    ORDER BY c.COLUMN_ID
"#;

fn cell(row: &[Option<String>], idx: usize) -> Option<String> {
    row.get(idx).cloned().flatten()
}

#[async_trait]
impl SchemaIntrospection for DmAdapter {
    async fn list_tables(&mut self, schema: Option<&str>) -> Vec<TableInfo> {
        if !self.is_connected() {
            return Vec::new();
        }

        let owner = schema.map(str::to_uppercase);
        let result = self
            .with_connection(move |conn| match &owner {
                Some(owner) => fetch(conn, LIST_OWNER_TABLES, &owner.as_str().into_parameter()),
                None => fetch(conn, LIST_USER_TABLES, ()),
            })
            .await;

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("failed to list DM8 tables: {}", e);
                return Vec::new();
            }
        };

        fetched
            .rows
            .iter()
            .filter_map(|row| {
                let name = cell(row, 0)?;
                Some(TableInfo::new(name).with_schema(cell(row, 1)))
            })
            .collect()
    }

    async fn describe_table(&mut self, table: &str, schema: Option<&str>) -> Vec<ColumnInfo> {
        if !self.is_connected() {
            return Vec::new();
        }

        let table_name = table.to_uppercase();
        let owner = schema.map(str::to_uppercase);
        let result = self
            .with_connection(move |conn| {
                let table = table_name.as_str().into_parameter();
                match &owner {
                    Some(owner) => {
                        let owner = owner.as_str().into_parameter();
                        fetch(conn, DESCRIBE_OWNER_TABLE, (&owner, &table, &owner, &table))
                    }
                    None => fetch(conn, DESCRIBE_USER_TABLE, (&table, &table)),
                }
            })
            .await;

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("failed to describe DM8 table {}: {}", table, e);
                return Vec::new();
            }
        };

        fetched
            .rows
            .iter()
            .filter_map(|row| {
                let name = cell(row, 0)?;
                Some(
                    ColumnInfo::new(name, cell(row, 1).unwrap_or_default())
                        .nullable(cell(row, 2).as_deref() == Some("Y"))
                        .primary_key(cell(row, 3).as_deref() == Some("Y"))
                        .default_value(cell(row, 4)),
                )
            })
            .collect()
    }
}
