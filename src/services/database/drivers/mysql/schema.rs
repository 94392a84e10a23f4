//! MySQL schema introspection implementation.
//!
//! Reads `INFORMATION_SCHEMA` with bound parameters. Without an explicit
//! schema the current database (`DATABASE()`) is used.

use async_trait::async_trait;
use tracing::warn;

use super::connection::MySqlAdapter;
use super::types::MySqlValueConverter;
use crate::services::database::traits::{ColumnInfo, SchemaIntrospection, TableInfo};

const LIST_TABLES: &str = r#"
    SELECT
        TABLE_NAME,
        TABLE_SCHEMA,
        TABLE_TYPE,
        TABLE_ROWS
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
    ORDER BY TABLE_NAME
"#;

const DESCRIBE_TABLE: &str = r#"
    SELECT
        COLUMN_NAME,
        COLUMN_TYPE,
        IS_NULLABLE,
        COLUMN_KEY,
        COLUMN_DEFAULT,
        EXTRA
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
        AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

#[async_trait]
impl SchemaIntrospection for MySqlAdapter {
    async fn list_tables(&mut self, schema: Option<&str>) -> Vec<TableInfo> {
        let Some(conn) = self.conn_mut() else {
            return Vec::new();
        };

        let rows = match sqlx::query(LIST_TABLES)
            .bind(schema)
            .fetch_all(&mut *conn)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("failed to list MySQL tables: {}", e);
                return Vec::new();
            }
        };

        rows.iter()
            .filter_map(|row| {
                let name = MySqlValueConverter::text(row, 0)?;
                Some(
                    TableInfo::new(name)
                        .with_schema(MySqlValueConverter::text(row, 1))
                        .with_type(
                            MySqlValueConverter::text(row, 2).unwrap_or_else(|| "TABLE".into()),
                        )
                        .with_estimate(MySqlValueConverter::integer(row, 3)),
                )
            })
            .collect()
    }

    async fn describe_table(&mut self, table: &str, schema: Option<&str>) -> Vec<ColumnInfo> {
        let Some(conn) = self.conn_mut() else {
            return Vec::new();
        };

        let rows = match sqlx::query(DESCRIBE_TABLE)
            .bind(schema)
            .bind(table)
            .fetch_all(&mut *conn)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("failed to describe MySQL table {}: {}", table, e);
                return Vec::new();
            }
        };

        rows.iter()
            .filter_map(|row| {
                let name = MySqlValueConverter::text(row, 0)?;
                let data_type = MySqlValueConverter::text(row, 1).unwrap_or_default();
                let nullable = MySqlValueConverter::text(row, 2).as_deref() == Some("YES");
                let primary = MySqlValueConverter::text(row, 3).as_deref() == Some("PRI");

                Some(
                    ColumnInfo::new(name, data_type)
                        .nullable(nullable)
                        .primary_key(primary)
                        .default_value(MySqlValueConverter::text(row, 4))
                        .extra(MySqlValueConverter::text(row, 5)),
                )
            })
            .collect()
    }
}
