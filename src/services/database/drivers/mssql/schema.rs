//! SQL Server schema introspection implementation.
//!
//! Row counts come from `sys.partitions` (heap or clustered index only), so
//! they are cheap but approximate. Without an explicit schema, `dbo` is used.

use async_trait::async_trait;
use tiberius::Row;
use tracing::warn;

use super::connection::MssqlAdapter;
use crate::services::database::traits::{ColumnInfo, SchemaIntrospection, TableInfo};

const DEFAULT_SCHEMA: &str = "dbo";

const LIST_TABLES: &str = r#"
    SELECT
        t.TABLE_NAME,
        t.TABLE_SCHEMA,
        t.TABLE_TYPE,
        CAST(SUM(p.rows) AS BIGINT) AS ROW_COUNT
    FROM INFORMATION_SCHEMA.TABLES t
    LEFT JOIN sys.partitions p
        ON p.object_id = OBJECT_ID(QUOTENAME(t.TABLE_SCHEMA) + '.' + QUOTENAME(t.TABLE_NAME))
        AND p.index_id IN (0, 1)
    WHERE t.TABLE_SCHEMA = @P1
    GROUP BY t.TABLE_NAME, t.TABLE_SCHEMA, t.TABLE_TYPE
    ORDER BY t.TABLE_NAME
"#;

const DESCRIBE_TABLE: &str = r#"
    SELECT
        c.COLUMN_NAME,
        c.DATA_TYPE,
        CAST(c.CHARACTER_MAXIMUM_LENGTH AS INT) AS MAX_LENGTH,
        c.IS_NULLABLE,
        c.COLUMN_DEFAULT,
        CAST(CASE WHEN pk.COLUMN_NAME IS NULL THEN 0 ELSE 1 END AS INT) AS IS_PRIMARY_KEY,
        CAST(COLUMNPROPERTY(
            OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME)),
            c.COLUMN_NAME,
            'IsIdentity'
        ) AS INT) AS IS_IDENTITY
    FROM INFORMATION_SCHEMA.COLUMNS c
    LEFT JOIN (
        SELECT ku.TABLE_SCHEMA, ku.TABLE_NAME, ku.COLUMN_NAME
        FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
        JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku
            ON tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME
            AND tc.TABLE_SCHEMA = ku.TABLE_SCHEMA
        WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
    ) pk
        ON pk.TABLE_SCHEMA = c.TABLE_SCHEMA
        AND pk.TABLE_NAME = c.TABLE_NAME
        AND pk.COLUMN_NAME = c.COLUMN_NAME
    WHERE c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2
    ORDER BY c.ORDINAL_POSITION
"#;

fn text(row: &Row, idx: usize) -> Option<String> {
    row.try_get::<&str, _>(idx)
        .ok()
        .flatten()
        .map(str::to_string)
}

fn int(row: &Row, idx: usize) -> Option<i32> {
    row.try_get::<i32, _>(idx).ok().flatten()
}

/// `nvarchar` plus its length, `max` for the unbounded variants.
fn display_type(data_type: &str, max_length: Option<i32>) -> String {
    match max_length {
        Some(-1) => format!("{}(max)", data_type),
        Some(len) => format!("{}({})", data_type, len),
        None => data_type.to_string(),
    }
}

#[async_trait]
impl SchemaIntrospection for MssqlAdapter {
    async fn list_tables(&mut self, schema: Option<&str>) -> Vec<TableInfo> {
        let Some(client) = self.client_mut() else {
            return Vec::new();
        };
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);

        let rows = match client.query(LIST_TABLES, &[&schema]).await {
            Ok(stream) => stream.into_first_result().await,
            Err(e) => Err(e),
        };
        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                warn!("failed to list SQL Server tables: {}", e);
                return Vec::new();
            }
        };

        rows.iter()
            .filter_map(|row| {
                let name = text(row, 0)?;
                let table_type = text(row, 2).unwrap_or_else(|| "BASE TABLE".to_string());
                let row_count = row.try_get::<i64, _>(3).ok().flatten();
                Some(
                    TableInfo::new(name)
                        .with_schema(text(row, 1))
                        .with_type(table_type)
                        .with_estimate(row_count),
                )
            })
            .collect()
    }

    async fn describe_table(&mut self, table: &str, schema: Option<&str>) -> Vec<ColumnInfo> {
        let Some(client) = self.client_mut() else {
            return Vec::new();
        };
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);

        let rows = match client.query(DESCRIBE_TABLE, &[&schema, &table]).await {
            Ok(stream) => stream.into_first_result().await,
            Err(e) => Err(e),
        };
        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                warn!("failed to describe SQL Server table {}: {}", table, e);
                return Vec::new();
            }
        };

        rows.iter()
            .filter_map(|row| {
                let name = text(row, 0)?;
                let data_type = display_type(&text(row, 1).unwrap_or_default(), int(row, 2));
                let identity = int(row, 6) == Some(1);

                Some(
                    ColumnInfo::new(name, data_type)
                        .nullable(text(row, 3).as_deref() == Some("YES"))
                        .primary_key(int(row, 5) == Some(1))
                        .default_value(text(row, 4))
                        .extra(identity.then(|| "identity".to_string())),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_type() {
        assert_eq!(display_type("nvarchar", Some(50)), "nvarchar(50)");
        assert_eq!(display_type("varbinary", Some(-1)), "varbinary(max)");
        assert_eq!(display_type("int", None), "int");
    }

    #[test]
    fn test_disconnected_introspection_is_empty() {
        smol::block_on(async {
            let mut adapter = MssqlAdapter::new();
            assert!(adapter.list_tables(None).await.is_empty());
            assert!(adapter.describe_table("users", Some("dbo")).await.is_empty());
        });
    }
}
