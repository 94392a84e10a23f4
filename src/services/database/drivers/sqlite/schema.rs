//! SQLite schema introspection implementation.
//!
//! Tables come from `sqlite_master` and columns from `PRAGMA table_info`.
//! Neither accepts bound identifiers, so names are quoted with
//! `quote_ident` before interpolation. An optional schema names an attached
//! database.

use async_trait::async_trait;
use sqlx::Row;
use tracing::warn;

use super::connection::SqliteAdapter;
use crate::services::database::drivers::statement::quote_ident;
use crate::services::database::traits::{ColumnInfo, SchemaIntrospection, TableInfo};

fn qualify(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(s) => format!("{}.{}", quote_ident(s), quote_ident(name)),
        None => quote_ident(name),
    }
}

#[async_trait]
impl SchemaIntrospection for SqliteAdapter {
    async fn list_tables(&mut self, schema: Option<&str>) -> Vec<TableInfo> {
        let Some(conn) = self.conn_mut() else {
            return Vec::new();
        };

        let query = format!(
            r#"
            SELECT name, type
            FROM {}
            WHERE type IN ('table', 'view')
                AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
            qualify(schema, "sqlite_master")
        );

        let rows = match sqlx::query(&query).fetch_all(&mut *conn).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("failed to list SQLite tables: {}", e);
                return Vec::new();
            }
        };

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get("name");
            let table_type: String = row.get("type");

            // A view over a dropped table fails to count; keep listing.
            let count_sql = format!("SELECT COUNT(*) FROM {}", qualify(schema, &name));
            let row_count = sqlx::query_scalar::<_, i64>(&count_sql)
                .fetch_one(&mut *conn)
                .await
                .ok();

            tables.push(
                TableInfo::new(name)
                    .with_schema(schema.map(str::to_string))
                    .with_type(table_type.to_uppercase())
                    .with_row_count(row_count),
            );
        }

        tables
    }

    async fn describe_table(&mut self, table: &str, schema: Option<&str>) -> Vec<ColumnInfo> {
        let Some(conn) = self.conn_mut() else {
            return Vec::new();
        };

        let pragma = match schema {
            Some(s) => format!("PRAGMA {}.table_info({})", quote_ident(s), quote_ident(table)),
            None => format!("PRAGMA table_info({})", quote_ident(table)),
        };

        let rows = match sqlx::query(&pragma).fetch_all(&mut *conn).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("failed to describe SQLite table {}: {}", table, e);
                return Vec::new();
            }
        };

        rows.into_iter()
            .map(|row| {
                let name: String = row.get("name");
                let data_type: String = row.get("type");
                let notnull: i64 = row.get("notnull");
                let default_value: Option<String> = row.get("dflt_value");
                let pk: i64 = row.get("pk");

                ColumnInfo::new(name, data_type)
                    .nullable(notnull == 0)
                    .primary_key(pk > 0)
                    .default_value(default_value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::traits::{ConnectParams, DatabaseAdapter};

    async fn seeded() -> SqliteAdapter {
        let mut adapter = SqliteAdapter::new();
        adapter
            .connect(&ConnectParams::file(":memory:"))
            .await
            .unwrap();
        for sql in [
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, status TEXT DEFAULT 'new')",
            "CREATE TABLE \"odd\"\"name\" (v REAL)",
            "INSERT INTO users (name) VALUES ('a'), ('b')",
            "CREATE VIEW active AS SELECT * FROM users",
        ] {
            assert!(adapter.execute_query(sql).await.success, "{}", sql);
        }
        adapter
    }

    #[test]
    fn test_list_tables_includes_views_and_counts() {
        smol::block_on(async {
            let mut adapter = seeded().await;
            let tables = adapter.list_tables(None).await;

            let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(names, vec!["active", "odd\"name", "users"]);

            let users = tables.iter().find(|t| t.name == "users").unwrap();
            assert_eq!(users.table_type, "TABLE");
            assert_eq!(users.row_count, Some(2));

            let odd = tables.iter().find(|t| t.name == "odd\"name").unwrap();
            assert_eq!(odd.row_count, Some(0));

            let view = tables.iter().find(|t| t.name == "active").unwrap();
            assert_eq!(view.table_type, "VIEW");
        });
    }

    #[test]
    fn test_broken_view_count_is_absent() {
        smol::block_on(async {
            let mut adapter = seeded().await;
            adapter.execute_query("CREATE TABLE tmp (x INTEGER)").await;
            adapter
                .execute_query("CREATE VIEW broken AS SELECT x FROM tmp")
                .await;
            adapter.execute_query("DROP TABLE tmp").await;

            let tables = adapter.list_tables(None).await;
            let broken = tables.iter().find(|t| t.name == "broken").unwrap();
            assert_eq!(broken.row_count, None);
            assert!(tables.iter().any(|t| t.name == "users"));
        });
    }

    #[test]
    fn test_describe_table_columns() {
        smol::block_on(async {
            let mut adapter = seeded().await;
            let columns = adapter.describe_table("users", None).await;

            assert_eq!(columns.len(), 3);
            assert_eq!(columns[0].name, "id");
            assert!(columns[0].is_primary_key);
            assert_eq!(columns[1].name, "name");
            assert!(!columns[1].nullable);
            assert_eq!(columns[2].default_value.as_deref(), Some("'new'"));
        });
    }

    #[test]
    fn test_describe_missing_table_is_empty() {
        smol::block_on(async {
            let mut adapter = seeded().await;
            assert!(adapter.describe_table("nope", None).await.is_empty());
        });
    }

    #[test]
    fn test_introspection_without_connection_is_empty() {
        smol::block_on(async {
            let mut adapter = SqliteAdapter::new();
            assert!(adapter.list_tables(None).await.is_empty());
            assert!(adapter.describe_table("users", None).await.is_empty());
        });
    }
}
