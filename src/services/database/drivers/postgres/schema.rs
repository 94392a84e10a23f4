//! PostgreSQL schema introspection implementation.
//!
//! Reads `information_schema` joined with `pg_class` for row estimates.
//! Without an explicit schema, `public` is used.

use async_trait::async_trait;
use sqlx::Row;
use tracing::warn;

use super::connection::PostgresAdapter;
use crate::services::database::traits::{ColumnInfo, SchemaIntrospection, TableInfo};

const LIST_TABLES: &str = r#"
    SELECT
        t.table_name::text AS table_name,
        t.table_schema::text AS table_schema,
        t.table_type::text AS table_type,
        c.reltuples::bigint AS estimate
    FROM information_schema.tables t
    LEFT JOIN pg_catalog.pg_namespace n
        ON n.nspname = t.table_schema
    LEFT JOIN pg_catalog.pg_class c
        ON c.relname = t.table_name AND c.relnamespace = n.oid
    WHERE t.table_schema::text = COALESCE($1::text, 'public')
    ORDER BY t.table_name
"#;

const DESCRIBE_TABLE: &str = r#"
    SELECT
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        c.is_nullable::text AS is_nullable,
        c.column_default::text AS column_default,
        EXISTS (
            SELECT 1
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
                AND tc.table_schema = c.table_schema
                AND tc.table_name = c.table_name
                AND kcu.column_name = c.column_name
        ) AS is_primary_key,
        CASE WHEN c.is_identity = 'YES' THEN 'identity' END AS extra
    FROM information_schema.columns c
    WHERE c.table_schema::text = COALESCE($1::text, 'public')
        AND c.table_name::text = $2
    ORDER BY c.ordinal_position
"#;

#[async_trait]
impl SchemaIntrospection for PostgresAdapter {
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
                warn!("failed to list PostgreSQL tables: {}", e);
                return Vec::new();
            }
        };

        rows.into_iter()
            .map(|row| {
                let name: String = row.get("table_name");
                let table_schema: Option<String> = row.get("table_schema");
                let table_type: Option<String> = row.get("table_type");
                let estimate: Option<i64> = row.get("estimate");

                TableInfo::new(name)
                    .with_schema(table_schema)
                    .with_type(table_type.unwrap_or_else(|| "TABLE".to_string()))
                    .with_estimate(estimate)
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
                warn!("failed to describe PostgreSQL table {}: {}", table, e);
                return Vec::new();
            }
        };

        rows.into_iter()
            .map(|row| {
                let name: String = row.get("column_name");
                let data_type: String = row.get("data_type");
                let is_nullable: String = row.get("is_nullable");
                let is_primary_key: bool = row.get("is_primary_key");

                ColumnInfo::new(name, data_type)
                    .nullable(is_nullable == "YES")
                    .primary_key(is_primary_key)
                    .default_value(row.get("column_default"))
                    .extra(row.get("extra"))
            })
            .collect()
    }
}
