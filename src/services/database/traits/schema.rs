//! Catalog metadata returned by schema introspection.

use serde::Serialize;

/// One table or view found in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub schema: Option<String>,
    /// Catalog table type, e.g. "BASE TABLE" or "VIEW"
    #[serde(rename = "type")]
    pub table_type: String,
    /// Estimated row count, when the catalog exposes one
    pub row_count: Option<i64>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            table_type: "TABLE".to_string(),
            row_count: None,
        }
    }

    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_type(mut self, table_type: impl Into<String>) -> Self {
        self.table_type = table_type.into();
        self
    }

    /// Zero or negative estimates mean "unknown" in every catalog we read.
    pub fn with_estimate(mut self, estimate: Option<i64>) -> Self {
        self.row_count = estimate.filter(|n| *n > 0);
        self
    }

    /// Exact counts keep zero.
    pub fn with_row_count(mut self, count: Option<i64>) -> Self {
        self.row_count = count;
        self
    }
}

/// One column of a described table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type as the engine spells it
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    #[serde(rename = "primary_key")]
    pub is_primary_key: bool,
    #[serde(rename = "default")]
    pub default_value: Option<String>,
    /// Engine-specific annotation such as MySQL's `auto_increment`
    pub extra: Option<String>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            is_primary_key: false,
            default_value: None,
            extra: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn primary_key(mut self, is_primary_key: bool) -> Self {
        self.is_primary_key = is_primary_key;
        self
    }

    pub fn default_value(mut self, default_value: Option<String>) -> Self {
        self.default_value = default_value;
        self
    }

    /// Empty annotations are dropped.
    pub fn extra(mut self, extra: Option<String>) -> Self {
        self.extra = extra.filter(|s| !s.is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_info_defaults() {
        let t = TableInfo::new("users");
        assert_eq!(t.table_type, "TABLE");
        assert!(t.schema.is_none());
        assert!(t.row_count.is_none());
    }

    #[test]
    fn test_non_positive_estimate_is_absent() {
        assert_eq!(TableInfo::new("t").with_estimate(Some(-1)).row_count, None);
        assert_eq!(TableInfo::new("t").with_estimate(Some(0)).row_count, None);
        assert_eq!(TableInfo::new("t").with_estimate(Some(42)).row_count, Some(42));
        assert_eq!(TableInfo::new("t").with_row_count(Some(0)).row_count, Some(0));
    }

    #[test]
    fn test_column_info_serialized_field_names() {
        let col = ColumnInfo::new("id", "INTEGER")
            .nullable(false)
            .primary_key(true)
            .extra(Some(String::new()));
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["name"], "id");
        assert_eq!(json["type"], "INTEGER");
        assert_eq!(json["nullable"], false);
        assert_eq!(json["primary_key"], true);
        assert!(json["default"].is_null());
        assert!(json["extra"].is_null());
    }
}
