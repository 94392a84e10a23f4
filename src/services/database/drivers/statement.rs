//! Leading-keyword statement classification.
//!
//! Each adapter decides between "fetch rows" and "report affected rows" by
//! looking at the first keyword of the statement. Leading whitespace, SQL
//! comments and opening parentheses are skipped first.

pub const MYSQL_ROW_KEYWORDS: &[&str] = &["SELECT", "WITH", "SHOW", "DESCRIBE", "DESC", "EXPLAIN"];
pub const POSTGRES_ROW_KEYWORDS: &[&str] = &["SELECT", "WITH", "SHOW", "EXPLAIN", "VALUES"];
pub const MSSQL_ROW_KEYWORDS: &[&str] = &["SELECT", "WITH", "EXEC", "SP_"];
pub const DM_ROW_KEYWORDS: &[&str] = &["SELECT", "WITH", "SHOW", "DESCRIBE", "EXPLAIN"];
pub const SQLITE_ROW_KEYWORDS: &[&str] = &["SELECT", "WITH", "PRAGMA", "EXPLAIN"];

/// Strip leading whitespace, `--` line comments, `/* */` block comments and
/// opening parentheses.
pub fn strip_leading_noise(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        let trimmed = rest.trim_start();
        if let Some(after) = trimmed.strip_prefix("--") {
            rest = match after.find('\n') {
                Some(pos) => &after[pos + 1..],
                None => "",
            };
        } else if let Some(after) = trimmed.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(pos) => &after[pos + 2..],
                None => "",
            };
        } else if let Some(after) = trimmed.strip_prefix('(') {
            rest = after;
        } else {
            return trimmed;
        }
    }
}

/// True when the statement starts with one of `keywords`, compared
/// case-insensitively.
///
/// Keywords ending in `_` (SQL Server's `SP_`) match as a prefix of the first
/// word; all others must match the whole first word.
pub fn is_row_producing(sql: &str, keywords: &[&str]) -> bool {
    let body = strip_leading_noise(sql);
    let word: String = body
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
        .collect::<String>()
        .to_uppercase();
    if word.is_empty() {
        return false;
    }

    keywords.iter().any(|kw| {
        if kw.ends_with('_') {
            word.starts_with(kw)
        } else {
            word == *kw
        }
    })
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_family() {
        assert!(is_row_producing("SELECT 1", SQLITE_ROW_KEYWORDS));
        assert!(is_row_producing("  select * from t", SQLITE_ROW_KEYWORDS));
        assert!(is_row_producing(
            "WITH cte AS (SELECT 1) SELECT * FROM cte",
            SQLITE_ROW_KEYWORDS
        ));
        assert!(is_row_producing("pragma table_info(t)", SQLITE_ROW_KEYWORDS));
        assert!(is_row_producing("(SELECT 1) UNION (SELECT 2)", SQLITE_ROW_KEYWORDS));
    }

    #[test]
    fn test_effectful_statements() {
        assert!(!is_row_producing("DELETE FROM t", SQLITE_ROW_KEYWORDS));
        assert!(!is_row_producing("INSERT INTO t VALUES (1)", SQLITE_ROW_KEYWORDS));
        assert!(!is_row_producing("CREATE TABLE t (id INT)", SQLITE_ROW_KEYWORDS));
        assert!(!is_row_producing("", SQLITE_ROW_KEYWORDS));
        assert!(!is_row_producing("   ", SQLITE_ROW_KEYWORDS));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert!(is_row_producing("-- header\nSELECT 1", POSTGRES_ROW_KEYWORDS));
        assert!(is_row_producing("/* hint */ SELECT 1", POSTGRES_ROW_KEYWORDS));
        assert!(!is_row_producing("/* SELECT */ UPDATE t SET a = 1", POSTGRES_ROW_KEYWORDS));
        assert!(!is_row_producing("-- only a comment", POSTGRES_ROW_KEYWORDS));
    }

    #[test]
    fn test_keyword_must_be_whole_word() {
        assert!(!is_row_producing("SELECTED_ROWS()", MYSQL_ROW_KEYWORDS));
        assert!(is_row_producing("DESC users", MYSQL_ROW_KEYWORDS));
        assert!(!is_row_producing("DESC users", POSTGRES_ROW_KEYWORDS));
    }

    #[test]
    fn test_mssql_procedure_prefix() {
        assert!(is_row_producing("sp_help 'users'", MSSQL_ROW_KEYWORDS));
        assert!(is_row_producing("EXEC dbo.report", MSSQL_ROW_KEYWORDS));
        assert!(!is_row_producing("SHOW TABLES", MSSQL_ROW_KEYWORDS));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
