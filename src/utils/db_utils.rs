use sqlx::Sqlite;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::sqlite::SqliteArguments;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
}

/// ===============================
/// WHERE clause container
/// ===============================
#[derive(Debug, Default)]
pub struct WhereClause {
    conditions: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition that takes no bound values.
    pub fn raw(&mut self, condition: &str) {
        self.conditions.push(condition.to_string());
    }

    pub fn eq(&mut self, column: &str, value: SqlValue) {
        self.conditions.push(format!("{column} = ?"));
        self.values.push(value);
    }

    /// Substring match of `needle` against any of `columns`. LIKE folds ASCII
    /// case only; other characters must match exactly.
    pub fn contains_any(&mut self, columns: &[&str], needle: &str) {
        if columns.is_empty() {
            return;
        }
        let pattern = like_pattern(needle);
        let ors = columns
            .iter()
            .map(|c| format!("CAST({c} AS TEXT) LIKE ? ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.conditions.push(format!("({ors})"));
        for _ in columns {
            self.values.push(SqlValue::String(pattern.clone()));
        }
    }

    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// `%needle%` with LIKE wildcards in `needle` escaped.
pub fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// ===============================
/// Bind values onto a query
/// ===============================
pub fn bind_as<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    values: &[SqlValue],
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::String(v) => query.bind(v.clone()),
            SqlValue::I64(v) => query.bind(*v),
        };
    }
    query
}

pub fn bind_scalar<'q, O>(
    mut query: QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>,
    values: &[SqlValue],
) -> QueryScalar<'q, Sqlite, O, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::String(v) => query.bind(v.clone()),
            SqlValue::I64(v) => query.bind(*v),
        };
    }
    query
}
