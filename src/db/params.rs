//! Parameter binding and placeholder translation.
//!
//! SQL templates use `?` for every value. MySQL and SQLite accept that as-is;
//! PostgreSQL wants numbered `$n` markers.

use crate::db::DatabaseType;
use crate::db::value::Value;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Postgres, Sqlite};
use std::borrow::Cow;

/// Rewrite `?` placeholders into the driver's native marker.
///
/// Question marks inside single-quoted, double-quoted or backtick-quoted
/// sections, `--` line comments and `/* */` block comments are left alone.
pub fn to_native_placeholders(sql: &str, db_type: DatabaseType) -> Cow<'_, str> {
    if db_type.uses_question_marks() || !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    #[derive(Clone, Copy)]
    enum Skip {
        Code,
        Quoted(char),
        LineComment,
        BlockComment,
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut state = Skip::Code;
    let mut index = 0;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        match state {
            Skip::Quoted(q) if c == q => state = Skip::Code,
            Skip::LineComment if c == '\n' => state = Skip::Code,
            Skip::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                out.push('/');
                chars.next();
                state = Skip::Code;
            }
            Skip::Quoted(_) | Skip::LineComment | Skip::BlockComment => {}
            Skip::Code => match c {
                '\'' | '"' | '`' => state = Skip::Quoted(c),
                '-' if chars.peek() == Some(&'-') => {
                    out.push('-');
                    chars.next();
                    state = Skip::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    out.push('*');
                    chars.next();
                    state = Skip::BlockComment;
                }
                '?' => {
                    out.pop();
                    index += 1;
                    out.push('$');
                    out.push_str(&index.to_string());
                }
                _ => {}
            },
        }
    }
    Cow::Owned(out)
}

/// Bind a value to a MySQL query.
pub(crate) fn bind_mysql_value<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::String(v) => query.bind(v.as_str()),
    }
}

/// Bind a value to a PostgreSQL query.
pub(crate) fn bind_postgres_value<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::String(v) => query.bind(v.as_str()),
    }
}

/// Bind a value to a SQLite query.
pub(crate) fn bind_sqlite_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::String(v) => query.bind(v.as_str()),
    }
}

/// Render arguments for the `SQL:` log line.
pub(crate) fn format_args_for_log(args: &[Value]) -> String {
    let parts: Vec<String> = args
        .iter()
        .map(|v| match v {
            Value::String(s) => format!("'{}'", s),
            other => other.to_string(),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}
