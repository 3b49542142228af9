//! Database backend type and dispatch macro.
//!
//! `impl_db_dispatch!` expands one match arm per `DbPool` variant so the
//! backend-specific code in the executor reads linearly.

use std::fmt;

/// Database backend type for dispatch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    /// Includes MariaDB
    MySql,
    Postgres,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySql)
        } else if lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Whether the driver understands `?` natively.
    pub fn uses_question_marks(&self) -> bool {
        !matches!(self, Self::Postgres)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Macro for generating database dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     MySql(p) => mysql::select(p, sql, args, size).await,
///     Postgres(p) => postgres::select(p, sql, args, size).await,
///     SQLite(p) => sqlite::select(p, sql, args, size).await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_connection_string() {
        assert_eq!(
            DatabaseType::from_connection_string("mysql://root@localhost/webapp"),
            Some(DatabaseType::MySql)
        );
        assert_eq!(
            DatabaseType::from_connection_string("postgresql://host/db"),
            Some(DatabaseType::Postgres)
        );
        assert_eq!(
            DatabaseType::from_connection_string("sqlite:./data.db?mode=rwc"),
            Some(DatabaseType::SQLite)
        );
        assert_eq!(DatabaseType::from_connection_string("redis://host"), None);
    }

    #[test]
    fn test_placeholder_style() {
        assert!(DatabaseType::MySql.uses_question_marks());
        assert!(DatabaseType::SQLite.uses_question_marks());
        assert!(!DatabaseType::Postgres.uses_question_marks());
    }
}
