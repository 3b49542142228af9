//! `find_all` clause composition.

use crate::db::{DatabaseType, Value};
use crate::error::{OrmError, OrmResult};
use serde_json::Value as JsonValue;

/// Row cap for `find_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// `limit ?`
    Count(u64),
    /// `limit ?, ?` as (offset, count)
    Range(u64, u64),
}

impl Limit {
    fn bound(n: u64) -> Value {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }

    /// Clause text and bindings for `db_type`.
    ///
    /// PostgreSQL has no `limit offset, count` form, so a range is rendered
    /// as `limit ? offset ?` with the bindings swapped.
    pub fn clause(&self, db_type: DatabaseType) -> (&'static str, Vec<Value>) {
        match (*self, db_type) {
            (Self::Count(n), _) => ("limit ?", vec![Self::bound(n)]),
            (Self::Range(offset, count), DatabaseType::Postgres) => (
                "limit ? offset ?",
                vec![Self::bound(count), Self::bound(offset)],
            ),
            (Self::Range(offset, count), _) => {
                ("limit ?, ?", vec![Self::bound(offset), Self::bound(count)])
            }
        }
    }
}

impl From<u64> for Limit {
    fn from(n: u64) -> Self {
        Self::Count(n)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self {
        Self::Range(offset, count)
    }
}

/// Accepts a non-negative integer or a two-element array of them.
impl TryFrom<&JsonValue> for Limit {
    type Error = OrmError;

    fn try_from(value: &JsonValue) -> OrmResult<Self> {
        let invalid = || OrmError::invalid_argument(format!("Invalid limit value: {}", value));
        match value {
            JsonValue::Number(n) => n.as_u64().map(Self::Count).ok_or_else(invalid),
            JsonValue::Array(items) if items.len() == 2 => {
                match (items[0].as_u64(), items[1].as_u64()) {
                    (Some(offset), Some(count)) => Ok(Self::Range(offset, count)),
                    _ => Err(invalid()),
                }
            }
            _ => Err(invalid()),
        }
    }
}

/// Optional filter, ordering and limit for `Model::find_all`.
///
/// The filter and ordering are raw SQL fragments supplied by the caller;
/// filter values go through `args` as `?` bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindAll {
    filter: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl FindAll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, clause: impl Into<String>, args: Vec<Value>) -> Self {
        self.filter = Some(clause.into());
        self.args = args;
        self
    }

    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Compose the statement on top of a model's select template.
    pub fn build(&self, select_sql: &str, db_type: DatabaseType) -> (String, Vec<Value>) {
        let mut sql = vec![select_sql.to_string()];
        let mut args = self.args.clone();

        if let Some(filter) = self.filter.as_deref().filter(|f| !f.is_empty()) {
            sql.push("where".to_string());
            sql.push(filter.to_string());
        }
        if let Some(order_by) = self.order_by.as_deref().filter(|o| !o.is_empty()) {
            sql.push("order by".to_string());
            sql.push(order_by.to_string());
        }
        if let Some(limit) = self.limit {
            let (clause, bindings) = limit.clause(db_type);
            sql.push(clause.to_string());
            args.extend(bindings);
        }

        (sql.join(" "), args)
    }
}
