//! Field descriptors: one column's mapping to a model attribute.

use crate::db::Value;
use std::fmt;

/// Default applied by `save` when an attribute has no value yet.
#[derive(Debug, Clone)]
pub enum ColumnDefault {
    None,
    Value(Value),
    /// Zero-argument factory, called once per save.
    Factory(fn() -> Value),
}

impl ColumnDefault {
    /// Resolve to a concrete value, calling the factory if there is one.
    pub fn resolve(&self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Value(v) => Some(v.clone()),
            Self::Factory(f) => Some(f()),
        }
    }
}

/// Descriptor flavor. Only affects `Display` and the constructor defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    String,
    Float,
    Boolean,
    Text,
    Custom,
}

impl FieldKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Integer => "IntegerField",
            Self::String => "StringField",
            Self::Float => "FloatField",
            Self::Boolean => "BooleanField",
            Self::Text => "TextField",
            Self::Custom => "Field",
        }
    }
}

/// Column metadata for one model attribute.
///
/// Built once at model registration and never mutated afterwards; the
/// modifier methods consume the descriptor and return a new one.
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    name: Option<String>,
    column_type: String,
    primary_key: bool,
    default: ColumnDefault,
}

impl Field {
    pub fn new(
        name: Option<&str>,
        column_type: impl Into<String>,
        primary_key: bool,
        default: ColumnDefault,
    ) -> Self {
        Self {
            kind: FieldKind::Custom,
            name: name.map(String::from),
            column_type: column_type.into(),
            primary_key,
            default,
        }
    }

    /// `bigint`, default `0`.
    pub fn integer() -> Self {
        Self::of_kind(FieldKind::Integer, "bigint", ColumnDefault::Value(Value::Int(0)))
    }

    /// `varchar(100)`, no default.
    pub fn string() -> Self {
        Self::of_kind(FieldKind::String, "varchar(100)", ColumnDefault::None)
    }

    /// `real`, default `0.0`.
    pub fn float() -> Self {
        Self::of_kind(FieldKind::Float, "real", ColumnDefault::Value(Value::Float(0.0)))
    }

    /// `boolean`, default `false`.
    pub fn boolean() -> Self {
        Self::of_kind(
            FieldKind::Boolean,
            "boolean",
            ColumnDefault::Value(Value::Bool(false)),
        )
    }

    /// `text`, no default.
    pub fn text() -> Self {
        Self::of_kind(FieldKind::Text, "text", ColumnDefault::None)
    }

    fn of_kind(kind: FieldKind, column_type: &str, default: ColumnDefault) -> Self {
        Self {
            kind,
            name: None,
            column_type: column_type.to_string(),
            primary_key: false,
            default,
        }
    }

    /// Use an explicit column name instead of the attribute name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn column_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = ColumnDefault::Value(value.into());
        self
    }

    pub fn default_factory(mut self, factory: fn() -> Value) -> Self {
        self.default = ColumnDefault::Factory(factory);
        self
    }

    pub fn no_default(mut self) -> Self {
        self.default = ColumnDefault::None;
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn sql_type(&self) -> &str {
        &self.column_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn column_default(&self) -> &ColumnDefault {
        &self.default
    }

    pub fn resolve_default(&self) -> Option<Value> {
        self.default.resolve()
    }

    /// Column name for `attr`: the explicit name if any, else the attribute.
    pub fn column_name<'a>(&'a self, attr: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(attr)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}, {}: {}>",
            self.kind.label(),
            self.column_type,
            self.name.as_deref().unwrap_or("-")
        )
    }
}
