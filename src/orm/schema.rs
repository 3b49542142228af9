//! Model schema registration and SQL template synthesis.
//!
//! A [`ModelSchema`] is built once per model at startup from an explicit list
//! of field declarations. Building validates the primary key and derives the
//! select/insert/update/delete templates used by every record operation.
//!
//! Identifiers are interpolated verbatim: table and column names come from
//! the schema author, never from user input. Values are always `?`.

use crate::error::{OrmError, OrmResult};
use crate::orm::field::Field;
use tracing::info;

/// Derived SQL and column bookkeeping for one model.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: String,
    table: String,
    mappings: Vec<(String, Field)>,
    primary_key: String,
    fields: Vec<String>,
    select_sql: String,
    insert_sql: String,
    update_sql: String,
    delete_sql: String,
}

impl ModelSchema {
    /// Start declaring a model. The table name defaults to `name`.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            table: None,
            mappings: Vec::new(),
        }
    }

    /// Model name (used in error messages and logs).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Attribute name of the primary key.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Non-key attribute names, in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// All declared attributes with their descriptors, in declaration order.
    pub fn mappings(&self) -> &[(String, Field)] {
        &self.mappings
    }

    pub fn field(&self, attr: &str) -> Option<&Field> {
        self.mappings
            .iter()
            .find(|(name, _)| name == attr)
            .map(|(_, field)| field)
    }

    pub fn has_attribute(&self, attr: &str) -> bool {
        self.field(attr).is_some()
    }

    /// Column name of `attr`, honouring an explicit field name.
    pub fn column_of<'a>(&'a self, attr: &'a str) -> &'a str {
        self.field(attr)
            .map(|f| f.column_name(attr))
            .unwrap_or(attr)
    }

    pub fn primary_key_column(&self) -> &str {
        self.column_of(&self.primary_key)
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }

    /// `create table if not exists` DDL built from the declared column types.
    pub fn create_table_sql(&self) -> String {
        let mut columns: Vec<String> = self
            .mappings
            .iter()
            .map(|(attr, field)| {
                let not_null = if field.is_primary_key() { " not null" } else { "" };
                format!("{} {}{}", field.column_name(attr), field.sql_type(), not_null)
            })
            .collect();
        columns.push(format!("primary key ({})", self.primary_key_column()));
        format!(
            "create table if not exists {} ({})",
            self.table,
            columns.join(", ")
        )
    }
}

/// Collects field declarations for one model; see [`ModelSchema::builder`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    table: Option<String>,
    mappings: Vec<(String, Field)>,
}

impl SchemaBuilder {
    /// Override the table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Declare an attribute. Declaration order is column order.
    pub fn field(mut self, attr: impl Into<String>, field: Field) -> Self {
        self.mappings.push((attr.into(), field));
        self
    }

    /// Validate the declarations and synthesize the SQL templates.
    pub fn build(self) -> OrmResult<ModelSchema> {
        let table = self.table.unwrap_or_else(|| self.name.clone());
        info!(model = %self.name, table = %table, "Found model: {} (table: {})", self.name, table);

        let mut primary_key: Option<String> = None;
        let mut fields = Vec::new();
        for (i, (attr, field)) in self.mappings.iter().enumerate() {
            if self.mappings[..i].iter().any(|(seen, _)| seen == attr) {
                return Err(OrmError::duplicate_field(&self.name, attr));
            }
            info!(model = %self.name, "Found mapping: {} ==> {}", attr, field);
            if field.is_primary_key() {
                if primary_key.is_some() {
                    return Err(OrmError::duplicate_primary_key(&self.name, attr));
                }
                primary_key = Some(attr.clone());
            } else {
                fields.push(attr.clone());
            }
        }
        let primary_key = primary_key.ok_or_else(|| OrmError::missing_primary_key(&self.name))?;

        let column = |attr: &str| -> String {
            self.mappings
                .iter()
                .find(|(name, _)| name == attr)
                .map(|(_, f)| f.column_name(attr).to_string())
                .unwrap_or_else(|| attr.to_string())
        };
        let pk_column = column(&primary_key);
        let columns: Vec<String> = fields.iter().map(|f| column(f)).collect();

        let select_sql = if columns.is_empty() {
            format!("select {} from {}", pk_column, table)
        } else {
            format!("select {}, {} from {}", pk_column, columns.join(", "), table)
        };

        let insert_columns: Vec<&str> = columns
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(pk_column.as_str()))
            .collect();
        let insert_sql = format!(
            "insert into {} ({}) values ({})",
            table,
            insert_columns.join(", "),
            placeholders(insert_columns.len())
        );

        let assignments = if columns.is_empty() {
            format!("{}={}", pk_column, pk_column)
        } else {
            columns
                .iter()
                .map(|c| format!("{}=?", c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let update_sql = format!("update {} set {} where {}=?", table, assignments, pk_column);
        let delete_sql = format!("delete from {} where {}=?", table, pk_column);

        Ok(ModelSchema {
            name: self.name,
            table,
            mappings: self.mappings,
            primary_key,
            fields,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        })
    }
}

/// `?, ?, ?` with `n` markers.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
