//! Model handles and records.
//!
//! [`Model`] carries the class-level lookups (`find`, `find_all`,
//! `find_number`); [`Record`] is one in-memory row with the instance-level
//! mutations (`save`, `update`, `remove`). Both talk to the database only
//! through the [`Database`] passed in by the caller.

use crate::db::{Database, Row, Value};
use crate::error::{OrmError, OrmResult};
use crate::orm::query::FindAll;
use crate::orm::schema::ModelSchema;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Column alias used by `find_number`.
const NUMBER_ALIAS: &str = "_num_";

/// Cheap, clonable handle to a registered model.
#[derive(Debug, Clone)]
pub struct Model {
    schema: Arc<ModelSchema>,
}

impl Model {
    pub fn new(schema: ModelSchema) -> Self {
        Self {
            schema: Arc::new(schema),
        }
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Empty, unsaved record.
    pub fn create(&self) -> Record {
        Record {
            schema: Arc::clone(&self.schema),
            values: HashMap::new(),
            state: RecordState::New,
        }
    }

    /// Unsaved record populated from attribute/value pairs.
    ///
    /// Fails with `AttributeNotFound` on the first attribute the model does
    /// not declare.
    pub fn record<I, K, V>(&self, values: I) -> OrmResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = self.create();
        for (attr, value) in values {
            let attr = attr.into();
            record.set(&attr, value)?;
        }
        Ok(record)
    }

    /// Record for a row read from storage. Columns the model does not map
    /// are ignored; SQL NULL reads back as an unset attribute.
    pub fn from_row(&self, row: &Row) -> Record {
        let mut record = self.create();
        for (attr, field) in self.schema.mappings() {
            if let Some(value) = row.get(field.column_name(attr)) {
                if !value.is_null() {
                    record.values.insert(attr.clone(), value.clone());
                }
            }
        }
        record.state = RecordState::Persisted;
        record
    }

    /// Look up one record by primary key.
    pub async fn find(&self, db: &Database, pk: impl Into<Value>) -> OrmResult<Option<Record>> {
        let sql = format!(
            "{} where {} = ?",
            self.schema.select_sql(),
            self.schema.primary_key_column()
        );
        let rows = db.select(&sql, &[pk.into()], Some(1)).await?;
        Ok(rows.first().map(|row| self.from_row(row)))
    }

    /// All records matching `query`, in the order the database returns them.
    pub async fn find_all(&self, db: &Database, query: &FindAll) -> OrmResult<Vec<Record>> {
        let (sql, args) = query.build(self.schema.select_sql(), db.db_type());
        let rows = db.select(&sql, &args, None).await?;
        Ok(rows.iter().map(|row| self.from_row(row)).collect())
    }

    /// Single-row aggregate such as `count(id)`.
    ///
    /// Returns `None` when the query produces no row.
    pub async fn find_number(
        &self,
        db: &Database,
        expr: &str,
        filter: Option<&str>,
        args: &[Value],
    ) -> OrmResult<Option<Value>> {
        let mut sql = format!("select {} {} from {}", expr, NUMBER_ALIAS, self.schema.table());
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            sql.push_str(" where ");
            sql.push_str(filter);
        }
        let rows = db.select(&sql, args, Some(1)).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|mut row| row.remove(NUMBER_ALIAS)))
    }
}

/// Where a record stands relative to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Built in memory, never inserted.
    New,
    /// Inserted by `save` or loaded by a lookup.
    Persisted,
    /// Removed from storage by `remove`.
    Deleted,
}

/// One model instance: attribute values plus the schema they belong to.
///
/// The in-memory values are not re-synchronized with storage after a
/// mutation.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<ModelSchema>,
    values: HashMap<String, Value>,
    state: RecordState,
}

impl Record {
    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Value of `attr`, `None` when it is mapped but unset.
    pub fn get(&self, attr: &str) -> OrmResult<Option<&Value>> {
        self.ensure_mapped(attr)?;
        Ok(self.values.get(attr))
    }

    pub fn set(&mut self, attr: &str, value: impl Into<Value>) -> OrmResult<()> {
        self.ensure_mapped(attr)?;
        self.values.insert(attr.to_string(), value.into());
        Ok(())
    }

    /// Current value of `attr`, or its default when unset or NULL.
    ///
    /// A resolved default is stored on the record so later reads agree with
    /// what was written.
    pub fn value_or_default(&mut self, attr: &str) -> OrmResult<Value> {
        let field = self
            .schema
            .field(attr)
            .ok_or_else(|| OrmError::attribute_not_found(self.schema.name(), attr))?;

        match self.values.get(attr) {
            Some(value) if !value.is_null() => Ok(value.clone()),
            _ => match field.resolve_default() {
                Some(value) => {
                    debug!("Using default value for {} : {}", attr, value);
                    self.values.insert(attr.to_string(), value.clone());
                    Ok(value)
                }
                None => Ok(Value::Null),
            },
        }
    }

    pub fn primary_key(&self) -> Option<&Value> {
        self.values.get(self.schema.primary_key())
    }

    /// Insert this record. Unset attributes take their defaults; the primary
    /// key is bound last.
    pub async fn save(&mut self, db: &Database) -> OrmResult<u64> {
        let schema = Arc::clone(&self.schema);
        let mut args = Vec::with_capacity(schema.fields().len() + 1);
        for attr in schema.fields() {
            args.push(self.value_or_default(attr)?);
        }
        args.push(self.value_or_default(schema.primary_key())?);

        let rows = db.execute(schema.insert_sql(), &args, db.autocommit()).await?;
        if rows != 1 {
            warn!(table = %schema.table(), "Failed to insert record: affected rows: {}", rows);
            return Err(OrmError::unexpected_row_count("insert", schema.table(), 1, rows));
        }
        self.state = RecordState::Persisted;
        Ok(rows)
    }

    /// Write the current values back by primary key. Defaults are not applied.
    pub async fn update(&self, db: &Database) -> OrmResult<u64> {
        self.ensure_persisted("update")?;
        let mut args: Vec<Value> = self
            .schema
            .fields()
            .iter()
            .map(|attr| self.current(attr))
            .collect();
        args.push(self.current(self.schema.primary_key()));

        let rows = db
            .execute(self.schema.update_sql(), &args, db.autocommit())
            .await?;
        if rows != 1 {
            warn!(table = %self.schema.table(), "Failed to update by primary key: affected rows: {}", rows);
            return Err(OrmError::unexpected_row_count(
                "update",
                self.schema.table(),
                1,
                rows,
            ));
        }
        Ok(rows)
    }

    /// Delete this record's row by primary key.
    pub async fn remove(&mut self, db: &Database) -> OrmResult<u64> {
        self.ensure_persisted("remove")?;
        let args = [self.current(self.schema.primary_key())];

        let rows = db
            .execute(self.schema.delete_sql(), &args, db.autocommit())
            .await?;
        self.state = RecordState::Deleted;
        if rows != 1 {
            warn!(table = %self.schema.table(), "Failed to remove by primary key: affected rows: {}", rows);
            return Err(OrmError::unexpected_row_count(
                "remove",
                self.schema.table(),
                1,
                rows,
            ));
        }
        Ok(rows)
    }

    fn current(&self, attr: &str) -> Value {
        self.values.get(attr).cloned().unwrap_or_default()
    }

    fn ensure_mapped(&self, attr: &str) -> OrmResult<()> {
        if self.schema.has_attribute(attr) {
            Ok(())
        } else {
            Err(OrmError::attribute_not_found(self.schema.name(), attr))
        }
    }

    fn ensure_persisted(&self, operation: &str) -> OrmResult<()> {
        match self.state {
            RecordState::Persisted => Ok(()),
            RecordState::New | RecordState::Deleted => {
                Err(OrmError::not_persisted(self.schema.name(), operation))
            }
        }
    }
}

/// Serializes as a map in declaration order; unset attributes become `null`.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mappings = self.schema.mappings();
        let mut map = serializer.serialize_map(Some(mappings.len()))?;
        for (attr, _) in mappings {
            map.serialize_entry(attr, self.values.get(attr).unwrap_or(&Value::Null))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::field::Field;
    use serde_json::json;

    fn fixed_id() -> Value {
        Value::from("generated")
    }

    fn user_model() -> Model {
        let schema = ModelSchema::builder("User")
            .table("users")
            .field(
                "id",
                Field::string()
                    .column_type("varchar(50)")
                    .primary_key()
                    .default_factory(fixed_id),
            )
            .field("email", Field::string().column_type("varchar(50)"))
            .field("admin", Field::boolean())
            .field("image", Field::string().named("avatar"))
            .build()
            .unwrap();
        Model::new(schema)
    }

    #[test]
    fn test_get_unknown_attribute_fails() {
        let record = user_model().create();
        let err = record.get("nope").unwrap_err();
        assert!(matches!(
            err,
            OrmError::AttributeNotFound { ref model, ref attribute } if model == "User" && attribute == "nope"
        ));
    }

    #[test]
    fn test_get_unset_attribute_is_absent() {
        let record = user_model().create();
        assert_eq!(record.get("email").unwrap(), None);
        assert_eq!(record.state(), RecordState::New);
    }

    #[test]
    fn test_record_from_pairs() {
        let model = user_model();
        let record = model.record([("email", "a@example.com")]).unwrap();
        assert_eq!(
            record.get("email").unwrap(),
            Some(&Value::from("a@example.com"))
        );

        let err = model.record([("mail", "a@example.com")]).unwrap_err();
        assert!(matches!(err, OrmError::AttributeNotFound { .. }));
    }

    #[test]
    fn test_value_or_default_stores_default() {
        let mut record = user_model().create();
        assert_eq!(record.value_or_default("admin").unwrap(), Value::Bool(false));
        assert_eq!(record.value_or_default("id").unwrap(), Value::from("generated"));
        assert_eq!(record.get("id").unwrap(), Some(&Value::from("generated")));

        // no default configured
        assert_eq!(record.value_or_default("email").unwrap(), Value::Null);
        assert_eq!(record.get("email").unwrap(), None);
    }

    #[test]
    fn test_value_or_default_keeps_set_value() {
        let mut record = user_model().create();
        record.set("admin", true).unwrap();
        record.set("id", Value::Null).unwrap();
        assert_eq!(record.value_or_default("admin").unwrap(), Value::Bool(true));
        assert_eq!(record.value_or_default("id").unwrap(), Value::from("generated"));
    }

    #[test]
    fn test_from_row_maps_columns_to_attributes() {
        let model = user_model();
        let mut row = Row::new();
        row.insert("id".into(), "u1".into());
        row.insert("email".into(), Value::Null);
        row.insert("avatar".into(), "me.png".into());
        row.insert("extra".into(), 1.into());

        let record = model.from_row(&row);
        assert_eq!(record.state(), RecordState::Persisted);
        assert_eq!(record.primary_key(), Some(&Value::from("u1")));
        assert_eq!(record.get("image").unwrap(), Some(&Value::from("me.png")));
        assert_eq!(record.get("email").unwrap(), None);
    }

    #[test]
    fn test_serialize_in_declaration_order() {
        let record = user_model()
            .record([("id", Value::from("u1")), ("admin", Value::Bool(true))])
            .unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"id":"u1","email":null,"admin":true,"image":null}"#
        );
        assert_eq!(
            serde_json::to_value(&record).unwrap()["admin"],
            json!(true)
        );
    }
}
