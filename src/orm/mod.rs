//! Declarative object-relational mapping.
//!
//! - [`field`]: column descriptors
//! - [`schema`]: model registration and SQL template synthesis
//! - [`query`]: `find_all` clause composition
//! - [`model`]: lookups and record persistence

pub mod field;
pub mod model;
pub mod query;
pub mod schema;

pub use field::{ColumnDefault, Field, FieldKind};
pub use model::{Model, Record, RecordState};
pub use query::{FindAll, Limit};
pub use schema::{ModelSchema, SchemaBuilder};
