//! Awesome Webapp Library
//!
//! A minimal web backend: a static HTTP front end plus a small declarative
//! ORM that turns model definitions into parameterized SQL and runs it over
//! pooled connections (MySQL, PostgreSQL, SQLite).

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod orm;
pub mod server;

pub use config::{Config, DatabaseOptions};
pub use db::{Database, Value};
pub use error::{OrmError, OrmResult};
pub use orm::{Field, FindAll, Limit, Model, ModelSchema, Record};
