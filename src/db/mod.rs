//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management (the [`Database`] context object)
//! - Parameterized select/execute primitives
//! - Value binding and `?` placeholder translation
//! - Row decoding
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod executor;
pub mod params;
pub mod pool;
pub mod types;
pub mod value;

pub use macros::DatabaseType;
pub use pool::{Database, DbPool};
pub use value::{Row, Value};
