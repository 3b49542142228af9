//! Application models: users, blogs and comments.

use crate::db::Value;
use crate::error::OrmResult;
use crate::orm::{Field, Model, ModelSchema};
use chrono::Utc;
use uuid::Uuid;

/// 50-character primary key: zero-padded millisecond timestamp, a random
/// UUID in hex, and a `000` suffix. Ids sort by creation time.
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Current time as fractional Unix seconds.
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn id_default() -> Value {
    Value::String(next_id())
}

fn created_at_default() -> Value {
    Value::Float(now_timestamp())
}

fn id_field() -> Field {
    Field::string()
        .column_type("varchar(50)")
        .primary_key()
        .default_factory(id_default)
}

fn varchar(len: u32) -> Field {
    Field::string().column_type(format!("varchar({})", len))
}

fn created_at_field() -> Field {
    Field::float().default_factory(created_at_default)
}

/// The registered application models.
#[derive(Debug, Clone)]
pub struct Models {
    pub user: Model,
    pub blog: Model,
    pub comment: Model,
}

impl Models {
    /// Build every schema. Any definition error aborts registration.
    pub fn register() -> OrmResult<Self> {
        Ok(Self {
            user: Model::new(user_schema()?),
            blog: Model::new(blog_schema()?),
            comment: Model::new(comment_schema()?),
        })
    }

    pub fn all(&self) -> [&Model; 3] {
        [&self.user, &self.blog, &self.comment]
    }
}

pub fn user_schema() -> OrmResult<ModelSchema> {
    ModelSchema::builder("User")
        .table("users")
        .field("id", id_field())
        .field("email", varchar(50))
        .field("passwd", varchar(50))
        .field("admin", Field::boolean())
        .field("name", varchar(50))
        .field("image", varchar(500))
        .field("created_at", created_at_field())
        .build()
}

pub fn blog_schema() -> OrmResult<ModelSchema> {
    ModelSchema::builder("Blog")
        .table("blogs")
        .field("id", id_field())
        .field("user_id", varchar(50))
        .field("user_name", varchar(50))
        .field("user_image", varchar(500))
        .field("name", varchar(50))
        .field("summary", varchar(200))
        .field("content", Field::text())
        .field("created_at", created_at_field())
        .build()
}

pub fn comment_schema() -> OrmResult<ModelSchema> {
    ModelSchema::builder("Comment")
        .table("comments")
        .field("id", id_field())
        .field("blog_id", varchar(50))
        .field("user_id", varchar(50))
        .field("user_name", varchar(50))
        .field("user_image", varchar(500))
        .field("content", Field::text())
        .field("created_at", created_at_field())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_shape() {
        let id = next_id();
        assert_eq!(id.len(), 50);
        assert!(id.ends_with("000"));
        assert!(id[..15].chars().all(|c| c.is_ascii_digit()));
        assert!(id[15..47].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(next_id(), id);
    }

    #[test]
    fn test_now_timestamp_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_timestamp() > 1_577_836_800.0);
    }

    #[test]
    fn test_register_all_models() {
        let models = Models::register().unwrap();
        assert_eq!(models.user.schema().table(), "users");
        assert_eq!(models.blog.schema().table(), "blogs");
        assert_eq!(models.comment.schema().table(), "comments");
        for model in models.all() {
            assert_eq!(model.schema().primary_key(), "id");
        }
    }

    #[test]
    fn test_user_templates() {
        let schema = user_schema().unwrap();
        assert_eq!(
            schema.select_sql(),
            "select id, email, passwd, admin, name, image, created_at from users"
        );
        assert_eq!(
            schema.insert_sql(),
            "insert into users (email, passwd, admin, name, image, created_at, id) \
             values (?, ?, ?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn test_defaults_fill_id_and_created_at() {
        let models = Models::register().unwrap();
        let mut blog = models.blog.create();
        let id = blog.value_or_default("id").unwrap();
        assert_eq!(id.as_str().map(str::len), Some(50));
        assert!(blog.value_or_default("created_at").unwrap().as_f64().is_some());
    }
}
