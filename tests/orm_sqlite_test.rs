//! Integration tests for model persistence against a SQLite file.
//!
//! Tests verify that:
//! - save/find round-trips values and fills defaults
//! - update and remove touch exactly one row
//! - find_all composes filter, ordering and limit
//! - find_number returns the aggregate scalar
//! - row-count mismatches and lifecycle misuse surface as typed errors
//! - a failed write inside a transaction leaves no partial changes

use awesome_webapp::config::DatabaseOptions;
use awesome_webapp::db::{Database, Value};
use awesome_webapp::error::OrmError;
use awesome_webapp::models::Models;
use awesome_webapp::orm::{FindAll, Limit, Record, RecordState};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tempfile::TempDir;

fn random_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(char::from)
        .collect()
}

fn random_email() -> String {
    let qq: u32 = rand::thread_rng().gen_range(100_000_000..999_999_999);
    format!("{}@qq.com", qq)
}

/// Create a SQLite database file with the application tables.
async fn setup_db(autocommit: bool) -> (TempDir, Database, Models) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}", dir.path().join("webapp.db").display());
    let options = DatabaseOptions::from_url(url)
        .with_pool_size(1, 2)
        .with_autocommit(autocommit);
    let db = Database::connect(&options).await.unwrap();

    let models = Models::register().unwrap();
    for model in models.all() {
        db.execute(&model.schema().create_table_sql(), &[], true)
            .await
            .unwrap();
    }
    (dir, db, models)
}

fn new_user(models: &Models, name: &str) -> Record {
    models
        .user
        .record([
            ("name", Value::from(name)),
            ("email", Value::from(random_email())),
            ("passwd", Value::from("")),
            ("image", Value::from("about:blank")),
        ])
        .unwrap()
}

// =========================================================================
// save / find
// =========================================================================

#[tokio::test]
async fn test_save_then_find_round_trip() {
    let (_dir, db, models) = setup_db(true).await;
    let name = random_name();
    let mut user = new_user(&models, &name);

    let rows = user.save(&db).await.unwrap();
    assert_eq!(rows, 1);
    assert_eq!(user.state(), RecordState::Persisted);

    // default factory produced a 50-char id and stored it on the record
    let id = user.primary_key().cloned().unwrap();
    assert_eq!(id.as_str().map(str::len), Some(50));

    let found = models.user.find(&db, id.clone()).await.unwrap().unwrap();
    assert_eq!(found.state(), RecordState::Persisted);
    assert_eq!(found.get("id").unwrap(), Some(&id));
    assert_eq!(found.get("name").unwrap(), Some(&Value::from(name)));
    assert_eq!(found.get("email").unwrap(), user.get("email").unwrap());
    assert_eq!(
        found.get("admin").unwrap().and_then(Value::as_bool),
        Some(false)
    );
    assert!(found.get("created_at").unwrap().and_then(Value::as_f64).is_some());
}

#[tokio::test]
async fn test_find_missing_returns_none() {
    let (_dir, db, models) = setup_db(true).await;
    let found = models.user.find(&db, "does-not-exist").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_save_twice_is_duplicate_key_failure() {
    let (_dir, db, models) = setup_db(true).await;
    let mut user = new_user(&models, "twice");
    user.save(&db).await.unwrap();

    let err = user.save(&db).await.unwrap_err();
    assert!(matches!(err, OrmError::Database { .. }), "{err}");
}

// =========================================================================
// update / remove
// =========================================================================

#[tokio::test]
async fn test_update_changed_value() {
    let (_dir, db, models) = setup_db(true).await;
    let mut user = new_user(&models, "upd");
    user.save(&db).await.unwrap();
    let id = user.primary_key().cloned().unwrap();

    let mut loaded = models.user.find(&db, id.clone()).await.unwrap().unwrap();
    loaded.set("passwd", "123").unwrap();
    assert_eq!(loaded.update(&db).await.unwrap(), 1);

    let reloaded = models.user.find(&db, id).await.unwrap().unwrap();
    assert_eq!(reloaded.get("passwd").unwrap(), Some(&Value::from("123")));
}

#[tokio::test]
async fn test_remove_then_find_none() {
    let (_dir, db, models) = setup_db(true).await;
    let mut user = new_user(&models, "gone");
    user.save(&db).await.unwrap();
    let id = user.primary_key().cloned().unwrap();

    let mut loaded = models.user.find(&db, id.clone()).await.unwrap().unwrap();
    assert_eq!(loaded.remove(&db).await.unwrap(), 1);
    assert_eq!(loaded.state(), RecordState::Deleted);
    assert!(models.user.find(&db, id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_missing_row_reports_row_count() {
    let (_dir, db, models) = setup_db(true).await;
    let mut user = new_user(&models, "vanish");
    user.save(&db).await.unwrap();
    let id = user.primary_key().cloned().unwrap();

    db.execute("delete from users where id=?", &[id], true)
        .await
        .unwrap();

    let err = user.update(&db).await.unwrap_err();
    assert!(err.is_row_count_mismatch());
    assert!(matches!(
        err,
        OrmError::UnexpectedRowCount { expected: 1, actual: 0, .. }
    ));

    let err = user.remove(&db).await.unwrap_err();
    assert!(err.is_row_count_mismatch());
}

#[tokio::test]
async fn test_lifecycle_guards() {
    let (_dir, db, models) = setup_db(true).await;
    let mut user = new_user(&models, "guard");

    let err = user.update(&db).await.unwrap_err();
    assert!(matches!(err, OrmError::NotPersisted { ref operation, .. } if operation == "update"));
    let err = user.remove(&db).await.unwrap_err();
    assert!(matches!(err, OrmError::NotPersisted { ref operation, .. } if operation == "remove"));

    user.save(&db).await.unwrap();
    user.remove(&db).await.unwrap();
    let err = user.remove(&db).await.unwrap_err();
    assert!(matches!(err, OrmError::NotPersisted { .. }));
}

#[tokio::test]
async fn test_unknown_attribute_is_lookup_failure() {
    let (_dir, _db, models) = setup_db(true).await;
    let mut user = models.user.create();
    assert!(matches!(
        user.get("nickname"),
        Err(OrmError::AttributeNotFound { .. })
    ));
    assert!(matches!(
        user.set("nickname", "x"),
        Err(OrmError::AttributeNotFound { .. })
    ));
}

// =========================================================================
// find_all / find_number
// =========================================================================

async fn seed_blogs(db: &Database, models: &Models, user_id: &str, count: i64) {
    for i in 0..count {
        let mut blog = models
            .blog
            .record([
                ("user_id", Value::from(user_id)),
                ("user_name", Value::from("author")),
                ("user_image", Value::from("")),
                ("name", Value::from(format!("post-{}", i))),
                ("summary", Value::from("")),
                ("content", Value::from("body")),
                ("created_at", Value::Float(1000.0 + i as f64)),
            ])
            .unwrap();
        blog.save(db).await.unwrap();
    }
}

#[tokio::test]
async fn test_find_all_filter_order_limit() {
    let (_dir, db, models) = setup_db(true).await;
    seed_blogs(&db, &models, "u1", 4).await;
    seed_blogs(&db, &models, "u2", 2).await;

    let all = models.blog.find_all(&db, &FindAll::new()).await.unwrap();
    assert_eq!(all.len(), 6);

    let query = FindAll::new()
        .filter("user_id=?", vec!["u1".into()])
        .order_by("created_at desc")
        .limit(Limit::Count(3));
    let blogs = models.blog.find_all(&db, &query).await.unwrap();
    let names: Vec<_> = blogs
        .iter()
        .map(|b| b.get("name").unwrap().cloned().unwrap())
        .collect();
    let expected: Vec<Value> = vec!["post-3".into(), "post-2".into(), "post-1".into()];
    assert_eq!(names, expected);

    let page = FindAll::new()
        .filter("user_id=?", vec!["u1".into()])
        .order_by("created_at")
        .limit(Limit::Range(1, 2));
    let blogs = models.blog.find_all(&db, &page).await.unwrap();
    assert_eq!(blogs.len(), 2);
    assert_eq!(blogs[0].get("name").unwrap(), Some(&Value::from("post-1")));
    assert!(blogs.iter().all(|b| b.state() == RecordState::Persisted));
}

#[tokio::test]
async fn test_find_number_counts() {
    let (_dir, db, models) = setup_db(true).await;
    seed_blogs(&db, &models, "u1", 3).await;
    seed_blogs(&db, &models, "u2", 1).await;

    let total = models
        .blog
        .find_number(&db, "count(id)", None, &[])
        .await
        .unwrap();
    assert_eq!(total.and_then(|v| v.as_i64()), Some(4));

    let filtered = models
        .blog
        .find_number(&db, "count(id)", Some("user_id=?"), &["u1".into()])
        .await
        .unwrap();
    assert_eq!(filtered.and_then(|v| v.as_i64()), Some(3));
}

// =========================================================================
// explicit transactions
// =========================================================================

#[tokio::test]
async fn test_non_autocommit_writes_commit() {
    let (_dir, db, models) = setup_db(false).await;
    assert!(!db.autocommit());

    let mut user = new_user(&models, "tx");
    assert_eq!(user.save(&db).await.unwrap(), 1);
    let id = user.primary_key().cloned().unwrap();
    assert!(models.user.find(&db, id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_non_autocommit_failure_rolls_back() {
    let (_dir, db, models) = setup_db(false).await;
    let mut user = new_user(&models, "first");
    user.save(&db).await.unwrap();
    let id = user.primary_key().cloned().unwrap();

    let mut clash = new_user(&models, "second");
    clash.set("id", id).unwrap();
    let err = clash.save(&db).await.unwrap_err();
    assert!(matches!(err, OrmError::Database { .. }), "{err}");
    assert_eq!(clash.state(), RecordState::New);

    let count = models
        .user
        .find_number(&db, "count(id)", None, &[])
        .await
        .unwrap();
    assert_eq!(count.and_then(|v| v.as_i64()), Some(1));

    // connection went back to the pool in a usable state
    let rows = db
        .select("select name from users", &[], None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], Value::from("first"));
}

/// `update or fail` keeps the rows it already changed when a later row
/// violates a constraint, so only a rollback can undo them.
async fn partial_update_rows(autocommit: bool) -> Vec<Value> {
    let (_dir, db, _models) = setup_db(true).await;
    db.execute(
        "create table t (id integer not null, v varchar(10) unique, primary key (id))",
        &[],
        true,
    )
    .await
    .unwrap();
    for (id, v) in [(1, "v1"), (2, "v2"), (3, "v3")] {
        db.execute("insert into t (v, id) values (?, ?)", &[v.into(), id.into()], true)
            .await
            .unwrap();
    }

    let err = db
        .execute("update or fail t set v = 'z'", &[], autocommit)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Database { .. }), "{err}");

    db.select("select v from t order by id", &[], None)
        .await
        .unwrap()
        .into_iter()
        .map(|mut row| row.remove("v").unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_failed_statement_in_transaction_is_rolled_back() {
    let expected: Vec<Value> = vec!["v1".into(), "v2".into(), "v3".into()];
    assert_eq!(partial_update_rows(false).await, expected);
}

#[tokio::test]
async fn test_failed_statement_without_transaction_keeps_partial_write() {
    let expected: Vec<Value> = vec!["z".into(), "v2".into(), "v3".into()];
    assert_eq!(partial_update_rows(true).await, expected);
}
