//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment variable.
/// Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// One-time schema initialization.
static SCHEMA_INIT: Once = Once::new();

/// Ensure the test database schema is set up (runs migrations once per test suite).
pub fn ensure_schema() {
    SCHEMA_INIT.call_once(|| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let pool = sqlx::PgPool::connect(&test_db_url()).await.unwrap();
            run_migrations(&pool).await;
        });
    });
}

/// Connect to the test database (also ensures schema is set up).
pub async fn setup_test_db() -> welcomehome::db::Database {
    ensure_schema();
    let db = welcomehome::db::Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    truncate_all_tables(db.pool()).await;
    db
}

/// Build an Axum test app router connected to the test database.
pub async fn build_test_app() -> axum::Router {
    let db = setup_test_db().await;
    let state = welcomehome::server::AppState::with_db(db, "test-secret");
    welcomehome::server::build_router(state)
}

/// Truncate all data tables to ensure test isolation. Reference data (roles,
/// categories, locations) is left in place; person truncation cascades into
/// phones and role assignments.
pub async fn truncate_all_tables(pool: &sqlx::PgPool) {
    sqlx::raw_sql(
        "TRUNCATE TABLE delivered, item_in, ordered, donated_by, piece, item,
                        act, person_phone, person
         CASCADE",
    )
    .execute(pool)
    .await
    .unwrap();
}

/// Run all migrations against the test database.
async fn run_migrations(pool: &sqlx::PgPool) {
    let migration_files = ["migrations/001_schema.sql", "migrations/002_seed.sql"];

    for file in &migration_files {
        let path = std::path::Path::new(file);
        if !path.exists() {
            panic!("Migration file not found: {}", file);
        }
        let sql = std::fs::read_to_string(path).unwrap();
        sqlx::raw_sql(&sql).execute(pool).await.unwrap_or_else(|e| {
            panic!("Migration {} failed: {}", file, e);
        });
    }
}

/// Register an account directly through the storage layer and return the
/// username. Password is hashed for real so login flows work against it.
pub async fn register_account(
    db: &welcomehome::db::Database,
    username: &str,
    password: &str,
    roles: &[&str],
) {
    let hashed = welcomehome::auth::hash_password(password).unwrap();
    let role_set = welcomehome::roles::RoleSet::from_names(roles.iter().copied()).unwrap();
    let person = welcomehome::db::NewPerson {
        username,
        password: &hashed,
        fname: "Test",
        lname: username,
        email: "test@example.org",
        phones: &[],
        roles: &role_set,
    };
    db.register_person(&person).await.unwrap();
}
