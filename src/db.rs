//! Global connection pool and schema bootstrap.

use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

static SCHEMA_SQL: &str = include_str!("../migrations/0001_servicedesk.sql");

/// Returns the global pool. Panics if `init_db` has not run.
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL
        .get()
        .expect("Database pool accessed before init_db was called.")
}

/// Connect and install the global pool. Later calls are ignored.
pub async fn init_db(database_url: String) {
    if DB_POOL.get().is_some() {
        return;
    }

    let pool = Database::connect(&database_url)
        .await
        .expect("Failed to connect to the database.");

    if DB_POOL.set(pool).is_err() {
        log::debug!("Database pool was initialized concurrently; keeping the first one");
    }
}

/// Split the bundled schema into executable statements.
fn schema_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .map(|stmt| stmt.trim().to_owned())
        .filter(|stmt| !stmt.is_empty())
        .collect()
}

/// Create every table and index the desk needs. Safe to run repeatedly.
pub async fn apply_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let statements = schema_statements(SCHEMA_SQL);

    for stmt in &statements {
        db.execute(Statement::from_string(backend, stmt.clone()))
            .await?;
    }

    log::info!("Schema applied ({} statements)", statements.len());
    Ok(())
}
