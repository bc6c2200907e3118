use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use dotenv::dotenv;
use std::env;

use crate::app::DbPool;

/// Applied to every pooled connection. Writers wait for the lock instead of
/// failing, and referential integrity is on.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Return a connection pool to the database.
/// With no explicit url the `DATABASE_URL` environment variable is used,
/// falling back to a local `inkpost.db` file.
///
/// # Example
/// ```
/// let pool = connect_to_db(None);
/// ```
pub fn connect_to_db(database_url: Option<&str>) -> DbPool {
    dotenv().ok();

    let url = match database_url {
        Some(url) => url.to_string(),
        None => env::var("DATABASE_URL").unwrap_or_else(|_| String::from("inkpost.db")),
    };

    let manager = ConnectionManager::<SqliteConnection>::new(&url);
    Pool::builder()
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .unwrap_or_else(|err| panic!("Error connecting to {}: {}", url, err))
}

/// Creates the schema if it is not there yet. Runs on every startup, so
/// every statement must be a no-op against an already prepared database.
pub fn init_schema(pool: &DbPool) {
    let mut conn = pool.get().expect("No database connection for schema setup");

    conn.batch_execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            profile_image TEXT
        );
        CREATE TABLE IF NOT EXISTS blogs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            image TEXT,
            created_by INTEGER NOT NULL REFERENCES users (id),
            created_at TIMESTAMP NOT NULL,
            views INTEGER NOT NULL DEFAULT 0,
            likes INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            body TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users (id),
            blog_id INTEGER NOT NULL REFERENCES blogs (id)
        );",
    )
    .expect("Error preparing database schema");
}
