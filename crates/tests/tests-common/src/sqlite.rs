//! Throwaway SQLite databases.

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;

/// A database file living in its own temporary directory, removed on drop.
pub struct SqliteDatabase {
    pub url: String,
    _directory: tempfile::TempDir,
}

/// Create a database with a single table `t(id)` holding the ids `0..rows`.
pub async fn create_database(rows: i64) -> anyhow::Result<SqliteDatabase> {
    let directory = tempfile::tempdir()?;
    let path = directory.path().join("perfinder.db");

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let mut connection = SqliteConnection::connect_with(&options).await?;
    sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
        .execute(&mut connection)
        .await?;
    for id in 0..rows {
        sqlx::query("INSERT INTO t (id) VALUES (?)")
            .bind(id)
            .execute(&mut connection)
            .await?;
    }
    connection.close().await?;

    Ok(SqliteDatabase {
        url: format!("sqlite://{}", path.display()),
        _directory: directory,
    })
}
