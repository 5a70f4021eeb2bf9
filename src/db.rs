//! Local key-value storage backed by SQLite

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Whole serialized values addressed by a fixed key
        CREATE TABLE IF NOT EXISTS local_storage (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Read the value stored under a key
pub fn get_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM local_storage WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Insert or replace the value under a key
pub fn set_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO local_storage (key, value) VALUES (?1, ?2)",
        (key, value),
    )?;
    Ok(())
}

/// Remove a key; removing a missing key is not an error
pub fn remove_value(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM local_storage WHERE key = ?1", [key])?;
    Ok(())
}
