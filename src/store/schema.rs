use rusqlite::Connection;

/// Schema DDL run on open.
pub(super) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS local_storage (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
";

/// Run forward-only migrations. Each ALTER is idempotent (ignores "duplicate column" errors).
pub(super) fn run_migrations(conn: &Connection) {
    let alters = ["ALTER TABLE local_storage ADD COLUMN updated_at INTEGER NOT NULL DEFAULT 0"];
    for sql in &alters {
        // "duplicate column name" is the expected error when already migrated
        if let Err(e) = conn.execute(sql, []) {
            let msg = e.to_string();
            if !msg.contains("duplicate column") {
                log::warn!("Migration failed ({}): {}", sql, msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{run_migrations, SCHEMA};

    fn columns(conn: &Connection) -> Vec<String> {
        let mut stmt = conn.prepare("PRAGMA table_info(local_storage)").unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(SCHEMA).unwrap();
        run_migrations(&conn);
        run_migrations(&conn);
        assert_eq!(columns(&conn), vec!["key", "value", "updated_at"]);
    }

    #[test]
    fn legacy_rows_survive_migration() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO local_storage (key, value) VALUES ('inbox_local_threads', '[]')",
            [],
        )
        .unwrap();
        run_migrations(&conn);
        let (value, updated): (String, i64) = conn
            .query_row(
                "SELECT value, updated_at FROM local_storage WHERE key = 'inbox_local_threads'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(value, "[]");
        assert_eq!(updated, 0);
    }
}
