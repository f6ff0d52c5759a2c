use rusqlite::{params, Connection, OptionalExtension};

pub(super) fn do_get_item(conn: &Connection, key: &str) -> Result<Option<String>, String> {
    conn.query_row(
        "SELECT value FROM local_storage WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| format!("Storage read error: {e}"))
}

/// Full-value overwrite. Last writer wins.
pub(super) fn do_set_item(conn: &Connection, key: &str, value: &str) -> Result<(), String> {
    let now = chrono::Utc::now().timestamp();
    conn.execute(
        "INSERT INTO local_storage (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now],
    )
    .map_err(|e| format!("Storage write error: {e}"))?;
    Ok(())
}

pub(super) fn do_remove_item(conn: &Connection, key: &str) -> Result<(), String> {
    conn.execute("DELETE FROM local_storage WHERE key = ?1", [key])
        .map_err(|e| format!("Storage delete error: {e}"))?;
    Ok(())
}

pub(super) fn do_keys(conn: &Connection) -> Result<Vec<String>, String> {
    let mut stmt = conn
        .prepare("SELECT key FROM local_storage ORDER BY key")
        .map_err(|e| format!("Storage prepare error: {e}"))?;
    let rows = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| format!("Storage query error: {e}"))?;

    let mut keys = Vec::new();
    for row in rows {
        keys.push(row.map_err(|e| format!("Storage row error: {e}"))?);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::super::schema::{run_migrations, SCHEMA};
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        run_migrations(&conn);
        conn
    }

    #[test]
    fn set_overwrites_and_remove_deletes() {
        let conn = conn();
        assert_eq!(do_get_item(&conn, "k").unwrap(), None);
        do_set_item(&conn, "k", "1").unwrap();
        do_set_item(&conn, "k", "2").unwrap();
        do_set_item(&conn, "a", "x").unwrap();
        assert_eq!(do_get_item(&conn, "k").unwrap().as_deref(), Some("2"));
        assert_eq!(do_keys(&conn).unwrap(), vec!["a", "k"]);
        do_remove_item(&conn, "k").unwrap();
        do_remove_item(&conn, "missing").unwrap();
        assert_eq!(do_get_item(&conn, "k").unwrap(), None);
    }
}
