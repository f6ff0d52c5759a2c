use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tokio::sync::{mpsc, oneshot};

use super::commands::StorageCmd;
use super::queries;
use super::schema::{run_migrations, SCHEMA};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// LocalStorage: Clone + Send + Sync async facade
// ---------------------------------------------------------------------------

/// String key/value store backing the client-only state (the local folder).
///
/// Writes are full-value overwrites with no cross-process locking: a single
/// writer is assumed, and two processes sharing a database file can clobber
/// each other's values.
#[derive(Clone)]
pub struct LocalStorage {
    tx: mpsc::UnboundedSender<StorageCmd>,
}

impl LocalStorage {
    /// Open (or create) the storage database under the user data dir and
    /// spawn the background thread.
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::resolve_path()).map_err(Error::Cache)
    }

    /// Open `storage.db` inside `dir`, creating the directory if needed.
    pub fn open_at(dir: &Path) -> std::result::Result<Self, String> {
        std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create storage dir: {e}"))?;

        let db_file = dir.join("storage.db");
        let conn =
            Connection::open(&db_file).map_err(|e| format!("Failed to open storage db: {e}"))?;
        Self::spawn(conn)
    }

    /// A throwaway database, for tests and ephemeral sessions.
    pub fn open_in_memory() -> std::result::Result<Self, String> {
        let conn = Connection::open_in_memory()
            .map_err(|e| format!("Failed to open in-memory storage: {e}"))?;
        Self::spawn(conn)
    }

    fn spawn(conn: Connection) -> std::result::Result<Self, String> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| format!("Failed to init storage schema: {e}"))?;

        run_migrations(&conn);

        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("mailpanel-storage".into())
            .spawn(move || run_loop(conn, rx))
            .map_err(|e| format!("Failed to spawn storage thread: {e}"))?;

        Ok(LocalStorage { tx })
    }

    fn resolve_path() -> PathBuf {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("mailpanel")
    }

    // -- async methods -------------------------------------------------------

    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let (reply, rx) = oneshot::channel();
        self.request(StorageCmd::GetItem { key: key.to_string(), reply }, rx).await
    }

    pub async fn set_item(&self, key: &str, value: String) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.request(
            StorageCmd::SetItem {
                key: key.to_string(),
                value,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn remove_item(&self, key: &str) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.request(StorageCmd::RemoveItem { key: key.to_string(), reply }, rx).await
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.request(StorageCmd::Keys { reply }, rx).await
    }

    async fn request<T>(
        &self,
        cmd: StorageCmd,
        rx: oneshot::Receiver<std::result::Result<T, String>>,
    ) -> Result<T> {
        self.tx
            .send(cmd)
            .map_err(|_| Error::Cache("Storage unavailable".to_string()))?;
        rx.await
            .map_err(|_| Error::Cache("Storage unavailable".to_string()))?
            .map_err(Error::Cache)
    }
}

// -- background thread ---------------------------------------------------

fn run_loop(conn: Connection, mut rx: mpsc::UnboundedReceiver<StorageCmd>) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            StorageCmd::GetItem { key, reply } => {
                let _ = reply.send(queries::do_get_item(&conn, &key));
            }
            StorageCmd::SetItem { key, value, reply } => {
                let _ = reply.send(queries::do_set_item(&conn, &key, &value));
            }
            StorageCmd::RemoveItem { key, reply } => {
                let _ = reply.send(queries::do_remove_item(&conn, &key));
            }
            StorageCmd::Keys { reply } => {
                let _ = reply.send(queries::do_keys(&conn));
            }
        }
    }
    log::debug!("Storage thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_persist_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open_at(dir.path()).unwrap();
        storage.set_item("a", "1".into()).await.unwrap();
        let clone = storage.clone();
        assert_eq!(clone.get_item("a").await.unwrap().as_deref(), Some("1"));
        drop(storage);
        drop(clone);

        let reopened = LocalStorage::open_at(dir.path()).unwrap();
        assert_eq!(reopened.get_item("a").await.unwrap().as_deref(), Some("1"));
        reopened.remove_item("a").await.unwrap();
        assert_eq!(reopened.get_item("a").await.unwrap(), None);
        assert!(reopened.keys().await.unwrap().is_empty());
    }
}
