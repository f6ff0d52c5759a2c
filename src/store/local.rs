use indexmap::IndexMap;
use serde_json::Value;

use super::handle::LocalStorage;
use crate::error::Result;
use crate::models::{lenient, FolderRef, Thread, ThreadId};

pub const LOCAL_THREADS_KEY: &str = "inbox_local_threads";
pub const MAX_LOCAL_THREADS: usize = 200;

/// Coerce a stored (or freshly saved) entry into a local-folder thread.
/// Entries without a numeric id are rejected.
pub fn normalize_local_thread(raw: &Value, now: i64) -> Option<Thread> {
    let id = lenient::number(raw.get("id")?)?;
    let mut thread: Thread = match serde_json::from_value(raw.clone()) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("Dropping unreadable local thread {}: {}", id, e);
            return None;
        }
    };
    thread.id = id;
    if thread.subject.as_deref().map_or(true, |s| s.trim().is_empty()) {
        thread.subject = Some("(sem assunto)".to_string());
    }
    if thread.folder.is_none() {
        thread.folder = Some(FolderRef::local());
    }
    if thread.cached_at.is_none() {
        thread.cached_at = Some(now);
    }
    Some(thread)
}

/// The "Caixa local": thread snapshots the user saved on this machine.
pub struct LocalThreadCache {
    storage: LocalStorage,
    threads: Vec<Thread>,
}

impl LocalThreadCache {
    /// Read the saved list. Unreadable data yields an empty folder.
    pub async fn load(storage: LocalStorage) -> Self {
        let now = chrono::Utc::now().timestamp();
        let threads = match storage.get_item(LOCAL_THREADS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(items)) => items
                    .iter()
                    .filter_map(|item| normalize_local_thread(item, now))
                    .collect(),
                Ok(_) => Vec::new(),
                Err(e) => {
                    log::warn!("Local inbox cache read failed: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Local inbox cache read failed: {}", e);
                Vec::new()
            }
        };
        LocalThreadCache { storage, threads }
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn get(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    /// Merge snapshots by id. Known ids keep their position and take the new
    /// snapshot; new ids are appended. Returns how many were stored.
    pub async fn store(&mut self, snapshots: Vec<Thread>) -> Result<usize> {
        if snapshots.is_empty() {
            return Ok(0);
        }
        let now = chrono::Utc::now().timestamp();
        let mut merged: IndexMap<ThreadId, Thread> =
            self.threads.drain(..).map(|t| (t.id, t)).collect();
        let mut stored = 0;
        for mut thread in snapshots {
            thread.folder = Some(FolderRef::local());
            let raw = serde_json::to_value(&thread)?;
            if let Some(normalized) = normalize_local_thread(&raw, now) {
                merged.insert(normalized.id, normalized);
                stored += 1;
            }
        }
        self.threads = merged.into_values().take(MAX_LOCAL_THREADS).collect();
        self.persist().await?;
        Ok(stored)
    }

    pub async fn remove(&mut self, ids: &[ThreadId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.threads.retain(|t| !ids.contains(&t.id));
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        let capped = &self.threads[..self.threads.len().min(MAX_LOCAL_THREADS)];
        let raw = serde_json::to_string(capped)?;
        self.storage.set_item(LOCAL_THREADS_KEY, raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FolderType;
    use serde_json::json;

    fn thread(id: i64, subject: &str) -> Thread {
        serde_json::from_value(json!({
            "id": id,
            "subject": subject,
            "unread_count": 2,
            "folder": {"id": 4, "type": "inbox"}
        }))
        .unwrap()
    }

    #[test]
    fn normalization_fills_defaults_and_rejects_bad_ids() {
        let t = normalize_local_thread(&json!({"id": "12", "unread_count": "1"}), 99).unwrap();
        assert_eq!(t.id, 12);
        assert_eq!(t.subject.as_deref(), Some("(sem assunto)"));
        assert_eq!(t.folder.as_ref().map(|f| f.folder_type), Some(FolderType::Local));
        assert_eq!(t.cached_at, Some(99));
        assert!(normalize_local_thread(&json!({"id": "abc"}), 0).is_none());
        assert!(normalize_local_thread(&json!({"subject": "x"}), 0).is_none());
        assert!(normalize_local_thread(&json!("x"), 0).is_none());
    }

    #[test]
    fn blank_subject_gets_placeholder() {
        let t = normalize_local_thread(&json!({"id": 3, "subject": "  "}), 0).unwrap();
        assert_eq!(t.subject.as_deref(), Some("(sem assunto)"));
        let t = normalize_local_thread(&json!({"id": 4, "subject": ""}), 0).unwrap();
        assert_eq!(t.subject.as_deref(), Some("(sem assunto)"));
    }

    #[tokio::test]
    async fn stored_threads_reload_identically() {
        let storage = LocalStorage::open_in_memory().unwrap();
        let mut cache = LocalThreadCache::load(storage.clone()).await;
        assert!(cache.is_empty());
        cache.store(vec![thread(1, "Fatura"), thread(2, "Contrato")]).await.unwrap();

        let reloaded = LocalThreadCache::load(storage).await;
        assert_eq!(reloaded.len(), 2);
        let first = reloaded.get(1).unwrap();
        assert_eq!(first.subject.as_deref(), Some("Fatura"));
        assert_eq!(first.unread_count, 2);
        assert_eq!(first.folder, Some(FolderRef::local()));
        assert!(first.cached_at.is_some());
    }

    #[tokio::test]
    async fn merge_keeps_position_and_caps() {
        let storage = LocalStorage::open_in_memory().unwrap();
        let mut cache = LocalThreadCache::load(storage.clone()).await;
        cache.store(vec![thread(1, "a"), thread(2, "b")]).await.unwrap();
        cache.store(vec![thread(1, "a2"), thread(3, "c")]).await.unwrap();
        let ids: Vec<_> = cache.threads().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(cache.get(1).unwrap().subject.as_deref(), Some("a2"));

        let many = (10..300).map(|i| thread(i, "x")).collect();
        cache.store(many).await.unwrap();
        assert_eq!(cache.len(), MAX_LOCAL_THREADS);

        cache.remove(&[1, 2]).await.unwrap();
        let reloaded = LocalThreadCache::load(storage).await;
        assert_eq!(reloaded.len(), MAX_LOCAL_THREADS - 2);
        assert!(reloaded.get(1).is_none());
    }

    #[tokio::test]
    async fn garbage_storage_is_an_empty_folder() {
        let storage = LocalStorage::open_in_memory().unwrap();
        storage.set_item(LOCAL_THREADS_KEY, "{not json".into()).await.unwrap();
        assert!(LocalThreadCache::load(storage.clone()).await.is_empty());
        storage
            .set_item(LOCAL_THREADS_KEY, r#"[{"id":5},{"nope":1}]"#.into())
            .await
            .unwrap();
        assert_eq!(LocalThreadCache::load(storage).await.len(), 1);
    }
}
