//! Actions on the multi-selection, including the "Caixa local".

use super::controller::InboxController;
use crate::api::ThreadAction;
use crate::error::{Error, Result};
use crate::models::{FolderId, Thread, ThreadId, LOCAL_FOLDER_LABEL};

const BULK_FAILED: &str = "Falha ao processar ações em lote.";
const BULK_REJECTED: &str = "Não foi possível processar a ação em lote.";
pub const LOCAL_PURGE_CONFIRM: &str = "Deseja mover as conversas salvas para a lixeira do servidor?";

/// State of the selection toolbar.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkToolbar {
    pub count: usize,
    /// The toolbar is hidden while nothing is selected.
    pub visible: bool,
    pub buttons_disabled: bool,
    pub local_label: String,
}

impl InboxController {
    pub fn bulk_toolbar(&self) -> BulkToolbar {
        let count = self.selection.len();
        BulkToolbar {
            count,
            visible: count > 0,
            buttons_disabled: count == 0 || self.bulk_busy,
            local_label: self.local_action_label(),
        }
    }

    fn selected_ids(&self) -> Vec<ThreadId> {
        let ordered = self.selection.ordered(&self.state.list.visible_ids);
        if ordered.len() == self.selection.len() {
            return ordered;
        }
        let mut ids: Vec<_> = self.selection.selected().iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Apply `action` to every selected thread, through the batch endpoint
    /// when one is configured and one request per thread otherwise. The
    /// per-thread fallback stops at the first failure.
    pub async fn run_bulk_thread_action(&mut self, action: ThreadAction) -> Result<()> {
        let ids = self.selected_ids();
        if ids.is_empty() || self.bulk_busy {
            return Ok(());
        }
        self.bulk_busy = true;
        let outcome = self.apply_bulk(&ids, action).await;
        self.bulk_busy = false;

        match outcome {
            Ok(()) => {
                self.refresh_threads().await;
                self.clear_selection();
                Ok(())
            }
            Err(e) => {
                log::error!("Bulk {} failed: {}", action.name(), e);
                self.alerts.error(e.user_message(BULK_FAILED));
                Err(e)
            }
        }
    }

    async fn apply_bulk(&mut self, ids: &[ThreadId], action: ThreadAction) -> Result<()> {
        if self.api.has_bulk_endpoint() {
            let result = self.api.bulk_action(ids, action).await.map_err(|e| match e {
                Error::Http { url, status, .. } => Error::Http {
                    url,
                    status,
                    message: Some(BULK_REJECTED.to_string()),
                },
                other => other,
            })?;
            for folder in &result.folders {
                self.state.upsert_folder(folder);
            }
            for thread in &result.threads {
                self.state.update_header_if_current(Some(thread));
            }
            return Ok(());
        }
        for &id in ids {
            let result = self.perform_thread_action(action, Some(id)).await?;
            self.sync_badges(&result);
            self.state.update_header_if_current(result.thread.as_ref());
        }
        Ok(())
    }

    pub async fn bulk_archive(&mut self) -> Result<()> {
        self.run_bulk_thread_action(ThreadAction::Archive).await
    }

    pub async fn bulk_trash(&mut self) -> Result<()> {
        let outcome = self.run_bulk_thread_action(ThreadAction::Trash).await;
        self.load_trash_preview().await;
        outcome
    }

    pub async fn bulk_star(&mut self) -> Result<()> {
        self.run_bulk_thread_action(ThreadAction::Star { starred: true }).await
    }

    pub async fn bulk_mark_read(&mut self) -> Result<()> {
        self.run_bulk_thread_action(ThreadAction::MarkRead).await
    }

    pub async fn bulk_move(&mut self, folder_id: FolderId) -> Result<()> {
        if folder_id <= 0 {
            return Ok(());
        }
        let outcome = self.run_bulk_thread_action(ThreadAction::Move { folder_id }).await;
        self.load_trash_preview().await;
        outcome
    }

    fn thread_snapshot(&self, id: ThreadId) -> Option<Thread> {
        self.state
            .visible
            .get(&id)
            .or_else(|| self.state.current_thread.as_ref().filter(|t| t.id == id))
            .cloned()
    }

    /// Copy the selected threads into the local folder.
    pub async fn store_selected_locally(&mut self) -> Result<usize> {
        let snapshots: Vec<Thread> = self
            .selected_ids()
            .into_iter()
            .filter_map(|id| self.thread_snapshot(id))
            .collect();
        if snapshots.is_empty() {
            return Ok(0);
        }
        let stored = self.local.store(snapshots).await?;
        log::info!("Saved {} thread(s) to the local folder", stored);
        self.alerts.success(format!("Salvo na {LOCAL_FOLDER_LABEL}."));
        Ok(stored)
    }

    /// Drop the selected threads from the local folder.
    pub async fn remove_from_local(&mut self) -> Result<()> {
        let ids = self.selected_ids();
        if ids.is_empty() {
            return Ok(());
        }
        self.local.remove(&ids).await?;
        self.selection.clear();
        self.render_local();
        self.alerts.success(format!("{LOCAL_FOLDER_LABEL} atualizada."));
        Ok(())
    }

    /// Save the selection to the local folder (or remove it, when the local
    /// folder is open). After saving, `confirm` decides whether the server
    /// copies also go to the server trash.
    pub async fn bulk_local_action(&mut self, mut confirm: impl FnMut(&str) -> bool) -> Result<()> {
        if self.state.is_local() {
            return self.remove_from_local().await;
        }
        if self.store_selected_locally().await? == 0 {
            return Ok(());
        }

        if !confirm(LOCAL_PURGE_CONFIRM) {
            return Ok(());
        }
        match self.bulk_trash().await {
            Ok(()) => {
                self.clear_selection();
                self.alerts
                    .success("Conversas enviadas para a lixeira do servidor.");
                Ok(())
            }
            Err(e) => {
                self.alerts
                    .error("Não foi possível mover para a lixeira do servidor.");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::selection::Modifiers;
    use super::super::state::FolderSelection;
    use super::super::testing::{controller, thread_json};
    use super::*;
    use crate::transport::fake::FakeTransport;
    use crate::transport::Method;
    use serde_json::json;

    const THREADS: &str = "/email/inbox/threads";
    const BULK: &str = "/email/inbox/threads/bulk-actions";

    async fn with_selection(fake: &std::sync::Arc<FakeTransport>, bootstrap: serde_json::Value) -> InboxController {
        fake.ok(
            Method::Get,
            THREADS,
            json!({"threads": [thread_json(1, 1), thread_json(2, 1), thread_json(3, 1)]}),
        );
        let mut c = controller(fake, bootstrap).await;
        c.load_threads(false).await;
        c.select_all_visible();
        c.toggle_thread_selection(2, false, false);
        c
    }

    #[tokio::test]
    async fn batch_endpoint_gets_one_request() {
        let fake = FakeTransport::new();
        fake.ok(
            Method::Post,
            BULK,
            json!({"folders": [{"id": 1, "unread_count": 1}], "threads": [], "count": 2}),
        );
        let mut c = with_selection(&fake, json!({})).await;
        assert_eq!(c.bulk_toolbar().count, 2);
        c.bulk_star().await.unwrap();

        let body = fake.requests_to(BULK)[0].json_body().cloned().unwrap();
        assert_eq!(body["action"], json!("star"));
        assert_eq!(body["thread_ids"], json!([1, 3]));
        assert_eq!(body["payload"], json!({"starred": true}));
        assert_eq!(c.state().folder_badge(1).as_deref(), Some("1"));
        assert!(!c.bulk_toolbar().visible);
    }

    #[tokio::test]
    async fn batch_rejection_uses_generic_text() {
        let fake = FakeTransport::new();
        fake.respond(Method::Post, BULK, 500, json!({"error": "stack trace"}));
        let mut c = with_selection(&fake, json!({})).await;
        assert!(c.bulk_archive().await.is_err());
        assert_eq!(c.alerts().current().unwrap().message, BULK_REJECTED);
        assert_eq!(c.bulk_toolbar().count, 2);
    }

    #[tokio::test]
    async fn fallback_stops_at_first_failure() {
        let fake = FakeTransport::new();
        fake.respond(Method::Post, "/email/inbox/threads/1/archive", 500, json!({}));
        fake.ok(Method::Post, "/email/inbox/threads/3/archive", json!({}));
        let mut c = with_selection(&fake, json!({"routes": {"disableBulkEndpoint": true}})).await;
        assert!(c.bulk_archive().await.is_err());
        assert!(fake.requests_to("/email/inbox/threads/3/archive").is_empty());
        assert_eq!(c.alerts().current().unwrap().message, BULK_FAILED);
    }

    #[tokio::test]
    async fn fallback_posts_each_thread() {
        let fake = FakeTransport::new();
        for id in [1, 3] {
            fake.ok(
                Method::Post,
                &format!("/email/inbox/threads/{id}/actions"),
                json!({"folder": {"id": 1, "unread_count": 0}}),
            );
        }
        let mut c = with_selection(&fake, json!({"routes": {"disableBulkEndpoint": true}})).await;
        c.bulk_mark_read().await.unwrap();
        let body = fake.requests_to("/email/inbox/threads/3/actions")[0]
            .json_body()
            .cloned()
            .unwrap();
        assert_eq!(body["action"], json!("mark_read"));
        assert_eq!(c.state().folder_badge(1), None);
        assert!(c.selection().is_empty());
    }

    #[tokio::test]
    async fn save_locally_then_decline_purge() {
        let fake = FakeTransport::new();
        let mut c = with_selection(&fake, json!({})).await;
        c.bulk_local_action(|_| false).await.unwrap();

        assert_eq!(c.local_threads().len(), 2);
        assert_eq!(c.local_badge().as_deref(), Some("2"));
        assert_eq!(c.alerts().current().unwrap().message, "Salvo na Caixa local.");
        assert!(fake.requests_to(BULK).is_empty());
        // The selection survives so the user can act on it again.
        assert_eq!(c.bulk_toolbar().count, 2);
    }

    #[tokio::test]
    async fn save_locally_and_purge_server_copies() {
        let fake = FakeTransport::new();
        fake.ok(Method::Post, BULK, json!({"folders": [], "threads": []}));
        let mut c = with_selection(&fake, json!({})).await;
        let mut asked = None;
        c.bulk_local_action(|q| {
            asked = Some(q.to_string());
            true
        })
        .await
        .unwrap();
        assert_eq!(asked.as_deref(), Some(LOCAL_PURGE_CONFIRM));
        let body = fake.requests_to(BULK)[0].json_body().cloned().unwrap();
        assert_eq!(body["action"], json!("trash"));
        assert_eq!(
            c.alerts().current().unwrap().message,
            "Conversas enviadas para a lixeira do servidor."
        );
    }

    #[tokio::test]
    async fn purge_failure_is_reported() {
        let fake = FakeTransport::new();
        fake.fail(Method::Post, BULK, "connection reset");
        let mut c = with_selection(&fake, json!({})).await;
        assert!(c.bulk_local_action(|_| true).await.is_err());
        assert_eq!(c.local_threads().len(), 2);
        assert_eq!(
            c.alerts().current().unwrap().message,
            "Não foi possível mover para a lixeira do servidor."
        );
    }

    #[tokio::test]
    async fn removing_from_local_folder() {
        let fake = FakeTransport::new();
        let mut c = with_selection(&fake, json!({})).await;
        c.bulk_local_action(|_| false).await.unwrap();

        c.select_folder(FolderSelection::Local).await;
        assert_eq!(c.list().visible_ids.len(), 2);
        assert_eq!(c.bulk_toolbar().local_label, "Remover da Caixa local");
        let ctrl = Modifiers { toggle: true, shift: false };
        let first = c.list().visible_ids[0];
        c.click_thread(first, ctrl).await;
        c.bulk_local_action(|_| panic!("no confirmation in the local folder"))
            .await
            .unwrap();

        assert_eq!(c.local_threads().len(), 1);
        assert_eq!(c.list().visible_ids.len(), 1);
        assert_eq!(c.alerts().current().unwrap().message, "Caixa local atualizada.");
    }

    #[tokio::test]
    async fn local_search_filters_in_memory() {
        let fake = FakeTransport::new();
        let mut c = with_selection(&fake, json!({})).await;
        c.bulk_local_action(|_| false).await.unwrap();
        c.open_local_folder().await;
        c.set_search_query("Conversa 3").await;
        assert_eq!(c.list().visible_ids, vec![3]);
        assert_eq!(c.search_status(), "Filtrando 1 thread · &ldquo;Conversa 3&rdquo;");
        assert!(fake.requests_to("/email/inbox/search").is_empty());
    }
}
