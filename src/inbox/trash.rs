//! Trash preview popover and "Limpar lixeira".

use super::controller::InboxController;
use super::state::FolderSelection;
use crate::api::ThreadListQuery;
use crate::format::format_timestamp;
use crate::models::{Thread, ThreadId};
use crate::status::{StatusLine, Tone};

pub const TRASH_PREVIEW_LIMIT: u32 = 6;
pub const TRASH_EMPTY_DEFAULT: &str = "Essa ação remove todas as conversas definitivamente.";
pub const TRASH_EMPTY_CONFIRM: &str = "Tem certeza de que deseja limpar a lixeira?";
pub const TRASH_EMPTY_CONFIRM_AGAIN: &str =
    "Essa ação não pode ser desfeita. Confirmar exclusão permanente?";

#[derive(Debug, Clone, PartialEq)]
pub struct TrashPreviewItem {
    pub thread_id: ThreadId,
    pub subject: String,
    pub snippet: String,
    pub date_label: String,
}

impl TrashPreviewItem {
    fn from_thread(thread: &Thread) -> Self {
        let non_blank = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        TrashPreviewItem {
            thread_id: thread.id,
            subject: non_blank(&thread.subject).unwrap_or_else(|| "(sem assunto)".into()),
            snippet: non_blank(&thread.snippet).unwrap_or_else(|| "Sem prévia capturada.".into()),
            date_label: match thread.last_message_at.filter(|t| *t > 0) {
                Some(ts) => format_timestamp(Some(ts)),
                None => "Sem data".into(),
            },
        }
    }
}

/// What the trash popover shows.
#[derive(Debug, Clone, PartialEq)]
pub struct TrashPreview {
    /// The trigger is hidden when there is no trash folder or the local
    /// folder is active.
    pub available: bool,
    pub open: bool,
    pub count: usize,
    pub items: Vec<TrashPreviewItem>,
    pub empty_message: Option<&'static str>,
    pub status: StatusLine,
    pub empty_button_label: &'static str,
    pub empty_button_disabled: bool,
}

impl InboxController {
    pub fn trash_preview(&self) -> TrashPreview {
        let available = self.state.can_use_trash_preview();
        let items: Vec<_> = self
            .state
            .trash_preview
            .iter()
            .map(TrashPreviewItem::from_thread)
            .collect();
        TrashPreview {
            available,
            open: self.trash_preview_open && available,
            count: items.len(),
            empty_message: items.is_empty().then_some("Nenhuma conversa na lixeira."),
            items,
            status: self.trash_status.clone(),
            empty_button_label: if self.trash_busy { "Limpando..." } else { "Limpar lixeira" },
            empty_button_disabled: !available || self.trash_busy,
        }
    }

    pub(super) fn reset_trash_status(&mut self) {
        self.trash_status.set(TRASH_EMPTY_DEFAULT, Tone::Muted);
    }

    /// Fetch the newest trash threads. Failures leave the preview empty.
    pub async fn load_trash_preview(&mut self) {
        let Some(trash_id) = self.state.trash_folder_id.filter(|_| self.state.can_use_trash_preview()) else {
            self.state.trash_preview.clear();
            return;
        };
        let query = ThreadListQuery {
            account_id: self.state.account_id,
            folder_id: Some(trash_id),
            limit: TRASH_PREVIEW_LIMIT,
            include_folders: true,
        };
        self.state.trash_preview = match self.api.list_threads(query).await {
            Ok(list) => list.threads,
            Err(e) => {
                log::error!("Trash preview fetch failed: {}", e);
                Vec::new()
            }
        };
    }

    /// Open or close the popover. Opening reloads it.
    pub async fn toggle_trash_preview(&mut self) -> bool {
        if !self.state.can_use_trash_preview() {
            self.trash_preview_open = false;
            return false;
        }
        if self.trash_preview_open {
            self.trash_preview_open = false;
        } else {
            self.trash_preview_open = true;
            self.load_trash_preview().await;
        }
        self.trash_preview_open
    }

    pub fn close_trash_preview(&mut self) {
        self.trash_preview_open = false;
    }

    /// A popover row was clicked: switch to the trash folder and open it.
    pub async fn focus_thread_from_trash(&mut self, thread_id: ThreadId) {
        let Some(trash_id) = self.state.trash_folder_id else {
            return;
        };
        self.trash_preview_open = false;
        self.state.thread_id = Some(thread_id);
        self.leave_search_mode();
        self.state.folder = FolderSelection::Id(trash_id);
        self.refresh_threads().await;
        self.load_thread_messages(thread_id).await;
    }

    /// Permanently delete the trash after two confirmations.
    ///
    /// `confirm` is asked each question in turn; declining either one
    /// cancels. Returns whether the server emptied the trash.
    pub async fn empty_trash(&mut self, mut confirm: impl FnMut(&str) -> bool) -> bool {
        if !self.state.can_use_trash_preview() || self.trash_busy {
            return false;
        }
        if !confirm(TRASH_EMPTY_CONFIRM) || !confirm(TRASH_EMPTY_CONFIRM_AGAIN) {
            self.trash_status.set("Limpeza cancelada.", Tone::Muted);
            return false;
        }

        self.trash_busy = true;
        self.trash_status
            .set("Removendo conversas da lixeira...", Tone::Loading);
        let outcome = self.api.empty_trash(self.state.account_id).await;
        let done = match outcome {
            Ok(result) => {
                let n = result.deleted_threads;
                let message = match n {
                    n if n <= 0 => "Nenhuma conversa estava na lixeira.".to_string(),
                    1 => "Lixeira vazia (1 conversa removida).".to_string(),
                    n => format!("Lixeira vazia ({n} conversas removidas)."),
                };
                self.trash_status.set(message, Tone::Success);
                self.load_trash_preview().await;
                if self.state.is_viewing_trash() {
                    self.state.thread_id = None;
                    self.state.selected_message_id = None;
                    self.state.set_current_thread(None);
                    self.detail = None;
                    self.detail_error = None;
                    self.refresh_threads().await;
                }
                true
            }
            Err(e) => {
                log::error!("Inbox trash empty failed: {}", e);
                self.trash_status
                    .set(e.user_message("Falha ao limpar a lixeira."), Tone::Error);
                false
            }
        };
        self.trash_busy = false;
        done
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{controller, thread_json, TRASH};
    use super::*;
    use crate::transport::fake::FakeTransport;
    use crate::transport::Method;
    use serde_json::json;

    const THREADS: &str = "/email/inbox/threads";
    const EMPTY: &str = "/email/inbox/trash/empty";

    #[tokio::test]
    async fn preview_requests_six_trash_threads() {
        let fake = FakeTransport::new();
        fake.ok(
            Method::Get,
            THREADS,
            json!({"threads": [thread_json(7, TRASH), {"id": 8, "subject": " "}]}),
        );
        let mut c = controller(&fake, json!({"accountId": 3, "trashFolderId": TRASH})).await;
        assert!(c.toggle_trash_preview().await);

        let req = &fake.requests_to(THREADS)[0];
        assert_eq!(req.query_value("folder_id"), Some("9"));
        assert_eq!(req.query_value("limit"), Some("6"));
        assert_eq!(req.query_value("account_id"), Some("3"));

        let preview = c.trash_preview();
        assert!(preview.open);
        assert_eq!(preview.count, 2);
        assert_eq!(preview.items[1].subject, "(sem assunto)");
        assert_eq!(preview.items[1].snippet, "Sem prévia capturada.");
        assert_eq!(preview.items[1].date_label, "Sem data");
        assert_eq!(preview.status.text, TRASH_EMPTY_DEFAULT);

        assert!(!c.toggle_trash_preview().await);
    }

    #[tokio::test]
    async fn preview_unavailable_without_trash_folder() {
        let fake = FakeTransport::new();
        let mut c = controller(&fake, json!({})).await;
        assert!(!c.toggle_trash_preview().await);
        let preview = c.trash_preview();
        assert!(!preview.available);
        assert_eq!(preview.empty_message, Some("Nenhuma conversa na lixeira."));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn declining_either_confirmation_cancels() {
        let fake = FakeTransport::new();
        let mut c = controller(&fake, json!({"trashFolderId": TRASH})).await;
        let mut asked = Vec::new();
        let done = c
            .empty_trash(|q| {
                asked.push(q.to_string());
                asked.len() < 2
            })
            .await;
        assert!(!done);
        assert_eq!(asked, vec![TRASH_EMPTY_CONFIRM, TRASH_EMPTY_CONFIRM_AGAIN]);
        assert_eq!(c.trash_preview().status.text, "Limpeza cancelada.");
        assert_eq!(c.trash_preview().status.tone, Tone::Muted);
        assert!(fake.requests_to(EMPTY).is_empty());
    }

    #[tokio::test]
    async fn emptying_while_viewing_trash_closes_thread() {
        let fake = FakeTransport::new();
        fake.ok(Method::Post, EMPTY, json!({"deleted_threads": 3}));
        fake.ok(Method::Get, THREADS, json!({"threads": []}));
        let mut c = controller(
            &fake,
            json!({"accountId": 2, "folderId": TRASH, "trashFolderId": TRASH, "threadId": 5, "currentThread": {"id": 5}}),
        )
        .await;
        assert!(c.empty_trash(|_| true).await);

        let body = fake.requests_to(EMPTY)[0].json_body().cloned().unwrap();
        assert_eq!(body["account_id"], json!(2));
        let preview = c.trash_preview();
        assert_eq!(preview.status.text, "Lixeira vazia (3 conversas removidas).");
        assert_eq!(preview.status.tone, Tone::Success);
        assert_eq!(preview.empty_button_label, "Limpar lixeira");
        assert_eq!(c.state().thread_id, None);
        assert_eq!(c.header().title, "Selecione uma conversa");
        // One preview reload and one list refresh.
        assert_eq!(fake.requests_to(THREADS).len(), 2);
    }

    #[tokio::test]
    async fn empty_trash_reports_server_error() {
        let fake = FakeTransport::new();
        fake.respond(Method::Post, EMPTY, 403, json!({"error": "Sem permissão."}));
        let mut c = controller(&fake, json!({"trashFolderId": TRASH})).await;
        assert!(!c.empty_trash(|_| true).await);
        assert_eq!(c.trash_preview().status.text, "Sem permissão.");
        assert!(!c.trash_preview().empty_button_disabled);
    }

    #[tokio::test]
    async fn nothing_to_delete() {
        let fake = FakeTransport::new();
        fake.ok(Method::Post, EMPTY, json!({"deleted_threads": 0}));
        let mut c = controller(&fake, json!({"trashFolderId": TRASH})).await;
        assert!(c.empty_trash(|_| true).await);
        assert_eq!(c.trash_preview().status.text, "Nenhuma conversa estava na lixeira.");
    }

    #[tokio::test]
    async fn focus_switches_to_trash_folder() {
        let fake = FakeTransport::new();
        fake.ok(Method::Get, THREADS, json!({"threads": [thread_json(7, TRASH)]}));
        fake.ok(Method::Get, "/email/inbox/threads/7/messages", json!({"messages": []}));
        let mut c = controller(&fake, json!({"trashFolderId": TRASH})).await;
        c.focus_thread_from_trash(7).await;
        assert_eq!(c.state().folder, FolderSelection::Id(TRASH));
        assert_eq!(c.list().visible_ids, vec![7]);
        assert_eq!(c.state().thread_id, Some(7));
        assert_eq!(fake.requests_to("/email/inbox/threads/7/messages").len(), 1);
    }
}
