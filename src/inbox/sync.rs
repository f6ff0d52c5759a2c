//! "Enviar e receber": manual mailbox sync for the selected account.

use std::time::Duration;

use super::controller::InboxController;
use crate::api::SyncRequest;
use crate::status::{StatusLine, Tone};

/// A queued sync keeps its message this much longer than a finished one.
const QUEUED_STATUS_EXTRA: Duration = Duration::from_millis(3500);

#[derive(Debug, Clone, PartialEq)]
pub struct SyncControls {
    pub button_disabled: bool,
    pub button_busy: bool,
    pub button_title: String,
    pub status: StatusLine,
}

impl InboxController {
    pub fn sync_controls(&self) -> SyncControls {
        let capability = self.state.sync_capability();
        SyncControls {
            button_disabled: self.sync_busy || !capability.can_sync,
            button_busy: self.sync_busy,
            button_title: if capability.can_sync {
                "Sincronizar agora".to_string()
            } else {
                capability.message
            },
            status: self.sync_status.clone(),
        }
    }

    /// Show why sync is unavailable, or nothing when it is.
    pub(super) fn refresh_sync_availability(&mut self) {
        if self.sync_busy {
            return;
        }
        let capability = self.state.sync_capability();
        if capability.can_sync {
            self.sync_status.clear();
        } else {
            self.sync_status.set(capability.message, Tone::Muted);
        }
    }

    /// Ask the server to fetch new mail. A queued job refreshes the list
    /// once more a few seconds later (see [`InboxController::next_event`]).
    pub async fn manual_sync(&mut self) -> bool {
        let capability = self.state.sync_capability();
        let account_id = match self.state.account_id {
            Some(id) if capability.can_sync && !self.sync_busy => id,
            _ => {
                if !capability.can_sync {
                    self.sync_status.set(capability.message, Tone::Muted);
                }
                return false;
            }
        };

        self.sync_busy = true;
        self.sync_reset.cancel();
        self.sync_status.set("Sincronizando...", Tone::Loading);
        let request = SyncRequest::for_folder(self.state.active_remote_folder());
        log::info!(
            "Manual sync for account {} ({})",
            account_id,
            request.folder.as_deref().unwrap_or("all folders")
        );

        let done = match self.api.sync_account(account_id, &request).await {
            Ok(result) if result.is_queued() => {
                let message = result
                    .message
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or("Sincronização em segundo plano iniciada.");
                self.sync_status.set(message, Tone::Success);
                self.sync_reset
                    .schedule(|| async { tokio::time::sleep(QUEUED_STATUS_EXTRA).await });
                self.follow_up.schedule_tick();
                true
            }
            Ok(result) => {
                for folder in &result.folders {
                    self.state.upsert_folder(folder);
                }
                self.refresh_threads().await;
                self.sync_status.set("Atualizado agora", Tone::Success);
                self.sync_reset.schedule_tick();
                true
            }
            Err(e) => {
                log::error!("Manual mailbox sync failed: {}", e);
                self.sync_status
                    .set(e.user_message("Falha na sincronização manual."), Tone::Error);
                false
            }
        };
        self.sync_busy = false;
        done
    }
}

#[cfg(test)]
mod tests {
    use super::super::controller::InboxEvent;
    use super::super::testing::{controller, thread_json};
    use super::*;
    use crate::transport::fake::FakeTransport;
    use crate::transport::Method;
    use serde_json::{json, Value};

    const SYNC: &str = "/email/inbox/accounts/2/sync";
    const THREADS: &str = "/email/inbox/threads";

    fn bootstrap(sync: Value) -> Value {
        json!({
            "accountId": 2,
            "folderId": 5,
            "accounts": [{"id": 2, "sync": sync}],
            "folders": [{"id": 5, "type": "custom", "remote_name": " INBOX.Clientes "}]
        })
    }

    #[tokio::test]
    async fn unavailable_sync_explains_why() {
        let fake = FakeTransport::new();
        let mut c = controller(&fake, bootstrap(json!({"imapEnabled": true}))).await;
        assert_eq!(
            c.sync_controls().status.text,
            crate::models::SYNC_MISSING_CREDENTIALS_REASON
        );
        assert!(c.sync_controls().button_disabled);
        assert!(!c.manual_sync().await);
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn direct_sync_refreshes_and_narrows_to_folder() {
        let fake = FakeTransport::new();
        fake.ok(Method::Post, SYNC, json!({"status": "ok", "folders": [{"id": 5, "unread_count": 4}]}));
        fake.ok(Method::Get, THREADS, json!({"threads": [thread_json(1, 5)]}));
        let mut c = controller(&fake, bootstrap(json!({"canSync": true}))).await;
        assert!(!c.sync_controls().status.is_visible());
        assert!(c.manual_sync().await);

        let form = fake.requests_to(SYNC)[0].form_body().cloned().unwrap();
        assert_eq!(form.get("mode"), Some("async"));
        assert_eq!(form.get("limit"), Some("150"));
        assert_eq!(form.get("lookback_days"), Some("120"));
        assert_eq!(form.get("folders"), Some("INBOX.Clientes"));
        assert_eq!(form.get("_token"), Some("csrf"));

        assert_eq!(c.sync_controls().status.text, "Atualizado agora");
        assert_eq!(c.state().folder_badge(5).as_deref(), Some("4"));
        assert_eq!(c.list().visible_ids, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_sync_refreshes_again_later() {
        let fake = FakeTransport::new();
        fake.ok(Method::Post, SYNC, json!({"status": "queued", "message": " Na fila. "}));
        fake.ok(Method::Get, THREADS, json!({"threads": []}));
        let mut c = controller(&fake, bootstrap(json!({"canSync": true}))).await;
        assert!(c.manual_sync().await);
        assert_eq!(c.sync_controls().status.text, "Na fila.");
        assert!(fake.requests_to(THREADS).is_empty());

        assert_eq!(c.next_event().await, Some(InboxEvent::FollowUpRefreshed));
        assert_eq!(fake.requests_to(THREADS).len(), 1);
        assert_eq!(c.next_event().await, Some(InboxEvent::SyncStatusReset));
        assert!(!c.sync_controls().status.is_visible());
        assert_eq!(c.next_event().await, None);
    }

    #[tokio::test]
    async fn failed_sync_shows_server_text() {
        let fake = FakeTransport::new();
        fake.respond(Method::Post, SYNC, 502, json!({"error": "Servidor IMAP recusou o login."}));
        let mut c = controller(&fake, bootstrap(json!({"canSync": true}))).await;
        assert!(!c.manual_sync().await);
        let controls = c.sync_controls();
        assert_eq!(controls.status.text, "Servidor IMAP recusou o login.");
        assert_eq!(controls.status.tone, Tone::Error);
        assert!(!controls.button_busy);
    }
}
