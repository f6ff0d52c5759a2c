use indexmap::IndexMap;

use super::filters::{search_status_text, SearchFilters};
use super::grouping::ThreadListView;
use crate::config::InboxBootstrap;
use crate::folders::folder_ref_label;
use crate::format::format_timestamp;
use crate::models::{Account, AccountId, Folder, FolderId, Message, MessageId, Thread, ThreadId};

/// Which folder the thread list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderSelection {
    /// Every server folder except trash-like ones.
    #[default]
    All,
    Id(FolderId),
    /// The "Caixa local" kept on this machine.
    Local,
}

impl FolderSelection {
    pub fn from_id(id: Option<FolderId>) -> Self {
        match id.filter(|id| *id > 0) {
            Some(id) => FolderSelection::Id(id),
            None => FolderSelection::All,
        }
    }

    /// Server folder id, when one is selected.
    pub fn id(&self) -> Option<FolderId> {
        match self {
            FolderSelection::Id(id) => Some(*id),
            _ => None,
        }
    }
}

/// Whether "Enviar e receber" may run for the selected account, and what to
/// tell the user when it may not.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncCapability {
    pub can_sync: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveOption {
    pub folder_id: FolderId,
    pub label: String,
    pub selected: bool,
}

/// The panel above the message stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadHeader {
    pub title: String,
    pub subtitle: String,
    pub folder_label: Option<String>,
    pub unread: Option<i64>,
    pub updated_label: Option<String>,
    /// Every control is disabled when no thread is open.
    pub controls_enabled: bool,
    pub mark_read_enabled: bool,
    pub starred: bool,
    pub star_label: &'static str,
    pub move_options: Vec<MoveOption>,
}

impl ThreadHeader {
    fn empty() -> Self {
        ThreadHeader {
            title: "Selecione uma conversa".into(),
            subtitle: "As mensagens aparecem aqui.".into(),
            folder_label: None,
            unread: None,
            updated_label: None,
            controls_enabled: false,
            mark_read_enabled: false,
            starred: false,
            star_label: "Favoritar",
            move_options: Vec::new(),
        }
    }
}

pub struct InboxState {
    pub accounts: Vec<Account>,
    pub folders: Vec<Folder>,
    pub account_id: Option<AccountId>,
    pub folder: FolderSelection,
    pub thread_id: Option<ThreadId>,
    pub selected_message_id: Option<MessageId>,
    pub page_size: u32,
    pub thread_limit: u32,
    pub archive_folder_id: Option<FolderId>,
    pub trash_folder_id: Option<FolderId>,
    pub auto_compose: bool,
    pub search_filters: SearchFilters,
    pub search_mode: bool,
    /// Result count of the last search, for the status line.
    pub search_total: Option<usize>,
    pub search_error: Option<&'static str>,
    pub has_more: bool,
    pub current_thread: Option<Thread>,
    pub current_messages: Vec<Message>,
    pub list: ThreadListView,
    /// Threads on screen, keyed in display order.
    pub visible: IndexMap<ThreadId, Thread>,
    pub trash_preview: Vec<Thread>,
}

impl InboxState {
    pub fn new(bootstrap: &InboxBootstrap) -> Self {
        let page_size = bootstrap.page_size();
        InboxState {
            accounts: bootstrap.accounts.clone(),
            folders: bootstrap
                .folders
                .iter()
                .cloned()
                .map(Folder::with_inferred_type)
                .collect(),
            account_id: bootstrap.account_id.filter(|id| *id > 0),
            folder: FolderSelection::from_id(bootstrap.initial_folder()),
            thread_id: bootstrap.thread_id.filter(|id| *id > 0),
            selected_message_id: bootstrap.selected_message_id.filter(|id| *id > 0),
            page_size,
            thread_limit: page_size,
            archive_folder_id: bootstrap.archive_folder_id.filter(|id| *id > 0),
            trash_folder_id: bootstrap.trash_folder_id.filter(|id| *id > 0),
            auto_compose: bootstrap.auto_compose,
            search_filters: SearchFilters::default(),
            search_mode: false,
            search_total: None,
            search_error: None,
            has_more: false,
            current_thread: bootstrap.current_thread.clone(),
            current_messages: Vec::new(),
            list: ThreadListView::default(),
            visible: IndexMap::new(),
            trash_preview: Vec::new(),
        }
    }

    pub fn folder_id(&self) -> Option<FolderId> {
        self.folder.id()
    }

    pub fn is_local(&self) -> bool {
        self.folder == FolderSelection::Local
    }

    pub fn is_viewing_trash(&self) -> bool {
        self.trash_folder_id.is_some() && self.folder_id() == self.trash_folder_id
    }

    pub fn can_use_trash_preview(&self) -> bool {
        !self.is_local() && self.trash_folder_id.is_some()
    }

    pub fn account(&self, id: Option<AccountId>) -> Option<&Account> {
        let id = id?;
        self.accounts.iter().find(|a| a.id == id)
    }

    /// Account used when the composer has none.
    pub fn default_account(&self) -> Option<AccountId> {
        self.account_id.or_else(|| self.accounts.first().map(|a| a.id))
    }

    /// Merge a folder from a response into the sidebar list.
    pub fn upsert_folder(&mut self, folder: &Folder) {
        if folder.id <= 0 {
            return;
        }
        match self.folders.iter_mut().find(|f| f.id == folder.id) {
            Some(existing) => {
                existing.unread_count = folder.unread_count;
                existing.total_count = folder.total_count.or(Some(folder.unread_count));
                if folder.display_name.is_some() {
                    existing.display_name = folder.display_name.clone();
                }
                if folder.remote_name.is_some() {
                    existing.remote_name = folder.remote_name.clone();
                }
            }
            None => self.folders.push(folder.clone().with_inferred_type()),
        }
    }

    /// Badge text for a sidebar folder; `None` hides the badge.
    pub fn folder_badge(&self, id: FolderId) -> Option<String> {
        let count = self.folders.iter().find(|f| f.id == id)?.badge_count();
        (count != 0).then(|| count.to_string())
    }

    /// Remote name of the selected server folder, for a narrow sync.
    pub fn active_remote_folder(&self) -> Option<&str> {
        let id = self.folder_id()?;
        self.folders
            .iter()
            .find(|f| f.id == id)
            .and_then(|f| f.remote_name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    pub fn sync_capability(&self) -> SyncCapability {
        let unavailable = |message: &str| SyncCapability {
            can_sync: false,
            message: message.to_string(),
        };
        let Some(account) = self.account(self.account_id) else {
            return unavailable("Nenhuma conta ativa selecionada para sincronizar.");
        };
        let sync = &account.sync;
        if sync.can_sync {
            return SyncCapability {
                can_sync: true,
                message: "Atualizado automaticamente".into(),
            };
        }
        if let Some(reason) = sync.reason.as_deref().filter(|r| !r.trim().is_empty()) {
            return unavailable(reason);
        }
        if !sync.imap_enabled {
            return unavailable(crate::models::SYNC_DISABLED_REASON);
        }
        if !sync.has_credentials {
            return unavailable(crate::models::SYNC_MISSING_CREDENTIALS_REASON);
        }
        unavailable("Sincronização manual indisponível para esta conta.")
    }

    pub fn header(&self) -> ThreadHeader {
        let Some(thread) = &self.current_thread else {
            return ThreadHeader::empty();
        };
        let folder_label = folder_ref_label(thread.folder.as_ref());
        let current_folder = thread.folder_id();
        let starred = thread.is_starred();
        ThreadHeader {
            title: thread.subject.clone().unwrap_or_else(|| "(no subject)".into()),
            subtitle: format!("Conversa #{} · {}", thread.id, folder_label),
            folder_label: Some(folder_label),
            unread: (thread.unread_count > 0).then_some(thread.unread_count),
            updated_label: Some(match thread.last_message_at.filter(|t| *t > 0) {
                Some(ts) => format_timestamp(Some(ts)),
                None => "Sem data".to_string(),
            }),
            controls_enabled: true,
            mark_read_enabled: thread.unread_count > 0,
            starred,
            star_label: if starred { "Remover estrela" } else { "Favoritar" },
            move_options: self
                .folders
                .iter()
                .map(|f| MoveOption {
                    folder_id: f.id,
                    label: f.label(),
                    selected: current_folder == Some(f.id),
                })
                .collect(),
        }
    }

    /// Replace the open thread. Clearing it also drops its messages.
    pub fn set_current_thread(&mut self, thread: Option<Thread>) {
        if thread.is_none() {
            self.current_messages.clear();
        }
        self.current_thread = thread;
    }

    /// Take a thread from a response only if it is the open one.
    pub fn update_header_if_current(&mut self, thread: Option<&Thread>) {
        if let Some(thread) = thread {
            if self.thread_id == Some(thread.id) {
                self.current_thread = Some(thread.clone());
            }
        }
    }

    pub fn search_status(&self) -> String {
        let total = if self.search_mode { self.search_total } else { None };
        search_status_text(self.search_mode, &self.search_filters, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bootstrap() -> InboxBootstrap {
        serde_json::from_value(json!({
            "accountId": "2",
            "folderId": 0,
            "threadLimit": 20,
            "trashFolderId": 9,
            "folders": [
                {"id": 1, "type": "inbox", "display_name": "INBOX", "unread_count": 3},
                {"id": 5, "type": "custom", "remote_name": "[Gmail]/Sent Mail", "unread_count": 0, "total_count": 0},
                {"id": 9, "type": "trash", "remote_name": " Trash "}
            ],
            "accounts": [
                {"id": 1, "sync": {"canSync": true}},
                {"id": 2, "sync": {"imapEnabled": true}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn bootstrap_normalizes_ids() {
        let s = InboxState::new(&bootstrap());
        assert_eq!(s.account_id, Some(2));
        assert_eq!(s.folder, FolderSelection::All);
        assert_eq!(s.thread_limit, 20);
        assert!(s.can_use_trash_preview());
        assert_eq!(s.folder_badge(1).as_deref(), Some("3"));
        assert_eq!(s.folder_badge(5), None);
        assert_eq!(s.header().title, "Selecione uma conversa");
        assert!(!s.header().controls_enabled);
    }

    #[test]
    fn sync_capability_explains_missing_credentials() {
        let mut s = InboxState::new(&bootstrap());
        let c = s.sync_capability();
        assert!(!c.can_sync);
        assert_eq!(c.message, crate::models::SYNC_MISSING_CREDENTIALS_REASON);
        s.account_id = Some(1);
        assert!(s.sync_capability().can_sync);
        s.account_id = None;
        assert_eq!(
            s.sync_capability().message,
            "Nenhuma conta ativa selecionada para sincronizar."
        );
    }

    #[test]
    fn active_remote_folder_only_for_server_folders() {
        let mut s = InboxState::new(&bootstrap());
        assert_eq!(s.active_remote_folder(), None);
        s.folder = FolderSelection::Id(9);
        assert_eq!(s.active_remote_folder(), Some("Trash"));
        assert!(s.is_viewing_trash());
        s.folder = FolderSelection::Id(1);
        assert_eq!(s.active_remote_folder(), None);
        s.folder = FolderSelection::Local;
        assert!(!s.can_use_trash_preview());
    }

    #[test]
    fn upsert_updates_badges() {
        let mut s = InboxState::new(&bootstrap());
        let f: Folder = serde_json::from_value(json!({"id": 1, "unread_count": 0})).unwrap();
        s.upsert_folder(&f);
        assert_eq!(s.folder_badge(1), None);
        assert_eq!(s.folders[0].display_name.as_deref(), Some("INBOX"));
        let f: Folder = serde_json::from_value(json!({"id": 12, "unread_count": 4, "display_name": "Projetos"})).unwrap();
        s.upsert_folder(&f);
        assert_eq!(s.folder_badge(12).as_deref(), Some("4"));
    }

    #[test]
    fn header_reflects_open_thread() {
        let mut s = InboxState::new(&bootstrap());
        s.thread_id = Some(4);
        let t: Thread = serde_json::from_value(json!({
            "id": 4, "subject": "Orçamento", "unread_count": 2,
            "flags": ["flagged"], "folder": {"id": 1, "type": "inbox"}
        }))
        .unwrap();
        s.set_current_thread(Some(t));
        let h = s.header();
        assert_eq!(h.subtitle, "Conversa #4 · Caixa de entrada");
        assert_eq!(h.unread, Some(2));
        assert_eq!(h.updated_label.as_deref(), Some("Sem data"));
        assert_eq!(h.star_label, "Remover estrela");
        assert!(h.move_options.iter().any(|o| o.folder_id == 1 && o.selected));

        let other: Thread = serde_json::from_value(json!({"id": 8})).unwrap();
        s.update_header_if_current(Some(&other));
        assert_eq!(s.current_thread.as_ref().map(|t| t.id), Some(4));
    }
}
