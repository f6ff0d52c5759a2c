//! The inbox view model: thread list, search, selection, the open thread and
//! its message detail, and the inline composer.
//!
//! Everything runs on one owner (`&mut self`). Overlapping refreshes are not
//! coordinated, the last response wins; only debounced work (search, the
//! sync follow-up and the composer timers) drops superseded results.

use chrono::Local;

use super::filters::{QuickFilter, SearchFilters};
use super::grouping::{render_thread_list, RenderContext, ThreadListView};
use super::selection::{ClickOutcome, Modifiers, SelectionModel};
use super::state::{FolderSelection, InboxState, ThreadHeader};
use crate::api::{ComposeMode, InboxApi, ThreadAction, ThreadListQuery};
use crate::compose::{
    derive_preset, launch_standalone_window, Composer, ComposerEvent, ComposerKind, ComposerPreset,
    ReplyContext, ReplyMode,
};
use crate::config::InboxBootstrap;
use crate::debounce::{Debouncer, SEARCH_DELAY, SYNC_FOLLOW_UP_DELAY, SYNC_STATUS_RESET_DELAY};
use crate::detail::{MessageDetail, DETAIL_LOAD_FAILED, DETAIL_PLACEHOLDER};
use crate::error::{Error, Result};
use crate::models::{
    AccountId, FolderId, MessageId, Thread, ThreadActionResult, ThreadId, ThreadList, ThreadMessages,
    LOCAL_FOLDER_LABEL,
};
use crate::render::open_link;
use crate::status::{AlertQueue, StatusLine};
use crate::store::LocalThreadCache;

pub const SEARCH_FAILED: &str = "Erro ao buscar threads.";

/// Something a timer finished while the inbox sat idle.
#[derive(Debug, Clone, PartialEq)]
pub enum InboxEvent {
    /// A debounced search came back and the list was redrawn.
    SearchApplied,
    /// A debounced search came back after search mode was left; the list
    /// was left alone.
    SearchDropped,
    /// The refresh that follows a queued background sync ran.
    FollowUpRefreshed,
    /// The sync result faded back to the account's availability text.
    SyncStatusReset,
    Composer(ComposerEvent),
}

pub struct InboxController {
    pub(super) state: InboxState,
    pub(super) api: InboxApi,
    pub(super) alerts: AlertQueue,
    pub(super) local: LocalThreadCache,
    pub(super) selection: SelectionModel,
    pub(super) search: Debouncer<Result<ThreadList>>,
    pub(super) follow_up: Debouncer<()>,
    pub(super) sync_reset: Debouncer<()>,
    pub(super) composer: Composer,
    pub(super) detail: Option<MessageDetail>,
    pub(super) detail_error: Option<&'static str>,
    pub(super) sync_status: StatusLine,
    pub(super) sync_busy: bool,
    pub(super) trash_status: StatusLine,
    pub(super) trash_busy: bool,
    pub(super) trash_preview_open: bool,
    pub(super) bulk_busy: bool,
    base_url: String,
}

impl InboxController {
    pub fn new(bootstrap: &InboxBootstrap, api: InboxApi, local: LocalThreadCache) -> Self {
        let state = InboxState::new(bootstrap);
        let composer = Composer::new(ComposerKind::Inline, api.clone(), state.default_account());
        let mut controller = InboxController {
            alerts: api.client().alerts().clone(),
            state,
            api,
            local,
            selection: SelectionModel::new(),
            search: Debouncer::new(SEARCH_DELAY),
            follow_up: Debouncer::new(SYNC_FOLLOW_UP_DELAY),
            sync_reset: Debouncer::new(SYNC_STATUS_RESET_DELAY),
            composer,
            detail: None,
            detail_error: None,
            sync_status: StatusLine::default(),
            sync_busy: false,
            trash_status: StatusLine::default(),
            trash_busy: false,
            trash_preview_open: false,
            bulk_busy: false,
            base_url: String::new(),
        };
        controller.refresh_sync_availability();
        controller.reset_trash_status();
        controller
    }

    /// Scheme and host used when handing pages to the system browser.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// First load: honour `autoCompose`, fetch the list and reopen the
    /// thread the page was opened on.
    pub async fn init(&mut self) {
        if self.state.auto_compose {
            self.state.auto_compose = false;
            self.open_composer();
        }
        self.refresh_threads().await;
        if let Some(thread_id) = self.state.thread_id {
            if self.state.current_messages.is_empty() {
                self.load_thread_messages(thread_id).await;
            }
        }
    }

    /// Cancel every pending debounced task and timer.
    pub fn teardown(&mut self) {
        self.search.cancel();
        self.follow_up.cancel();
        self.sync_reset.cancel();
        self.composer.cancel_timers();
    }

    // -- accessors -----------------------------------------------------------

    pub fn state(&self) -> &InboxState {
        &self.state
    }

    pub fn api(&self) -> &InboxApi {
        &self.api
    }

    pub fn alerts(&self) -> &AlertQueue {
        &self.alerts
    }

    pub fn list(&self) -> &ThreadListView {
        &self.state.list
    }

    pub fn header(&self) -> ThreadHeader {
        self.state.header()
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn local_threads(&self) -> &LocalThreadCache {
        &self.local
    }

    /// Badge of the local folder; hidden when empty.
    pub fn local_badge(&self) -> Option<String> {
        (!self.local.is_empty()).then(|| self.local.len().to_string())
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn detail(&self) -> Option<&MessageDetail> {
        self.detail.as_ref()
    }

    pub fn detail_mut(&mut self) -> Option<&mut MessageDetail> {
        self.detail.as_mut()
    }

    /// Text shown instead of the detail panel, if any.
    pub fn detail_notice(&self) -> Option<&'static str> {
        match (&self.detail, self.detail_error) {
            (Some(_), _) => None,
            (None, Some(error)) => Some(error),
            (None, None) => Some(DETAIL_PLACEHOLDER),
        }
    }

    pub fn search_status(&self) -> String {
        self.state.search_status()
    }

    // -- thread list ---------------------------------------------------------

    /// Reload whatever the list currently shows.
    pub async fn refresh_threads(&mut self) {
        if self.state.is_local() {
            if self.state.search_mode {
                self.run_local_search();
            } else {
                self.render_local();
            }
            return;
        }
        if self.state.search_mode {
            self.run_search().await;
        } else {
            self.load_threads(false).await;
        }
    }

    pub async fn load_threads(&mut self, reset_limit: bool) {
        if reset_limit {
            self.state.thread_limit = self.state.page_size;
        }
        if self.state.is_local() {
            self.render_local();
            return;
        }
        let limit = self.state.thread_limit;
        let query = ThreadListQuery {
            account_id: self.state.account_id,
            folder_id: self.state.folder_id(),
            limit,
            include_folders: true,
        };
        match self.api.list_threads(query).await {
            Ok(list) => {
                for folder in &list.folders {
                    self.state.upsert_folder(folder);
                }
                self.state.has_more = list.threads.len() >= limit as usize;
                self.state.search_total = None;
                self.render(list.threads);
            }
            Err(e) => log::error!("Inbox thread fetch failed: {}", e),
        }
    }

    /// Grow the page and fetch again.
    pub async fn load_more(&mut self) {
        self.state.thread_limit += self.state.page_size;
        if self.state.is_local() {
            self.render_local();
        } else if self.state.search_mode {
            self.run_search().await;
        } else {
            self.load_threads(false).await;
        }
    }

    pub(super) fn render(&mut self, threads: Vec<Thread>) {
        let query = self.state.search_filters.query.clone();
        let ctx = RenderContext {
            folder_id: self.state.folder_id(),
            search_mode: self.state.search_mode,
            query: &query,
            active_thread: self.state.thread_id,
            selected: self.selection.selected(),
            has_more: self.state.has_more,
            limit: self.state.thread_limit,
        };
        let (view, visible) = render_thread_list(&threads, &ctx, &Local::now());
        self.selection.prune(&view.visible_ids);
        self.state.visible = visible.into_iter().map(|t| (t.id, t)).collect();
        self.state.list = view;
        self.sync_card_flags();
    }

    /// Bring the cards' active/selected marks in line with the model.
    pub(super) fn sync_card_flags(&mut self) {
        let active = self.state.thread_id;
        for card in self.state.list.groups.iter_mut().flat_map(|g| g.cards.iter_mut()) {
            card.is_active = active == Some(card.id);
            card.is_selected = self.selection.contains(card.id);
        }
    }

    /// Show the local folder. Leaves search mode and closes the open thread.
    pub(super) fn render_local(&mut self) {
        self.state.folder = FolderSelection::Local;
        self.leave_search_mode();
        self.state.thread_limit = self.state.page_size;
        self.selection.clear();
        self.close_thread();
        self.state.has_more = false;
        let threads = self.local.threads().to_vec();
        self.state.search_total = Some(threads.len());
        self.render(threads);
        self.trash_preview_open = false;
    }

    /// Back to the folder view. A search still waiting on its debounce is
    /// dropped with it.
    pub(super) fn leave_search_mode(&mut self) {
        self.state.search_mode = false;
        self.search.cancel();
    }

    fn close_thread(&mut self) {
        self.state.thread_id = None;
        self.state.selected_message_id = None;
        self.state.set_current_thread(None);
        self.detail = None;
        self.detail_error = None;
    }

    // -- search --------------------------------------------------------------

    fn search_params(&self) -> Vec<(String, String)> {
        self.state.search_filters.to_params(
            self.state.account_id,
            self.state.folder_id(),
            self.state.thread_limit,
        )
    }

    /// Query the server with the current filters, right away.
    pub async fn run_search(&mut self) {
        self.search.cancel();
        if self.state.is_local() {
            self.run_local_search();
            return;
        }
        let result = self.api.search_threads(self.search_params()).await;
        self.apply_search(result);
    }

    fn apply_search(&mut self, result: Result<ThreadList>) {
        match result {
            Ok(list) => {
                let count = list.threads.len();
                let total = list
                    .meta
                    .and_then(|m| m.total)
                    .and_then(|t| usize::try_from(t).ok())
                    .unwrap_or(count);
                self.state.has_more = count >= self.state.thread_limit as usize;
                self.state.search_total = Some(total);
                self.state.search_error = None;
                self.render(list.threads);
            }
            Err(e) => {
                log::error!("Inbox search request failed: {}", e);
                self.state.search_error = Some(SEARCH_FAILED);
                self.state.visible.clear();
                self.selection.clear();
                self.state.list = ThreadListView {
                    empty_message: Some(SEARCH_FAILED),
                    ..Default::default()
                };
            }
        }
    }

    /// Filter the local folder in memory; it has no server to ask.
    pub fn run_local_search(&mut self) {
        let filters = &self.state.search_filters;
        let matches: Vec<Thread> = self
            .local
            .threads()
            .iter()
            .filter(|t| filters.matches_local(t))
            .cloned()
            .collect();
        self.state.has_more = false;
        self.state.search_total = Some(matches.len());
        self.render(matches);
    }

    /// React to edited filters. Typing goes through the 350 ms debounce;
    /// toggles and buttons search immediately.
    async fn on_filters_changed(&mut self, debounce: bool) {
        self.state.search_filters = std::mem::take(&mut self.state.search_filters).normalized();
        self.state.thread_limit = self.state.page_size;
        let active = self.state.search_filters.is_active();
        self.state.search_mode = active;
        self.state.search_total = None;

        if !active {
            self.search.cancel();
            self.refresh_threads().await;
            return;
        }
        if debounce && !self.state.is_local() {
            let api = self.api.clone();
            let params = self.search_params();
            self.search
                .schedule(move || async move { api.search_threads(params).await });
        } else {
            self.run_search().await;
        }
    }

    pub async fn set_search_query(&mut self, query: &str) {
        self.state.search_filters.query = query.to_string();
        self.on_filters_changed(true).await;
    }

    pub async fn set_search_participant(&mut self, participant: &str) {
        self.state.search_filters.participant = participant.to_string();
        self.on_filters_changed(true).await;
    }

    /// Replace every filter at once, e.g. from the advanced search panel.
    pub async fn set_search_filters(&mut self, filters: SearchFilters) {
        self.state.search_filters = filters;
        self.on_filters_changed(false).await;
    }

    /// Toggle a quick filter and search synchronously.
    pub async fn apply_quick_filter(&mut self, key: &str, enabled: bool) -> bool {
        let Some(filter) = QuickFilter::parse(key) else {
            return false;
        };
        filter.apply(&mut self.state.search_filters, enabled);
        self.on_filters_changed(false).await;
        true
    }

    /// `aria-pressed` of a quick filter button.
    pub fn quick_filter_pressed(&self, key: &str) -> &'static str {
        QuickFilter::parse(key)
            .map(|f| f.aria_pressed(&self.state.search_filters))
            .unwrap_or("false")
    }

    pub async fn clear_search(&mut self) {
        self.state.search_filters = SearchFilters::default();
        self.on_filters_changed(false).await;
    }

    // -- timers --------------------------------------------------------------

    /// Wait for the next debounced search, sync follow-up or composer timer
    /// and apply it. `None` when nothing is scheduled.
    pub async fn next_event(&mut self) -> Option<InboxEvent> {
        let search_pending = self.search.is_pending();
        let follow_up_pending = self.follow_up.is_pending();
        let reset_pending = self.sync_reset.is_pending();
        let composer_pending = self.composer.has_pending_timers();
        if !search_pending && !follow_up_pending && !reset_pending && !composer_pending {
            return None;
        }
        enum Fired {
            Search(Result<ThreadList>),
            FollowUp,
            SyncReset,
            Composer(ComposerEvent),
        }
        let fired = tokio::select! {
            Some(result) = self.search.next(), if search_pending => Fired::Search(result),
            Some(()) = self.follow_up.next(), if follow_up_pending => Fired::FollowUp,
            Some(()) = self.sync_reset.next(), if reset_pending => Fired::SyncReset,
            Some(event) = self.composer.next_event(), if composer_pending => Fired::Composer(event),
            else => return None,
        };
        Some(match fired {
            Fired::Search(_) if !self.state.search_mode => {
                log::debug!("Dropping search result, search mode was left");
                InboxEvent::SearchDropped
            }
            Fired::Search(result) => {
                self.apply_search(result);
                InboxEvent::SearchApplied
            }
            Fired::FollowUp => {
                self.refresh_threads().await;
                InboxEvent::FollowUpRefreshed
            }
            Fired::SyncReset => {
                if !self.sync_busy {
                    self.refresh_sync_availability();
                }
                InboxEvent::SyncStatusReset
            }
            Fired::Composer(event) => InboxEvent::Composer(event),
        })
    }

    // -- folders and accounts ------------------------------------------------

    pub async fn select_folder(&mut self, folder: FolderSelection) {
        self.leave_search_mode();
        self.state.thread_limit = self.state.page_size;
        self.trash_preview_open = false;
        if folder == FolderSelection::Local {
            self.render_local();
            return;
        }
        self.state.folder = match folder {
            FolderSelection::Id(id) => FolderSelection::from_id(Some(id)),
            other => other,
        };
        self.refresh_threads().await;
    }

    pub async fn open_local_folder(&mut self) {
        self.select_folder(FolderSelection::Local).await;
    }

    /// Switch mailbox account. The folder resets to "all".
    pub async fn select_account(&mut self, account_id: Option<AccountId>) {
        self.state.account_id = account_id.filter(|id| *id > 0);
        self.composer.set_default_account(self.state.default_account());
        self.state.folder = FolderSelection::All;
        self.leave_search_mode();
        self.state.thread_limit = self.state.page_size;
        self.selection.clear();
        self.close_thread();
        self.refresh_sync_availability();
        self.refresh_threads().await;
    }

    // -- open thread and messages --------------------------------------------

    pub async fn load_thread_messages(&mut self, thread_id: ThreadId) {
        self.state.selected_message_id = None;
        self.detail = None;
        self.detail_error = None;
        match self.api.thread_messages(thread_id).await {
            Ok(payload) => self.show_thread_messages(payload).await,
            Err(e) => log::error!("Inbox messages fetch failed: {}", e),
        }
    }

    async fn show_thread_messages(&mut self, payload: ThreadMessages) {
        self.state.set_current_thread(payload.thread);
        self.state.current_messages = payload.messages;
        let ids: Vec<MessageId> = self.state.current_messages.iter().map(|m| m.id).collect();
        let Some(last) = ids.last().copied() else {
            self.state.selected_message_id = None;
            return;
        };
        let selected = self
            .state
            .selected_message_id
            .filter(|id| ids.contains(id))
            .unwrap_or(last);
        self.select_message(selected).await;
    }

    pub async fn select_message(&mut self, message_id: MessageId) {
        self.state.selected_message_id = Some(message_id);
        self.load_message_detail(message_id).await;
    }

    pub async fn load_message_detail(&mut self, message_id: MessageId) {
        match self.api.message_detail(message_id).await {
            Ok(payload) => {
                self.detail_error = None;
                self.detail = payload.message.map(|message| {
                    let order: Vec<MessageId> = self.state.current_messages.iter().map(|m| m.id).collect();
                    MessageDetail::build(
                        &message,
                        &order,
                        self.api.routes(),
                        &self.state.search_filters.query,
                    )
                });
            }
            Err(e) => {
                log::error!("Inbox message detail fetch failed: {}", e);
                self.detail = None;
                self.detail_error = Some(DETAIL_LOAD_FAILED);
            }
        }
    }

    /// Step to the previous (`-1`) or next (`1`) message of the thread.
    pub async fn show_adjacent_message(&mut self, offset: isize) -> bool {
        let target = match (&self.detail, offset) {
            (Some(d), o) if o < 0 => d.previous_id,
            (Some(d), _) => d.next_id,
            (None, _) => None,
        };
        match target {
            Some(id) => {
                self.select_message(id).await;
                true
            }
            None => false,
        }
    }

    // -- selection -----------------------------------------------------------

    /// A click on a thread card. Plain clicks open the thread.
    pub async fn click_thread(&mut self, thread_id: ThreadId, modifiers: Modifiers) -> ClickOutcome {
        let outcome = self
            .selection
            .click(thread_id, modifiers, &self.state.list.visible_ids);
        if let ClickOutcome::Open(id) = outcome {
            self.state.thread_id = Some(id);
            self.sync_card_flags();
            self.load_thread_messages(id).await;
        } else {
            self.sync_card_flags();
        }
        outcome
    }

    /// The card checkbox changed.
    pub fn toggle_thread_selection(&mut self, thread_id: ThreadId, checked: bool, shift: bool) {
        self.selection
            .checkbox(thread_id, checked, shift, &self.state.list.visible_ids);
        self.sync_card_flags();
    }

    pub fn select_all_visible(&mut self) {
        self.selection.select_all(&self.state.list.visible_ids);
        self.sync_card_flags();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.sync_card_flags();
    }

    /// Label of the bulk button that saves to, or removes from, the local folder.
    pub fn local_action_label(&self) -> String {
        if self.state.is_local() {
            format!("Remover da {LOCAL_FOLDER_LABEL}")
        } else {
            format!("Salvar na {LOCAL_FOLDER_LABEL}")
        }
    }

    // -- single-thread actions -----------------------------------------------

    /// Post `action` for `thread_id`, or for the open thread.
    pub async fn perform_thread_action(
        &mut self,
        action: ThreadAction,
        thread_id: Option<ThreadId>,
    ) -> Result<ThreadActionResult> {
        let target = thread_id
            .or(self.state.thread_id)
            .ok_or_else(|| Error::Validation("Thread alvo inválida.".into()))?;
        self.api.thread_action(target, action).await
    }

    pub(super) fn sync_badges(&mut self, result: &ThreadActionResult) {
        for folder in result.touched_folders() {
            self.state.upsert_folder(folder);
        }
    }

    /// Run an action on the open thread, take the returned header and resync.
    async fn act_on_current(&mut self, action: ThreadAction, failure: &str) -> bool {
        if self.state.thread_id.is_none() {
            return false;
        }
        match self.perform_thread_action(action, None).await {
            Ok(result) => {
                self.sync_badges(&result);
                if let Some(thread) = result.thread {
                    self.state.set_current_thread(Some(thread));
                }
                self.refresh_threads().await;
                true
            }
            Err(e) => {
                log::error!("Inbox {} action failed: {}", action.name(), e);
                self.alerts.error(e.user_message(failure));
                false
            }
        }
    }

    pub async fn star_current(&mut self) -> bool {
        let starred = self.state.current_thread.as_ref().is_some_and(Thread::is_starred);
        self.act_on_current(ThreadAction::Star { starred: !starred }, "Falha ao favoritar.")
            .await
    }

    pub async fn archive_current(&mut self) -> bool {
        self.act_on_current(ThreadAction::Archive, "Falha ao arquivar.").await
    }

    pub async fn trash_current(&mut self) -> bool {
        let done = self
            .act_on_current(ThreadAction::Trash, "Falha ao enviar para lixeira.")
            .await;
        if done {
            self.load_trash_preview().await;
        }
        done
    }

    /// Move the open thread. Moving into its own folder does nothing.
    pub async fn move_current(&mut self, folder_id: FolderId) -> bool {
        if folder_id <= 0 {
            return false;
        }
        let current = self.state.current_thread.as_ref().and_then(Thread::folder_id);
        if current == Some(folder_id) {
            return false;
        }
        let done = self
            .act_on_current(ThreadAction::Move { folder_id }, "Falha ao mover.")
            .await;
        if done {
            self.load_trash_preview().await;
        }
        done
    }

    pub async fn mark_read_current(&mut self) -> bool {
        let Some(thread_id) = self.state.thread_id else {
            return false;
        };
        match self.api.mark_thread_read(thread_id).await {
            Ok(result) => {
                self.sync_badges(&result);
                if let Some(thread) = result.thread {
                    self.state.set_current_thread(Some(thread));
                }
                self.refresh_threads().await;
                true
            }
            Err(e) => {
                log::error!("Inbox mark-read request failed: {}", e);
                self.alerts
                    .error(e.user_message("Não foi possível atualizar a thread."));
                false
            }
        }
    }

    /// Star toggle on a list row. Failures are only logged.
    pub async fn inline_star(&mut self, thread_id: ThreadId, currently_starred: bool) {
        let action = ThreadAction::Star {
            starred: !currently_starred,
        };
        match self.perform_thread_action(action, Some(thread_id)).await {
            Ok(result) => {
                self.sync_badges(&result);
                self.state.update_header_if_current(result.thread.as_ref());
                self.refresh_threads().await;
            }
            Err(e) => log::error!("Inline star failed: {}", e),
        }
    }

    /// Trash button on a list row. Failures are only logged.
    pub async fn inline_trash(&mut self, thread_id: ThreadId) {
        match self.perform_thread_action(ThreadAction::Trash, Some(thread_id)).await {
            Ok(result) => {
                self.sync_badges(&result);
                self.state.update_header_if_current(result.thread.as_ref());
                self.refresh_threads().await;
                self.load_trash_preview().await;
            }
            Err(e) => log::error!("Inline trash failed: {}", e),
        }
    }

    // -- windows -------------------------------------------------------------

    fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn message_window_url(&self, message_id: MessageId) -> String {
        self.absolute_url(&self.api.routes().message_window(message_id))
    }

    pub fn open_message_window(&self, message_id: MessageId) -> Result<()> {
        open_link(&self.message_window_url(message_id))
    }

    /// Open a thread's selected (or newest) message in its own window,
    /// loading the thread first when needed. `false` when it has no messages.
    pub async fn open_thread_window(&mut self, thread_id: ThreadId) -> Result<bool> {
        let previous = self.state.thread_id;
        self.state.thread_id = Some(thread_id);
        self.sync_card_flags();
        let needs_load = previous != Some(thread_id)
            || self.state.current_messages.is_empty()
            || self.state.selected_message_id.is_none();
        if needs_load {
            self.load_thread_messages(thread_id).await;
        }
        let target = self
            .state
            .selected_message_id
            .or_else(|| self.state.current_messages.last().map(|m| m.id));
        match target {
            Some(id) => {
                self.open_message_window(id)?;
                Ok(true)
            }
            None => {
                log::warn!("Thread window launch skipped: no messages available.");
                Ok(false)
            }
        }
    }

    // -- composer ------------------------------------------------------------

    pub fn open_composer(&mut self) {
        self.composer.open(ComposerPreset::default());
    }

    /// Reply, reply-all or forward from the open thread. `message_id` picks
    /// the message to answer; otherwise the newest inbound one is used.
    pub fn open_reply(&mut self, mode: ReplyMode, message_id: Option<MessageId>) -> bool {
        let (Some(thread), Some(_)) = (&self.state.current_thread, self.state.thread_id) else {
            return false;
        };
        let message = message_id.and_then(|id| self.state.current_messages.iter().find(|m| m.id == id));
        let ctx = ReplyContext {
            thread,
            messages: &self.state.current_messages,
            selected_account: self.state.account_id,
            accounts: &self.state.accounts,
        };
        let preset = derive_preset(mode, &ctx, message);
        self.composer.open(preset);
        true
    }

    /// Send or save the inline composer, then resync the list. A sent
    /// message's thread is opened.
    pub async fn submit_composer(&mut self, mode: ComposeMode) -> Result<()> {
        let result = self.composer.submit(mode).await?;
        let thread_id = result.thread.as_ref().map(|t| t.id).filter(|id| *id > 0);
        if let Some(thread) = result.thread {
            self.state.set_current_thread(Some(thread));
        }
        self.refresh_threads().await;
        if let (ComposeMode::Send, Some(id)) = (mode, thread_id) {
            self.state.thread_id = Some(id);
            self.sync_card_flags();
            self.load_thread_messages(id).await;
        }
        Ok(())
    }

    /// Hand composing over to the standalone window.
    pub fn launch_compose_window(&mut self) -> Result<()> {
        self.composer.close();
        launch_standalone_window(&self.base_url, &self.api.routes().compose_window)
    }
}
