use chrono::{DateTime, Local};

use super::contacts::{apply_audience, ContactLookup, SuggestionKey};
use super::preset::{ComposerPreset, ForwardAttachment};
use crate::api::{ComposeMode, InboxApi};
use crate::debounce::{Debouncer, AUTOSAVE_DELAY, CLOSE_AFTER_SEND_DELAY};
use crate::error::{Error, Result};
use crate::format::{format_bytes, format_clock, plain_text_to_html};
use crate::models::{AccountId, ComposeResult, MessageId, ThreadId};
use crate::render::{html_to_plain_text, open_link};
use crate::status::{StatusLine, Tone};
use crate::transport::{FileUpload, FormData};

/// Manual plus inherited attachments allowed on one message.
pub const MAX_COMPOSER_ATTACHMENTS: usize = 20;

pub const NO_ATTACHMENTS: &str = "Nenhum anexo selecionado.";
pub const NO_INHERITED_ATTACHMENTS: &str = "Nenhum anexo herdado.";

/// Where the composer lives. All three share one state machine; they differ
/// in wording and in what happens after a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerKind {
    /// Slide-in panel of the inbox. Closes itself after sending.
    Inline,
    /// The separate compose window, with autocomplete, groups and scheduling.
    Standalone,
    /// Reply panel under a message opened on its own page.
    DetailReply,
}

struct Wording {
    sending: &'static str,
    drafting: &'static str,
    sent: &'static str,
    drafted: &'static str,
    failed: &'static str,
}

impl ComposerKind {
    fn wording(&self) -> Wording {
        match self {
            ComposerKind::Inline => Wording {
                sending: "Enviando mensagem...",
                drafting: "Salvando rascunho...",
                sent: "Mensagem enviada!",
                drafted: "Rascunho salvo.",
                failed: "Não foi possível processar a mensagem.",
            },
            ComposerKind::Standalone => Wording {
                sending: "Enviando mensagem...",
                drafting: "Salvando rascunho...",
                sent: "Mensagem enviada.",
                drafted: "Rascunho salvo com sucesso.",
                failed: "Falha ao processar a solicitação.",
            },
            ComposerKind::DetailReply => Wording {
                sending: "Enviando...",
                drafting: "Enviando...",
                sent: "Mensagem enviada com sucesso.",
                drafted: "Rascunho salvo com sucesso.",
                failed: "Não foi possível enviar a mensagem.",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    Open,
    Sending,
    Drafting,
}

/// Text inputs of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    To,
    Cc,
    Bcc,
    Subject,
    /// `datetime-local` value of the schedule input.
    ScheduledFor,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeFields {
    pub account_id: Option<AccountId>,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
    pub scheduled_for: String,
}

impl ComposeFields {
    fn has_recipients(&self) -> bool {
        [&self.to, &self.cc, &self.bcc].iter().any(|v| !v.trim().is_empty())
    }

    fn has_body(&self) -> bool {
        !self.body_text.trim().is_empty() || !self.body_html.trim().is_empty()
    }
}

/// A saved message template offered by the compose window.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeTemplate {
    pub id: String,
    pub label: String,
    pub subject: String,
    pub html: String,
}

impl ComposeTemplate {
    /// Templates with only plain text get it wrapped as HTML.
    pub fn new(id: &str, label: Option<&str>, subject: &str, html: Option<&str>, text: Option<&str>) -> Self {
        let html = match html.filter(|h| !h.trim().is_empty()) {
            Some(h) => h.to_string(),
            None => text.map(plain_text_to_html).unwrap_or_default(),
        };
        ComposeTemplate {
            id: id.to_string(),
            label: label.unwrap_or("Modelo").to_string(),
            subject: subject.to_string(),
            html,
        }
    }
}

/// Timer-driven things that happened while the composer sat idle.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposerEvent {
    Autosaved(Option<MessageId>),
    AutosaveFailed,
    /// The autosave timer fired but there was nothing worth saving.
    AutosaveSkipped,
    Closed,
    SuggestionsUpdated,
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

pub struct Composer {
    kind: ComposerKind,
    api: InboxApi,
    phase: Phase,
    fields: ComposeFields,
    default_account: Option<AccountId>,
    thread_id: Option<ThreadId>,
    draft_id: Option<MessageId>,
    cc_visible: bool,
    bcc_visible: bool,
    schedule_visible: bool,
    files: Vec<FileUpload>,
    forward: Vec<ForwardAttachment>,
    forward_pending: bool,
    dirty: bool,
    manual_busy: bool,
    last_saved_at: Option<DateTime<Local>>,
    status: StatusLine,
    audience_status: StatusLine,
    templates: Vec<ComposeTemplate>,
    contacts: ContactLookup,
    autosave: Debouncer<()>,
    close_timer: Debouncer<()>,
}

impl Composer {
    pub fn new(kind: ComposerKind, api: InboxApi, default_account: Option<AccountId>) -> Self {
        let contacts = ContactLookup::new(api.clone());
        Composer {
            kind,
            api,
            phase: Phase::Closed,
            fields: ComposeFields {
                account_id: default_account,
                ..Default::default()
            },
            default_account,
            thread_id: None,
            draft_id: None,
            cc_visible: false,
            bcc_visible: false,
            schedule_visible: false,
            files: Vec::new(),
            forward: Vec::new(),
            forward_pending: false,
            dirty: false,
            manual_busy: false,
            last_saved_at: None,
            status: StatusLine::default(),
            audience_status: StatusLine::default(),
            templates: Vec::new(),
            contacts,
            autosave: Debouncer::new(AUTOSAVE_DELAY),
            close_timer: Debouncer::new(CLOSE_AFTER_SEND_DELAY),
        }
    }

    pub fn with_templates(mut self, templates: Vec<ComposeTemplate>) -> Self {
        self.templates = templates.into_iter().filter(|t| !t.id.is_empty()).collect();
        self
    }

    // -- accessors -----------------------------------------------------------

    pub fn kind(&self) -> ComposerKind {
        self.kind
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != Phase::Closed
    }

    pub fn fields(&self) -> &ComposeFields {
        &self.fields
    }

    pub fn thread_id(&self) -> Option<ThreadId> {
        self.thread_id
    }

    pub fn draft_id(&self) -> Option<MessageId> {
        self.draft_id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_busy(&self) -> bool {
        self.manual_busy
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn audience_status(&self) -> &StatusLine {
        &self.audience_status
    }

    pub fn rows_visible(&self) -> (bool, bool, bool) {
        (self.cc_visible, self.bcc_visible, self.schedule_visible)
    }

    pub fn forward_attachments(&self) -> &[ForwardAttachment] {
        &self.forward
    }

    pub fn templates(&self) -> &[ComposeTemplate] {
        &self.templates
    }

    pub fn contacts(&self) -> &ContactLookup {
        &self.contacts
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn has_pending_timers(&self) -> bool {
        self.autosave.is_pending() || self.close_timer.is_pending() || self.contacts.is_pending()
    }

    /// Drop every scheduled autosave, close and lookup.
    pub fn cancel_timers(&mut self) {
        self.autosave.cancel();
        self.close_timer.cancel();
        self.contacts.cancel();
    }

    pub fn set_default_account(&mut self, account_id: Option<AccountId>) {
        self.default_account = account_id;
        if self.fields.account_id.is_none() {
            self.fields.account_id = account_id;
        }
    }

    // -- open / close --------------------------------------------------------

    /// Reset the form, apply `preset` and show the composer.
    pub fn open(&mut self, preset: ComposerPreset) {
        self.close_timer.cancel();
        self.reset_form();
        self.phase = Phase::Open;
        self.thread_id = preset.thread_id;
        self.draft_id = preset.draft_id;
        if preset.account_id.is_some() {
            self.fields.account_id = preset.account_id;
        }
        self.fields.to = preset.to;
        if !preset.cc.is_empty() {
            self.cc_visible = true;
            self.fields.cc = preset.cc;
        }
        if !preset.bcc.is_empty() {
            self.bcc_visible = true;
            self.fields.bcc = preset.bcc;
        }
        self.fields.subject = preset.subject;
        if !preset.body_html.trim().is_empty() {
            self.load_body_html(&preset.body_html);
        } else if !preset.body.trim().is_empty() {
            self.load_body_text(&preset.body);
        }
        self.status.clear();
        if self.kind == ComposerKind::DetailReply {
            self.status.set("Pronto para enviar.", Tone::Info);
        }

        let mut inherited = preset.forward_attachments;
        inherited.truncate(MAX_COMPOSER_ATTACHMENTS);
        self.forward_pending = inherited.iter().any(|a| a.id > 0);
        self.forward = inherited;
        if self.forward_pending {
            self.mark_dirty();
        }
    }

    pub fn close(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }
        self.phase = Phase::Closed;
        self.close_timer.cancel();
        self.reset_form();
        if self.kind == ComposerKind::DetailReply {
            self.status.set("Selecione uma ação para começar.", Tone::Info);
        }
    }

    fn reset_form(&mut self) {
        self.fields = ComposeFields {
            account_id: self.default_account,
            ..Default::default()
        };
        self.cc_visible = false;
        self.bcc_visible = false;
        self.schedule_visible = false;
        self.dirty = false;
        self.autosave.cancel();
        self.contacts.cancel();
        self.draft_id = None;
        self.thread_id = None;
        self.status.clear();
        self.audience_status.clear();
        self.files.clear();
        self.forward.clear();
        self.forward_pending = false;
    }

    /// Clear the standalone form without closing it.
    pub fn discard(&mut self) {
        let phase = self.phase;
        self.reset_form();
        self.phase = phase;
        self.status.set("Rascunho descartado.", Tone::Info);
    }

    // -- edits ---------------------------------------------------------------

    fn mark_dirty(&mut self) {
        if !self.is_open() {
            return;
        }
        self.dirty = true;
        if !self.manual_busy {
            self.status.set("Alterações não salvas.", Tone::Info);
        }
        self.schedule_autosave();
    }

    fn schedule_autosave(&mut self) {
        if !self.is_open() || self.manual_busy {
            return;
        }
        self.autosave.schedule_tick();
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::To => {
                if self.kind == ComposerKind::Standalone {
                    self.contacts.on_input(&value);
                }
                self.fields.to = value;
            }
            Field::Cc => self.fields.cc = value,
            Field::Bcc => self.fields.bcc = value,
            Field::Subject => self.fields.subject = value,
            Field::ScheduledFor => self.fields.scheduled_for = value,
        }
        self.mark_dirty();
    }

    pub fn set_account(&mut self, account_id: Option<AccountId>) {
        if account_id.is_some() {
            self.fields.account_id = account_id;
            self.mark_dirty();
        }
    }

    fn load_body_text(&mut self, text: &str) {
        self.fields.body_text = text.to_string();
        self.fields.body_html = plain_text_to_html(text);
    }

    fn load_body_html(&mut self, html: &str) {
        self.fields.body_text = html_to_plain_text(html);
        self.fields.body_html = html.to_string();
    }

    /// Body typed in a plain editor.
    pub fn set_body_text(&mut self, text: &str) {
        self.load_body_text(text);
        self.mark_dirty();
    }

    /// Body produced by a rich-text editor.
    pub fn set_body_html(&mut self, html: &str) {
        self.load_body_html(html);
        self.mark_dirty();
    }

    pub fn toggle_cc(&mut self) -> bool {
        self.cc_visible = !self.cc_visible;
        self.cc_visible
    }

    pub fn toggle_bcc(&mut self) -> bool {
        self.bcc_visible = !self.bcc_visible;
        self.bcc_visible
    }

    pub fn toggle_schedule(&mut self) -> bool {
        self.schedule_visible = !self.schedule_visible;
        self.schedule_visible
    }

    /// Replace the manually picked files. Over the cap the selection is
    /// dropped and the status explains why.
    pub fn set_attachments(&mut self, files: Vec<FileUpload>) -> bool {
        let total = files.len() + self.forward.len();
        if total > MAX_COMPOSER_ATTACHMENTS {
            self.status.set(
                format!("Limite de {MAX_COMPOSER_ATTACHMENTS} anexos. Você selecionou {total}."),
                Tone::Error,
            );
            self.files.clear();
            return false;
        }
        self.files = files;
        self.mark_dirty();
        true
    }

    /// Lines of the attachment summary, inherited originals first.
    pub fn attachment_labels(&self) -> Vec<String> {
        if self.files.is_empty() && self.forward.is_empty() {
            let empty = match self.kind {
                ComposerKind::DetailReply => NO_INHERITED_ATTACHMENTS,
                _ => NO_ATTACHMENTS,
            };
            return vec![empty.to_string()];
        }
        let inherited = self.forward.iter().map(|a| {
            let size = if a.size_bytes > 0 {
                format!(" · {}", format_bytes(a.size_bytes))
            } else {
                String::new()
            };
            format!("Original · {}{size}", a.filename)
        });
        let manual = self
            .files
            .iter()
            .map(|f| format!("{} · {}", f.filename, format_bytes(f.bytes.len() as i64)));
        inherited.chain(manual).collect()
    }

    pub fn apply_template(&mut self, template_id: &str) -> bool {
        let Some(template) = self.templates.iter().find(|t| t.id == template_id).cloned() else {
            return false;
        };
        self.fields.subject = template.subject;
        self.load_body_html(&template.html);
        self.mark_dirty();
        self.status
            .set(format!("Modelo \"{}\" aplicado.", template.label), Tone::Success);
        true
    }

    /// Forward a key press from the "Para" field to the suggestion list.
    pub fn suggestion_key(&mut self, key: SuggestionKey) {
        if let Some(to) = self.contacts.on_key(key, &self.fields.to) {
            self.fields.to = to;
            self.mark_dirty();
        }
    }

    pub fn pick_suggestion(&mut self, index: usize) {
        if let Some(to) = self.contacts.select(index, &self.fields.to) {
            self.fields.to = to;
            self.mark_dirty();
        }
    }

    /// Expand a contact group into Bcc.
    pub async fn add_audience(&mut self, list_id: Option<i64>) -> usize {
        let added = apply_audience(&self.api, list_id, &mut self.fields.bcc, &mut self.audience_status).await;
        if added > 0 || !self.fields.bcc.is_empty() {
            self.bcc_visible = true;
        }
        if added > 0 {
            self.mark_dirty();
        }
        added
    }

    // -- submission ----------------------------------------------------------

    fn resolved_account(&self) -> Option<AccountId> {
        self.fields.account_id.or(self.default_account)
    }

    fn has_content(&self) -> bool {
        let f = &self.fields;
        f.has_recipients()
            || !f.subject.trim().is_empty()
            || f.has_body()
            || !self.files.is_empty()
            || self.forward_pending
    }

    fn build_form(&self, account_id: AccountId, include_files: bool) -> FormData {
        let f = &self.fields;
        let mut form = FormData::new();
        let token = self.api.client().csrf_token();
        if !token.is_empty() {
            form.push_text("_token", token);
        }
        form.push_text("account_id", account_id.to_string());
        if let Some(id) = self.thread_id {
            form.push_text("thread_id", id.to_string());
        }
        if let Some(id) = self.draft_id {
            form.push_text("draft_id", id.to_string());
        }
        form.push_text("to", f.to.trim());
        form.push_text("cc", f.cc.trim());
        form.push_text("bcc", f.bcc.trim());
        form.push_text("subject", f.subject.trim());
        if f.has_body() {
            let html = if f.body_html.trim().is_empty() {
                plain_text_to_html(f.body_text.trim())
            } else {
                f.body_html.trim().to_string()
            };
            form.push_text("body_text", f.body_text.trim());
            if !html.is_empty() {
                form.push_text("body_html", html);
            }
        } else if self.kind == ComposerKind::Standalone {
            form.push_text("body_text", "");
            form.push_text("body_html", "");
        }
        if include_files {
            for file in &self.files {
                form.push_file("attachments[]", file.clone());
            }
        }
        if self.forward_pending {
            let ids: Vec<String> = self
                .forward
                .iter()
                .filter(|a| a.id > 0)
                .map(|a| a.id.to_string())
                .collect();
            if !ids.is_empty() {
                form.push_text("inherit_attachment_ids", ids.join(","));
            }
        }
        if self.kind == ComposerKind::Standalone && !f.scheduled_for.trim().is_empty() {
            form.push_text("scheduled_for", f.scheduled_for.trim());
        }
        form
    }

    fn reject(&mut self, message: &str) -> Error {
        self.status.set(message, Tone::Error);
        Error::Validation(message.to_string())
    }

    /// Send or save the draft.
    ///
    /// Validation failures never reach the network. On success the dirty
    /// flag clears and, for sends, the inline panel closes after a short
    /// delay while the other composers reset their form.
    pub async fn submit(&mut self, mode: ComposeMode) -> Result<ComposeResult> {
        if !self.is_open() {
            return Err(Error::Validation("Composer fechado.".into()));
        }
        let Some(account_id) = self.resolved_account() else {
            return Err(self.reject("Selecione uma conta para enviar."));
        };
        if mode == ComposeMode::Send && !self.fields.has_recipients() {
            return Err(self.reject("Informe pelo menos um destinatário."));
        }
        if mode == ComposeMode::Send && !self.fields.has_body() {
            return Err(self.reject("Inclua o corpo da mensagem."));
        }

        let wording = self.kind.wording();
        let form = self.build_form(account_id, true);
        self.manual_busy = true;
        self.autosave.cancel();
        self.contacts.cancel();
        let (phase, loading) = match mode {
            ComposeMode::Send => (Phase::Sending, wording.sending),
            ComposeMode::Draft => (Phase::Drafting, wording.drafting),
        };
        self.phase = phase;
        self.status.set(loading, Tone::Loading);

        let outcome = self.api.compose(mode, form).await;
        self.phase = Phase::Open;
        match &outcome {
            Ok(result) => self.finish_submit(mode, result, &wording),
            Err(e) => {
                log::error!("Composer request failed: {}", e);
                self.status.set(e.user_message(wording.failed), Tone::Error);
            }
        }

        self.manual_busy = false;
        if self.dirty {
            self.schedule_autosave();
        }
        outcome
    }

    fn finish_submit(&mut self, mode: ComposeMode, result: &ComposeResult, wording: &Wording) {
        self.dirty = false;
        self.last_saved_at = Some(Local::now());
        self.forward_pending = false;
        let scheduled = self.fields.scheduled_for.trim().replace('T', " ");

        match mode {
            ComposeMode::Draft => {
                self.draft_id = result.draft_id().or(match self.kind {
                    ComposerKind::Inline => None,
                    _ => self.draft_id,
                });
                self.files.clear();
                self.status.set(wording.drafted, Tone::Success);
            }
            ComposeMode::Send => {
                self.draft_id = None;
                if self.kind == ComposerKind::Standalone && !scheduled.is_empty() {
                    self.status
                        .set(format!("Envio agendado para {scheduled}."), Tone::Success);
                } else {
                    self.status.set(wording.sent, Tone::Success);
                }
                match self.kind {
                    ComposerKind::Inline => {
                        self.close_timer.schedule_tick();
                    }
                    ComposerKind::Standalone | ComposerKind::DetailReply => {
                        let status = self.status.clone();
                        self.reset_form();
                        self.status = status;
                    }
                }
            }
        }
    }

    /// Save a draft in the background, without files. Skips when nothing
    /// changed, the form is empty, or a manual submission is running.
    pub async fn autosave(&mut self) -> ComposerEvent {
        self.autosave.cancel();
        if self.phase != Phase::Open || self.manual_busy || !self.dirty || !self.has_content() {
            return ComposerEvent::AutosaveSkipped;
        }
        let Some(account_id) = self.resolved_account() else {
            return ComposerEvent::AutosaveSkipped;
        };
        let form = self.build_form(account_id, false);
        self.status.set("Salvando automaticamente...", Tone::Loading);
        match self.api.compose(ComposeMode::Draft, form).await {
            Ok(result) => {
                let now = Local::now();
                self.dirty = false;
                self.last_saved_at = Some(now);
                self.draft_id = result.draft_id().or(self.draft_id);
                self.forward_pending = false;
                self.status.set(
                    format!("Rascunho salvo automaticamente às {}.", format_clock(&now)),
                    Tone::Success,
                );
                ComposerEvent::Autosaved(self.draft_id)
            }
            Err(e) => {
                log::error!("Autosave draft failed: {}", e);
                self.status.set("Falha ao salvar rascunho automático.", Tone::Error);
                ComposerEvent::AutosaveFailed
            }
        }
    }

    /// Wait for the next timer: autosave, the delayed close after sending,
    /// or a contact lookup. `None` when nothing is scheduled.
    pub async fn next_event(&mut self) -> Option<ComposerEvent> {
        let autosave_pending = self.autosave.is_pending();
        let close_pending = self.close_timer.is_pending();
        let lookup_pending = self.contacts.is_pending();
        if !autosave_pending && !close_pending && !lookup_pending {
            return None;
        }
        enum Fired {
            Autosave,
            Close,
            Lookup,
        }
        let fired = tokio::select! {
            Some(()) = self.autosave.next(), if autosave_pending => Fired::Autosave,
            Some(()) = self.close_timer.next(), if close_pending => Fired::Close,
            true = self.contacts.next(), if lookup_pending => Fired::Lookup,
            else => return None,
        };
        Some(match fired {
            Fired::Autosave => self.autosave().await,
            Fired::Close => {
                self.close();
                ComposerEvent::Closed
            }
            Fired::Lookup => ComposerEvent::SuggestionsUpdated,
        })
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Local>> {
        self.last_saved_at
    }
}

/// Open the standalone compose window in the system browser.
pub fn launch_standalone_window(base_url: &str, compose_window: &str) -> Result<()> {
    let target = compose_window.trim();
    if target.is_empty() {
        return Err(Error::MissingRoute("composeWindow"));
    }
    let url = if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("{}{}", base_url.trim_end_matches('/'), target)
    };
    open_link(&url)
}
