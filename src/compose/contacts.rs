//! Recipient autocomplete and audience (group) expansion into Bcc.

use std::sync::OnceLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::api::InboxApi;
use crate::debounce::{Debouncer, CONTACT_LOOKUP_DELAY};
use crate::error::Result;
use crate::format::escape_html;
use crate::models::{ContactSuggestion, ContactSuggestions};
use crate::status::{StatusLine, Tone};

/// Shortest token that triggers a lookup.
pub const MIN_LOOKUP_CHARS: usize = 2;

fn last_separator(value: &str) -> Option<usize> {
    value.rfind([',', ';'])
}

/// The address being typed: whatever follows the last `,` or `;`.
pub fn current_recipient_token(value: &str) -> &str {
    match last_separator(value) {
        Some(idx) => value[idx + 1..].trim(),
        None => value.trim(),
    }
}

/// Replace the token being typed with `email` and open a new slot.
pub fn apply_suggestion(value: &str, email: &str) -> String {
    match last_separator(value) {
        Some(idx) => format!("{} {email}, ", &value[..=idx]),
        None => format!("{email}, "),
    }
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

/// Lowercased address when it looks like one.
pub fn normalize_email(value: &str) -> Option<String> {
    let email = value.trim().to_lowercase();
    let valid = email_pattern().is_some_and(|re| re.is_match(&email));
    valid.then_some(email)
}

/// Merge `emails` into a Bcc field value. Existing entries are normalized,
/// invalid ones dropped. Returns the new value and how many were added.
pub fn append_bcc(existing: &str, emails: &[String]) -> (String, usize) {
    let mut set: IndexSet<String> = existing
        .split([',', ';'])
        .filter_map(normalize_email)
        .collect();
    let mut added = 0;
    for raw in emails {
        if let Some(email) = normalize_email(raw) {
            if set.insert(email) {
                added += 1;
            }
        }
    }
    let value = set.into_iter().collect::<Vec<_>>().join(", ");
    (value, added)
}

// ---------------------------------------------------------------------------
// Suggestion list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionOption {
    pub label_html: String,
    /// Email (when a name is the label) and document, joined with ` · `.
    pub meta_html: String,
    pub active: bool,
}

/// Keys the recipient input forwards to the dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKey {
    Down,
    Up,
    Enter,
    Tab,
    Escape,
}

#[derive(Debug, Default)]
pub struct SuggestionList {
    items: Vec<ContactSuggestion>,
    active: Option<usize>,
}

impl SuggestionList {
    pub fn is_visible(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn items(&self) -> &[ContactSuggestion] {
        &self.items
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn show(&mut self, items: Vec<ContactSuggestion>) {
        self.items = items;
        self.active = None;
    }

    pub fn hide(&mut self) {
        self.items.clear();
        self.active = None;
    }

    /// Move the highlight, wrapping at both ends.
    pub fn move_active(&mut self, down: bool) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        self.active = Some(match (self.active, down) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        });
    }

    pub fn options(&self) -> Vec<SuggestionOption> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let mut meta = Vec::new();
                let label = match item.name.as_deref() {
                    Some(name) => {
                        meta.push(escape_html(&item.email));
                        escape_html(name)
                    }
                    None => escape_html(&item.email),
                };
                if let Some(doc) = &item.document_formatted {
                    meta.push(escape_html(doc));
                }
                SuggestionOption {
                    label_html: label,
                    meta_html: meta.join(" · "),
                    active: self.active == Some(index),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ContactLookup: debounced autocomplete for the "Para" field
// ---------------------------------------------------------------------------

pub struct ContactLookup {
    api: InboxApi,
    pending: Debouncer<Result<ContactSuggestions>>,
    list: SuggestionList,
}

impl ContactLookup {
    pub fn new(api: InboxApi) -> Self {
        ContactLookup {
            api,
            pending: Debouncer::new(CONTACT_LOOKUP_DELAY),
            list: SuggestionList::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api.routes().contact_search.is_some()
    }

    pub fn list(&self) -> &SuggestionList {
        &self.list
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// The "Para" field changed. Schedules a lookup for the current token or
    /// hides the dropdown; a newer keystroke aborts the previous lookup.
    pub fn on_input(&mut self, to_value: &str) {
        let token = current_recipient_token(to_value);
        if token.chars().count() < MIN_LOOKUP_CHARS || !self.is_enabled() {
            self.pending.cancel();
            self.list.hide();
            return;
        }
        let api = self.api.clone();
        let term = token.to_string();
        self.pending
            .schedule(move || async move { api.contact_suggestions(&term).await });
    }

    /// Wait for the pending lookup and show its results. Failures hide the
    /// dropdown. Returns `false` when nothing was pending.
    pub async fn next(&mut self) -> bool {
        match self.pending.next().await {
            Some(Ok(found)) => {
                self.list.show(found.items);
                true
            }
            Some(Err(e)) => {
                log::warn!("Contact lookup failed: {}", e);
                self.list.hide();
                true
            }
            None => false,
        }
    }

    /// Returns the new "Para" value when the key picked a suggestion.
    pub fn on_key(&mut self, key: SuggestionKey, to_value: &str) -> Option<String> {
        if !self.list.is_visible() {
            if key == SuggestionKey::Escape {
                self.list.hide();
            }
            return None;
        }
        match key {
            SuggestionKey::Down => self.list.move_active(true),
            SuggestionKey::Up => self.list.move_active(false),
            SuggestionKey::Enter | SuggestionKey::Tab => {
                let active = self.list.active;
                return active.and_then(|i| self.select(i, to_value));
            }
            SuggestionKey::Escape => self.list.hide(),
        }
        None
    }

    /// Apply the suggestion at `index` to `to_value` and close the dropdown.
    pub fn select(&mut self, index: usize, to_value: &str) -> Option<String> {
        let email = self.list.items.get(index)?.email.clone();
        self.list.hide();
        Some(apply_suggestion(to_value, &email))
    }

    pub fn cancel(&mut self) {
        self.pending.cancel();
        self.list.hide();
    }
}

// ---------------------------------------------------------------------------
// Audience → Bcc
// ---------------------------------------------------------------------------

/// Fetch a contact group's addresses and merge them into `bcc`. Progress and
/// outcome are reported on `status`. Returns how many addresses were added.
pub async fn apply_audience(
    api: &InboxApi,
    list_id: Option<i64>,
    bcc: &mut String,
    status: &mut StatusLine,
) -> usize {
    let Some(list_id) = list_id.filter(|id| *id > 0) else {
        status.set("Selecione um grupo para adicionar no Bcc.", Tone::Error);
        return 0;
    };
    status.set("Carregando contatos do grupo...", Tone::Muted);
    let emails = match api.audience_recipients(list_id).await {
        Ok(found) => found.emails,
        Err(e) => {
            status.set(e.user_message("Falha ao carregar os contatos do grupo."), Tone::Error);
            return 0;
        }
    };
    if emails.is_empty() {
        status.set("O grupo não possui contatos com e-mail.", Tone::Error);
        return 0;
    }
    let (value, added) = append_bcc(bcc, &emails);
    *bcc = value;
    if added == 0 {
        status.set("Nenhum e-mail novo adicionado (todos já estavam no Bcc).", Tone::Muted);
    } else {
        status.set(format!("Adicionamos {added} destinatário(s) em Bcc."), Tone::Success);
    }
    added
}
