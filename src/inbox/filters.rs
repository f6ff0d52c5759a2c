use crate::format::escape_html;
use crate::models::{AccountId, FolderId, Thread};

/// Free-text and toggle filters of the search bar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub query: String,
    pub participant: String,
    pub unread_only: bool,
    pub has_attachments: bool,
    pub mentions_only: bool,
    /// `YYYY-MM-DD`, as typed in the date inputs. Empty when unset.
    pub date_from: String,
    pub date_to: String,
}

impl SearchFilters {
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
            || !self.participant.is_empty()
            || self.unread_only
            || self.has_attachments
            || self.mentions_only
            || !self.date_from.is_empty()
            || !self.date_to.is_empty()
    }

    /// Trim the text inputs the way the form collects them.
    pub fn normalized(mut self) -> Self {
        self.query = self.query.trim().to_string();
        self.participant = self.participant.trim().to_string();
        self.date_from = self.date_from.trim().to_string();
        self.date_to = self.date_to.trim().to_string();
        self
    }

    /// Query string of the server-side search endpoint.
    pub fn to_params(
        &self,
        account_id: Option<AccountId>,
        folder_id: Option<FolderId>,
        limit: u32,
    ) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let mut push = |k: &str, v: String| params.push((k.to_string(), v));
        if let Some(id) = account_id.filter(|id| *id > 0) {
            push("account_id", id.to_string());
        }
        if let Some(id) = folder_id {
            push("folder_id", id.to_string());
        }
        push("limit", limit.to_string());
        if !self.query.is_empty() {
            push("q", self.query.clone());
        }
        if !self.participant.is_empty() {
            push("participant", self.participant.clone());
        }
        if self.unread_only {
            push("unread", "1".into());
        }
        if self.has_attachments {
            push("has_attachments", "1".into());
        }
        if self.mentions_only {
            push("mentions", "1".into());
        }
        if !self.date_from.is_empty() {
            push("date_from", self.date_from.clone());
        }
        if !self.date_to.is_empty() {
            push("date_to", self.date_to.clone());
        }
        params
    }

    /// HTML summary of the active filters, joined with ` · `.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.query.is_empty() {
            parts.push(format!("&ldquo;{}&rdquo;", escape_html(&self.query)));
        }
        if !self.participant.is_empty() {
            parts.push(format!("Contato: {}", escape_html(&self.participant)));
        }
        if self.unread_only {
            parts.push("Não lidas".to_string());
        }
        if self.has_attachments {
            parts.push("Com anexos".to_string());
        }
        if self.mentions_only {
            parts.push("Mencionou você".to_string());
        }
        if !self.date_from.is_empty() || !self.date_to.is_empty() {
            let from = if self.date_from.is_empty() {
                "sempre".to_string()
            } else {
                escape_html(&self.date_from)
            };
            let to = if self.date_to.is_empty() {
                "hoje".to_string()
            } else {
                escape_html(&self.date_to)
            };
            parts.push(format!("De {from} até {to}"));
        }
        parts.join(" · ")
    }

    /// Client-side match used by the local folder, which has no server.
    /// Only the text query and the unread/attachment toggles apply.
    pub fn matches_local(&self, thread: &Thread) -> bool {
        if !self.query.is_empty() {
            let needle = self.query.to_lowercase();
            let haystack = format!(
                "{} {}",
                thread.subject.as_deref().unwrap_or(""),
                thread.snippet.as_deref().unwrap_or("")
            )
            .to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        if self.unread_only && thread.unread_count <= 0 {
            return false;
        }
        if self.has_attachments && !thread.has_attachments {
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Quick filters
// ---------------------------------------------------------------------------

/// The one-click toggles above the thread list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickFilter {
    Unread,
    Attachments,
    Mentions,
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 3] = [QuickFilter::Unread, QuickFilter::Attachments, QuickFilter::Mentions];

    pub fn parse(key: &str) -> Option<Self> {
        match key.trim() {
            "unread" => Some(QuickFilter::Unread),
            "attachments" => Some(QuickFilter::Attachments),
            "mentions" => Some(QuickFilter::Mentions),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            QuickFilter::Unread => "unread",
            QuickFilter::Attachments => "attachments",
            QuickFilter::Mentions => "mentions",
        }
    }

    pub fn is_active(&self, filters: &SearchFilters) -> bool {
        match self {
            QuickFilter::Unread => filters.unread_only,
            QuickFilter::Attachments => filters.has_attachments,
            QuickFilter::Mentions => filters.mentions_only,
        }
    }

    pub fn apply(&self, filters: &mut SearchFilters, enabled: bool) {
        match self {
            QuickFilter::Unread => filters.unread_only = enabled,
            QuickFilter::Attachments => filters.has_attachments = enabled,
            QuickFilter::Mentions => filters.mentions_only = enabled,
        }
    }

    /// Value of the button's `aria-pressed` attribute.
    pub fn aria_pressed(&self, filters: &SearchFilters) -> &'static str {
        if self.is_active(filters) {
            "true"
        } else {
            "false"
        }
    }
}

/// Text under the search bar. `total` is `None` while a search is in flight.
pub fn search_status_text(search_mode: bool, filters: &SearchFilters, total: Option<usize>) -> String {
    if !search_mode {
        return "Visualizando por pasta".to_string();
    }
    let count = total.map_or_else(|| "...".to_string(), |n| n.to_string());
    let plural = if count == "1" { "" } else { "s" };
    let mut text = format!("Filtrando {count} thread{plural}");
    let summary = filters.summary();
    if !summary.is_empty() {
        text.push_str(" · ");
        text.push_str(&summary);
    }
    text
}
