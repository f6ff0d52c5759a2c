use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{lenient, Account, AccountId, Folder, FolderId, MessageId, Thread, ThreadId};

pub const DEFAULT_THREAD_LIMIT: u32 = 30;

// ---------------------------------------------------------------------------
// Route overrides: what the page (or config file) injects
// ---------------------------------------------------------------------------

/// Endpoint paths as injected by the host page. Any missing entry falls back
/// to `{prefix}/email/inbox{suffix}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_messages_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_read_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_actions_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_star_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_archive_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_move_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_bulk_actions: Option<String>,
    /// When set, bulk actions fall back to one request per thread.
    #[serde(default)]
    pub disable_bulk_endpoint: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_detail_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_standalone_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_download_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_threads: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose_send: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose_draft: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose_drafts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose_window: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_sync_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_trash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose_audience_recipients: Option<String>,
}

// ---------------------------------------------------------------------------
// Routes: fully resolved
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Routes {
    pub threads: String,
    pub thread_messages_base: String,
    pub mark_read_base: String,
    pub thread_actions_base: String,
    pub thread_star_base: String,
    pub thread_archive_base: String,
    pub thread_move_base: String,
    pub thread_bulk_actions: Option<String>,
    pub message_detail_base: String,
    pub message_standalone_base: String,
    pub attachment_download_base: String,
    pub search_threads: String,
    pub compose_send: String,
    pub compose_draft: String,
    pub compose_drafts: String,
    pub compose_window: String,
    pub account_sync_base: String,
    pub empty_trash: String,
    pub contact_search: Option<String>,
    pub compose_audience_recipients: Option<String>,
}

/// The part of a page path that precedes `/email/inbox`, e.g. `/public`.
pub fn infer_base_prefix(path: &str) -> String {
    match path.find("/email/inbox") {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

/// Normalize one configured route against the deployment prefix.
pub fn ensure_route(value: Option<&str>, suffix: &str, prefix: &str) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(trimmed) => {
            if !prefix.is_empty()
                && trimmed.starts_with('/')
                && !trimmed.starts_with(&format!("{prefix}/"))
            {
                format!("{prefix}{trimmed}")
            } else {
                trimmed.to_string()
            }
        }
        None => format!("{prefix}/email/inbox{suffix}"),
    }
}

fn optional_route(value: Option<&str>, prefix: &str) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| ensure_route(Some(v), "", prefix))
}

impl Routes {
    pub fn resolve(overrides: &RouteOverrides, prefix: &str) -> Self {
        let r = overrides;
        let route = |v: &Option<String>, suffix: &str| ensure_route(v.as_deref(), suffix, prefix);
        Routes {
            threads: route(&r.threads, "/threads"),
            thread_messages_base: route(&r.thread_messages_base, "/threads"),
            mark_read_base: route(&r.mark_read_base, "/threads"),
            thread_actions_base: route(&r.thread_actions_base, "/threads"),
            thread_star_base: route(&r.thread_star_base, "/threads"),
            thread_archive_base: route(&r.thread_archive_base, "/threads"),
            thread_move_base: route(&r.thread_move_base, "/threads"),
            thread_bulk_actions: if r.disable_bulk_endpoint {
                None
            } else {
                Some(route(&r.thread_bulk_actions, "/threads/bulk-actions"))
            },
            message_detail_base: route(&r.message_detail_base, "/messages"),
            message_standalone_base: route(&r.message_standalone_base, "/messages"),
            attachment_download_base: route(&r.attachment_download_base, "/attachments"),
            search_threads: route(&r.search_threads, "/search"),
            compose_send: route(&r.compose_send, "/compose"),
            compose_draft: route(&r.compose_draft, "/compose/draft"),
            compose_drafts: route(&r.compose_drafts, "/compose/drafts"),
            compose_window: route(&r.compose_window, "/compose/window"),
            account_sync_base: route(&r.account_sync_base, "/accounts"),
            empty_trash: route(&r.empty_trash, "/trash/empty"),
            contact_search: optional_route(r.contact_search.as_deref(), prefix),
            compose_audience_recipients: optional_route(
                r.compose_audience_recipients.as_deref(),
                prefix,
            ),
        }
    }

    pub fn attachment_download(&self, attachment_id: i64) -> String {
        format!("{}/{}/download", self.attachment_download_base, attachment_id)
    }

    pub fn message_window(&self, message_id: MessageId) -> String {
        format!("{}/{}/view", self.message_standalone_base, message_id)
    }
}

impl Default for Routes {
    fn default() -> Self {
        Routes::resolve(&RouteOverrides::default(), "")
    }
}

// ---------------------------------------------------------------------------
// Inbox bootstrap: the initial view payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxBootstrap {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub account_id: Option<AccountId>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub folder_id: Option<FolderId>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub thread_id: Option<ThreadId>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub selected_message_id: Option<MessageId>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub thread_limit: Option<i64>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub folders: Vec<Folder>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub accounts: Vec<Account>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub archive_folder_id: Option<FolderId>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub trash_folder_id: Option<FolderId>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub auto_compose: bool,
    #[serde(default)]
    pub current_thread: Option<Thread>,
    #[serde(default)]
    pub routes: RouteOverrides,
}

impl InboxBootstrap {
    /// Parse the page's config blob. Garbage yields an empty bootstrap.
    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable inbox bootstrap: {}", e);
            InboxBootstrap::default()
        })
    }

    /// Page size, falling back to 30 for missing or non-positive values.
    pub fn page_size(&self) -> u32 {
        self.thread_limit
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(DEFAULT_THREAD_LIMIT)
    }

    /// Only positive folder ids select a folder; anything else is "all".
    pub fn initial_folder(&self) -> Option<FolderId> {
        self.folder_id.filter(|id| *id > 0)
    }
}

// ---------------------------------------------------------------------------
// Client config: where the backend lives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Scheme and host, e.g. `https://crm.example.com`.
    pub base_url: String,
    /// Deployment prefix in front of `/email/inbox`, e.g. `/public`.
    #[serde(default)]
    pub base_prefix: String,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_limit: Option<u32>,
    #[serde(default)]
    pub routes: RouteOverrides,
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailpanel")
}

fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

impl ClientConfig {
    /// File config overlaid with `MAILPANEL_*` environment variables.
    pub fn resolve() -> Result<Self> {
        let mut cfg = Self::load_from(&config_path())?.unwrap_or_default();
        cfg.apply_env(|key| std::env::var(key).ok());
        if cfg.base_url.trim().is_empty() {
            return Err(Error::Config(
                "no base URL (set MAILPANEL_BASE_URL or base_url in config.json)".into(),
            ));
        }
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(path).map_err(|e| Error::Config(format!("read config: {e}")))?;
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| Error::Config(format!("parse config: {e}")))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Config(format!("create config dir: {e}")))?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("serialize config: {e}")))?;
        fs::write(path, data).map_err(|e| Error::Config(format!("write config: {e}")))
    }

    /// Overlay environment values. `lookup` is `std::env::var` in production.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("MAILPANEL_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("MAILPANEL_BASE_PREFIX") {
            self.base_prefix = v;
        }
        if let Some(v) = lookup("MAILPANEL_CSRF_TOKEN") {
            self.csrf_token = v;
        }
        if let Some(v) = lookup("MAILPANEL_THREAD_LIMIT") {
            match v.trim().parse::<u32>() {
                Ok(n) if n > 0 => self.thread_limit = Some(n),
                _ => log::warn!("Ignoring MAILPANEL_THREAD_LIMIT={:?}", v),
            }
        }
    }

    pub fn routes(&self) -> Routes {
        Routes::resolve(&self.routes, self.base_prefix.trim_end_matches('/'))
    }
}
