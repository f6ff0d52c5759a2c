use serde::{Deserialize, Deserializer, Serialize};

pub type ThreadId = i64;
pub type MessageId = i64;
pub type AccountId = i64;
pub type FolderId = i64;

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// Field deserializers for the loosely-typed JSON the backend emits.
///
/// Numbers arrive as numbers, numeric strings or `null`; flags as `true`,
/// `1` or `"1"`; lists sometimes as `null`. These coerce at the boundary so
/// the rest of the crate works with plain Rust types.
pub(crate) mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(crate) fn number(v: &Value) -> Option<i64> {
        match v {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f as i64)
            }
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub(crate) fn text(v: &Value) -> Option<String> {
        match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub(crate) fn truthy(v: &Value) -> bool {
        match v {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => {
                let s = s.trim();
                !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false")
            }
            Value::Array(_) | Value::Object(_) => true,
            Value::Null => false,
        }
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(number(&Value::deserialize(d)?))
    }

    pub fn i64_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(number(&Value::deserialize(d)?).unwrap_or(0))
    }

    /// Blank strings are treated as absent.
    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(text(&Value::deserialize(d)?))
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(text(&Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(truthy(&Value::deserialize(d)?))
    }

    /// Non-arrays become empty; elements that fail to decode are skipped.
    pub fn seq<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Value::deserialize(d)? {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match serde_json::from_value(item) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        log::warn!("Skipping malformed list entry: {}", e);
                        None
                    }
                })
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        match Value::deserialize(d)? {
            Value::Array(items) => Ok(items.iter().filter_map(text).collect()),
            _ => Ok(Vec::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    Inbox,
    Sent,
    Drafts,
    Spam,
    Archive,
    Trash,
    Important,
    #[default]
    Custom,
    /// The client-only local folder.
    Local,
}

impl FolderType {
    /// Parse a backend type string. `deleted` and `bin` are trash.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inbox" => Some(FolderType::Inbox),
            "sent" => Some(FolderType::Sent),
            "drafts" => Some(FolderType::Drafts),
            "spam" => Some(FolderType::Spam),
            "archive" => Some(FolderType::Archive),
            "trash" | "deleted" | "bin" => Some(FolderType::Trash),
            "important" => Some(FolderType::Important),
            "custom" => Some(FolderType::Custom),
            "local" => Some(FolderType::Local),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FolderType::Inbox => "inbox",
            FolderType::Sent => "sent",
            FolderType::Drafts => "drafts",
            FolderType::Spam => "spam",
            FolderType::Archive => "archive",
            FolderType::Trash => "trash",
            FolderType::Important => "important",
            FolderType::Custom => "custom",
            FolderType::Local => "local",
        }
    }
}

impl<'de> Deserialize<'de> for FolderType {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(FolderType::parse(&raw).unwrap_or_default())
    }
}

/// The folder summary embedded in threads and messages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FolderRef {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<FolderId>,
    #[serde(rename = "type", default)]
    pub folder_type: FolderType,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub remote_name: Option<String>,
}

pub const LOCAL_FOLDER_LABEL: &str = "Caixa local";

impl FolderRef {
    pub fn local() -> Self {
        FolderRef {
            id: None,
            folder_type: FolderType::Local,
            display_name: Some(LOCAL_FOLDER_LABEL.to_string()),
            remote_name: None,
        }
    }
}

/// A folder row from the sidebar / `folders` arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(deserialize_with = "lenient::i64_or_zero")]
    pub id: FolderId,
    #[serde(rename = "type", default)]
    pub folder_type: FolderType,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub remote_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub unread_count: i64,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub total_count: Option<i64>,
}

impl Folder {
    pub fn to_ref(&self) -> FolderRef {
        FolderRef {
            id: Some(self.id),
            folder_type: self.folder_type,
            display_name: self.display_name.clone(),
            remote_name: self.remote_name.clone(),
        }
    }

    /// Count shown on the sidebar badge: total when known, else unread.
    pub fn badge_count(&self) -> i64 {
        self.total_count.unwrap_or(self.unread_count)
    }
}

// ---------------------------------------------------------------------------
// Threads, messages, attachments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(deserialize_with = "lenient::i64_or_zero")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub size_bytes: i64,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Attachment {
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("sem-nome")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(deserialize_with = "lenient::i64_or_zero")]
    pub id: ThreadId,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub snippet: Option<String>,
    #[serde(default)]
    pub folder: Option<FolderRef>,
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub unread_count: i64,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub last_message_at: Option<i64>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub flags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub account_id: Option<AccountId>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub has_attachments: bool,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub attachments: Vec<Attachment>,
    /// Set only on local cache entries.
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<i64>,
}

impl Thread {
    pub fn is_starred(&self) -> bool {
        self.flags.iter().any(|f| f == "flagged" || f == "starred")
    }

    pub fn folder_id(&self) -> Option<FolderId> {
        self.folder.as_ref().and_then(|f| f.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Inbound,
    Outbound,
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(if raw.eq_ignore_ascii_case("outbound") {
            Direction::Outbound
        } else {
            Direction::Inbound
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    From,
    #[default]
    To,
    Cc,
    Bcc,
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "from" => Role::From,
            "cc" => Role::Cc,
            "bcc" => Role::Bcc,
            _ => Role::To,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
}

impl Participant {
    /// Name when present, else the address. Empty when neither exists.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.email.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "lenient::i64_or_zero")]
    pub id: MessageId,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub thread_id: Option<ThreadId>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub body_text: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub body_html: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub body_preview: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub snippet: Option<String>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub participants: Vec<Participant>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub attachments: Vec<Attachment>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub sent_at: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub received_at: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub internet_message_id: Option<String>,
    #[serde(default)]
    pub folder: Option<FolderRef>,
}

impl Message {
    pub fn participants_with(&self, role: Role) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(move |p| p.role == role)
    }

    pub fn sender(&self) -> Option<&Participant> {
        self.participants_with(Role::From).next()
    }

    /// Preview text used when quoting: `body_preview`, else `snippet`.
    pub fn preview(&self) -> &str {
        self.body_preview
            .as_deref()
            .or(self.snippet.as_deref())
            .unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub const SYNC_DISABLED_REASON: &str = "Sincronização IMAP está desativada para esta conta.";
pub const SYNC_MISSING_CREDENTIALS_REASON: &str =
    "Complete host, usuário e senha IMAP para usar Enviar e receber.";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMeta {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub can_sync: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub imap_enabled: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub has_credentials: bool,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(deserialize_with = "lenient::i64_or_zero")]
    pub id: AccountId,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub from_email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub from_name: Option<String>,
    #[serde(default)]
    pub sync: SyncMeta,
}

/// A raw account row as stored by the backend, before summarizing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountRow {
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub id: AccountId,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub from_email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub from_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub imap_sync_enabled: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub imap_host: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub smtp_host: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub imap_username: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub imap_password: Option<String>,
    /// JSON blob with `username` / `password` fallbacks.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub credentials: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoredCredentials {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    username: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    password: Option<String>,
}

impl Account {
    /// Summarize a raw row, deriving whether "Enviar e receber" is possible.
    pub fn from_row(row: AccountRow) -> Self {
        let imap_enabled = row.imap_sync_enabled == Some(1);
        let credentials = row
            .credentials
            .as_deref()
            .and_then(|raw| serde_json::from_str::<StoredCredentials>(raw).ok())
            .unwrap_or_default();

        let present = |v: Option<&String>| v.is_some_and(|s| !s.trim().is_empty());
        let has_host = present(row.imap_host.as_ref().or(row.smtp_host.as_ref()));
        let has_username = present(row.imap_username.as_ref().or(credentials.username.as_ref()));
        let has_password = present(row.imap_password.as_ref().or(credentials.password.as_ref()));
        let has_credentials = has_host && has_username && has_password;

        let reason = if !imap_enabled {
            Some(SYNC_DISABLED_REASON.to_string())
        } else if !has_credentials {
            Some(SYNC_MISSING_CREDENTIALS_REASON.to_string())
        } else {
            None
        };

        Account {
            id: row.id,
            name: Some(row.name.unwrap_or_else(|| format!("Mailbox #{}", row.id))),
            from_email: row.from_email,
            from_name: row.from_name,
            sync: SyncMeta {
                can_sync: imap_enabled && has_credentials,
                imap_enabled,
                has_credentials,
                reason,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMeta {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub total: Option<i64>,
}

/// `threads` and `search` responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadList {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub threads: Vec<Thread>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub meta: Option<ListMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadMessages {
    #[serde(default)]
    pub thread: Option<Thread>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub message: Option<Message>,
}

/// Result of a single-thread mutation. Any of the folder keys may carry a
/// refreshed badge count.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadActionResult {
    #[serde(default)]
    pub thread: Option<Thread>,
    #[serde(default)]
    pub folder: Option<Folder>,
    #[serde(default)]
    pub source_folder: Option<Folder>,
    #[serde(default)]
    pub target_folder: Option<Folder>,
}

impl ThreadActionResult {
    pub fn touched_folders(&self) -> impl Iterator<Item = &Folder> {
        [&self.folder, &self.source_folder, &self.target_folder]
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkActionResult {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub folders: Vec<Folder>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub threads: Vec<Thread>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmptyTrashResult {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub account_id: Option<AccountId>,
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub deleted_threads: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncResult {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub folders: Vec<Folder>,
}

impl SyncResult {
    pub fn is_queued(&self) -> bool {
        self.status.as_deref() == Some("queued")
    }
}

/// `compose` / `compose/draft` responses. The inline endpoints answer with
/// `message`, the standalone window reads `draft`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeResult {
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub draft: Option<DraftRef>,
    #[serde(default)]
    pub thread: Option<Thread>,
}

impl ComposeResult {
    pub fn draft_id(&self) -> Option<MessageId> {
        self.draft
            .as_ref()
            .and_then(|d| d.id)
            .or_else(|| self.message.as_ref().map(|m| m.id).filter(|id| *id > 0))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftRef {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<MessageId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftList {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub account_id: Option<AccountId>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub drafts: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContactSuggestion {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub document_formatted: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactSuggestions {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub items: Vec<ContactSuggestion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudienceRecipients {
    #[serde(default, deserialize_with = "lenient::strings")]
    pub emails: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub count: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thread_accepts_stringly_numbers() {
        let t: Thread = serde_json::from_value(json!({
            "id": "42",
            "subject": "",
            "unread_count": "3",
            "last_message_at": null,
            "flags": ["starred", 7, null],
            "folder": {"id": "9", "type": "deleted", "display_name": "Bin"},
            "has_attachments": "1",
            "attachments": null
        }))
        .unwrap();
        assert_eq!(t.id, 42);
        assert_eq!(t.subject, None);
        assert_eq!(t.unread_count, 3);
        assert_eq!(t.last_message_at, None);
        assert!(t.is_starred());
        assert_eq!(t.folder_id(), Some(9));
        assert_eq!(t.folder.unwrap().folder_type, FolderType::Trash);
        assert!(t.has_attachments);
        assert!(t.attachments.is_empty());
    }

    #[test]
    fn unknown_role_becomes_to() {
        let p: Participant =
            serde_json::from_value(json!({"role": "reply-to", "email": "a@x.com"})).unwrap();
        assert_eq!(p.role, Role::To);
        assert_eq!(p.label(), "a@x.com");
    }

    #[test]
    fn message_skips_malformed_participants() {
        let m: Message = serde_json::from_value(json!({
            "id": 1,
            "direction": "OUTBOUND",
            "participants": [{"role": "from", "email": "a@x.com"}, "garbage"],
            "snippet": "hi"
        }))
        .unwrap();
        assert_eq!(m.direction, Direction::Outbound);
        assert_eq!(m.participants.len(), 1);
        assert_eq!(m.sender().map(|p| p.email.as_str()), Some("a@x.com"));
        assert_eq!(m.preview(), "hi");
    }

    #[test]
    fn account_sync_from_row() {
        let row: AccountRow = serde_json::from_value(json!({
            "id": 3,
            "imap_sync_enabled": "1",
            "smtp_host": "smtp.x.com",
            "credentials": "{\"username\":\"u\",\"password\":\"p\"}"
        }))
        .unwrap();
        let acc = Account::from_row(row);
        assert!(acc.sync.can_sync);
        assert_eq!(acc.sync.reason, None);
        assert_eq!(acc.name.as_deref(), Some("Mailbox #3"));

        let row = AccountRow {
            id: 4,
            imap_sync_enabled: Some(1),
            imap_host: Some("imap.x.com".into()),
            ..Default::default()
        };
        let acc = Account::from_row(row);
        assert!(!acc.sync.can_sync);
        assert_eq!(acc.sync.reason.as_deref(), Some(SYNC_MISSING_CREDENTIALS_REASON));

        let acc = Account::from_row(AccountRow::default());
        assert!(!acc.sync.imap_enabled);
        assert_eq!(acc.sync.reason.as_deref(), Some(SYNC_DISABLED_REASON));
    }

    #[test]
    fn sync_meta_reads_camel_case() {
        let a: Account = serde_json::from_value(json!({
            "id": 1,
            "sync": {"canSync": true, "imapEnabled": 1, "hasCredentials": true, "reason": null}
        }))
        .unwrap();
        assert!(a.sync.can_sync && a.sync.imap_enabled && a.sync.has_credentials);
    }

    #[test]
    fn compose_result_prefers_draft_key() {
        let r: ComposeResult =
            serde_json::from_value(json!({"draft": {"id": 8}, "message": {"id": 5}})).unwrap();
        assert_eq!(r.draft_id(), Some(8));
        let r: ComposeResult = serde_json::from_value(json!({"message": {"id": 5}})).unwrap();
        assert_eq!(r.draft_id(), Some(5));
    }
}
