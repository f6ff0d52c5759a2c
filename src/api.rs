use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::config::{ClientConfig, Routes};
use crate::error::{Error, Result};
use crate::models::{
    AccountId, AudienceRecipients, BulkActionResult, ComposeResult, ContactSuggestions,
    DraftList, EmptyTrashResult, FolderId, MessageId, MessagePayload, SyncResult,
    ThreadActionResult, ThreadId, ThreadList, ThreadMessages,
};
use crate::status::{AlertQueue, Tone, ALERT_FETCH_FAILURE};
use crate::transport::{ApiRequest, ApiResponse, FormData, HttpTransport, Transport};

pub const CONTACT_SUGGESTION_LIMIT: u32 = 8;
pub const DEFAULT_DRAFTS_LIMIT: u32 = 10;
pub const MAX_DRAFTS_LIMIT: u32 = 30;

// ---------------------------------------------------------------------------
// ApiClient: the fetch wrapper every call goes through
// ---------------------------------------------------------------------------

/// Logs each call, turns non-2xx and network failures into [`Error`], and
/// raises a transient banner for them.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    alerts: AlertQueue,
    csrf_token: String,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, alerts: AlertQueue, csrf_token: impl Into<String>) -> Self {
        ApiClient {
            transport,
            alerts,
            csrf_token: csrf_token.into(),
        }
    }

    pub fn from_config(config: &ClientConfig, alerts: AlertQueue) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport), alerts, config.csrf_token.clone()))
    }

    pub fn alerts(&self) -> &AlertQueue {
        &self.alerts
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.path.clone();
        log::debug!("{} {}", request.method.as_str(), url);
        match self.transport.execute(request).await {
            Err(reason) => {
                log::error!("Network error calling {}: {}", url, reason);
                self.alerts
                    .push(format!("Erro de rede em {url}"), Tone::Error, ALERT_FETCH_FAILURE);
                Err(Error::Network { url, reason })
            }
            Ok(response) if !response.is_success() => {
                log::error!("HTTP {} from {}", response.status, url);
                self.alerts.push(
                    format!("Falha ao chamar {url} (HTTP {})", response.status),
                    Tone::Error,
                    ALERT_FETCH_FAILURE,
                );
                Err(Error::Http {
                    url,
                    status: response.status,
                    message: response.error_field(),
                })
            }
            Ok(response) => Ok(response),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        self.send(ApiRequest::get(path).with_query(query)).await?.json()
    }

    /// POST a JSON object, adding `_token` when a CSRF token is configured.
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Map<String, Value>) -> Result<T> {
        self.post_json_raw(path, body).await?.json()
    }

    pub async fn post_json_raw(&self, path: &str, mut body: Map<String, Value>) -> Result<ApiResponse> {
        if !self.csrf_token.is_empty() {
            body.insert("_token".into(), Value::String(self.csrf_token.clone()));
        }
        self.send(ApiRequest::post_json(path, Value::Object(body))).await
    }

    /// POST a form, adding `_token` when a CSRF token is configured.
    pub async fn post_form<T: DeserializeOwned>(&self, path: &str, form: FormData) -> Result<T> {
        self.post_form_raw(path, form).await?.json()
    }

    pub async fn post_form_raw(&self, path: &str, mut form: FormData) -> Result<ApiResponse> {
        if !self.csrf_token.is_empty() && !form.contains("_token") {
            form.set_text("_token", self.csrf_token.clone());
        }
        self.send(ApiRequest::post_form(path, form)).await
    }
}

/// Some endpoints answer 2xx with an `error` field; treat that as a failure.
fn reject_error_field(response: &ApiResponse, url: &str) -> Result<()> {
    match response.error_field() {
        Some(message) => Err(Error::Http {
            url: url.to_string(),
            status: response.status,
            message: Some(message),
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadListQuery {
    pub account_id: Option<AccountId>,
    pub folder_id: Option<FolderId>,
    pub limit: u32,
    pub include_folders: bool,
}

impl ThreadListQuery {
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(id) = self.account_id.filter(|id| *id > 0) {
            params.push(("account_id".to_string(), id.to_string()));
        }
        if let Some(id) = self.folder_id {
            params.push(("folder_id".to_string(), id.to_string()));
        }
        params.push(("limit".to_string(), self.limit.to_string()));
        if self.include_folders {
            params.push(("include_folders".to_string(), "1".to_string()));
        }
        params
    }
}

/// Mutations accepted by the per-thread and bulk endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadAction {
    Star { starred: bool },
    Archive,
    Trash,
    Move { folder_id: FolderId },
    MarkRead,
}

impl ThreadAction {
    pub fn name(&self) -> &'static str {
        match self {
            ThreadAction::Star { .. } => "star",
            ThreadAction::Archive => "archive",
            ThreadAction::Trash => "trash",
            ThreadAction::Move { .. } => "move",
            ThreadAction::MarkRead => "mark_read",
        }
    }

    pub fn payload(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            ThreadAction::Star { starred } => {
                map.insert("starred".into(), Value::Bool(*starred));
            }
            ThreadAction::Move { folder_id } => {
                map.insert("folder_id".into(), json!(folder_id));
            }
            _ => {}
        }
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    Send,
    Draft,
}

/// Parameters of a manual "Enviar e receber".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub limit: u32,
    pub lookback_days: u32,
    pub folder: Option<String>,
}

impl SyncRequest {
    /// Narrow sync for one remote folder, wide sync otherwise.
    pub fn for_folder(remote_name: Option<&str>) -> Self {
        match remote_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => SyncRequest {
                limit: 150,
                lookback_days: 120,
                folder: Some(name.to_string()),
            },
            None => SyncRequest {
                limit: 200,
                lookback_days: 365,
                folder: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// InboxApi: typed endpoints
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct InboxApi {
    client: ApiClient,
    routes: Arc<Routes>,
}

impl InboxApi {
    pub fn new(client: ApiClient, routes: Routes) -> Self {
        InboxApi {
            client,
            routes: Arc::new(routes),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub async fn list_threads(&self, query: ThreadListQuery) -> Result<ThreadList> {
        self.client.get_json(&self.routes.threads, query.to_params()).await
    }

    pub async fn search_threads(&self, params: Vec<(String, String)>) -> Result<ThreadList> {
        self.client.get_json(&self.routes.search_threads, params).await
    }

    pub async fn thread_messages(&self, thread_id: ThreadId) -> Result<ThreadMessages> {
        let path = format!("{}/{}/messages", self.routes.thread_messages_base, thread_id);
        self.client.get_json(&path, Vec::new()).await
    }

    pub async fn message_detail(&self, message_id: MessageId) -> Result<MessagePayload> {
        let path = format!("{}/{}", self.routes.message_detail_base, message_id);
        self.client.get_json(&path, Vec::new()).await
    }

    pub async fn mark_thread_read(&self, thread_id: ThreadId) -> Result<ThreadActionResult> {
        let path = format!("{}/{}/read", self.routes.mark_read_base, thread_id);
        self.client.post_form(&path, FormData::new()).await
    }

    /// Star, archive and move have dedicated endpoints that take no `action`
    /// field; everything else goes to the generic actions endpoint.
    pub async fn thread_action(&self, thread_id: ThreadId, action: ThreadAction) -> Result<ThreadActionResult> {
        let dedicated = match action {
            ThreadAction::Star { .. } => Some((&self.routes.thread_star_base, "star")),
            ThreadAction::Archive => Some((&self.routes.thread_archive_base, "archive")),
            ThreadAction::Move { .. } => Some((&self.routes.thread_move_base, "move")),
            _ => None,
        };
        let mut body = action.payload();
        let path = match dedicated {
            Some((base, suffix)) => format!("{base}/{thread_id}/{suffix}"),
            None => {
                body.insert("action".into(), Value::String(action.name().into()));
                format!("{}/{}/actions", self.routes.thread_actions_base, thread_id)
            }
        };
        self.client.post_json(&path, body).await
    }

    pub fn has_bulk_endpoint(&self) -> bool {
        self.routes.thread_bulk_actions.is_some()
    }

    pub async fn bulk_action(&self, thread_ids: &[ThreadId], action: ThreadAction) -> Result<BulkActionResult> {
        let path = self
            .routes
            .thread_bulk_actions
            .as_deref()
            .ok_or(Error::MissingRoute("threadBulkActions"))?;
        let mut body = Map::new();
        body.insert("action".into(), Value::String(action.name().into()));
        body.insert("thread_ids".into(), json!(thread_ids));
        body.insert("payload".into(), Value::Object(action.payload()));
        self.client.post_json(path, body).await
    }

    pub async fn empty_trash(&self, account_id: Option<AccountId>) -> Result<EmptyTrashResult> {
        let mut body = Map::new();
        if let Some(id) = account_id.filter(|id| *id > 0) {
            body.insert("account_id".into(), json!(id));
        }
        let response = self.client.post_json_raw(&self.routes.empty_trash, body).await?;
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::NoData("Não recebemos confirmação do servidor.".into()));
        }
        response.json()
    }

    pub async fn sync_account(&self, account_id: AccountId, request: &SyncRequest) -> Result<SyncResult> {
        let path = format!("{}/{}/sync", self.routes.account_sync_base, account_id);
        let mut form = FormData::new();
        form.push_text("mode", "async");
        form.push_text("limit", request.limit.to_string());
        form.push_text("lookback_days", request.lookback_days.to_string());
        if let Some(folder) = &request.folder {
            form.push_text("folders", folder.clone());
        }
        self.client.post_form(&path, form).await
    }

    pub async fn compose(&self, mode: ComposeMode, form: FormData) -> Result<ComposeResult> {
        let path = match mode {
            ComposeMode::Send => &self.routes.compose_send,
            ComposeMode::Draft => &self.routes.compose_draft,
        };
        let response = self.client.post_form_raw(path, form).await?;
        reject_error_field(&response, path)?;
        response.json()
    }

    pub async fn drafts(&self, account_id: Option<AccountId>, limit: Option<u32>) -> Result<DraftList> {
        let mut params = Vec::new();
        if let Some(id) = account_id.filter(|id| *id > 0) {
            params.push(("account_id".to_string(), id.to_string()));
        }
        let limit = limit.unwrap_or(DEFAULT_DRAFTS_LIMIT).clamp(1, MAX_DRAFTS_LIMIT);
        params.push(("limit".to_string(), limit.to_string()));
        self.client.get_json(&self.routes.compose_drafts, params).await
    }

    pub async fn contact_suggestions(&self, term: &str) -> Result<ContactSuggestions> {
        let path = self
            .routes
            .contact_search
            .as_deref()
            .ok_or(Error::MissingRoute("contactSearch"))?;
        let params = vec![
            ("q".to_string(), term.to_string()),
            ("limit".to_string(), CONTACT_SUGGESTION_LIMIT.to_string()),
        ];
        self.client.get_json(path, params).await
    }

    pub async fn audience_recipients(&self, list_id: i64) -> Result<AudienceRecipients> {
        let path = self
            .routes
            .compose_audience_recipients
            .as_deref()
            .ok_or_else(|| Error::Validation("Endpoint de grupos não configurado.".into()))?;
        let response = self
            .client
            .send(ApiRequest::get(path).with_query(vec![("list_id".to_string(), list_id.to_string())]))
            .await?;
        reject_error_field(&response, path)?;
        response.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::FakeTransport;
    use crate::transport::Method;

    fn api(fake: &Arc<FakeTransport>) -> InboxApi {
        let client = ApiClient::new(fake.clone(), AlertQueue::new(), "csrf");
        InboxApi::new(client, Routes::default())
    }

    #[tokio::test]
    async fn list_threads_sends_filters() {
        let fake = FakeTransport::new();
        fake.ok(Method::Get, "/email/inbox/threads", json!({"threads": [{"id": 1}]}));
        let list = api(&fake)
            .list_threads(ThreadListQuery {
                account_id: Some(2),
                folder_id: None,
                limit: 30,
                include_folders: true,
            })
            .await
            .unwrap();
        assert_eq!(list.threads.len(), 1);
        let req = &fake.requests()[0];
        assert_eq!(req.query_value("account_id"), Some("2"));
        assert_eq!(req.query_value("folder_id"), None);
        assert_eq!(req.query_value("limit"), Some("30"));
        assert_eq!(req.query_value("include_folders"), Some("1"));
    }

    #[tokio::test]
    async fn http_failure_alerts_and_keeps_server_message() {
        let fake = FakeTransport::new();
        fake.respond(Method::Post, "/email/inbox/threads/5/actions", 422, json!({"error": "Ação inválida"}));
        let api = api(&fake);
        let err = api.thread_action(5, ThreadAction::Trash).await.unwrap_err();
        assert_eq!(err.user_message("x"), "Ação inválida");
        let alert = api.client().alerts().current().unwrap();
        assert_eq!(alert.message, "Falha ao chamar /email/inbox/threads/5/actions (HTTP 422)");
        assert_eq!(alert.tone, Tone::Error);
    }

    #[tokio::test]
    async fn network_failure_alerts() {
        let fake = FakeTransport::new();
        fake.fail(Method::Get, "/email/inbox/messages/3", "connection refused");
        let api = api(&fake);
        let err = api.message_detail(3).await.unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
        assert_eq!(
            api.client().alerts().current().map(|a| a.message),
            Some("Erro de rede em /email/inbox/messages/3".to_string())
        );
    }

    #[tokio::test]
    async fn dedicated_endpoints_omit_action_field() {
        let fake = FakeTransport::new();
        fake.ok(Method::Post, "/email/inbox/threads/9/star", json!({}));
        fake.ok(Method::Post, "/email/inbox/threads/9/actions", json!({}));
        let api = api(&fake);
        api.thread_action(9, ThreadAction::Star { starred: true }).await.unwrap();
        api.thread_action(9, ThreadAction::MarkRead).await.unwrap();
        let reqs = fake.requests();
        let star = reqs[0].json_body().unwrap();
        assert_eq!(star["starred"], true);
        assert_eq!(star["_token"], "csrf");
        assert!(star.get("action").is_none());
        assert_eq!(reqs[1].json_body().unwrap()["action"], "mark_read");
    }

    #[tokio::test]
    async fn bulk_body_shape() {
        let fake = FakeTransport::new();
        fake.ok(Method::Post, "/email/inbox/threads/bulk-actions", json!({"count": 2}));
        let result = api(&fake)
            .bulk_action(&[1, 2], ThreadAction::Move { folder_id: 7 })
            .await
            .unwrap();
        assert_eq!(result.count, Some(2));
        let body = fake.requests()[0].json_body().cloned().unwrap();
        assert_eq!(body["action"], "move");
        assert_eq!(body["thread_ids"], json!([1, 2]));
        assert_eq!(body["payload"], json!({"folder_id": 7}));
    }

    #[tokio::test]
    async fn compose_rejects_error_field_on_success() {
        let fake = FakeTransport::new();
        fake.ok(Method::Post, "/email/inbox/compose", json!({"error": "Destinatário inválido"}));
        let mut form = FormData::new();
        form.push_text("to", "x");
        let err = api(&fake).compose(ComposeMode::Send, form).await.unwrap_err();
        assert_eq!(err.user_message("Falha"), "Destinatário inválido");
        assert_eq!(fake.requests()[0].form_body().unwrap().get("_token"), Some("csrf"));
    }

    #[tokio::test]
    async fn sync_form_and_drafts_limit() {
        let fake = FakeTransport::new();
        fake.ok(Method::Post, "/email/inbox/accounts/4/sync", json!({"status": "queued"}));
        fake.ok(Method::Get, "/email/inbox/compose/drafts", json!({"drafts": []}));
        let api = api(&fake);
        let result = api
            .sync_account(4, &SyncRequest::for_folder(Some("INBOX")))
            .await
            .unwrap();
        assert!(result.is_queued());
        api.drafts(None, Some(99)).await.unwrap();
        let reqs = fake.requests();
        let form = reqs[0].form_body().unwrap();
        assert_eq!(form.get("mode"), Some("async"));
        assert_eq!(form.get("limit"), Some("150"));
        assert_eq!(form.get("lookback_days"), Some("120"));
        assert_eq!(form.get("folders"), Some("INBOX"));
        assert_eq!(reqs[1].query_value("limit"), Some("30"));
    }

    #[tokio::test]
    async fn empty_trash_requires_a_body() {
        let fake = FakeTransport::new();
        fake.respond(Method::Post, "/email/inbox/trash/empty", 200, Value::Null);
        let err = api(&fake).empty_trash(Some(1)).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(fake.requests()[0].json_body().unwrap()["account_id"], 1);
    }

    #[test]
    fn wide_sync_without_folder() {
        let wide = SyncRequest::for_folder(Some("  "));
        assert_eq!((wide.limit, wide.lookback_days, wide.folder), (200, 365, None));
    }
}
