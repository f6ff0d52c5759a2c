//! The HTTP seam. Everything that talks to the backend goes through a
//! [`Transport`], so view models can be driven by a fake in tests.

use reqwest::header::{HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

// ---------------------------------------------------------------------------
// Form bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File(FileUpload),
}

/// Ordered multi-valued form fields (`attachments[]` repeats).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    fields: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), FormValue::Text(value.into())));
    }

    pub fn push_file(&mut self, name: impl Into<String>, file: FileUpload) {
        self.fields.push((name.into(), FormValue::File(file)));
    }

    /// Replace every value of `name` with a single text value.
    pub fn set_text(&mut self, name: &str, value: impl Into<String>) {
        self.fields.retain(|(k, _)| k != name);
        self.push_text(name, value);
    }

    /// First text value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|(k, v)| match v {
            FormValue::Text(t) if k == name => Some(t.as_str()),
            _ => None,
        })
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter_map(|(k, v)| match v {
                FormValue::Text(t) if k == name => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &FileUpload)> {
        self.fields.iter().filter_map(|(k, v)| match v {
            FormValue::File(f) => Some((k.as_str(), f)),
            FormValue::Text(_) => None,
        })
    }

    pub fn has_files(&self) -> bool {
        self.files().next().is_some()
    }

    pub fn fields(&self) -> &[(String, FormValue)] {
        &self.fields
    }

    fn text_pairs(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(k, v)| match v {
                FormValue::Text(t) => Some((k.as_str(), t.as_str())),
                FormValue::File(_) => None,
            })
            .collect()
    }

    fn into_multipart(self) -> std::result::Result<reqwest::multipart::Form, String> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in self.fields {
            form = match value {
                FormValue::Text(text) => form.text(name, text),
                FormValue::File(file) => {
                    let mut part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.filename);
                    if let Some(mime) = file.mime_type.as_deref() {
                        part = part
                            .mime_str(mime)
                            .map_err(|e| format!("Invalid attachment type {mime}: {e}"))?;
                    }
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    None,
    Json(Value),
    Form(FormData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Route path (or absolute URL) as resolved by [`crate::config::Routes`].
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: Body::None,
        }
    }

    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        ApiRequest {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Body::Json(body),
        }
    }

    pub fn post_form(path: impl Into<String>, form: FormData) -> Self {
        ApiRequest {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Body::Form(form),
        }
    }

    pub fn with_query(mut self, params: Vec<(String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn form_body(&self) -> Option<&FormData> {
        match &self.body {
            Body::Form(f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body. An empty body decodes as `{}`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_str("{}")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The backend's free-text `error` field, trimmed, when present.
    pub fn error_field(&self) -> Option<String> {
        let value: Value = serde_json::from_slice(&self.body).ok()?;
        value
            .get("error")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Executes one request. `Err` means no response was received at all;
/// HTTP error statuses are still `Ok`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> std::result::Result<ApiResponse, String>;
}

/// `reqwest`-backed transport carrying the AJAX headers the backend expects.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    csrf_token: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, csrf_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mailpanel-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(HttpTransport {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            csrf_token: csrf_token.trim().to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.base_url, &config.csrf_token)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> std::result::Result<ApiResponse, String> {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        builder = builder
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header("X-Requested-With", "XMLHttpRequest");
        if !self.csrf_token.is_empty() {
            builder = builder.header("X-CSRF-TOKEN", self.csrf_token.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            Body::None => builder,
            Body::Json(value) => builder.json(&value),
            Body::Form(form) if form.has_files() => builder.multipart(form.into_multipart()?),
            Body::Form(form) => builder.form(&form.text_pairs()),
        };

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use serde_json::Value;

    use super::{ApiRequest, ApiResponse, Method, Transport};

    #[derive(Clone)]
    enum Reply {
        Response(ApiResponse),
        NetworkError(String),
    }

    #[derive(Default)]
    struct FakeState {
        replies: HashMap<(Method, String), VecDeque<Reply>>,
        requests: Vec<ApiRequest>,
    }

    /// Replays canned replies per `(method, path)`. Queued replies are used
    /// in order; the last one repeats. Unknown routes answer 404.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        state: Mutex<FakeState>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn queue(&self, method: Method, path: &str, reply: Reply) {
            self.state
                .lock()
                .unwrap()
                .replies
                .entry((method, path.to_string()))
                .or_default()
                .push_back(reply);
        }

        pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
            let response = ApiResponse {
                status,
                body: serde_json::to_vec(&body).unwrap(),
            };
            self.queue(method, path, Reply::Response(response));
        }

        pub(crate) fn ok(&self, method: Method, path: &str, body: Value) {
            self.respond(method, path, 200, body);
        }

        pub(crate) fn fail(&self, method: Method, path: &str, reason: &str) {
            self.queue(method, path, Reply::NetworkError(reason.to_string()));
        }

        pub(crate) fn requests(&self) -> Vec<ApiRequest> {
            self.state.lock().unwrap().requests.clone()
        }

        pub(crate) fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
            self.requests().into_iter().filter(|r| r.path == path).collect()
        }
    }

    #[async_trait::async_trait]
    impl Transport for FakeTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, String> {
            let mut state = self.state.lock().unwrap();
            let key = (request.method, request.path.clone());
            state.requests.push(request);
            let reply = match state.replies.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };
            match reply {
                Some(Reply::Response(r)) => Ok(r),
                Some(Reply::NetworkError(e)) => Err(e),
                None => Ok(ApiResponse {
                    status: 404,
                    body: br#"{"error":"not found"}"#.to_vec(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn form_fields_keep_order_and_repeats() {
        let mut form = FormData::new();
        form.push_text("_token", "t");
        form.push_text("attachments[]", "a");
        form.push_text("attachments[]", "b");
        form.set_text("_token", "u");
        assert_eq!(form.get("_token"), Some("u"));
        assert_eq!(form.get_all("attachments[]"), vec!["a", "b"]);
        assert!(!form.has_files());
        form.push_file(
            "attachments[]",
            FileUpload {
                filename: "x.pdf".into(),
                mime_type: Some("application/pdf".into()),
                bytes: vec![1, 2],
            },
        );
        assert!(form.has_files());
        assert_eq!(form.text_pairs().len(), 3);
    }

    #[test]
    fn response_helpers() {
        let r = ApiResponse {
            status: 422,
            body: br#"{"error":"  Conta obrigatoria "}"#.to_vec(),
        };
        assert!(!r.is_success());
        assert_eq!(r.error_field().as_deref(), Some("Conta obrigatoria"));

        let r = ApiResponse {
            status: 204,
            body: Vec::new(),
        };
        assert!(r.is_success());
        let v: Value = r.json().unwrap();
        assert_eq!(v, json!({}));
        assert_eq!(r.error_field(), None);
    }

    #[test]
    fn urls_join_base_and_path() {
        let t = HttpTransport::new("https://crm.example.com/", "tok").unwrap();
        assert_eq!(t.url("/email/inbox/threads"), "https://crm.example.com/email/inbox/threads");
        assert_eq!(t.url("admin/users"), "https://crm.example.com/admin/users");
        assert_eq!(t.url("http://other/x"), "http://other/x");
    }

    #[tokio::test]
    async fn fake_replays_last_reply() {
        let fake = fake::FakeTransport::new();
        fake.ok(Method::Get, "/a", json!({"n": 1}));
        fake.ok(Method::Get, "/a", json!({"n": 2}));
        let first = fake.execute(ApiRequest::get("/a")).await.unwrap();
        let second = fake.execute(ApiRequest::get("/a")).await.unwrap();
        let third = fake.execute(ApiRequest::get("/a")).await.unwrap();
        assert_eq!(first.json::<Value>().unwrap()["n"], 1);
        assert_eq!(second.json::<Value>().unwrap()["n"], 2);
        assert_eq!(third.json::<Value>().unwrap()["n"], 2);
        let missing = fake.execute(ApiRequest::get("/b")).await.unwrap();
        assert_eq!(missing.status, 404);
        assert_eq!(fake.requests().len(), 4);
    }
}
