use std::sync::Arc;

use serde_json::{json, Value};

use super::InboxController;
use crate::api::{ApiClient, InboxApi};
use crate::config::{InboxBootstrap, Routes};
use crate::status::AlertQueue;
use crate::store::{LocalStorage, LocalThreadCache};
use crate::transport::fake::FakeTransport;

/// Folder 9 is trash in every inbox fixture.
pub(crate) const TRASH: i64 = 9;

/// A controller over `fake`, with an in-memory local folder.
pub(crate) async fn controller(fake: &Arc<FakeTransport>, bootstrap: Value) -> InboxController {
    let bootstrap: InboxBootstrap = serde_json::from_value(bootstrap).unwrap();
    let client = ApiClient::new(fake.clone(), AlertQueue::new(), "csrf");
    let api = InboxApi::new(client, Routes::resolve(&bootstrap.routes, ""));
    let local = LocalThreadCache::load(LocalStorage::open_in_memory().unwrap()).await;
    InboxController::new(&bootstrap, api, local).with_base_url("https://crm.example.com")
}

pub(crate) fn thread_json(id: i64, folder_id: i64) -> Value {
    let folder_type = if folder_id == TRASH { "trash" } else { "inbox" };
    json!({
        "id": id,
        "subject": format!("Conversa {id}"),
        "unread_count": 1,
        "last_message_at": 1_741_800_000 - id * 60,
        "folder": {"id": folder_id, "type": folder_type}
    })
}
