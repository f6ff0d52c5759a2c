use tokio::sync::oneshot;

pub(super) enum StorageCmd {
    GetItem {
        key: String,
        reply: oneshot::Sender<Result<Option<String>, String>>,
    },
    SetItem {
        key: String,
        value: String,
        reply: oneshot::Sender<Result<(), String>>,
    },
    RemoveItem {
        key: String,
        reply: oneshot::Sender<Result<(), String>>,
    },
    Keys {
        reply: oneshot::Sender<Result<Vec<String>, String>>,
    },
}
