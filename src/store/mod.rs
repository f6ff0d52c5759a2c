mod commands;
mod handle;
mod local;
mod queries;
mod schema;

pub use handle::LocalStorage;
pub use local::{normalize_local_thread, LocalThreadCache, LOCAL_THREADS_KEY, MAX_LOCAL_THREADS};
