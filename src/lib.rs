pub mod access;
pub mod api;
pub mod compose;
pub mod config;
pub mod debounce;
pub mod detail;
pub mod error;
pub mod folders;
pub mod format;
pub mod inbox;
pub mod models;
pub mod permissions;
pub mod render;
pub mod status;
pub mod store;
pub mod transport;

// Re-export the types most consumers need
pub use access::{AdminAction, AdminApi};
pub use api::{ApiClient, InboxApi};
pub use compose::{Composer, ComposerEvent, ComposerKind};
pub use config::{ClientConfig, Routes};
pub use error::{Error, Result};
pub use inbox::{InboxController, InboxEvent};
pub use permissions::PermissionMatrix;
pub use status::{AlertQueue, StatusLine, Tone};
pub use store::{LocalStorage, LocalThreadCache};
pub use transport::{HttpTransport, Transport};
