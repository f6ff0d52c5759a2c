mod bulk;
mod controller;
pub mod filters;
pub mod grouping;
pub mod selection;
pub mod state;
mod sync;
#[cfg(test)]
mod testing;
mod trash;

pub use bulk::{BulkToolbar, LOCAL_PURGE_CONFIRM};
pub use controller::{InboxController, InboxEvent, SEARCH_FAILED};
pub use filters::{search_status_text, QuickFilter, SearchFilters};
pub use grouping::{render_thread_list, Bucket, RenderContext, ThreadCard, ThreadGroup, ThreadListView};
pub use selection::{ClickOutcome, Modifiers, SelectionModel};
pub use state::{FolderSelection, InboxState, MoveOption, SyncCapability, ThreadHeader};
pub use sync::SyncControls;
pub use trash::{
    TrashPreview, TrashPreviewItem, TRASH_EMPTY_CONFIRM, TRASH_EMPTY_CONFIRM_AGAIN, TRASH_EMPTY_DEFAULT,
    TRASH_PREVIEW_LIMIT,
};
