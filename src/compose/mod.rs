//! The message composer and the helpers that prefill and assist it.

pub mod composer;
pub mod contacts;
pub mod preset;

pub use composer::{
    launch_standalone_window, ComposeFields, ComposeTemplate, Composer, ComposerEvent,
    ComposerKind, Field, Phase, MAX_COMPOSER_ATTACHMENTS,
};
pub use contacts::{ContactLookup, SuggestionKey, SuggestionList};
pub use preset::{derive_preset, ComposerPreset, ForwardAttachment, ReplyContext, ReplyMode};
