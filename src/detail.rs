//! Message detail panel: header, metadata rows, attachments and body tabs.

use crate::config::Routes;
use crate::folders::folder_ref_label;
use crate::format::{avatar_hue, avatar_initials, escape_html, format_bytes, format_timestamp, highlight_search_text};
use crate::models::{Message, MessageId, Role};
use crate::render::render_body;

pub const DETAIL_PLACEHOLDER: &str = "Selecione uma mensagem para visualizar o conteúdo completo.";
pub const DETAIL_LOAD_FAILED: &str = "Não foi possível carregar a mensagem selecionada.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyTab {
    Html,
    Text,
}

impl BodyTab {
    pub fn label(&self) -> &'static str {
        match self {
            BodyTab::Html => "HTML",
            BodyTab::Text => "Texto",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentLink {
    pub href: String,
    pub filename: String,
    pub size_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetaRow {
    pub label: &'static str,
    pub value_html: String,
}

/// What the detail panel shows for one message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDetail {
    pub message_id: MessageId,
    pub from_label_html: String,
    /// Escaped address, or `—` when the sender has none.
    pub from_email: String,
    pub avatar_initials: String,
    pub avatar_hue: u32,
    pub subject_html: String,
    pub sent_label: String,
    pub folder_label: String,
    pub meta: Vec<MetaRow>,
    pub attachments: Vec<AttachmentLink>,
    pub attachments_empty: Option<&'static str>,
    pub tabs: Vec<BodyTab>,
    pub active_tab: Option<BodyTab>,
    /// Raw HTML for the sandboxed frame.
    pub body_html: Option<String>,
    pub body_text_html: Option<String>,
    /// Best-effort plain rendering for text front ends.
    pub plain_text: String,
    pub empty_body: Option<&'static str>,
    pub previous_id: Option<MessageId>,
    pub next_id: Option<MessageId>,
    pub window_url: String,
    pub window_name: String,
}

fn joined_labels(message: &Message, role: Role) -> String {
    message
        .participants_with(role)
        .map(|p| p.label())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Neighbour of `current` in thread order, `offset` steps away.
pub fn adjacent_message_id(thread_order: &[MessageId], current: MessageId, offset: isize) -> Option<MessageId> {
    let index = thread_order.iter().position(|id| *id == current)?;
    let target = index.checked_add_signed(offset)?;
    thread_order.get(target).copied()
}

impl MessageDetail {
    /// `thread_order` is the ids of the open thread's messages; `query` is
    /// the active search text used for highlighting.
    pub fn build(message: &Message, thread_order: &[MessageId], routes: &Routes, query: &str) -> Self {
        let sender = message.sender();
        let from_name = sender
            .map(|p| p.label())
            .filter(|l| !l.is_empty())
            .unwrap_or("Remetente desconhecido");
        let from_email = sender.map(|p| p.email.as_str()).filter(|e| !e.is_empty());
        let avatar_seed = from_email
            .or(sender.and_then(|p| p.name.as_deref()))
            .unwrap_or(from_name);

        let to = joined_labels(message, Role::To);
        let cc = joined_labels(message, Role::Cc);
        let folder_label = escape_html(&folder_ref_label(message.folder.as_ref()));
        let sent_label = match message.sent_at.filter(|t| *t != 0) {
            Some(ts) => escape_html(&format_timestamp(Some(ts))),
            None => "—".to_string(),
        };

        let mut meta = vec![MetaRow {
            label: "Para",
            value_html: if to.is_empty() {
                "—".to_string()
            } else {
                highlight_search_text(&to, query)
            },
        }];
        if !cc.is_empty() {
            meta.push(MetaRow {
                label: "Cc",
                value_html: highlight_search_text(&cc, query),
            });
        }
        meta.push(MetaRow {
            label: "Pasta",
            value_html: folder_label.clone(),
        });
        meta.push(MetaRow {
            label: "Enviado",
            value_html: sent_label.clone(),
        });

        let attachments: Vec<AttachmentLink> = message
            .attachments
            .iter()
            .map(|a| AttachmentLink {
                href: if routes.attachment_download_base.is_empty() {
                    "#".to_string()
                } else {
                    routes.attachment_download(a.id)
                },
                filename: a.display_name().to_string(),
                size_label: format_bytes(a.size_bytes),
            })
            .collect();

        let mut tabs = Vec::new();
        if message.body_html.is_some() {
            tabs.push(BodyTab::Html);
        }
        if message.body_text.is_some() {
            tabs.push(BodyTab::Text);
        }

        MessageDetail {
            message_id: message.id,
            from_label_html: highlight_search_text(from_name, query),
            from_email: from_email.map(escape_html).unwrap_or_else(|| "—".to_string()),
            avatar_initials: avatar_initials(avatar_seed),
            avatar_hue: avatar_hue(avatar_seed),
            subject_html: highlight_search_text(message.subject.as_deref().unwrap_or("(sem assunto)"), query),
            sent_label,
            folder_label,
            meta,
            attachments_empty: attachments.is_empty().then_some("Nenhum anexo disponível."),
            attachments,
            active_tab: tabs.first().copied(),
            empty_body: tabs.is_empty().then_some("Nenhum conteúdo capturado."),
            tabs,
            body_html: message.body_html.clone(),
            body_text_html: message.body_text.as_deref().map(|t| highlight_search_text(t, query)),
            plain_text: render_body(message.body_text.as_deref(), message.body_html.as_deref()),
            previous_id: adjacent_message_id(thread_order, message.id, -1),
            next_id: adjacent_message_id(thread_order, message.id, 1),
            window_url: routes.message_window(message.id),
            window_name: format!("message_{}", message.id),
        }
    }

    /// Switch body tabs; tabs the message has no content for are ignored.
    pub fn set_active_tab(&mut self, tab: BodyTab) -> bool {
        if self.tabs.contains(&tab) {
            self.active_tab = Some(tab);
            true
        } else {
            false
        }
    }
}
