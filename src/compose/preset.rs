//! Prefilled composer fields for reply, reply-all and forward.

use std::collections::HashSet;

use crate::format::{format_timestamp, forward_subject, reply_subject};
use crate::models::{Account, AccountId, Direction, Message, MessageId, Role, Thread, ThreadId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    Reply,
    ReplyAll,
    Forward,
}

impl ReplyMode {
    /// `data-reply-mode` values; anything unknown is a plain reply.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "reply_all" => ReplyMode::ReplyAll,
            "forward" => ReplyMode::Forward,
            _ => ReplyMode::Reply,
        }
    }

    /// Title shown above the reply panel.
    pub fn label(&self) -> &'static str {
        match self {
            ReplyMode::Reply => "Responder",
            ReplyMode::ReplyAll => "Responder a todos",
            ReplyMode::Forward => "Encaminhar",
        }
    }
}

/// An original attachment carried into a forward by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardAttachment {
    pub id: i64,
    pub filename: String,
    pub size_bytes: i64,
}

/// Initial values for a composer. Empty strings leave a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposerPreset {
    pub thread_id: Option<ThreadId>,
    pub account_id: Option<AccountId>,
    pub draft_id: Option<MessageId>,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// Rich body; wins over `body` when non-blank.
    pub body_html: String,
    pub forward_attachments: Vec<ForwardAttachment>,
}

impl ComposerPreset {
    pub fn forward_attachment_ids(&self) -> Vec<i64> {
        self.forward_attachments
            .iter()
            .map(|a| a.id)
            .filter(|id| *id > 0)
            .collect()
    }
}

/// The open thread the preset is derived from.
pub struct ReplyContext<'a> {
    pub thread: &'a Thread,
    pub messages: &'a [Message],
    /// Account selected in the sidebar, used when the thread has none.
    pub selected_account: Option<AccountId>,
    pub accounts: &'a [Account],
}

fn addresses(message: &Message, role: Role) -> Vec<&str> {
    message
        .participants_with(role)
        .map(|p| p.email.trim())
        .filter(|e| !e.is_empty())
        .collect()
}

fn sent_label(message: &Message) -> String {
    match message.sent_at.filter(|t| *t != 0) {
        Some(ts) => format_timestamp(Some(ts)),
        None => "data desconhecida".to_string(),
    }
}

fn author_label(message: &Message) -> &str {
    message
        .sender()
        .map(|p| p.label())
        .filter(|l| !l.is_empty())
        .unwrap_or("remetente")
}

/// `\n\n--- {author} em {date} ---\n{preview}`
pub fn quoted_body(message: &Message) -> String {
    format!(
        "\n\n--- {} em {} ---\n{}",
        author_label(message),
        sent_label(message),
        message.preview()
    )
}

/// Forwarded-message header block followed by the preview.
pub fn forward_body(message: &Message) -> String {
    let mut lines = vec![
        "---------- Mensagem encaminhada ----------".to_string(),
        format!("De: {}", author_label(message)),
        format!("Enviado: {}", sent_label(message)),
    ];
    let to = addresses(message, Role::To);
    if !to.is_empty() {
        lines.push(format!("Para: {}", to.join(", ")));
    }
    let cc = addresses(message, Role::Cc);
    if !cc.is_empty() {
        lines.push(format!("Cc: {}", cc.join(", ")));
    }
    lines.push(format!(
        "Assunto: {}",
        message.subject.as_deref().unwrap_or("(sem assunto)")
    ));
    format!("\n\n{}\n{}", lines.join("\n"), message.preview())
}

/// Collects addresses for one header, skipping our own address and any
/// address already used in another header (case-insensitive).
struct RecipientCollector {
    seen: HashSet<String>,
    exclusions: HashSet<String>,
}

impl RecipientCollector {
    fn append(&mut self, source: &[&str], target: &mut Vec<String>) {
        for email in source {
            let trimmed = email.trim();
            if trimmed.is_empty() {
                continue;
            }
            let normalized = trimmed.to_lowercase();
            if self.exclusions.contains(&normalized) || !self.seen.insert(normalized) {
                continue;
            }
            target.push(trimmed.to_string());
        }
    }
}

/// Build the composer preset for `mode`.
///
/// The target is `message` when given, else the newest inbound message of
/// the thread, else its newest message.
pub fn derive_preset(mode: ReplyMode, ctx: &ReplyContext<'_>, message: Option<&Message>) -> ComposerPreset {
    let thread = ctx.thread;
    let thread_subject = thread.subject.as_deref();

    let target = message.or_else(|| {
        ctx.messages
            .iter()
            .rev()
            .find(|m| m.direction != Direction::Outbound)
            .or(ctx.messages.last())
    });
    let Some(target) = target else {
        return ComposerPreset {
            thread_id: Some(thread.id),
            subject: reply_subject(thread_subject),
            ..Default::default()
        };
    };

    let account_id = thread.account_id.or(ctx.selected_account);
    let account_email = account_id
        .and_then(|id| ctx.accounts.iter().find(|a| a.id == id))
        .and_then(|a| a.from_email.as_deref())
        .map(str::to_lowercase);
    let target_subject = target.subject.as_deref().or(thread_subject);

    if mode == ReplyMode::Forward {
        return ComposerPreset {
            thread_id: Some(thread.id),
            account_id,
            subject: forward_subject(target_subject),
            body: forward_body(target),
            forward_attachments: target
                .attachments
                .iter()
                .map(|a| ForwardAttachment {
                    id: a.id,
                    filename: a.filename.clone().unwrap_or_else(|| "anexo".to_string()),
                    size_bytes: a.size_bytes.max(0),
                })
                .collect(),
            ..Default::default()
        };
    }

    let mut collector = RecipientCollector {
        seen: HashSet::new(),
        exclusions: account_email.into_iter().collect(),
    };
    let from = addresses(target, Role::From);
    let to_addresses = addresses(target, Role::To);
    let mut to = Vec::new();
    let mut cc = Vec::new();
    if mode == ReplyMode::ReplyAll {
        collector.append(&from, &mut to);
        collector.append(&to_addresses, &mut to);
        collector.append(&addresses(target, Role::Cc), &mut cc);
    } else if target.direction == Direction::Outbound {
        collector.append(&to_addresses, &mut to);
    } else {
        collector.append(&from, &mut to);
        if to.is_empty() {
            collector.append(&to_addresses, &mut to);
        }
    }

    ComposerPreset {
        thread_id: Some(thread.id),
        account_id,
        to: to.join(", "),
        cc: cc.join(", "),
        subject: reply_subject(target_subject),
        body: quoted_body(target),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn thread() -> Thread {
        serde_json::from_value(json!({"id": 4, "subject": "Orçamento", "account_id": 1})).unwrap()
    }

    fn account() -> Account {
        serde_json::from_value(json!({"id": 1, "from_email": "Eu@Empresa.com"})).unwrap()
    }

    fn inbound() -> Message {
        serde_json::from_value(json!({
            "id": 10,
            "direction": "inbound",
            "subject": "Re: Orçamento",
            "body_preview": "Pode ser amanhã?",
            "participants": [
                {"role": "from", "name": "Ana", "email": "ana@cliente.com"},
                {"role": "to", "email": "eu@empresa.com"},
                {"role": "to", "email": "bia@cliente.com"},
                {"role": "cc", "email": "ANA@cliente.com"},
                {"role": "cc", "email": "caio@cliente.com"},
                {"role": "cc", "email": ""}
            ],
            "attachments": [{"id": 3, "size_bytes": 100}, {"id": 0, "filename": "x"}]
        }))
        .unwrap()
    }

    fn outbound() -> Message {
        serde_json::from_value(json!({
            "id": 11,
            "direction": "outbound",
            "participants": [
                {"role": "from", "email": "eu@empresa.com"},
                {"role": "to", "email": "dora@cliente.com"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn reply_all_dedupes_and_excludes_own_address() {
        let (t, messages, accounts) = (thread(), vec![inbound(), outbound()], vec![account()]);
        let ctx = ReplyContext {
            thread: &t,
            messages: &messages,
            selected_account: None,
            accounts: &accounts,
        };
        let p = derive_preset(ReplyMode::ReplyAll, &ctx, None);
        assert_eq!(p.to, "ana@cliente.com, bia@cliente.com");
        assert_eq!(p.cc, "caio@cliente.com");
        assert_eq!(p.subject, "Re: Orçamento");
        assert_eq!(p.account_id, Some(1));
        assert!(p.body.starts_with("\n\n--- Ana em "));
        assert!(p.body.ends_with(" ---\nPode ser amanhã?"));
    }

    #[test]
    fn reply_targets_sender_or_original_recipients() {
        let (t, accounts) = (thread(), vec![account()]);
        let messages = vec![inbound()];
        let ctx = ReplyContext {
            thread: &t,
            messages: &messages,
            selected_account: None,
            accounts: &accounts,
        };
        assert_eq!(derive_preset(ReplyMode::Reply, &ctx, None).to, "ana@cliente.com");

        let sent = outbound();
        let p = derive_preset(ReplyMode::Reply, &ctx, Some(&sent));
        assert_eq!(p.to, "dora@cliente.com");
        assert_eq!(p.subject, "Re: Orçamento");
        assert_eq!(p.cc, "");
        assert!(p.body.contains("--- eu@empresa.com em data desconhecida ---"));
    }

    #[test]
    fn reply_falls_back_to_to_without_sender() {
        let t = thread();
        let m: Message = serde_json::from_value(json!({
            "id": 1,
            "participants": [{"role": "to", "email": "x@y.com"}]
        }))
        .unwrap();
        let messages = vec![m];
        let ctx = ReplyContext {
            thread: &t,
            messages: &messages,
            selected_account: None,
            accounts: &[],
        };
        let p = derive_preset(ReplyMode::Reply, &ctx, None);
        assert_eq!(p.to, "x@y.com");
        assert!(p.body.starts_with("\n\n--- remetente em data desconhecida ---"));
    }

    #[test]
    fn forward_carries_attachments_by_reference() {
        let (t, messages) = (thread(), vec![inbound()]);
        let ctx = ReplyContext {
            thread: &t,
            messages: &messages,
            selected_account: Some(9),
            accounts: &[],
        };
        let p = derive_preset(ReplyMode::Forward, &ctx, None);
        assert_eq!(p.to, "");
        assert_eq!(p.subject, "Enc: Re: Orçamento");
        assert_eq!(p.forward_attachment_ids(), vec![3]);
        assert_eq!(p.forward_attachments[0].filename, "anexo");
        assert_eq!(p.forward_attachments[1].filename, "x");
        assert_eq!(
            p.body,
            "\n\n---------- Mensagem encaminhada ----------\nDe: Ana\nEnviado: data desconhecida\n\
             Para: eu@empresa.com, bia@cliente.com\nCc: ANA@cliente.com, caio@cliente.com\n\
             Assunto: Re: Orçamento\nPode ser amanhã?"
        );
    }

    #[test]
    fn empty_thread_only_sets_subject() {
        let t = thread();
        let ctx = ReplyContext {
            thread: &t,
            messages: &[],
            selected_account: None,
            accounts: &[],
        };
        let p = derive_preset(ReplyMode::ReplyAll, &ctx, None);
        assert_eq!(p.thread_id, Some(4));
        assert_eq!(p.subject, "Re: Orçamento");
        assert_eq!(p.account_id, None);
        assert_eq!(p.to, "");
    }

    #[test]
    fn mode_parse() {
        assert_eq!(ReplyMode::parse("reply_all"), ReplyMode::ReplyAll);
        assert_eq!(ReplyMode::parse("forward"), ReplyMode::Forward);
        assert_eq!(ReplyMode::parse("whatever"), ReplyMode::Reply);
        assert_eq!(ReplyMode::ReplyAll.label(), "Responder a todos");
    }
}
