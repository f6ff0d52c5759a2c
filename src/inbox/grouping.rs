//! Date buckets and thread cards for the thread list.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone};

use crate::folders::{folder_ref_label, is_trash_like};
use crate::format::{escape_html, format_timestamp, highlight_search_text};
use crate::models::{FolderId, Thread, ThreadId};

const DAY_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    Older,
    NoDate,
}

impl Bucket {
    /// Display order of the groups.
    pub const ORDER: [Bucket; 6] = [
        Bucket::Today,
        Bucket::Yesterday,
        Bucket::ThisWeek,
        Bucket::ThisMonth,
        Bucket::Older,
        Bucket::NoDate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Today => "Hoje",
            Bucket::Yesterday => "Ontem",
            Bucket::ThisWeek => "Esta semana",
            Bucket::ThisMonth => "Este mês",
            Bucket::Older => "Mais antigas",
            Bucket::NoDate => "Sem data",
        }
    }
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> i64 {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.timestamp(),
        // Midnight skipped by a DST jump; the offset-free instant is close enough.
        None => naive.and_utc().timestamp(),
    }
}

/// Bucket of a `last_message_at` timestamp (seconds) relative to `now`.
///
/// Boundaries are local midnights: yesterday starts 24h before today, the
/// week on Monday, the month on its first day.
pub fn bucket_for<Tz: TimeZone>(timestamp: Option<i64>, now: &DateTime<Tz>) -> Bucket {
    let ts = match timestamp.filter(|t| *t > 0) {
        Some(t) => t,
        None => return Bucket::NoDate,
    };
    let tz = now.timezone();
    let today = now.date_naive();
    let start_of_today = local_midnight(&tz, today);
    let start_of_yesterday = start_of_today - DAY_SECS;
    let start_of_week = start_of_today - i64::from(today.weekday().num_days_from_monday()) * DAY_SECS;
    let start_of_month = local_midnight(&tz, today.with_day(1).unwrap_or(today));

    if ts >= start_of_today {
        Bucket::Today
    } else if ts >= start_of_yesterday {
        Bucket::Yesterday
    } else if ts >= start_of_week {
        Bucket::ThisWeek
    } else if ts >= start_of_month {
        Bucket::ThisMonth
    } else {
        Bucket::Older
    }
}

/// Non-empty buckets in display order. Server order is kept inside a bucket.
pub fn group_threads<'a, Tz: TimeZone>(
    threads: &'a [Thread],
    now: &DateTime<Tz>,
) -> Vec<(Bucket, Vec<&'a Thread>)> {
    let tagged: Vec<(Bucket, &Thread)> = threads
        .iter()
        .map(|t| (bucket_for(t.last_message_at, now), t))
        .collect();
    Bucket::ORDER
        .iter()
        .filter_map(|bucket| {
            let members: Vec<&Thread> = tagged
                .iter()
                .filter(|(b, _)| b == bucket)
                .map(|(_, t)| *t)
                .collect();
            (!members.is_empty()).then_some((*bucket, members))
        })
        .collect()
}

/// Threads the list actually shows.
///
/// Outside search mode a selected folder is re-checked client side (the
/// backend may ignore `folder_id`), and "all folders" hides trash and spam.
pub fn visible_threads(threads: &[Thread], folder_id: Option<FolderId>, search_mode: bool) -> Vec<Thread> {
    if search_mode {
        return threads.to_vec();
    }
    threads
        .iter()
        .filter(|t| match folder_id {
            Some(id) => t.folder_id() == Some(id),
            None => !is_trash_like(t.folder.as_ref()),
        })
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// View models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadCard {
    pub id: ThreadId,
    /// Escaped, or highlighted in search mode.
    pub subject_html: String,
    pub snippet_html: String,
    pub starred: bool,
    pub star_glyph: &'static str,
    /// `"N novas"`; empty when everything is read.
    pub unread_label: String,
    pub folder_label: String,
    pub date_label: String,
    pub is_active: bool,
    pub is_selected: bool,
}

impl ThreadCard {
    pub fn build(
        thread: &Thread,
        active: Option<ThreadId>,
        selected: &HashSet<ThreadId>,
        highlight: Option<&str>,
    ) -> Self {
        let subject = thread.subject.as_deref().unwrap_or("(no subject)");
        let snippet = thread.snippet.as_deref().unwrap_or("No preview captured yet.");
        let render = |text: &str| match highlight {
            Some(query) => highlight_search_text(text, query),
            None => escape_html(text),
        };
        let starred = thread.is_starred();
        ThreadCard {
            id: thread.id,
            subject_html: render(subject),
            snippet_html: render(snippet),
            starred,
            star_glyph: if starred { "★" } else { "☆" },
            unread_label: if thread.unread_count > 0 {
                format!("{} novas", thread.unread_count)
            } else {
                String::new()
            },
            folder_label: folder_ref_label(thread.folder.as_ref()),
            date_label: format_timestamp(thread.last_message_at),
            is_active: active == Some(thread.id),
            is_selected: selected.contains(&thread.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadGroup {
    pub bucket: Bucket,
    pub cards: Vec<ThreadCard>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadMoreButton {
    pub hidden: bool,
    pub disabled: bool,
    pub label: &'static str,
}

/// Everything the thread list panel draws.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThreadListView {
    pub groups: Vec<ThreadGroup>,
    /// Card ids in on-screen order; shift-range selection walks this.
    pub visible_ids: Vec<ThreadId>,
    pub empty_message: Option<&'static str>,
    pub load_more: LoadMoreButton,
}

pub struct RenderContext<'a> {
    pub folder_id: Option<FolderId>,
    pub search_mode: bool,
    pub query: &'a str,
    pub active_thread: Option<ThreadId>,
    pub selected: &'a HashSet<ThreadId>,
    pub has_more: bool,
    pub limit: u32,
}

/// Filter, bucket and card the threads. Returns the view and the threads
/// that ended up visible.
pub fn render_thread_list<Tz: TimeZone>(
    threads: &[Thread],
    ctx: &RenderContext<'_>,
    now: &DateTime<Tz>,
) -> (ThreadListView, Vec<Thread>) {
    let visible = visible_threads(threads, ctx.folder_id, ctx.search_mode);
    if visible.is_empty() {
        let message = if ctx.search_mode {
            "Nenhuma conversa corresponde aos filtros aplicados."
        } else {
            "No threads for this folder."
        };
        let view = ThreadListView {
            empty_message: Some(message),
            load_more: load_more_button(false, ctx.has_more, 0, ctx.limit),
            ..Default::default()
        };
        return (view, visible);
    }

    let highlight = ctx.search_mode.then_some(ctx.query);
    let mut visible_ids = Vec::with_capacity(visible.len());
    let groups = group_threads(&visible, now)
        .into_iter()
        .map(|(bucket, members)| ThreadGroup {
            bucket,
            cards: members
                .into_iter()
                .map(|t| {
                    visible_ids.push(t.id);
                    ThreadCard::build(t, ctx.active_thread, ctx.selected, highlight)
                })
                .collect(),
        })
        .collect();

    let view = ThreadListView {
        groups,
        load_more: load_more_button(true, ctx.has_more, visible.len(), ctx.limit),
        visible_ids,
        empty_message: None,
    };
    (view, visible)
}

fn load_more_button(has_threads: bool, has_more: bool, shown: usize, limit: u32) -> LoadMoreButton {
    let more = has_more || shown >= limit as usize;
    LoadMoreButton {
        hidden: !has_threads,
        disabled: !more,
        label: if more { "Carregar mais" } else { "Nada mais para carregar" },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use serde_json::json;

    fn thread(id: i64, ts: i64, folder: serde_json::Value) -> Thread {
        serde_json::from_value(json!({
            "id": id,
            "last_message_at": ts,
            "folder": folder,
            "subject": format!("t{id}")
        }))
        .unwrap()
    }

    // Wednesday 2025-03-12 15:00 at UTC-3.
    fn now() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 12, 15, 0, 0)
            .unwrap()
    }

    fn at(day: u32, hour: u32) -> Option<i64> {
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        Some(tz.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap().timestamp())
    }

    #[test]
    fn buckets_follow_local_midnight() {
        let now = now();
        assert_eq!(bucket_for(at(12, 0), &now), Bucket::Today);
        assert_eq!(bucket_for(at(11, 23), &now), Bucket::Yesterday);
        assert_eq!(bucket_for(at(11, 0), &now), Bucket::Yesterday);
        assert_eq!(bucket_for(at(10, 9), &now), Bucket::ThisWeek);
        assert_eq!(bucket_for(at(9, 23), &now), Bucket::ThisMonth);
        assert_eq!(bucket_for(at(1, 0), &now), Bucket::ThisMonth);
        assert_eq!(bucket_for(Some(at(1, 0).unwrap() - 1), &now), Bucket::Older);
        assert_eq!(bucket_for(Some(0), &now), Bucket::NoDate);
        assert_eq!(bucket_for(None, &now), Bucket::NoDate);
        assert_eq!(Bucket::ThisMonth.label(), "Este mês");
    }

    #[test]
    fn groups_keep_server_order() {
        let threads = vec![
            thread(1, at(1, 0).unwrap(), json!(null)),
            thread(2, at(12, 9).unwrap(), json!(null)),
            thread(3, 0, json!(null)),
            thread(4, at(12, 8).unwrap(), json!(null)),
        ];
        let groups = group_threads(&threads, &now());
        let shape: Vec<(Bucket, Vec<i64>)> = groups
            .iter()
            .map(|(b, ts)| (*b, ts.iter().map(|t| t.id).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (Bucket::Today, vec![2, 4]),
                (Bucket::ThisMonth, vec![1]),
                (Bucket::NoDate, vec![3]),
            ]
        );
    }

    #[test]
    fn all_folders_hides_trash_and_spam() {
        let threads = vec![
            thread(1, 1, json!({"id": 1, "type": "inbox"})),
            thread(2, 1, json!({"id": 2, "type": "deleted"})),
            thread(3, 1, json!({"id": 3, "type": "spam"})),
            thread(4, 1, json!({"id": 1, "type": "inbox"})),
        ];
        let ids = |v: Vec<Thread>| v.into_iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids(visible_threads(&threads, None, false)), vec![1, 4]);
        assert_eq!(ids(visible_threads(&threads, Some(2), false)), vec![2]);
        assert_eq!(ids(visible_threads(&threads, Some(2), true)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn card_defaults_and_highlight() {
        let mut t = thread(5, 1, json!({"id": 1, "type": "inbox", "display_name": "INBOX"}));
        t.subject = None;
        t.unread_count = 2;
        t.flags = vec!["flagged".into()];
        let selected = HashSet::from([5]);
        let card = ThreadCard::build(&t, Some(5), &selected, None);
        assert_eq!(card.subject_html, "(no subject)");
        assert_eq!(card.snippet_html, "No preview captured yet.");
        assert_eq!(card.unread_label, "2 novas");
        assert_eq!(card.star_glyph, "★");
        assert!(card.is_active && card.is_selected);

        t.subject = Some("Contrato <novo>".into());
        let card = ThreadCard::build(&t, None, &HashSet::new(), Some("contrato"));
        assert_eq!(
            card.subject_html,
            "<mark class=\"search-hit\">Contrato</mark> &lt;novo&gt;"
        );
    }

    #[test]
    fn empty_list_messages() {
        let selected = HashSet::new();
        let mut ctx = RenderContext {
            folder_id: None,
            search_mode: false,
            query: "",
            active_thread: None,
            selected: &selected,
            has_more: false,
            limit: 30,
        };
        let (view, _) = render_thread_list(&[], &ctx, &Utc::now());
        assert_eq!(view.empty_message, Some("No threads for this folder."));
        assert!(view.load_more.hidden);
        ctx.search_mode = true;
        let (view, _) = render_thread_list(&[], &ctx, &Utc::now());
        assert_eq!(
            view.empty_message,
            Some("Nenhuma conversa corresponde aos filtros aplicados.")
        );
    }

    #[test]
    fn visible_ids_follow_bucket_order() {
        let threads = vec![
            thread(1, at(1, 0).unwrap(), json!({"id": 1})),
            thread(2, at(12, 9).unwrap(), json!({"id": 1})),
        ];
        let selected = HashSet::new();
        let ctx = RenderContext {
            folder_id: Some(1),
            search_mode: false,
            query: "",
            active_thread: None,
            selected: &selected,
            has_more: false,
            limit: 2,
        };
        let (view, visible) = render_thread_list(&threads, &ctx, &now());
        assert_eq!(view.visible_ids, vec![2, 1]);
        assert_eq!(visible.len(), 2);
        assert_eq!(view.load_more.label, "Carregar mais");
        assert!(!view.load_more.disabled);
    }
}
