//! Stateless escaping and formatting helpers shared by every view.

use chrono::{DateTime, Local, TimeZone};
use regex::RegexBuilder;

pub fn escape_html(input: &str) -> String {
    html_escape::encode_safe(input).into_owned()
}

/// Escape and wrap plain text as a single paragraph with `<br>` line breaks.
pub fn plain_text_to_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let safe = escape_html(text).replace("\r\n", "\n").replace('\n', "<br>");
    format!("<p>{safe}</p>")
}

// ---------------------------------------------------------------------------
// Sizes and dates
// ---------------------------------------------------------------------------

pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes <= 0 {
        return "0 B".to_string();
    }
    let size = bytes as f64;
    let index = ((size.ln() / 1024f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = size / 1024f64.powi(index as i32);
    if index == 0 {
        format!("{value:.0} {}", UNITS[index])
    } else {
        format!("{value:.1} {}", UNITS[index])
    }
}

/// Short list-view date (`05 Mar 14:20`), or `pending` when unknown.
pub fn format_timestamp(ts: Option<i64>) -> String {
    format_timestamp_in(ts, &Local)
}

pub fn format_timestamp_in<Tz: TimeZone>(ts: Option<i64>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match ts.filter(|t| *t != 0).and_then(|t| tz.timestamp_opt(t, 0).single()) {
        Some(dt) => dt.format("%d %b %H:%M").to_string(),
        None => "pending".to_string(),
    }
}

/// Admin-panel date (`05/03/2025 14:20`), or `fallback` when unset.
pub fn format_datetime_br(ts: Option<i64>, fallback: &str) -> String {
    match ts.filter(|t| *t > 0).and_then(|t| Local.timestamp_opt(t, 0).single()) {
        Some(dt) => dt.format("%d/%m/%Y %H:%M").to_string(),
        None => fallback.to_string(),
    }
}

pub fn format_clock<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%H:%M").to_string()
}

// ---------------------------------------------------------------------------
// Subjects
// ---------------------------------------------------------------------------

fn prefixed_subject(subject: Option<&str>, prefix: &str) -> String {
    let subject = subject.map(str::trim).unwrap_or("");
    if subject.is_empty() {
        return format!("{prefix} (sem assunto)");
    }
    let marker = prefix.to_lowercase();
    let already = subject
        .get(..marker.len())
        .is_some_and(|head| head.to_lowercase() == marker);
    if already {
        subject.to_string()
    } else {
        format!("{prefix} {subject}")
    }
}

pub fn reply_subject(subject: Option<&str>) -> String {
    prefixed_subject(subject, "Re:")
}

pub fn forward_subject(subject: Option<&str>) -> String {
    prefixed_subject(subject, "Enc:")
}

// ---------------------------------------------------------------------------
// Search highlighting
// ---------------------------------------------------------------------------

/// Up to five whitespace-separated tokens of at least two characters.
pub fn search_tokens(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|t| t.chars().count() >= 2)
        .take(5)
        .map(str::to_string)
        .collect()
}

/// Escape `input` and wrap case-insensitive token hits in `<mark>`.
///
/// Tokens are matched against the escaped text, so a query like `&` will
/// not split an entity.
pub fn highlight_search_text(input: &str, query: &str) -> String {
    let safe = escape_html(input);
    let tokens = search_tokens(query);
    if tokens.is_empty() {
        return safe;
    }
    let pattern = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    match RegexBuilder::new(&format!("({pattern})"))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re
            .replace_all(&safe, "<mark class=\"search-hit\">$1</mark>")
            .into_owned(),
        Err(e) => {
            log::debug!("highlight pattern rejected: {}", e);
            safe
        }
    }
}

// ---------------------------------------------------------------------------
// Avatars
// ---------------------------------------------------------------------------

pub fn avatar_initials(seed: &str) -> String {
    let safe = seed.trim();
    if safe.is_empty() {
        return "??".to_string();
    }
    let letters: String = safe
        .split_whitespace()
        .take(2)
        .filter_map(|w| w.chars().next())
        .collect();
    if letters.is_empty() {
        safe.chars().take(2).collect::<String>().to_uppercase()
    } else {
        letters.to_uppercase()
    }
}

/// Stable hue in `0..360` derived from the seed.
///
/// Reproduces the browser's 32-bit `hash * 31 + c` fold over UTF-16 units so
/// the same sender keeps the same colour across front ends.
pub fn avatar_hue(seed: &str) -> u32 {
    let seed = match seed.trim() {
        "" => "inbox",
        s => s,
    };
    let mut hash: i64 = 0;
    for unit in seed.encode_utf16() {
        let shifted = i64::from((hash as i32) << 5);
        hash = i64::from(unit) + shifted - hash;
    }
    (hash.unsigned_abs() % 360) as u32
}

// ---------------------------------------------------------------------------
// Documents (admin panel)
// ---------------------------------------------------------------------------

pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Format a CPF (`000.000.000-00`) or CNPJ (`00.000.000/0000-00`).
/// Other lengths come back as bare digits.
pub fn format_document(value: &str) -> String {
    let d = digits_only(value);
    match d.len() {
        11 => format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11]),
        14 => format!(
            "{}.{}.{}/{}-{}",
            &d[0..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..14]
        ),
        _ => d,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn escapes_markup() {
        let out = escape_html("<b>Tom & \"Jerry\"</b>");
        assert!(out.starts_with("&lt;b&gt;Tom &amp; "));
        assert!(!out.contains('"'));
    }

    #[test]
    fn plain_text_paragraph() {
        assert_eq!(plain_text_to_html(""), "");
        assert_eq!(plain_text_to_html("a\r\nb\nc"), "<p>a<br>b<br>c</p>");
        assert_eq!(plain_text_to_html("1 < 2"), "<p>1 &lt; 2</p>");
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(-5), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 * 1024), "3072.0 GB");
    }

    #[test]
    fn timestamps() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(format_timestamp_in(None, &utc), "pending");
        assert_eq!(format_timestamp_in(Some(0), &utc), "pending");
        // 2024-03-05 14:20:00 UTC
        assert_eq!(format_timestamp_in(Some(1_709_648_400), &utc), "05 Mar 14:20");
        assert_eq!(format_datetime_br(None, "Nunca"), "Nunca");
    }

    #[test]
    fn subjects_are_prefixed_once() {
        assert_eq!(reply_subject(Some("Proposta")), "Re: Proposta");
        assert_eq!(reply_subject(Some("RE: Proposta")), "RE: Proposta");
        assert_eq!(reply_subject(Some("  ")), "Re: (sem assunto)");
        assert_eq!(reply_subject(None), "Re: (sem assunto)");
        assert_eq!(forward_subject(Some("enc: x")), "enc: x");
        assert_eq!(forward_subject(Some("Re: x")), "Enc: Re: x");
        assert_eq!(forward_subject(None), "Enc: (sem assunto)");
    }

    #[test]
    fn tokens_are_capped() {
        assert_eq!(search_tokens(" a bb  cc dd ee ff gg "), vec!["bb", "cc", "dd", "ee", "ff"]);
        assert!(search_tokens("").is_empty());
    }

    #[test]
    fn highlight_wraps_hits_case_insensitively() {
        assert_eq!(
            highlight_search_text("Fatura de Março", "fatura"),
            "<mark class=\"search-hit\">Fatura</mark> de Março"
        );
        assert_eq!(highlight_search_text("a.b", "x"), "a.b");
        assert_eq!(
            highlight_search_text("1+1 <b>", "1+"),
            "<mark class=\"search-hit\">1+</mark>1 &lt;b&gt;"
        );
    }

    #[test]
    fn avatars() {
        assert_eq!(avatar_initials("maria da silva"), "MD");
        assert_eq!(avatar_initials("ana@x.com"), "A");
        assert_eq!(avatar_initials("   "), "??");
        // "a" folds to 97.
        assert_eq!(avatar_hue("a"), 97);
        assert_eq!(avatar_hue(""), avatar_hue("inbox"));
        assert!(avatar_hue("someone.with.a.long.address@example.com") < 360);
    }

    #[test]
    fn documents() {
        assert_eq!(digits_only("123.456.789-09"), "12345678909");
        assert_eq!(format_document("12345678909"), "123.456.789-09");
        assert_eq!(format_document("12.345.678/0001-95"), "12.345.678/0001-95");
        assert_eq!(format_document("123"), "123");
        assert_eq!(format_document("abc"), "");
    }
}
