use crate::error::{Error, Result};

/// Render a message body to plain text for display.
///
/// Prefers `body_text` when available; falls back to sanitized HTML conversion.
pub fn render_body(body_text: Option<&str>, body_html: Option<&str>) -> String {
    html_safe_md::render_email_plain(body_text, body_html)
}

/// Text content of an HTML fragment, trimmed. Empty input stays empty.
pub fn html_to_plain_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    html_safe_md::render_email_plain(None, Some(html))
        .trim()
        .to_string()
}

/// Open a URL (compose window, standalone message) in the system browser.
pub fn open_link(url: &str) -> Result<()> {
    log::debug!("Opening {}", url);
    open::that(url).map_err(|e| Error::Validation(format!("Não foi possível abrir {url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_preferred_over_html() {
        let result = render_body(Some("Olá, mundo"), Some("<p>Olá, mundo</p>"));
        assert_eq!(result, "Olá, mundo");
    }

    #[test]
    fn falls_back_to_html_when_no_plain() {
        let result = render_body(None, Some("<p>Bom dia</p>"));
        assert!(result.contains("Bom dia"));
        assert!(!result.contains("<p>"));
    }

    #[test]
    fn plain_text_returned_verbatim() {
        let input = "Linha um\n\nLinha dois\n  recuada";
        assert_eq!(render_body(Some(input), None), input);
    }

    #[test]
    fn html_to_plain_strips_tags() {
        assert_eq!(html_to_plain_text("   "), "");
        let text = html_to_plain_text("<div><b>Prezado</b> cliente</div>");
        assert!(text.contains("Prezado"));
        assert!(!text.contains('<'));
    }
}
