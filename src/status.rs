use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

pub const ALERT_DEFAULT: Duration = Duration::from_millis(3800);
pub const ALERT_FETCH_FAILURE: Duration = Duration::from_millis(6000);
pub const ALERT_INIT_FAILURE: Duration = Duration::from_millis(8000);

/// Recent alerts kept for inspection after they stop being visible.
const ALERT_HISTORY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Info,
    Muted,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub message: String,
    pub tone: Tone,
    pub expires_at: Instant,
}

// ---------------------------------------------------------------------------
// AlertQueue: Clone + Send + Sync banner feed
// ---------------------------------------------------------------------------

/// The inbox-wide banner. A new alert replaces the visible one; each alert
/// hides itself once its duration elapses.
#[derive(Debug, Clone, Default)]
pub struct AlertQueue {
    inner: Arc<Mutex<Vec<Alert>>>,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Alert>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, message: impl Into<String>, tone: Tone, duration: Duration) {
        let message = message.into();
        if message.is_empty() {
            return;
        }
        let mut alerts = self.lock();
        alerts.push(Alert {
            message,
            tone,
            expires_at: Instant::now() + duration,
        });
        if alerts.len() > ALERT_HISTORY {
            let excess = alerts.len() - ALERT_HISTORY;
            alerts.drain(..excess);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(message, Tone::Info, ALERT_DEFAULT);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(message, Tone::Success, ALERT_DEFAULT);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(message, Tone::Error, ALERT_DEFAULT);
    }

    /// The banner currently on screen, if it has not expired.
    pub fn current(&self) -> Option<Alert> {
        self.lock()
            .last()
            .filter(|a| a.expires_at > Instant::now())
            .cloned()
    }

    pub fn history(&self) -> Vec<Alert> {
        self.lock().clone()
    }

    pub fn dismiss(&self) {
        if let Some(last) = self.lock().last_mut() {
            last.expires_at = Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// StatusLine: per-widget status text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusLine {
    pub text: String,
    pub tone: Tone,
}

impl StatusLine {
    pub fn set(&mut self, text: impl Into<String>, tone: Tone) {
        self.text = text.into().trim().to_string();
        self.tone = tone;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.tone = Tone::Info;
    }

    pub fn is_visible(&self) -> bool {
        !self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn alerts_expire() {
        let q = AlertQueue::new();
        q.info("Salvo.");
        assert_eq!(q.current().map(|a| a.message), Some("Salvo.".to_string()));
        tokio::time::advance(Duration::from_millis(3799)).await;
        assert!(q.current().is_some());
        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(q.current().is_none());
        assert_eq!(q.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_alert_replaces_visible() {
        let q = AlertQueue::new();
        q.push("a", Tone::Error, ALERT_FETCH_FAILURE);
        q.success("b");
        assert_eq!(q.current().map(|a| a.tone), Some(Tone::Success));
        q.dismiss();
        assert!(q.current().is_none());
        q.info("");
        assert_eq!(q.history().len(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let q = AlertQueue::new();
        for i in 0..(ALERT_HISTORY + 5) {
            q.info(format!("n{i}"));
        }
        let h = q.history();
        assert_eq!(h.len(), ALERT_HISTORY);
        assert_eq!(h[0].message, "n5");
    }

    #[test]
    fn status_line_trims() {
        let mut s = StatusLine::default();
        s.set("  Enviando mensagem...  ", Tone::Loading);
        assert_eq!(s.text, "Enviando mensagem...");
        assert!(s.is_visible());
        s.clear();
        assert!(!s.is_visible());
    }
}
