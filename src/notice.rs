//! User-visible notices
//!
//! Toast-style messages raised by pages and tracking sessions. Delivered over
//! an unbounded channel; whoever owns the receiver displays them.

use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// Sending half; cheap to clone into tasks
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    pub fn channel() -> (Notifier, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Notifier { tx }, rx)
    }

    pub fn send(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
        };
        tracing::debug!(notice = %notice, "Notice");
        // Nobody listening is fine
        let _ = self.tx.send(notice);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(NoticeLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(NoticeLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(NoticeLevel::Error, message);
    }
}
