use std::collections::VecDeque;
use std::time::{Duration, Instant};

use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Transient notifications, newest last.
#[derive(Debug)]
pub struct ToastQueue {
    lifetime: Duration,
    toasts: VecDeque<Toast>,
}

impl ToastQueue {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            toasts: VecDeque::new(),
        }
    }

    pub fn success(&mut self, message: impl Into<String>, now: Instant) {
        self.push(ToastKind::Success, message.into(), now);
    }

    pub fn error(&mut self, message: impl Into<String>, now: Instant) {
        self.push(ToastKind::Error, message.into(), now);
    }

    fn push(&mut self, kind: ToastKind, message: String, now: Instant) {
        match kind {
            ToastKind::Success => tracing::debug!(%message, "toast"),
            ToastKind::Error => tracing::warn!(%message, "error toast"),
        }
        self.toasts.push_back(Toast {
            kind,
            message,
            expires_at: now + self.lifetime,
        });
    }

    /// Drops expired toasts.
    pub fn prune(&mut self, now: Instant) {
        self.toasts.retain(|toast| toast.expires_at > now);
    }

    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
