use std::time::{Duration, Instant};

use time::OffsetDateTime;

use crate::config::AutoSaveConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Disabled,
    Idle,
    PendingSave { deadline: Instant },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveStatus {
    Disabled,
    Idle {
        last_saved_at: Option<OffsetDateTime>,
    },
    Pending {
        since: OffsetDateTime,
    },
    Error {
        message: String,
        occurred_at: OffsetDateTime,
    },
}

#[derive(Debug, Clone)]
struct AutoSaveFailure {
    message: String,
    occurred_at: OffsetDateTime,
}

/// The single debounce timer shared by every qualifying edit.
///
/// Each `schedule` pushes the deadline out by the full debounce interval, so
/// a burst of edits produces one save once input goes quiet. Time is passed
/// in by the caller.
#[derive(Debug)]
pub struct AutoSaveTimer {
    debounce: Duration,
    state: TimerState,
    pending_since: Option<OffsetDateTime>,
    last_saved_at: Option<OffsetDateTime>,
    last_error: Option<AutoSaveFailure>,
}

impl AutoSaveTimer {
    pub fn new(config: &AutoSaveConfig) -> Self {
        Self {
            debounce: config.debounce_duration(),
            state: if config.enabled {
                TimerState::Idle
            } else {
                TimerState::Disabled
            },
            pending_since: None,
            last_saved_at: None,
            last_error: None,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TimerState::PendingSave { .. })
    }

    /// Arms the timer, or restarts it when already armed.
    pub fn schedule(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Disabled => false,
            TimerState::Idle => {
                self.pending_since = Some(OffsetDateTime::now_utc());
                self.state = TimerState::PendingSave {
                    deadline: now + self.debounce,
                };
                true
            }
            TimerState::PendingSave { .. } => {
                self.state = TimerState::PendingSave {
                    deadline: now + self.debounce,
                };
                true
            }
        }
    }

    /// Returns `true` exactly once per armed period, when the deadline has
    /// passed. The timer is back to idle afterwards.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::PendingSave { deadline } if now >= deadline => {
                self.state = TimerState::Idle;
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        if self.is_pending() {
            tracing::debug!("pending autosave cancelled");
            self.state = TimerState::Idle;
            self.pending_since = None;
        }
    }

    pub fn record_saved(&mut self, at: OffsetDateTime) {
        self.last_saved_at = Some(at);
        self.last_error = None;
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(AutoSaveFailure {
            message: message.into(),
            occurred_at: OffsetDateTime::now_utc(),
        });
    }

    pub fn status(&self) -> AutoSaveStatus {
        if self.state == TimerState::Disabled {
            return AutoSaveStatus::Disabled;
        }
        if let Some(failure) = &self.last_error {
            return AutoSaveStatus::Error {
                message: failure.message.clone(),
                occurred_at: failure.occurred_at,
            };
        }
        if self.is_pending() {
            return AutoSaveStatus::Pending {
                since: self
                    .pending_since
                    .unwrap_or_else(OffsetDateTime::now_utc),
            };
        }
        AutoSaveStatus::Idle {
            last_saved_at: self.last_saved_at,
        }
    }
}
