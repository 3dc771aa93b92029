//! Email capture form state: busy flag and transient notices

use crate::domain::content::SUBSCRIBE_FALLBACK_ERROR;
use crate::domain::types::SubscribeResult;
use crate::services::scheduler::{Scheduler, TimerDriven, TimerId};

/// How long the confirmation or error stays visible
pub const NOTICE_DWELL_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    ClearNotice,
}

pub struct SubscribeForm {
    is_loading: bool,
    submitted: bool,
    error: Option<String>,
    clear_timer: Option<TimerId>,
    timers: Scheduler<FormEvent>,
}

impl SubscribeForm {
    pub fn new() -> Self {
        Self {
            is_loading: false,
            submitted: false,
            error: None,
            clear_timer: None,
            timers: Scheduler::new(),
        }
    }

    /// Start a submission. Returns the trimmed email to send, or None when
    /// the form is busy or the address is blank.
    pub fn begin(&mut self, email: &str) -> Option<String> {
        let email = email.trim();
        if email.is_empty() || self.is_loading {
            return None;
        }

        self.is_loading = true;
        self.error = None;
        Some(email.to_string())
    }

    /// Record the outcome and show the matching notice for a while
    pub fn complete(&mut self, result: &SubscribeResult) {
        self.is_loading = false;

        if result.success {
            self.submitted = true;
            self.error = None;
        } else {
            self.submitted = false;
            let message = result
                .error
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(SUBSCRIBE_FALLBACK_ERROR);
            self.error = Some(message.to_string());
        }

        if let Some(id) = self.clear_timer.take() {
            self.timers.cancel(id);
        }
        self.clear_timer = Some(self.timers.schedule(NOTICE_DWELL_MS, FormEvent::ClearNotice));
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn submitted(&self) -> bool {
        self.submitted
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Default for SubscribeForm {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriven for SubscribeForm {
    type Event = FormEvent;

    fn timers(&self) -> &Scheduler<FormEvent> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Scheduler<FormEvent> {
        &mut self.timers
    }

    fn on_timer(&mut self, event: FormEvent) {
        match event {
            FormEvent::ClearNotice => {
                self.clear_timer = None;
                self.submitted = false;
                self.error = None;
            }
        }
    }
}
