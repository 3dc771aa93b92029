//! Simulated AI chat: send, typing indicator, canned reply

use crate::domain::content::{canned_answer, CHAT_FALLBACK_RESPONSE};
use crate::domain::types::ChatMessage;
use crate::services::phase_table::{PhaseTable, Step};
use crate::services::scheduler::{Scheduler, TimerDriven};
use serde::Serialize;
use tracing::debug;

/// Longest message accepted from a visitor, in characters
pub const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatPhase {
    Idle,
    /// User message shown, assistant has not started typing
    Sent,
    /// Typing placeholder shown
    Typing,
}

pub const CHAT_CHAIN: PhaseTable<ChatPhase> = PhaseTable::new(&[
    Step { from: ChatPhase::Sent, dwell_ms: 600, to: ChatPhase::Typing },
    Step { from: ChatPhase::Typing, dwell_ms: 1200, to: ChatPhase::Idle },
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEvent {
    ShowTyping,
    Reply,
}

pub struct ChatDemo {
    messages: Vec<ChatMessage>,
    phase: ChatPhase,
    /// Reply to show once the typing placeholder resolves
    pending_reply: Option<String>,
    timers: Scheduler<ChatEvent>,
}

impl ChatDemo {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            phase: ChatPhase::Idle,
            pending_reply: None,
            timers: Scheduler::new(),
        }
    }

    /// Send a message. `response` overrides the canned/fallback reply.
    ///
    /// Blank messages and sends while a reply is pending are ignored.
    pub fn handle_send(&mut self, text: &str, response: Option<&str>) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        if self.phase != ChatPhase::Idle {
            debug!(phase = ?self.phase, "chat_send_ignored");
            return false;
        }

        let text: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
        let reply = response
            .map(str::to_string)
            .or_else(|| canned_answer(&text).map(str::to_string))
            .unwrap_or_else(|| CHAT_FALLBACK_RESPONSE.to_string());

        self.messages.push(ChatMessage::user(text));
        self.pending_reply = Some(reply);
        self.phase = ChatPhase::Sent;
        if let Some((dwell_ms, _)) = CHAT_CHAIN.next(ChatPhase::Sent) {
            self.timers.schedule(dwell_ms, ChatEvent::ShowTyping);
        }

        debug!(messages = self.messages.len(), "chat_message_sent");
        true
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }
}

impl Default for ChatDemo {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriven for ChatDemo {
    type Event = ChatEvent;

    fn timers(&self) -> &Scheduler<ChatEvent> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Scheduler<ChatEvent> {
        &mut self.timers
    }

    fn on_timer(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::ShowTyping => {
                self.messages.push(ChatMessage::typing());
                self.phase = ChatPhase::Typing;
                if let Some((dwell_ms, _)) = CHAT_CHAIN.next(ChatPhase::Typing) {
                    self.timers.schedule(dwell_ms, ChatEvent::Reply);
                }
            }
            ChatEvent::Reply => {
                let reply = self.pending_reply.take().unwrap_or_default();
                match self.messages.last_mut() {
                    Some(last) if last.is_typing => *last = ChatMessage::ai(reply),
                    _ => self.messages.push(ChatMessage::ai(reply)),
                }
                self.phase = ChatPhase::Idle;
            }
        }
    }
}
