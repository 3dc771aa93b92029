//! Simulated voice capture: record, transcribe, respond, sync, settle
//!
//! Phase chain (dwell before the next phase):
//! - recording 1500ms -> typing
//! - typing: one transcript character every 80ms, then 500ms -> response
//! - response 800ms -> syncing
//! - syncing 1000ms -> synced
//! - synced 3000ms -> idle

use crate::domain::content::{VOICE_RESPONSE, VOICE_TRANSCRIPT};
use crate::services::phase_table::{PhaseTable, Step};
use crate::services::scheduler::{Scheduler, TimerDriven};
use serde::Serialize;
use tracing::debug;

/// Delay between revealed transcript characters
pub const TYPING_CHAR_MS: u64 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoicePhase {
    Idle,
    Recording,
    Typing,
    Response,
    Syncing,
    Synced,
}

impl VoicePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoicePhase::Idle => "idle",
            VoicePhase::Recording => "recording",
            VoicePhase::Typing => "typing",
            VoicePhase::Response => "response",
            VoicePhase::Syncing => "syncing",
            VoicePhase::Synced => "synced",
        }
    }
}

/// Typing's dwell is the pause after the last character, not the whole reveal.
pub const VOICE_CHAIN: PhaseTable<VoicePhase> = PhaseTable::new(&[
    Step { from: VoicePhase::Recording, dwell_ms: 1500, to: VoicePhase::Typing },
    Step { from: VoicePhase::Typing, dwell_ms: 500, to: VoicePhase::Response },
    Step { from: VoicePhase::Response, dwell_ms: 800, to: VoicePhase::Syncing },
    Step { from: VoicePhase::Syncing, dwell_ms: 1000, to: VoicePhase::Synced },
    Step { from: VoicePhase::Synced, dwell_ms: 3000, to: VoicePhase::Idle },
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    Enter(VoicePhase),
    RevealChar,
}

pub struct VoiceDemo {
    phase: VoicePhase,
    transcript: &'static str,
    response: &'static str,
    /// Number of transcript characters revealed so far
    revealed: usize,
    timers: Scheduler<VoiceEvent>,
}

impl VoiceDemo {
    pub fn new() -> Self {
        Self::with_script(VOICE_TRANSCRIPT, VOICE_RESPONSE)
    }

    pub fn with_script(transcript: &'static str, response: &'static str) -> Self {
        Self { phase: VoicePhase::Idle, transcript, response, revealed: 0, timers: Scheduler::new() }
    }

    /// Press the mic button. Ignored unless the chain is idle.
    pub fn start(&mut self) -> bool {
        if self.phase != VoicePhase::Idle {
            debug!(phase = %self.phase.as_str(), "voice_start_ignored");
            return false;
        }
        self.enter(VoicePhase::Recording);
        true
    }

    pub fn phase(&self) -> VoicePhase {
        self.phase
    }

    /// Transcript characters revealed so far
    pub fn revealed_text(&self) -> String {
        self.transcript.chars().take(self.revealed).collect()
    }

    /// Assistant reply, visible from the response phase until reset
    pub fn response(&self) -> Option<&'static str> {
        match self.phase {
            VoicePhase::Response | VoicePhase::Syncing | VoicePhase::Synced => Some(self.response),
            _ => None,
        }
    }

    fn transcript_len(&self) -> usize {
        self.transcript.chars().count()
    }

    fn enter(&mut self, phase: VoicePhase) {
        debug!(from = %self.phase.as_str(), to = %phase.as_str(), "voice_phase");
        self.phase = phase;

        match phase {
            VoicePhase::Idle => {
                self.revealed = 0;
            }
            VoicePhase::Typing => {
                self.revealed = 0;
                self.schedule_typing_step();
            }
            _ => self.schedule_next(),
        }
    }

    fn schedule_next(&mut self) {
        if let Some((dwell_ms, to)) = VOICE_CHAIN.next(self.phase) {
            self.timers.schedule(dwell_ms, VoiceEvent::Enter(to));
        }
    }

    /// Reveal the next character, or leave typing once the transcript is shown
    fn schedule_typing_step(&mut self) {
        if self.revealed < self.transcript_len() {
            self.timers.schedule(TYPING_CHAR_MS, VoiceEvent::RevealChar);
        } else {
            self.schedule_next();
        }
    }
}

impl Default for VoiceDemo {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriven for VoiceDemo {
    type Event = VoiceEvent;

    fn timers(&self) -> &Scheduler<VoiceEvent> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Scheduler<VoiceEvent> {
        &mut self.timers
    }

    fn on_timer(&mut self, event: VoiceEvent) {
        match event {
            VoiceEvent::Enter(phase) => self.enter(phase),
            VoiceEvent::RevealChar => {
                self.revealed += 1;
                self.schedule_typing_step();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Advance 10ms at a time and record every distinct phase observed
    fn observe_phases(demo: &mut VoiceDemo, total_ms: u64) -> Vec<VoicePhase> {
        let mut seen = vec![demo.phase()];
        for _ in 0..(total_ms / 10) {
            demo.advance(10);
            if seen.last() != Some(&demo.phase()) {
                seen.push(demo.phase());
            }
        }
        seen
    }

    #[test]
    fn test_full_chain_sequence() {
        let mut demo = VoiceDemo::new();
        assert!(demo.start());

        let seen = observe_phases(&mut demo, 20_000);

        assert_eq!(
            seen,
            vec![
                VoicePhase::Recording,
                VoicePhase::Typing,
                VoicePhase::Response,
                VoicePhase::Syncing,
                VoicePhase::Synced,
                VoicePhase::Idle,
            ]
        );
        assert!(demo.timers.is_idle());
        assert_eq!(demo.revealed_text(), "");
    }

    #[test]
    fn test_chain_matches_table() {
        let table_seq = VOICE_CHAIN.sequence(VoicePhase::Recording);
        assert_eq!(table_seq.len(), 5);
        assert_eq!(table_seq[0], VoicePhase::Recording);
        assert_eq!(table_seq[4], VoicePhase::Synced);
    }

    #[test]
    fn test_phase_timing() {
        let mut demo = VoiceDemo::with_script("abc", "ok");
        demo.start();

        demo.advance(1499);
        assert_eq!(demo.phase(), VoicePhase::Recording);
        demo.advance(1);
        assert_eq!(demo.phase(), VoicePhase::Typing);
        assert_eq!(demo.revealed_text(), "");

        demo.advance(80);
        assert_eq!(demo.revealed_text(), "a");
        demo.advance(160);
        assert_eq!(demo.revealed_text(), "abc");
        assert_eq!(demo.phase(), VoicePhase::Typing);
        assert_eq!(demo.response(), None);

        demo.advance(500);
        assert_eq!(demo.phase(), VoicePhase::Response);
        assert_eq!(demo.response(), Some("ok"));

        demo.advance(800);
        assert_eq!(demo.phase(), VoicePhase::Syncing);
        demo.advance(1000);
        assert_eq!(demo.phase(), VoicePhase::Synced);
        demo.advance(2999);
        assert_eq!(demo.phase(), VoicePhase::Synced);
        demo.advance(1);
        assert_eq!(demo.phase(), VoicePhase::Idle);
        assert_eq!(demo.response(), None);
    }

    #[test]
    fn test_multibyte_transcript_reveal() {
        let mut demo = VoiceDemo::with_script("맘마", "네");
        demo.start();
        demo.advance(1500 + 80);
        assert_eq!(demo.revealed_text(), "맘");
        demo.advance(80);
        assert_eq!(demo.revealed_text(), "맘마");
    }

    #[test]
    fn test_retrigger_while_running_ignored() {
        let mut demo = VoiceDemo::new();
        assert!(demo.start());
        assert!(!demo.start());

        demo.advance(100);
        assert!(!demo.start());
        assert_eq!(demo.phase(), VoicePhase::Recording);
        // Only the first chain's timer is pending
        assert_eq!(demo.timers.pending(), 1);
    }

    #[test]
    fn test_restart_after_reset() {
        let mut demo = VoiceDemo::with_script("a", "b");
        demo.start();
        demo.advance(60_000);
        assert_eq!(demo.phase(), VoicePhase::Idle);
        assert!(demo.start());
        assert_eq!(demo.phase(), VoicePhase::Recording);
    }

    #[test]
    fn test_empty_transcript_skips_reveal() {
        let mut demo = VoiceDemo::with_script("", "b");
        demo.start();
        demo.advance(1500);
        assert_eq!(demo.phase(), VoicePhase::Typing);
        demo.advance(500);
        assert_eq!(demo.phase(), VoicePhase::Response);
    }
}
