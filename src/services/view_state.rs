//! Phone mockup view state: screen mode, tag animation, active tab
//!
//! Tagging a card is a two-stage transition. The card's entrance animation
//! plays for `TAG_COMMIT_MS` before the screen swaps, and further taps stay
//! blocked until `TAG_RELEASE_MS` so the new screen can settle.

use crate::domain::types::{ActiveTab, ScreenMode, TagCard};
use crate::services::scheduler::{Scheduler, TimerDriven};
use tracing::debug;

/// Delay from tap to screen swap
pub const TAG_COMMIT_MS: u64 = 800;

/// Delay from tap until another tag is accepted
pub const TAG_RELEASE_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    CommitScreen(TagCard),
    ReleaseTag,
}

pub struct ViewState {
    screen_mode: ScreenMode,
    tagging: Option<TagCard>,
    active_tab: ActiveTab,
    /// Per-card counter restarting the bloom animation (feeding, diaper)
    bloom_generation: [u32; 2],
    timers: Scheduler<ViewEvent>,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            screen_mode: ScreenMode::Off,
            tagging: None,
            active_tab: ActiveTab::Timeline,
            bloom_generation: [0; 2],
            timers: Scheduler::new(),
        }
    }

    /// Tag a card against the phone. Ignored while another tag is in flight.
    pub fn tag(&mut self, card: TagCard) -> bool {
        if let Some(current) = self.tagging {
            debug!(card = %card, in_flight = %current, "tag_ignored");
            return false;
        }

        self.tagging = Some(card);
        self.bloom_generation[Self::card_index(card)] += 1;
        self.timers.schedule(TAG_COMMIT_MS, ViewEvent::CommitScreen(card));
        self.timers.schedule(TAG_RELEASE_MS, ViewEvent::ReleaseTag);

        debug!(card = %card, "tag_started");
        true
    }

    /// The in-mockup "save" button: switch the screen off immediately
    pub fn turn_off(&mut self) {
        debug!(from = %self.screen_mode.as_str(), "screen_turned_off");
        self.screen_mode = ScreenMode::Off;
    }

    pub fn set_active_tab(&mut self, tab: ActiveTab) {
        self.active_tab = tab;
    }

    pub fn screen_mode(&self) -> ScreenMode {
        self.screen_mode
    }

    pub fn tagging(&self) -> Option<TagCard> {
        self.tagging
    }

    pub fn active_tab(&self) -> ActiveTab {
        self.active_tab
    }

    pub fn bloom_generation(&self, card: TagCard) -> u32 {
        self.bloom_generation[Self::card_index(card)]
    }

    fn card_index(card: TagCard) -> usize {
        match card {
            TagCard::Feeding => 0,
            TagCard::Diaper => 1,
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriven for ViewState {
    type Event = ViewEvent;

    fn timers(&self) -> &Scheduler<ViewEvent> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Scheduler<ViewEvent> {
        &mut self.timers
    }

    fn on_timer(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::CommitScreen(card) => {
                self.screen_mode = card.screen();
                debug!(screen = %self.screen_mode.as_str(), "screen_committed");
            }
            ViewEvent::ReleaseTag => {
                self.tagging = None;
            }
        }
    }
}
