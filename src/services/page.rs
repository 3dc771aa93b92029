//! One visitor's landing page: every demo widget plus the subscribe form
//!
//! Widgets never share state. The page forwards clock advances to each of
//! them and tears all of them down together.

use crate::domain::content::LECTURE_VIDEOS;
use crate::domain::types::{ActiveTab, ChatMessage, ScreenMode, TagCard};
use crate::services::chat_demo::{ChatDemo, ChatPhase};
use crate::services::scheduler::TimerDriven;
use crate::services::subscribe_form::SubscribeForm;
use crate::services::video_carousel::VideoCarousel;
use crate::services::view_state::ViewState;
use crate::services::voice_demo::{VoiceDemo, VoicePhase};
use serde::Serialize;
use tracing::debug;

pub struct LandingPage {
    pub view: ViewState,
    pub voice: VoiceDemo,
    pub chat: ChatDemo,
    pub video: VideoCarousel,
    pub form: SubscribeForm,
    torn_down: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub screen_mode: ScreenMode,
    pub tagging: Option<TagCard>,
    pub active_tab: ActiveTab,
    pub bloom_feeding: u32,
    pub bloom_diaper: u32,
    pub voice: VoiceSnapshot,
    pub chat: ChatSnapshot,
    pub video: VideoSnapshot,
    pub form: FormSnapshot,
    /// True while any widget has a timer pending
    pub animating: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceSnapshot {
    pub phase: VoicePhase,
    pub transcript: String,
    pub response: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub phase: ChatPhase,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoSnapshot {
    pub current_video: usize,
    pub video_count: usize,
    pub is_playing: bool,
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSnapshot {
    pub is_loading: bool,
    pub submitted: bool,
    pub error: Option<String>,
}

impl LandingPage {
    pub fn new() -> Self {
        Self {
            view: ViewState::new(),
            voice: VoiceDemo::new(),
            chat: ChatDemo::new(),
            video: VideoCarousel::new(LECTURE_VIDEOS.len()),
            form: SubscribeForm::new(),
            torn_down: false,
        }
    }

    /// Advance every widget's clock by the same amount
    pub fn advance(&mut self, elapsed_ms: u64) {
        if self.torn_down || elapsed_ms == 0 {
            return;
        }
        self.view.advance(elapsed_ms);
        self.voice.advance(elapsed_ms);
        self.chat.advance(elapsed_ms);
        self.video.advance(elapsed_ms);
        self.form.advance(elapsed_ms);
    }

    /// Number of timers pending across all widgets
    pub fn pending_timers(&self) -> usize {
        self.view.timers().pending()
            + self.voice.timers().pending()
            + self.chat.timers().pending()
            + self.video.timers().pending()
            + self.form.timers().pending()
    }

    /// Cancel every pending timer. Idempotent; returns how many were cancelled.
    pub fn teardown(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }
        self.torn_down = true;

        let cancelled = self.view.cancel_timers()
            + self.voice.cancel_timers()
            + self.chat.cancel_timers()
            + self.video.cancel_timers()
            + self.form.cancel_timers();

        debug!(cancelled = cancelled, "page_torn_down");
        cancelled
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            screen_mode: self.view.screen_mode(),
            tagging: self.view.tagging(),
            active_tab: self.view.active_tab(),
            bloom_feeding: self.view.bloom_generation(TagCard::Feeding),
            bloom_diaper: self.view.bloom_generation(TagCard::Diaper),
            voice: VoiceSnapshot {
                phase: self.voice.phase(),
                transcript: self.voice.revealed_text(),
                response: self.voice.response().map(str::to_string),
            },
            chat: ChatSnapshot { phase: self.chat.phase(), messages: self.chat.messages().to_vec() },
            video: VideoSnapshot {
                current_video: self.video.current_video(),
                video_count: self.video.video_count(),
                is_playing: self.video.is_playing(),
                progress: self.video.progress(),
            },
            form: FormSnapshot {
                is_loading: self.form.is_loading(),
                submitted: self.form.submitted(),
                error: self.form.error().map(str::to_string),
            },
            animating: self.pending_timers() > 0,
        }
    }
}

impl Default for LandingPage {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LandingPage {
    fn drop(&mut self) {
        self.teardown();
    }
}
