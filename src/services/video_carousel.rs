//! Simulated short-form lecture player with swipe navigation

use crate::services::scheduler::{Scheduler, TimerDriven, TimerId};
use tracing::debug;

/// Interval between progress ticks
pub const PROGRESS_TICK_MS: u64 = 100;

/// Percentage points added per tick
pub const PROGRESS_STEP: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    Tick,
}

pub struct VideoCarousel {
    video_count: usize,
    current_video: usize,
    is_playing: bool,
    /// 0..=100
    progress: u8,
    tick: Option<TimerId>,
    timers: Scheduler<VideoEvent>,
}

impl VideoCarousel {
    /// `video_count` must be at least one
    pub fn new(video_count: usize) -> Self {
        Self {
            video_count: video_count.max(1),
            current_video: 0,
            is_playing: false,
            progress: 0,
            tick: None,
            timers: Scheduler::new(),
        }
    }

    /// Thumbnail click: select `index` and play it from the start
    pub fn play(&mut self, index: usize) -> bool {
        if index >= self.video_count {
            debug!(index = index, count = self.video_count, "video_play_out_of_range");
            return false;
        }

        self.stop_ticking();
        self.current_video = index;
        self.progress = 0;
        self.is_playing = true;
        self.tick = Some(self.timers.schedule(PROGRESS_TICK_MS, VideoEvent::Tick));

        debug!(index = index, "video_play");
        true
    }

    /// Stop ticking but keep the current progress
    pub fn pause(&mut self) -> bool {
        if !self.is_playing {
            return false;
        }
        self.stop_ticking();
        self.is_playing = false;
        true
    }

    pub fn swipe_next(&mut self) -> bool {
        if self.current_video + 1 >= self.video_count {
            return false;
        }
        self.select(self.current_video + 1);
        true
    }

    pub fn swipe_prev(&mut self) -> bool {
        if self.current_video == 0 {
            return false;
        }
        self.select(self.current_video - 1);
        true
    }

    pub fn current_video(&self) -> usize {
        self.current_video
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn video_count(&self) -> usize {
        self.video_count
    }

    /// Swipe: change video and reset playback immediately
    fn select(&mut self, index: usize) {
        self.stop_ticking();
        self.current_video = index;
        self.progress = 0;
        self.is_playing = false;
        debug!(index = index, "video_swiped");
    }

    fn stop_ticking(&mut self) {
        if let Some(id) = self.tick.take() {
            self.timers.cancel(id);
        }
    }
}

impl TimerDriven for VideoCarousel {
    type Event = VideoEvent;

    fn timers(&self) -> &Scheduler<VideoEvent> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Scheduler<VideoEvent> {
        &mut self.timers
    }

    fn on_timer(&mut self, event: VideoEvent) {
        match event {
            VideoEvent::Tick => {
                self.tick = None;
                if !self.is_playing {
                    return;
                }

                let next = self.progress.saturating_add(PROGRESS_STEP);
                if next >= 100 {
                    self.progress = 0;
                    self.is_playing = false;
                    debug!(index = self.current_video, "video_ended");
                } else {
                    self.progress = next;
                    self.tick = Some(self.timers.schedule(PROGRESS_TICK_MS, VideoEvent::Tick));
                }
            }
        }
    }
}
