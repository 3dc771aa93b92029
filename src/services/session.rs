//! Per-visitor demo sessions
//!
//! Each session owns one `LandingPage`. The page's virtual clock is driven
//! lazily from wall time: every access first advances the page by the time
//! elapsed since the previous access, so chains progress exactly as if a
//! timer loop were running. Idle sessions are torn down by `sweep_expired`.

use crate::infra::metrics::Metrics;
use crate::services::page::LandingPage;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
    #[error("too many active sessions")]
    AtCapacity,
}

struct Session {
    page: LandingPage,
    /// Wall time the page clock was last advanced to
    clock: Instant,
    last_seen: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self { page: LandingPage::new(), clock: now, last_seen: now }
    }

    /// Advance the page by whole milliseconds, carrying the remainder
    fn catch_up(&mut self, now: Instant) {
        let elapsed_ms = now.saturating_duration_since(self.clock).as_millis() as u64;
        if elapsed_ms > 0 {
            self.page.advance(elapsed_ms);
            self.clock += Duration::from_millis(elapsed_ms);
        }
        self.last_seen = now;
    }
}

pub struct SessionRegistry {
    sessions: Mutex<FxHashMap<Uuid, Arc<Mutex<Session>>>>,
    idle_timeout: Duration,
    max_sessions: usize,
    metrics: Arc<Metrics>,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration, max_sessions: usize, metrics: Arc<Metrics>) -> Self {
        Self { sessions: Mutex::new(FxHashMap::default()), idle_timeout, max_sessions, metrics }
    }

    pub fn create(&self) -> Result<Uuid, SessionError> {
        self.create_at(Instant::now())
    }

    pub fn create_at(&self, now: Instant) -> Result<Uuid, SessionError> {
        let mut sessions = self.sessions.lock();
        if sessions.len() >= self.max_sessions {
            self.metrics.record_session_rejected();
            return Err(SessionError::AtCapacity);
        }

        let id = Uuid::now_v7();
        sessions.insert(id, Arc::new(Mutex::new(Session::new(now))));
        self.metrics.record_session_created();

        debug!(session = %id, active = sessions.len(), "session_created");
        Ok(id)
    }

    /// Bring the session's page up to date, then run `f` against it
    pub fn with_page<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut LandingPage) -> R,
    ) -> Result<R, SessionError> {
        self.with_page_at(id, Instant::now(), f)
    }

    pub fn with_page_at<R>(
        &self,
        id: Uuid,
        now: Instant,
        f: impl FnOnce(&mut LandingPage) -> R,
    ) -> Result<R, SessionError> {
        // Release the map lock before touching the page
        let session = self.sessions.lock().get(&id).cloned().ok_or(SessionError::NotFound)?;

        let mut session = session.lock();
        session.catch_up(now);
        Ok(f(&mut session.page))
    }

    /// Visitor closed the page
    pub fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        let session = self.sessions.lock().remove(&id).ok_or(SessionError::NotFound)?;
        let cancelled = session.lock().page.teardown();
        self.metrics.record_session_closed(false, cancelled);

        debug!(session = %id, cancelled_timers = cancelled, "session_closed");
        Ok(())
    }

    /// Tear down sessions idle for longer than the timeout
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let expired: Vec<Arc<Mutex<Session>>> = {
            let mut sessions = self.sessions.lock();
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, s)| now.saturating_duration_since(s.lock().last_seen) > self.idle_timeout)
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &expired {
            let cancelled = session.lock().page.teardown();
            self.metrics.record_session_closed(true, cancelled);
        }

        if !expired.is_empty() {
            info!(expired = expired.len(), active = self.len(), "sessions_expired");
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Periodically expire idle sessions until shutdown
    pub async fn run_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_expired();
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(active = self.len(), "session_sweeper_shutdown");
                        return;
                    }
                }
            }
        }
    }
}
