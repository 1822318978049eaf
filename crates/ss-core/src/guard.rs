//! Playback guard: bounded-retry resume after an ad sequence ends.
//!
//! Autoplay policies and player quirks routinely leave the content video
//! paused after the last ad. The guard retries play (plus a gesture click)
//! on a short cadence until playback is observed stable or the attempt
//! budget runs out. It is clock-driven: the agent calls [`PlaybackGuard::tick`]
//! every cycle and the guard decides whether a tick is due.

use crate::config::AgentConfig;
use crate::error::ActionError;
use crate::executor;
use crate::observer;
use crate::page::{ControlKind, MediaOp, Page};
use crate::types::AdState;

/// Outcome of one guard tick, for the caller's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Guard is not running.
    Inactive,
    /// Running, but the next tick is not due yet.
    NotDue,
    /// One retry attempt ran.
    Ticked,
    /// Playback is stable; the guard stopped itself.
    Stable,
    /// Attempt budget exhausted; the guard stopped itself.
    Exhausted,
    /// The media element disappeared (navigation); the guard stopped itself.
    Vanished,
}

/// Bounded-retry session ensuring content resumes and stays resumed.
#[derive(Debug, Default)]
pub struct PlaybackGuard {
    active: bool,
    attempts_remaining: u32,
    next_tick_at: u64,
}

impl PlaybackGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the guard.
    ///
    /// Idempotent: starting while already running restarts the attempt
    /// budget instead of stacking a second session.
    pub fn start(&mut self, now_ms: u64, cfg: &AgentConfig) {
        self.active = true;
        self.attempts_remaining = cfg.guard_max_attempts;
        self.next_tick_at = now_ms + cfg.guard_interval_ms;
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.attempts_remaining = 0;
        self.next_tick_at = 0;
    }

    /// Run one retry attempt if due.
    ///
    /// Never issues play while the observer reports an ad; play rejections
    /// are swallowed because the gesture click is the more likely path
    /// through an autoplay block anyway.
    pub fn tick<P: Page>(&mut self, page: &mut P, now_ms: u64, cfg: &AgentConfig) -> GuardOutcome {
        if !self.active {
            return GuardOutcome::Inactive;
        }
        if now_ms < self.next_tick_at {
            return GuardOutcome::NotDue;
        }

        let Some(media) = page.media() else {
            self.cancel();
            return GuardOutcome::Vanished;
        };

        if media.paused && observer::classify(page) != AdState::InAd {
            if let Err(err) = page.media_op(MediaOp::Play) {
                debug_assert!(matches!(err, ActionError::Media(_)));
                log::debug!("guard play rejected: {err}");
            }
            if let Some(player) = page.find_control(ControlKind::Player) {
                let _ = executor::attempt_skip(page, &player);
            }
        }

        self.attempts_remaining = self.attempts_remaining.saturating_sub(1);

        let stable = page
            .media()
            .map_or(false, |m| !m.paused && m.current_time > cfg.stability_threshold_secs);
        if stable {
            self.cancel();
            return GuardOutcome::Stable;
        }
        if self.attempts_remaining == 0 {
            self.cancel();
            return GuardOutcome::Exhausted;
        }
        self.next_tick_at = now_ms + cfg.guard_interval_ms;
        GuardOutcome::Ticked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MediaSnapshot;
    use crate::test_support::FakePage;
    use crate::types::AdSignals;

    fn paused_media() -> MediaSnapshot {
        MediaSnapshot {
            paused: true,
            seeking: false,
            current_time: 0.0,
            duration: 600.0,
            playback_rate: 1.0,
            muted: false,
        }
    }

    fn cfg() -> AgentConfig {
        AgentConfig::default()
    }

    #[test]
    fn test_inactive_guard_is_a_noop() {
        let mut guard = PlaybackGuard::new();
        let mut page = FakePage::new();
        page.media = Some(paused_media());
        assert_eq!(guard.tick(&mut page, 0, &cfg()), GuardOutcome::Inactive);
        assert!(page.media_ops.is_empty());
    }

    #[test]
    fn test_tick_respects_interval() {
        let cfg = cfg();
        let mut guard = PlaybackGuard::new();
        let mut page = FakePage::new();
        page.media = Some(paused_media());
        page.reject_play = true;
        guard.start(1_000, &cfg);
        assert_eq!(guard.tick(&mut page, 1_100, &cfg), GuardOutcome::NotDue);
        assert_eq!(guard.tick(&mut page, 1_200, &cfg), GuardOutcome::Ticked);
        assert_eq!(guard.tick(&mut page, 1_250, &cfg), GuardOutcome::NotDue);
    }

    #[test]
    fn test_never_plays_during_ad() {
        let cfg = cfg();
        let mut guard = PlaybackGuard::new();
        let mut page = FakePage::new();
        page.media = Some(paused_media());
        page.signals = AdSignals::TEXT_LABEL;
        guard.start(0, &cfg);
        guard.tick(&mut page, cfg.guard_interval_ms, &cfg);
        assert!(!page.media_ops.contains(&MediaOp::Play));
    }

    #[test]
    fn test_bounded_retry() {
        let cfg = cfg();
        let mut guard = PlaybackGuard::new();
        let mut page = FakePage::new();
        page.media = Some(paused_media());
        page.reject_play = true; // playback never stabilizes

        guard.start(0, &cfg);
        let mut now = 0;
        let mut outcomes = Vec::new();
        for _ in 0..cfg.guard_max_attempts {
            now += cfg.guard_interval_ms;
            outcomes.push(guard.tick(&mut page, now, &cfg));
        }
        assert_eq!(outcomes.last(), Some(&GuardOutcome::Exhausted));
        assert!(!guard.active());
        // Dead after exhaustion.
        now += cfg.guard_interval_ms;
        assert_eq!(guard.tick(&mut page, now, &cfg), GuardOutcome::Inactive);
    }

    #[test]
    fn test_stops_once_stable() {
        let cfg = cfg();
        let mut guard = PlaybackGuard::new();
        let mut page = FakePage::new();
        page.media = Some(paused_media());
        guard.start(0, &cfg);
        assert_eq!(
            guard.tick(&mut page, cfg.guard_interval_ms, &cfg),
            GuardOutcome::Ticked
        );
        // Play succeeded; simulate progress past the stability threshold.
        if let Some(m) = page.media.as_mut() {
            m.current_time = 1.2;
        }
        assert_eq!(
            guard.tick(&mut page, 2 * cfg.guard_interval_ms, &cfg),
            GuardOutcome::Stable
        );
        assert!(!guard.active());
    }

    #[test]
    fn test_self_cancels_when_media_vanishes() {
        let cfg = cfg();
        let mut guard = PlaybackGuard::new();
        let mut page = FakePage::new();
        guard.start(0, &cfg);
        assert_eq!(
            guard.tick(&mut page, cfg.guard_interval_ms, &cfg),
            GuardOutcome::Vanished
        );
        assert!(!guard.active());
    }

    #[test]
    fn test_restart_resets_budget() {
        let cfg = cfg();
        let mut guard = PlaybackGuard::new();
        let mut page = FakePage::new();
        page.media = Some(paused_media());
        page.reject_play = true;

        guard.start(0, &cfg);
        let mut now = 0;
        for _ in 0..5 {
            now += cfg.guard_interval_ms;
            guard.tick(&mut page, now, &cfg);
        }
        // Restart mid-session; the budget must be full again.
        guard.start(now, &cfg);
        let mut ticks = 0;
        loop {
            now += cfg.guard_interval_ms;
            ticks += 1;
            if guard.tick(&mut page, now, &cfg) == GuardOutcome::Exhausted {
                break;
            }
        }
        assert_eq!(ticks, cfg.guard_max_attempts);
    }
}
