//! The ad guard agent: one evaluation cycle tying the components together.
//!
//! Two independent drivers (the host's interval poll and its DOM-mutation
//! callback) funnel into [`AdGuardAgent::cycle`]. A cycle observes, acts,
//! updates the sequence bookkeeping, and ticks the playback guard; it never
//! suspends, and a re-entry flag makes close-together driver firings safe.
//! Anything failing inside a cycle is absorbed at the top level so one bad
//! cycle never stops future polling.

use crate::config::AgentConfig;
use crate::error::ActionError;
use crate::executor;
use crate::guard::PlaybackGuard;
use crate::observer;
use crate::page::{Clock, ControlKind, MediaOp, Page};
use crate::sequence::{ActionCategory, MidRoll, SequenceTracker, Step};
use crate::sink::{LogEntry, LogLevel, LogSink};
use crate::types::{ActionStats, AdSequenceInfo, AdState};

/// `source` field of every log entry this agent emits.
const LOG_SOURCE: &str = "ad-guard";

// =============================================================================
// Deferred actions
// =============================================================================

/// Clock-scheduled follow-up, run at the start of the first cycle past its
/// due time. Replaces host timers so everything stays cancellable by
/// dropping the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeferredKind {
    /// Undo the fast-forward rate/mute changes.
    RestoreRate,
    /// Probe content playback with a full force-resume.
    ForceResume,
}

#[derive(Debug, Clone, Copy)]
struct Deferred {
    due_ms: u64,
    kind: DeferredKind,
}

// =============================================================================
// Agent
// =============================================================================

/// All mutable state for one page load.
///
/// Instantiable per tab (and per test); the page is passed by reference into
/// each cycle rather than captured, so the same agent drives a live DOM, a
/// scripted replay, or a fake.
pub struct AdGuardAgent<C: Clock, S: LogSink> {
    cfg: AgentConfig,
    clock: C,
    sink: S,
    stats: ActionStats,
    tracker: SequenceTracker,
    mid_roll: MidRoll,
    guard: PlaybackGuard,
    deferred: Vec<Deferred>,
    in_cycle: bool,
}

impl<C: Clock, S: LogSink> AdGuardAgent<C, S> {
    pub fn new(cfg: AgentConfig, clock: C, sink: S) -> Self {
        Self {
            cfg,
            clock,
            sink,
            stats: ActionStats::default(),
            tracker: SequenceTracker::new(),
            mid_roll: MidRoll::new(),
            guard: PlaybackGuard::new(),
            deferred: Vec::new(),
            in_cycle: false,
        }
    }

    /// Announce installation to the log sink. Called once by the host after
    /// injection, never from a cycle.
    pub fn announce(&self) {
        self.emit(LogLevel::Success, "SkipShield ad guard active");
    }

    /// Host-side report through the agent's sink, for install-time events
    /// the agent cannot see itself (style injection failures and the like).
    pub fn report(&self, level: LogLevel, message: &str) {
        self.emit(level, message);
    }

    pub fn stats(&self) -> ActionStats {
        self.stats
    }

    pub fn config(&self) -> &AgentConfig {
        &self.cfg
    }

    pub fn guard_active(&self) -> bool {
        self.guard.active()
    }

    /// Current sequence phase, for host-side status surfaces. Reflects the
    /// tracked history (`Transitioning` inside the confirmation window), not
    /// just the last raw observer reading.
    pub fn phase(&self) -> AdState {
        self.tracker.phase()
    }

    // -------------------------------------------------------------------------
    // Evaluation cycle
    // -------------------------------------------------------------------------

    /// Run one evaluation cycle against the page.
    ///
    /// Re-entrant-tolerant: a cycle arriving while another is executing
    /// returns immediately. Errors are classified and absorbed here.
    pub fn cycle<P: Page>(&mut self, page: &mut P) {
        if self.in_cycle {
            return;
        }
        self.in_cycle = true;
        let result = self.run_cycle(page);
        self.in_cycle = false;
        if let Err(err) = result {
            if err.is_critical() {
                self.emit(LogLevel::Error, format!("Cycle failed: {err}"));
            } else {
                log::debug!("cycle error absorbed: {err}");
            }
        }
    }

    /// Host hook for a media `pause` event near the start of content.
    ///
    /// A pause this early with no ad showing is usually an autoplay block,
    /// not the user; schedule a resume probe.
    pub fn on_media_pause<P: Page>(&mut self, page: &P) {
        if observer::classify(page) == AdState::InAd {
            return;
        }
        let Some(media) = page.media() else {
            return;
        };
        if media.current_time < self.cfg.early_pause_window_secs {
            let now = self.clock.now_ms();
            self.schedule(DeferredKind::ForceResume, now + self.cfg.skip_resume_delay_ms);
        }
    }

    fn run_cycle<P: Page>(&mut self, page: &mut P) -> Result<(), ActionError> {
        let now = self.clock.now_ms();
        self.run_deferred(page, now);

        let in_ad = observer::classify(page) == AdState::InAd;

        // The transition skip control can outlive the indicators, so probe it
        // every cycle regardless of state; its own cooldown gates dispatch.
        let transition_fired = self.check_transition_skip(page, now);

        if self.mid_roll.active() {
            self.run_mid_roll(page, now);
        } else if observer::detect_mid_roll(page, &self.cfg) {
            self.mid_roll.activate(now, &self.cfg);
            self.emit(LogLevel::Info, "Mid-roll ad detected");
        }

        if let Some(info) = page.ad_badge_text().as_deref().and_then(AdSequenceInfo::parse) {
            if self.tracker.note_sequence(info) {
                self.emit(LogLevel::Info, format!("{} ads detected", info.total));
            }
        }

        match self.tracker.observe(in_ad, &self.cfg) {
            Step::Transition(_) => {
                self.skip_ad_transition(page, now, transition_fired);
            }
            Step::SequenceFinished => {
                self.emit(LogLevel::Success, "Content playback resumed");
                self.force_resume_now(page, now);
            }
            Step::EnteredAd | Step::InAd => {
                self.handle_in_ad(page, now)?;
            }
            Step::Idle => {
                // Between chained ads the indicators read as content; keep
                // probing instead of assuming the sequence is over.
                if self.tracker.sequence_active() {
                    self.skip_ad_transition(page, now, transition_fired);
                }
            }
        }

        if !self.mid_roll.active() {
            self.guard.tick(page, now, &self.cfg);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // In-ad actions
    // -------------------------------------------------------------------------

    /// Primary skip path with fast-forward fallback, behind the skip cooldown.
    fn handle_in_ad<P: Page>(&mut self, page: &mut P, now: u64) -> Result<(), ActionError> {
        if !self.tracker.can_fire(ActionCategory::Skip, now, &self.cfg) {
            return Ok(());
        }

        if let Some(button) = page.find_control(ControlKind::AdSkip) {
            match executor::attempt_skip(page, &button) {
                Ok(()) => {
                    self.stats.skipped += 1;
                    self.tracker.mark_fired(ActionCategory::Skip, now);
                    self.emit(
                        LogLevel::Success,
                        format!("Ad skipped (total: {})", self.stats.skipped),
                    );
                    if self.tracker.is_final_ad() {
                        self.schedule(
                            DeferredKind::ForceResume,
                            now + self.cfg.skip_resume_delay_ms,
                        );
                    }
                    return Ok(());
                }
                Err(err) => {
                    // Fall through to the fast-forward fallback.
                    log::debug!("skip dispatch failed: {err}");
                }
            }
        }

        let Some(media) = page.media() else {
            return Ok(());
        };
        if media.is_short(self.cfg.ad_duration_ceiling_secs)
            && media.remaining() > self.cfg.min_remaining_secs
        {
            executor::fast_forward(page, &media, &self.cfg)?;
            self.stats.fast_forwarded += 1;
            self.tracker.mark_fired(ActionCategory::Skip, now);
            self.emit(
                LogLevel::Success,
                format!("Ad fast-forwarded (total: {})", self.stats.fast_forwarded),
            );
            self.schedule(
                DeferredKind::RestoreRate,
                now + self.cfg.rate_restore_delay_ms,
            );
            if self.tracker.is_final_ad() {
                self.schedule(
                    DeferredKind::ForceResume,
                    now + self.cfg.rate_restore_delay_ms,
                );
            }
        }
        Ok(())
    }

    /// Activate a transition/loading skip control if one is actionable.
    fn check_transition_skip<P: Page>(&mut self, page: &mut P, now: u64) -> bool {
        if !self.tracker.can_fire(ActionCategory::TransitionSkip, now, &self.cfg) {
            return false;
        }
        let Some(button) = page.find_control(ControlKind::TransitionSkip) else {
            return false;
        };
        match executor::attempt_skip(page, &button) {
            Ok(()) => {
                self.stats.transition_skips += 1;
                self.tracker.mark_fired(ActionCategory::TransitionSkip, now);
                self.emit(
                    LogLevel::Success,
                    format!("Ad sequence skipped (total: {})", self.stats.transition_skips),
                );
                self.schedule(
                    DeferredKind::ForceResume,
                    now + self.cfg.resume_retry_delay_ms,
                );
                true
            }
            Err(err) => {
                log::debug!("transition skip dispatch failed: {err}");
                false
            }
        }
    }

    /// Handle a cycle inside the transition window or between chained ads:
    /// nudge a stalled player and press any leftover skip control.
    fn skip_ad_transition<P: Page>(&mut self, page: &mut P, now: u64, transition_fired: bool) {
        if transition_fired {
            return;
        }
        let Some(media) = page.media() else {
            return;
        };
        if media.paused || media.seeking {
            if let Err(err) = page.media_op(MediaOp::Play) {
                log::debug!("transition play rejected: {err}");
            }
            if let Some(button) = page.find_control(ControlKind::AdSkip) {
                let _ = executor::attempt_skip(page, &button);
            }
            self.schedule(
                DeferredKind::ForceResume,
                now + self.cfg.transition_resume_delay_ms,
            );
        }
    }

    // -------------------------------------------------------------------------
    // Mid-roll resolution
    // -------------------------------------------------------------------------

    /// The aggressive unblocking path that replaces the playback guard while
    /// a mid-roll is active: close the overlay, play directly, click the
    /// player. Clears the flag on success or deadline.
    fn run_mid_roll<P: Page>(&mut self, page: &mut P, now: u64) {
        let Some(media) = page.media() else {
            self.mid_roll.clear();
            return;
        };
        if !media.paused && !media.seeking {
            self.mid_roll.clear();
            self.stats.mid_rolls_blocked += 1;
            self.emit(
                LogLevel::Success,
                format!("Mid-roll ad unblocked (total: {})", self.stats.mid_rolls_blocked),
            );
            return;
        }
        if self.mid_roll.expired(now) {
            self.mid_roll.clear();
            self.emit(LogLevel::Warning, "Mid-roll ad did not resolve in time");
            return;
        }

        if let Some(close) = page.find_control(ControlKind::OverlayClose) {
            let _ = executor::attempt_skip(page, &close);
        }
        if let Err(err) = page.media_op(MediaOp::Play) {
            log::debug!("mid-roll play rejected: {err}");
        }
        if let Some(player) = page.find_control(ControlKind::Player) {
            let _ = executor::attempt_skip(page, &player);
        }
    }

    // -------------------------------------------------------------------------
    // Resume & deferred plumbing
    // -------------------------------------------------------------------------

    /// Force content playback now and arm the guard (unless a mid-roll owns
    /// the situation). A play rejection is handed to the guard's retries.
    fn force_resume_now<P: Page>(&mut self, page: &mut P, now: u64) {
        if page.media().is_none() {
            return;
        }
        if let Err(err) = executor::force_resume(page, &self.cfg) {
            log::debug!("force resume rejected: {err}");
        }
        self.tracker.reset();
        if !self.mid_roll.active() {
            self.guard.start(now, &self.cfg);
        }
    }

    fn schedule(&mut self, kind: DeferredKind, due_ms: u64) {
        self.deferred.push(Deferred { due_ms, kind });
    }

    fn run_deferred<P: Page>(&mut self, page: &mut P, now: u64) {
        if self.deferred.is_empty() {
            return;
        }
        let mut due = Vec::new();
        self.deferred.retain(|d| {
            if d.due_ms <= now {
                due.push(d.kind);
                false
            } else {
                true
            }
        });
        for kind in due {
            match kind {
                DeferredKind::RestoreRate => {
                    if let Err(err) = executor::restore_rate(page) {
                        log::debug!("rate restore failed: {err}");
                    }
                }
                DeferredKind::ForceResume => {
                    // A resume landing mid-ad would fight the ad player;
                    // drop it and let the sequence machinery resume later.
                    if observer::classify(page) == AdState::InAd {
                        continue;
                    }
                    self.force_resume_now(page, now);
                }
            }
        }
    }

    fn emit(&self, level: LogLevel, message: impl Into<String>) {
        self.sink.emit(&LogEntry {
            message: message.into(),
            level,
            timestamp: self.clock.timestamp(),
            source: LOG_SOURCE.to_string(),
        });
    }
}
