//! Sequence tracker: the ad-sequence state machine and debounce gates.
//!
//! Chained ads (pre-roll sequences, back-to-back mid-rolls) make the
//! indicators flicker: one ad's markup vanishes a few frames before the next
//! ad's appears. Acting on a single reading would resume content in the
//! middle of a sequence, so the tracker demands a run of consecutive
//! indicator-free cycles before declaring the sequence finished.

use crate::config::AgentConfig;
use crate::types::{AdSequenceInfo, AdState};

// =============================================================================
// Cycle steps
// =============================================================================

/// What one observer reading meant, given the tracked history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// No ad showing and none recently; nothing to do.
    Idle,
    /// First cycle of a (possibly chained) ad.
    EnteredAd,
    /// Ad still showing.
    InAd,
    /// Indicators just vanished after an ad; completion not yet confirmed.
    /// Carries the number of consecutive confirmation cycles so far.
    Transition(u32),
    /// The confirmation threshold was reached; the sequence is over.
    SequenceFinished,
}

// =============================================================================
// Action categories
// =============================================================================

/// Debounce category. Each category has its own cooldown so a transition
/// probe never starves the primary skip path or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    /// Primary skip and fast-forward actions.
    Skip,
    /// Transition/loading skip actions between chained ads.
    TransitionSkip,
}

// =============================================================================
// Tracker
// =============================================================================

/// Counters and debounce clocks spanning a whole ad sequence.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    was_in_ad: bool,
    consecutive_transition_checks: u32,
    sequence_active: bool,
    sequence_info: Option<AdSequenceInfo>,
    last_action_at: Option<u64>,
    last_transition_skip_at: Option<u64>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one observer reading into the state machine.
    pub fn observe(&mut self, in_ad: bool, cfg: &AgentConfig) -> Step {
        if self.was_in_ad && !in_ad {
            self.consecutive_transition_checks += 1;
            if self.consecutive_transition_checks < cfg.transition_confirm_cycles {
                return Step::Transition(self.consecutive_transition_checks);
            }
            self.reset();
            return Step::SequenceFinished;
        }
        // Leaving the transition phase in either direction resets the count.
        self.consecutive_transition_checks = 0;
        if in_ad {
            let entered = !self.was_in_ad;
            self.was_in_ad = true;
            if entered {
                Step::EnteredAd
            } else {
                Step::InAd
            }
        } else {
            Step::Idle
        }
    }

    /// The tracked counterpart of [`AdState`]: reports `Transitioning` while
    /// inside the confirmation window.
    pub fn phase(&self) -> AdState {
        if self.consecutive_transition_checks > 0 {
            AdState::Transitioning
        } else if self.was_in_ad {
            AdState::InAd
        } else {
            AdState::Content
        }
    }

    /// Record a parsed "N of M" badge.
    ///
    /// Returns `true` exactly once per sequence, on the first sighting of the
    /// opening ad, so the caller can announce the sequence without spamming
    /// the sink every cycle the badge stays visible.
    pub fn note_sequence(&mut self, info: AdSequenceInfo) -> bool {
        self.sequence_info = Some(info);
        let announce = info.current == 1 && !self.sequence_active;
        self.sequence_active = true;
        announce
    }

    /// Whether a chained sequence is known to be in flight. While set, a
    /// `Content` reading between ads keeps probing for transition skips
    /// instead of assuming completion.
    pub fn sequence_active(&self) -> bool {
        self.sequence_active
    }

    /// Whether the current ad is the last of its sequence (or no sequence
    /// badge was ever seen, in which case every ad is its own sequence).
    pub fn is_final_ad(&self) -> bool {
        self.sequence_info.map_or(true, |info| info.is_final())
    }

    pub fn consecutive_transition_checks(&self) -> u32 {
        self.consecutive_transition_checks
    }

    /// Debounce gate: may an action of this category fire now?
    pub fn can_fire(&self, category: ActionCategory, now_ms: u64, cfg: &AgentConfig) -> bool {
        let (last, cooldown) = match category {
            ActionCategory::Skip => (self.last_action_at, cfg.action_cooldown_ms),
            ActionCategory::TransitionSkip => {
                (self.last_transition_skip_at, cfg.transition_cooldown_ms)
            }
        };
        match last {
            Some(at) => now_ms.saturating_sub(at) >= cooldown,
            None => true,
        }
    }

    /// Record that an action of this category just fired.
    pub fn mark_fired(&mut self, category: ActionCategory, now_ms: u64) {
        match category {
            ActionCategory::Skip => self.last_action_at = Some(now_ms),
            ActionCategory::TransitionSkip => self.last_transition_skip_at = Some(now_ms),
        }
    }

    /// Clear all sequence state. Debounce clocks survive; cooldowns span
    /// sequences by design of the event-storm protection.
    pub fn reset(&mut self) {
        self.was_in_ad = false;
        self.consecutive_transition_checks = 0;
        self.sequence_active = false;
        self.sequence_info = None;
    }
}

// =============================================================================
// Mid-roll flag
// =============================================================================

/// Orthogonal mid-roll marker with a resolution deadline.
///
/// While active, the playback guard is suppressed; a mid-roll needs the more
/// aggressive unblocking path (overlay close, direct play) before normal
/// guard behavior may resume.
#[derive(Debug, Default)]
pub struct MidRoll {
    active: bool,
    deadline_ms: u64,
}

impl MidRoll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self, now_ms: u64, cfg: &AgentConfig) {
        self.active = true;
        self.deadline_ms = now_ms + cfg.mid_roll_timeout_ms;
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn expired(&self, now_ms: u64) -> bool {
        self.active && now_ms >= self.deadline_ms
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.deadline_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> AgentConfig {
        AgentConfig::default()
    }

    #[test]
    fn test_idle_to_in_ad() {
        let mut tracker = SequenceTracker::new();
        assert_eq!(tracker.observe(false, &cfg()), Step::Idle);
        assert_eq!(tracker.observe(true, &cfg()), Step::EnteredAd);
        assert_eq!(tracker.observe(true, &cfg()), Step::InAd);
        assert_eq!(tracker.phase(), AdState::InAd);
    }

    #[test]
    fn test_transition_confirmation() {
        let cfg = cfg();
        let mut tracker = SequenceTracker::new();
        tracker.observe(true, &cfg);
        for i in 1..cfg.transition_confirm_cycles {
            assert_eq!(tracker.observe(false, &cfg), Step::Transition(i));
            assert_eq!(tracker.phase(), AdState::Transitioning);
        }
        assert_eq!(tracker.observe(false, &cfg), Step::SequenceFinished);
        assert_eq!(tracker.consecutive_transition_checks(), 0);
        assert_eq!(tracker.phase(), AdState::Content);
    }

    #[test]
    fn test_counter_resets_when_ad_returns() {
        let cfg = cfg();
        let mut tracker = SequenceTracker::new();
        tracker.observe(true, &cfg);
        tracker.observe(false, &cfg);
        tracker.observe(false, &cfg);
        assert_eq!(tracker.consecutive_transition_checks(), 2);
        // The next chained ad appears; the count must drop immediately.
        assert_eq!(tracker.observe(true, &cfg), Step::InAd);
        assert_eq!(tracker.consecutive_transition_checks(), 0);
    }

    #[test]
    fn test_sequence_announcement_fires_once() {
        let mut tracker = SequenceTracker::new();
        let first = AdSequenceInfo { current: 1, total: 3 };
        assert!(tracker.note_sequence(first));
        assert!(!tracker.note_sequence(first));
        assert!(!tracker.note_sequence(AdSequenceInfo { current: 2, total: 3 }));
        assert!(tracker.sequence_active());
    }

    #[test]
    fn test_final_ad_detection() {
        let mut tracker = SequenceTracker::new();
        assert!(tracker.is_final_ad()); // no badge seen
        tracker.note_sequence(AdSequenceInfo { current: 1, total: 3 });
        assert!(!tracker.is_final_ad());
        tracker.note_sequence(AdSequenceInfo { current: 3, total: 3 });
        assert!(tracker.is_final_ad());
    }

    #[test]
    fn test_debounce_gates_are_independent() {
        let cfg = cfg();
        let mut tracker = SequenceTracker::new();
        assert!(tracker.can_fire(ActionCategory::Skip, 1_000, &cfg));
        tracker.mark_fired(ActionCategory::Skip, 1_000);
        assert!(!tracker.can_fire(ActionCategory::Skip, 1_200, &cfg));
        assert!(tracker.can_fire(ActionCategory::Skip, 1_300, &cfg));
        // The transition category is not affected by the skip clock.
        assert!(tracker.can_fire(ActionCategory::TransitionSkip, 1_001, &cfg));
        tracker.mark_fired(ActionCategory::TransitionSkip, 1_001);
        assert!(!tracker.can_fire(ActionCategory::TransitionSkip, 1_400, &cfg));
        assert!(tracker.can_fire(ActionCategory::TransitionSkip, 1_501, &cfg));
    }

    #[test]
    fn test_reset_clears_sequence_but_not_debounce() {
        let cfg = cfg();
        let mut tracker = SequenceTracker::new();
        tracker.note_sequence(AdSequenceInfo { current: 1, total: 2 });
        tracker.mark_fired(ActionCategory::Skip, 5_000);
        tracker.observe(true, &cfg);
        tracker.reset();
        assert!(!tracker.sequence_active());
        assert!(tracker.is_final_ad());
        assert_eq!(tracker.phase(), AdState::Content);
        assert!(!tracker.can_fire(ActionCategory::Skip, 5_100, &cfg));
    }

    #[test]
    fn test_mid_roll_deadline() {
        let cfg = cfg();
        let mut mid_roll = MidRoll::new();
        assert!(!mid_roll.active());
        mid_roll.activate(1_000, &cfg);
        assert!(mid_roll.active());
        assert!(!mid_roll.expired(1_000 + cfg.mid_roll_timeout_ms - 1));
        assert!(mid_roll.expired(1_000 + cfg.mid_roll_timeout_ms));
        mid_roll.clear();
        assert!(!mid_roll.active());
    }
}
