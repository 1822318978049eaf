//! Agent tuning knobs.
//!
//! Defaults mirror the production extension. The CLI deserializes overrides
//! from scenario files; the injected build runs on `AgentConfig::default()`.

use serde::Deserialize;

/// All timing and threshold parameters of the agent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Interval at which the host's poll driver invokes the cycle.
    /// Informational for hosts; the engine itself is driven externally.
    pub poll_interval_ms: u64,

    /// Cooldown between skip/fast-forward actions.
    pub action_cooldown_ms: u64,
    /// Independent cooldown for transition/loading skips.
    pub transition_cooldown_ms: u64,

    /// Consecutive indicator-free cycles after an ad before the sequence
    /// counts as finished. Below this, flicker between chained ads is
    /// treated as still-in-sequence.
    pub transition_confirm_cycles: u32,

    /// Media at or above this duration is never fast-forwarded; it is
    /// assumed to be main content, not an ad.
    pub ad_duration_ceiling_secs: f64,
    /// Playback rate applied while seeking out an unskippable ad.
    pub fast_forward_rate: f64,
    /// How far short of the end the fast-forward seek lands.
    pub seek_end_epsilon_secs: f64,
    /// Fast-forward only fires with at least this much ad left.
    pub min_remaining_secs: f64,
    /// Delay before the fast-forward rate/mute state is restored.
    pub rate_restore_delay_ms: u64,

    /// Delay between a successful primary skip and its resume probe.
    pub skip_resume_delay_ms: u64,
    /// Delay between a transition skip and its resume probe.
    pub resume_retry_delay_ms: u64,
    /// Delay before the resume probe scheduled from a stalled transition.
    pub transition_resume_delay_ms: u64,
    /// Positions below this are rewound to zero on resume.
    pub rewind_threshold_secs: f64,

    /// Playback guard tick interval.
    pub guard_interval_ms: u64,
    /// Playback guard attempt budget.
    pub guard_max_attempts: u32,
    /// Elapsed playback past which the guard considers content stable.
    pub stability_threshold_secs: f64,

    /// Earliest position that can count as a mid-roll stall.
    pub mid_roll_min_position_secs: f64,
    /// Bound on how long the mid-roll resolution path may run.
    pub mid_roll_timeout_ms: u64,

    /// Pause events this early into content trigger a deferred resume probe.
    pub early_pause_window_secs: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 150,
            action_cooldown_ms: 300,
            transition_cooldown_ms: 500,
            transition_confirm_cycles: 10,
            ad_duration_ceiling_secs: 120.0,
            fast_forward_rate: 16.0,
            seek_end_epsilon_secs: 0.01,
            min_remaining_secs: 0.2,
            rate_restore_delay_ms: 50,
            skip_resume_delay_ms: 100,
            resume_retry_delay_ms: 200,
            transition_resume_delay_ms: 50,
            rewind_threshold_secs: 0.5,
            guard_interval_ms: 200,
            guard_max_attempts: 20,
            stability_threshold_secs: 0.5,
            mid_roll_min_position_secs: 10.0,
            mid_roll_timeout_ms: 10_000,
            early_pause_window_secs: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.transition_confirm_cycles, 10);
        assert_eq!(cfg.guard_max_attempts, 20);
        assert_eq!(cfg.ad_duration_ceiling_secs, 120.0);
    }

    #[test]
    fn test_partial_override() {
        let cfg: AgentConfig =
            serde_json::from_str(r#"{ "guard_max_attempts": 5 }"#).unwrap();
        assert_eq!(cfg.guard_max_attempts, 5);
        assert_eq!(cfg.action_cooldown_ms, 300);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<AgentConfig>(r#"{ "bogus": 1 }"#).is_err());
    }
}
