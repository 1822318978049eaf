//! Action executor: synthetic input sequences and media fallbacks.
//!
//! Free functions over the [`Page`] seam; all state (debounce, stats,
//! deferred restores) stays with the agent. Dispatch failures propagate so
//! the caller can fall through to the next fallback in the same cycle.

use crate::config::AgentConfig;
use crate::error::ActionError;
use crate::page::{MediaOp, MediaSnapshot, Page, CLICK_SEQUENCE};

/// Activate a control with the full synthetic interaction.
///
/// Dispatches touch-start, touch-end, mouse-down, mouse-up, click in that
/// fixed order. Any dispatch failure aborts the sequence and is returned.
pub fn attempt_skip<P: Page>(page: &mut P, control: &P::Control) -> Result<(), ActionError> {
    for event in CLICK_SEQUENCE {
        page.dispatch(control, event)?;
    }
    Ok(())
}

/// Seek an unskippable short ad to its end.
///
/// Only valid for media below the ad-duration ceiling; the caller checks
/// [`MediaSnapshot::is_short`] first and schedules the deferred rate/mute
/// restore. Seeks to just short of the end, cranks the playback rate, and
/// mutes so the remainder is inaudible.
pub fn fast_forward<P: Page>(
    page: &mut P,
    media: &MediaSnapshot,
    cfg: &AgentConfig,
) -> Result<(), ActionError> {
    debug_assert!(media.is_short(cfg.ad_duration_ceiling_secs));
    page.media_op(MediaOp::Seek(media.duration - cfg.seek_end_epsilon_secs))?;
    page.media_op(MediaOp::SetRate(cfg.fast_forward_rate))?;
    page.media_op(MediaOp::SetMuted(true))?;
    Ok(())
}

/// Undo the fast-forward rate/mute changes.
pub fn restore_rate<P: Page>(page: &mut P) -> Result<(), ActionError> {
    page.media_op(MediaOp::SetRate(1.0))?;
    page.media_op(MediaOp::SetMuted(false))?;
    Ok(())
}

/// Kick content playback back into a normal state.
///
/// Resets rate and mute, rewinds near-zero positions to zero, issues play,
/// and clicks the player surface (some players only lift an autoplay block
/// for a user-gesture-like event). A play rejection is returned so the
/// caller can hand retries to the playback guard; it is not an error path.
pub fn force_resume<P: Page>(page: &mut P, cfg: &AgentConfig) -> Result<(), ActionError> {
    page.media_op(MediaOp::SetRate(1.0))?;
    page.media_op(MediaOp::SetMuted(false))?;
    if let Some(media) = page.media() {
        if media.current_time < cfg.rewind_threshold_secs {
            page.media_op(MediaOp::Seek(0.0))?;
        }
    }
    let played = page.media_op(MediaOp::Play);
    if let Some(player) = page.find_control(crate::page::ControlKind::Player) {
        // The gesture click matters more than its outcome.
        let _ = attempt_skip(page, &player);
    }
    played
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{ControlKind, SyntheticEvent};
    use crate::test_support::FakePage;

    #[test]
    fn test_attempt_skip_dispatch_order() {
        let mut page = FakePage::new();
        page.controls.insert(ControlKind::AdSkip);
        let control = page.find_control(ControlKind::AdSkip).unwrap();
        attempt_skip(&mut page, &control).unwrap();
        let events: Vec<SyntheticEvent> =
            page.dispatched.iter().map(|(_, e)| *e).collect();
        assert_eq!(events, CLICK_SEQUENCE.to_vec());
    }

    #[test]
    fn test_attempt_skip_aborts_on_dispatch_failure() {
        let mut page = FakePage::new();
        page.controls.insert(ControlKind::AdSkip);
        page.fail_dispatch = true;
        let control = page.find_control(ControlKind::AdSkip).unwrap();
        assert!(attempt_skip(&mut page, &control).is_err());
        assert_eq!(page.dispatched.len(), 1);
    }

    #[test]
    fn test_fast_forward_ops() {
        let cfg = AgentConfig::default();
        let mut page = FakePage::new();
        page.media = Some(MediaSnapshot {
            paused: false,
            seeking: false,
            current_time: 3.0,
            duration: 30.0,
            playback_rate: 1.0,
            muted: false,
        });
        let media = page.media().unwrap();
        fast_forward(&mut page, &media, &cfg).unwrap();
        let media = page.media().unwrap();
        assert!(media.current_time > 29.9);
        assert_eq!(media.playback_rate, cfg.fast_forward_rate);
        assert!(media.muted);
    }

    #[test]
    fn test_restore_rate() {
        let mut page = FakePage::new();
        page.media = Some(MediaSnapshot {
            paused: false,
            seeking: false,
            current_time: 29.99,
            duration: 30.0,
            playback_rate: 16.0,
            muted: true,
        });
        restore_rate(&mut page).unwrap();
        let media = page.media().unwrap();
        assert_eq!(media.playback_rate, 1.0);
        assert!(!media.muted);
    }

    #[test]
    fn test_force_resume_rewinds_near_zero() {
        let cfg = AgentConfig::default();
        let mut page = FakePage::new();
        page.controls.insert(ControlKind::Player);
        page.media = Some(MediaSnapshot {
            paused: true,
            seeking: false,
            current_time: 0.3,
            duration: 600.0,
            playback_rate: 16.0,
            muted: true,
        });
        force_resume(&mut page, &cfg).unwrap();
        let media = page.media().unwrap();
        assert_eq!(media.current_time, 0.0);
        assert!(!media.paused);
        assert_eq!(media.playback_rate, 1.0);
        assert!(!media.muted);
        // Player surface got the gesture click.
        assert!(page
            .dispatched
            .iter()
            .any(|(kind, e)| *kind == ControlKind::Player && *e == SyntheticEvent::Click));
    }

    #[test]
    fn test_force_resume_play_rejection_is_returned() {
        let cfg = AgentConfig::default();
        let mut page = FakePage::new();
        page.reject_play = true;
        page.media = Some(MediaSnapshot {
            paused: true,
            seeking: false,
            current_time: 12.0,
            duration: 600.0,
            playback_rate: 1.0,
            muted: false,
        });
        assert!(force_resume(&mut page, &cfg).is_err());
        // Rate and mute resets still happened before the rejection.
        let media = page.media().unwrap();
        assert_eq!(media.playback_rate, 1.0);
    }
}
