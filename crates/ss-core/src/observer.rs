//! State observer: read-only ad/content classification.
//!
//! Pure queries over the current page, safe to call on every poll tick and
//! every DOM mutation. Indicator flicker between chained ads is absorbed by
//! the sequence tracker's counted checks, never here.

use crate::config::AgentConfig;
use crate::page::Page;
use crate::types::{AdSignals, AdState};

/// Classify the page for this cycle.
///
/// `InAd` iff any primary ad indicator is visible. `Transitioning` is never
/// produced here; the sequence tracker derives it from history.
pub fn classify<P: Page>(page: &P) -> AdState {
    if page.ad_signals().intersects(AdSignals::PRIMARY) {
        AdState::InAd
    } else {
        AdState::Content
    }
}

/// Secondary mid-roll heuristic.
///
/// Mid-roll markup can differ from pre-roll markup, so a mid-duration
/// pause/stall of long media together with a visible ad overlay counts as a
/// mid-roll ad even while the primary indicators are absent.
pub fn detect_mid_roll<P: Page>(page: &P, cfg: &AgentConfig) -> bool {
    if !page.ad_signals().contains(AdSignals::AD_OVERLAY) {
        return false;
    }
    let Some(media) = page.media() else {
        return false;
    };
    if !media.paused && !media.seeking {
        return false;
    }
    // Short media is an ad itself, not content interrupted by one.
    if !media.duration.is_finite() || media.duration < cfg.ad_duration_ceiling_secs {
        return false;
    }
    media.current_time >= cfg.mid_roll_min_position_secs
}
