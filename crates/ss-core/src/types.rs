//! Core type definitions for the ad guard agent.

use serde::Serialize;

// =============================================================================
// Ad State
// =============================================================================

/// Classification of the page for one evaluation cycle.
///
/// `Content` and `InAd` come straight from the observer; `Transitioning` is
/// reported by the sequence tracker while it absorbs the indicator flicker
/// between chained ads. Recomputed every cycle, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdState {
    /// Main content is (or should be) playing.
    Content,
    /// At least one ad indicator is visible.
    InAd,
    /// Indicators just vanished after an ad; completion not yet confirmed.
    Transitioning,
}

// =============================================================================
// Ad Signals
// =============================================================================

bitflags::bitflags! {
    /// Categories of ad-indicator elements currently visible on the page.
    ///
    /// The engine mandates the categories, not the selector strings; which
    /// DOM elements map to which bit is a [`Page`](crate::page::Page)
    /// implementation concern.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct AdSignals: u8 {
        /// The ad text label (also carries the "N of M" sequence badge).
        const TEXT_LABEL = 1 << 0;
        /// The ad preview badge ("ad starting soon").
        const PREVIEW_BADGE = 1 << 1;
        /// The in-stream ad info overlay container.
        const INSTREAM_OVERLAY = 1 << 2;
        /// Image/text overlay shown during mid-roll ads; its markup differs
        /// from the pre-roll indicators and may appear without them.
        const AD_OVERLAY = 1 << 3;

        /// Signals that classify the page as in-ad on their own.
        const PRIMARY = Self::TEXT_LABEL.bits()
            | Self::PREVIEW_BADGE.bits()
            | Self::INSTREAM_OVERLAY.bits();
    }
}

// =============================================================================
// Ad Sequence Info
// =============================================================================

/// Parsed "N of M" ad-sequence badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdSequenceInfo {
    /// 1-based index of the current ad.
    pub current: u32,
    /// Total ads in the sequence.
    pub total: u32,
}

impl AdSequenceInfo {
    /// Parse a sequence badge out of indicator text.
    ///
    /// Accepts any text containing `N of M` (case-insensitive, arbitrary
    /// whitespace around `of`, e.g. `"Ad 2 of 3 · 0:12"`). Returns `None`
    /// when no such pattern is present.
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase();
        let bytes = lower.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if !bytes[i].is_ascii_digit() {
                i += 1;
                continue;
            }
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let Ok(current) = lower[start..i].parse::<u32>() else {
                continue;
            };
            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if !lower[j..].starts_with("of") {
                continue;
            }
            let mut k = j + 2;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            let total_start = k;
            while k < bytes.len() && bytes[k].is_ascii_digit() {
                k += 1;
            }
            if k == total_start {
                continue;
            }
            if let Ok(total) = lower[total_start..k].parse::<u32>() {
                return Some(Self { current, total });
            }
        }
        None
    }

    /// Whether this is the last ad of its sequence.
    pub fn is_final(&self) -> bool {
        self.current == self.total
    }
}

// =============================================================================
// Action Stats
// =============================================================================

/// Monotonic action counters, for observability only.
///
/// These are emitted to the log sink and exposed to the host; control logic
/// never reads them back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionStats {
    /// Ads dismissed via their skip control.
    pub skipped: u64,
    /// Unskippable short ads seeked past.
    pub fast_forwarded: u64,
    /// Transition/loading skip controls activated between chained ads.
    pub transition_skips: u64,
    /// Mid-roll ads unblocked.
    pub mid_rolls_blocked: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_badge() {
        assert_eq!(
            AdSequenceInfo::parse("Ad 1 of 3"),
            Some(AdSequenceInfo { current: 1, total: 3 })
        );
        assert_eq!(
            AdSequenceInfo::parse("2 OF 5 · 0:12"),
            Some(AdSequenceInfo { current: 2, total: 5 })
        );
        assert_eq!(
            AdSequenceInfo::parse("1of2"),
            Some(AdSequenceInfo { current: 1, total: 2 })
        );
    }

    #[test]
    fn test_parse_badge_rejects_noise() {
        assert_eq!(AdSequenceInfo::parse(""), None);
        assert_eq!(AdSequenceInfo::parse("Ad · 0:30"), None);
        assert_eq!(AdSequenceInfo::parse("best of 2024"), None);
        assert_eq!(AdSequenceInfo::parse("1 of "), None);
    }

    #[test]
    fn test_parse_badge_skips_false_starts() {
        // An earlier digit run without "of" must not mask a later match.
        assert_eq!(
            AdSequenceInfo::parse("0:05 · Ad 2 of 3"),
            Some(AdSequenceInfo { current: 2, total: 3 })
        );
    }

    #[test]
    fn test_is_final() {
        assert!(AdSequenceInfo { current: 3, total: 3 }.is_final());
        assert!(!AdSequenceInfo { current: 1, total: 3 }.is_final());
    }

    #[test]
    fn test_primary_signals() {
        assert!(AdSignals::PRIMARY.contains(AdSignals::TEXT_LABEL));
        assert!(!AdSignals::PRIMARY.contains(AdSignals::AD_OVERLAY));
    }
}
