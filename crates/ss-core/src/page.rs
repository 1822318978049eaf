//! Host seams: the DOM surface and the clock.
//!
//! The agent runs against an adversarial, uncontrolled page whose markup can
//! change independently of this crate. Everything it reads or touches goes
//! through [`Page`], so selector strategies live in the host implementation
//! (`ss-wasm` for the live DOM, scripted fakes for tests and the CLI).

use crate::error::ActionError;
use crate::types::AdSignals;

// =============================================================================
// Synthetic Events
// =============================================================================

/// One synthetic input event, dispatched at a control.
///
/// All events are dispatched bubbling and cancelable. Some host pages only
/// honor pointer sequences that resemble genuine touch interaction, so skip
/// activation always dispatches the full [`CLICK_SEQUENCE`] rather than a
/// bare click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticEvent {
    TouchStart,
    TouchEnd,
    MouseDown,
    MouseUp,
    Click,
}

/// The fixed dispatch order for activating a control.
pub const CLICK_SEQUENCE: [SyntheticEvent; 5] = [
    SyntheticEvent::TouchStart,
    SyntheticEvent::TouchEnd,
    SyntheticEvent::MouseDown,
    SyntheticEvent::MouseUp,
    SyntheticEvent::Click,
];

// =============================================================================
// Controls
// =============================================================================

/// Categories of interactive elements the agent targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    /// The primary in-ad skip button.
    AdSkip,
    /// The short-lived skip control shown between chained ads or during
    /// the ad-to-content transition.
    TransitionSkip,
    /// Close button of a mid-roll ad overlay.
    OverlayClose,
    /// The player surface itself, clicked to lift autoplay blocks.
    Player,
}

// =============================================================================
// Media
// =============================================================================

/// Point-in-time view of the primary media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaSnapshot {
    pub paused: bool,
    pub seeking: bool,
    pub current_time: f64,
    pub duration: f64,
    pub playback_rate: f64,
    pub muted: bool,
}

impl MediaSnapshot {
    /// Seconds of playback remaining, clamped at zero.
    pub fn remaining(&self) -> f64 {
        (self.duration - self.current_time).max(0.0)
    }

    /// Whether the duration is below the given ad-duration ceiling.
    ///
    /// Live streams report an infinite or NaN duration and never qualify.
    pub fn is_short(&self, ceiling_secs: f64) -> bool {
        self.duration.is_finite() && self.duration > 0.0 && self.duration < ceiling_secs
    }
}

/// A mutation of the primary media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaOp {
    Play,
    Seek(f64),
    SetRate(f64),
    SetMuted(bool),
}

// =============================================================================
// Page trait
// =============================================================================

/// The replaceable DOM surface the agent observes and acts on.
///
/// Read methods must be side-effect free and cheap; they are called on every
/// poll tick and every DOM mutation. A missing element is a normal negative
/// signal (`None`/empty), never an error.
pub trait Page {
    /// Opaque handle to a located control, valid until the next cycle.
    type Control;

    /// Which ad-indicator categories are currently visible.
    fn ad_signals(&self) -> AdSignals;

    /// Text of the ad-index badge, if one is rendered.
    fn ad_badge_text(&self) -> Option<String>;

    /// Locate an actionable control of the given category.
    ///
    /// "Actionable" means rendered and interactive. The exact predicate
    /// (e.g. a non-null `offsetParent` plus not-disabled) is this
    /// implementation's own strategy and may change with the host markup.
    fn find_control(&self, kind: ControlKind) -> Option<Self::Control>;

    /// Dispatch one synthetic event at a control.
    fn dispatch(
        &mut self,
        control: &Self::Control,
        event: SyntheticEvent,
    ) -> Result<(), ActionError>;

    /// Snapshot the primary media element, if present.
    fn media(&self) -> Option<MediaSnapshot>;

    /// Apply one operation to the primary media element.
    ///
    /// `Play` returns [`ActionError::Media`] when the media API rejects it
    /// (autoplay policy); callers treat that as non-fatal.
    fn media_op(&mut self, op: MediaOp) -> Result<(), ActionError>;
}

// =============================================================================
// Clock
// =============================================================================

/// Monotonic-enough time source for debounce gates and deferred actions.
pub trait Clock {
    /// Milliseconds since an arbitrary epoch.
    fn now_ms(&self) -> u64;

    /// ISO 8601 wall-clock timestamp for log entries.
    fn timestamp(&self) -> String;
}
