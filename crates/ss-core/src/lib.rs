//! SkipShield Core Library
//!
//! This crate provides the ad guard agent for the SkipShield content blocker:
//! the stateful heuristic engine that classifies a streaming page as in-ad vs
//! in-content, activates skip controls with synthetic input sequences,
//! fast-forwards unskippable short ads, tracks chained ad sequences, and
//! keeps content playback alive once a sequence ends.
//!
//! # Architecture
//!
//! The engine never touches browser types directly. All DOM access goes
//! through the [`Page`] trait, all time access through [`Clock`], and all
//! outbound reporting through [`LogSink`], so the same agent runs against the
//! live DOM (see the `ss-wasm` crate), a scripted replay (`ss-cli`), or a
//! fake page in unit tests. One [`AdGuardAgent`] instance owns all mutable
//! state for a single page load; both cycle drivers (interval poll and
//! mutation callback) funnel into one re-entry-guarded evaluation cycle.
//!
//! # Modules
//!
//! - `observer`: read-only ad/content classification over the page
//! - `executor`: synthetic input sequences and media fallbacks
//! - `sequence`: ad-sequence state machine, debounce gates, mid-roll flag
//! - `guard`: bounded-retry playback guard
//! - `agent`: the evaluation cycle tying the components together
//! - `page`: host seams (DOM surface, clock)
//! - `sink`: structured log entries and the outbound sink trait
//! - `style`: cosmetic CSS for non-interactive ad decoration

pub mod agent;
pub mod config;
pub mod error;
pub mod executor;
pub mod guard;
pub mod observer;
pub mod page;
pub mod sequence;
pub mod sink;
pub mod style;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use agent::AdGuardAgent;
pub use config::AgentConfig;
pub use error::ActionError;
pub use page::{Clock, ControlKind, MediaOp, MediaSnapshot, Page, SyntheticEvent};
pub use sink::{LogEntry, LogLevel, LogSink};
pub use types::{ActionStats, AdSequenceInfo, AdSignals, AdState};
