//! Scripted fakes for the host seams, shared across unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::ActionError;
use crate::page::{Clock, ControlKind, MediaOp, MediaSnapshot, Page, SyntheticEvent};
use crate::sink::{LogEntry, LogSink};
use crate::types::AdSignals;

// =============================================================================
// FakePage
// =============================================================================

/// In-memory page: tests poke the public fields between cycles.
#[derive(Debug, Default)]
pub struct FakePage {
    pub signals: AdSignals,
    pub badge: Option<String>,
    pub media: Option<MediaSnapshot>,
    /// Controls currently actionable on the page.
    pub controls: HashSet<ControlKind>,
    /// Every synthetic event dispatched, in order.
    pub dispatched: Vec<(ControlKind, SyntheticEvent)>,
    /// Every media operation applied, in order.
    pub media_ops: Vec<MediaOp>,
    /// Make every dispatch fail.
    pub fail_dispatch: bool,
    /// Make play fail (autoplay policy).
    pub reject_play: bool,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of full click sequences (one per `Click` event) at a control.
    pub fn press_count(&self, kind: ControlKind) -> usize {
        self.dispatched
            .iter()
            .filter(|(k, e)| *k == kind && *e == SyntheticEvent::Click)
            .count()
    }
}

impl Page for FakePage {
    type Control = ControlKind;

    fn ad_signals(&self) -> AdSignals {
        self.signals
    }

    fn ad_badge_text(&self) -> Option<String> {
        self.badge.clone()
    }

    fn find_control(&self, kind: ControlKind) -> Option<ControlKind> {
        self.controls.contains(&kind).then_some(kind)
    }

    fn dispatch(
        &mut self,
        control: &ControlKind,
        event: SyntheticEvent,
    ) -> Result<(), ActionError> {
        self.dispatched.push((*control, event));
        if self.fail_dispatch {
            return Err(ActionError::Dispatch("scripted failure".into()));
        }
        Ok(())
    }

    fn media(&self) -> Option<MediaSnapshot> {
        self.media
    }

    fn media_op(&mut self, op: MediaOp) -> Result<(), ActionError> {
        self.media_ops.push(op);
        let Some(media) = self.media.as_mut() else {
            return Err(ActionError::Media("no media element".into()));
        };
        match op {
            MediaOp::Play => {
                if self.reject_play {
                    return Err(ActionError::Media("NotAllowedError".into()));
                }
                media.paused = false;
            }
            MediaOp::Seek(to) => media.current_time = to,
            MediaOp::SetRate(rate) => media.playback_rate = rate,
            MediaOp::SetMuted(muted) => media.muted = muted,
        }
        Ok(())
    }
}

// =============================================================================
// FakeClock
// =============================================================================

/// Shared manual clock; clones observe the same instant.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    now_ms: Rc<Cell<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.set(ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn timestamp(&self) -> String {
        format!("1970-01-01T00:00:{:02}.{:03}Z", 0, self.now_ms.get() % 1000)
    }
}

// =============================================================================
// BufferSink
// =============================================================================

/// Sink that collects entries; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    entries: Rc<RefCell<Vec<LogEntry>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|e| e.message.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl LogSink for BufferSink {
    fn emit(&self, entry: &LogEntry) {
        self.entries.borrow_mut().push(entry.clone());
    }
}
