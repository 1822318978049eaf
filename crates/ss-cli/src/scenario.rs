//! JSON-scripted page timelines for offline heuristics debugging.
//!
//! A scenario is a list of keyframes describing what the page looks like
//! from a given instant: visible ad signals, badge text, actionable
//! controls, media state. The runner replays the timeline through a real
//! agent at poll cadence and collects everything it did.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use ss_core::{
    ActionError, ActionStats, AdGuardAgent, AdSignals, AgentConfig, Clock, ControlKind, LogEntry,
    LogSink, MediaOp, MediaSnapshot, Page, SyntheticEvent,
};

// =============================================================================
// Scenario format
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    /// Engine config overrides for this run.
    #[serde(default)]
    pub config: AgentConfig,
    /// How long to run, in milliseconds of simulated time.
    pub duration_ms: u64,
    /// Keyframes, ascending by `at_ms`. Each frame fully replaces the
    /// visible signals/badge/controls; `media`, when present, resets the
    /// media element (a new ad or the content video taking over).
    pub frames: Vec<Frame>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Frame {
    pub at_ms: u64,
    #[serde(default)]
    pub signals: Vec<SignalName>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub controls: Vec<ControlName>,
    #[serde(default)]
    pub media: Option<MediaState>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalName {
    TextLabel,
    PreviewBadge,
    InstreamOverlay,
    AdOverlay,
}

impl From<SignalName> for AdSignals {
    fn from(name: SignalName) -> Self {
        match name {
            SignalName::TextLabel => AdSignals::TEXT_LABEL,
            SignalName::PreviewBadge => AdSignals::PREVIEW_BADGE,
            SignalName::InstreamOverlay => AdSignals::INSTREAM_OVERLAY,
            SignalName::AdOverlay => AdSignals::AD_OVERLAY,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlName {
    AdSkip,
    TransitionSkip,
    OverlayClose,
    Player,
}

impl From<ControlName> for ControlKind {
    fn from(name: ControlName) -> Self {
        match name {
            ControlName::AdSkip => ControlKind::AdSkip,
            ControlName::TransitionSkip => ControlKind::TransitionSkip,
            ControlName::OverlayClose => ControlKind::OverlayClose,
            ControlName::Player => ControlKind::Player,
        }
    }
}

fn default_rate() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaState {
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub seeking: bool,
    #[serde(default)]
    pub current_time: f64,
    pub duration: f64,
    #[serde(default = "default_rate")]
    pub playback_rate: f64,
    #[serde(default)]
    pub muted: bool,
}

impl From<MediaState> for MediaSnapshot {
    fn from(state: MediaState) -> Self {
        MediaSnapshot {
            paused: state.paused,
            seeking: state.seeking,
            current_time: state.current_time,
            duration: state.duration,
            playback_rate: state.playback_rate,
            muted: state.muted,
        }
    }
}

impl Scenario {
    pub fn parse(text: &str) -> Result<Self, String> {
        let scenario: Scenario =
            serde_json::from_str(text).map_err(|e| format!("Invalid scenario: {e}"))?;
        if scenario.frames.is_empty() {
            return Err("Scenario has no frames".to_string());
        }
        if scenario.frames.windows(2).any(|w| w[0].at_ms > w[1].at_ms) {
            return Err("Scenario frames must be sorted by at_ms".to_string());
        }
        Ok(scenario)
    }
}

// =============================================================================
// Scripted page
// =============================================================================

/// A `Page` driven by the scenario timeline. Media ops land on the live
/// snapshot, and playing media advances between cycles at its playback rate.
pub struct ScriptedPage {
    signals: AdSignals,
    badge: Option<String>,
    controls: HashSet<ControlKind>,
    media: Option<MediaSnapshot>,
    active_frame: Option<usize>,
    last_advance_ms: u64,
    pub dispatched: Vec<(ControlKind, SyntheticEvent)>,
}

impl ScriptedPage {
    fn new() -> Self {
        Self {
            signals: AdSignals::empty(),
            badge: None,
            controls: HashSet::new(),
            media: None,
            active_frame: None,
            last_advance_ms: 0,
            dispatched: Vec::new(),
        }
    }

    /// Move simulated time forward and apply any newly reached keyframe.
    fn advance_to(&mut self, scenario: &Scenario, now_ms: u64) {
        let elapsed = (now_ms - self.last_advance_ms) as f64 / 1000.0;
        self.last_advance_ms = now_ms;
        if let Some(media) = self.media.as_mut() {
            if !media.paused {
                media.current_time =
                    (media.current_time + elapsed * media.playback_rate).min(media.duration);
            }
        }

        let frame_index = scenario
            .frames
            .iter()
            .rposition(|frame| frame.at_ms <= now_ms);
        if frame_index == self.active_frame {
            return;
        }
        self.active_frame = frame_index;
        let Some(frame) = frame_index.map(|i| &scenario.frames[i]) else {
            return;
        };
        self.signals = frame
            .signals
            .iter()
            .fold(AdSignals::empty(), |set, s| set | AdSignals::from(*s));
        self.badge = frame.badge.clone();
        self.controls = frame.controls.iter().map(|c| ControlKind::from(*c)).collect();
        if let Some(media) = frame.media {
            self.media = Some(media.into());
        }
    }
}

impl Page for ScriptedPage {
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
        Ok(())
    }

    fn media(&self) -> Option<MediaSnapshot> {
        self.media
    }

    fn media_op(&mut self, op: MediaOp) -> Result<(), ActionError> {
        let Some(media) = self.media.as_mut() else {
            return Err(ActionError::Media("no media element".into()));
        };
        match op {
            MediaOp::Play => media.paused = false,
            MediaOp::Seek(to) => media.current_time = to,
            MediaOp::SetRate(rate) => media.playback_rate = rate,
            MediaOp::SetMuted(muted) => media.muted = muted,
        }
        Ok(())
    }
}

// =============================================================================
// Runner
// =============================================================================

#[derive(Clone, Default)]
struct SimClock(Rc<Cell<u64>>);

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }

    fn timestamp(&self) -> String {
        let ms = self.0.get();
        format!(
            "1970-01-01T{:02}:{:02}:{:02}.{:03}Z",
            ms / 3_600_000,
            ms / 60_000 % 60,
            ms / 1_000 % 60,
            ms % 1_000
        )
    }
}

#[derive(Clone, Default)]
struct CollectSink(Rc<RefCell<Vec<LogEntry>>>);

impl LogSink for CollectSink {
    fn emit(&self, entry: &LogEntry) {
        self.0.borrow_mut().push(entry.clone());
    }
}

#[derive(Serialize)]
pub struct RunReport {
    pub cycles: u64,
    pub stats: ActionStats,
    pub entries: Vec<LogEntry>,
}

/// Replay a scenario through a fresh agent at poll cadence.
pub fn run(scenario: &Scenario) -> RunReport {
    let clock = SimClock::default();
    let sink = CollectSink::default();
    let mut agent = AdGuardAgent::new(scenario.config.clone(), clock.clone(), sink.clone());
    let mut page = ScriptedPage::new();

    let step = scenario.config.poll_interval_ms.max(1);
    let mut cycles = 0;
    let mut now = 0;
    while now <= scenario.duration_ms {
        page.advance_to(scenario, now);
        clock.0.set(now);
        agent.cycle(&mut page);
        cycles += 1;
        now += step;
    }

    let entries = sink.0.borrow().clone();
    RunReport {
        cycles,
        stats: agent.stats(),
        entries,
    }
}
