//! WebAssembly bindings for SkipShield
//!
//! Implements the engine's host seams over the live DOM (`web-sys`) and
//! installs the agent into the page: one interval driver, one mutation
//! observer driver, the cosmetic stylesheet, and the outbound log channel to
//! the extension runtime. This crate is the injected-script entry point;
//! everything stateful lives in `ss-core`.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, EventInit, HtmlElement, HtmlMediaElement, MouseEvent,
    MouseEventInit, MutationObserver, MutationObserverInit,
};

use ss_core::style::COSMETIC_CSS;
use ss_core::{
    ActionError, AdGuardAgent, AdSignals, AdState, AgentConfig, Clock, ControlKind, LogEntry,
    LogLevel, LogSink, MediaOp, MediaSnapshot, Page, SyntheticEvent,
};

// =============================================================================
// Selector strategy
// =============================================================================
//
// The concrete selector strings are this crate's replaceable strategy; the
// engine only mandates the signal categories. Keep host-markup churn here.

const AD_TEXT_SELECTOR: &str = ".ytp-ad-text";
const AD_PREVIEW_SELECTOR: &str = ".ytp-ad-preview-text";
const AD_INSTREAM_SELECTOR: &str = ".ytp-ad-player-overlay-instream-info";
const AD_OVERLAY_SELECTOR: &str = ".ytp-ad-image-overlay, .ytp-ad-text-overlay";

const SKIP_SELECTORS: &[&str] = &[
    ".ytp-ad-skip-button",
    ".ytp-ad-skip-button-modern",
    ".ytp-skip-ad-button",
    "button[class*=\"skip\"]",
    ".ytp-ad-skip-button-container button",
];

const TRANSITION_SKIP_SELECTORS: &[&str] = &[
    ".ytp-ad-skip-button-slot",
    ".ytp-ad-skip-button-container",
    ".ytp-ad-button-slot button",
    ".ytp-flyout-cta .ytp-button",
    "button.ytp-ad-overlay-close-button",
    "[aria-label*=\"Skip\"]",
    "[aria-label*=\"skip\"]",
];

const OVERLAY_CLOSE_SELECTORS: &[&str] = &["button.ytp-ad-overlay-close-button"];

const PLAYER_SELECTOR: &str = "video";

const SKIP_DISABLED_CLASS: &str = "ytp-ad-skip-button-disabled";

// =============================================================================
// DomPage
// =============================================================================

/// `Page` over the live document.
struct DomPage {
    document: Document,
    /// Keeps play-promise rejections from surfacing as unhandled.
    swallow: Closure<dyn FnMut(JsValue)>,
}

impl DomPage {
    fn new(document: Document) -> Self {
        Self {
            document,
            swallow: Closure::new(|_: JsValue| {}),
        }
    }

    fn query(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }

    /// Rendered-and-interactive predicate: laid out (non-null offsetParent),
    /// no `disabled` attribute, no disabled skip-button class.
    fn actionable(element: &Element) -> bool {
        let rendered = element
            .dyn_ref::<HtmlElement>()
            .map_or(false, |el| el.offset_parent().is_some());
        rendered
            && !element.has_attribute("disabled")
            && !element.class_name().contains(SKIP_DISABLED_CLASS)
    }

    fn media_element(&self) -> Option<HtmlMediaElement> {
        self.query(PLAYER_SELECTOR)?.dyn_into().ok()
    }
}

fn event_name(event: SyntheticEvent) -> &'static str {
    match event {
        SyntheticEvent::TouchStart => "touchstart",
        SyntheticEvent::TouchEnd => "touchend",
        SyntheticEvent::MouseDown => "mousedown",
        SyntheticEvent::MouseUp => "mouseup",
        SyntheticEvent::Click => "click",
    }
}

fn dispatch_err(event: SyntheticEvent, err: JsValue) -> ActionError {
    ActionError::Dispatch(format!("{}: {:?}", event_name(event), err))
}

impl Page for DomPage {
    type Control = Element;

    fn ad_signals(&self) -> AdSignals {
        let mut signals = AdSignals::empty();
        if self.query(AD_TEXT_SELECTOR).is_some() {
            signals |= AdSignals::TEXT_LABEL;
        }
        if self.query(AD_PREVIEW_SELECTOR).is_some() {
            signals |= AdSignals::PREVIEW_BADGE;
        }
        if self.query(AD_INSTREAM_SELECTOR).is_some() {
            signals |= AdSignals::INSTREAM_OVERLAY;
        }
        if self.query(AD_OVERLAY_SELECTOR).is_some() {
            signals |= AdSignals::AD_OVERLAY;
        }
        signals
    }

    fn ad_badge_text(&self) -> Option<String> {
        self.query(AD_TEXT_SELECTOR)?.text_content()
    }

    fn find_control(&self, kind: ControlKind) -> Option<Element> {
        let selectors: &[&str] = match kind {
            ControlKind::AdSkip => SKIP_SELECTORS,
            ControlKind::TransitionSkip => TRANSITION_SKIP_SELECTORS,
            ControlKind::OverlayClose => OVERLAY_CLOSE_SELECTORS,
            ControlKind::Player => &[PLAYER_SELECTOR],
        };
        selectors
            .iter()
            .filter_map(|selector| self.query(selector))
            .find(|element| kind == ControlKind::Player || Self::actionable(element))
    }

    fn dispatch(&mut self, control: &Element, event: SyntheticEvent) -> Result<(), ActionError> {
        // WebKit has no reliable TouchEvent constructor, so the touch half of
        // the sequence goes out as plain bubbling events under the touch
        // event names; listeners are bound by name and still fire.
        let dom_event: Event = match event {
            SyntheticEvent::TouchStart | SyntheticEvent::TouchEnd => {
                let init = EventInit::new();
                init.set_bubbles(true);
                init.set_cancelable(true);
                Event::new_with_event_init_dict(event_name(event), &init)
                    .map_err(|err| dispatch_err(event, err))?
            }
            SyntheticEvent::MouseDown | SyntheticEvent::MouseUp | SyntheticEvent::Click => {
                let init = MouseEventInit::new();
                init.set_bubbles(true);
                init.set_cancelable(true);
                init.set_view(web_sys::window().as_ref());
                MouseEvent::new_with_mouse_event_init_dict(event_name(event), &init)
                    .map_err(|err| dispatch_err(event, err))?
                    .into()
            }
        };
        control
            .dispatch_event(&dom_event)
            .map(|_| ())
            .map_err(|err| dispatch_err(event, err))
    }

    fn media(&self) -> Option<MediaSnapshot> {
        let media = self.media_element()?;
        Some(MediaSnapshot {
            paused: media.paused(),
            seeking: media.seeking(),
            current_time: media.current_time(),
            duration: media.duration(),
            playback_rate: media.playback_rate(),
            muted: media.muted(),
        })
    }

    fn media_op(&mut self, op: MediaOp) -> Result<(), ActionError> {
        let media = self
            .media_element()
            .ok_or_else(|| ActionError::Media("no media element".into()))?;
        match op {
            MediaOp::Play => {
                let promise = media
                    .play()
                    .map_err(|err| ActionError::Media(format!("play: {err:?}")))?;
                // Async rejections (autoplay policy) go to the guard's retry
                // path; just keep them out of the console.
                let _ = promise.catch(&self.swallow);
            }
            MediaOp::Seek(to) => media.set_current_time(to),
            MediaOp::SetRate(rate) => media.set_playback_rate(rate),
            MediaOp::SetMuted(muted) => media.set_muted(muted),
        }
        Ok(())
    }
}

// =============================================================================
// Clock & sink
// =============================================================================

struct WasmClock;

impl Clock for WasmClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    fn timestamp(&self) -> String {
        String::from(js_sys::Date::new_0().to_iso_string())
    }
}

/// Forwards entries to the extension runtime (`browser.runtime.sendMessage`)
/// and mirrors them to the console. Fire-and-forget on every path.
struct RuntimeSink {
    swallow: Closure<dyn FnMut(JsValue)>,
}

impl RuntimeSink {
    fn new() -> Self {
        Self {
            swallow: Closure::new(|_: JsValue| {}),
        }
    }

    fn try_send(&self, entry: &LogEntry) -> Result<(), JsValue> {
        let payload = js_sys::Object::new();
        js_sys::Reflect::set(&payload, &"action".into(), &"log".into())?;
        js_sys::Reflect::set(&payload, &"message".into(), &entry.message.as_str().into())?;
        js_sys::Reflect::set(&payload, &"type".into(), &entry.level.as_str().into())?;
        js_sys::Reflect::set(&payload, &"timestamp".into(), &entry.timestamp.as_str().into())?;
        js_sys::Reflect::set(&payload, &"source".into(), &entry.source.as_str().into())?;

        let global = js_sys::global();
        let browser = js_sys::Reflect::get(&global, &"browser".into())?;
        let runtime = js_sys::Reflect::get(&browser, &"runtime".into())?;
        let send: js_sys::Function =
            js_sys::Reflect::get(&runtime, &"sendMessage".into())?.dyn_into()?;
        let result = send.call1(&runtime, &payload)?;
        if let Ok(promise) = result.dyn_into::<js_sys::Promise>() {
            let _ = promise.catch(&self.swallow);
        }
        Ok(())
    }
}

impl LogSink for RuntimeSink {
    fn emit(&self, entry: &LogEntry) {
        web_sys::console::log_1(&JsValue::from_str(&entry.message));
        // Outside the extension context there is no runtime channel; the
        // console mirror above is all we get.
        let _ = self.try_send(entry);
    }
}

// =============================================================================
// Installation
// =============================================================================

type Agent = AdGuardAgent<WasmClock, RuntimeSink>;

thread_local! {
    static INSTALLED: RefCell<Option<Rc<RefCell<Agent>>>> = RefCell::new(None);
}

fn inject_style(document: &Document) -> Result<(), JsValue> {
    let style = document.create_element("style")?;
    style.set_text_content(Some(COSMETIC_CSS));
    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("document has no head"))?;
    head.append_child(&style)?;
    Ok(())
}

/// Install the agent into the current page. Called once per page load by the
/// content script; a second call is rejected.
#[wasm_bindgen]
pub fn install() -> Result<(), JsValue> {
    let already = INSTALLED.with(|slot| slot.borrow().is_some());
    if already {
        return Err(JsValue::from_str("Already installed. Reload the page to reinstall."));
    }

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let agent = Rc::new(RefCell::new(Agent::new(
        AgentConfig::default(),
        WasmClock,
        RuntimeSink::new(),
    )));
    let page = Rc::new(RefCell::new(DomPage::new(document.clone())));

    if inject_style(&document).is_err() {
        agent
            .borrow()
            .report(LogLevel::Error, "Failed to inject cosmetic styles");
    }
    agent.borrow().announce();

    let poll_interval_ms = agent.borrow().config().poll_interval_ms as i32;

    // Both drivers share one closure; a driver firing while a cycle holds the
    // borrow is simply dropped, mirroring the agent's own re-entry guard.
    let cycle = {
        let agent = Rc::clone(&agent);
        let page = Rc::clone(&page);
        Closure::<dyn FnMut()>::new(move || {
            if let (Ok(mut agent), Ok(mut page)) = (agent.try_borrow_mut(), page.try_borrow_mut())
            {
                agent.cycle(&mut *page);
            }
        })
    };

    let interval_id = window
        .set_interval_with_callback_and_timeout_and_arguments_0(
            cycle.as_ref().unchecked_ref(),
            poll_interval_ms,
        )?;

    let observer = MutationObserver::new(cycle.as_ref().unchecked_ref())?;
    let observer_init = MutationObserverInit::new();
    observer_init.set_child_list(true);
    observer_init.set_subtree(true);
    if let Some(body) = document.body() {
        observer.observe_with_options(&body, &observer_init)?;
    }

    // Early-pause hook: autoplay blocks land as pause events near t=0.
    if let Some(video) = document.query_selector(PLAYER_SELECTOR).ok().flatten() {
        let on_pause = {
            let agent = Rc::clone(&agent);
            let page = Rc::clone(&page);
            Closure::<dyn FnMut()>::new(move || {
                if let (Ok(mut agent), Ok(page)) = (agent.try_borrow_mut(), page.try_borrow()) {
                    agent.on_media_pause(&*page);
                }
            })
        };
        video.add_event_listener_with_callback("pause", on_pause.as_ref().unchecked_ref())?;
        on_pause.forget();
    }

    // Tear the drivers down on navigation so no timer outlives the page.
    let teardown = {
        let window = window.clone();
        Closure::<dyn FnMut()>::new(move || {
            window.clear_interval_with_handle(interval_id);
            observer.disconnect();
            INSTALLED.with(|slot| slot.borrow_mut().take());
        })
    };
    window.add_event_listener_with_callback("pagehide", teardown.as_ref().unchecked_ref())?;
    teardown.forget();

    cycle.forget();
    INSTALLED.with(|slot| *slot.borrow_mut() = Some(agent));
    Ok(())
}

#[wasm_bindgen]
pub fn is_installed() -> bool {
    INSTALLED.with(|slot| slot.borrow().is_some())
}

/// Current action counters and sequence phase, for the app-side UI.
#[wasm_bindgen]
pub fn get_stats() -> JsValue {
    let result = js_sys::Object::new();
    let snapshot = INSTALLED.with(|slot| {
        slot.borrow().as_ref().and_then(|agent| {
            agent
                .try_borrow()
                .ok()
                .map(|agent| (agent.stats(), agent.phase()))
        })
    });
    if let Some((stats, phase)) = snapshot {
        let phase = match phase {
            AdState::Content => "content",
            AdState::InAd => "in_ad",
            AdState::Transitioning => "transitioning",
        };
        let _ = js_sys::Reflect::set(&result, &"installed".into(), &JsValue::from(true));
        let _ = js_sys::Reflect::set(&result, &"phase".into(), &phase.into());
        // u64 crosses as BigInt; counters go over as plain JS numbers.
        let _ = js_sys::Reflect::set(&result, &"skipped".into(), &JsValue::from(stats.skipped as f64));
        let _ = js_sys::Reflect::set(
            &result,
            &"fastForwarded".into(),
            &JsValue::from(stats.fast_forwarded as f64),
        );
        let _ = js_sys::Reflect::set(
            &result,
            &"transitionSkips".into(),
            &JsValue::from(stats.transition_skips as f64),
        );
        let _ = js_sys::Reflect::set(
            &result,
            &"midRollsBlocked".into(),
            &JsValue::from(stats.mid_rolls_blocked as f64),
        );
    } else {
        let _ = js_sys::Reflect::set(&result, &"installed".into(), &JsValue::from(false));
    }
    result.into()
}
