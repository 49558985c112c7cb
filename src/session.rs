//! Session facade: the control surface an ad integration and a host runtime
//! talk to.
//!
//! The facade owns the host, the clock, the timer queue and the
//! `SessionFlags`, and lends them to the state machine one event at a time.

use crate::clock::{Clock, SystemClock, TimerQueue, TimerToken};
use crate::event::AdEvent;
use crate::flags::SessionFlags;
use crate::gate::{PlayBlockGate, PlayBlockStrategy, PlayDecision};
use crate::machine::{AdBreakMachine, Ctx};
use crate::platform::{has_unbounded_duration, MediaHost, SourceId};
use crate::snapshot::PlaybackSnapshot;
use crate::state::{BreakKind, StateKind};
use crate::{AdsSettings, Result};
use log::error;
use serde::Serialize;
use std::time::Duration;

/// Read-only view of the session, suitable for logging or serializing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub state: StateKind,
    pub ad_mode: bool,
    pub in_ad_break: bool,
    pub waiting_for_ad_break: bool,
    pub content_resuming: bool,
    pub live: bool,
    pub current_break: Option<BreakKind>,
}

pub struct AdSession<H: MediaHost, C: Clock = SystemClock> {
    settings: AdsSettings,
    host: H,
    clock: C,
    timers: TimerQueue,
    machine: AdBreakMachine,
    flags: SessionFlags,
    gate: PlayBlockGate,
    stitched: bool,
    has_seen_loadstart: bool,
    content_source: Option<SourceId>,
    watchdog: Option<TimerToken>,
}

impl<H: MediaHost, C: Clock> AdSession<H, C> {
    pub fn new(settings: AdsSettings, host: H, clock: C) -> Result<Self> {
        settings.validate()?;

        let strategy = settings
            .play_block
            .unwrap_or_else(|| PlayBlockStrategy::for_capabilities(&host.capabilities()));
        let mut timers = TimerQueue::new();
        let watchdog = (settings.loadstart_watchdog > 0).then(|| {
            timers.schedule(clock.now(), Duration::from_millis(settings.loadstart_watchdog))
        });

        let mut session = AdSession {
            stitched: settings.stitched_ads,
            content_source: host.source_id(),
            settings,
            host,
            clock,
            timers,
            machine: AdBreakMachine::new(),
            flags: SessionFlags::default(),
            gate: PlayBlockGate::new(strategy),
            has_seen_loadstart: false,
            watchdog,
        };
        if session.stitched {
            session.dispatch(|m, ctx| m.reset(ctx));
        }
        Ok(session)
    }

    /// Feed one inbound event through the session.
    pub fn handle_event(&mut self, event: AdEvent) -> Result<()> {
        match event {
            AdEvent::LoadStart => return self.on_loadstart(),
            AdEvent::ContentChanged => return self.content_changed(),
            AdEvent::LoadedData => self.flags.has_seen_loaded_data = true,
            AdEvent::LoadedMetadata => self.flags.has_seen_loaded_metadata = true,
            AdEvent::Play => self.flags.play_requested = true,
            AdEvent::Playing => {
                if !self.machine.state().blocks_play() {
                    self.flags.cancelled_play = false;
                    self.flags.paused_on_content_update = false;
                    self.flags.paused_for_block = false;
                }
            }
            AdEvent::NoPreroll => {
                self.trace("Received nopreroll event");
                self.flags.no_preroll_seen = true;
            }
            AdEvent::NoPostroll => {
                self.trace("Received nopostroll event");
                self.flags.no_postroll_seen = true;
            }
            _ => {}
        }
        self.dispatch(|m, ctx| m.handle(event, ctx))
    }

    pub fn handle_event_name(&mut self, name: &str) -> Result<()> {
        let event: AdEvent = name.parse()?;
        self.handle_event(event)
    }

    /// Ask permission before starting content playback (middleware hook).
    pub fn request_play(&mut self) -> PlayDecision {
        self.flags.play_requested = true;
        self.dispatch(|m, ctx| m.request_play(ctx))
    }

    /// Fire every timer that is due on the session clock. Returns how many
    /// fired, stale ones included.
    pub fn poll_timers(&mut self) -> Result<usize> {
        let mut fired = 0;
        loop {
            let due = self.timers.take_due(self.clock.now());
            if due.is_empty() {
                return Ok(fired);
            }
            for token in due {
                fired += 1;
                if self.watchdog == Some(token) {
                    self.watchdog = None;
                    self.check_loadstart_seen();
                    continue;
                }
                self.dispatch(|m, ctx| m.on_timer(token, ctx))?;
            }
        }
    }

    /// Deadline of the next pending timer on the session clock.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// How long until the next timer is due, zero if one is overdue.
    pub fn time_until_next_timer(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.next_deadline().map(|d| d.saturating_sub(now))
    }

    /// startLinearAdMode
    pub fn begin_ad_break(&mut self) -> Result<()> {
        self.dispatch(|m, ctx| m.begin_ad_break(ctx))
    }

    /// endLinearAdMode
    pub fn end_ad_break(&mut self) -> Result<()> {
        self.dispatch(|m, ctx| m.end_ad_break(ctx))?;
        self.detect_content_change()
    }

    /// skipLinearAdMode
    pub fn skip_ad_break(&mut self) -> Result<()> {
        self.dispatch(|m, ctx| m.skip_ad_break(ctx))
    }

    /// Forget everything learned about the current content. Idempotent.
    pub fn reset(&mut self) {
        self.flags.reset();
        self.dispatch(|m, ctx| m.reset(ctx));
        self.content_source = self.host.source_id();
    }

    pub fn is_ad_mode(&self) -> bool {
        self.machine.state().is_ad_state()
    }

    pub fn in_ad_break(&self) -> bool {
        self.machine.state().in_ad_break()
    }

    pub fn is_waiting_for_ad_break(&self) -> bool {
        self.machine
            .state()
            .is_waiting_for_ad_break(self.flags.play_requested)
    }

    pub fn is_content_resuming(&self) -> bool {
        self.machine.state().is_content_resuming()
    }

    pub fn is_live(&self) -> bool {
        self.settings
            .content_is_live
            .unwrap_or_else(|| has_unbounded_duration(&self.host))
    }

    /// Content can keep decoding silently underneath the ad, so there is
    /// nothing to snapshot or restore.
    pub fn should_keep_content_behind_ad(&self) -> bool {
        self.host.capabilities().background_decode() && has_unbounded_duration(&self.host)
    }

    /// Whether the media element was recycled since the snapshot was taken.
    pub fn media_recycled(&self) -> Result<bool> {
        if self.should_keep_content_behind_ad() {
            return Ok(false);
        }
        self.machine.snapshot_store().should_force_reapply(&self.host)
    }

    /// Skip the restore at the end of the next ad break.
    pub fn disable_next_snapshot_restore(&mut self) {
        self.flags.disable_next_snapshot_restore = true;
    }

    pub fn set_stitched_ads(&mut self, stitched: bool) {
        self.stitched = stitched;
    }

    pub fn stitched_ads(&self) -> bool {
        self.stitched
    }

    pub fn state(&self) -> StateKind {
        self.machine.state().kind()
    }

    /// Estimate of the kind of the current or most recent break.
    pub fn current_break(&self) -> Option<BreakKind> {
        self.machine.last_break()
    }

    pub fn snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.machine.snapshot()
    }

    pub fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    pub fn settings(&self) -> &AdsSettings {
        &self.settings
    }

    pub fn play_block_strategy(&self) -> PlayBlockStrategy {
        self.gate.strategy()
    }

    pub fn has_seen_loadstart(&self) -> bool {
        self.has_seen_loadstart
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state(),
            ad_mode: self.is_ad_mode(),
            in_ad_break: self.in_ad_break(),
            waiting_for_ad_break: self.is_waiting_for_ad_break(),
            content_resuming: self.is_content_resuming(),
            live: self.is_live(),
            current_break: self.current_break(),
        }
    }

    fn on_loadstart(&mut self) -> Result<()> {
        self.has_seen_loadstart = true;
        self.detect_content_change()
    }

    /// Compare the host's content identity with the last one seen and reset
    /// on a switch. Skipped while a break occupies the element; the switch is
    /// picked up once the break is over.
    fn detect_content_change(&mut self) -> Result<()> {
        if self.in_ad_break() || self.is_content_resuming() {
            return Ok(());
        }
        let current = self.host.source_id();
        if current == self.content_source {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.content_source, current);
        if previous.is_some() {
            self.trace("content source changed");
            return self.content_changed();
        }
        Ok(())
    }

    fn content_changed(&mut self) -> Result<()> {
        // an ad playing in the shared element is not a content play to carry over
        let was_playing = !self.host.paused() && !self.is_ad_mode();
        self.reset();
        if was_playing && !self.stitched {
            // new content is held back like a user play until ads are decided
            self.host.pause();
            self.flags.paused_on_content_update = true;
            self.flags.paused_for_block = true;
            self.flags.play_requested = true;
            self.dispatch(|m, ctx| m.handle(AdEvent::Play, ctx))?;
        }
        Ok(())
    }

    fn check_loadstart_seen(&self) {
        if !self.has_seen_loadstart && self.host.source_id().is_some() {
            error!(
                "ADS: no loadstart event seen {} ms after the session was created, but a source \
                 is present. The session was attached too late; some ads will not play and some \
                 media events will be incorrect.",
                self.settings.loadstart_watchdog
            );
        }
    }

    fn trace(&self, msg: &str) {
        if self.settings.debug {
            log::debug!("ADS: {}", msg);
        }
    }

    fn dispatch<R>(&mut self, f: impl FnOnce(&mut AdBreakMachine, &mut Ctx<'_>) -> R) -> R {
        let now = self.clock.now();
        let live = self.is_live();
        let keep_content_behind = self.should_keep_content_behind_ad();
        let stitched = self.stitched;
        let AdSession {
            machine,
            host,
            flags,
            timers,
            gate,
            settings,
            ..
        } = self;
        let mut ctx = Ctx {
            host,
            flags,
            timers,
            gate,
            settings,
            now,
            live,
            keep_content_behind,
            stitched,
        };
        f(machine, &mut ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::HostSignal;
    use crate::platform::{Capabilities, MemoryMediaHost};

    fn session() -> (AdSession<MemoryMediaHost, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let host = MemoryMediaHost::with_source("movie", 600.0);
        let s = AdSession::new(AdsSettings::default(), host, clock.clone()).unwrap();
        (s, clock)
    }

    #[test]
    fn begin_twice_is_the_same_as_once() {
        let (mut s, _) = session();
        s.handle_event(AdEvent::Play).unwrap();
        s.handle_event(AdEvent::AdsReady).unwrap();
        s.begin_ad_break().unwrap();
        let snap = s.snapshot().cloned();
        let signals = s.host().signals().len();

        s.begin_ad_break().unwrap();
        assert!(s.in_ad_break());
        assert_eq!(s.snapshot().cloned(), snap);
        assert_eq!(s.host().signals().len(), signals);
    }

    #[test]
    fn end_outside_ad_break_changes_nothing() {
        let (mut s, _) = session();
        for _ in 0..2 {
            s.end_ad_break().unwrap();
            assert_eq!(s.state(), StateKind::BeforePreroll);
        }
        s.handle_event(AdEvent::NoPreroll).unwrap();
        s.end_ad_break().unwrap();
        assert_eq!(s.state(), StateKind::ContentPlayback);
    }

    #[test]
    fn reset_is_idempotent() {
        let (mut s, _) = session();
        s.handle_event(AdEvent::Play).unwrap();
        s.handle_event(AdEvent::AdsReady).unwrap();
        s.begin_ad_break().unwrap();

        s.reset();
        let after_once = (s.status(), s.flags().clone());
        s.reset();
        assert_eq!((s.status(), s.flags().clone()), after_once);
        assert_eq!(s.state(), StateKind::BeforePreroll);
        assert!(s.snapshot().is_none());
    }

    #[test]
    fn live_override_wins_over_duration() {
        let clock = ManualClock::new();
        let mut host = MemoryMediaHost::with_source("live", 0.0);
        host.set_duration(Some(f64::INFINITY));
        let settings = AdsSettings {
            content_is_live: Some(false),
            ..Default::default()
        };
        let s = AdSession::new(settings, host, clock).unwrap();
        assert!(!s.is_live());
        assert!(s.should_keep_content_behind_ad());
    }

    #[test]
    fn keep_behind_needs_background_decode() {
        let clock = ManualClock::new();
        let mut host = MemoryMediaHost::with_source("live", 0.0).with_capabilities(Capabilities::ios());
        host.set_duration(Some(f64::INFINITY));
        let s = AdSession::new(AdsSettings::default(), host, clock).unwrap();
        assert!(s.is_live());
        assert!(!s.should_keep_content_behind_ad());
        assert_eq!(s.play_block_strategy(), PlayBlockStrategy::ReactiveCancel);
    }

    #[test]
    fn media_recycled_without_snapshot_is_an_error() {
        let (s, _) = session();
        assert!(matches!(
            s.media_recycled(),
            Err(crate::Error::HostInconsistency(_))
        ));
    }

    #[test]
    fn media_recycled_detects_ad_creative() {
        let (mut s, _) = session();
        s.handle_event(AdEvent::Play).unwrap();
        s.handle_event(AdEvent::AdsReady).unwrap();
        s.begin_ad_break().unwrap();
        assert!(!s.media_recycled().unwrap());
        s.host_mut().attach_media("ad.mp4", 15.0);
        assert!(s.media_recycled().unwrap());
    }

    #[test]
    fn loadstart_with_new_source_resets_the_session() {
        let (mut s, _) = session();
        s.handle_event(AdEvent::LoadStart).unwrap();
        s.handle_event(AdEvent::NoPreroll).unwrap();
        assert_eq!(s.state(), StateKind::ContentPlayback);

        s.host_mut().set_content("episode-2", 1200.0);
        s.handle_event(AdEvent::LoadStart).unwrap();
        assert_eq!(s.state(), StateKind::BeforePreroll);
        assert!(!s.flags().no_preroll_seen);
    }

    #[test]
    fn content_change_while_playing_carries_the_play_over() {
        let (mut s, clock) = session();
        s.handle_event(AdEvent::NoPreroll).unwrap();
        s.host_mut().play();

        s.host_mut().set_content("episode-2", 1200.0);
        s.handle_event(AdEvent::ContentChanged).unwrap();
        assert!(s.host().paused());
        assert!(s.flags().paused_on_content_update);
        assert!(s.is_waiting_for_ad_break());

        clock.advance_ms(5000);
        s.poll_timers().unwrap();
        assert_eq!(s.state(), StateKind::ContentPlayback);
        assert!(!s.host().paused());
        assert_eq!(s.host().count_signal(HostSignal::AdTimeout), 1);
    }

    #[test]
    fn watchdog_fires_once_and_is_not_a_state_timer() {
        let (mut s, clock) = session();
        clock.advance_ms(5000);
        assert_eq!(s.poll_timers().unwrap(), 1);
        assert_eq!(s.state(), StateKind::BeforePreroll);
        assert_eq!(s.poll_timers().unwrap(), 0);
    }

    #[test]
    fn status_serializes_in_camel_case() {
        let (s, _) = session();
        let json = serde_json::to_value(s.status()).unwrap();
        assert_eq!(json["state"], "BeforePreroll");
        assert_eq!(json["adMode"], false);
        assert_eq!(json["currentBreak"], serde_json::Value::Null);
    }
}
