//! Ad-break state machine.
//!
//! The machine owns the active `AdBreakState` and the session's single
//! snapshot. Everything else it touches (host, flags, timers, gate) is lent to
//! it per call through `Ctx`, so each event runs to completion synchronously
//! and nothing outside can mutate state or snapshot behind its back.
//!
//! An event is only acted on when the current state declares it meaningful.
//! Late or duplicate signals (an `adsready` after the preroll wait already
//! timed out, a second `endLinearAdMode`) fall through to the catch-all arm
//! and are dropped.

use crate::clock::{TimerQueue, TimerToken};
use crate::event::{AdEvent, HostSignal};
use crate::flags::SessionFlags;
use crate::gate::{PlayBlockGate, PlayDecision};
use crate::platform::MediaHost;
use crate::snapshot::{CaptureOptions, PlaybackSnapshot, RestoreOutcome, SnapshotStore};
use crate::state::{AdBreakState, BreakKind, StateKind};
use crate::{AdsSettings, Result};
use log::{debug, warn};
use std::fmt;
use std::time::Duration;

/// Everything a transition may touch besides the machine itself.
pub(crate) struct Ctx<'a> {
    pub host: &'a mut dyn MediaHost,
    pub flags: &'a mut SessionFlags,
    pub timers: &'a mut TimerQueue,
    pub gate: &'a PlayBlockGate,
    pub settings: &'a AdsSettings,
    pub now: Duration,
    pub live: bool,
    pub keep_content_behind: bool,
    pub stitched: bool,
}

impl Ctx<'_> {
    fn trace(&self, args: fmt::Arguments<'_>) {
        if self.settings.debug {
            debug!("ADS: {}", args);
        }
    }

    fn schedule(&mut self, delay: Duration) -> TimerToken {
        self.timers.schedule(self.now, delay)
    }
}

#[derive(Debug)]
pub struct AdBreakMachine {
    state: AdBreakState,
    snapshots: SnapshotStore,
    // stitched ads and content kept behind the ad never take a snapshot
    capture_skipped: bool,
    last_break: Option<BreakKind>,
}

impl Default for AdBreakMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl AdBreakMachine {
    pub fn new() -> Self {
        AdBreakMachine {
            state: AdBreakState::initial(),
            snapshots: SnapshotStore::new(),
            capture_skipped: false,
            last_break: None,
        }
    }

    pub fn state(&self) -> &AdBreakState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.snapshots.get()
    }

    pub fn last_break(&self) -> Option<BreakKind> {
        self.last_break
    }

    pub fn snapshot_store(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Unconditional return to the initial state for new content.
    pub(crate) fn reset(&mut self, ctx: &mut Ctx<'_>) {
        if let Some(t) = self.state.timer() {
            ctx.timers.cancel(t);
        }
        if self.snapshots.discard() {
            ctx.trace(format_args!("discarded unresolved snapshot on reset"));
        }
        self.capture_skipped = false;
        self.last_break = None;
        self.state = if ctx.stitched {
            AdBreakState::ContentPlayback
        } else {
            AdBreakState::initial()
        };
        ctx.trace(format_args!("reset to {}", self.state.kind()));
    }

    pub(crate) fn handle(&mut self, event: AdEvent, ctx: &mut Ctx<'_>) -> Result<()> {
        use AdEvent::*;

        match (self.state.kind(), event) {
            (StateKind::BeforePreroll | StateKind::Preroll | StateKind::PostrollWait, Play) => {
                self.note_play_intent(ctx);
                if ctx.gate.cancel_started_play(true, ctx.flags, &mut *ctx.host) {
                    ctx.trace(format_args!("paused content play while waiting for ads"));
                }
                Ok(())
            }
            (StateKind::BeforePreroll, AdsReady) => {
                self.transition(AdBreakState::Preroll { timer: None }, ctx)
            }
            (
                StateKind::BeforePreroll | StateKind::Preroll,
                NoPreroll | AdsError | AdsCanceled | AdSkip | AdTimeout,
            ) => {
                ctx.trace(format_args!("no preroll after {}", event));
                self.transition(AdBreakState::ContentPlayback, ctx)
            }
            (StateKind::AdBreak, AdsError) => {
                ctx.trace(format_args!("ad error during ad break, ending it"));
                self.end_ad_break(ctx)
            }
            (StateKind::AdBreak, AdStarted) => {
                ctx.trace(format_args!("linear ad started"));
                Ok(())
            }
            (StateKind::ContentResuming, Playing | ContentResumed) => {
                self.transition(AdBreakState::ContentPlayback, ctx)
            }
            (StateKind::ContentPlayback, ContentEnding | ReadyForPostroll) => {
                if ctx.stitched || ctx.flags.no_postroll_seen || ctx.flags.content_has_ended {
                    self.transition(AdBreakState::Ended, ctx)
                } else {
                    self.transition(AdBreakState::PostrollWait { timer: None }, ctx)
                }
            }
            (
                StateKind::PostrollWait,
                NoPostroll | AdsError | AdsCanceled | AdSkip | AdTimeout,
            ) => {
                ctx.trace(format_args!("no postroll after {}", event));
                self.transition(AdBreakState::Ended, ctx)
            }
            // replayed to the end again; postroll chances are spent
            (StateKind::Ended, ContentEnding) => {
                ctx.host.signal(HostSignal::ContentEnded);
                Ok(())
            }
            (state, event) => {
                ctx.trace(format_args!("{} ignored in {}", event, state));
                Ok(())
            }
        }
    }

    /// Middleware-style play interception.
    pub(crate) fn request_play(&mut self, ctx: &mut Ctx<'_>) -> PlayDecision {
        if !self.state.blocks_play() {
            return PlayDecision::Proceed;
        }
        self.note_play_intent(ctx);
        let decision = ctx.gate.intercept(true, ctx.flags);
        if decision == PlayDecision::Deferred {
            ctx.trace(format_args!("deferred content play in {}", self.state.kind()));
        }
        decision
    }

    pub(crate) fn on_timer(&mut self, token: TimerToken, ctx: &mut Ctx<'_>) -> Result<()> {
        if self.state.timer() != Some(token) {
            ctx.trace(format_args!(
                "stale timer {} ignored in {}",
                token.generation(),
                self.state.kind()
            ));
            return Ok(());
        }
        // already fired, so there is nothing left to cancel on exit
        if let Some(slot) = self.state.timer_slot() {
            *slot = None;
        }

        match self.state.kind() {
            StateKind::BeforePreroll | StateKind::Preroll => {
                ctx.trace(format_args!("timed out waiting for preroll"));
                ctx.host.signal(HostSignal::AdTimeout);
                self.transition(AdBreakState::ContentPlayback, ctx)
            }
            StateKind::PostrollWait => {
                ctx.trace(format_args!("timed out waiting for postroll"));
                ctx.host.signal(HostSignal::AdTimeout);
                self.transition(AdBreakState::Ended, ctx)
            }
            StateKind::ContentResuming => {
                warn!("ADS: content did not confirm playback after the ad break, resuming anyway");
                self.transition(AdBreakState::ContentPlayback, ctx)
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn begin_ad_break(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let kind = match self.state.kind() {
            StateKind::AdBreak => {
                ctx.trace(format_args!("startLinearAdMode while already in an ad break"));
                return Ok(());
            }
            StateKind::Preroll => BreakKind::Preroll,
            StateKind::ContentPlayback => BreakKind::Midroll,
            StateKind::PostrollWait => BreakKind::Postroll,
            other => {
                warn!("ADS: Unexpected startLinearAdMode invocation ({})", other);
                return Ok(());
            }
        };
        self.enter_ad_break(kind, ctx)
    }

    pub(crate) fn end_ad_break(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let kind = match self.state {
            AdBreakState::AdBreak { kind } => kind,
            _ => {
                warn!(
                    "ADS: Unexpected endLinearAdMode invocation ({})",
                    self.state.kind()
                );
                return Ok(());
            }
        };

        ctx.host.signal(HostSignal::AdEnd);
        self.transition(AdBreakState::ContentResuming { kind, timer: None }, ctx)?;
        let outcome = self.resume_content(ctx)?;

        if kind == BreakKind::Postroll {
            return self.transition(AdBreakState::Ended, ctx);
        }
        match outcome {
            // wait for `playing` / `contentresumed` to confirm, but not forever
            Some(RestoreOutcome::Resumed) => {
                let delay = ctx.settings.resume_wait();
                let token = ctx.schedule(delay);
                if let Some(slot) = self.state.timer_slot() {
                    *slot = Some(token);
                }
                Ok(())
            }
            Some(_) => self.transition(AdBreakState::ContentPlayback, ctx),
            None => {
                // content never left the element
                if self.capture_skipped {
                    ctx.host.signal(HostSignal::ContentResumed);
                }
                self.transition(AdBreakState::ContentPlayback, ctx)
            }
        }
    }

    pub(crate) fn skip_ad_break(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let next = match self.state.kind() {
            StateKind::Preroll => AdBreakState::ContentPlayback,
            StateKind::PostrollWait => AdBreakState::Ended,
            other => {
                ctx.trace(format_args!("skipLinearAdMode ignored in {}", other));
                return Ok(());
            }
        };
        ctx.host.signal(HostSignal::AdSkip);
        self.transition(next, ctx)
    }

    fn enter_ad_break(&mut self, kind: BreakKind, ctx: &mut Ctx<'_>) -> Result<()> {
        if ctx.stitched || ctx.keep_content_behind {
            // content keeps running under the ad, so a held play goes through now
            self.capture_skipped = true;
            ctx.gate.release(ctx.flags, &mut *ctx.host);
        } else {
            let opts = CaptureOptions {
                play_pending: ctx.flags.cancelled_play,
                live: ctx.live,
                ended: kind == BreakKind::Postroll,
            };
            self.snapshots.capture(&*ctx.host, opts)?;
            self.capture_skipped = false;
            ctx.gate.hand_off(ctx.flags);
        }

        self.last_break = Some(kind);
        self.transition(AdBreakState::AdBreak { kind }, ctx)?;
        ctx.host.signal(HostSignal::AdStart);
        Ok(())
    }

    /// `None` when there was nothing to restore.
    fn resume_content(&mut self, ctx: &mut Ctx<'_>) -> Result<Option<RestoreOutcome>> {
        if self.capture_skipped {
            return Ok(None);
        }
        if ctx.flags.disable_next_snapshot_restore {
            ctx.flags.disable_next_snapshot_restore = false;
            self.snapshots.discard();
            ctx.trace(format_args!("snapshot restore disabled for this break"));
            return Ok(None);
        }
        let outcome = self.snapshots.restore(&mut *ctx.host, false)?;
        ctx.trace(format_args!("snapshot restore: {:?}", outcome));
        Ok(Some(outcome))
    }

    /// Start the wait that a play request kicks off in a pending state.
    fn note_play_intent(&mut self, ctx: &mut Ctx<'_>) {
        let delay = match self.state {
            AdBreakState::BeforePreroll { timer: None } => ctx.settings.ad_request_wait(),
            AdBreakState::Preroll { timer: None } => {
                ctx.host.signal(HostSignal::ReadyForPreroll);
                ctx.settings.preroll_wait()
            }
            _ => return,
        };
        let token = ctx.schedule(delay);
        if let Some(slot) = self.state.timer_slot() {
            *slot = Some(token);
        }
    }

    fn transition(&mut self, next: AdBreakState, ctx: &mut Ctx<'_>) -> Result<()> {
        let prev = std::mem::replace(&mut self.state, next);
        if let Some(t) = prev.timer() {
            ctx.timers.cancel(t);
        }
        ctx.trace(format_args!("{} -> {}", prev.kind(), self.state.kind()));
        self.enter(ctx);
        Ok(())
    }

    fn enter(&mut self, ctx: &mut Ctx<'_>) {
        match self.state.kind() {
            StateKind::Preroll => {
                if ctx.flags.play_requested {
                    self.note_play_intent(ctx);
                }
            }
            StateKind::ContentPlayback => {
                self.snapshots.discard();
                if ctx.gate.release(ctx.flags, &mut *ctx.host) {
                    ctx.trace(format_args!("replayed deferred content play"));
                }
            }
            StateKind::PostrollWait => {
                ctx.flags.content_ending = true;
                let delay = ctx.settings.postroll_wait();
                let token = ctx.schedule(delay);
                if let Some(slot) = self.state.timer_slot() {
                    *slot = Some(token);
                }
                ctx.host.signal(HostSignal::ReadyForPostroll);
            }
            StateKind::Ended => {
                self.snapshots.discard();
                ctx.flags.content_ending = false;
                ctx.flags.content_has_ended = true;
                ctx.host.signal(HostSignal::ContentEnded);
                ctx.gate.release(ctx.flags, &mut *ctx.host);
            }
            StateKind::BeforePreroll | StateKind::AdBreak | StateKind::ContentResuming => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::PlayBlockStrategy;
    use crate::platform::MemoryMediaHost;

    struct Rig {
        host: MemoryMediaHost,
        flags: SessionFlags,
        timers: TimerQueue,
        gate: PlayBlockGate,
        settings: AdsSettings,
        now: Duration,
    }

    impl Rig {
        fn new() -> Self {
            Rig {
                host: MemoryMediaHost::with_source("movie", 600.0),
                flags: SessionFlags::default(),
                timers: TimerQueue::new(),
                gate: PlayBlockGate::new(PlayBlockStrategy::Middleware),
                settings: AdsSettings::default(),
                now: Duration::ZERO,
            }
        }

        fn ctx(&mut self) -> Ctx<'_> {
            Ctx {
                host: &mut self.host,
                flags: &mut self.flags,
                timers: &mut self.timers,
                gate: &self.gate,
                settings: &self.settings,
                now: self.now,
                live: false,
                keep_content_behind: false,
                stitched: false,
            }
        }
    }

    #[test]
    fn stale_token_is_ignored() {
        let mut rig = Rig::new();
        let mut m = AdBreakMachine::new();
        rig.flags.play_requested = true;
        m.handle(AdEvent::Play, &mut rig.ctx()).unwrap();
        let first = m.state().timer().expect("preroll wait started");

        m.handle(AdEvent::AdsReady, &mut rig.ctx()).unwrap();
        let second = m.state().timer().expect("preroll timer started");
        assert_ne!(first, second);
        assert!(!rig.timers.is_pending(first));

        m.on_timer(first, &mut rig.ctx()).unwrap();
        assert_eq!(m.state().kind(), StateKind::Preroll);
        assert_eq!(rig.host.count_signal(HostSignal::AdTimeout), 0);

        m.on_timer(second, &mut rig.ctx()).unwrap();
        assert_eq!(m.state().kind(), StateKind::ContentPlayback);
        assert_eq!(rig.host.count_signal(HostSignal::AdTimeout), 1);
    }

    #[test]
    fn leaving_a_state_cancels_its_timer() {
        let mut rig = Rig::new();
        let mut m = AdBreakMachine::new();
        m.handle(AdEvent::NoPreroll, &mut rig.ctx()).unwrap();
        m.handle(AdEvent::ContentEnding, &mut rig.ctx()).unwrap();
        let token = m.state().timer().expect("postroll wait started");
        assert!(rig.timers.is_pending(token));

        m.handle(AdEvent::NoPostroll, &mut rig.ctx()).unwrap();
        assert_eq!(m.state().kind(), StateKind::Ended);
        assert!(rig.timers.is_empty());
    }

    #[test]
    fn second_capture_during_a_break_is_rejected() {
        let mut rig = Rig::new();
        let mut m = AdBreakMachine::new();
        m.handle(AdEvent::NoPreroll, &mut rig.ctx()).unwrap();
        m.begin_ad_break(&mut rig.ctx()).unwrap();
        // a second capture while the first is live is a logic error
        let err = m.snapshots.capture(&rig.host, CaptureOptions::default()).unwrap_err();
        assert!(matches!(err, crate::Error::InvariantViolation(_)));
    }

    #[test]
    fn ended_content_skips_the_postroll_wait() {
        let mut rig = Rig::new();
        let mut m = AdBreakMachine::new();
        m.handle(AdEvent::NoPreroll, &mut rig.ctx()).unwrap();
        rig.flags.content_has_ended = true;
        m.handle(AdEvent::ContentEnding, &mut rig.ctx()).unwrap();
        assert_eq!(m.state().kind(), StateKind::Ended);
        assert!(rig.timers.is_empty());
        assert_eq!(rig.host.count_signal(HostSignal::ReadyForPostroll), 0);
    }
}
