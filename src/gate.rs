//! Play-block gate: holds content playback back while an ad decision is
//! pending.
//!
//! Two integration styles are supported. With `Middleware` the host asks
//! before it starts playback and simply does not play on `Deferred`. With
//! `ReactiveCancel` the host cannot intercept, so playback starts and the gate
//! pauses it again as soon as the `play` event arrives. The gate never changes
//! the machine's state; it only keeps its own flags on `SessionFlags`.

use crate::flags::SessionFlags;
use crate::platform::{Capabilities, MediaHost};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayBlockStrategy {
    Middleware,
    ReactiveCancel,
}

impl PlayBlockStrategy {
    pub fn for_capabilities(caps: &Capabilities) -> Self {
        if caps.play_middleware {
            PlayBlockStrategy::Middleware
        } else {
            PlayBlockStrategy::ReactiveCancel
        }
    }
}

/// Answer to a play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayDecision {
    Proceed,
    Deferred,
}

#[derive(Debug, Clone, Copy)]
pub struct PlayBlockGate {
    strategy: PlayBlockStrategy,
}

impl PlayBlockGate {
    pub fn new(strategy: PlayBlockStrategy) -> Self {
        PlayBlockGate { strategy }
    }

    pub fn strategy(&self) -> PlayBlockStrategy {
        self.strategy
    }

    /// Middleware hook, called before the host starts playback.
    pub fn intercept(&self, blocking: bool, flags: &mut SessionFlags) -> PlayDecision {
        if blocking && self.strategy == PlayBlockStrategy::Middleware {
            flags.cancelled_play = true;
            PlayDecision::Deferred
        } else {
            PlayDecision::Proceed
        }
    }

    /// Reactive hook, called when a `play` event arrives while blocking.
    ///
    /// The play is recorded as deferred whatever the strategy. If playback
    /// actually started (no interception, or it slipped past the middleware)
    /// the host is paused again. Returns true when the gate paused the host.
    pub fn cancel_started_play(
        &self,
        blocking: bool,
        flags: &mut SessionFlags,
        host: &mut dyn MediaHost,
    ) -> bool {
        if !blocking {
            return false;
        }
        flags.cancelled_play = true;
        if host.paused() {
            return false;
        }
        host.pause();
        flags.paused_for_block = true;
        true
    }

    /// Carry out the one deferred play, if any. Returns true when replayed.
    pub fn release(&self, flags: &mut SessionFlags, host: &mut dyn MediaHost) -> bool {
        if !flags.cancelled_play {
            return false;
        }
        flags.cancelled_play = false;
        flags.paused_for_block = false;
        host.play();
        true
    }

    /// Hand the deferred play over to an ad break: it is realized by the
    /// snapshot restore instead of being replayed now.
    pub fn hand_off(&self, flags: &mut SessionFlags) -> bool {
        let pending = flags.cancelled_play;
        flags.cancelled_play = false;
        flags.paused_for_block = false;
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryMediaHost;

    #[test]
    fn middleware_defers_only_while_blocking() {
        let gate = PlayBlockGate::new(PlayBlockStrategy::Middleware);
        let mut flags = SessionFlags::default();
        assert_eq!(gate.intercept(false, &mut flags), PlayDecision::Proceed);
        assert!(!flags.cancelled_play);
        assert_eq!(gate.intercept(true, &mut flags), PlayDecision::Deferred);
        assert!(flags.cancelled_play);
    }

    #[test]
    fn reactive_gate_pauses_started_playback() {
        let gate = PlayBlockGate::new(PlayBlockStrategy::ReactiveCancel);
        let mut flags = SessionFlags::default();
        let mut host = MemoryMediaHost::with_source("movie", 60.0);
        host.play();

        assert_eq!(gate.intercept(true, &mut flags), PlayDecision::Proceed);
        assert!(gate.cancel_started_play(true, &mut flags, &mut host));
        assert!(host.paused());
        assert!(flags.cancelled_play);
        assert!(flags.paused_for_block);
    }

    #[test]
    fn play_event_under_middleware_records_without_pausing() {
        let gate = PlayBlockGate::new(PlayBlockStrategy::Middleware);
        let mut flags = SessionFlags::default();
        let mut host = MemoryMediaHost::with_source("movie", 60.0);

        assert!(!gate.cancel_started_play(true, &mut flags, &mut host));
        assert!(flags.cancelled_play);
        assert!(!flags.paused_for_block);
        assert_eq!(host.pause_calls(), 0);
    }

    #[test]
    fn nothing_is_recorded_when_not_blocking() {
        let gate = PlayBlockGate::new(PlayBlockStrategy::ReactiveCancel);
        let mut flags = SessionFlags::default();
        let mut host = MemoryMediaHost::with_source("movie", 60.0);
        host.play();
        assert!(!gate.cancel_started_play(false, &mut flags, &mut host));
        assert!(!flags.cancelled_play);
        assert!(!host.paused());
    }

    #[test]
    fn release_replays_exactly_once() {
        let gate = PlayBlockGate::new(PlayBlockStrategy::Middleware);
        let mut flags = SessionFlags::default();
        let mut host = MemoryMediaHost::with_source("movie", 60.0);
        gate.intercept(true, &mut flags);

        assert!(gate.release(&mut flags, &mut host));
        assert!(!gate.release(&mut flags, &mut host));
        assert_eq!(host.play_calls(), 1);
    }

    #[test]
    fn hand_off_clears_without_playing() {
        let gate = PlayBlockGate::new(PlayBlockStrategy::Middleware);
        let mut flags = SessionFlags::default();
        gate.intercept(true, &mut flags);
        assert!(gate.hand_off(&mut flags));
        assert!(!flags.cancelled_play);
        assert!(!gate.hand_off(&mut flags));
    }

    #[test]
    fn strategy_follows_capabilities() {
        assert_eq!(
            PlayBlockStrategy::for_capabilities(&Capabilities::desktop()),
            PlayBlockStrategy::Middleware
        );
        assert_eq!(
            PlayBlockStrategy::for_capabilities(&Capabilities::ios()),
            PlayBlockStrategy::ReactiveCancel
        );
    }
}
