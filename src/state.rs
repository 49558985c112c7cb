//! The closed set of ad-break states and the predicates derived from them.

use crate::clock::TimerToken;
use serde::Serialize;
use std::fmt;

/// Where in the content an ad break sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Preroll,
    Midroll,
    Postroll,
}

/// Active state of the machine, with whatever that state owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdBreakState {
    BeforePreroll { timer: Option<TimerToken> },
    Preroll { timer: Option<TimerToken> },
    AdBreak { kind: BreakKind },
    ContentResuming { kind: BreakKind, timer: Option<TimerToken> },
    ContentPlayback,
    PostrollWait { timer: Option<TimerToken> },
    Ended,
}

/// Data-less mirror of `AdBreakState`, for status queries and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StateKind {
    BeforePreroll,
    Preroll,
    AdBreak,
    ContentResuming,
    ContentPlayback,
    PostrollWait,
    Ended,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl AdBreakState {
    pub fn initial() -> Self {
        AdBreakState::BeforePreroll { timer: None }
    }

    pub fn kind(&self) -> StateKind {
        match self {
            AdBreakState::BeforePreroll { .. } => StateKind::BeforePreroll,
            AdBreakState::Preroll { .. } => StateKind::Preroll,
            AdBreakState::AdBreak { .. } => StateKind::AdBreak,
            AdBreakState::ContentResuming { .. } => StateKind::ContentResuming,
            AdBreakState::ContentPlayback => StateKind::ContentPlayback,
            AdBreakState::PostrollWait { .. } => StateKind::PostrollWait,
            AdBreakState::Ended => StateKind::Ended,
        }
    }

    /// Timer owned by this state, if it started one.
    pub fn timer(&self) -> Option<TimerToken> {
        match self {
            AdBreakState::BeforePreroll { timer }
            | AdBreakState::Preroll { timer }
            | AdBreakState::ContentResuming { timer, .. }
            | AdBreakState::PostrollWait { timer } => *timer,
            _ => None,
        }
    }

    pub(crate) fn timer_slot(&mut self) -> Option<&mut Option<TimerToken>> {
        match self {
            AdBreakState::BeforePreroll { timer }
            | AdBreakState::Preroll { timer }
            | AdBreakState::ContentResuming { timer, .. }
            | AdBreakState::PostrollWait { timer } => Some(timer),
            _ => None,
        }
    }

    /// Content playback is blocked by the ad lifecycle.
    pub fn is_ad_state(&self) -> bool {
        matches!(
            self.kind(),
            StateKind::Preroll
                | StateKind::AdBreak
                | StateKind::ContentResuming
                | StateKind::PostrollWait
        )
    }

    pub fn in_ad_break(&self) -> bool {
        self.kind() == StateKind::AdBreak
    }

    pub fn is_content_resuming(&self) -> bool {
        self.kind() == StateKind::ContentResuming
    }

    pub fn is_waiting_for_ad_break(&self, play_requested: bool) -> bool {
        match self.kind() {
            StateKind::BeforePreroll => play_requested,
            StateKind::Preroll | StateKind::PostrollWait => true,
            _ => false,
        }
    }

    /// An ad decision is outstanding, so content play must be held back.
    pub fn blocks_play(&self) -> bool {
        matches!(
            self.kind(),
            StateKind::BeforePreroll | StateKind::Preroll | StateKind::PostrollWait
        )
    }
}
