//! Ad-break lifecycle coordination
//!
//! Decides, from a stream of playback and ad-provider events, when content
//! playback must be held back, when an ad break is active, when content must
//! resume, and how to put the content back exactly where it was, all within a
//! single shared playback session (one media element, one timeline).
//!
//! # Overview
//!
//! - **Session facade** ([`AdSession`]): the verbs an ad integration calls
//!   (`begin_ad_break`, `end_ad_break`, `skip_ad_break`) and the read-only
//!   ad-mode queries
//! - **State machine** ([`machine`], [`state`]): a closed set of states that
//!   drops every event the current state does not care about
//! - **Snapshots** ([`snapshot`]): capture/restore of source, position, volume
//!   and track selection around a break
//! - **Play blocking** ([`gate`]): holds content play back while an ad decision
//!   is pending
//! - **Host surface** ([`platform`]): the `MediaHost` trait the playback
//!   runtime implements
//!
//! # Example
//!
//! ```
//! use adbreak::{AdEvent, AdSession, AdsSettings, ManualClock, MemoryMediaHost, StateKind};
//!
//! # fn main() -> adbreak::Result<()> {
//! let host = MemoryMediaHost::with_source("movie.mp4", 600.0);
//! let clock = ManualClock::new();
//! let mut session = AdSession::new(AdsSettings::default(), host, clock.clone())?;
//!
//! session.handle_event(AdEvent::Play)?;
//! session.handle_event(AdEvent::AdsReady)?;
//! session.begin_ad_break()?;
//! assert!(session.in_ad_break());
//!
//! session.end_ad_break()?;
//! session.handle_event(AdEvent::Playing)?;
//! assert_eq!(session.state(), StateKind::ContentPlayback);
//! # Ok(())
//! # }
//! ```

use serde::Deserialize;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod clock;
pub mod event;
pub mod flags;
pub mod gate;
pub mod machine;
pub mod platform;
pub mod session;
pub mod snapshot;
pub mod state;

// Worker-thread owned session with an async facade
pub mod async_api;

pub use async_api::SessionWorker;
pub use clock::{Clock, ManualClock, SystemClock, TimerQueue, TimerToken};
pub use event::{AdEvent, HostSignal};
pub use flags::SessionFlags;
pub use gate::{PlayBlockGate, PlayBlockStrategy, PlayDecision};
pub use platform::{Capabilities, MediaHost, MemoryMediaHost, SourceId, TrackId};
pub use session::{AdSession, SessionStatus};
pub use snapshot::{PlaybackSnapshot, RestoreOutcome};
pub use state::{AdBreakState, BreakKind, StateKind};

/// Recognized session options.
///
/// Field names follow the camelCase spelling ad integrations already use, so
/// a JSON options blob can be handed to [`AdsSettings::from_json`] directly.
///
/// # Examples
///
/// ```
/// let cfg = adbreak::AdsSettings::default();
/// assert_eq!(cfg.timeout, 5000);
/// assert_eq!(cfg.preroll_wait().as_millis(), 5000);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdsSettings {
    /// Max ms to wait for `adsready` once play has been requested
    pub timeout: u64,
    /// Max ms to wait for a preroll to start once ads are ready
    pub preroll_timeout: Option<u64>,
    /// Max ms to wait for a postroll to start once content reached its end
    pub postroll_timeout: Option<u64>,
    /// Ads are part of the content stream: no snapshots, no play blocking
    pub stitched_ads: bool,
    /// Force live detection instead of inferring it from duration
    pub content_is_live: Option<bool>,
    /// Verbose transition logging
    pub debug: bool,
    /// Override the play-blocking strategy picked from host capabilities
    pub play_block: Option<PlayBlockStrategy>,
    /// Ms after creation to complain if no `loadstart` was seen (0 disables)
    pub loadstart_watchdog: u64,
}

impl Default for AdsSettings {
    fn default() -> Self {
        Self {
            timeout: 5000,
            preroll_timeout: None,
            postroll_timeout: None,
            stitched_ads: false,
            content_is_live: None,
            debug: false,
            play_block: None,
            loadstart_watchdog: 5000,
        }
    }
}

impl AdsSettings {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: AdsSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout == 0 {
            return Err(Error::ConfigError("timeout must be greater than zero".into()));
        }
        if self.preroll_timeout == Some(0) || self.postroll_timeout == Some(0) {
            return Err(Error::ConfigError(
                "prerollTimeout/postrollTimeout must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }

    /// Wait for the provider to answer after play was requested
    pub fn ad_request_wait(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    pub fn preroll_wait(&self) -> Duration {
        Duration::from_millis(self.preroll_timeout.unwrap_or(self.timeout))
    }

    pub fn postroll_wait(&self) -> Duration {
        Duration::from_millis(self.postroll_timeout.unwrap_or(self.timeout))
    }

    /// How long a resumed break waits for content to confirm playback
    pub fn resume_wait(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

/// Create a session on the wall clock.
pub fn new_session<H: MediaHost>(settings: AdsSettings, host: H) -> Result<AdSession<H>> {
    AdSession::new(settings, host, SystemClock::new())
}
