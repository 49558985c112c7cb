//! Event vocabulary: what the host tells the session, and what the session
//! tells the host back.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inbound lifecycle and ad-provider signals.
///
/// Each is a plain named signal; nothing beyond the name is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdEvent {
    LoadStart,
    LoadedData,
    LoadedMetadata,
    ContentChanged,
    Play,
    Playing,
    ContentEnding,
    AdsReady,
    AdsCanceled,
    AdSkip,
    AdsError,
    AdTimeout,
    AdStarted,
    ContentResumed,
    ReadyForPostroll,
    NoPreroll,
    NoPostroll,
}

impl AdEvent {
    pub const ALL: [AdEvent; 17] = [
        AdEvent::LoadStart,
        AdEvent::LoadedData,
        AdEvent::LoadedMetadata,
        AdEvent::ContentChanged,
        AdEvent::Play,
        AdEvent::Playing,
        AdEvent::ContentEnding,
        AdEvent::AdsReady,
        AdEvent::AdsCanceled,
        AdEvent::AdSkip,
        AdEvent::AdsError,
        AdEvent::AdTimeout,
        AdEvent::AdStarted,
        AdEvent::ContentResumed,
        AdEvent::ReadyForPostroll,
        AdEvent::NoPreroll,
        AdEvent::NoPostroll,
    ];

    /// Canonical wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            AdEvent::LoadStart => "loadstart",
            AdEvent::LoadedData => "loadeddata",
            AdEvent::LoadedMetadata => "loadedmetadata",
            AdEvent::ContentChanged => "contentchanged",
            AdEvent::Play => "play",
            AdEvent::Playing => "playing",
            AdEvent::ContentEnding => "content-ending",
            AdEvent::AdsReady => "adsready",
            AdEvent::AdsCanceled => "adscanceled",
            AdEvent::AdSkip => "adskip",
            AdEvent::AdsError => "adserror",
            AdEvent::AdTimeout => "adtimeout",
            AdEvent::AdStarted => "ads-ad-started",
            AdEvent::ContentResumed => "contentresumed",
            AdEvent::ReadyForPostroll => "readyforpostroll",
            AdEvent::NoPreroll => "nopreroll",
            AdEvent::NoPostroll => "nopostroll",
        }
    }
}

impl fmt::Display for AdEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AdEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            // aliases first
            "ended" => return Ok(AdEvent::ContentEnding),
            "ad-started" => return Ok(AdEvent::AdStarted),
            _ => {}
        }
        AdEvent::ALL
            .iter()
            .copied()
            .find(|e| e.name() == s)
            .ok_or_else(|| Error::UnknownEvent(s.to_string()))
    }
}

/// Outbound signals the session raises on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostSignal {
    ReadyForPreroll,
    ReadyForPostroll,
    AdStart,
    AdEnd,
    AdSkip,
    AdTimeout,
    ContentResumed,
    ContentEnded,
}

impl HostSignal {
    pub fn name(&self) -> &'static str {
        match self {
            HostSignal::ReadyForPreroll => "readyforpreroll",
            HostSignal::ReadyForPostroll => "readyforpostroll",
            HostSignal::AdStart => "adstart",
            HostSignal::AdEnd => "adend",
            HostSignal::AdSkip => "adskip",
            HostSignal::AdTimeout => "adtimeout",
            HostSignal::ContentResumed => "contentresumed",
            HostSignal::ContentEnded => "ended",
        }
    }
}

impl fmt::Display for HostSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for ev in AdEvent::ALL {
            assert_eq!(ev.name().parse::<AdEvent>().unwrap(), ev);
        }
    }

    #[test]
    fn aliases_are_accepted() {
        assert_eq!("ended".parse::<AdEvent>().unwrap(), AdEvent::ContentEnding);
        assert_eq!("ad-started".parse::<AdEvent>().unwrap(), AdEvent::AdStarted);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = "adsbogus".parse::<AdEvent>().unwrap_err();
        assert_eq!(err, Error::UnknownEvent("adsbogus".into()));
    }
}
