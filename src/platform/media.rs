/// Host media runtime hooks and an in-memory host for tests and replays

use super::Capabilities;
use crate::event::HostSignal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of a piece of content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        SourceId(id.into())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a selectable text/audio track
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub String);

/// What the session needs from the host playback runtime.
///
/// `source_id` is the logical content identity and only changes when the
/// content itself changes. `media_resource` is whatever the host currently
/// has attached to its media element (an ad creative during a break); it is
/// the probe used to detect a recycled element.
pub trait MediaHost: Send {
    fn source_id(&self) -> Option<SourceId>;
    fn media_resource(&self) -> Option<String>;
    fn current_time(&self) -> f64;
    /// `None` when unknown, `Some(f64::INFINITY)` for unbounded content
    fn duration(&self) -> Option<f64>;
    fn paused(&self) -> bool;
    fn muted(&self) -> bool;
    fn volume(&self) -> f64;
    fn active_track(&self) -> Option<TrackId>;
    fn capabilities(&self) -> Capabilities;

    fn load_source(&mut self, source: &SourceId);
    fn seek(&mut self, position: f64);
    fn set_muted(&mut self, muted: bool);
    fn set_volume(&mut self, volume: f64);
    fn select_track(&mut self, track: Option<&TrackId>);
    fn play(&mut self);
    fn pause(&mut self);

    /// Raise an outbound signal on the host
    fn signal(&mut self, signal: HostSignal);
}

/// Host implementation that keeps everything in memory and records what the
/// session asked of it.
#[derive(Debug, Clone)]
pub struct MemoryMediaHost {
    source: Option<SourceId>,
    resource: Option<String>,
    position: f64,
    duration: Option<f64>,
    paused: bool,
    muted: bool,
    volume: f64,
    track: Option<TrackId>,
    caps: Capabilities,
    signals: Vec<HostSignal>,
    play_calls: usize,
    pause_calls: usize,
    loads: Vec<SourceId>,
}

impl MemoryMediaHost {
    pub fn new() -> Self {
        MemoryMediaHost {
            source: None,
            resource: None,
            position: 0.0,
            duration: None,
            paused: true,
            muted: false,
            volume: 1.0,
            track: None,
            caps: Capabilities::default(),
            signals: Vec::new(),
            play_calls: 0,
            pause_calls: 0,
            loads: Vec::new(),
        }
    }

    /// A host with `id` loaded as both content and media resource
    pub fn with_source(id: &str, duration: f64) -> Self {
        let mut h = Self::new();
        h.set_content(id, duration);
        h
    }

    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Switch to new content, as a user navigating to another video would.
    pub fn set_content(&mut self, id: &str, duration: f64) {
        self.source = Some(SourceId::new(id));
        self.resource = Some(id.to_string());
        self.duration = Some(duration);
        self.position = 0.0;
    }

    /// Attach a different media resource (an ad creative) without changing
    /// the content identity.
    pub fn attach_media(&mut self, resource: &str, duration: f64) {
        self.resource = Some(resource.to_string());
        self.duration = Some(duration);
        self.position = 0.0;
        self.track = None;
    }

    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn signals(&self) -> &[HostSignal] {
        &self.signals
    }

    pub fn take_signals(&mut self) -> Vec<HostSignal> {
        std::mem::take(&mut self.signals)
    }

    pub fn count_signal(&self, signal: HostSignal) -> usize {
        self.signals.iter().filter(|s| **s == signal).count()
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.pause_calls
    }

    pub fn loads(&self) -> &[SourceId] {
        &self.loads
    }
}

impl Default for MemoryMediaHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaHost for MemoryMediaHost {
    fn source_id(&self) -> Option<SourceId> {
        self.source.clone()
    }

    fn media_resource(&self) -> Option<String> {
        self.resource.clone()
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn active_track(&self) -> Option<TrackId> {
        self.track.clone()
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn load_source(&mut self, source: &SourceId) {
        self.resource = Some(source.0.clone());
        self.position = 0.0;
        self.loads.push(source.clone());
    }

    fn seek(&mut self, position: f64) {
        self.position = position;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn select_track(&mut self, track: Option<&TrackId>) {
        self.track = track.cloned();
    }

    fn play(&mut self) {
        self.play_calls += 1;
        self.paused = false;
    }

    fn pause(&mut self) {
        self.pause_calls += 1;
        self.paused = true;
    }

    fn signal(&mut self, signal: HostSignal) {
        self.signals.push(signal);
    }
}
