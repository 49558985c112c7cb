//! Content snapshot capture and restore.
//!
//! A snapshot is taken right before an ad break takes over the shared media
//! element and is consumed when content comes back. The store holds at most
//! one snapshot; a second capture while one is unresolved is a logic error.

use crate::platform::{has_unbounded_duration, MediaHost, SourceId, TrackId};
use crate::{Error, Result};
use serde::Serialize;

/// Observable playback state of the content at the moment an ad break began.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub source_id: SourceId,
    /// Host probe value for the attached media; see `should_force_reapply`
    pub media_resource: Option<String>,
    pub position: f64,
    /// Content intent: false when content was playing or a play was deferred
    pub paused: bool,
    pub muted: bool,
    pub volume: f64,
    pub active_track: Option<TrackId>,
    pub live: bool,
    /// Content sat at its end boundary; restoring never resumes it
    pub ended: bool,
}

/// How the store should interpret the host state it captures.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    /// A play the gate deferred; the snapshot then records content as
    /// playing so the restore carries the play out
    pub play_pending: bool,
    pub live: bool,
    pub ended: bool,
}

/// What `restore` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The content was replaced during the break; nothing was re-applied
    SourceReplaced,
    /// State re-applied, content left paused
    Restored,
    /// State re-applied and playback requested
    Resumed,
}

/// Read the host's current playback state. Does not touch the host.
pub fn capture(host: &dyn MediaHost) -> Result<PlaybackSnapshot> {
    let source_id = host.source_id().ok_or_else(|| {
        Error::HostInconsistency("cannot snapshot a session with no content source".into())
    })?;

    Ok(PlaybackSnapshot {
        source_id,
        media_resource: host.media_resource(),
        position: host.current_time(),
        paused: host.paused(),
        muted: host.muted(),
        volume: host.volume(),
        active_track: host.active_track(),
        live: has_unbounded_duration(host),
        ended: false,
    })
}

/// The content identity is unchanged but the media element no longer holds
/// the content resource, so it has to be loaded again before seeking.
pub fn should_force_reapply(host: &dyn MediaHost, snapshot: &PlaybackSnapshot) -> bool {
    host.source_id().as_ref() == Some(&snapshot.source_id)
        && host.media_resource() != snapshot.media_resource
}

/// Re-apply `snapshot` to the host.
pub fn restore(host: &mut dyn MediaHost, snapshot: &PlaybackSnapshot, force: bool) -> RestoreOutcome {
    let same_source = host.source_id().as_ref() == Some(&snapshot.source_id);
    if !same_source && !force {
        return RestoreOutcome::SourceReplaced;
    }

    if force || should_force_reapply(host, snapshot) {
        host.load_source(&snapshot.source_id);
    }

    // live edge moves during the break; seeking back would replay stale content
    if !snapshot.live {
        host.seek(snapshot.position);
    }
    host.set_volume(snapshot.volume);
    host.set_muted(snapshot.muted);
    host.select_track(snapshot.active_track.as_ref());

    if snapshot.paused || snapshot.ended {
        RestoreOutcome::Restored
    } else {
        host.play();
        RestoreOutcome::Resumed
    }
}

/// Owner of the single live snapshot of a session.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Option<PlaybackSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the host state for a new ad break.
    pub fn capture(
        &mut self,
        host: &dyn MediaHost,
        opts: CaptureOptions,
    ) -> Result<&PlaybackSnapshot> {
        if self.current.is_some() {
            return Err(Error::InvariantViolation(
                "ad break entered while a previous snapshot is unresolved".into(),
            ));
        }
        let mut snap = capture(host)?;
        snap.paused = snap.paused && !opts.play_pending;
        snap.live = opts.live;
        snap.ended = opts.ended;
        Ok(&*self.current.insert(snap))
    }

    /// Consume the live snapshot and re-apply it.
    pub fn restore(&mut self, host: &mut dyn MediaHost, force: bool) -> Result<RestoreOutcome> {
        let snap = self.current.take().ok_or_else(|| {
            Error::InvariantViolation("restore requested with no captured snapshot".into())
        })?;
        Ok(restore(host, &snap, force))
    }

    pub fn should_force_reapply(&self, host: &dyn MediaHost) -> Result<bool> {
        let snap = self.current.as_ref().ok_or_else(|| {
            Error::HostInconsistency("recycle check requested with no snapshot present".into())
        })?;
        Ok(should_force_reapply(host, snap))
    }

    /// Drop the live snapshot without applying it. Returns whether one existed.
    pub fn discard(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn get(&self) -> Option<&PlaybackSnapshot> {
        self.current.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.current.is_some()
    }
}
