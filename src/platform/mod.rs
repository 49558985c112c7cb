//! Host collaborator surface: the playback runtime and its platform
//!
//! The session never touches a media element directly. Everything it reads or
//! changes goes through `MediaHost`, which keeps the decision logic testable
//! against `MemoryMediaHost`.

pub mod device;
pub mod media;

pub use device::Capabilities;
pub use media::{MediaHost, MemoryMediaHost, SourceId, TrackId};

/// True when the host reports unbounded content duration.
pub fn has_unbounded_duration(host: &dyn MediaHost) -> bool {
    matches!(host.duration(), Some(d) if d.is_infinite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_duration_detection() {
        let mut h = MemoryMediaHost::with_source("vod", 30.0);
        assert!(!has_unbounded_duration(&h));
        h.set_duration(Some(f64::INFINITY));
        assert!(has_unbounded_duration(&h));
        h.set_duration(None);
        assert!(!has_unbounded_duration(&h));
    }
}
