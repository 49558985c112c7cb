/// Facts observed during the lifetime of the current content source.
///
/// These feed transition guards; none of them decides which state the
/// machine is in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFlags {
    /// Content reached its end boundary, postroll handling not finished yet
    pub content_ending: bool,
    /// Content officially ended at least once; stays set across replays
    pub content_has_ended: bool,
    /// Play was requested for this source, by the user or programmatically
    pub play_requested: bool,
    /// The gate held back a play that still has to be carried out
    pub cancelled_play: bool,
    /// Content was playing when its source changed; the play carries over
    pub paused_on_content_update: bool,
    /// The gate paused the host itself (as opposed to a user pause)
    pub paused_for_block: bool,
    pub no_preroll_seen: bool,
    pub no_postroll_seen: bool,
    pub disable_next_snapshot_restore: bool,
    pub has_seen_loaded_data: bool,
    pub has_seen_loaded_metadata: bool,
}

impl SessionFlags {
    pub fn reset(&mut self) {
        *self = SessionFlags::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_everything() {
        let mut f = SessionFlags {
            content_ending: true,
            cancelled_play: true,
            no_postroll_seen: true,
            disable_next_snapshot_restore: true,
            ..Default::default()
        };
        f.reset();
        assert_eq!(f, SessionFlags::default());
    }
}
