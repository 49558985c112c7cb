/// Platform capabilities that change how content is blocked and resumed

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub is_ios: bool,
    pub is_android: bool,
    /// Host can intercept play requests before playback starts
    pub play_middleware: bool,
}

impl Capabilities {
    pub fn desktop() -> Self {
        Capabilities {
            is_ios: false,
            is_android: false,
            play_middleware: true,
        }
    }

    pub fn ios() -> Self {
        Capabilities {
            is_ios: true,
            is_android: false,
            play_middleware: false,
        }
    }

    pub fn android() -> Self {
        Capabilities {
            is_ios: false,
            is_android: true,
            play_middleware: false,
        }
    }

    /// Whether content can keep decoding muted underneath an ad.
    pub fn background_decode(&self) -> bool {
        !self.is_ios && !self.is_android
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::desktop()
    }
}
