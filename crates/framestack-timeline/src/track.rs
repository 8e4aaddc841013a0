//! Track indices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed track number. Video tracks are negative, audio tracks are zero
/// or positive. Lower indices are further back: `-3` is drawn beneath
/// `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackIndex(pub i32);

impl TrackIndex {
    /// The `n`th video track counting from 1 (`V1` is `-1`).
    pub const fn video(n: i32) -> Self {
        Self(-n.abs())
    }

    /// The `n`th audio track counting from 1 (`A1` is `0`).
    pub const fn audio(n: i32) -> Self {
        Self(n.abs() - 1)
    }

    pub const fn is_video(self) -> bool {
        self.0 < 0
    }

    pub const fn is_audio(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for TrackIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_video() {
            write!(f, "V{}", -self.0)
        } else {
            write!(f, "A{}", self.0 + 1)
        }
    }
}
