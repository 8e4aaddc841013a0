//! Built-in transition implementations.
//!
//! Transitions act on a single clip. Each reads [`EffectContext::presence`]
//! so the same processor plays in as an opening transition and out as a
//! closing one.
//!
//! [`EffectContext::presence`]: crate::effect::EffectContext::presence

mod cross_dissolve;
mod dip_to_black;
mod iris;
mod push;
mod wipe;

pub use cross_dissolve::CrossDissolve;
pub use dip_to_black::DipToBlack;
pub use iris::{Iris, IrisShape};
pub use push::Push;
pub use wipe::Wipe;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Direction a wipe edge or a pushed clip travels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Left, Self::Right, Self::Up, Self::Down];

    /// Look up by keyframed field value.
    pub fn from_index(index: f32) -> Self {
        let i = index.round();
        if i < 0.0 {
            return Self::default();
        }
        Self::ALL
            .get(i as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Unit vector in clip space, y down.
    pub fn unit(self) -> Vec2 {
        match self {
            Self::Left => Vec2::NEG_X,
            Self::Right => Vec2::X,
            Self::Up => Vec2::NEG_Y,
            Self::Down => Vec2::Y,
        }
    }
}
