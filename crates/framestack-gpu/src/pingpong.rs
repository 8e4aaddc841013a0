//! Ping-pong render targets.
//!
//! Each shader pass reads the composite from the current buffer and writes
//! into the other one, then the roles swap. A pass never samples the
//! framebuffer it renders into.

use crate::backend::FramebufferId;

/// Which of a clip's two framebuffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Buffer {
    #[default]
    A,
    B,
}

impl Buffer {
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// A clip's framebuffer pair plus which one holds the current composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPong {
    fbos: [FramebufferId; 2],
    current: Buffer,
    swaps: u32,
}

impl PingPong {
    /// Start with buffer A holding the composite.
    pub fn new(fbos: [FramebufferId; 2]) -> Self {
        Self {
            fbos,
            current: Buffer::A,
            swaps: 0,
        }
    }

    pub fn current(&self) -> Buffer {
        self.current
    }

    pub fn current_fbo(&self) -> FramebufferId {
        self.fbos[self.current.index()]
    }

    /// The buffer the next pass writes into.
    pub fn next_fbo(&self) -> FramebufferId {
        self.fbos[self.current.other().index()]
    }

    pub fn fbo(&self, buffer: Buffer) -> FramebufferId {
        self.fbos[buffer.index()]
    }

    /// Make the buffer just written the current one.
    pub fn swap(&mut self) {
        self.current = self.current.other();
        self.swaps += 1;
    }

    /// Number of swaps since creation.
    pub fn swaps(&self) -> u32 {
        self.swaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_is_involution() {
        assert_eq!(Buffer::A.other(), Buffer::B);
        assert_eq!(Buffer::B.other().other(), Buffer::B);
    }

    #[test]
    fn test_swaps_alternate() {
        let (a, b) = (FramebufferId(10), FramebufferId(11));
        let mut pp = PingPong::new([a, b]);
        for n in 0..5u32 {
            let (read, write) = (pp.current_fbo(), pp.next_fbo());
            assert_ne!(read, write);
            assert_eq!(read, if n % 2 == 0 { a } else { b });
            pp.swap();
            assert_eq!(pp.current_fbo(), write);
        }
        assert_eq!(pp.swaps(), 5);
        assert_eq!(pp.current(), Buffer::B);
    }
}
