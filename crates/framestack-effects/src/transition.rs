//! Transitions at the start and end of a clip.

use framestack_core::FrameNumber;

use crate::effect::{Effect, EffectProcessor};
use crate::transitions::{CrossDissolve, DipToBlack, Iris, Push, Wipe};

/// Progress of a transition `elapsed` frames in, or `None` outside
/// `0..length`. Zero-length transitions never apply.
pub fn transition_progress(elapsed: FrameNumber, length: FrameNumber) -> Option<f32> {
    if length <= 0 || elapsed < 0 || elapsed >= length {
        return None;
    }
    Some((elapsed as f64 / length as f64) as f32)
}

/// An effect played over the first or last `length` frames of a clip.
///
/// `overlap` is how far the transition reaches past the clip's own edge
/// into its neighbour; it widens the clip's transition-inclusive bounds.
#[derive(Debug, Clone)]
pub struct Transition {
    pub effect: Effect,
    length: FrameNumber,
    overlap: FrameNumber,
}

impl Transition {
    pub fn new(effect: Effect, length: FrameNumber) -> Self {
        Self {
            effect,
            length: length.max(0),
            overlap: 0,
        }
    }

    pub fn with_overlap(mut self, overlap: FrameNumber) -> Self {
        self.overlap = overlap.max(0);
        self
    }

    pub fn length(&self) -> FrameNumber {
        self.length
    }

    pub fn set_length(&mut self, length: FrameNumber) {
        self.length = length.max(0);
    }

    pub fn overlap(&self) -> FrameNumber {
        self.overlap
    }

    pub fn name(&self) -> &str {
        self.effect.name()
    }

    pub fn progress(&self, elapsed: FrameNumber) -> Option<f32> {
        transition_progress(elapsed, self.length)
    }
}

/// Registry of available transitions.
pub struct TransitionRegistry {
    transitions: Vec<Box<dyn EffectProcessor>>,
}

impl TransitionRegistry {
    /// Create a new registry with all built-in transitions.
    pub fn new() -> Self {
        let mut reg = Self {
            transitions: Vec::new(),
        };
        reg.register(Box::new(CrossDissolve));
        reg.register(Box::new(DipToBlack));
        reg.register(Box::new(Wipe));
        reg.register(Box::new(Iris));
        reg.register(Box::new(Push));
        reg
    }

    pub fn register(&mut self, transition: Box<dyn EffectProcessor>) {
        self.transitions.push(transition);
    }

    pub fn find(&self, name: &str) -> Option<&dyn EffectProcessor> {
        self.transitions
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// A new transition instance with default parameters.
    pub fn create(&self, name: &str, length: FrameNumber) -> Option<Transition> {
        self.find(name)
            .map(|t| Transition::new(Effect::from_boxed(t.clone_box()), length))
    }

    pub fn names(&self) -> Vec<&str> {
        self.transitions.iter().map(|t| t.name()).collect()
    }
}

impl Default for TransitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_edges() {
        assert_eq!(transition_progress(0, 10), Some(0.0));
        assert_eq!(transition_progress(5, 10), Some(0.5));
        assert!(transition_progress(9, 10).is_some_and(|p| p < 1.0));
        assert_eq!(transition_progress(10, 10), None);
        assert_eq!(transition_progress(-1, 10), None);
    }

    #[test]
    fn test_zero_length_never_applies() {
        assert_eq!(transition_progress(0, 0), None);
        let t = Transition::new(Effect::new(CrossDissolve), -4);
        assert_eq!(t.length(), 0);
        assert_eq!(t.progress(0), None);
    }

    #[test]
    fn test_registry() {
        let reg = TransitionRegistry::new();
        assert_eq!(
            reg.names(),
            vec!["Cross Dissolve", "Dip to Black", "Wipe", "Iris", "Push"]
        );
        let t = reg.create("Wipe", 12).unwrap().with_overlap(3);
        assert_eq!(t.name(), "Wipe");
        assert_eq!((t.length(), t.overlap()), (12, 3));
        assert!(reg.create("Nope", 12).is_none());
    }
}
