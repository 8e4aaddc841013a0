//! Per-call compose parameters.

use framestack_gpu::FramebufferId;
use framestack_media::OpenMode;
use std::fmt;
use uuid::Uuid;

/// Which tracks a pass looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Video,
    Audio,
}

impl PassKind {
    pub fn is_video(self) -> bool {
        matches!(self, Self::Video)
    }
}

/// Interactive preview or final render. Decides whether clips are opened
/// in the background or on the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Preview,
    Final,
}

impl RenderMode {
    pub fn is_final(self) -> bool {
        matches!(self, Self::Final)
    }

    pub fn open_mode(self) -> OpenMode {
        OpenMode::for_render(self.is_final())
    }
}

/// A nesting clip being composed further up the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ancestor {
    /// Sequence that owns the nesting clip.
    pub sequence: Uuid,
    pub clip: Uuid,
    /// Framebuffer the nested sequence is composed into. None on audio passes.
    pub target: Option<FramebufferId>,
}

/// The chain of nesting clips above the sequence being composed, innermost
/// last. Each recursion extends its parent's chain on the stack; nothing is
/// pushed or popped.
#[derive(Clone, Copy, Default)]
pub struct AncestorChain<'a> {
    link: Option<(&'a AncestorChain<'a>, Ancestor)>,
}

impl<'a> AncestorChain<'a> {
    /// The empty chain of a top-level compose.
    pub const fn root() -> Self {
        Self { link: None }
    }

    pub fn extend(&self, ancestor: Ancestor) -> AncestorChain<'_> {
        AncestorChain {
            link: Some((self, ancestor)),
        }
    }

    pub fn is_root(&self) -> bool {
        self.link.is_none()
    }

    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    /// The innermost ancestor.
    pub fn last(&self) -> Option<&Ancestor> {
        self.link.as_ref().map(|(_, ancestor)| ancestor)
    }

    /// Ancestors from innermost to outermost.
    pub fn iter(&self) -> Ancestors<'_> {
        Ancestors { chain: Some(self) }
    }

    /// Whether a sequence is being composed anywhere above.
    pub fn contains_sequence(&self, sequence: Uuid) -> bool {
        self.iter().any(|a| a.sequence == sequence)
    }
}

impl fmt::Debug for AncestorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct Ancestors<'a> {
    chain: Option<&'a AncestorChain<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Ancestor;

    fn next(&mut self) -> Option<Self::Item> {
        let (parent, ancestor) = self.chain?.link.as_ref()?;
        self.chain = Some(*parent);
        Some(ancestor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ancestor(sequence: Uuid) -> Ancestor {
        Ancestor {
            sequence,
            clip: Uuid::new_v4(),
            target: None,
        }
    }

    #[test]
    fn test_chain_extends_without_mutation() {
        let (outer, inner) = (Uuid::new_v4(), Uuid::new_v4());
        let root = AncestorChain::root();
        let one = root.extend(ancestor(outer));
        let two = one.extend(ancestor(inner));

        assert!(root.is_root());
        assert_eq!(one.depth(), 1);
        assert_eq!(two.depth(), 2);
        assert_eq!(two.last().map(|a| a.sequence), Some(inner));
        assert!(two.contains_sequence(outer));
        assert!(!one.contains_sequence(inner));
        let order: Vec<_> = two.iter().map(|a| a.sequence).collect();
        assert_eq!(order, vec![inner, outer]);
    }

    #[test]
    fn test_render_mode_open_mode() {
        assert_eq!(RenderMode::Final.open_mode(), OpenMode::Blocking);
        assert_eq!(RenderMode::Preview.open_mode(), OpenMode::Background);
    }
}
