//! LRU cache of decoded frames under a memory budget.

use framestack_core::{FrameNumber, SharedFrameBuffer};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// A decoded frame of one clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub clip: Uuid,
    /// Frame index in the footage's own rate.
    pub frame: FrameNumber,
}

impl FrameKey {
    pub fn new(clip: Uuid, frame: FrameNumber) -> Self {
        Self { clip, frame }
    }
}

/// Decoded frames, evicted least recently used first once the budget is
/// exceeded.
pub struct FrameCache {
    entries: HashMap<FrameKey, SharedFrameBuffer>,
    memory_used: usize,
    max_memory: usize,
    /// Most recently used last.
    lru_order: VecDeque<FrameKey>,
}

impl FrameCache {
    pub fn new(max_memory: usize) -> Self {
        Self {
            entries: HashMap::new(),
            memory_used: 0,
            max_memory,
            lru_order: VecDeque::new(),
        }
    }

    pub fn contains(&self, key: &FrameKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Fetch a frame and mark it most recently used.
    pub fn get(&mut self, key: &FrameKey) -> Option<SharedFrameBuffer> {
        let frame = self.entries.get(key)?.clone();
        self.touch(key);
        Some(frame)
    }

    /// Insert a frame, evicting old frames until it fits. A frame larger
    /// than the whole budget is still kept, alone.
    pub fn insert(&mut self, key: FrameKey, frame: SharedFrameBuffer) {
        self.remove(&key);
        let size = frame.memory_size();

        while self.memory_used + size > self.max_memory {
            let Some(oldest) = self.lru_order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.memory_used -= evicted.memory_size();
            }
        }

        self.memory_used += size;
        self.lru_order.push_back(key);
        self.entries.insert(key, frame);
    }

    pub fn remove(&mut self, key: &FrameKey) -> Option<SharedFrameBuffer> {
        let frame = self.entries.remove(key)?;
        self.memory_used -= frame.memory_size();
        self.lru_order.retain(|k| k != key);
        Some(frame)
    }

    /// Drop every frame of `clip`. Returns how many were dropped.
    pub fn remove_clip(&mut self, clip: Uuid) -> usize {
        let before = self.entries.len();
        let mut freed = 0;
        self.entries.retain(|key, frame| {
            let keep = key.clip != clip;
            if !keep {
                freed += frame.memory_size();
            }
            keep
        });
        self.lru_order.retain(|key| key.clip != clip);
        self.memory_used -= freed;
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.memory_used
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru_order.clear();
        self.memory_used = 0;
    }

    fn touch(&mut self, key: &FrameKey) {
        if let Some(pos) = self.lru_order.iter().position(|k| k == key) {
            self.lru_order.remove(pos);
        }
        self.lru_order.push_back(*key);
    }
}
