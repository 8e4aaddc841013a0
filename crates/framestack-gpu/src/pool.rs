//! Reuse of pixel storage for software render targets.
//!
//! Clips allocate and release framebuffers as they open and close, almost
//! always at the same handful of sizes, so freed storage is kept keyed by
//! dimensions up to a memory budget.

use std::collections::HashMap;

/// One straight-alpha RGBA pixel.
pub type Pixel = [f32; 4];

const PIXEL_BYTES: usize = std::mem::size_of::<Pixel>();

/// Pool of reusable pixel buffers keyed by (width, height).
pub struct ImagePool {
    free: HashMap<(u32, u32), Vec<Vec<Pixel>>>,
    total_memory: usize,
    max_memory: usize,
}

impl ImagePool {
    pub fn new(max_memory: usize) -> Self {
        Self {
            free: HashMap::new(),
            total_memory: 0,
            max_memory,
        }
    }

    /// A zeroed buffer of `width * height` pixels.
    pub fn acquire(&mut self, width: u32, height: u32) -> Vec<Pixel> {
        if let Some(mut pixels) = self.free.get_mut(&(width, height)).and_then(Vec::pop) {
            self.total_memory -= pixels.len() * PIXEL_BYTES;
            pixels.fill([0.0; 4]);
            return pixels;
        }
        vec![[0.0; 4]; width as usize * height as usize]
    }

    /// Return a buffer. It is dropped if keeping it would exceed the budget.
    pub fn release(&mut self, width: u32, height: u32, pixels: Vec<Pixel>) {
        let mem = pixels.len() * PIXEL_BYTES;
        if self.total_memory + mem > self.max_memory {
            return;
        }
        self.total_memory += mem;
        self.free.entry((width, height)).or_default().push(pixels);
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn buffer_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.free.clear();
        self.total_memory = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_is_zeroed() {
        let mut pool = ImagePool::new(1024 * 1024);
        let mut pixels = pool.acquire(4, 4);
        pixels[3] = [1.0; 4];
        pool.release(4, 4, pixels);
        assert_eq!(pool.buffer_count(), 1);
        assert_eq!(pool.memory_usage(), 16 * PIXEL_BYTES);

        let again = pool.acquire(4, 4);
        assert!(again.iter().all(|p| *p == [0.0; 4]));
        assert_eq!(pool.buffer_count(), 0);
        assert_eq!(pool.memory_usage(), 0);
    }

    #[test]
    fn test_budget_drops_excess() {
        let mut pool = ImagePool::new(16 * PIXEL_BYTES);
        pool.release(4, 4, vec![[0.0; 4]; 16]);
        pool.release(4, 4, vec![[0.0; 4]; 16]);
        assert_eq!(pool.buffer_count(), 1);
        pool.clear();
        assert_eq!(pool.memory_usage(), 0);
    }
}
