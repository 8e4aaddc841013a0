//! Single-producer single-consumer sample queue between the mixer and the
//! output callback. No locks; positions are atomics.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct RingBuffer {
    slots: Box<[UnsafeCell<f32>]>,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
}

// SAFETY: one thread writes and one reads. Each only touches the slots on
// its side of the positions, which are published with release/acquire.
#[allow(unsafe_code)]
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// A buffer holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        // One spare slot tells full from empty
        let slots = (0..capacity + 1).map(|_| UnsafeCell::new(0.0)).collect();
        Self {
            slots,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn available_read(&self) -> usize {
        let w = self.write_pos.load(Ordering::Acquire);
        let r = self.read_pos.load(Ordering::Acquire);
        (w + self.slots.len() - r) % self.slots.len()
    }

    pub fn available_write(&self) -> usize {
        self.capacity() - self.available_read()
    }

    /// Append as many samples as fit. Returns how many were written.
    pub fn write(&self, data: &[f32]) -> usize {
        let count = data.len().min(self.available_write());
        let w = self.write_pos.load(Ordering::Relaxed);
        for (i, &sample) in data[..count].iter().enumerate() {
            let slot = &self.slots[(w + i) % self.slots.len()];
            // SAFETY: slots between write_pos and read_pos belong to the writer
            #[allow(unsafe_code)]
            unsafe {
                *slot.get() = sample;
            }
        }
        self.write_pos
            .store((w + count) % self.slots.len(), Ordering::Release);
        count
    }

    /// Pop up to `output.len()` samples. Returns how many were read.
    pub fn read(&self, output: &mut [f32]) -> usize {
        let count = output.len().min(self.available_read());
        let r = self.read_pos.load(Ordering::Relaxed);
        for (i, out) in output[..count].iter_mut().enumerate() {
            let slot = &self.slots[(r + i) % self.slots.len()];
            // SAFETY: slots between read_pos and write_pos belong to the reader
            #[allow(unsafe_code)]
            unsafe {
                *out = *slot.get();
            }
        }
        self.read_pos
            .store((r + count) % self.slots.len(), Ordering::Release);
        count
    }

    /// Discard everything queued. Reader side only.
    pub fn clear(&self) {
        self.read_pos
            .store(self.write_pos.load(Ordering::Acquire), Ordering::Release);
    }
}
