//! Decoded frames in CPU memory.
//!
//! Decoders hand frames to the compositor as [`SharedFrameBuffer`]s; the
//! graphics backend only ever uploads packed RGBA, so every format here can
//! be expanded with [`FrameBuffer::to_rgba8`].

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Pixel layout of a decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (32 bits per pixel)
    #[default]
    Rgba8,
    /// 8-bit BGRA, common for capture devices
    Bgra8,
    /// 8-bit grayscale
    Gray8,
    /// YUV 4:2:0 planar, BT.709 limited range
    Yuv420P,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, or 0 for planar.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Gray8 => 1,
            Self::Yuv420P => 0,
        }
    }

    pub fn plane_count(self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 | Self::Gray8 => 1,
            Self::Yuv420P => 3,
        }
    }
}

/// A plane of pixel data with stride information.
#[derive(Debug, Clone)]
pub struct FramePlane {
    pub data: Vec<u8>,
    /// Bytes per row, including padding
    pub stride: usize,
    pub width: u32,
    pub height: u32,
    bytes_per_pixel: usize,
}

impl FramePlane {
    /// Create a zeroed plane. Rows are padded to 64 bytes.
    pub fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Self {
        let min_stride = width as usize * bytes_per_pixel;
        let stride = (min_stride + 63) & !63;
        Self {
            data: vec![0u8; stride * height as usize],
            stride,
            width,
            height,
            bytes_per_pixel,
        }
    }

    /// Pixel bytes of row `y`, without padding.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.bytes_per_pixel]
    }

    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.width as usize * self.bytes_per_pixel;
        &mut self.data[start..start + len]
    }
}

/// A video frame in CPU memory.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// One plane for packed formats, Y/U/V for planar
    pub planes: SmallVec<[FramePlane; 3]>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let planes = match format {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => {
                smallvec::smallvec![FramePlane::new(width, height, 4)]
            }
            PixelFormat::Gray8 => smallvec::smallvec![FramePlane::new(width, height, 1)],
            PixelFormat::Yuv420P => {
                let (cw, ch) = (width.div_ceil(2), height.div_ceil(2));
                smallvec::smallvec![
                    FramePlane::new(width, height, 1),
                    FramePlane::new(cw, ch, 1),
                    FramePlane::new(cw, ch, 1),
                ]
            }
        };

        Self {
            format,
            width,
            height,
            planes,
        }
    }

    /// Build an RGBA frame from tightly packed pixels.
    pub fn from_rgba8(width: u32, height: u32, pixels: &[u8]) -> Self {
        let mut frame = Self::new(width, height, PixelFormat::Rgba8);
        let row_len = width as usize * 4;
        let plane = frame.primary_plane_mut();
        for (y, src) in pixels.chunks_exact(row_len).take(height as usize).enumerate() {
            plane.row_mut(y as u32).copy_from_slice(src);
        }
        frame
    }

    /// A frame filled with one RGBA colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut frame = Self::new(width, height, PixelFormat::Rgba8);
        let plane = frame.primary_plane_mut();
        for y in 0..height {
            for px in plane.row_mut(y).chunks_exact_mut(4) {
                px.copy_from_slice(&rgba);
            }
        }
        frame
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }

    #[inline]
    pub fn primary_plane(&self) -> &FramePlane {
        &self.planes[0]
    }

    #[inline]
    pub fn primary_plane_mut(&mut self) -> &mut FramePlane {
        &mut self.planes[0]
    }

    /// Expand to tightly packed RGBA8, `width * height * 4` bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            match self.format {
                PixelFormat::Rgba8 => out.extend_from_slice(self.planes[0].row(y)),
                PixelFormat::Bgra8 => {
                    for px in self.planes[0].row(y).chunks_exact(4) {
                        out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                    }
                }
                PixelFormat::Gray8 => {
                    for &v in self.planes[0].row(y) {
                        out.extend_from_slice(&[v, v, v, 255]);
                    }
                }
                PixelFormat::Yuv420P => {
                    let luma = self.planes[0].row(y);
                    let cb = self.planes[1].row(y / 2);
                    let cr = self.planes[2].row(y / 2);
                    for (x, &l) in luma.iter().enumerate() {
                        let [r, g, b] = ycbcr_to_rgb(l, cb[x / 2], cr[x / 2]);
                        out.extend_from_slice(&[r, g, b, 255]);
                    }
                }
            }
        }
        out
    }

    /// Create a test pattern frame (eight vertical colour bars).
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 4]; 8] = [
            [255, 255, 255, 255],
            [255, 255, 0, 255],
            [0, 255, 255, 255],
            [0, 255, 0, 255],
            [255, 0, 255, 255],
            [255, 0, 0, 255],
            [0, 0, 255, 255],
            [0, 0, 0, 255],
        ];
        let mut frame = Self::new(width, height, PixelFormat::Rgba8);
        let plane = frame.primary_plane_mut();
        for y in 0..height {
            for (x, px) in plane.row_mut(y).chunks_exact_mut(4).enumerate() {
                let bar = (x as u32 * 8 / width.max(1)) as usize;
                px.copy_from_slice(&BARS[bar.min(7)]);
            }
        }
        frame
    }
}

/// BT.709 limited-range YCbCr to RGB.
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = (y as f32 - 16.0) * (255.0 / 219.0);
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;
    let r = y + 1.7927 * cr;
    let g = y - 0.2132 * cb - 0.5329 * cr;
    let b = y + 2.1124 * cb;
    [
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ]
}

/// Arc-wrapped frame buffer for shared ownership.
pub type SharedFrameBuffer = Arc<FrameBuffer>;
