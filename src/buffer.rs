//! The offscreen back buffer: one frame of 32-bit pixels the game draws into
//! before the platform layer copies it onto the window.

use std::collections::TryReserveError;
use thiserror::Error;

/// Blue, green, red, padding.
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("cannot size a buffer to {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    #[error("could not allocate {bytes} bytes for a {width}x{height} buffer")]
    OutOfMemory { width: u32, height: u32, bytes: usize },
}

/// Client-area size of a window, or any other target surface.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Row-major, top-down pixel storage. Row `y` starts at byte `y * pitch`.
#[derive(Debug, Default)]
pub struct PixelBuffer {
    memory: Vec<u8>,
    width: u32,
    height: u32,
    pitch: usize,
}

impl PixelBuffer {
    /// An unsized buffer. It holds no memory until the first `resize`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimensions(width: u32, height: u32) -> Result<Self, BufferError> {
        let mut buffer = Self::new();
        buffer.resize(width, height)?;
        Ok(buffer)
    }

    /// Reallocates the whole block for the new size. Contents are zeroed;
    /// callers fill before displaying.
    ///
    /// On failure the buffer is left empty rather than half-sized.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), BufferError> {
        if width == 0 || height == 0 {
            return Err(BufferError::ZeroDimension { width, height });
        }

        let out_of_memory = |bytes| BufferError::OutOfMemory {
            width,
            height,
            bytes,
        };

        // release the old block before asking for the new one
        self.memory = Vec::new();
        self.width = 0;
        self.height = 0;
        self.pitch = 0;

        let pitch = (width as usize)
            .checked_mul(BYTES_PER_PIXEL)
            .ok_or_else(|| out_of_memory(usize::MAX))?;
        let size = pitch
            .checked_mul(height as usize)
            .ok_or_else(|| out_of_memory(usize::MAX))?;

        let mut memory = Vec::new();
        memory
            .try_reserve_exact(size)
            .map_err(|_: TryReserveError| out_of_memory(size))?;
        memory.resize(size, 0);

        debug!("resized back buffer to {}x{} ({} bytes)", width, height, size);

        self.memory = memory;
        self.width = width;
        self.height = height;
        self.pitch = pitch;

        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }

    /// Bytes from the start of one row to the start of the next.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn bytes_per_pixel(&self) -> usize {
        BYTES_PER_PIXEL
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.pitch;
        let end = start + self.width as usize * BYTES_PER_PIXEL;
        self.memory.get(start..end)
    }

    pub fn row_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.pitch;
        let end = start + self.width as usize * BYTES_PER_PIXEL;
        self.memory.get_mut(start..end)
    }

    /// The packed `0x00RRGGBB` value at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width {
            return None;
        }
        let offset = x as usize * BYTES_PER_PIXEL;
        let bytes = self.row(y)?.get(offset..offset + BYTES_PER_PIXEL)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Nearest-neighbour stretch onto a `target`-sized surface, same pixel
    /// layout, row 0 on top. An empty target gives an empty surface.
    pub fn stretch_to(&self, target: Dimension) -> Vec<u8> {
        if target.is_empty() || self.is_empty() {
            return Vec::new();
        }

        let target_pitch = target.width as usize * BYTES_PER_PIXEL;
        let mut surface = vec![0u8; target_pitch * target.height as usize];

        for (dest_y, dest_row) in surface.chunks_exact_mut(target_pitch).enumerate() {
            let src_y = (dest_y as u64 * self.height as u64 / target.height as u64) as usize;
            let src_row = &self.memory[src_y * self.pitch..];
            for (dest_x, dest_pixel) in dest_row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let src_x = (dest_x as u64 * self.width as u64 / target.width as u64) as usize;
                let offset = src_x * BYTES_PER_PIXEL;
                dest_pixel.copy_from_slice(&src_row[offset..offset + BYTES_PER_PIXEL]);
            }
        }

        surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_sizes_memory_to_height_times_pitch() {
        for &(width, height) in &[(1, 1), (4, 2), (1280, 720), (3, 977)] {
            let buffer = PixelBuffer::with_dimensions(width, height).unwrap();
            assert_eq!(buffer.pitch(), width as usize * 4);
            assert_eq!(buffer.memory().len(), height as usize * buffer.pitch());
            assert_eq!(buffer.bytes_per_pixel(), 4);
        }
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let mut buffer = PixelBuffer::with_dimensions(8, 8).unwrap();

        assert_eq!(
            buffer.resize(0, 10),
            Err(BufferError::ZeroDimension {
                width: 0,
                height: 10
            })
        );
        assert!(buffer.resize(10, 0).is_err());

        // the previous allocation is untouched by a rejected resize
        assert_eq!(buffer.dimension(), Dimension::new(8, 8));
        assert_eq!(buffer.memory().len(), 8 * 8 * 4);
    }

    #[test]
    fn resize_replaces_the_previous_block() {
        let mut buffer = PixelBuffer::with_dimensions(640, 480).unwrap();
        buffer.resize(16, 9).unwrap();

        assert_eq!(buffer.memory().len(), 16 * 9 * 4);
        assert_eq!(buffer.memory.capacity(), 16 * 9 * 4);
    }

    #[test]
    fn oversized_buffer_is_out_of_memory() {
        let mut buffer = PixelBuffer::new();
        match buffer.resize(u32::MAX, u32::MAX) {
            Err(BufferError::OutOfMemory { .. }) => {}
            other => panic!("expected OutOfMemory, got {:?}", other),
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn rows_and_pixels_are_bounds_checked() {
        let buffer = PixelBuffer::with_dimensions(4, 2).unwrap();
        assert!(buffer.row(1).is_some());
        assert!(buffer.row(2).is_none());
        assert_eq!(buffer.pixel(3, 1), Some(0));
        assert_eq!(buffer.pixel(4, 0), None);
        assert_eq!(buffer.pixel(0, 2), None);
    }

    #[test]
    fn stretch_doubles_each_pixel() {
        let mut buffer = PixelBuffer::with_dimensions(2, 1).unwrap();
        buffer
            .row_mut(0)
            .unwrap()
            .copy_from_slice(&[1, 0, 0, 0, 2, 0, 0, 0]);

        let surface = buffer.stretch_to(Dimension::new(4, 2));
        let blues: Vec<u8> = surface.chunks_exact(4).map(|p| p[0]).collect();
        assert_eq!(blues, vec![1, 1, 2, 2, 1, 1, 2, 2]);

        assert!(buffer.stretch_to(Dimension::new(0, 5)).is_empty());
    }
}
