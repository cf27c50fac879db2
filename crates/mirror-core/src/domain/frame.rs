//! Decoded video frames.
//!
//! A [`Frame`] is an immutable image buffer plus its pixel dimensions.  The
//! pixel data sits behind an `Arc<[u8]>`, so handing the same frame to the
//! renderer and to the automation consumer costs a reference-count bump, not
//! a copy of several megabytes.
//!
//! Frames have no persistent identity.  The `sequence` field records arrival
//! order within one session and is stamped by the session controller.

use std::sync::Arc;

use thiserror::Error;

/// Error type for frame construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The buffer length does not match `width * height * bytes_per_pixel`.
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Width or height is zero.
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
}

/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 24-bit blue, green, red (`screencap` `RGB_888`, reordered).
    Bgr888,
    /// Packed 32-bit red, green, blue, alpha (`screencap` four-byte formats).
    Rgba8888,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgr888 => 3,
            PixelFormat::Rgba8888 => 4,
        }
    }
}

/// One decoded image from the device screen.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
    format: PixelFormat,
    sequence: u64,
}

impl Frame {
    /// Wraps `data` as a frame after checking that its length matches the
    /// dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::EmptyDimensions`] for a zero width or height and
    /// [`FrameError::SizeMismatch`] when the buffer length is wrong.
    pub fn new(
        data: impl Into<Arc<[u8]>>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyDimensions { width, height });
        }
        let data = data.into();
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            sequence: 0,
        })
    }

    /// Returns the same frame tagged with `sequence`.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Arrival order within the owning session.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns a horizontally mirrored copy of this frame.
    ///
    /// Used when the session's flip flag is set.  The sequence number is
    /// preserved.
    pub fn flipped_horizontally(&self) -> Frame {
        let bpp = self.format.bytes_per_pixel();
        let row_len = self.width as usize * bpp;
        let mut out = Vec::with_capacity(self.data.len());

        for row in self.data.chunks_exact(row_len) {
            for pixel in row.chunks_exact(bpp).rev() {
                out.extend_from_slice(pixel);
            }
        }

        Frame {
            data: out.into(),
            width: self.width,
            height: self.height,
            format: self.format,
            sequence: self.sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32) -> Frame {
        let len = (width * height * 3) as usize;
        let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
        Frame::new(data, width, height, PixelFormat::Bgr888).expect("valid frame")
    }

    #[test]
    fn test_new_accepts_matching_buffer() {
        let frame = make_frame(4, 2);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.data().len(), 24);
        assert_eq!(frame.sequence(), 0);
    }

    #[test]
    fn test_new_rejects_short_buffer() {
        // Arrange
        let data = vec![0u8; 10];

        // Act
        let result = Frame::new(data, 2, 2, PixelFormat::Rgba8888);

        // Assert
        assert_eq!(
            result.unwrap_err(),
            FrameError::SizeMismatch {
                width: 2,
                height: 2,
                expected: 16,
                actual: 10,
            }
        );
    }

    #[test]
    fn test_new_rejects_zero_dimensions() {
        let result = Frame::new(Vec::new(), 0, 10, PixelFormat::Bgr888);
        assert!(matches!(result, Err(FrameError::EmptyDimensions { .. })));
    }

    #[test]
    fn test_clone_shares_buffer() {
        let frame = make_frame(8, 8);
        let copy = frame.clone();
        assert!(std::ptr::eq(frame.data().as_ptr(), copy.data().as_ptr()));
    }

    #[test]
    fn test_flip_reverses_pixels_within_each_row() {
        // Arrange – 2x2 BGR frame, pixels numbered 1..4
        let data = vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4];
        let frame = Frame::new(data, 2, 2, PixelFormat::Bgr888)
            .expect("valid frame")
            .with_sequence(7);

        // Act
        let flipped = frame.flipped_horizontally();

        // Assert
        assert_eq!(flipped.data(), &[2, 2, 2, 1, 1, 1, 4, 4, 4, 3, 3, 3]);
        assert_eq!(flipped.sequence(), 7);
    }

    #[test]
    fn test_flip_twice_restores_original() {
        let frame = make_frame(5, 3);
        let restored = frame.flipped_horizontally().flipped_horizontally();
        assert_eq!(frame.data(), restored.data());
    }
}
