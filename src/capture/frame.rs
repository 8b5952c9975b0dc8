//! Frame samples
//!
//! A single RGBA snapshot pulled from a live video stream.

use super::traits::FrameSource;
use std::time::{Duration, Instant};

/// Poll interval while waiting for a stream to warm up
const WARMUP_POLL: Duration = Duration::from_millis(20);

/// Bytes per RGBA pixel
pub const RGBA_CHANNELS: usize = 4;

/// One RGBA frame taken from the active stream
///
/// Produced and discarded every sampling tick; never persisted.
#[derive(Debug, Clone)]
pub struct FrameSample {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Row-major RGBA bytes, `width * height * 4` long
    pub pixels: Vec<u8>,

    /// When the frame was pulled from the stream
    pub captured_at: Instant,
}

impl FrameSample {
    /// Wrap a pixel buffer, rejecting empty dimensions or a short buffer.
    ///
    /// Streams that are still warming up report zero dimensions; those
    /// yield `None` rather than an error.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let expected = width as usize * height as usize * RGBA_CHANNELS;
        if pixels.len() < expected {
            tracing::debug!(
                "Dropping frame: {} bytes for {}x{} (expected {})",
                pixels.len(),
                width,
                height,
                expected
            );
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
            captured_at: Instant::now(),
        })
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Exactly `width * height` RGBA pixels, or `None` if the buffer is short
    pub fn rgba_bytes(&self) -> Option<&[u8]> {
        self.pixels.get(..self.pixel_count() * RGBA_CHANNELS)
    }

    /// RGBA value at (x, y)
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * RGBA_CHANNELS;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
            self.pixels[offset + 3],
        ]
    }

    /// Horizontal and vertical frame centre in pixel coordinates
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Length of the shorter side
    pub fn shorter_side(&self) -> u32 {
        self.width.min(self.height)
    }
}

/// Wait up to `timeout` for `source` to deliver its first valid frame
pub async fn wait_for_frame<S>(source: &S, timeout: Duration) -> Option<FrameSample>
where
    S: FrameSource + ?Sized,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(frame) = source.current_frame() {
            return Some(frame);
        }
        if Instant::now() >= deadline {
            tracing::warn!("No frame from stream after {}ms", timeout.as_millis());
            return None;
        }
        tokio::time::sleep(WARMUP_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowStart {
        pulls: AtomicUsize,
        ready_after: usize,
    }

    impl FrameSource for SlowStart {
        fn current_frame(&self) -> Option<FrameSample> {
            let pull = self.pulls.fetch_add(1, Ordering::SeqCst);
            (pull >= self.ready_after).then(|| FrameSample::new(1, 1, vec![0; 4])).flatten()
        }
    }

    #[test]
    fn test_zero_dimensions_are_not_a_frame() {
        assert!(FrameSample::new(0, 480, Vec::new()).is_none());
        assert!(FrameSample::new(640, 0, Vec::new()).is_none());
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        assert!(FrameSample::new(2, 2, vec![0; 15]).is_none());
        assert!(FrameSample::new(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn test_rgba_bytes_checks_length() {
        let frame = FrameSample::new(2, 1, vec![7; 12]).unwrap();
        assert_eq!(frame.rgba_bytes().map(<[u8]>::len), Some(8));

        let short = FrameSample {
            width: 4,
            height: 4,
            pixels: vec![0; 10],
            captured_at: Instant::now(),
        };
        assert!(short.rgba_bytes().is_none());
    }

    #[test]
    fn test_rgba_lookup() {
        let mut pixels = vec![0; 2 * 2 * 4];
        pixels[12..16].copy_from_slice(&[1, 2, 3, 4]);
        let frame = FrameSample::new(2, 2, pixels).unwrap();
        assert_eq!(frame.rgba(1, 1), [1, 2, 3, 4]);
        assert_eq!(frame.center(), (1.0, 1.0));
    }

    #[tokio::test]
    async fn test_wait_for_frame_after_warmup() {
        let source = SlowStart {
            pulls: AtomicUsize::new(0),
            ready_after: 3,
        };
        let frame = wait_for_frame(&source, Duration::from_secs(2)).await;
        assert!(frame.is_some());
        assert_eq!(source.pulls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_wait_for_frame_gives_up() {
        let source = SlowStart {
            pulls: AtomicUsize::new(0),
            ready_after: usize::MAX,
        };
        assert!(wait_for_frame(&source, Duration::from_millis(50)).await.is_none());
    }
}
