//! Media encoders
//!
//! An encoder receives the recorder's frames one at a time and yields the
//! binary chunks that make up the final video artifact.

use super::error::EncoderError;
use super::state::EncoderKind;
use crate::capture::frame::RGBA_CHANNELS;
use crate::capture::FrameSample;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};

pub type EncoderResult<T> = std::result::Result<T, EncoderError>;

pub trait MediaEncoder: Send {
    /// MIME type of the finished artifact
    fn mime_type(&self) -> &'static str;

    /// Feed one frame, returning a chunk if one is ready
    fn encode(&mut self, frame: &FrameSample) -> EncoderResult<Option<Vec<u8>>>;

    /// Flush and return any trailing chunks
    fn finish(&mut self) -> EncoderResult<Vec<Vec<u8>>>;

    /// Throw away everything encoded so far
    fn abort(&mut self);
}

/// Build the encoder selected in the recording options
pub fn encoder_for(kind: EncoderKind, frame_rate: u32) -> Box<dyn MediaEncoder> {
    match kind {
        EncoderKind::Raw => Box::new(RawFrameEncoder::default()),
        EncoderKind::Ffmpeg => Box::new(FfmpegEncoder::new(frame_rate)),
    }
}

/// Uncompressed encoder: each frame's RGBA bytes become one chunk
#[derive(Debug, Default)]
pub struct RawFrameEncoder {
    size: Option<(u32, u32)>,
}

impl RawFrameEncoder {
    pub const MIME_TYPE: &'static str = "video/x-raw-rgba";
}

impl MediaEncoder for RawFrameEncoder {
    fn mime_type(&self) -> &'static str {
        Self::MIME_TYPE
    }

    fn encode(&mut self, frame: &FrameSample) -> EncoderResult<Option<Vec<u8>>> {
        let bytes = frame_bytes(frame)?;
        check_frame_size(&mut self.size, frame)?;
        Ok(Some(bytes.to_vec()))
    }

    fn finish(&mut self) -> EncoderResult<Vec<Vec<u8>>> {
        Ok(Vec::new())
    }

    fn abort(&mut self) {
        self.size = None;
    }
}

fn frame_bytes(frame: &FrameSample) -> EncoderResult<&[u8]> {
    frame.rgba_bytes().ok_or(EncoderError::ShortFrame {
        expected: frame.pixel_count() * RGBA_CHANNELS,
        actual: frame.pixels.len(),
    })
}

fn check_frame_size(size: &mut Option<(u32, u32)>, frame: &FrameSample) -> EncoderResult<()> {
    let actual = (frame.width, frame.height);
    match *size {
        Some(expected) if expected != actual => Err(EncoderError::FrameSizeChanged { expected, actual }),
        Some(_) => Ok(()),
        None => {
            *size = Some(actual);
            Ok(())
        }
    }
}

/// VP9/WebM encoder backed by an ffmpeg child process
///
/// The process is spawned on the first frame, once the real frame size is
/// known. Output goes to a temporary file that is read back on finish.
pub struct FfmpegEncoder {
    frame_rate: u32,
    size: Option<(u32, u32)>,
    process: Option<Child>,
    output: Option<tempfile::NamedTempFile>,
    frame_count: u64,
}

impl FfmpegEncoder {
    pub const MIME_TYPE: &'static str = "video/webm";

    pub fn new(frame_rate: u32) -> Self {
        Self {
            frame_rate: frame_rate.max(1),
            size: None,
            process: None,
            output: None,
            frame_count: 0,
        }
    }

    /// Check whether an ffmpeg binary with the VP9 encoder is on the PATH
    pub fn is_available() -> bool {
        Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stderr(Stdio::null())
            .output()
            .map(|out| out.status.success() && String::from_utf8_lossy(&out.stdout).contains("libvpx-vp9"))
            .unwrap_or(false)
    }

    fn spawn(&mut self, width: u32, height: u32) -> EncoderResult<()> {
        let output = tempfile::Builder::new()
            .prefix("liveness-")
            .suffix(".webm")
            .tempfile()?;
        let output_path = output.path().to_string_lossy().to_string();

        // Input: raw RGBA frames on stdin
        // Output: VP9 in WebM, tuned for speed over size
        let process = Command::new("ffmpeg")
            .args([
                "-y",
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pixel_format",
                "rgba",
                "-video_size",
                &format!("{width}x{height}"),
                "-framerate",
                &self.frame_rate.to_string(),
                "-i",
                "-",
                "-c:v",
                "libvpx-vp9",
                "-deadline",
                "realtime",
                "-cpu-used",
                "8",
                "-b:v",
                "1M",
                "-pix_fmt",
                "yuv420p",
                "-f",
                "webm",
                &output_path,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        tracing::info!(
            "Started FFmpeg encoder: {}x{} @ {}fps, output: {}",
            width,
            height,
            self.frame_rate,
            output_path
        );

        self.process = Some(process);
        self.output = Some(output);
        Ok(())
    }

    fn kill(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill() {
                tracing::debug!("FFmpeg already exited: {:?}", e);
            }
            let _ = process.wait();
        }
    }
}

impl MediaEncoder for FfmpegEncoder {
    fn mime_type(&self) -> &'static str {
        Self::MIME_TYPE
    }

    fn encode(&mut self, frame: &FrameSample) -> EncoderResult<Option<Vec<u8>>> {
        let bytes = frame_bytes(frame)?;
        check_frame_size(&mut self.size, frame)?;
        if self.process.is_none() {
            self.spawn(frame.width, frame.height)?;
        }

        let stdin = self
            .process
            .as_mut()
            .and_then(|p| p.stdin.as_mut())
            .ok_or_else(|| EncoderError::Process("ffmpeg stdin closed".to_string()))?;
        stdin.write_all(bytes)?;
        self.frame_count += 1;
        Ok(None)
    }

    fn finish(&mut self) -> EncoderResult<Vec<Vec<u8>>> {
        let Some(mut process) = self.process.take() else {
            return Ok(Vec::new());
        };

        // Close stdin to signal EOF
        drop(process.stdin.take());
        let result = process.wait_with_output()?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(EncoderError::Process(format!(
                "ffmpeg exited with status {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let mut bytes = Vec::new();
        if let Some(output) = self.output.take() {
            output.reopen()?.read_to_end(&mut bytes)?;
        }

        tracing::info!(
            "FFmpeg encoder finished: {} frames, {} bytes",
            self.frame_count,
            bytes.len()
        );
        Ok(vec![bytes])
    }

    fn abort(&mut self) {
        self.kill();
        self.output = None;
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.kill();
    }
}
