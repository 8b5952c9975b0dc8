//! Still photo capture
//!
//! Encodes a single RGBA frame as a PNG artifact.

use super::artifact::{Artifact, ArtifactKind};
use super::frame::FrameSample;

pub const STILL_MIME_TYPE: &str = "image/png";

/// Encode an RGBA frame as PNG bytes
pub fn encode_png(frame: &FrameSample) -> Result<Vec<u8>, png::EncodingError> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, frame.width, frame.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let pixels = frame.rgba_bytes().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} bytes for a {}x{} frame", frame.pixels.len(), frame.width, frame.height),
            )
        })?;
        let mut writer = encoder.write_header()?;
        writer.write_image_data(pixels)?;
        writer.finish()?;
    }
    Ok(out)
}

/// Snapshot `frame` as a still artifact of `kind`
pub fn still_artifact(frame: &FrameSample, kind: ArtifactKind) -> Result<Artifact, png::EncodingError> {
    let bytes = encode_png(frame)?;
    tracing::debug!(
        "Captured {:?} still: {}x{}, {} bytes",
        kind,
        frame.width,
        frame.height,
        bytes.len()
    );
    Ok(Artifact::new(kind, STILL_MIME_TYPE, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic::{render_face_frame, SKIN_RGB};

    #[test]
    fn test_png_round_trips_dimensions_and_pixels() {
        let frame = render_face_frame(40, 30, Some((0.0, 0.0)));
        let artifact = still_artifact(&frame, ArtifactKind::SelfPhoto).unwrap();
        assert_eq!(artifact.mime_type, "image/png");
        assert_eq!(artifact.file_name(), "self_photo.png");

        let decoder = png::Decoder::new(artifact.data());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!((info.width, info.height), (40, 30));
        assert_eq!(info.color_type, png::ColorType::Rgba);

        let centre = (15 * 40 + 20) * 4;
        assert_eq!(buf[centre..centre + 3], SKIN_RGB);
    }

    #[test]
    fn test_short_buffer_is_an_error() {
        let mut frame = render_face_frame(8, 8, None);
        frame.pixels.truncate(10);
        assert!(matches!(
            still_artifact(&frame, ArtifactKind::SelfPhoto),
            Err(png::EncodingError::IoError(_))
        ));
    }
}
