use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context as _;
use image::{ExtendedColorType, ImageEncoder as _, ImageFormat, codecs::jpeg::JpegEncoder};

use crate::encode::ffmpeg::ensure_parent_dir;
use crate::encode::sink::StillSink;
use crate::foundation::error::{PanoError, PanoResult};
use crate::render::backend::FrameRGB;

/// Writes stills with the `image` crate: PNG when the path ends in `.png`, JPEG otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageStillSink;

impl StillSink for ImageStillSink {
    fn save(&mut self, frame: &FrameRGB, path: &Path, quality: u8) -> PanoResult<()> {
        if frame.data.len() != frame.row_bytes() * frame.height as usize {
            return Err(PanoError::encode("frame.data size mismatch with width*height*3"));
        }
        ensure_parent_dir(path)?;

        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png {
            return image::save_buffer_with_format(
                path,
                &frame.data,
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
                ImageFormat::Png,
            )
            .map_err(|e| PanoError::encode(format!("write '{}': {e}", path.display())));
        }

        let file =
            File::create(path).with_context(|| format!("create still '{}'", path.display()))?;
        JpegEncoder::new_with_quality(BufWriter::new(file), quality.clamp(1, 100))
            .write_image(&frame.data, frame.width, frame.height, ExtendedColorType::Rgb8)
            .map_err(|e| PanoError::encode(format!("encode '{}': {e}", path.display())))
    }
}
