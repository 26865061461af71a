use std::sync::Arc;

use crate::foundation::error::{PanoError, PanoResult};

/// One camera image, RGB8, row-major, tightly packed.
///
/// The payload is shared so that handing the latest image to the render loop is a refcount bump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGB8 bytes.
    pub data: Arc<Vec<u8>>,
}

impl CameraImage {
    /// Wrap an RGB8 buffer, validating its length.
    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> PanoResult<Self> {
        let expected = (width as usize) * (height as usize) * 3;
        if data.len() != expected {
            return Err(PanoError::configuration(format!(
                "camera image is {} bytes, expected {expected} for {width}x{height} rgb8",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: Arc::new(data),
        })
    }

    /// A single-colour image.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let px = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(px * 3);
        for _ in 0..px {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data: Arc::new(data),
        }
    }

    /// A black image, used before the first frame arrives.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::solid(width, height, [0, 0, 0])
    }

    /// Return `true` when the image has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGB at `(x, y)`; callers keep coordinates in range.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y as usize) * (self.width as usize) + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}
