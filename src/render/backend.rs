use crate::capture::image::CameraImage;
use crate::compose::compositor::DrawParams;
use crate::foundation::core::{OperationMode, Size};
use crate::foundation::error::{PanoError, PanoResult};

/// Tightly packed RGB8 frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGB {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 3` bytes, row-major.
    pub data: Vec<u8>,
}

impl FrameRGB {
    /// Black frame. Fails instead of aborting when the buffer cannot be reserved.
    pub fn try_new(width: u32, height: u32) -> PanoResult<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| PanoError::resource(format!("frame {width}x{height} overflows")))?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            PanoError::resource(format!("frame {width}x{height}: {e}"))
        })?;
        data.resize(len, 0);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Bytes per row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * 3
    }

    /// Pixels of row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.row_bytes();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Pixel at `(x, y)`. Panics out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// Off-screen render target owned by one frame request.
pub struct RenderTarget {
    frame: FrameRGB,
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("width", &self.frame.width)
            .field("height", &self.frame.height)
            .finish_non_exhaustive()
    }
}

impl RenderTarget {
    /// Wrap an allocated frame.
    pub fn new(frame: FrameRGB) -> Self {
        Self { frame }
    }

    /// Target dimensions.
    pub fn size(&self) -> Size {
        Size {
            width: self.frame.width,
            height: self.frame.height,
        }
    }

    /// Current pixels.
    pub fn frame(&self) -> &FrameRGB {
        &self.frame
    }

    /// Mutable pixels.
    pub fn frame_mut(&mut self) -> &mut FrameRGB {
        &mut self.frame
    }
}

/// Screen-space rectangle. Offsets may be negative when the target exceeds the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    /// Left edge; may be negative.
    pub x: i32,
    /// Top edge; may be negative.
    pub y: i32,
    /// Viewport width.
    pub width: u32,
    /// Viewport height.
    pub height: u32,
}

/// Produces pixels for the compositor's draw parameters.
pub trait RenderBackend {
    /// Allocate an off-screen target.
    fn allocate_target(&mut self, width: u32, height: u32) -> PanoResult<RenderTarget>;

    /// Give a target back.
    fn release_target(&mut self, target: RenderTarget);

    /// Draw into `target` from the current camera images.
    fn render(
        &mut self,
        target: &mut RenderTarget,
        params: &DrawParams,
        cameras: &[CameraImage],
    ) -> PanoResult<()>;

    /// Put `target` on the display at each viewport, drawn with the `program` shader.
    fn present(
        &mut self,
        target: &RenderTarget,
        viewports: &[Viewport],
        program: OperationMode,
    ) -> PanoResult<()>;

    /// Display size.
    fn screen_size(&self) -> Size;
}

/// Copy a half-width pass into its half of a double-width frame, row by row.
///
/// Row `r` of `dst` becomes left-pass row `r` followed by right-pass row `r`.
pub fn blit_half(dst: &mut FrameRGB, half: &FrameRGB, right: bool) -> PanoResult<()> {
    if dst.height != half.height || dst.width != half.width * 2 {
        return Err(PanoError::configuration(format!(
            "cannot place {}x{} pass into {}x{} frame",
            half.width, half.height, dst.width, dst.height
        )));
    }
    let stride = half.row_bytes();
    let offset = if right { stride } else { 0 };
    for (dst_row, src_row) in dst
        .data
        .chunks_exact_mut(stride * 2)
        .zip(half.data.chunks_exact(stride))
    {
        dst_row[offset..offset + stride].copy_from_slice(src_row);
    }
    Ok(())
}
