use rayon::prelude::*;
use tracing::debug;

use crate::{
    capture::image::CameraImage,
    compose::compositor::{DrawParams, Split},
    foundation::core::{OperationMode, Size},
    foundation::error::{PanoError, PanoResult},
    render::backend::{FrameRGB, RenderBackend, RenderTarget, Viewport},
};

/// Tuning for [`CpuBackend`].
#[derive(Clone, Debug, Default)]
pub struct CpuSettings {
    /// Worker threads for row filling; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Largest target (in pixels) the backend will allocate.
    pub max_target_pixels: Option<u64>,
}

/// Headless reference backend.
///
/// Draws by nearest-neighbour scaling of the active camera image; split passes sample the
/// matching half of the source. Presents into an in-memory screen buffer.
pub struct CpuBackend {
    settings: CpuSettings,
    pool: Option<rayon::ThreadPool>,
    screen: FrameRGB,
    presents: u64,
    last_program: Option<OperationMode>,
}

impl CpuBackend {
    /// Backend on the global rayon pool.
    pub fn new(screen: Size) -> PanoResult<Self> {
        Self::with_settings(screen, CpuSettings::default())
    }

    /// Backend with explicit settings.
    pub fn with_settings(screen: Size, settings: CpuSettings) -> PanoResult<Self> {
        let pool = build_thread_pool(settings.threads)?;
        Ok(Self {
            screen: FrameRGB::try_new(screen.width, screen.height)?,
            settings,
            pool,
            presents: 0,
            last_program: None,
        })
    }

    /// Display contents after the last present.
    pub fn screen(&self) -> &FrameRGB {
        &self.screen
    }

    /// Number of successful presents.
    pub fn present_count(&self) -> u64 {
        self.presents
    }

    /// Shader program of the last successful present.
    pub fn last_present_program(&self) -> Option<OperationMode> {
        self.last_program
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl RenderBackend for CpuBackend {
    fn allocate_target(&mut self, width: u32, height: u32) -> PanoResult<RenderTarget> {
        if width == 0 || height == 0 {
            return Err(PanoError::resource(format!(
                "render target {width}x{height} is empty"
            )));
        }
        if let Some(max) = self.settings.max_target_pixels
            && u64::from(width) * u64::from(height) > max
        {
            return Err(PanoError::resource(format!(
                "render target {width}x{height} exceeds {max} pixels"
            )));
        }
        Ok(RenderTarget::new(FrameRGB::try_new(width, height)?))
    }

    fn release_target(&mut self, target: RenderTarget) {
        debug!(size = ?target.size(), "released render target");
    }

    fn render(
        &mut self,
        target: &mut RenderTarget,
        params: &DrawParams,
        cameras: &[CameraImage],
    ) -> PanoResult<()> {
        let frame = target.frame_mut();
        let Some(src) = cameras.get(params.active_camera).filter(|c| !c.is_empty()) else {
            frame.data.fill(0);
            return Ok(());
        };

        let (x0, span) = match params.split {
            Split::None => (0, src.width),
            Split::Left => (0, (src.width / 2).max(1)),
            Split::Right => (src.width / 2, src.width - src.width / 2),
        };
        let (tw, th) = (frame.width, frame.height);
        let stride = frame.row_bytes();

        self.install(|| {
            frame
                .data
                .par_chunks_exact_mut(stride)
                .enumerate()
                .for_each(|(y, row)| {
                    let sy = (y as u64 * u64::from(src.height) / u64::from(th)) as u32;
                    for (x, px) in row.chunks_exact_mut(3).enumerate() {
                        let sx = x0 + (x as u64 * u64::from(span) / u64::from(tw)) as u32;
                        px.copy_from_slice(&src.pixel(sx, sy));
                    }
                });
        });
        Ok(())
    }

    fn present(
        &mut self,
        target: &RenderTarget,
        viewports: &[Viewport],
        program: OperationMode,
    ) -> PanoResult<()> {
        // The display is a flat copy, so only the board program is drawable here.
        if program != OperationMode::Board {
            return Err(PanoError::configuration(format!(
                "cpu backend cannot present through the {program:?} program"
            )));
        }
        let src = target.frame();
        let screen = &mut self.screen;
        screen.data.fill(0);
        let (sw, sh) = (screen.width as i64, screen.height as i64);
        let stride = screen.row_bytes();

        for vp in viewports {
            if vp.width == 0 || vp.height == 0 {
                continue;
            }
            let (vx, vy) = (i64::from(vp.x), i64::from(vp.y));
            let y_range = vy.max(0)..(vy + i64::from(vp.height)).min(sh);
            let x_range = vx.max(0)..(vx + i64::from(vp.width)).min(sw);
            for y in y_range {
                let sy = ((y - vy) as u64 * u64::from(src.height) / u64::from(vp.height)) as u32;
                let row = &mut screen.data[y as usize * stride..(y as usize + 1) * stride];
                for x in x_range.clone() {
                    let sx = ((x - vx) as u64 * u64::from(src.width) / u64::from(vp.width)) as u32;
                    let i = x as usize * 3;
                    row[i..i + 3].copy_from_slice(&src.pixel(sx, sy));
                }
            }
        }
        self.presents += 1;
        self.last_program = Some(program);
        Ok(())
    }

    fn screen_size(&self) -> Size {
        Size {
            width: self.screen.width,
            height: self.screen.height,
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> PanoResult<Option<rayon::ThreadPool>> {
    match threads {
        None => Ok(None),
        Some(0) => Err(PanoError::configuration(
            "cpu backend 'threads' must be >= 1 when set",
        )),
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map(Some)
            .map_err(|e| PanoError::init(format!("failed to build rayon thread pool: {e}"))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
