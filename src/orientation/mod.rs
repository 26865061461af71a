//! Device orientation sources.
//!
//! The render loop samples one quaternion per tick. Writers live on their own thread and publish
//! through [`SharedOrientation`]; a torn read is tolerated because the value is resampled every
//! tick and never accumulated.

/// Replay of recorded quaternion streams.
pub mod feed;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::Quat;

/// Device orientation at startup when no tracker is present: +90 degrees about X, so the default
/// view looks at the horizon.
pub const DEFAULT_ORIENTATION: Quat = Quat::from_xyzw(0.70711, 0.0, 0.0, 0.70711);

/// Non-blocking source of the latest device orientation.
pub trait OrientationSource: Send + Sync {
    /// Latest unit quaternion.
    fn sample(&self) -> Quat;
}

/// A fixed orientation.
#[derive(Clone, Copy, Debug)]
pub struct FixedOrientation(pub Quat);

impl Default for FixedOrientation {
    fn default() -> Self {
        Self(DEFAULT_ORIENTATION)
    }
}

impl OrientationSource for FixedOrientation {
    fn sample(&self) -> Quat {
        self.0
    }
}

/// Lock-free, last-write-wins quaternion cell.
#[derive(Debug)]
pub struct SharedOrientation {
    xyzw: [AtomicU32; 4],
}

impl SharedOrientation {
    /// Create a cell holding `q`.
    pub fn new(q: Quat) -> Self {
        let [x, y, z, w] = q.to_array();
        Self {
            xyzw: [
                AtomicU32::new(x.to_bits()),
                AtomicU32::new(y.to_bits()),
                AtomicU32::new(z.to_bits()),
                AtomicU32::new(w.to_bits()),
            ],
        }
    }

    /// Publish a new orientation.
    pub fn store(&self, q: Quat) {
        for (cell, v) in self.xyzw.iter().zip(q.to_array()) {
            cell.store(v.to_bits(), Ordering::Relaxed);
        }
    }
}

impl Default for SharedOrientation {
    fn default() -> Self {
        Self::new(DEFAULT_ORIENTATION)
    }
}

impl OrientationSource for SharedOrientation {
    fn sample(&self) -> Quat {
        let [x, y, z, w] = self
            .xyzw
            .each_ref()
            .map(|cell| f32::from_bits(cell.load(Ordering::Relaxed)));
        let q = Quat::from_xyzw(x, y, z, w);
        // A torn or degenerate write is replaced rather than propagated into the matrix chain.
        if q.is_finite() && q.length_squared() > 1e-6 {
            q.normalize()
        } else {
            DEFAULT_ORIENTATION
        }
    }
}

impl<T: OrientationSource + ?Sized> OrientationSource for Arc<T> {
    fn sample(&self) -> Quat {
        (**self).sample()
    }
}

/// Resolve the startup orientation source.
///
/// A missing tracker is not fatal: the pipeline degrades to [`FixedOrientation`] and logs once.
pub fn open_orientation(
    tracker: crate::PanoResult<Arc<SharedOrientation>>,
) -> Box<dyn OrientationSource> {
    match tracker {
        Ok(shared) => Box::new(shared),
        Err(err) => {
            tracing::warn!(error = %err, "no orientation source, using fixed default orientation");
            Box::new(FixedOrientation::default())
        }
    }
}
