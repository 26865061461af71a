use crate::foundation::error::{PanoError, PanoResult};

/// Identifier of a frame request. Allocated strictly increasing, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u64);

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pitch/yaw/roll triple in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EulerAngles {
    /// Rotation about X.
    pub pitch: f32,
    /// Rotation about Y.
    pub yaw: f32,
    /// Rotation about Z.
    pub roll: f32,
}

impl EulerAngles {
    /// Build from radians.
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Build from degrees.
    pub fn from_degrees(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self {
            pitch: pitch.to_radians(),
            yaw: yaw.to_radians(),
            roll: roll.to_radians(),
        }
    }

    /// Parse a `pitch,yaw,roll` triple given in degrees.
    pub fn parse_degrees(s: &str) -> PanoResult<Self> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PanoError::configuration(format!("bad angle triple '{s}': {e}")))?;
        match parts.as_slice() {
            [p, y, r] if parts.iter().all(|v| v.is_finite()) => Ok(Self::from_degrees(*p, *y, *r)),
            _ => Err(PanoError::configuration(format!(
                "expected finite pitch,yaw,roll, got '{s}'"
            ))),
        }
    }
}

/// Projection family of a frame request. Doubles as the backend's shader selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OperationMode {
    /// Perspective window view.
    #[default]
    Window,
    /// Equirectangular panorama.
    Equirectangular,
    /// Raw fisheye view.
    Fisheye,
    /// Lens calibration overlay.
    Calibration,
    /// Flat board used to put an off-screen target on the display.
    Board,
}

impl OperationMode {
    /// Index of the shader program for this mode.
    pub fn shader_index(self) -> usize {
        match self {
            Self::Window => 0,
            Self::Equirectangular => 1,
            Self::Fisheye => 2,
            Self::Calibration => 3,
            Self::Board => 4,
        }
    }
}

/// Output pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}
