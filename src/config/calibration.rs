use std::path::Path;

use anyhow::Context as _;
use serde_json::{Map, Value};
use tracing::warn;

use crate::foundation::error::{PanoError, PanoResult};

/// Number of camera slots carried by the calibration document.
pub const MAX_CAMERAS: usize = 4;

/// Lens horizon radius used when the stored value is zero or missing.
pub const DEFAULT_HORIZON_R: f32 = 0.8;

/// Corrective rotation, translation, and lens radius for one mounted camera.
///
/// Angles are radians. `offset_x`/`offset_y` are in normalized texture units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraCalibration {
    /// Pitch correction, radians.
    pub offset_pitch: f32,
    /// Yaw correction, radians.
    pub offset_yaw: f32,
    /// Roll correction, radians.
    pub offset_roll: f32,
    /// Horizontal image offset.
    pub offset_x: f32,
    /// Vertical image offset.
    pub offset_y: f32,
    /// Radius of the lens horizon circle.
    pub horizon_r: f32,
}

impl Default for CameraCalibration {
    fn default() -> Self {
        Self {
            offset_pitch: 0.0,
            offset_yaw: 0.0,
            offset_roll: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            horizon_r: DEFAULT_HORIZON_R,
        }
    }
}

/// Per-camera calibration plus the global sharpness gain.
///
/// Persisted as a flat JSON object (`sharpness_gain`, `cam0_offset_pitch`, ...). Only written on
/// an explicit [`CalibrationOptions::save`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationOptions {
    /// Global sharpening gain.
    pub sharpness_gain: f32,
    /// One entry per camera slot.
    pub cameras: [CameraCalibration; MAX_CAMERAS],
}

const FIELDS: [&str; 6] = [
    "offset_pitch",
    "offset_yaw",
    "offset_roll",
    "offset_x",
    "offset_y",
    "horizon_r",
];

impl CameraCalibration {
    fn field(&self, name: &str) -> f32 {
        match name {
            "offset_pitch" => self.offset_pitch,
            "offset_yaw" => self.offset_yaw,
            "offset_roll" => self.offset_roll,
            "offset_x" => self.offset_x,
            "offset_y" => self.offset_y,
            _ => self.horizon_r,
        }
    }

    fn field_mut(&mut self, name: &str) -> &mut f32 {
        match name {
            "offset_pitch" => &mut self.offset_pitch,
            "offset_yaw" => &mut self.offset_yaw,
            "offset_roll" => &mut self.offset_roll,
            "offset_x" => &mut self.offset_x,
            "offset_y" => &mut self.offset_y,
            _ => &mut self.horizon_r,
        }
    }
}

impl CalibrationOptions {
    /// Calibration of `slot`, or the defaults for slots past [`MAX_CAMERAS`].
    pub fn camera(&self, slot: usize) -> CameraCalibration {
        self.cameras.get(slot).copied().unwrap_or_default()
    }

    /// Mutable calibration of `slot`, if it has one.
    pub fn camera_mut(&mut self, slot: usize) -> Option<&mut CameraCalibration> {
        self.cameras.get_mut(slot)
    }

    /// Flatten into the persisted key/value document.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("sharpness_gain".to_owned(), number(self.sharpness_gain));
        for (i, cam) in self.cameras.iter().enumerate() {
            for name in FIELDS {
                doc.insert(format!("cam{i}_{name}"), number(cam.field(name)));
            }
        }
        Value::Object(doc)
    }

    /// Read the flat document. Missing keys read as zero; a zero horizon radius becomes
    /// [`DEFAULT_HORIZON_R`].
    pub fn from_document(doc: &Value) -> PanoResult<Self> {
        let obj = doc
            .as_object()
            .ok_or_else(|| PanoError::serde("calibration document must be a JSON object"))?;

        let mut out = Self {
            sharpness_gain: read_number(obj, "sharpness_gain")?,
            ..Self::default()
        };
        for (i, cam) in out.cameras.iter_mut().enumerate() {
            for name in FIELDS {
                *cam.field_mut(name) = read_number(obj, &format!("cam{i}_{name}"))?;
            }
            if cam.horizon_r == 0.0 {
                cam.horizon_r = DEFAULT_HORIZON_R;
            }
        }
        Ok(out)
    }

    /// Read and parse the document at `path`.
    pub fn load(path: &Path) -> PanoResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read calibration '{}'", path.display()))?;
        let doc: Value = serde_json::from_str(&text)
            .map_err(|e| PanoError::serde(format!("parse '{}': {e}", path.display())))?;
        Self::from_document(&doc)
    }

    /// Load `path`, falling back to defaults with a warning when it is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(options) => options,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "using default calibration");
                Self::default()
            }
        }
    }

    /// Rewrite `path` wholesale with the current values.
    pub fn save(&self, path: &Path) -> PanoResult<()> {
        let text = serde_json::to_string_pretty(&self.to_document())
            .map_err(|e| PanoError::serde(format!("serialize calibration: {e}")))?;
        crate::encode::ffmpeg::ensure_parent_dir(path)?;
        std::fs::write(path, text)
            .with_context(|| format!("write calibration '{}'", path.display()))?;
        Ok(())
    }
}

fn number(v: f32) -> Value {
    serde_json::Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number)
}

fn read_number(obj: &Map<String, Value>, key: &str) -> PanoResult<f32> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| PanoError::serde(format!("'{key}' is not representable as f32"))),
        Some(other) => Err(PanoError::serde(format!(
            "'{key}' must be a number, got {other}"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/calibration.rs"]
mod tests;
