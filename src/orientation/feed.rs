use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context as _;
use glam::Quat;

use crate::foundation::error::{PanoError, PanoResult};
use crate::orientation::SharedOrientation;

/// Sampling cadence of the feed thread.
pub const FEED_INTERVAL: Duration = Duration::from_millis(5);

/// Parse a recorded quaternion stream: one `x y z w` sample per line, `#` comments allowed.
pub fn parse_quaternion_lines(text: &str) -> PanoResult<Vec<Quat>> {
    let mut out = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let vals = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::parse::<f32>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PanoError::configuration(format!("line {}: {e}", n + 1)))?;
        let [x, y, z, w] = vals[..] else {
            return Err(PanoError::configuration(format!(
                "line {}: expected 4 components, got {}",
                n + 1,
                vals.len()
            )));
        };
        out.push(Quat::from_xyzw(x, y, z, w));
    }
    Ok(out)
}

/// Start a thread that replays the quaternion file at `path` into `shared`, looping at the end.
///
/// Fails with [`PanoError::Init`] when the file cannot be read or holds no samples.
pub fn spawn_quaternion_feed(
    path: &Path,
    shared: Arc<SharedOrientation>,
    stop: Arc<AtomicBool>,
) -> PanoResult<JoinHandle<()>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read orientation feed '{}'", path.display()))
        .map_err(|e| PanoError::init(format!("{e:#}")))?;
    let samples = parse_quaternion_lines(&text)?;
    if samples.is_empty() {
        return Err(PanoError::init(format!(
            "orientation feed '{}' has no samples",
            path.display()
        )));
    }

    std::thread::Builder::new()
        .name("orientation-feed".to_owned())
        .spawn(move || {
            for q in samples.iter().cycle() {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                shared.store(*q);
                std::thread::sleep(FEED_INTERVAL);
            }
        })
        .context("spawn orientation feed thread")
        .map_err(PanoError::from)
}
