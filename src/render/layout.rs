use smallvec::{SmallVec, smallvec};

use crate::foundation::core::{OperationMode, Size};
use crate::render::backend::Viewport;

/// Where the foreground request's target lands on the display.
///
/// Calibration uses a centered square the height of the screen. Stereo centers the target in each
/// screen half. Otherwise the target is centered at native size.
pub fn display_viewports(
    screen: Size,
    target: Size,
    mode: OperationMode,
    stereo: bool,
) -> SmallVec<[Viewport; 2]> {
    let (sw, sh) = (screen.width as i32, screen.height as i32);
    let (tw, th) = (target.width as i32, target.height as i32);

    if mode == OperationMode::Calibration {
        return smallvec![Viewport {
            x: (sw - sh) / 2,
            y: 0,
            width: screen.height,
            height: screen.height,
        }];
    }

    if stereo {
        let offset_x = (sw / 2 - tw) / 2;
        let offset_y = (sh - th) / 2;
        return (0..2)
            .map(|i| Viewport {
                x: offset_x + i * sw / 2,
                y: offset_y,
                width: target.width,
                height: target.height,
            })
            .collect();
    }

    smallvec![Viewport {
        x: (sw - tw) / 2,
        y: (sh - th) / 2,
        width: target.width,
        height: target.height,
    }]
}
