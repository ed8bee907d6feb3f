use image::RgbaImage;
use thiserror::Error;

use crate::geometry::{ScreenPoint, ScreenSize, SelectionRegion};

pub mod stamp;

/// Resolution assumed when the display cannot be queried.
pub const FALLBACK_SCREEN_SIZE: ScreenSize = ScreenSize::new(1920, 1080);

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no monitor available for capture")]
    NoMonitor,
    #[error("screen capture failed: {message}")]
    CaptureFailed { message: String },
    #[error("screen size query failed: {message}")]
    ScreenSizeUnavailable { message: String },
    #[error("selection collapsed to an empty rectangle")]
    EmptySelection,
    #[error("selection {width}x{height} is below the minimum capturable size")]
    SelectionTooSmall { width: u32, height: u32 },
    #[error(
        "selection ({x},{y}) {width}x{height} exceeds screen bounds {screen_width}x{screen_height}"
    )]
    SelectionOutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        screen_width: u32,
        screen_height: u32,
    },
}

pub trait CaptureBackend {
    fn screen_size(&self) -> Result<ScreenSize, CaptureError>;
    fn capture_full(&self) -> Result<RgbaImage, CaptureError>;
    fn capture_area(&self, region: SelectionRegion) -> Result<RgbaImage, CaptureError>;
}

/// System implementation backed by the primary monitor via `xcap`.
#[derive(Default)]
pub struct XcapBackend;

impl XcapBackend {
    fn primary_monitor() -> Result<xcap::Monitor, CaptureError> {
        let monitors = xcap::Monitor::all().map_err(|err| CaptureError::CaptureFailed {
            message: format!("monitor enumeration failed: {err}"),
        })?;

        let mut first = None;
        for monitor in monitors {
            if monitor.is_primary().unwrap_or(false) {
                return Ok(monitor);
            }
            first.get_or_insert(monitor);
        }
        // no monitor reports primary on some compositors
        first.ok_or(CaptureError::NoMonitor)
    }
}

impl CaptureBackend for XcapBackend {
    fn screen_size(&self) -> Result<ScreenSize, CaptureError> {
        let monitor = Self::primary_monitor()?;
        let width = monitor
            .width()
            .map_err(|err| CaptureError::ScreenSizeUnavailable {
                message: err.to_string(),
            })?;
        let height = monitor
            .height()
            .map_err(|err| CaptureError::ScreenSizeUnavailable {
                message: err.to_string(),
            })?;
        Ok(ScreenSize::new(width, height))
    }

    fn capture_full(&self) -> Result<RgbaImage, CaptureError> {
        Self::primary_monitor()?
            .capture_image()
            .map_err(|err| CaptureError::CaptureFailed {
                message: err.to_string(),
            })
    }

    fn capture_area(&self, region: SelectionRegion) -> Result<RgbaImage, CaptureError> {
        let full = self.capture_full()?;
        crop_to_region(&full, region)
    }
}

/// Current primary-display resolution, with a fixed fallback when the query
/// fails.
pub fn screen_size() -> ScreenSize {
    screen_size_with(&XcapBackend)
}

pub fn screen_size_with<B: CaptureBackend>(backend: &B) -> ScreenSize {
    match backend.screen_size() {
        Ok(size) => size,
        Err(err) => {
            tracing::warn!(?err, "screen size query failed; using fallback");
            FALLBACK_SCREEN_SIZE
        }
    }
}

pub fn capture_full_screen() -> Result<RgbaImage, CaptureError> {
    capture_full_screen_with(&XcapBackend)
}

pub fn capture_full_screen_with<B: CaptureBackend>(backend: &B) -> Result<RgbaImage, CaptureError> {
    backend.capture_full()
}

/// Capture the rectangle spanned by two corner points, in either order.
/// Validation failures return without touching the platform primitive.
pub fn capture_region(a: ScreenPoint, b: ScreenPoint) -> Result<RgbaImage, CaptureError> {
    capture_region_with(&XcapBackend, a, b)
}

pub fn capture_region_with<B: CaptureBackend>(
    backend: &B,
    a: ScreenPoint,
    b: ScreenPoint,
) -> Result<RgbaImage, CaptureError> {
    let region = validate_region(a, b, screen_size_with(backend))?;
    backend.capture_area(region)
}

/// Normalize two corners and check the result against the screen bounds and
/// the minimum-size threshold.
pub fn validate_region(
    a: ScreenPoint,
    b: ScreenPoint,
    screen: ScreenSize,
) -> Result<SelectionRegion, CaptureError> {
    let region = SelectionRegion::from_corners(a, b).ok_or(CaptureError::EmptySelection)?;
    if !region.meets_minimum_size() {
        return Err(CaptureError::SelectionTooSmall {
            width: region.width,
            height: region.height,
        });
    }
    if !region.fits_within(screen) {
        return Err(CaptureError::SelectionOutOfBounds {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            screen_width: screen.width,
            screen_height: screen.height,
        });
    }
    Ok(region)
}

fn crop_to_region(full: &RgbaImage, region: SelectionRegion) -> Result<RgbaImage, CaptureError> {
    // validated against the reported screen size upstream; re-check against
    // the actual frame, which can differ on scaled displays
    let out_of_bounds = || CaptureError::SelectionOutOfBounds {
        x: region.x,
        y: region.y,
        width: region.width,
        height: region.height,
        screen_width: full.width(),
        screen_height: full.height(),
    };

    let x = u32::try_from(region.x).map_err(|_| out_of_bounds())?;
    let y = u32::try_from(region.y).map_err(|_| out_of_bounds())?;
    let right = x.checked_add(region.width).ok_or_else(out_of_bounds)?;
    let bottom = y.checked_add(region.height).ok_or_else(out_of_bounds)?;
    if right > full.width() || bottom > full.height() {
        return Err(out_of_bounds());
    }

    Ok(image::imageops::crop_imm(full, x, y, region.width, region.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeCaptureBackend {
        screen: ScreenSize,
        fail_screen_size: bool,
        fail_capture: bool,
        calls: RefCell<Vec<String>>,
    }

    impl FakeCaptureBackend {
        fn new(screen: ScreenSize) -> Self {
            Self {
                screen,
                fail_screen_size: false,
                fail_capture: false,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn frame(width: u32, height: u32) -> RgbaImage {
            RgbaImage::from_pixel(width, height, image::Rgba([40, 60, 80, 255]))
        }
    }

    impl CaptureBackend for FakeCaptureBackend {
        fn screen_size(&self) -> Result<ScreenSize, CaptureError> {
            self.calls.borrow_mut().push("screen_size".to_string());
            if self.fail_screen_size {
                return Err(CaptureError::ScreenSizeUnavailable {
                    message: "simulated query failure".to_string(),
                });
            }
            Ok(self.screen)
        }

        fn capture_full(&self) -> Result<RgbaImage, CaptureError> {
            self.calls.borrow_mut().push("capture_full".to_string());
            if self.fail_capture {
                return Err(CaptureError::CaptureFailed {
                    message: "simulated capture failure".to_string(),
                });
            }
            Ok(Self::frame(self.screen.width, self.screen.height))
        }

        fn capture_area(&self, region: SelectionRegion) -> Result<RgbaImage, CaptureError> {
            self.calls
                .borrow_mut()
                .push(format!("capture_area {}x{}", region.width, region.height));
            if self.fail_capture {
                return Err(CaptureError::CaptureFailed {
                    message: "simulated capture failure".to_string(),
                });
            }
            Ok(Self::frame(region.width, region.height))
        }
    }

    #[test]
    fn capture_full_screen_returns_the_backend_frame() {
        let backend = FakeCaptureBackend::new(ScreenSize::new(1280, 720));
        let frame = capture_full_screen_with(&backend).expect("capture should succeed");
        assert_eq!(frame.dimensions(), (1280, 720));
        assert_eq!(backend.calls(), vec!["capture_full".to_string()]);
    }

    #[test]
    fn capture_region_is_corner_order_independent() {
        let backend = FakeCaptureBackend::new(ScreenSize::new(1920, 1080));
        let a = ScreenPoint::new(300, 400);
        let b = ScreenPoint::new(100, 150);

        let forward = capture_region_with(&backend, a, b).expect("region should capture");
        let reverse = capture_region_with(&backend, b, a).expect("region should capture");

        assert_eq!(forward.dimensions(), (200, 250));
        assert_eq!(reverse.dimensions(), (200, 250));
    }

    #[test]
    fn capture_region_rejects_small_selections_without_capturing() {
        let backend = FakeCaptureBackend::new(ScreenSize::new(1920, 1080));
        let err = capture_region_with(
            &backend,
            ScreenPoint::new(100, 100),
            ScreenPoint::new(103, 102),
        )
        .expect_err("3x2 selection should be rejected");

        assert!(matches!(
            err,
            CaptureError::SelectionTooSmall {
                width: 3,
                height: 2
            }
        ));
        assert_eq!(backend.calls(), vec!["screen_size".to_string()]);
    }

    #[test]
    fn capture_region_rejects_out_of_bounds_selections_without_capturing() {
        let backend = FakeCaptureBackend::new(ScreenSize::new(800, 600));
        let err = capture_region_with(
            &backend,
            ScreenPoint::new(700, 500),
            ScreenPoint::new(900, 700),
        )
        .expect_err("selection past the screen edge should be rejected");

        assert!(matches!(err, CaptureError::SelectionOutOfBounds { .. }));
        assert_eq!(backend.calls(), vec!["screen_size".to_string()]);
    }

    #[test]
    fn capture_region_rejects_empty_selections() {
        let backend = FakeCaptureBackend::new(ScreenSize::new(800, 600));
        let point = ScreenPoint::new(10, 10);
        let err = capture_region_with(&backend, point, point)
            .expect_err("zero-area selection should be rejected");
        assert!(matches!(err, CaptureError::EmptySelection));
    }

    #[test]
    fn screen_size_query_failure_falls_back() {
        let mut backend = FakeCaptureBackend::new(ScreenSize::new(800, 600));
        backend.fail_screen_size = true;
        assert_eq!(screen_size_with(&backend), FALLBACK_SCREEN_SIZE);
    }

    #[test]
    fn validate_region_accepts_screen_edge_selections() {
        let screen = ScreenSize::new(1920, 1080);
        let region = validate_region(
            ScreenPoint::new(0, 0),
            ScreenPoint::new(1920, 1080),
            screen,
        )
        .expect("full-screen selection should validate");
        assert_eq!(region, SelectionRegion::new(0, 0, 1920, 1080));
    }

    #[test]
    fn crop_to_region_extracts_the_requested_rectangle() {
        let full = FakeCaptureBackend::frame(100, 80);
        let cropped = crop_to_region(&full, SelectionRegion::new(10, 20, 30, 40))
            .expect("in-bounds crop should succeed");
        assert_eq!(cropped.dimensions(), (30, 40));
    }

    #[test]
    fn crop_to_region_rejects_rectangles_past_the_frame() {
        let full = FakeCaptureBackend::frame(100, 80);
        let err = crop_to_region(&full, SelectionRegion::new(90, 70, 20, 20))
            .expect_err("crop past the frame should fail");
        assert!(matches!(err, CaptureError::SelectionOutOfBounds { .. }));
    }
}
