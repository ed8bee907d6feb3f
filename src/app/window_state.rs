//! Shell window geometry persistence.
//!
//! Geometry round-trips through configuration as a `"WIDTHxHEIGHT+X+Y"`
//! string. Only the size is applied at startup; position is advisory and
//! compositor-controlled under Wayland.

use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct WindowGeometry {
    pub(super) width: i32,
    pub(super) height: i32,
    pub(super) x: i32,
    pub(super) y: i32,
}

impl WindowGeometry {
    pub(super) fn parse(raw: &str) -> Option<Self> {
        let (size, position) = raw.split_once('+')?;
        let (x, y) = position.split_once('+')?;
        let (width, height) = size.split_once('x')?;

        let width = width.trim().parse::<i32>().ok()?;
        let height = height.trim().parse::<i32>().ok()?;
        if width <= 0 || height <= 0 {
            return None;
        }

        Some(Self {
            width,
            height,
            x: x.trim().parse::<i32>().ok()?,
            y: y.trim().parse::<i32>().ok()?,
        })
    }

    pub(super) fn format(&self) -> String {
        format!("{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Remembers the size the window had when first mapped, so shutdown can
/// tell a user resize apart from the content-driven initial layout.
#[derive(Debug, Default)]
pub(super) struct ResizeTracker {
    baseline: Cell<Option<(i32, i32)>>,
}

impl ResizeTracker {
    pub(super) fn record_baseline(&self, width: i32, height: i32) {
        if self.baseline.get().is_none() && width > 0 && height > 0 {
            self.baseline.set(Some((width, height)));
        }
    }

    pub(super) fn user_resized(&self, width: i32, height: i32) -> bool {
        match self.baseline.get() {
            Some(baseline) => baseline != (width, height),
            None => false,
        }
    }
}
