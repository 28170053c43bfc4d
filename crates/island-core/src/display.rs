//! Raw display metrics and notch detection.
//!
//! The host application enumerates displays and builds one
//! [`DisplayMetrics`] snapshot per display. Nothing in this crate talks to
//! the OS display APIs.

use crate::geometry::{Rect, Size, FALLBACK_NOTCH_WIDTH, NOTCH_WIDTH_CORRECTION, PILL_SIZE};
use serde::{Deserialize, Serialize};

/// Snapshot of one display's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    /// Top safe-area inset. Non-zero only where a camera housing cuts into the screen.
    pub inset_top: f64,

    /// Full display frame in global screen coordinates.
    pub bounds: Rect,

    /// Width of the usable area left of the notch, if the OS reports one.
    pub aux_left_width: Option<f64>,

    /// Width of the usable area right of the notch, if the OS reports one.
    pub aux_right_width: Option<f64>,

    /// Whether this is the machine's built-in panel.
    pub is_builtin: bool,
}

impl DisplayMetrics {
    /// Metrics for an external monitor: no inset, no auxiliary areas.
    pub fn external(bounds: Rect) -> Self {
        Self {
            inset_top: 0.0,
            bounds,
            aux_left_width: None,
            aux_right_width: None,
            is_builtin: false,
        }
    }

    /// Metrics for a built-in panel with a notch.
    pub fn builtin_notched(bounds: Rect, inset_top: f64, aux_left: f64, aux_right: f64) -> Self {
        Self {
            inset_top,
            bounds,
            aux_left_width: Some(aux_left),
            aux_right_width: Some(aux_right),
            is_builtin: true,
        }
    }

    /// Whether this display has a physical notch.
    ///
    /// Only the built-in display can have one, and only when it reports a
    /// top inset.
    pub fn has_physical_notch(&self) -> bool {
        self.is_builtin && self.inset_top > 0.0
    }

    /// Size of the notch on this display, or of the pill that stands in for it.
    ///
    /// Missing auxiliary areas are not an error: the width falls back to
    /// [`FALLBACK_NOTCH_WIDTH`] and the real inset height is kept.
    pub fn notch_size(&self) -> Size {
        if !self.has_physical_notch() {
            return PILL_SIZE;
        }

        let height = self.inset_top;
        match (positive(self.aux_left_width), positive(self.aux_right_width)) {
            (Some(left), Some(right)) => {
                let width = self.bounds.width - left - right + NOTCH_WIDTH_CORRECTION;
                Size::new(width.max(0.0), height)
            }
            _ => Size::new(FALLBACK_NOTCH_WIDTH, height),
        }
    }
}

fn positive(width: Option<f64>) -> Option<f64> {
    width.filter(|w| *w > 0.0)
}

/// Picks the display the overlay belongs on.
///
/// Prefers the built-in display; otherwise the first entry, which hosts
/// pass as the main display.
pub fn select_notch_display(displays: &[DisplayMetrics]) -> Option<&DisplayMetrics> {
    displays
        .iter()
        .find(|d| d.is_builtin)
        .or_else(|| displays.first())
}
