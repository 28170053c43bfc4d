//! Notch geometry and pointer hit testing for the overlay panel.
//!
//! Two coordinate spaces are involved:
//! - screen space: global display coordinates, origin bottom-left, Y up.
//!   Used with the global pointer position.
//! - window space: the overlay window's own coordinates, origin bottom-left,
//!   Y up. The window spans the display width and sits at the top of the
//!   screen, so the panel hangs from `window_height`.
//!
//! Everything here is pure and recomputed on every pointer event; there is
//! no caching.

use crate::display::DisplayMetrics;
use serde::{Deserialize, Serialize};

// ============================================================================
// Calibration Constants
// ============================================================================
//
// Tuned by eye against the rendered shapes. They cannot be derived from the
// display metrics.

/// Pill dimensions used on displays without a physical notch.
pub const PILL_SIZE: Size = Size::new(180.0, 22.0);

/// Notch width used when the OS reports no auxiliary areas.
pub const FALLBACK_NOTCH_WIDTH: f64 = 180.0;

/// Added to the derived notch width so the drawn shape covers the cutout.
pub const NOTCH_WIDTH_CORRECTION: f64 = 4.0;

/// Requested panel width minus rendered panel width.
pub const OPENED_WIDTH_TRIM: f64 = 6.0;

/// Requested panel height minus rendered panel height.
pub const OPENED_HEIGHT_TRIM: f64 = 30.0;

/// Extra accept-region width for the opened panel's corner radii.
pub const OPENED_ACCEPT_WIDTH_ALLOWANCE: f64 = 52.0;

/// Outward hit padding (horizontal, vertical) around the pill.
///
/// The pill is much smaller than its interactive target, so it gets a wide
/// margin.
pub const PILL_HIT_PADDING: Size = Size::new(60.0, 8.0);

/// Outward hit padding (horizontal, vertical) around a physical notch.
pub const NOTCH_HIT_PADDING: Size = Size::new(10.0, 5.0);

// ============================================================================
// Primitives
// ============================================================================

/// A point in screen or window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle with its origin at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Shrinks the rect by `dx` on the left and right and `dy` on the top
    /// and bottom. Negative values grow it.
    ///
    /// A rect inset past zero collapses to zero size at its center.
    #[must_use]
    pub fn inset_by(&self, dx: f64, dy: f64) -> Self {
        let width = self.width - 2.0 * dx;
        let height = self.height - 2.0 * dy;
        if width < 0.0 || height < 0.0 {
            return Self::new(self.mid_x(), self.mid_y(), 0.0, 0.0);
        }
        Self::new(self.x + dx, self.y + dy, width, height)
    }

    /// Grows the rect outward by `padding` on every side.
    #[must_use]
    pub fn expanded_by(&self, padding: Size) -> Self {
        self.inset_by(-padding.width, -padding.height)
    }

    /// Half-open membership: the min edges are inside, the max edges are not.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }
}

// ============================================================================
// Panel State
// ============================================================================

/// Presentation state of the overlay panel.
///
/// Transitions are owned by the presentation layer; geometry only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelState {
    #[default]
    Closed,
    Popping,
    Opened,
}

// ============================================================================
// Notch Geometry
// ============================================================================

/// Canonical notch/pill geometry for one display.
///
/// A value type: compute a fresh one whenever display metrics or the
/// window height change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotchGeometry {
    /// Notch (or pill) rect in display-local coordinates. Only its size is
    /// used for hit testing.
    pub device_notch_rect: Rect,

    /// Display frame in screen coordinates.
    pub screen_rect: Rect,

    /// Height of the overlay window.
    pub window_height: f64,

    /// True when the display has no physical notch and a pill stands in.
    pub is_pill_mode: bool,
}

impl NotchGeometry {
    /// Derives the geometry for a display.
    pub fn compute(metrics: &DisplayMetrics, window_height: f64) -> Self {
        let size = metrics.notch_size();
        let screen_rect = metrics.bounds;
        let device_notch_rect =
            Rect::new((screen_rect.width - size.width) / 2.0, 0.0, size.width, size.height);

        Self {
            device_notch_rect,
            screen_rect,
            window_height,
            is_pill_mode: !metrics.has_physical_notch(),
        }
    }

    /// Hit padding for the closed shape in the current mode.
    pub fn hit_padding(&self) -> Size {
        if self.is_pill_mode {
            PILL_HIT_PADDING
        } else {
            NOTCH_HIT_PADDING
        }
    }

    /// The notch rect in screen coordinates, hanging from the top edge of
    /// the display.
    pub fn notch_screen_rect(&self) -> Rect {
        self.top_anchored(self.device_notch_rect.width, self.device_notch_rect.height)
    }

    /// The opened panel rect in screen coordinates for a requested panel size.
    ///
    /// The requested size is trimmed to what actually gets rendered.
    pub fn opened_screen_rect(&self, panel_size: Size) -> Rect {
        self.top_anchored(
            panel_size.width - OPENED_WIDTH_TRIM,
            panel_size.height - OPENED_HEIGHT_TRIM,
        )
    }

    /// Whether a screen point is on the closed notch, padding included.
    pub fn is_point_in_notch(&self, point: Point) -> bool {
        self.notch_screen_rect()
            .expanded_by(self.hit_padding())
            .contains(point)
    }

    /// Whether a screen point is on the opened panel.
    pub fn is_point_in_opened_panel(&self, point: Point, panel_size: Size) -> bool {
        self.opened_screen_rect(panel_size).contains(point)
    }

    /// Whether a screen point is off the opened panel (a click here closes it).
    pub fn is_point_outside_panel(&self, point: Point, panel_size: Size) -> bool {
        !self.is_point_in_opened_panel(point, panel_size)
    }

    /// Window-space rect that captures pointer events; everything outside
    /// passes through to the windows below.
    pub fn accept_region(&self, state: PanelState, opened_size: Size) -> Rect {
        let screen_width = self.screen_rect.width;
        match state {
            PanelState::Opened => {
                let width = opened_size.width + OPENED_ACCEPT_WIDTH_ALLOWANCE;
                let height = opened_size.height;
                Rect::new(
                    (screen_width - width) / 2.0,
                    self.window_height - height,
                    width,
                    height,
                )
            }
            PanelState::Closed | PanelState::Popping => {
                let notch = self.device_notch_rect;
                let pad = self.hit_padding();
                Rect::new(
                    (screen_width - notch.width) / 2.0 - pad.width,
                    self.window_height - notch.height - pad.height,
                    notch.width + pad.width * 2.0,
                    notch.height + pad.height * 2.0,
                )
            }
        }
    }

    /// Whether the overlay window should take a pointer event at `point`
    /// (window coordinates).
    pub fn accepts_pointer(&self, state: PanelState, opened_size: Size, point: Point) -> bool {
        self.accept_region(state, opened_size).contains(point)
    }

    fn top_anchored(&self, width: f64, height: f64) -> Rect {
        Rect::new(
            self.screen_rect.mid_x() - width / 2.0,
            self.screen_rect.max_y() - height,
            width,
            height,
        )
    }
}
