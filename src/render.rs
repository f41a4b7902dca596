//! The draw seam: colors, palettes, and the [`Surface`] trait.
//!
//! Widget visuals are host territory; the core only defines the contract a
//! drawing backend must satisfy and the palette every node carries for theme
//! updates. [`Recorder`] captures draw calls for tests and host diagnostics.

use crate::geometry::Rect;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An opaque RGB color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Create a color from its channels.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// This color with every channel scaled by `factor` in `[0.0, 1.0]`.
    pub fn scaled(self, factor: f64) -> Color {
        let factor = factor.clamp(0.0, 1.0);
        Color {
            r: (f64::from(self.r) * factor) as u8,
            g: (f64::from(self.g) * factor) as u8,
            b: (f64::from(self.b) * factor) as u8,
        }
    }
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// The theme colors every node carries.
///
/// A `Theme` envelope replaces the whole palette at once; nodes never merge
/// individual fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub shade: Color,
    pub text: Color,
    pub text_dim: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            bg: Color::rgb(90, 25, 10),
            fg: Color::rgb(255, 255, 255),
            shade: Color::rgb(10, 10, 10),
            text: Color::rgb(255, 255, 255),
            text_dim: Color::rgb(155, 155, 155),
        }
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// A drawing backend, implemented by the host.
///
/// Coordinates are absolute; the scene resolves local rectangles before any
/// draw call is made.
pub trait Surface {
    /// Fill `rect` with `color`.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Outline `rect` with `color`.
    fn stroke_rect(&mut self, rect: Rect, color: Color);
}

/// A single recorded draw call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DrawOp {
    Fill { rect: Rect, color: Color },
    Stroke { rect: Rect, color: Color },
}

/// A [`Surface`] that records every draw call in order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub ops: Vec<DrawOp>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all recorded calls.
    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl Surface for Recorder {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::Fill { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::Stroke { rect, color });
    }
}

// ===========================================================================
// Tests
// ===========================================================================
