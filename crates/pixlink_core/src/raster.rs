//! # Rasterizer Seam
//!
//! Pixel drawing and the display driver live outside this crate. The render
//! side talks to them through [`Rasterizer`], once per frame, after every
//! queued command has been applied.

use crate::sprite::BlendMode;

/// RGB565 color.
pub type Color = u16;

/// Drawing target. Calls are synchronous and cannot fail.
pub trait Rasterizer {
    /// Fills the whole target.
    fn clear(&mut self, color: Color);

    /// Fills a rectangle.
    fn draw_rect(&mut self, x: i16, y: i16, width: u8, height: u8, color: Color);

    /// Draws a line between two points.
    fn draw_line(&mut self, x0: i16, y0: i16, x1: i16, y1: i16, color: Color);

    /// Draws a circle outline.
    fn draw_circle(&mut self, cx: i16, cy: i16, radius: u8, color: Color);

    /// Copies one texture frame (RGB565, row-major) to the target.
    ///
    /// The default implementation fills the box with the first pixel.
    fn blit(&mut self, blit: &Blit<'_>) {
        let color: Color = blit.pixels.get(..2).map_or(0, bytemuck::pod_read_unaligned);
        self.draw_rect(blit.x, blit.y, blit.width, blit.height, color);
    }

    /// Pushes the finished frame to the display.
    fn present(&mut self);
}

/// One textured draw.
#[derive(Clone, Copy, Debug)]
pub struct Blit<'a> {
    /// Screen X.
    pub x: i16,
    /// Screen Y.
    pub y: i16,
    /// Width in pixels.
    pub width: u8,
    /// Height in pixels.
    pub height: u8,
    /// Frame bytes.
    pub pixels: &'a [u8],
    /// Compositing mode.
    pub blend: BlendMode,
    /// Opacity.
    pub alpha: u8,
}

/// Discards everything. Used when no display is attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRasterizer;

impl Rasterizer for NullRasterizer {
    fn clear(&mut self, _color: Color) {}
    fn draw_rect(&mut self, _x: i16, _y: i16, _width: u8, _height: u8, _color: Color) {}
    fn draw_line(&mut self, _x0: i16, _y0: i16, _x1: i16, _y1: i16, _color: Color) {}
    fn draw_circle(&mut self, _cx: i16, _cy: i16, _radius: u8, _color: Color) {}
    fn blit(&mut self, _blit: &Blit<'_>) {}
    fn present(&mut self) {}
}

/// A recorded draw call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawCall {
    /// [`Rasterizer::clear`].
    Clear(Color),
    /// [`Rasterizer::draw_rect`].
    Rect {
        /// Screen X.
        x: i16,
        /// Screen Y.
        y: i16,
        /// Width.
        width: u8,
        /// Height.
        height: u8,
        /// Fill color.
        color: Color,
    },
    /// [`Rasterizer::draw_line`].
    Line(i16, i16, i16, i16, Color),
    /// [`Rasterizer::draw_circle`].
    Circle(i16, i16, u8, Color),
    /// [`Rasterizer::blit`].
    Blit {
        /// Screen X.
        x: i16,
        /// Screen Y.
        y: i16,
        /// Bytes copied.
        len: usize,
        /// Opacity.
        alpha: u8,
    },
    /// [`Rasterizer::present`].
    Present,
}

/// Keeps every call for inspection.
#[derive(Clone, Debug, Default)]
pub struct RecordingRasterizer {
    /// Calls in order.
    pub calls: Vec<DrawCall>,
}

impl RecordingRasterizer {
    /// Number of `present` calls so far.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, DrawCall::Present)).count()
    }
}

impl Rasterizer for RecordingRasterizer {
    fn clear(&mut self, color: Color) {
        self.calls.push(DrawCall::Clear(color));
    }

    fn draw_rect(&mut self, x: i16, y: i16, width: u8, height: u8, color: Color) {
        self.calls.push(DrawCall::Rect { x, y, width, height, color });
    }

    fn draw_line(&mut self, x0: i16, y0: i16, x1: i16, y1: i16, color: Color) {
        self.calls.push(DrawCall::Line(x0, y0, x1, y1, color));
    }

    fn draw_circle(&mut self, cx: i16, cy: i16, radius: u8, color: Color) {
        self.calls.push(DrawCall::Circle(cx, cy, radius, color));
    }

    fn blit(&mut self, blit: &Blit<'_>) {
        self.calls.push(DrawCall::Blit { x: blit.x, y: blit.y, len: blit.pixels.len(), alpha: blit.alpha });
    }

    fn present(&mut self) {
        self.calls.push(DrawCall::Present);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RectsOnly(Vec<Color>);

    impl Rasterizer for RectsOnly {
        fn clear(&mut self, _color: Color) {}
        fn draw_rect(&mut self, _x: i16, _y: i16, _w: u8, _h: u8, color: Color) {
            self.0.push(color);
        }
        fn draw_line(&mut self, _x0: i16, _y0: i16, _x1: i16, _y1: i16, _color: Color) {}
        fn draw_circle(&mut self, _cx: i16, _cy: i16, _radius: u8, _color: Color) {}
        fn present(&mut self) {}
    }

    #[test]
    fn test_default_blit_fills_with_first_pixel() {
        let pixels = 0xF800u16.to_ne_bytes();
        let mut target = RectsOnly(Vec::new());
        target.blit(&Blit { x: 0, y: 0, width: 1, height: 1, pixels: &pixels, blend: BlendMode::None, alpha: 255 });
        assert_eq!(target.0, vec![0xF800]);
    }

    #[test]
    fn test_recording_counts_frames() {
        let mut rec = RecordingRasterizer::default();
        rec.clear(0);
        rec.draw_line(0, 0, 5, 5, 1);
        rec.draw_circle(3, 3, 2, 1);
        rec.present();
        rec.present();
        assert_eq!(rec.frames(), 2);
        assert_eq!(rec.calls[1], DrawCall::Line(0, 0, 5, 5, 1));
    }
}
