// Raster primitives for the chart renderer
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};

pub const GRID: Rgb<u8> = Rgb([225, 225, 225]);
pub const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
pub const TEXT: Rgb<u8> = Rgb([30, 30, 30]);

/// Side of a glyph cell in pixels at scale 1.
pub const GLYPH: u32 = 8;

/// Plot rectangle inside the canvas and the data range mapped onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotArea {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    x_min: f64,
    x_span: f64,
    y_min: f64,
    y_span: f64,
}

impl PlotArea {
    /// Lays out the plot rectangle for a canvas and fits it to `points`.
    /// The y range is padded by 5% on each side; flat ranges get a unit span.
    pub fn for_canvas(width: u32, height: u32, points: &[(f64, f64)]) -> Self {
        let left = width / 9;
        let right = width.saturating_sub(width / 40).saturating_sub(1).max(left);
        let top = height / 10;
        let bottom = height.saturating_sub(height / 8).saturating_sub(1).max(top);

        let (x_min, x_max) = bounds(points.iter().map(|p| p.0));
        let (y_min, y_max) = bounds(points.iter().map(|p| p.1));
        let x_span = if x_max > x_min { x_max - x_min } else { 1.0 };
        let (y_min, y_span) = if y_max > y_min {
            let pad = (y_max - y_min) * 0.05;
            (y_min - pad, (y_max - y_min) + 2.0 * pad)
        } else {
            (y_min - 0.5, 1.0)
        };

        PlotArea { left, top, right, bottom, x_min, x_span, y_min, y_span }
    }

    pub fn to_pixel(&self, (x, y): (f64, f64)) -> (i64, i64) {
        let w = f64::from(self.right - self.left);
        let h = f64::from(self.bottom - self.top);
        let px = f64::from(self.left) + (x - self.x_min) / self.x_span * w;
        let py = f64::from(self.bottom) - (y - self.y_min) / self.y_span * h;
        (px.round() as i64, py.round() as i64)
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo.is_finite() && hi.is_finite() {
        (lo, hi)
    } else {
        (0.0, 0.0)
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u64) < u64::from(img.width()) && (y as u64) < u64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, color);
    }
}

pub fn draw_horizontal_line(img: &mut RgbImage, y: u32, x1: u32, x2: u32, color: Rgb<u8>) {
    let (start, end) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
    for x in start..=end {
        put(img, i64::from(x), i64::from(y), color);
    }
}

pub fn draw_vertical_line(img: &mut RgbImage, x: u32, y1: u32, y2: u32, color: Rgb<u8>) {
    let (start, end) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
    for y in start..=end {
        put(img, i64::from(x), i64::from(y), color);
    }
}

/// Evenly spaced horizontal guides between the top and bottom of the area.
pub fn draw_grid(img: &mut RgbImage, area: &PlotArea, lines: u32, color: Rgb<u8>) {
    let h = area.bottom - area.top;
    for i in 1..lines {
        let y = area.top + h * i / lines;
        draw_horizontal_line(img, y, area.left, area.right, color);
    }
}

pub fn draw_frame(img: &mut RgbImage, area: &PlotArea, color: Rgb<u8>) {
    draw_horizontal_line(img, area.top, area.left, area.right, color);
    draw_horizontal_line(img, area.bottom, area.left, area.right, color);
    draw_vertical_line(img, area.left, area.top, area.bottom, color);
    draw_vertical_line(img, area.right, area.top, area.bottom, color);
}

/// Bresenham segment, thickened to `stroke` pixels.
pub fn draw_segment(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), stroke: u32, color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let (x1, y1) = to;
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let half = i64::from(stroke / 2);
    let extra = i64::from(stroke) - half;

    loop {
        for oy in -half..extra {
            for ox in -half..extra {
                put(img, x + ox, y + oy, color);
            }
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn fill_block(img: &mut RgbImage, x: i64, y: i64, scale: u32, color: Rgb<u8>) {
    let scale = i64::from(scale);
    for dy in 0..scale {
        for dx in 0..scale {
            put(img, x + dx, y + dy, color);
        }
    }
}

pub fn text_width(text: &str, scale: u32) -> u32 {
    let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    chars.saturating_mul(GLYPH * scale)
}

/// Left to right, `(x, y)` being the top-left corner of the first glyph.
pub fn draw_text(img: &mut RgbImage, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
    let cell = i64::from(GLYPH * scale);
    let step = i64::from(scale);
    for (k, c) in text.chars().enumerate() {
        let origin = x + k as i64 * cell;
        for (row, bits) in glyph(c).into_iter().enumerate() {
            for bit in 0..8i64 {
                if (bits >> bit) & 1 == 1 {
                    fill_block(img, origin + bit * step, y + row as i64 * step, scale, color);
                }
            }
        }
    }
}

/// Bottom to top (rotated a quarter turn counter-clockwise), `(x, y)` being
/// the bottom-left corner of the first glyph.
pub fn draw_text_vertical(img: &mut RgbImage, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
    let cell = i64::from(GLYPH * scale);
    let step = i64::from(scale);
    for (k, c) in text.chars().enumerate() {
        let origin = y - k as i64 * cell;
        for (row, bits) in glyph(c).into_iter().enumerate() {
            for bit in 0..8i64 {
                if (bits >> bit) & 1 == 1 {
                    fill_block(img, x + row as i64 * step, origin - (bit + 1) * step, scale, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    #[test]
    fn test_extremes_map_to_area_edges() {
        let area = PlotArea::for_canvas(140, 100, &[(0.0, 10.0), (10.0, 20.0)]);
        let (lx, _) = area.to_pixel((0.0, 10.0));
        let (rx, _) = area.to_pixel((10.0, 20.0));
        assert_eq!(lx, i64::from(area.left));
        assert_eq!(rx, i64::from(area.right));
    }

    #[test]
    fn test_padding_keeps_values_inside() {
        let area = PlotArea::for_canvas(140, 100, &[(0.0, 10.0), (1.0, 20.0)]);
        let (_, low) = area.to_pixel((0.0, 10.0));
        let (_, high) = area.to_pixel((1.0, 20.0));
        assert!(low < i64::from(area.bottom));
        assert!(high > i64::from(area.top));
        assert!(high < low);
    }

    #[test]
    fn test_flat_series_centered() {
        let area = PlotArea::for_canvas(140, 100, &[(0.0, 5.0), (0.0, 5.0)]);
        let (_, y) = area.to_pixel((0.0, 5.0));
        let mid = i64::from(area.top + area.bottom) / 2;
        assert!((y - mid).abs() <= 1);
    }

    #[test]
    fn test_segment_endpoints_painted() {
        let mut img = RgbImage::from_pixel(20, 20, WHITE);
        draw_segment(&mut img, (1, 1), (15, 9), 1, RED);
        assert_eq!(*img.get_pixel(1, 1), RED);
        assert_eq!(*img.get_pixel(15, 9), RED);
    }

    #[test]
    fn test_segment_clipped_outside_canvas() {
        let mut img = RgbImage::from_pixel(10, 10, WHITE);
        draw_segment(&mut img, (-5, -5), (20, 20), 3, RED);
        assert_eq!(*img.get_pixel(5, 5), RED);
    }

    #[test]
    fn test_frame_corners() {
        let mut img = RgbImage::from_pixel(140, 100, WHITE);
        let area = PlotArea::for_canvas(140, 100, &[(0.0, 0.0), (1.0, 1.0)]);
        draw_frame(&mut img, &area, AXIS);
        assert_eq!(*img.get_pixel(area.left, area.top), AXIS);
        assert_eq!(*img.get_pixel(area.right, area.bottom), AXIS);
    }

    fn painted(img: &RgbImage, color: Rgb<u8>) -> Vec<(u32, u32)> {
        img.enumerate_pixels()
            .filter(|(_, _, p)| **p == color)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("abc", 1), 24);
        assert_eq!(text_width("abc", 2), 48);
        assert_eq!(text_width("", 3), 0);
    }

    #[test]
    fn test_text_stays_in_its_cells() {
        let mut img = RgbImage::from_pixel(40, 20, WHITE);
        draw_text(&mut img, 2, 3, "Hi", 1, RED);
        let pixels = painted(&img, RED);
        assert!(!pixels.is_empty());
        assert!(pixels.iter().all(|(x, y)| (2..18).contains(x) && (3..11).contains(y)));
    }

    #[test]
    fn test_scale_enlarges_glyphs() {
        let mut small = RgbImage::from_pixel(40, 40, WHITE);
        let mut large = RgbImage::from_pixel(40, 40, WHITE);
        draw_text(&mut small, 0, 0, "A", 1, RED);
        draw_text(&mut large, 0, 0, "A", 2, RED);
        assert_eq!(painted(&large, RED).len(), 4 * painted(&small, RED).len());
    }

    #[test]
    fn test_vertical_text_is_rotated() {
        let mut img = RgbImage::from_pixel(20, 40, WHITE);
        draw_text_vertical(&mut img, 0, 24, "Hi", 1, RED);
        let pixels = painted(&img, RED);
        assert!(!pixels.is_empty());
        assert!(pixels.iter().all(|(x, y)| *x < 8 && (8..24).contains(y)));
    }

    #[test]
    fn test_unknown_characters_still_drawn() {
        let mut img = RgbImage::from_pixel(10, 10, WHITE);
        draw_text(&mut img, 0, 0, "₿", 1, RED);
        assert!(!painted(&img, RED).is_empty());
    }
}
