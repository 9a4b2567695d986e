//! Fonts for label rendering
//!
//! [`FontResolver`] looks for a TrueType font on the host and falls back to
//! the built-in bitmap font, so a usable font is always available.

use std::path::PathBuf;

use ab_glyph::{point, Font, FontArc, Glyph, Point, PxScale, ScaleFont};
use image::GrayImage;

use super::{bitmap, blend};

/// Ink bounding box of a string drawn with its origin at (0, 0)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl TextBounds {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Line metrics. `descent` is the distance below the baseline, positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalMetrics {
    pub ascent: i32,
    pub descent: i32,
}

/// A font at a fixed size
pub trait LabelFont {
    fn measure(&self, text: &str) -> TextBounds;

    /// `None` when the font has no usable ascent/descent
    fn vertical_metrics(&self) -> Option<VerticalMetrics>;

    /// Draw `text` with its origin (top of the line box) at (x, y)
    fn draw(&self, canvas: &mut GrayImage, text: &str, x: i32, y: i32, luma: u8);
}

/// Hands out fonts by size
pub trait FontProvider {
    fn font_at(&self, size: u32) -> Box<dyn LabelFont>;
}

/// Resolves the label font once at startup
#[derive(Clone)]
pub struct FontResolver {
    truetype: Option<FontArc>,
}

impl FontResolver {
    /// Try `preferred` first, then the platform fonts
    pub fn new(preferred: Option<&str>) -> Self {
        let candidates = preferred
            .map(PathBuf::from)
            .into_iter()
            .chain(platform_font_paths());

        for path in candidates {
            let Ok(data) = std::fs::read(&path) else {
                continue;
            };
            match FontArc::try_from_vec(data) {
                Ok(font) => {
                    tracing::info!("Using font: {}", path.display());
                    return Self {
                        truetype: Some(font),
                    };
                }
                Err(e) => tracing::warn!("Could not load font {}: {}", path.display(), e),
            }
        }

        tracing::warn!("No TrueType font found, using the built-in bitmap font");
        Self::builtin()
    }

    pub fn builtin() -> Self {
        Self { truetype: None }
    }

    pub fn is_truetype(&self) -> bool {
        self.truetype.is_some()
    }
}

impl FontProvider for FontResolver {
    fn font_at(&self, size: u32) -> Box<dyn LabelFont> {
        match &self.truetype {
            Some(font) => Box::new(TrueTypeFont::new(font.clone(), size)),
            None => Box::new(BitmapFont::new(size)),
        }
    }
}

fn platform_font_paths() -> Vec<PathBuf> {
    if cfg!(windows) {
        let fonts_dir = std::env::var_os("WINDIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("C:\\Windows"))
            .join("Fonts");
        ["arial.ttf", "arialbd.ttf", "calibri.ttf", "calibrib.ttf", "segoeui.ttf", "segoeuib.ttf"]
            .iter()
            .map(|name| fonts_dir.join(name))
            .collect()
    } else {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            "arial.ttf",
            "calibri.ttf",
            "DejaVuSans.ttf",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
}

/// TrueType/OpenType font where `size` is the em size in pixels
pub struct TrueTypeFont {
    font: FontArc,
    scale: PxScale,
}

impl TrueTypeFont {
    pub fn new(font: FontArc, size: u32) -> Self {
        // PxScale is the ascent-to-descent height, not the em size
        let scale = match font.units_per_em() {
            Some(units_per_em) => {
                PxScale::from(size as f32 * font.height_unscaled() / units_per_em)
            }
            None => PxScale::from(size as f32),
        };
        Self { font, scale }
    }

    fn layout(&self, text: &str, origin: Point) -> Vec<Glyph> {
        let scaled = self.font.as_scaled(self.scale);
        let baseline = origin.y + scaled.ascent();
        let mut caret = origin.x;
        let mut previous = None;

        text.chars()
            .map(|c| {
                let id = scaled.glyph_id(c);
                if let Some(prev) = previous {
                    caret += scaled.kern(prev, id);
                }
                let glyph = id.with_scale_and_position(self.scale, point(caret, baseline));
                caret += scaled.h_advance(id);
                previous = Some(id);
                glyph
            })
            .collect()
    }
}

impl LabelFont for TrueTypeFont {
    fn measure(&self, text: &str) -> TextBounds {
        let mut bounds: Option<(f32, f32, f32, f32)> = None;
        for glyph in self.layout(text, point(0.0, 0.0)) {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let px = outlined.px_bounds();
            bounds = Some(match bounds {
                Some((l, t, r, b)) => (l.min(px.min.x), t.min(px.min.y), r.max(px.max.x), b.max(px.max.y)),
                None => (px.min.x, px.min.y, px.max.x, px.max.y),
            });
        }

        bounds
            .map(|(l, t, r, b)| TextBounds {
                left: l.floor() as i32,
                top: t.floor() as i32,
                right: r.ceil() as i32,
                bottom: b.ceil() as i32,
            })
            .unwrap_or_default()
    }

    fn vertical_metrics(&self) -> Option<VerticalMetrics> {
        let scaled = self.font.as_scaled(self.scale);
        Some(VerticalMetrics {
            ascent: scaled.ascent().round() as i32,
            descent: (-scaled.descent()).round() as i32,
        })
    }

    fn draw(&self, canvas: &mut GrayImage, text: &str, x: i32, y: i32, luma: u8) {
        for glyph in self.layout(text, point(x as f32, y as f32)) {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let px = outlined.px_bounds();
            let (left, top) = (px.min.x as i32, px.min.y as i32);
            outlined.draw(|gx, gy, coverage| {
                blend(canvas, left + gx as i32, top + gy as i32, luma, coverage);
            });
        }
    }
}

/// Built-in 5x7 dot font, scaled so each dot is `size / 8` pixels.
///
/// Has no vertical metrics, so labels using it are centered on the raw
/// bounding box.
pub struct BitmapFont {
    dot: i32,
}

impl BitmapFont {
    pub fn new(size: u32) -> Self {
        Self {
            dot: (size / 8).max(1) as i32,
        }
    }
}

impl LabelFont for BitmapFont {
    fn measure(&self, text: &str) -> TextBounds {
        let chars = text.chars().count() as i32;
        if chars == 0 {
            return TextBounds::default();
        }
        TextBounds {
            left: 0,
            top: 0,
            right: (chars * bitmap::ADVANCE - 1) * self.dot,
            bottom: bitmap::ROWS * self.dot,
        }
    }

    fn vertical_metrics(&self) -> Option<VerticalMetrics> {
        None
    }

    fn draw(&self, canvas: &mut GrayImage, text: &str, x: i32, y: i32, luma: u8) {
        for (index, c) in text.chars().enumerate() {
            let cell_x = x + index as i32 * bitmap::ADVANCE * self.dot;
            for (row, bits) in bitmap::glyph(c).iter().enumerate() {
                for col in 0..bitmap::COLUMNS {
                    if bits & (1 << (bitmap::COLUMNS - 1 - col)) == 0 {
                        continue;
                    }
                    let left = cell_x + col * self.dot;
                    let top = y + row as i32 * self.dot;
                    for dy in 0..self.dot {
                        for dx in 0..self.dot {
                            blend(canvas, left + dx, top + dy, luma, 1.0);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_bitmap_measure() {
        let font = BitmapFont::new(120);
        let bounds = font.measure("Ali");
        assert_eq!(bounds, TextBounds { left: 0, top: 0, right: 17 * 15, bottom: 105 });
        assert_eq!(font.measure(""), TextBounds::default());
        assert!(font.vertical_metrics().is_none());
    }

    #[test]
    fn test_bitmap_minimum_dot() {
        let font = BitmapFont::new(3);
        assert_eq!(font.measure("A").width(), 5);
    }

    #[test]
    fn test_bitmap_draws_glyph_dots() {
        let font = BitmapFont::new(8);
        let mut canvas = GrayImage::from_pixel(6, 7, Luma([255]));
        font.draw(&mut canvas, "I", 0, 0, 0);
        // top row of "I" is .###.
        assert_eq!(canvas.get_pixel(0, 0).0, [255]);
        assert_eq!(canvas.get_pixel(1, 0).0, [0]);
        assert_eq!(canvas.get_pixel(3, 0).0, [0]);
        assert_eq!(canvas.get_pixel(4, 0).0, [255]);
        // stem
        assert_eq!(canvas.get_pixel(2, 3).0, [0]);
        assert_eq!(canvas.get_pixel(1, 3).0, [255]);
    }

    #[test]
    fn test_resolver_always_yields_a_font() {
        let resolver = FontResolver::new(Some("/nonexistent/font.ttf"));
        let font = resolver.font_at(60);
        assert!(font.measure("Ali Amrani").width() > 0);

        let builtin = FontResolver::builtin();
        assert!(!builtin.is_truetype());
        assert_eq!(builtin.font_at(60).measure("A").height(), 49);
    }
}
