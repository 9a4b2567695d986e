//! Badge label composition
//!
//! Lays a person's full name out on a fixed-size grayscale canvas. The font
//! starts large and shrinks in fixed steps until the text fits the drawable
//! box, then the text is centered and drawn in black.

mod bitmap;
mod font;

pub use font::{
    BitmapFont, FontProvider, FontResolver, LabelFont, TextBounds, TrueTypeFont, VerticalMetrics,
};

use image::{GrayImage, Luma};

use crate::config::LabelConfig;

const WHITE: u8 = 255;
const BLACK: u8 = 0;

/// Canvas geometry and font sizing steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelLayout {
    pub width: u32,
    pub height: u32,
    /// Share of the canvas width the text may use
    pub max_width_ratio: f64,
    /// Share of the canvas height the text may use
    pub max_height_ratio: f64,
    pub start_size: u32,
    pub min_size: u32,
    pub step: u32,
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self {
            width: 991,
            height: 306,
            max_width_ratio: 0.95,
            max_height_ratio: 0.90,
            start_size: 120,
            min_size: 20,
            step: 5,
        }
    }
}

impl From<&LabelConfig> for LabelLayout {
    fn from(config: &LabelConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            start_size: config.start_font_size,
            min_size: config.min_font_size,
            step: config.font_step,
            ..Self::default()
        }
    }
}

impl LabelLayout {
    pub fn max_text_width(&self) -> i32 {
        (self.width as f64 * self.max_width_ratio).floor() as i32
    }

    pub fn max_text_height(&self) -> i32 {
        (self.height as f64 * self.max_height_ratio).floor() as i32
    }

    fn fits(&self, bounds: &TextBounds) -> bool {
        bounds.width() <= self.max_text_width() && bounds.height() <= self.max_text_height()
    }
}

/// A rendered label and the layout decisions behind it
pub struct ComposedLabel {
    pub image: GrayImage,
    pub text: String,
    pub font_size: u32,
    /// Draw origin of the text
    pub x: i32,
    pub y: i32,
    pub bounds: TextBounds,
}

/// Render `first_name last_name` centered on a white canvas.
///
/// Never fails: when nothing fits, the minimum size is used and the text
/// may overflow the canvas.
pub fn compose_label(
    first_name: &str,
    last_name: &str,
    layout: &LabelLayout,
    fonts: &dyn FontProvider,
) -> ComposedLabel {
    let text = format!("{} {}", first_name, last_name);
    let step = layout.step.max(1);

    let mut size = layout.start_size;
    let mut fitting = None;
    while size > layout.min_size {
        let candidate = fonts.font_at(size);
        if layout.fits(&candidate.measure(&text)) {
            fitting = Some(candidate);
            break;
        }
        size = size.saturating_sub(step);
    }

    let (size, font) = match fitting {
        Some(font) => (size, font),
        None => (layout.min_size, fonts.font_at(layout.min_size)),
    };

    let bounds = font.measure(&text);
    let x = (layout.width as i32 - bounds.width()).div_euclid(2);

    // Center the ink using ascent/descent when the font reports them
    let visual_height = font
        .vertical_metrics()
        .map(|m| m.ascent - m.descent)
        .unwrap_or_else(|| bounds.height());
    let y = (layout.height as i32 - visual_height).div_euclid(2) - bounds.top;

    let mut image = GrayImage::from_pixel(layout.width, layout.height, Luma([WHITE]));
    font.draw(&mut image, &text, x, y, BLACK);

    tracing::debug!("Using font size {} for '{}'", size, text);

    ComposedLabel {
        image,
        text,
        font_size: size,
        x,
        y,
        bounds,
    }
}

/// Mix `luma` into the pixel at (x, y) by `coverage`, ignoring pixels off the canvas
pub(crate) fn blend(canvas: &mut GrayImage, x: i32, y: i32, luma: u8, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32 {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    let Luma([current]) = *canvas.get_pixel(x as u32, y as u32);
    let value = current as f32 + (luma as f32 - current as f32) * coverage;
    canvas.put_pixel(x as u32, y as u32, Luma([value.round() as u8]));
}
