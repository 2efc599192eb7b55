//! Watermark geometry. Every dimension is expressed against a 1000px reference
//! and multiplied by `min(width, height) / 1000`, so the overlay keeps the same
//! proportions on any image size.

use super::assets::FontRole;
use crate::fields::WatermarkFields;
use image::Rgba;

const REFERENCE_DIMENSION: f32 = 1000.0;

const PADDING: f32 = 40.0;
const TIME_FONT: f32 = 100.0;
const LABEL_FONT: f32 = 28.0;
const BRAND_FONT: f32 = 26.0;
const TAGLINE_FONT: f32 = 16.0;

const DIVIDER_WIDTH: f32 = 5.0;
const DIVIDER_MARGIN: f32 = 20.0;
const DIVIDER_HEIGHT_RATIO: f32 = 0.85;
const DIVIDER_RISE: f32 = 6.0;

const BLOCK_VERTICAL_MARGIN: f32 = 30.0;
const BLOCK_BOTTOM_CLEARANCE: f32 = 70.0;
const LOGO_HEIGHT_RATIO: f32 = 0.9;
const LOGO_DROP: f32 = 15.0;
const LOCATION_GAP: f32 = 15.0;
const BRAND_GAP: f32 = 8.0;

/// Horizontal scale for the date, day and location lines.
pub const LABEL_CONDENSE: f32 = 0.85;
/// Horizontal scale for the tagline (> 1 widens).
pub const TAGLINE_CONDENSE: f32 = 1.15;

pub const BRAND_TIME_TEXT: &str = "Time";
pub const BRAND_MARK_TEXT: &str = "mark";
pub const TAGLINE_TEXT: &str = "100% Chân thực";

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const DIVIDER_COLOR: Rgba<u8> = Rgba([0xfd, 0xc6, 0x30, 255]);
pub const BRAND_ACCENT: Rgba<u8> = Rgba([0xff, 0xc0, 0x2d, 255]);

/// Measures the natural (uncondensed) advance width of a string.
pub trait TextMeasure {
    fn text_width(&self, role: FontRole, size: f32, text: &str) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// One line of text. `x` is the left edge of the drawn text and `middle_y`
/// the vertical centre of its em box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub text: String,
    pub role: FontRole,
    pub size: f32,
    pub condense: f32,
    pub color: Rgba<u8>,
    pub x: f32,
    pub middle_y: f32,
    /// Drawn width, condensation included.
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizes {
    pub time: f32,
    pub date: f32,
    pub day: f32,
    pub location: f32,
    pub brand: f32,
    pub tagline: f32,
}

impl FontSizes {
    fn for_scale(scale: f32) -> Self {
        Self {
            time: (TIME_FONT * scale).round(),
            date: (LABEL_FONT * scale).round(),
            day: (LABEL_FONT * scale).round(),
            location: (LABEL_FONT * scale).round(),
            brand: (BRAND_FONT * scale).round(),
            tagline: (TAGLINE_FONT * scale).round(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkLayout {
    pub scale: f32,
    pub padding: f32,
    pub sizes: FontSizes,
    /// Bounding box of the time/date/location block (not drawn).
    pub block: Bounds,
    pub logo: Option<Bounds>,
    pub divider: Bounds,
    pub time: TextPlacement,
    pub date: TextPlacement,
    pub day: TextPlacement,
    pub location: TextPlacement,
    pub brand_time: TextPlacement,
    pub brand_mark: TextPlacement,
    pub tagline: TextPlacement,
}

pub fn scale_factor(width: u32, height: u32) -> f32 {
    width.min(height) as f32 / REFERENCE_DIMENSION
}

impl WatermarkLayout {
    /// Lay out the overlay for a `width` x `height` image. `logo_size` is the
    /// natural size of the branding logo when one is available.
    pub fn compute(
        width: u32,
        height: u32,
        fields: &WatermarkFields,
        measure: &impl TextMeasure,
        logo_size: Option<(u32, u32)>,
    ) -> Self {
        let scale = scale_factor(width, height);
        let canvas_width = width as f32;
        let canvas_height = height as f32;
        let padding = PADDING * scale;
        let sizes = FontSizes::for_scale(scale);

        let time_width = measure.text_width(FontRole::Display, sizes.time, &fields.time);
        let date_width =
            measure.text_width(FontRole::Text, sizes.date, &fields.date) * LABEL_CONDENSE;
        let day_width = measure.text_width(FontRole::Text, sizes.day, &fields.day) * LABEL_CONDENSE;
        let location_width =
            measure.text_width(FontRole::Text, sizes.location, &fields.location) * LABEL_CONDENSE;

        let divider_width = DIVIDER_WIDTH * scale;
        let divider_margin = DIVIDER_MARGIN * scale;
        let label_column = date_width.max(day_width);

        let block = Bounds {
            x: padding,
            y: canvas_height
                - padding
                - sizes.time
                - sizes.location
                - BLOCK_BOTTOM_CLEARANCE * scale,
            width: time_width
                + divider_margin
                + divider_width
                + divider_margin
                + label_column
                + padding * 2.0,
            height: sizes.time + sizes.location + BLOCK_VERTICAL_MARGIN * scale,
        };

        // Time row
        let time_x = block.x;
        let time_middle = block.y + sizes.time;

        let logo = logo_size
            .filter(|(w, h)| *w > 0 && *h > 0)
            .map(|(logo_w, logo_h)| {
                let logo_height = sizes.time * LOGO_HEIGHT_RATIO;
                Bounds {
                    x: time_x,
                    y: block.y - logo_height + LOGO_DROP * scale,
                    width: logo_w as f32 / logo_h as f32 * logo_height,
                    height: logo_height,
                }
            });

        let divider_height = sizes.time * DIVIDER_HEIGHT_RATIO;
        let divider = Bounds {
            x: time_x + time_width + divider_margin,
            y: time_middle - divider_height / 2.0 - DIVIDER_RISE * scale,
            width: divider_width,
            height: divider_height,
        };
        let label_x = divider.right() + divider_margin;

        let time = TextPlacement {
            text: fields.time.clone(),
            role: FontRole::Display,
            size: sizes.time,
            condense: 1.0,
            color: WHITE,
            x: time_x,
            middle_y: time_middle,
            width: time_width,
        };
        let date = TextPlacement {
            text: fields.date.clone(),
            role: FontRole::Text,
            size: sizes.date,
            condense: LABEL_CONDENSE,
            color: WHITE,
            x: label_x,
            middle_y: divider.y + sizes.date / 2.0,
            width: date_width,
        };
        let day = TextPlacement {
            text: fields.day.clone(),
            role: FontRole::Text,
            size: sizes.day,
            condense: LABEL_CONDENSE,
            color: WHITE,
            x: label_x,
            middle_y: divider.bottom() - sizes.day / 2.0,
            width: day_width,
        };
        let location = TextPlacement {
            text: fields.location.clone(),
            role: FontRole::Text,
            size: sizes.location,
            condense: LABEL_CONDENSE,
            color: WHITE,
            x: block.x,
            middle_y: time_middle + sizes.time / 2.0 + LOCATION_GAP * scale + sizes.location / 2.0,
            width: location_width,
        };

        // Brand mark, right-anchored at the padding margin
        let brand_time_width = measure.text_width(FontRole::Brand, sizes.brand, BRAND_TIME_TEXT);
        let brand_mark_width = measure.text_width(FontRole::Brand, sizes.brand, BRAND_MARK_TEXT);
        let right_edge = canvas_width - padding;
        let brand_middle = canvas_height - padding - sizes.tagline - BRAND_GAP * scale;
        let brand_x = right_edge - brand_time_width - brand_mark_width;

        let brand_time = TextPlacement {
            text: BRAND_TIME_TEXT.to_string(),
            role: FontRole::Brand,
            size: sizes.brand,
            condense: 1.0,
            color: BRAND_ACCENT,
            x: brand_x,
            middle_y: brand_middle,
            width: brand_time_width,
        };
        let brand_mark = TextPlacement {
            text: BRAND_MARK_TEXT.to_string(),
            role: FontRole::Brand,
            size: sizes.brand,
            condense: 1.0,
            color: WHITE,
            x: brand_x + brand_time_width,
            middle_y: brand_middle,
            width: brand_mark_width,
        };

        let tagline_width =
            measure.text_width(FontRole::Tagline, sizes.tagline, TAGLINE_TEXT) * TAGLINE_CONDENSE;
        let tagline = TextPlacement {
            text: TAGLINE_TEXT.to_string(),
            role: FontRole::Tagline,
            size: sizes.tagline,
            condense: TAGLINE_CONDENSE,
            color: WHITE,
            x: right_edge - tagline_width,
            middle_y: brand_middle + sizes.brand,
            width: tagline_width,
        };

        Self {
            scale,
            padding,
            sizes,
            block,
            logo,
            divider,
            time,
            date,
            day,
            location,
            brand_time,
            brand_mark,
            tagline,
        }
    }

    /// All text lines in drawing order.
    pub fn texts(&self) -> [&TextPlacement; 7] {
        [
            &self.time,
            &self.date,
            &self.day,
            &self.location,
            &self.brand_time,
            &self.brand_mark,
            &self.tagline,
        ]
    }
}
