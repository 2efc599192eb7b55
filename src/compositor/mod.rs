// Compositor module - draws the timestamp watermark onto a copy of an image
pub mod assets;
mod encode;
mod error;
pub mod layout;

pub use assets::{AssetLoadError, AssetPaths, FontRole, FontSet};
pub use encode::{DEFAULT_QUALITY, data_uri, encode_jpeg, jpeg_quality};
pub use error::RenderError;
pub use layout::{TextMeasure, TextPlacement, WatermarkLayout};

use crate::decode::DecodedImage;
use crate::fields::WatermarkFields;
use ab_glyph::{Font, PxScale, ScaleFont};
use image::{RgbaImage, imageops};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Lossy encoding quality in `0.0..=1.0`.
    pub quality: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
        }
    }
}

/// A finished, encoded watermark image.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOutput {
    pub id: Uuid,
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl RenderedOutput {
    pub fn new(id: Uuid, original_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            id,
            filename: output_filename(original_name),
            bytes,
        }
    }

    pub fn data_uri(&self) -> String {
        data_uri(&self.bytes)
    }
}

/// `IMG_0001.HEIC` -> `IMG_0001_watermark.jpg`. Only the last extension is
/// stripped.
pub fn output_filename(original_name: &str) -> String {
    let stem = match original_name.rfind('.') {
        Some(idx) if idx + 1 < original_name.len() && !original_name[idx + 1..].contains('/') => {
            &original_name[..idx]
        }
        _ => original_name,
    };
    format!("{}_watermark.jpg", stem)
}

/// Fonts and logo shared by every render.
#[derive(Debug, Clone, Default)]
pub struct RenderAssets {
    pub fonts: Arc<FontSet>,
    pub logo: Option<Arc<RgbaImage>>,
}

/// Renders watermarks. Assets are loaded on first use and then shared by all
/// renders, including concurrent ones; the compositor keeps no per-image state.
pub struct Compositor {
    paths: AssetPaths,
    fonts: OnceCell<Arc<FontSet>>,
    logo: OnceCell<Option<Arc<RgbaImage>>>,
}

impl Compositor {
    pub fn new(paths: AssetPaths) -> Self {
        Self {
            paths,
            fonts: OnceCell::new(),
            logo: OnceCell::new(),
        }
    }

    pub fn from_config(config: &crate::Config) -> Self {
        Self::new(AssetPaths::from_config(config))
    }

    /// A compositor whose assets are already in memory.
    pub fn with_assets(assets: RenderAssets) -> Self {
        Self {
            paths: AssetPaths::none(),
            fonts: OnceCell::new_with(Some(assets.fonts)),
            logo: OnceCell::new_with(Some(assets.logo)),
        }
    }

    /// Wait until fonts and logo have been loaded (or given up on).
    pub async fn assets(&self) -> RenderAssets {
        let fonts = self
            .fonts
            .get_or_init(|| async {
                Arc::new(assets::load_fonts_with_timeout(self.paths.clone()).await)
            })
            .await
            .clone();
        let logo = self
            .logo
            .get_or_init(|| assets::load_logo_optional(self.paths.logo.clone()))
            .await
            .clone();

        RenderAssets { fonts, logo }
    }

    /// Render the watermark and return the encoded JPEG bytes.
    pub async fn render(
        &self,
        image: &DecodedImage,
        fields: &WatermarkFields,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, RenderError> {
        let assets = self.assets().await;
        let image = image.clone();
        let fields = fields.clone();
        let options = *options;

        tokio::task::spawn_blocking(move || render_with_assets(&image, &fields, &options, &assets))
            .await
            .map_err(|e| RenderError::TaskError(e.to_string()))?
    }

    pub async fn render_output(
        &self,
        id: Uuid,
        original_name: &str,
        image: &DecodedImage,
        fields: &WatermarkFields,
        options: &RenderOptions,
    ) -> Result<RenderedOutput, RenderError> {
        let bytes = self.render(image, fields, options).await?;
        info!(
            "Rendered {} ({}x{}, {} bytes)",
            original_name,
            image.width(),
            image.height(),
            bytes.len()
        );
        Ok(RenderedOutput::new(id, original_name, bytes))
    }
}

/// Synchronous render: compose then encode.
pub fn render_with_assets(
    image: &DecodedImage,
    fields: &WatermarkFields,
    options: &RenderOptions,
    assets: &RenderAssets,
) -> Result<Vec<u8>, RenderError> {
    let canvas = compose(image, fields, assets)?;
    encode_jpeg(&canvas, options.quality)
}

/// Draw the full overlay onto a fresh canvas the size of `image`.
pub fn compose(
    image: &DecodedImage,
    fields: &WatermarkFields,
    assets: &RenderAssets,
) -> Result<RgbaImage, RenderError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyCanvas(width, height));
    }

    let mut canvas = image.raster().to_rgba8();

    let logo_size = assets.logo.as_ref().map(|logo| logo.dimensions());
    let layout = WatermarkLayout::compute(width, height, fields, assets.fonts.as_ref(), logo_size);
    debug!(
        "Layout for {}x{}: scale {:.3}, block {:?}",
        width, height, layout.scale, layout.block
    );

    if let (Some(logo), Some(bounds)) = (assets.logo.as_ref(), layout.logo) {
        draw_logo(&mut canvas, logo, &bounds);
    }

    draw_text(&mut canvas, &assets.fonts, &layout.time);

    let divider = &layout.divider;
    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(divider.x.round() as i32, divider.y.round() as i32).of_size(
            (divider.width.round() as u32).max(1),
            (divider.height.round() as u32).max(1),
        ),
        layout::DIVIDER_COLOR,
    );

    for placement in layout.texts().into_iter().skip(1) {
        draw_text(&mut canvas, &assets.fonts, placement);
    }

    Ok(canvas)
}

fn draw_logo(canvas: &mut RgbaImage, logo: &RgbaImage, bounds: &layout::Bounds) {
    let (width, height) = logo_size(bounds, canvas.width());
    let resized = imageops::resize(logo, width, height, imageops::FilterType::Lanczos3);
    imageops::overlay(
        canvas,
        &resized,
        bounds.x.round() as i64,
        bounds.y.round() as i64,
    );
}

/// Pixel size of the resized logo, shrunk to fit the canvas width with its
/// aspect ratio kept.
fn logo_size(bounds: &layout::Bounds, canvas_width: u32) -> (u32, u32) {
    let max_width = canvas_width.max(1) as f32;
    let (width, height) = if bounds.width > max_width {
        (max_width, bounds.height * max_width / bounds.width)
    } else {
        (bounds.width, bounds.height)
    };
    ((width.round() as u32).max(1), (height.round() as u32).max(1))
}

/// Draw one line, horizontally scaled by its condensation factor. Lines with
/// no text, no font or a zero size are skipped.
fn draw_text(canvas: &mut RgbaImage, fonts: &FontSet, placement: &TextPlacement) {
    if placement.text.is_empty() || placement.size < 1.0 {
        return;
    }
    let Some(font) = fonts.font(placement.role) else {
        return;
    };

    let em = assets::em_scale(font, placement.size);
    let metrics = font.as_scaled(em);
    let line_height = metrics.ascent() - metrics.descent();
    let top = placement.middle_y - line_height / 2.0;
    let scale = PxScale {
        x: em.x * placement.condense,
        y: em.y,
    };

    draw_text_mut(
        canvas,
        placement.color,
        placement.x.round() as i32,
        top.round() as i32,
        scale,
        font,
        &placement.text,
    );
}
