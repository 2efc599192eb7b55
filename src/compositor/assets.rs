//! Optional render assets: the font faces for each text role and the branding
//! logo. Any of them may be missing; callers get whatever could be loaded.

use super::layout::TextMeasure;
use crate::Config;
use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont};
use image::RgbaImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid font data in {0:?}")]
    InvalidFont(PathBuf),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Logo has zero size")]
    EmptyLogo,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Loader task failed: {0}")]
    TaskError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontRole {
    /// Condensed display face used for the time.
    Display,
    /// Standard face for date, day and location.
    Text,
    /// The "Timemark" brand label.
    Brand,
    /// The tagline under the brand label.
    Tagline,
}

impl FontRole {
    pub const ALL: [FontRole; 4] = [
        FontRole::Display,
        FontRole::Text,
        FontRole::Brand,
        FontRole::Tagline,
    ];
}

/// Where to look for render assets.
#[derive(Debug, Clone)]
pub struct AssetPaths {
    pub display_font: Option<PathBuf>,
    pub text_font: Option<PathBuf>,
    pub brand_font: Option<PathBuf>,
    pub tagline_font: Option<PathBuf>,
    pub fallback_fonts: Vec<PathBuf>,
    pub logo: Option<PathBuf>,
    pub font_load_timeout: Duration,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::none()
    }
}

impl AssetPaths {
    /// No assets at all; renders draw only shapes.
    pub fn none() -> Self {
        Self {
            display_font: None,
            text_font: None,
            brand_font: None,
            tagline_font: None,
            fallback_fonts: Vec::new(),
            logo: None,
            font_load_timeout: Duration::from_secs(3),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            display_font: config.fonts.display.clone(),
            text_font: config.fonts.text.clone(),
            brand_font: config.fonts.brand.clone(),
            tagline_font: config.fonts.tagline.clone(),
            fallback_fonts: config.fonts.fallbacks.clone(),
            logo: config.branding.logo.clone(),
            font_load_timeout: Duration::from_millis(config.fonts.load_timeout_ms),
        }
    }

    fn role_path(&self, role: FontRole) -> Option<&PathBuf> {
        match role {
            FontRole::Display => self.display_font.as_ref(),
            FontRole::Text => self.text_font.as_ref(),
            FontRole::Brand => self.brand_font.as_ref(),
            FontRole::Tagline => self.tagline_font.as_ref(),
        }
    }

    /// Candidate files for a role, most preferred first.
    fn font_candidates(&self, role: FontRole) -> Vec<&PathBuf> {
        let mut candidates: Vec<&PathBuf> = Vec::new();
        candidates.extend(self.role_path(role));
        if role != FontRole::Text {
            candidates.extend(self.text_font.as_ref());
        }
        candidates.extend(self.fallback_fonts.iter());
        candidates
    }
}

/// The loaded face for each role. Roles with no loadable font are `None`.
#[derive(Default)]
pub struct FontSet {
    fonts: HashMap<FontRole, Arc<FontVec>>,
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let roles: Vec<_> = FontRole::ALL
            .iter()
            .filter(|role| self.fonts.contains_key(*role))
            .collect();
        f.debug_struct("FontSet").field("roles", &roles).finish()
    }
}

impl FontSet {
    /// Load every role from disk, sharing faces that resolve to the same file.
    pub fn load(paths: &AssetPaths) -> Self {
        let mut by_path: HashMap<PathBuf, Option<Arc<FontVec>>> = HashMap::new();
        let mut fonts = HashMap::new();

        for role in FontRole::ALL {
            for candidate in paths.font_candidates(role) {
                let loaded = by_path
                    .entry(candidate.clone())
                    .or_insert_with(|| match load_font(candidate) {
                        Ok(font) => Some(Arc::new(font)),
                        Err(e) => {
                            debug!("Font {:?} unavailable: {}", candidate, e);
                            None
                        }
                    });

                if let Some(font) = loaded {
                    debug!("Using {:?} for {:?} text", candidate, role);
                    fonts.insert(role, Arc::clone(font));
                    break;
                }
            }

            if !fonts.contains_key(&role) {
                warn!("No usable font for {:?} text, it will not be drawn", role);
            }
        }

        Self { fonts }
    }

    /// Build a set that uses one face for every role.
    pub fn uniform(font: FontVec) -> Self {
        let font = Arc::new(font);
        let fonts = FontRole::ALL
            .iter()
            .map(|role| (*role, Arc::clone(&font)))
            .collect();
        Self { fonts }
    }

    pub fn font(&self, role: FontRole) -> Option<&FontVec> {
        self.fonts.get(&role).map(|font| font.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl TextMeasure for FontSet {
    fn text_width(&self, role: FontRole, size: f32, text: &str) -> f32 {
        match self.font(role) {
            Some(font) if size > 0.0 => advance_width(font, em_scale(font, size), text),
            _ => 0.0,
        }
    }
}

/// Scale at which one em of `font` is `size` pixels, the way CSS font sizes
/// work. `PxScale` alone sizes the ascent-to-descent height instead.
pub fn em_scale(font: &impl Font, size: f32) -> PxScale {
    let height_per_em = match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => font.height_unscaled() / units_per_em,
        _ => 1.0,
    };
    PxScale::from(size * height_per_em)
}

/// Sum of glyph advances plus kerning, in pixels.
pub fn advance_width(font: &impl Font, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0;
    let mut previous: Option<GlyphId> = None;
    for c in text.chars() {
        let glyph = scaled.glyph_id(c);
        if let Some(previous) = previous {
            width += scaled.kern(previous, glyph);
        }
        width += scaled.h_advance(glyph);
        previous = Some(glyph);
    }
    width
}

pub fn load_font(path: &Path) -> Result<FontVec, AssetLoadError> {
    let data = std::fs::read(path)?;
    FontVec::try_from_vec(data).map_err(|_| AssetLoadError::InvalidFont(path.to_path_buf()))
}

pub fn load_logo(path: &Path) -> Result<RgbaImage, AssetLoadError> {
    let logo = image::open(path)?.to_rgba8();
    if logo.width() == 0 || logo.height() == 0 {
        return Err(AssetLoadError::EmptyLogo);
    }
    Ok(logo)
}

/// Load fonts off the async runtime, giving up after the configured timeout.
/// Never fails: an unloadable set is simply empty.
pub async fn load_fonts_with_timeout(paths: AssetPaths) -> FontSet {
    let timeout = paths.font_load_timeout;
    let task = tokio::task::spawn_blocking(move || FontSet::load(&paths));

    let result = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(fonts)) => Ok(fonts),
        Ok(Err(e)) => Err(AssetLoadError::TaskError(e.to_string())),
        Err(_) => Err(AssetLoadError::Timeout(timeout)),
    };

    match result {
        Ok(fonts) => {
            info!("Fonts ready: {:?}", fonts);
            fonts
        }
        Err(e) => {
            warn!("Font loading failed, text will not be drawn: {}", e);
            FontSet::default()
        }
    }
}

/// Load the branding logo, returning `None` when it is not configured or
/// cannot be read.
pub async fn load_logo_optional(path: Option<PathBuf>) -> Option<Arc<RgbaImage>> {
    let path = path?;
    let display_path = path.clone();
    let result = tokio::task::spawn_blocking(move || load_logo(&path))
        .await
        .map_err(|e| AssetLoadError::TaskError(e.to_string()))
        .and_then(|r| r);

    match result {
        Ok(logo) => {
            info!(
                "Loaded logo {:?} ({}x{})",
                display_path,
                logo.width(),
                logo.height()
            );
            Some(Arc::new(logo))
        }
        Err(e) => {
            warn!("Logo {:?} unavailable, rendering without it: {}", display_path, e);
            None
        }
    }
}
