//! Turning raw image files into rasters, plus the preview handles that keep
//! the original bytes available while an image is selected.

use image::{DynamicImage, ImageDecoder, ImageReader};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Empty image data")]
    Empty,

    #[error("Unrecognized image format")]
    UnknownFormat,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

/// A decoded raster and its orientation class.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    raster: Arc<DynamicImage>,
    is_landscape: bool,
}

impl DecodedImage {
    pub fn new(raster: DynamicImage) -> Self {
        let is_landscape = raster.width() >= raster.height();
        Self {
            raster: Arc::new(raster),
            is_landscape,
        }
    }

    pub fn raster(&self) -> &DynamicImage {
        &self.raster
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Informational only; the compositor lays out both orientations the same way.
    pub fn is_landscape(&self) -> bool {
        self.is_landscape
    }
}

/// Decode an image file, sniffing the format from its content and applying
/// any EXIF orientation so the raster matches what a viewer would display.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    if reader.format().is_none() {
        return Err(DecodeError::UnknownFormat);
    }

    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut raster = DynamicImage::from_decoder(decoder)?;
    raster.apply_orientation(orientation);

    debug!(
        "Decoded {}x{} image ({:?})",
        raster.width(),
        raster.height(),
        orientation
    );

    Ok(DecodedImage::new(raster))
}

/// Whether a path looks like an image file, judged by its extension's MIME type.
pub fn is_supported_image_path(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .unwrap_or(false)
}

type PreviewMap = HashMap<Uuid, Arc<[u8]>>;

/// Registry of raw bytes held for previews. Entries live exactly as long as
/// the [`PreviewHandle`] that created them.
#[derive(Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Mutex<PreviewMap>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, bytes: Arc<[u8]>) -> PreviewHandle {
        let key = Uuid::new_v4();
        self.entries.lock().insert(key, bytes);
        PreviewHandle {
            key,
            entries: Arc::clone(&self.entries),
        }
    }

    pub fn get(&self, key: &Uuid) -> Option<Arc<[u8]>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scoped preview resource; dropping it releases the bytes from the store.
pub struct PreviewHandle {
    key: Uuid,
    entries: Arc<Mutex<PreviewMap>>,
}

impl PreviewHandle {
    pub fn key(&self) -> Uuid {
        self.key
    }

    pub fn bytes(&self) -> Option<Arc<[u8]>> {
        self.entries.lock().get(&self.key).cloned()
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewHandle").field("key", &self.key).finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if self.entries.lock().remove(&self.key).is_some() {
            debug!("Released preview {}", self.key);
        }
    }
}
