use super::RenderError;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use image::{ImageEncoder, Rgb, RgbImage, RgbaImage, codecs::jpeg::JpegEncoder};
use tracing::debug;

/// Quality used when none (or an out-of-range one) is given.
pub const DEFAULT_QUALITY: f32 = 0.92;

/// Map a 0..=1 quality to the encoder's 1..=100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    let quality = if (0.0..=1.0).contains(&quality) {
        quality
    } else {
        DEFAULT_QUALITY
    };
    ((quality * 100.0).round() as u8).max(1)
}

/// Encode the canvas as JPEG. Transparent areas come out black.
pub fn encode_jpeg(canvas: &RgbaImage, quality: f32) -> Result<Vec<u8>, RenderError> {
    let rgb = flatten_onto_black(canvas);
    let quality = jpeg_quality(quality);

    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder.write_image(
        &rgb,
        rgb.width(),
        rgb.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    debug!(
        "Encoded {}x{} JPEG at quality {}: {} bytes",
        rgb.width(),
        rgb.height(),
        quality,
        bytes.len()
    );

    Ok(bytes)
}

fn flatten_onto_black(canvas: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let [r, g, b, a] = canvas.get_pixel(x, y).0;
        let blend = |c: u8| (c as u16 * a as u16 / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

pub fn data_uri(bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(bytes))
}
