//! Image dimension probing and thumbnail rendering.
//!
//! Thumbnailing is best-effort: corrupt or unsupported payloads are never a
//! fatal upload error, the caller just stores the file without a thumbnail.

use std::io::Cursor;

use image::{GenericImageView, ImageFormat};

/// Whether the declared mime type is an image we attempt to decode.
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// Decode the payload and return its pixel dimensions, if it is an image.
pub fn probe_dimensions(content: &[u8]) -> Option<(u32, u32)> {
    let img = image::load_from_memory(content).ok()?;
    Some(img.dimensions())
}

/// Render a PNG thumbnail bounded by `max_dimension` on the longest edge.
///
/// Aspect ratio is preserved. Images already within bounds are re-encoded
/// as-is so every thumbnail is a PNG regardless of source format.
pub fn render_thumbnail(
    content: &[u8],
    max_dimension: u32,
) -> std::result::Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(content)?;
    let thumb = img.thumbnail(max_dimension, max_dimension);

    let mut out = Cursor::new(Vec::new());
    thumb.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}
