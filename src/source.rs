use std::sync::Arc;

use crate::{
    error::{TokenmillError, TokenmillResult},
    surface::Surface,
};

/// A file waiting in the pipeline queue: raw bytes plus the name the token
/// will be derived from. The bytes are opaque until the load step decodes
/// them.
#[derive(Clone, Debug)]
pub struct PendingFile {
    pub name: String,
    pub bytes: Arc<Vec<u8>>,
}

impl PendingFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::new(bytes),
        }
    }

    /// The filename with its extension stripped; only the last dot-segment is
    /// treated as an extension (`a.b.png` -> `a.b`, `noext` -> `noext`).
    pub fn stem(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => self.name.clone(),
        }
    }
}

/// Decode raw image bytes into a premultiplied surface.
///
/// Any format the `image` crate recognizes is accepted; anything else is a
/// [`TokenmillError::Decode`].
pub fn decode_image(bytes: &[u8]) -> TokenmillResult<Surface> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| TokenmillError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Surface::from_rgba8_straight(width, height, rgba.into_raw())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn stem_strips_last_extension_only() {
        assert_eq!(PendingFile::new("portrait.png", vec![]).stem(), "portrait");
        assert_eq!(PendingFile::new("a.b.png", vec![]).stem(), "a.b");
        assert_eq!(PendingFile::new("noext", vec![]).stem(), "noext");
        assert_eq!(PendingFile::new(".hidden", vec![]).stem(), ".hidden");
    }

    #[test]
    fn decode_png_dimensions_and_premul() {
        let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50u8, 200u8, 128u8]).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let surface = decode_image(&buf).unwrap();
        assert_eq!(surface.width(), 1);
        assert_eq!(surface.height(), 1);
        assert_eq!(
            surface.data(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128u8
            ]
        );
    }

    #[test]
    fn decode_garbage_is_a_decode_error() {
        let err = decode_image(b"not an image").unwrap_err();
        assert!(matches!(err, TokenmillError::Decode(_)));
    }
}
