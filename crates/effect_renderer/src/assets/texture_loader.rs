//! Texture loader
//!
//! Decodes image files to RGBA8 with the `image` crate and creates the
//! texture on the host.

use std::path::Path;

use crate::assets::{AssetError, FileInterface, StdFileInterface};
use crate::render::api::{RenderBackend, TextureHandle};

/// Decoded RGBA8 pixels ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    /// Raw RGBA pixel data
    pub rgba: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl TextureData {
    /// Decode an encoded image
    pub fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes).map_err(|e| AssetError::Decode(e.to_string()))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self {
            rgba: rgba.into_raw(),
            width,
            height,
        })
    }
}

/// Loads textures through a [`FileInterface`]
pub struct TextureLoader {
    files: Box<dyn FileInterface>,
}

impl TextureLoader {
    /// Create a loader; `None` reads from the standard file system
    pub fn new(files: Option<Box<dyn FileInterface>>) -> Self {
        Self {
            files: files.unwrap_or_else(|| Box::new(StdFileInterface::new())),
        }
    }

    /// Read, decode and create a texture
    pub fn load(&self, backend: &mut dyn RenderBackend, path: &Path) -> Result<TextureHandle, AssetError> {
        let bytes = self.files.read(path)?;
        let texture = self.load_from_bytes(backend, &bytes)?;
        log::info!("Loaded texture {:?} from {:?}", texture, path);
        Ok(texture)
    }

    /// Decode and create a texture from encoded bytes
    pub fn load_from_bytes(&self, backend: &mut dyn RenderBackend, bytes: &[u8]) -> Result<TextureHandle, AssetError> {
        let data = TextureData::decode(bytes)?;
        log::debug!("Decoded {}x{} texture", data.width, data.height);
        Ok(backend.create_texture(data.width, data.height, &data.rgba)?)
    }
}

impl std::fmt::Debug for TextureLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureLoader").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::{BackendCommand, RecordingBackend};

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let data = TextureData::decode(&encode_png(3, 2)).unwrap();
        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(&data.rgba[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("smoke.png"), encode_png(4, 4)).unwrap();

        let loader = TextureLoader::new(Some(Box::new(StdFileInterface::with_root(dir.path()))));
        let mut backend = RecordingBackend::new();
        let texture = loader.load(&mut backend, Path::new("smoke.png")).unwrap();

        assert_eq!(
            backend.commands(),
            &[BackendCommand::CreateTexture { texture, width: 4, height: 4 }]
        );
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let loader = TextureLoader::new(None);
        let mut backend = RecordingBackend::new();
        assert!(matches!(
            loader.load_from_bytes(&mut backend, b"not an image"),
            Err(AssetError::Decode(_))
        ));
    }
}
