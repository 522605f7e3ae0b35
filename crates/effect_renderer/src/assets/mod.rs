//! Asset loading
//!
//! Texture and model loaders handed to the simulation side. Both read bytes
//! through a [`FileInterface`] and hand the decoded data to the host backend;
//! the host owns the resulting GPU resources.

pub mod file_interface;
pub mod model_loader;
pub mod texture_loader;

pub use file_interface::{FileInterface, StdFileInterface};
pub use model_loader::{ModelAsset, ModelLoader};
pub use texture_loader::{TextureData, TextureLoader};

use thiserror::Error;

use crate::render::RenderError;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Reading the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The host rejected the decoded data
    #[error("Backend error: {0}")]
    Backend(#[from] RenderError),
}

impl From<AssetError> for RenderError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::Backend(err) => err,
            other => Self::Asset(other.to_string()),
        }
    }
}
