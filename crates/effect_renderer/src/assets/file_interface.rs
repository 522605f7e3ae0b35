//! File access abstraction used by the loaders

use std::path::{Path, PathBuf};

use crate::assets::AssetError;

/// Reads whole files for the loaders
///
/// Hosts with packaged or virtual file systems implement this; everyone
/// else uses [`StdFileInterface`].
pub trait FileInterface {
    /// Read the whole file at `path`
    fn read(&self, path: &Path) -> Result<Vec<u8>, AssetError>;
}

/// [`FileInterface`] over the standard file system
#[derive(Debug, Clone, Default)]
pub struct StdFileInterface {
    root: Option<PathBuf>,
}

impl StdFileInterface {
    /// Resolve paths as given
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl FileInterface for StdFileInterface {
    fn read(&self, path: &Path) -> Result<Vec<u8>, AssetError> {
        let resolved = self.resolve(path);
        log::debug!("Reading {:?}", resolved);
        Ok(std::fs::read(resolved)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_use_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), [1, 2, 3]).unwrap();

        let files = StdFileInterface::with_root(dir.path());
        assert_eq!(files.read(Path::new("a.bin")).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let files = StdFileInterface::new();
        assert!(matches!(
            files.read(Path::new("/definitely/not/here.bin")),
            Err(AssetError::Io(_))
        ));
    }
}
