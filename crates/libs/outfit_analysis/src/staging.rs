use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

/// An image written to a temporary file for the model client. The file is
/// removed when this value is dropped, on every exit path.
#[derive(Debug)]
pub struct StagedImage {
    path: Option<TempPath>,
}

impl StagedImage {
    /// Write `bytes` to a fresh temporary file in `dir`, or in the system
    /// temp directory when `dir` is `None`.
    pub fn stage(bytes: &[u8], extension: &str, dir: Option<&Path>) -> std::io::Result<Self> {
        let suffix = format!(".{extension}");
        let mut builder = tempfile::Builder::new();
        builder.prefix("outfit-").suffix(&suffix);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;
        let path = file.into_temp_path();
        debug!("Staged image at {}", path.display());
        Ok(Self { path: Some(path) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Remove the file now. Failures are logged, never returned.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let shown: PathBuf = path.to_path_buf();
        if let Err(e) = path.close() {
            warn!("Could not remove staged image {}: {e}", shown.display());
        }
    }
}

impl Drop for StagedImage {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedImage::stage(b"abc", "png", Some(dir.path())).unwrap();
        let path = staged.path().to_path_buf();

        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        assert_eq!(path.extension().unwrap(), "png");
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn release_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedImage::stage(b"abc", "jpg", Some(dir.path())).unwrap();
        let path = staged.path().to_path_buf();
        staged.release();
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn already_deleted_file_is_only_logged() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedImage::stage(b"abc", "jpg", Some(dir.path())).unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        staged.release();
    }

    #[test]
    fn missing_staging_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(StagedImage::stage(b"abc", "png", Some(&missing)).is_err());
    }
}
