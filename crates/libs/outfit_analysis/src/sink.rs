use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Receives the merged raw response of every successful analysis, for
/// offline inspection. Failures are the sink's own business.
pub trait RawResponseSink: Send + Sync {
    fn record(&self, image_identifier: &str, merged: &Value);
}

/// Writes `<dir>/<image base name>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Output path for an image, e.g. `photos/IMG_01.jpg` → `<dir>/IMG_01.json`.
    #[must_use]
    pub fn path_for(&self, image_identifier: &str) -> PathBuf {
        let stem = Path::new(image_identifier)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("image");
        self.dir.join(format!("{stem}.json"))
    }

    fn write(&self, path: &Path, merged: &Value) -> color_eyre::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(path, serde_json::to_string_pretty(merged)?)?;
        Ok(())
    }
}

impl RawResponseSink for JsonFileSink {
    fn record(&self, image_identifier: &str, merged: &Value) {
        let path = self.path_for(image_identifier);
        match self.write(&path, merged) {
            Ok(()) => debug!("Wrote raw response to {}", path.display()),
            Err(e) => warn!("Could not write raw response to {}: {e}", path.display()),
        }
    }
}
