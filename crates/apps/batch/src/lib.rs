#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::ensure;
use outfit_analysis::{OutfitAnalyzer, VisionModel};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};
use walkdir::WalkDir;

/// Analyze every photo in a folder.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct BatchArgs {
    /// Folder to walk for .png / .jpg / .jpeg files.
    #[clap(long, short)]
    pub input: PathBuf,

    /// Write the merged raw response of each photo here, overriding
    /// `output.raw_response_dir`.
    #[clap(long, short)]
    pub output: Option<PathBuf>,
}

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Photos under `root`, sorted for a stable processing order.
#[must_use]
pub fn collect_photos(root: &Path) -> Vec<PathBuf> {
    let mut photos: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_photo(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    photos.sort();
    photos
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub analyzed: usize,
    pub failed: usize,
}

/// Analyze photos one at a time. A failing photo is logged and skipped.
pub async fn run_batch<M: VisionModel>(
    analyzer: &OutfitAnalyzer<M>,
    input: &Path,
) -> Result<BatchSummary> {
    ensure!(input.is_dir(), "{} is not a directory", input.display());
    let photos = collect_photos(input);
    info!("Found {} photos in {}", photos.len(), input.display());

    let mut summary = BatchSummary::default();
    for (i, photo) in photos.iter().enumerate() {
        let name = photo
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().to_string());
        let bytes = match tokio::fs::read(photo).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Could not read {}: {e}", photo.display());
                summary.failed += 1;
                continue;
            }
        };

        let now = Instant::now();
        match analyzer.analyze(&bytes, &name).await {
            Ok(result) => {
                summary.analyzed += 1;
                info!(
                    "[{}/{}] {name} {:?}: {}",
                    i + 1,
                    photos.len(),
                    now.elapsed(),
                    serde_json::to_string(&result)?
                );
            }
            Err(e) => {
                summary.failed += 1;
                error!(kind = ?e.kind(), "[{}/{}] Error analyzing {name}: {e}", i + 1, photos.len());
            }
        }
    }

    info!(
        "Done: {} analyzed, {} failed, {} total",
        summary.analyzed,
        summary.failed,
        photos.len()
    );
    Ok(summary)
}
