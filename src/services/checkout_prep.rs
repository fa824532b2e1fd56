use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

/// Failures while rewriting checkout files before launch.
#[derive(Debug, Error)]
pub enum PrepareError {
    /// A configured file could not be read or written back.
    #[error("failed to rewrite {}", .path.display())]
    Io {
        /// File being rewritten.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Strip every line containing one of `markers` from each of `files` (relative to `checkout_dir`).
///
/// Returns the number of lines removed across all files.
pub async fn prepare_checkout(
    checkout_dir: &Path,
    files: &[PathBuf],
    markers: &[String],
) -> Result<usize, PrepareError> {
    let mut removed = 0;

    for relative in files {
        let path = checkout_dir.join(relative);
        let contents = fs::read_to_string(&path)
            .await
            .map_err(|source| PrepareError::Io {
                path: path.clone(),
                source,
            })?;

        let (rewritten, dropped) = strip_marked_lines(&contents, markers);
        fs::write(&path, rewritten)
            .await
            .map_err(|source| PrepareError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), dropped, "rewrote checkout file");
        removed += dropped;
    }

    info!(files = files.len(), removed, "prepared checkout");
    Ok(removed)
}

fn strip_marked_lines(contents: &str, markers: &[String]) -> (String, usize) {
    let mut dropped = 0;
    let kept = contents
        .lines()
        .filter(|line| {
            let marked = markers.iter().any(|marker| line.contains(marker.as_str()));
            dropped += usize::from(marked);
            !marked
        })
        .collect::<Vec<_>>();

    (kept.join("\n"), dropped)
}
