//! Cover-letter artifact generation. Best effort: the session loop logs
//! failures here and carries on.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("failed to write cover letter: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Writes the given text out as a standalone artifact and returns where
    /// it landed.
    async fn generate(&self, text: &str) -> Result<PathBuf, ScribeError>;
}

/// Writes plain-text cover letters into the output directory, one file per
/// request, timestamped so repeat letters within a run never clobber each
/// other.
pub struct FileScribe {
    output_dir: PathBuf,
}

impl FileScribe {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl DocumentGenerator for FileScribe {
    async fn generate(&self, text: &str) -> Result<PathBuf, ScribeError> {
        fs::create_dir_all(&self.output_dir)?;
        let stamp = Local::now().format("%Y-%m-%d_%H%M%S");
        let path = self.output_dir.join(format!("cover_letter_{stamp}.txt"));
        fs::write(&path, text)?;
        info!(path = %path.display(), "cover letter written");
        Ok(path)
    }
}
