//! Artifacts directory: copied firmware files, checksums and release notes

use sha2::{Digest, Sha256};
use std::io;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

pub const CHECKSUMS_FILE: &str = "checksums.txt";

/// SHA-256 of one copied artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDigest {
    pub file_name: String,
    pub sha256: String,
}

/// Calculate SHA256 hash of content
pub fn calculate_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// `sha256sum`-compatible listing
pub fn render_checksums(digests: &[ArtifactDigest]) -> String {
    digests
        .iter()
        .map(|d| format!("{}  {}\n", d.sha256, d.file_name))
        .collect()
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Copy files into the store and hash them
    pub async fn collect(&self, files: &[PathBuf]) -> io::Result<Vec<ArtifactDigest>> {
        fs::create_dir_all(&self.dir).await?;

        let mut digests = Vec::with_capacity(files.len());
        for file in files {
            let file_name = file
                .file_name()
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{} has no file name", file.display()),
                    )
                })?
                .to_string_lossy()
                .into_owned();

            let content = fs::read(file).await?;
            fs::write(self.dir.join(&file_name), &content).await?;
            debug!("Collected {}", file_name);

            digests.push(ArtifactDigest {
                sha256: calculate_hash(&content),
                file_name,
            });
        }

        Ok(digests)
    }

    pub async fn write_checksums(&self, digests: &[ArtifactDigest]) -> io::Result<PathBuf> {
        self.write_text(CHECKSUMS_FILE, &render_checksums(digests)).await
    }

    pub async fn write_text(&self, name: &str, content: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        fs::write(&path, content).await?;
        Ok(path)
    }
}
