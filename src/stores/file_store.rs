use std::{collections::HashSet, io::ErrorKind, path::PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::store_trait::AnnouncementStore;

/// Append-only flat file: one record per line, the first comma-separated
/// field of each record being a challenge id.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

/// Extracts the challenge ids from the file contents, skipping blank and malformed records
pub(crate) fn parse_records(contents: &str) -> HashSet<u64> {
    contents
        .lines()
        .filter_map(|line| {
            let field = line.split(',').next()?.trim();
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }

            field.parse::<u64>().ok()
        })
        .collect()
}

#[async_trait]
impl AnnouncementStore for FileStore {
    async fn load(&self) -> Result<HashSet<u64>, anyhow::Error> {
        // undecodable bytes become U+FFFD and fail the digit check like any other bad record
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no announcement file yet");
                return Ok(HashSet::new());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };

        Ok(parse_records(&String::from_utf8_lossy(&bytes)))
    }

    async fn append(&self, challenge_id: u64) -> Result<(), anyhow::Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open {}", self.path.display()))?;

        file.write_all(format!("{challenge_id}\n").as_bytes())
            .await
            .with_context(|| format!("failed to append to {}", self.path.display()))?;

        // each record must survive a crash right after this call
        file.flush().await?;
        file.sync_data().await?;

        Ok(())
    }
}
