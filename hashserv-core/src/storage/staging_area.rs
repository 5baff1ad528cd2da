use crate::digest::ContentDigest;
use crate::filename::{MAX_FILENAME_LEN, secure_filename, truncate_filename};
use crate::{HashservError, Result};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use ulid::Ulid;

/// StagingArea holds uploads before their digest is known.
/// Files live in `process_dir/{ulid}.{sanitized name}`, outside the store.
pub struct StagingArea {
    process_dir: PathBuf,
}

/// An upload written to the staging directory but not yet committed.
///
/// Owned by the request that staged it. It is released by
/// [`ContentStore::commit`](crate::ContentStore::commit), by
/// [`StagingArea::discard`], or, failing both, when it is dropped.
#[derive(Debug)]
pub struct StagedObject {
    name: String,
    path: PathBuf,
    size_bytes: u64,
    digest: Option<ContentDigest>,
    live: bool,
}

impl StagedObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Digest computed by [`ContentStore::digest`](crate::ContentStore::digest),
    /// if it has run.
    pub fn digest(&self) -> Option<&ContentDigest> {
        self.digest.as_ref()
    }

    pub(crate) fn record_digest(&mut self, digest: ContentDigest) {
        self.digest = Some(digest);
    }

    /// Mark the file as moved or removed so drop leaves it alone.
    pub(crate) fn release(mut self) {
        self.live = false;
    }
}

// Blocking unlink: drop cannot await. Normal paths release before this runs.
impl Drop for StagedObject {
    fn drop(&mut self) {
        if !self.live {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Removed abandoned staged file {:?}", self.path);
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                tracing::warn!(
                    "Failed to remove abandoned staged file {:?}: {}",
                    self.path,
                    error
                );
            }
        }
    }
}

impl StagingArea {
    pub fn new(process_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&process_dir)?;
        Ok(Self { process_dir })
    }

    pub fn process_dir(&self) -> &Path {
        &self.process_dir
    }

    /// Write `data` to a fresh staging file named after `name`.
    pub async fn stage(&self, name: &str, data: Bytes) -> Result<StagedObject> {
        let name = secure_filename(name);
        if name.is_empty() {
            return Err(HashservError::InvalidInput(
                "file name is empty after sanitization".to_string(),
            ));
        }
        let name = truncate_filename(&name, MAX_FILENAME_LEN);

        let path = self
            .process_dir
            .join(format!("{}.{}", Ulid::new(), name));

        // From here on drop cleans up whatever was written.
        let staged = StagedObject {
            name,
            path,
            size_bytes: data.len() as u64,
            digest: None,
            live: true,
        };

        let mut file = fs::File::create(&staged.path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        tracing::debug!(
            "Staged {} ({} bytes) at {:?}",
            staged.name,
            staged.size_bytes,
            staged.path
        );
        Ok(staged)
    }

    /// Remove a staged file that will not be committed.
    pub async fn discard(&self, staged: StagedObject) -> Result<()> {
        let result = match fs::remove_file(&staged.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error),
        };

        match result {
            Ok(()) => {
                tracing::debug!("Discarded staged file {:?}", staged.path);
                staged.release();
                Ok(())
            }
            // Keep the object live so drop retries the removal.
            Err(error) => Err(error.into()),
        }
    }

    /// Remove every file left in the staging directory. Only safe before any
    /// upload is in flight, i.e. at startup.
    pub async fn purge_orphans(&self) -> Result<usize> {
        let mut removed = 0usize;
        let mut entries = fs::read_dir(&self.process_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(error) => {
                    tracing::warn!(
                        "Failed to purge staged file {:?}: {}",
                        entry.path(),
                        error
                    );
                }
            }
        }

        if removed > 0 {
            tracing::info!(
                "Purged {} orphaned staged files from {:?}",
                removed,
                self.process_dir
            );
        }
        Ok(removed)
    }
}

#[cfg(test)]
pub(crate) async fn staged_file_count(dir: &Path) -> usize {
    let mut count = 0;
    let mut entries = fs::read_dir(dir).await.unwrap();
    while let Some(_entry) = entries.next_entry().await.unwrap() {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stage_and_discard() {
        let temp_dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(temp_dir.path().join("process")).unwrap();

        let staged = staging
            .stage("a.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(staged.name(), "a.txt");
        assert_eq!(staged.size_bytes(), 5);
        assert!(staged.path().starts_with(staging.process_dir()));
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"hello");

        let path = staged.path().to_path_buf();
        staging.discard(staged).await.unwrap();
        assert!(!path.exists());
        assert_eq!(staged_file_count(staging.process_dir()).await, 0);
    }

    #[tokio::test]
    async fn test_same_name_gets_distinct_paths() {
        let temp_dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(temp_dir.path().to_path_buf()).unwrap();

        let first = staging.stage("a.txt", Bytes::from_static(b"one")).await.unwrap();
        let second = staging.stage("a.txt", Bytes::from_static(b"two")).await.unwrap();
        assert_ne!(first.path(), second.path());
        assert_eq!(staged_file_count(staging.process_dir()).await, 2);
    }

    #[tokio::test]
    async fn test_stage_long_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(temp_dir.path().to_path_buf()).unwrap();

        let long_name = format!("{}.txt", "a".repeat(240));
        let staged = staging
            .stage(&long_name, Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(staged.name().len(), MAX_FILENAME_LEN);
        assert!(staged.name().ends_with(".txt"));
        assert!(staged.digest().is_none());
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(temp_dir.path().to_path_buf()).unwrap();

        let staged = staging.stage("b.txt", Bytes::from_static(b"x")).await.unwrap();
        let path = staged.path().to_path_buf();
        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stage_rejects_unsafe_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(temp_dir.path().to_path_buf()).unwrap();

        let result = staging.stage("../..", Bytes::from_static(b"x")).await;
        assert!(matches!(result, Err(HashservError::InvalidInput(_))));
        assert_eq!(staged_file_count(staging.process_dir()).await, 0);
    }

    #[tokio::test]
    async fn test_stage_failure_leaves_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let process_dir = temp_dir.path().join("process");
        let staging = StagingArea::new(process_dir.clone()).unwrap();
        std::fs::remove_dir(&process_dir).unwrap();

        let result = staging.stage("a.txt", Bytes::from_static(b"x")).await;
        assert!(matches!(result, Err(HashservError::Io(_))));
        assert!(!process_dir.exists());
    }

    #[tokio::test]
    async fn test_purge_orphans() {
        let temp_dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(temp_dir.path().to_path_buf()).unwrap();

        std::fs::write(temp_dir.path().join("leftover.txt"), b"partial").unwrap();
        std::fs::write(temp_dir.path().join("other.png"), b"partial").unwrap();

        assert_eq!(staging.purge_orphans().await.unwrap(), 2);
        assert_eq!(staged_file_count(staging.process_dir()).await, 0);
        assert_eq!(staging.purge_orphans().await.unwrap(), 0);
    }
}
