use crate::digest::ContentDigest;
use crate::storage::staging_area::StagedObject;
use crate::{HashservError, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// ContentStore keeps immutable objects keyed by the SHA256 of their bytes.
/// Objects are stored flat in `data_dir/{digest}`.
pub struct ContentStore {
    data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CommitResult {
    pub digest: ContentDigest,
    pub object_path: PathBuf,
    pub size_bytes: u64,
    /// The key was already present and the staged copy was dropped.
    pub reused: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub digest: ContentDigest,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

impl ContentStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Hash the full content of a staged file and record the result on it.
    pub async fn digest(&self, staged: &mut StagedObject) -> Result<ContentDigest> {
        let mut file = fs::File::open(staged.path()).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        let digest = ContentDigest::from_hasher(hasher);
        staged.record_digest(digest.clone());
        Ok(digest)
    }

    /// Move a staged file into the store under `digest`.
    ///
    /// The move is a single rename, so the destination never holds a partial
    /// file. An existing object under the same key wins and the staged copy
    /// is removed; this is reported through `reused`, not as an error.
    ///
    /// `digest` must be the one [`ContentStore::digest`] recorded on `staged`;
    /// anything else is rejected and the staged copy is removed.
    pub async fn commit(&self, staged: StagedObject, digest: &ContentDigest) -> Result<CommitResult> {
        if staged.digest() != Some(digest) {
            let recorded = staged.digest().map(ToString::to_string);
            self.drop_staged(staged).await;
            return Err(HashservError::InvalidDigest(match recorded {
                Some(recorded) => format!("{} does not match staged content {}", digest, recorded),
                None => format!("{} was not computed from the staged content", digest),
            }));
        }

        let object_path = self.object_path(digest);
        let size_bytes = staged.size_bytes();

        if self.contains(digest).await? {
            self.drop_staged(staged).await;
            tracing::debug!("Object {} already stored, dropped staged copy", digest);
            return Ok(CommitResult {
                digest: digest.clone(),
                object_path,
                size_bytes,
                reused: true,
            });
        }

        if let Err(error) = fs::rename(staged.path(), &object_path).await {
            self.drop_staged(staged).await;

            // Another upload of the same content committed first.
            if fs::try_exists(&object_path).await.unwrap_or(false) {
                tracing::debug!("Object {} committed concurrently, dropped staged copy", digest);
                return Ok(CommitResult {
                    digest: digest.clone(),
                    object_path,
                    size_bytes,
                    reused: true,
                });
            }

            return Err(HashservError::Io(error));
        }
        staged.release();

        tracing::debug!("Stored object {} ({} bytes)", digest, size_bytes);
        Ok(CommitResult {
            digest: digest.clone(),
            object_path,
            size_bytes,
            reused: false,
        })
    }

    /// Read the full content stored under `digest`.
    pub async fn fetch(&self, digest: &ContentDigest) -> Result<Bytes> {
        match fs::read(self.object_path(digest)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(HashservError::NotFound(digest.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    pub async fn contains(&self, digest: &ContentDigest) -> Result<bool> {
        match fs::metadata(self.object_path(digest)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    /// List every stored object, sorted by digest.
    pub async fn list(&self) -> Result<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut entries = fs::read_dir(&self.data_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(digest) = ContentDigest::parse(&name) else {
                continue;
            };
            // Stored keys are always lowercase.
            if digest.as_str() != name {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            objects.push(StoredObject {
                digest,
                size_bytes: metadata.len(),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        objects.sort_by(|a, b| a.digest.cmp(&b.digest));
        Ok(objects)
    }

    fn object_path(&self, digest: &ContentDigest) -> PathBuf {
        self.data_dir.join(digest.as_str())
    }

    async fn drop_staged(&self, staged: StagedObject) {
        let path = staged.path().to_path_buf();
        match fs::remove_file(&path).await {
            Ok(()) => staged.release(),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => staged.release(),
            Err(error) => {
                // Dropping `staged` retries synchronously.
                tracing::warn!("Failed to remove staged file {:?}: {}", path, error);
            }
        }
    }
}
