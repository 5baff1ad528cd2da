use crate::filename::{is_allowed, secure_filename};
use crate::{
    CommitResult, ContentDigest, ContentStore, HashservError, Result, StagedObject, StagingArea,
    StoreConfig,
};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Clone)]
pub struct UploadFileOperation {
    staging: Arc<StagingArea>,
    store: Arc<ContentStore>,
    allowed_extensions: Arc<Vec<String>>,
    allow_empty: bool,
}

#[derive(Debug, Clone)]
pub struct UploadFileOperationRequest {
    pub file_name: String,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct UploadFileOperationResult {
    pub digest: ContentDigest,
    pub file_name: String,
    pub size_bytes: u64,
    pub reused: bool,
}

impl UploadFileOperation {
    pub fn new(config: &StoreConfig, staging: Arc<StagingArea>, store: Arc<ContentStore>) -> Self {
        Self {
            staging,
            store,
            allowed_extensions: Arc::new(config.normalized_extensions()),
            allow_empty: config.allow_empty,
        }
    }

    pub async fn run(&self, request: UploadFileOperationRequest) -> Result<UploadFileOperationResult> {
        let UploadFileOperationRequest { file_name, body } = request;

        if !is_allowed(&file_name, &self.allowed_extensions) {
            return Err(HashservError::InvalidInput(format!(
                "file type not allowed: {}",
                file_name
            )));
        }

        if secure_filename(&file_name).is_empty() {
            return Err(HashservError::InvalidInput(format!(
                "invalid file name: {}",
                file_name
            )));
        }

        if body.is_empty() && !self.allow_empty {
            return Err(HashservError::InvalidInput(
                "empty uploads are not allowed".to_string(),
            ));
        }

        let staged = self.staging.stage(&file_name, body).await?;
        let staged_name = staged.name().to_string();
        let committed = self.commit_staged(staged).await?;

        tracing::info!(
            "Uploaded {} as {} ({} bytes, reused={})",
            staged_name,
            committed.digest,
            committed.size_bytes,
            committed.reused
        );

        Ok(UploadFileOperationResult {
            digest: committed.digest,
            file_name: staged_name,
            size_bytes: committed.size_bytes,
            reused: committed.reused,
        })
    }

    /// Digest and commit a staged upload; the staged file never outlives a
    /// failure.
    async fn commit_staged(&self, mut staged: StagedObject) -> Result<CommitResult> {
        let digest = match self.store.digest(&mut staged).await {
            Ok(digest) => digest,
            Err(error) => {
                let staged_name = staged.name().to_string();
                if let Err(discard_error) = self.staging.discard(staged).await {
                    tracing::warn!(
                        "Failed to discard staged upload {}: {}",
                        staged_name,
                        discard_error
                    );
                }
                return Err(error);
            }
        };

        self.store.commit(staged, &digest).await
    }
}
