use crate::media_type::resolve_media_type;
use crate::{ContentDigest, ContentStore, HashservError, Result};
use bytes::Bytes;
use mime_guess::Mime;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReadFileOperation {
    store: Arc<ContentStore>,
}

#[derive(Debug, Clone)]
pub struct ReadFileOperationRequest {
    pub digest: String,
    /// When set, the body is served inline with the MIME type of this
    /// extension instead of as an opaque download.
    pub extension: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReadFileOperationResult {
    pub digest: ContentDigest,
    pub body: Bytes,
    pub media_type: Option<Mime>,
}

#[derive(Debug, Clone)]
pub enum ReadFileOperationOutcome {
    Found(ReadFileOperationResult),
    NotFound,
}

impl ReadFileOperation {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self, request: ReadFileOperationRequest) -> Result<ReadFileOperationOutcome> {
        let ReadFileOperationRequest { digest, extension } = request;

        let media_type = match extension {
            Some(extension) => Some(
                resolve_media_type(&extension)
                    .ok_or(HashservError::UnsupportedMediaType(extension))?,
            ),
            None => None,
        };

        let digest = ContentDigest::parse(&digest)?;

        let body = match self.store.fetch(&digest).await {
            Ok(body) => body,
            Err(HashservError::NotFound(_)) => return Ok(ReadFileOperationOutcome::NotFound),
            Err(error) => return Err(error),
        };

        Ok(ReadFileOperationOutcome::Found(ReadFileOperationResult {
            digest,
            body,
            media_type,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn operation(root: &std::path::Path) -> ReadFileOperation {
        let store = ContentStore::new(root.to_path_buf()).unwrap();
        std::fs::write(root.join(HELLO), b"hello").unwrap();
        ReadFileOperation::new(Arc::new(store))
    }

    fn request(digest: &str, extension: Option<&str>) -> ReadFileOperationRequest {
        ReadFileOperationRequest {
            digest: digest.to_string(),
            extension: extension.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_read_download() {
        let temp_dir = tempfile::tempdir().unwrap();
        let read = operation(temp_dir.path());

        let outcome = read.run(request(HELLO, None)).await.unwrap();
        let ReadFileOperationOutcome::Found(result) = outcome else {
            panic!("expected object to be found");
        };
        assert_eq!(result.body, Bytes::from_static(b"hello"));
        assert_eq!(result.digest.as_str(), HELLO);
        assert!(result.media_type.is_none());
    }

    #[tokio::test]
    async fn test_read_with_extension() {
        let temp_dir = tempfile::tempdir().unwrap();
        let read = operation(temp_dir.path());

        let outcome = read
            .run(request(&HELLO.to_ascii_uppercase(), Some("txt")))
            .await
            .unwrap();
        let ReadFileOperationOutcome::Found(result) = outcome else {
            panic!("expected object to be found");
        };
        assert_eq!(result.media_type.unwrap().essence_str(), "text/plain");
    }

    #[tokio::test]
    async fn test_read_missing_and_malformed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let read = operation(temp_dir.path());

        let missing = "0".repeat(64);
        assert!(matches!(
            read.run(request(&missing, None)).await.unwrap(),
            ReadFileOperationOutcome::NotFound
        ));
        assert!(matches!(
            read.run(request("not-a-real-digest", None)).await,
            Err(HashservError::InvalidDigest(_))
        ));
    }

    #[tokio::test]
    async fn test_read_unknown_extension() {
        let temp_dir = tempfile::tempdir().unwrap();
        let read = operation(temp_dir.path());

        assert!(matches!(
            read.run(request(HELLO, Some("nope-not-real"))).await,
            Err(HashservError::UnsupportedMediaType(_))
        ));
    }
}
