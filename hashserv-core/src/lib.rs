//! Hashserv Core - content-addressed file storage
//!
//! Uploads are written to a staging directory, hashed with SHA256 and then
//! renamed into a flat store keyed by the hex digest:
//! - identical content always lands on the same key
//! - the rename is the only way an object appears, so readers never see
//!   partial files
//! - re-uploading existing content is a successful no-op

pub mod config;
pub mod digest;
pub mod error;
pub mod filename;
pub mod media_type;
pub mod operations;
pub mod storage;

pub use config::StoreConfig;
pub use digest::{ContentDigest, DIGEST_HEX_LEN, compute_hash};
pub use error::{HashservError, Result};
pub use filename::{extension_of, is_allowed, secure_filename};
pub use media_type::resolve_media_type;
pub use operations::{
    ListFilesOperation, ListFilesOperationResult, ReadFileOperation, ReadFileOperationOutcome,
    ReadFileOperationRequest, ReadFileOperationResult, UploadFileOperation,
    UploadFileOperationRequest, UploadFileOperationResult,
};
pub use storage::{CommitResult, ContentStore, StagedObject, StagingArea, StoredObject};

pub use mime_guess::Mime;
