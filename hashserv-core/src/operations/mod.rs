pub mod list_files;
pub mod read_file;
pub mod upload_file;

pub use list_files::{ListFilesOperation, ListFilesOperationResult};
pub use read_file::{
    ReadFileOperation, ReadFileOperationOutcome, ReadFileOperationRequest, ReadFileOperationResult,
};
pub use upload_file::{
    UploadFileOperation, UploadFileOperationRequest, UploadFileOperationResult,
};
