use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

mod config;
pub use config::{Backend, Config};
mod errors;
pub use errors::{Error, PathError, Result};
pub mod memory;
pub use memory::InMemory;
mod part;
pub use part::{AbortedUpload, CompletedUpload, Part, PartLink, PartLinks};
mod path;
pub use path::ObjectPath;
pub(crate) mod s3;
pub use s3::S3Config;
pub use s3::S3;
mod session;
pub use session::MultipartSession;

/// The remote multipart upload primitives a [`MultipartSession`] forwards to.
///
/// Implementations pass every call straight through to the storage service. Validation of part
/// sizes, part numbers and completeness is the service's job, as is rejecting operations on
/// upload ids that were already completed or aborted.
#[async_trait]
pub trait MultipartBackend: Send + Sync + 'static {
    /// Returns the upload id assigned by the service.
    async fn create_multipart_upload(&self, path: &ObjectPath, acl: Option<&str>)
        -> Result<String>;

    async fn list_parts(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        max_parts: i32,
        part_number_marker: i32,
    ) -> Result<Vec<Part>>;

    async fn upload_part(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<Part>;

    async fn presign_upload_part(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> Result<String>;

    async fn complete_multipart_upload(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        parts: &[Part],
    ) -> Result<CompletedUpload>;

    async fn abort_multipart_upload(
        &self,
        path: &ObjectPath,
        upload_id: &str,
    ) -> Result<AbortedUpload>;
}
