use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;

use crate::errors::{Error, Result};
use crate::part::link_expiration;
use crate::{
    AbortedUpload, CompletedUpload, MultipartBackend, ObjectPath, Part, PartLink, PartLinks,
};

/// One multipart upload of one object.
///
/// The session holds no state beyond its target and upload id; parts live on the storage service
/// and are only ever forwarded. Failures from the backend propagate unchanged and nothing is
/// retried or cleaned up on the caller's behalf.
pub struct MultipartSession {
    backend: Arc<dyn MultipartBackend>,
    path: ObjectPath,
    acl: Option<String>,
    upload_id: Option<String>,
}

impl MultipartSession {
    /// Pass `upload_id` to resume an upload created earlier, or `None` and call
    /// [`MultipartSession::create`]. An empty `acl` is treated as unset.
    pub fn new(
        backend: Arc<dyn MultipartBackend>,
        path: ObjectPath,
        acl: Option<String>,
        upload_id: Option<String>,
    ) -> MultipartSession {
        MultipartSession {
            backend,
            path,
            acl: acl.filter(|a| !a.is_empty()),
            upload_id,
        }
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn acl(&self) -> Option<&str> {
        self.acl.as_deref()
    }

    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    fn require_upload_id(&self) -> Result<&str> {
        self.upload_id
            .as_deref()
            .ok_or_else(|| Error::MissingUploadId(self.path.to_string()))
    }

    pub async fn create(&mut self) -> Result<String> {
        let upload_id = self
            .backend
            .create_multipart_upload(&self.path, self.acl.as_deref())
            .await?;
        tracing::debug!(path = %self.path, %upload_id, "created multipart upload");
        self.upload_id = Some(upload_id.clone());
        Ok(upload_id)
    }

    /// Lists at most `max_parts` parts starting from the first one. Parts beyond the bound are
    /// not fetched.
    pub async fn list_parts(&self, max_parts: i32) -> Result<Vec<Part>> {
        let upload_id = self.require_upload_id()?;
        let parts = self
            .backend
            .list_parts(&self.path, upload_id, max_parts, 0)
            .await?;
        tracing::debug!(
            path = %self.path,
            upload_id,
            max_parts,
            listed = parts.len(),
            "listed parts"
        );
        Ok(parts)
    }

    pub async fn upload_part(&self, part_number: i32, body: impl Into<Bytes>) -> Result<Part> {
        let upload_id = self.require_upload_id()?;
        let body = body.into();
        let size = body.len();
        let part = self
            .backend
            .upload_part(&self.path, upload_id, part_number, body)
            .await?;
        tracing::debug!(path = %self.path, upload_id, part_number, size, "uploaded part");
        Ok(part)
    }

    /// Presigns upload URLs for parts `1..=count`, valid for `url_expiration` seconds.
    ///
    /// Every link carries the same expiration, computed once before signing.
    pub async fn part_links(&self, count: i32, url_expiration: u64) -> Result<PartLinks> {
        let upload_id = self.require_upload_id()?;
        let expires_in = Duration::from_secs(url_expiration);
        let expiration = link_expiration(Utc::now(), url_expiration)
            .ok_or(Error::InvalidUrlExpiration(url_expiration))?;

        let mut parts = Vec::with_capacity(count.max(0) as usize);
        for part in 1..=count {
            let url = self
                .backend
                .presign_upload_part(&self.path, upload_id, part, expires_in)
                .await?;
            parts.push(PartLink {
                part,
                url,
                expiration,
            });
        }
        tracing::debug!(path = %self.path, upload_id, count, %expiration, "presigned part links");
        Ok(PartLinks { parts })
    }

    /// Completes the upload with `parts`, typically the output of
    /// [`MultipartSession::list_parts`] or records reported by out-of-band uploaders.
    pub async fn complete(&self, parts: &[Part]) -> Result<CompletedUpload> {
        let upload_id = self.require_upload_id()?;
        let completed = self
            .backend
            .complete_multipart_upload(&self.path, upload_id, parts)
            .await?;
        tracing::debug!(
            path = %self.path,
            upload_id,
            parts = parts.len(),
            e_tag = completed.e_tag.as_deref(),
            "completed multipart upload"
        );
        Ok(completed)
    }

    pub async fn abort(&self) -> Result<AbortedUpload> {
        let upload_id = self.require_upload_id()?;
        let aborted = self
            .backend
            .abort_multipart_upload(&self.path, upload_id)
            .await?;
        tracing::debug!(path = %self.path, upload_id, "aborted multipart upload");
        Ok(aborted)
    }
}
