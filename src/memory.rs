//! In-process [`MultipartBackend`].
//!
//! Holds everything in memory and enforces the subset of S3 multipart rules that callers of
//! [`crate::MultipartSession`] run into: unknown buckets and upload ids, part number range,
//! ascending and previously uploaded parts on completion, and the minimum size of every part but
//! the last. Checksums are never computed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::{AbortedUpload, CompletedUpload, MultipartBackend, ObjectPath, Part};

/// Smallest allowed size for every part except the last, as in S3.
pub const DEFAULT_MIN_PART_SIZE: usize = 5 * 1024 * 1024;
pub const MAX_PART_NUMBER: i32 = 10_000;
/// Upper bound on parts returned by a single list call, as in S3.
pub const MAX_LIST_PARTS: usize = 1000;

struct StoredPart {
    e_tag: String,
    body: Bytes,
}

struct Upload {
    bucket: String,
    key: String,
    acl: Option<String>,
    parts: BTreeMap<i32, StoredPart>,
}

impl Upload {
    fn targets(&self, path: &ObjectPath) -> bool {
        self.bucket == path.bucket() && self.key == path.key()
    }
}

struct StoredObject {
    body: Bytes,
    acl: Option<String>,
}

#[derive(Default)]
struct State {
    buckets: HashSet<String>,
    uploads: HashMap<String, Upload>,
    objects: HashMap<(String, String), StoredObject>,
}

impl State {
    fn upload(&self, path: &ObjectPath, upload_id: &str) -> Result<&Upload> {
        self.uploads
            .get(upload_id)
            .filter(|u| u.targets(path))
            .ok_or_else(|| Error::NoSuchUpload(upload_id.to_string()))
    }

    fn upload_mut(&mut self, path: &ObjectPath, upload_id: &str) -> Result<&mut Upload> {
        self.uploads
            .get_mut(upload_id)
            .filter(|u| u.targets(path))
            .ok_or_else(|| Error::NoSuchUpload(upload_id.to_string()))
    }
}

pub struct InMemory {
    state: Mutex<State>,
    min_part_size: usize,
}

impl Default for InMemory {
    fn default() -> Self {
        InMemory {
            state: Mutex::new(State::default()),
            min_part_size: DEFAULT_MIN_PART_SIZE,
        }
    }
}

fn e_tag(data: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(data))
}

impl InMemory {
    pub fn with_buckets<I, S>(buckets: I) -> InMemory
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = State {
            buckets: buckets.into_iter().map(Into::into).collect(),
            ..Default::default()
        };
        InMemory {
            state: Mutex::new(state),
            ..Default::default()
        }
    }

    pub fn min_part_size(mut self, min_part_size: usize) -> InMemory {
        self.min_part_size = min_part_size;
        self
    }

    /// Contents of a completed object.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let state = self.state.lock().await;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
    }

    /// ACL the object was created with.
    pub async fn object_acl(&self, bucket: &str, key: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .and_then(|o| o.acl.clone())
    }

    pub async fn in_progress_uploads(&self) -> usize {
        self.state.lock().await.uploads.len()
    }
}

#[async_trait]
impl MultipartBackend for InMemory {
    async fn create_multipart_upload(
        &self,
        path: &ObjectPath,
        acl: Option<&str>,
    ) -> Result<String> {
        let mut state = self.state.lock().await;
        if !state.buckets.contains(path.bucket()) {
            return Err(Error::NoSuchBucket(path.bucket().to_string()));
        }

        let upload_id = Uuid::new_v4().to_string();
        state.uploads.insert(
            upload_id.clone(),
            Upload {
                bucket: path.bucket().to_string(),
                key: path.key().to_string(),
                acl: acl.map(str::to_string),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn list_parts(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        max_parts: i32,
        part_number_marker: i32,
    ) -> Result<Vec<Part>> {
        let state = self.state.lock().await;
        let upload = state.upload(path, upload_id)?;
        let limit = (max_parts.max(0) as usize).min(MAX_LIST_PARTS);

        Ok(upload
            .parts
            .range(part_number_marker.saturating_add(1)..)
            .take(limit)
            .map(|(n, p)| Part::new(*n, p.e_tag.clone()))
            .collect())
    }

    async fn upload_part(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<Part> {
        if !(1..=MAX_PART_NUMBER).contains(&part_number) {
            return Err(Error::InvalidPartNumber(part_number));
        }

        let mut state = self.state.lock().await;
        let upload = state.upload_mut(path, upload_id)?;
        let e_tag = e_tag(&body);
        upload.parts.insert(
            part_number,
            StoredPart {
                e_tag: e_tag.clone(),
                body,
            },
        );
        Ok(Part::new(part_number, e_tag))
    }

    async fn presign_upload_part(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> Result<String> {
        Ok(format!(
            "memory://{}/{}?partNumber={}&uploadId={}&X-Expires={}",
            path.bucket(),
            path.key(),
            part_number,
            upload_id,
            expires_in.as_secs(),
        ))
    }

    async fn complete_multipart_upload(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        parts: &[Part],
    ) -> Result<CompletedUpload> {
        let mut state = self.state.lock().await;
        let upload = state.upload(path, upload_id)?;

        if parts.is_empty() {
            return Err(Error::MalformedCompletion("at least one part must be specified"));
        }
        if parts
            .windows(2)
            .any(|w| w[0].part_number >= w[1].part_number)
        {
            return Err(Error::InvalidPartOrder);
        }

        let mut stored = Vec::with_capacity(parts.len());
        for part in parts {
            match upload.parts.get(&part.part_number) {
                Some(s) if part.e_tag.as_deref() == Some(s.e_tag.as_str()) => stored.push(s),
                _ => return Err(Error::InvalidPart(part.part_number)),
            }
        }

        let last = parts.len() - 1;
        for (i, (part, s)) in parts.iter().zip(&stored).enumerate() {
            if i != last && s.body.len() < self.min_part_size {
                return Err(Error::EntityTooSmall {
                    part_number: part.part_number,
                    size: s.body.len(),
                    minimum: self.min_part_size,
                });
            }
        }

        let mut body = BytesMut::with_capacity(stored.iter().map(|s| s.body.len()).sum());
        let mut hasher = Sha256::new();
        for s in &stored {
            body.extend_from_slice(&s.body);
            hasher.update(s.e_tag.as_bytes());
        }
        let e_tag = format!("\"{:x}-{}\"", hasher.finalize(), stored.len());
        let acl = upload.acl.clone();

        state.uploads.remove(upload_id);
        state.objects.insert(
            (path.bucket().to_string(), path.key().to_string()),
            StoredObject {
                body: body.freeze(),
                acl,
            },
        );

        Ok(CompletedUpload {
            location: Some(format!("memory://{}/{}", path.bucket(), path.key())),
            bucket: Some(path.bucket().to_string()),
            key: Some(path.key().to_string()),
            e_tag: Some(e_tag),
            version_id: None,
        })
    }

    async fn abort_multipart_upload(
        &self,
        path: &ObjectPath,
        upload_id: &str,
    ) -> Result<AbortedUpload> {
        let mut state = self.state.lock().await;
        state.upload(path, upload_id)?;
        state.uploads.remove(upload_id);
        Ok(AbortedUpload::default())
    }
}
