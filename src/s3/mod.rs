use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::operation::abort_multipart_upload::AbortMultipartUploadOutput;
use aws_sdk_s3::operation::create_multipart_upload::CreateMultipartUploadOutput;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use aws_sdk_s3::Client;
use bytes::Bytes;
use http::Uri;
use serde::Deserialize;

pub(crate) mod logging;
use crate::{
    errors::{Error, Result},
    s3::logging::LoggingInterceptor,
    AbortedUpload, CompletedUpload, MultipartBackend, ObjectPath, Part,
};

#[derive(Clone, Deserialize)]
pub struct S3Config {
    secret_key: String,
    access_key: String,
    hostname: String,
    region: String,
    #[serde(default)]
    force_path_style: bool,
}

impl S3Config {
    pub async fn new_backend(&self) -> Result<S3> {
        let scp = SharedCredentialsProvider::new(
            Credentials::new(
                self.access_key.clone(),
                self.secret_key.clone(),
                None,
                None,
                "multipart-objectstore",
            )
            .provide_credentials()
            .await?,
        );

        let uri = Uri::builder()
            .scheme("https")
            .authority(self.hostname.as_str())
            .path_and_query("/")
            .build()?;

        let sdk_config = aws_config::load_from_env().await;

        let config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .region(Region::new(self.region.clone()))
            .credentials_provider(scp)
            .endpoint_url(uri.to_string())
            .force_path_style(self.force_path_style)
            .interceptor(LoggingInterceptor)
            .build();

        Ok(S3::new(Client::from_conf(config)))
    }
}

/// [`MultipartBackend`] over an S3-compatible service.
#[derive(Clone)]
pub struct S3 {
    client: Client,
}

impl S3 {
    pub fn new(client: Client) -> S3 {
        S3 { client }
    }
}

impl From<aws_sdk_s3::types::Part> for Part {
    fn from(p: aws_sdk_s3::types::Part) -> Part {
        Part {
            part_number: p.part_number,
            e_tag: p.e_tag,
            checksum_crc32: p.checksum_crc32,
            checksum_crc32_c: p.checksum_crc32_c,
            checksum_sha1: p.checksum_sha1,
            checksum_sha256: p.checksum_sha256,
        }
    }
}

impl From<&Part> for CompletedPart {
    fn from(p: &Part) -> CompletedPart {
        CompletedPart::builder()
            .part_number(p.part_number)
            .set_e_tag(p.e_tag.clone())
            .set_checksum_crc32(p.checksum_crc32.clone())
            .set_checksum_crc32_c(p.checksum_crc32_c.clone())
            .set_checksum_sha1(p.checksum_sha1.clone())
            .set_checksum_sha256(p.checksum_sha256.clone())
            .build()
    }
}

fn upload_id(output: CreateMultipartUploadOutput) -> Result<String> {
    output
        .upload_id
        .ok_or(Error::FailedToInitiateUpload("missing upload id"))
}

impl From<AbortMultipartUploadOutput> for AbortedUpload {
    fn from(output: AbortMultipartUploadOutput) -> AbortedUpload {
        AbortedUpload {
            request_charged: output
                .request_charged
                .map(|charged| charged.as_str().to_string()),
        }
    }
}

#[async_trait]
impl MultipartBackend for S3 {
    async fn create_multipart_upload(
        &self,
        path: &ObjectPath,
        acl: Option<&str>,
    ) -> Result<String> {
        let create_multipart_upload_output = self
            .client
            .create_multipart_upload()
            .set_acl(acl.map(ObjectCannedAcl::from))
            .key(path.key())
            .bucket(path.bucket())
            .send()
            .await?;

        upload_id(create_multipart_upload_output)
    }

    async fn list_parts(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        max_parts: i32,
        part_number_marker: i32,
    ) -> Result<Vec<Part>> {
        let list_parts_output = self
            .client
            .list_parts()
            .upload_id(upload_id)
            .max_parts(max_parts)
            .part_number_marker(part_number_marker.to_string())
            .key(path.key())
            .bucket(path.bucket())
            .send()
            .await?;

        Ok(list_parts_output
            .parts
            .unwrap_or_default()
            .into_iter()
            .map(Part::from)
            .collect())
    }

    async fn upload_part(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<Part> {
        let content_length = body.len() as i64;
        let upload_part_output = self
            .client
            .upload_part()
            .upload_id(upload_id)
            .part_number(part_number)
            .key(path.key())
            .body(ByteStream::from(body))
            .content_length(content_length)
            .bucket(path.bucket())
            .send()
            .await?;

        Ok(Part {
            part_number,
            e_tag: upload_part_output.e_tag,
            checksum_crc32: upload_part_output.checksum_crc32,
            checksum_crc32_c: upload_part_output.checksum_crc32_c,
            checksum_sha1: upload_part_output.checksum_sha1,
            checksum_sha256: upload_part_output.checksum_sha256,
        })
    }

    async fn presign_upload_part(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> Result<String> {
        let presigned_request = self
            .client
            .upload_part()
            .upload_id(upload_id)
            .part_number(part_number)
            .key(path.key())
            .bucket(path.bucket())
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await?;

        Ok(presigned_request.uri().to_string())
    }

    async fn complete_multipart_upload(
        &self,
        path: &ObjectPath,
        upload_id: &str,
        parts: &[Part],
    ) -> Result<CompletedUpload> {
        let mpu = CompletedMultipartUpload::builder()
            .set_parts(Some(parts.iter().map(CompletedPart::from).collect()))
            .build();

        let complete_multipart_upload_output = self
            .client
            .complete_multipart_upload()
            .multipart_upload(mpu)
            .upload_id(upload_id)
            .key(path.key())
            .bucket(path.bucket())
            .send()
            .await?;

        Ok(CompletedUpload {
            location: complete_multipart_upload_output.location,
            bucket: complete_multipart_upload_output.bucket,
            key: complete_multipart_upload_output.key,
            e_tag: complete_multipart_upload_output.e_tag,
            version_id: complete_multipart_upload_output.version_id,
        })
    }

    async fn abort_multipart_upload(
        &self,
        path: &ObjectPath,
        upload_id: &str,
    ) -> Result<AbortedUpload> {
        let abort_multipart_upload_output = self
            .client
            .abort_multipart_upload()
            .upload_id(upload_id)
            .key(path.key())
            .bucket(path.bucket())
            .send()
            .await?;

        Ok(abort_multipart_upload_output.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn completed_part_carries_only_recognized_fields() {
        let part = Part {
            part_number: 2,
            e_tag: Some("\"etag\"".to_string()),
            checksum_crc32_c: Some("crc32c".to_string()),
            checksum_sha1: Some("sha1".to_string()),
            ..Default::default()
        };
        let completed = CompletedPart::from(&part);
        assert_eq!(completed.part_number(), 2);
        assert_eq!(completed.e_tag(), Some("\"etag\""));
        assert_eq!(completed.checksum_crc32(), None);
        assert_eq!(completed.checksum_crc32_c(), Some("crc32c"));
        assert_eq!(completed.checksum_sha1(), Some("sha1"));
        assert_eq!(completed.checksum_sha256(), None);
    }

    #[test]
    fn create_output_without_upload_id_fails() {
        let output = CreateMultipartUploadOutput::builder().build();
        assert!(matches!(
            upload_id(output),
            Err(Error::FailedToInitiateUpload("missing upload id"))
        ));

        let output = CreateMultipartUploadOutput::builder()
            .upload_id("upload-1")
            .build();
        assert_eq!(upload_id(output).expect("upload id should be present"), "upload-1");
    }

    #[test]
    fn abort_output_forwards_request_charged() {
        let output = AbortMultipartUploadOutput::builder()
            .request_charged(aws_sdk_s3::types::RequestCharged::Requester)
            .build();
        assert_eq!(
            AbortedUpload::from(output),
            AbortedUpload {
                request_charged: Some("requester".to_string()),
            }
        );
        assert_eq!(
            AbortedUpload::from(AbortMultipartUploadOutput::builder().build()),
            AbortedUpload::default()
        );
    }

    #[test]
    fn listed_part_converts() {
        let listed = aws_sdk_s3::types::Part::builder()
            .part_number(1)
            .e_tag("\"e\"")
            .checksum_sha256("sha256")
            .size(5 * 1024 * 1024)
            .build();
        let part = Part::from(listed);
        assert_eq!(
            part,
            Part {
                part_number: 1,
                e_tag: Some("\"e\"".to_string()),
                checksum_sha256: Some("sha256".to_string()),
                ..Default::default()
            }
        );
    }
}
