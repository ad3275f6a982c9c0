//! Multipart upload errors

use thiserror;

pub type Result<T> = std::result::Result<T, Error>;

/// General purpose [`super::MultipartBackend`] and [`super::MultipartSession`] error handling.
///
/// Remote failures are carried as-is; nothing here retries or reinterprets them.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("http error")]
    HTTPError(#[from] http::Error),

    #[error("config deserialization error")]
    ConfigError(#[from] serde_yaml::Error),
    #[error("io error")]
    IOError(#[from] std::io::Error),

    #[error("aws sdk create multipart upload error")]
    AWSSDKCreateMultipartUploadError(
        #[from]
        aws_sdk_s3::error::SdkError<
            aws_sdk_s3::operation::create_multipart_upload::CreateMultipartUploadError,
        >,
    ),
    #[error("aws sdk list parts error")]
    AWSSDKListPartsError(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::list_parts::ListPartsError>,
    ),
    #[error("aws sdk upload part error")]
    AWSSDKUploadPartError(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::upload_part::UploadPartError>,
    ),
    #[error("aws sdk complete multipart upload error")]
    AWSSDKCompleteMultipartUploadError(
        #[from]
        aws_sdk_s3::error::SdkError<
            aws_sdk_s3::operation::complete_multipart_upload::CompleteMultipartUploadError,
        >,
    ),
    #[error("aws sdk abort multipart upload error")]
    AWSSDKAbortMultipartUploadError(
        #[from]
        aws_sdk_s3::error::SdkError<
            aws_sdk_s3::operation::abort_multipart_upload::AbortMultipartUploadError,
        >,
    ),
    #[error("aws sdk credentials error")]
    AWSSDKCredentialsError(#[from] aws_credential_types::provider::error::CredentialsError),
    #[error("aws sdk presigning config error")]
    AWSSDKPresigningConfigError(#[from] aws_sdk_s3::presigning::PresigningConfigError),

    #[error("failed to initiate multipart upload: {0}")]
    FailedToInitiateUpload(&'static str),
    #[error("missing upload id for {0}")]
    MissingUploadId(String),
    #[error("url expiration out of range: {0} seconds")]
    InvalidUrlExpiration(u64),

    // rejections from the in-memory backend, modeled on the S3 error codes of the same name
    #[error("no such bucket: {0}")]
    NoSuchBucket(String),
    #[error("no such upload: {0}")]
    NoSuchUpload(String),
    #[error("part number must be an integer between 1 and 10000: {0}")]
    InvalidPartNumber(i32),
    #[error("invalid part: {0}")]
    InvalidPart(i32),
    #[error("part list is not in ascending order")]
    InvalidPartOrder,
    #[error("part {part_number} is smaller than the minimum allowed size ({size} < {minimum})")]
    EntityTooSmall {
        part_number: i32,
        size: usize,
        minimum: usize,
    },
    #[error("malformed completion request: {0}")]
    MalformedCompletion(&'static str),

    #[error("path error: {0}")]
    PathError(#[from] PathError),
}

/// Error type used when parsing [`super::ObjectPath`] from a string.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PathError {
    #[error("path must not be empty")]
    Empty,

    #[error("path must name a key within the bucket")]
    MissingKey,

    #[error("bucket name must match regex: {0}")]
    BucketNameMustMatchRegex(String),

    #[error("version id must not be empty")]
    EmptyVersionId,
}
