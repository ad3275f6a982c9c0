use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::PathError;

static BUCKET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("bucket name regex must compile")
});

const VERSION_ID_QUERY: &str = "?versionId=";

/// The (bucket, key, version) triple a multipart upload targets.
///
/// Parsed from composite path strings of the form `[s3://]bucket/key[?versionId=v]`:
///
/// * an `s3://` or `s3a://` scheme prefix is dropped, as are leading `/`
/// * the first `/` separates the bucket from the key; the key must not be empty
/// * bucket names must follow the S3 naming rules (lowercase letters, digits, `.` and `-`, 3 to
///   63 characters, beginning and ending with a letter or digit)
/// * a trailing `?versionId=` query names the object version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectPath {
    bucket: String,
    key: String,
    version_id: Option<String>,
}

impl ObjectPath {
    /// For callers that already hold a validated bucket and key. No checks are performed.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> ObjectPath {
        ObjectPath {
            bucket: bucket.into(),
            key: key.into(),
            version_id: None,
        }
    }

    pub fn with_version_id(mut self, version_id: impl Into<String>) -> ObjectPath {
        self.version_id = Some(version_id.into());
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn version_id(&self) -> Option<&str> {
        self.version_id.as_deref()
    }
}

impl FromStr for ObjectPath {
    type Err = PathError;

    fn from_str(s: &str) -> std::result::Result<ObjectPath, PathError> {
        let s = s
            .strip_prefix("s3://")
            .or_else(|| s.strip_prefix("s3a://"))
            .unwrap_or(s)
            .trim_start_matches('/');
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let (s, version_id) = match s.split_once(VERSION_ID_QUERY) {
            Some((_, "")) => return Err(PathError::EmptyVersionId),
            Some((s, v)) => (s, Some(v.to_string())),
            None => (s, None),
        };

        let (bucket, key) = match s.split_once('/') {
            Some((_, "")) | None => return Err(PathError::MissingKey),
            Some(split) => split,
        };

        if !BUCKET_RE.is_match(bucket) {
            return Err(PathError::BucketNameMustMatchRegex(
                BUCKET_RE.as_str().to_string(),
            ));
        }

        Ok(ObjectPath {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id,
        })
    }
}

impl TryFrom<&str> for ObjectPath {
    type Error = PathError;

    fn try_from(s: &str) -> std::result::Result<ObjectPath, PathError> {
        s.parse()
    }
}

impl std::fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)?;
        if let Some(v) = &self.version_id {
            write!(f, "{VERSION_ID_QUERY}{v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::plain("bucket/key", Ok(ObjectPath::new("bucket", "key")))]
    #[case::nested("bucket/a/b/c.bin", Ok(ObjectPath::new("bucket", "a/b/c.bin")))]
    #[case::scheme("s3://bucket/key", Ok(ObjectPath::new("bucket", "key")))]
    #[case::s3a_scheme("s3a://bucket/key", Ok(ObjectPath::new("bucket", "key")))]
    #[case::leading_slash("/bucket/key", Ok(ObjectPath::new("bucket", "key")))]
    #[case::version("bucket/key?versionId=abc", Ok(ObjectPath::new("bucket", "key").with_version_id("abc")))]
    #[case::empty("", Err(PathError::Empty))]
    #[case::only_scheme("s3://", Err(PathError::Empty))]
    #[case::bucket_only("bucket", Err(PathError::MissingKey))]
    #[case::trailing_slash("bucket/", Err(PathError::MissingKey))]
    #[case::empty_version("bucket/key?versionId=", Err(PathError::EmptyVersionId))]
    #[case::uppercase_bucket("Bucket/key", Err(PathError::BucketNameMustMatchRegex(BUCKET_RE.as_str().to_string())))]
    #[case::short_bucket("ab/key", Err(PathError::BucketNameMustMatchRegex(BUCKET_RE.as_str().to_string())))]
    fn validate_from_str(
        #[case] input: &str,
        #[case] expected: std::result::Result<ObjectPath, PathError>,
    ) {
        let actual: std::result::Result<ObjectPath, PathError> = input.parse();
        assert_eq!(expected, actual);
    }

    #[rstest]
    #[case("bucket/key")]
    #[case("bucket/a/b")]
    #[case("bucket/key?versionId=3")]
    fn display_matches_input(#[case] input: &str) {
        let path: ObjectPath = input.try_into().expect("path should parse");
        assert_eq!(input, path.to_string());
    }
}
