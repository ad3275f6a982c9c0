use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded chunk of a multipart upload as reported by the storage service.
///
/// Only the fields the completion request accepts are kept. Deserializing a caller-supplied
/// record silently drops anything else it carries (sizes, timestamps, owner info, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(rename = "PartNumber")]
    pub part_number: i32,
    #[serde(rename = "ETag", default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(rename = "ChecksumCRC32", default, skip_serializing_if = "Option::is_none")]
    pub checksum_crc32: Option<String>,
    #[serde(rename = "ChecksumCRC32C", default, skip_serializing_if = "Option::is_none")]
    pub checksum_crc32_c: Option<String>,
    #[serde(rename = "ChecksumSHA1", default, skip_serializing_if = "Option::is_none")]
    pub checksum_sha1: Option<String>,
    #[serde(rename = "ChecksumSHA256", default, skip_serializing_if = "Option::is_none")]
    pub checksum_sha256: Option<String>,
}

impl Part {
    pub fn new(part_number: i32, e_tag: impl Into<String>) -> Part {
        Part {
            part_number,
            e_tag: Some(e_tag.into()),
            ..Default::default()
        }
    }
}

/// A presigned URL allowing an out-of-band client to upload one part directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartLink {
    pub part: i32,
    pub url: String,
    pub expiration: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartLinks {
    pub parts: Vec<PartLink>,
}

/// Expiration shared by every link of a batch: `now + expires_in` seconds, truncated to whole
/// seconds. `None` when the result is not representable.
pub(crate) fn link_expiration(now: DateTime<Utc>, expires_in: u64) -> Option<DateTime<Utc>> {
    let expires_in = i64::try_from(expires_in).ok().and_then(Duration::try_seconds)?;
    now.checked_add_signed(expires_in)
        .map(|expiration| expiration.trunc_subsecs(0))
}

/// Result of aborting a multipart upload, forwarded verbatim from the storage service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortedUpload {
    pub request_charged: Option<String>,
}

/// Result of completing a multipart upload, forwarded verbatim from the storage service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedUpload {
    pub location: Option<String>,
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub e_tag: Option<String>,
    pub version_id: Option<String>,
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn unrecognized_fields_are_dropped() {
        let record = json!({
            "PartNumber": 3,
            "ETag": "\"abc\"",
            "ChecksumCRC32": "crc",
            "ChecksumSHA256": "sha",
            "Size": 7340032,
            "LastModified": "2024-01-01T00:00:00Z",
            "CallerNote": "ignore me",
        });
        let part: Part = serde_json::from_value(record).expect("record should deserialize");
        assert_eq!(
            part,
            Part {
                part_number: 3,
                e_tag: Some("\"abc\"".to_string()),
                checksum_crc32: Some("crc".to_string()),
                checksum_sha256: Some("sha".to_string()),
                ..Default::default()
            }
        );

        let forwarded = serde_json::to_value(&part).expect("part should serialize");
        assert_eq!(
            forwarded,
            json!({
                "PartNumber": 3,
                "ETag": "\"abc\"",
                "ChecksumCRC32": "crc",
                "ChecksumSHA256": "sha",
            })
        );
    }

    #[test]
    fn all_checksums_are_preserved() {
        let record = json!({
            "PartNumber": 1,
            "ETag": "e",
            "ChecksumCRC32": "a",
            "ChecksumCRC32C": "b",
            "ChecksumSHA1": "c",
            "ChecksumSHA256": "d",
        });
        let part: Part = serde_json::from_value(record.clone()).expect("record should deserialize");
        assert_eq!(part.checksum_crc32_c.as_deref(), Some("b"));
        assert_eq!(part.checksum_sha1.as_deref(), Some("c"));
        assert_eq!(serde_json::to_value(&part).expect("part should serialize"), record);
    }

    #[test]
    fn expiration_is_truncated_to_seconds() {
        let now = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
            + Duration::milliseconds(750);
        let expiration = link_expiration(now, 3600).expect("expiration should be representable");
        assert_eq!(
            expiration,
            Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0)
                .single()
                .expect("valid timestamp")
        );

        let link = PartLink {
            part: 1,
            url: "https://example.com".to_string(),
            expiration,
        };
        let value = serde_json::to_value(&link).expect("link should serialize");
        assert_eq!(value["expiration"], json!("2024-05-01T13:00:00Z"));
    }

    #[test]
    fn unrepresentable_expiration() {
        let now = Utc::now();
        for expires_in in [u64::MAX, 1 << 60, i64::MAX as u64 + 1, (i64::MAX / 1000) as u64 + 1] {
            assert_eq!(link_expiration(now, expires_in), None, "{expires_in}");
        }
        assert_eq!(link_expiration(now, 0), Some(now.trunc_subsecs(0)));
    }
}
