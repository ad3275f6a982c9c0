use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::{InMemory, MultipartBackend, MultipartSession, ObjectPath, Result, S3Config};

#[derive(Clone, Deserialize)]
pub struct Config {
    pub backend: Backend,
    /// Canned ACL applied when a multipart upload is created.
    pub acl: Option<String>,
}

#[derive(Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Backend {
    S3(S3Config),
    Memory {
        #[serde(default)]
        buckets: Vec<String>,
    },
}

impl Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Config> {
        let mut f = File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    pub async fn new_backend(&self) -> Result<Arc<dyn MultipartBackend>> {
        match &self.backend {
            Backend::S3(cfg) => Ok(Arc::new(cfg.new_backend().await?)),
            Backend::Memory { buckets } => {
                Ok(Arc::new(InMemory::with_buckets(buckets.clone())))
            }
        }
    }

    /// Binds a session to `path` using the configured ACL.
    pub fn session(
        &self,
        backend: Arc<dyn MultipartBackend>,
        path: ObjectPath,
        upload_id: Option<String>,
    ) -> MultipartSession {
        MultipartSession::new(backend, path, self.acl.clone(), upload_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_s3_backend() {
        let config: Config = serde_yaml::from_str(
            r#"
backend:
  type: S3
  access_key: access
  secret_key: secret
  hostname: s3.example.com
  region: us-east-1
acl: bucket-owner-full-control
"#,
        )
        .expect("config should parse");
        assert!(matches!(config.backend, Backend::S3(_)));
        assert_eq!(config.acl.as_deref(), Some("bucket-owner-full-control"));
    }

    #[tokio::test]
    async fn memory_backend_session_without_acl() {
        let config: Config = serde_yaml::from_str(
            r#"
backend:
  type: Memory
  buckets: [bucket]
"#,
        )
        .expect("config should parse");
        assert!(config.acl.is_none());

        let backend = config.new_backend().await.expect("backend should build");
        let mut session = config.session(backend, ObjectPath::new("bucket", "key"), None);
        assert_eq!(session.acl(), None);
        assert_eq!(session.upload_id(), None);
        session.create().await.expect("bucket should exist");
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Config::from_path("./does-not-exist.yml"),
            Err(crate::Error::IOError(_))
        ));
    }
}
