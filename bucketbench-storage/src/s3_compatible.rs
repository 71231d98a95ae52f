use std::fmt;
use std::io;
use std::time::Duration;

use futures_util::{StreamExt, TryStreamExt};
use s3::creds::Credentials;
use s3::{Bucket, Region};

use crate::error::StorageError;
use crate::store::{ObjectDownload, ObjectStore};

/// Configuration for an [`S3CompatibleStore`].
pub struct S3StoreConfig {
    /// The name of the bucket to benchmark against.
    pub bucket: String,
    /// Region name; S3-compatible stores often accept any value here.
    pub region: String,
    /// Endpoint URL; when absent, the AWS endpoint for `region` is used.
    pub endpoint: Option<String>,
    /// Access key; anonymous credentials are used when both keys are absent.
    pub access_key: Option<String>,
    /// Secret key.
    pub secret_key: Option<String>,
    /// Use path-style addressing (required by MinIO and SeaweedFS).
    pub path_style: bool,
    /// Per-request timeout.
    pub request_timeout: Option<Duration>,
}

impl Default for S3StoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: String::new(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            path_style: false,
            request_timeout: None,
        }
    }
}

impl fmt::Debug for S3StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3StoreConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("path_style", &self.path_style)
            .finish_non_exhaustive()
    }
}

/// An [`ObjectStore`] bound to a bucket on an S3-compatible endpoint.
pub struct S3CompatibleStore {
    bucket: Box<Bucket>,
    bucket_name: String,
}

impl S3CompatibleStore {
    /// Creates a new store bound to the configured bucket.
    pub fn new(config: S3StoreConfig) -> Result<Self, StorageError> {
        let credentials = if config.access_key.is_none() && config.secret_key.is_none() {
            Credentials::anonymous()?
        } else {
            Credentials::new(
                config.access_key.as_deref(),
                config.secret_key.as_deref(),
                None,
                None,
                None,
            )?
        };

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: match config.endpoint {
                Some(endpoint) => endpoint,
                None => format!("s3-{}.amazonaws.com", config.region),
            },
        };

        let mut bucket = Bucket::new(&config.bucket, region, credentials)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }
        if let Some(request_timeout) = config.request_timeout {
            bucket = bucket.with_request_timeout(request_timeout)?;
        }

        Ok(Self {
            bucket,
            bucket_name: config.bucket,
        })
    }
}

impl fmt::Debug for S3CompatibleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3CompatibleStore")
            .field("bucket", &self.bucket.name())
            .field("endpoint", &self.bucket.host())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3CompatibleStore {
    fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    async fn list_objects(&self) -> Result<Vec<String>, StorageError> {
        tracing::debug!(bucket = %self.bucket_name, "listing bucket");

        let pages = self.bucket.list(String::new(), None).await?;
        let keys = pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| object.key)
            .collect();

        Ok(keys)
    }

    async fn get_object(&self, key: &str) -> Result<ObjectDownload, StorageError> {
        tracing::debug!(bucket = %self.bucket_name, key, "opening object");

        let (head, code) = self.bucket.head_object(key).await?;
        if !(200..300).contains(&code) {
            return Err(StorageError::UnexpectedStatus {
                key: key.to_owned(),
                code,
            });
        }
        let size = head
            .content_length
            .and_then(|length| u64::try_from(length).ok())
            .ok_or_else(|| StorageError::MissingSize {
                key: key.to_owned(),
            })?;

        let response = self.bucket.get_object_stream(key).await?;
        if !(200..300).contains(&response.status_code) {
            return Err(StorageError::UnexpectedStatus {
                key: key.to_owned(),
                code: response.status_code,
            });
        }
        let stream = response.bytes.map_err(io::Error::other).boxed();

        Ok(ObjectDownload { size, stream })
    }
}
