//! AWS S3 storage backend

use crate::error::{Error, Result};
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

/// AWS S3 storage backend
#[derive(Clone)]
pub struct S3Backend {
    /// S3 client
    client: Client,
    /// Bucket name
    bucket: String,
    /// Prefix (like a subdirectory)
    prefix: String,
}

impl S3Backend {
    /// Create a new S3 backend
    ///
    /// `endpoint` switches to path-style addressing for S3-compatible stores.
    pub async fn new(
        bucket: String,
        prefix: String,
        region: Option<String>,
        endpoint: Option<String>,
    ) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = endpoint {
            tracing::debug!(endpoint = %endpoint, "Using custom S3 endpoint");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        Ok(Self {
            client,
            bucket,
            prefix,
        })
    }

    /// Resolve a relative key to a full S3 key
    fn resolve_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), key)
        }
    }

    /// Check if an object exists (head request)
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let full_key = self.resolve_key(key);

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(Error::Aws {
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    /// Read an object's contents (loads entire object into memory)
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let full_key = self.resolve_key(key);

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    Error::NotFound {
                        key: key.to_string(),
                    }
                } else {
                    Error::Aws {
                        message: e.to_string(),
                    }
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Aws {
                message: e.to_string(),
            })?
            .into_bytes();

        Ok(bytes)
    }

    /// Write an object's contents
    pub async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        let full_key = self.resolve_key(key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .content_type(content_type)
            .body(AwsByteStream::from(data))
            .send()
            .await
            .map_err(|e| Error::Aws {
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// Delete an object
    ///
    /// S3 answers a delete of a missing key with success.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let full_key = self.resolve_key(key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| Error::Aws {
                message: e.to_string(),
            })?;

        Ok(())
    }
}
