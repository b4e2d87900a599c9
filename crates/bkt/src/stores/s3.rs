// ai
//! ☁️ S3Store — the real bucket. AWS, MinIO, LocalStack, anything that speaks S3.
//!
//! 🧠 Knowledge graph:
//! - Client built from `aws_config::defaults(BehaviorVersion::latest())`, credentials from the
//!   usual provider chain (env, profile, IMDS...).
//! - `endpoint_url` + `force_path_style` for S3-compatible services.
//! - `max_connection_retries` feeds the SDK's own retry config. That retry lives *inside* one
//!   `put`; the `UploadRetrier` wraps the whole `put` on top of it.
//! - Service errors (the store answered "no") map to `StoreError::Transient`; everything else
//!   (dispatch, timeout, bad response) to `StoreError::Client`.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::stores::{ObjectStore, PutBody};

/// 🔧 `[store_config.S3]` in TOML.
#[derive(Debug, Deserialize, Clone)]
pub struct S3StoreConfig {
    /// 🌍 e.g. `"us-east-1"`.
    pub region: String,
    /// 🔌 Custom endpoint for MinIO / LocalStack.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// 🛣️ Path-style addressing. Forced on whenever `endpoint_url` is set.
    #[serde(default)]
    pub force_path_style: bool,
}

/// ☁️ `put_object` with a thin error translation layer.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: S3Client,
}

impl S3Store {
    /// 🏗️ Resolve credentials and build the client.
    pub async fn connect(config: &S3StoreConfig, max_connection_retries: u32) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config)
            .retry_config(RetryConfig::standard().with_max_attempts(max_connection_retries.saturating_add(1)));

        if let Some(endpoint) = &config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint).force_path_style(true);
        } else if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        info!(
            "☁️ S3 client ready (region '{}', endpoint {:?}, {} connection retries)",
            config.region, config.endpoint_url, max_connection_retries
        );
        Self {
            client: S3Client::from_conf(s3_config_builder.build()),
        }
    }
}

fn classify<E, R>(error: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&error).to_string();
    match error {
        SdkError::ServiceError(_) => StoreError::Transient(detail),
        _ => StoreError::Client(detail),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, bucket: &str, key: &str, body: &PutBody) -> Result<(), StoreError> {
        let stream = match body {
            PutBody::Bytes(bytes) => ByteStream::from(bytes.clone()),
            PutBody::File(path) => ByteStream::from_path(path)
                .await
                .map_err(|e| StoreError::Client(format!("opening '{}': {e}", path.display())))?,
        };

        debug!("☁️ put_object s3://{}/{} ({})", bucket, key, body.describe());
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(stream)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }
}
