// Copyright 2026 The Precond Authors
// SPDX-License-Identifier: Apache-2.0

//! S3-compatible store adapter built on `aws-sdk-s3`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Region, ResponseChecksumValidation};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use precond_core::config::StoreConfig;
use precond_core::types::{ETag, Precondition};
use precond_core::{Error, Result};

use crate::store::{ObjectStore, StoreFactory};

/// A bucket-scoped handle to an S3-compatible endpoint.
///
/// Every call is bounded by the configured timeout; a call that neither
/// applies nor is rejected in time surfaces as [`Error::Timeout`].
#[derive(Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
    timeout: Duration,
}

impl S3Store {
    /// Build a handle for the configured endpoint and bucket.
    ///
    /// Each call constructs its own `aws_sdk_s3::Client` with its own
    /// connection pool, so handles minted separately never serialize
    /// requests through shared client state.
    #[must_use]
    pub fn connect(config: &StoreConfig) -> Self {
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "precond");

        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style)
            // MinIO and other local stores do not always emit the checksums
            // the SDK validates by default.
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Run a store call under the per-call timeout.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout { op, after: self.timeout }),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Bytes, precondition: &Precondition) -> Result<ETag> {
        self.bounded("put_object", async {
            let mut request = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(body));

            match precondition {
                Precondition::None => {}
                Precondition::IfNoneMatchAny => request = request.if_none_match("*"),
                Precondition::IfMatch(etag) => request = request.if_match(etag.as_str()),
            }

            let output =
                request.send().await.map_err(|err| classify("put_object", key, err))?;

            output.e_tag().map(ETag::from).ok_or_else(|| {
                Error::Store(format!("put_object returned no ETag for key {key}"))
            })
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<(Bytes, ETag)> {
        self.bounded("get_object", async {
            let output = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| classify("get_object", key, err))?;

            let etag = output.e_tag().map(ETag::from).ok_or_else(|| {
                Error::Store(format!("get_object returned no ETag for key {key}"))
            })?;

            let data = output.body.collect().await.map_err(|err| {
                Error::Store(format!("failed to read body for key {key}: {err}"))
            })?;

            Ok((data.into_bytes(), etag))
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.bounded("delete_object", async {
            match self.client.delete_object().bucket(&self.bucket).key(key).send().await {
                Ok(_) => Ok(()),
                // Deleting an absent key is not an error.
                Err(err) => match classify("delete_object", key, err) {
                    Error::NotFound { .. } => Ok(()),
                    other => Err(other),
                },
            }
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.bounded("list_objects_v2", async {
            let mut keys = Vec::new();
            let mut continuation: Option<String> = None;

            loop {
                let mut request =
                    self.client.list_objects_v2().bucket(&self.bucket).prefix(prefix);
                if let Some(token) = &continuation {
                    request = request.continuation_token(token);
                }

                let output = request
                    .send()
                    .await
                    .map_err(|err| classify("list_objects_v2", prefix, err))?;

                keys.extend(
                    output.contents().iter().filter_map(|obj| obj.key().map(str::to_owned)),
                );

                continuation = output.next_continuation_token().map(str::to_owned);
                if output.is_truncated() != Some(true) || continuation.is_none() {
                    break;
                }
            }

            Ok(keys)
        })
        .await
    }

    async fn head_bucket(&self) -> Result<()> {
        self.bounded("head_bucket", async {
            self.client
                .head_bucket()
                .bucket(&self.bucket)
                .send()
                .await
                .map(|_| ())
                .map_err(|err| classify("head_bucket", &self.bucket, err))
        })
        .await
    }
}

/// Mints independent [`S3Store`] handles from one configuration.
#[derive(Debug, Clone)]
pub struct S3StoreFactory {
    config: StoreConfig,
}

impl S3StoreFactory {
    /// Creates a factory for the given store configuration.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

impl StoreFactory for S3StoreFactory {
    type Store = S3Store;

    fn connect(&self) -> Result<S3Store> {
        Ok(S3Store::connect(&self.config))
    }
}

/// Map an SDK error into the precond taxonomy.
///
/// Classification goes by S3 error code first, then falls back to the HTTP
/// status, so stores that omit an XML error body (HEAD responses, some
/// proxies) still classify correctly.
fn classify<E>(op: &'static str, key: &str, err: SdkError<E>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = match &err {
        SdkError::ServiceError(context) => Some(context.raw().status().as_u16()),
        _ => None,
    };

    match (err.code(), status) {
        (Some("PreconditionFailed"), _) | (_, Some(412)) => {
            Error::PreconditionFailed { key: key.to_string() }
        }
        (Some("NoSuchKey" | "NotFound"), _) | (_, Some(404)) => {
            Error::NotFound { key: key.to_string() }
        }
        _ => Error::Store(format!("{op} failed for {key}: {}", DisplayErrorContext(&err))),
    }
}
