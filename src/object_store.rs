//! Object storage access for remote sources
//!
//! [`ObjectStore`] is the narrow seam a remote source talks through: list
//! one page of keys, fetch one object. [`S3ObjectStore`] implements it on
//! the AWS SDK.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::imds::credentials::ImdsCredentialsProvider;
use aws_config::meta::credentials::CredentialsProviderChain;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;

use crate::error::{IngestionError, Result};

/// URI scheme selecting the remote backend, matched case-insensitively
pub const S3_SCHEME: &str = "s3://";

/// Bucket and key prefix addressed by an `s3://` target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub prefix: String,
}

impl S3Location {
    /// Parse `s3://bucket/prefix`. The prefix may be empty.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = match uri.get(..S3_SCHEME.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(S3_SCHEME) => &uri[S3_SCHEME.len()..],
            _ => {
                return Err(IngestionError::InvalidRemoteUri {
                    uri: uri.to_string(),
                    reason: format!("expected the {} scheme", S3_SCHEME),
                });
            }
        };

        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(IngestionError::InvalidRemoteUri {
                uri: uri.to_string(),
                reason: "bucket name is empty".to_string(),
            });
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        })
    }
}

/// One page of a prefix listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Present when more pages follow
    pub continuation_token: Option<String>,
}

/// A fetched object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_length: u64,
    pub body: Vec<u8>,
}

impl StoredObject {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            content_length: body.len() as u64,
            body,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content_length == 0
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List keys under `prefix`, continuing from `continuation_token`
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage>;

    /// Fetch one object's body
    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject>;
}

/// Connection settings for [`S3ObjectStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Settings {
    /// Named credential profile tried before the instance identity
    pub profile: Option<String>,
    /// Region override; otherwise resolved from the profile or environment
    pub region: Option<String>,
}

/// [`ObjectStore`] backed by the AWS SDK
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build a client whose credentials come from the named profile,
    /// falling back to EC2 instance metadata.
    ///
    /// Credentials are resolved once here so that a broken chain fails the
    /// run before any listing happens.
    pub async fn connect(settings: &S3Settings) -> Result<Self> {
        let imds = ImdsCredentialsProvider::builder().build();
        let chain = match &settings.profile {
            Some(profile) => {
                tracing::info!(profile = %profile, "trying supplied credential profile");
                let from_profile = ProfileFileCredentialsProvider::builder()
                    .profile_name(profile)
                    .build();
                CredentialsProviderChain::first_try("Profile", from_profile)
                    .or_else("Ec2InstanceMetadata", imds)
            }
            None => {
                tracing::info!("no credential profile configured, using EC2 instance profile");
                CredentialsProviderChain::first_try("Ec2InstanceMetadata", imds)
            }
        };

        chain
            .provide_credentials()
            .await
            .map_err(|e| IngestionError::Credentials {
                details: DisplayErrorContext(&e).to_string(),
            })?;
        tracing::debug!("credentials resolved");

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).credentials_provider(chain);
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &settings.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        Ok(Self {
            client: Client::new(&sdk_config),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| IngestionError::Listing {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                details: DisplayErrorContext(&e).to_string(),
            })?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        Ok(ListPage {
            keys,
            continuation_token: response.next_continuation_token().map(str::to_string),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        let fetch_error = |details: String| IngestionError::Fetch {
            bucket: bucket.to_string(),
            key: key.to_string(),
            details,
        };

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| fetch_error(DisplayErrorContext(&e).to_string()))?;

        let declared_length = response.content_length();
        let body = response
            .body
            .collect()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .into_bytes()
            .to_vec();

        let content_length = declared_length
            .and_then(|len| u64::try_from(len).ok())
            .unwrap_or(body.len() as u64);

        Ok(StoredObject {
            content_length,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_and_prefix() {
        let location = S3Location::parse("s3://bundles/incoming/2024/").unwrap();
        assert_eq!(location.bucket, "bundles");
        assert_eq!(location.prefix, "incoming/2024/");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let location = S3Location::parse("S3://Bundles").unwrap();
        assert_eq!(location.bucket, "Bundles");
        assert_eq!(location.prefix, "");
    }

    #[test]
    fn test_parse_rejects_empty_bucket() {
        let result = S3Location::parse("s3:///prefix");
        assert!(matches!(
            result,
            Err(IngestionError::InvalidRemoteUri { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(S3Location::parse("gs://bucket/x").is_err());
        assert!(S3Location::parse("s3").is_err());
    }

    #[test]
    fn test_stored_object_length() {
        assert!(StoredObject::new(Vec::new()).is_empty());
        assert_eq!(StoredObject::new(b"{}".to_vec()).content_length, 2);
    }
}
