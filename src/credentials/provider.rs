use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_sts::error::DisplayErrorContext;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::constants::{AWS_PROVIDER, S3_ACCESS_KEY_ID, S3_REGION, S3_SECRET_ACCESS_KEY, S3_SESSION_TOKEN};
use crate::interfaces::{Error, Result};

/// Short-lived credentials read from the environment of the running process.
#[derive(Clone, PartialEq, Eq)]
pub struct AmbientCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: Option<String>,
}

impl fmt::Debug for AmbientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .field("region", &self.region)
            .finish()
    }
}

/// An external identity mechanism that can hand out ambient credentials.
///
/// A single call, no retries and no timeout. Callers that need resilience wrap it.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn ambient_credentials(&self) -> Result<AmbientCredentials>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialProviderKind {
    Aws,
}

impl CredentialProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialProviderKind::Aws => AWS_PROVIDER,
        }
    }

    pub fn provider(&self) -> Box<dyn CredentialProvider> {
        match self {
            CredentialProviderKind::Aws => Box::new(AwsCredentialProvider),
        }
    }
}

impl FromStr for CredentialProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            AWS_PROVIDER => Ok(CredentialProviderKind::Aws),
            other => Err(Error::UnsupportedCredentialProvider(other.to_string())),
        }
    }
}

impl fmt::Display for CredentialProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads credentials from the default AWS provider chain after verifying the
/// caller identity with STS.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsCredentialProvider;

impl AwsCredentialProvider {
    async fn load(&self) -> anyhow::Result<AmbientCredentials> {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let sts_client = aws_sdk_sts::Client::new(&config);
        if let Err(e) = sts_client.get_caller_identity().send().await {
            return Err(anyhow::anyhow!(
                "AWS identity verification failed, check configuration with `aws sts get-caller-identity`: {}",
                DisplayErrorContext(&e)
            ));
        }

        let provider = config
            .credentials_provider()
            .ok_or_else(|| anyhow::anyhow!("No AWS credentials provider is configured"))?;
        let credentials = provider.provide_credentials().await?;

        Ok(AmbientCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().map(str::to_string),
            region: config.region().map(|r| r.to_string()),
        })
    }
}

#[async_trait]
impl CredentialProvider for AwsCredentialProvider {
    fn name(&self) -> &str {
        AWS_PROVIDER
    }

    async fn ambient_credentials(&self) -> Result<AmbientCredentials> {
        tracing::debug!("Loading ambient AWS credentials");
        self.load().await.map_err(|source| Error::Provider {
            provider: AWS_PROVIDER.to_string(),
            source,
        })
    }
}

/// Merges provider credentials into a copy of `settings`.
///
/// Without a provider the copy is returned as is. With one, the S3 session
/// keys are filled from the ambient credentials unless the settings already
/// carry a non-empty value for them.
pub async fn resolve_settings(
    settings: &Map<String, Value>,
    provider: Option<&dyn CredentialProvider>,
) -> Result<Map<String, Value>> {
    let mut resolved = settings.clone();

    let Some(provider) = provider else {
        return Ok(resolved);
    };

    let credentials = provider.ambient_credentials().await?;
    tracing::info!("Resolved ambient credentials from provider {}", provider.name());

    fill_gap(&mut resolved, S3_ACCESS_KEY_ID, Some(credentials.access_key_id));
    fill_gap(&mut resolved, S3_SECRET_ACCESS_KEY, Some(credentials.secret_access_key));
    fill_gap(&mut resolved, S3_SESSION_TOKEN, credentials.session_token);
    fill_gap(&mut resolved, S3_REGION, credentials.region);

    Ok(resolved)
}

fn fill_gap(settings: &mut Map<String, Value>, key: &str, value: Option<String>) {
    let Some(value) = value else {
        return;
    };

    let configured = settings
        .get(key)
        .is_some_and(|v| !matches!(v, Value::Null) && v.as_str() != Some(""));
    if configured {
        tracing::debug!("Keeping configured value for {}", key);
        return;
    }

    settings.insert(key.to_string(), Value::String(value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::ErrorKind;
    use serde_json::json;

    struct StaticProvider(AmbientCredentials);

    #[async_trait]
    impl CredentialProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn ambient_credentials(&self) -> Result<AmbientCredentials> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl CredentialProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn ambient_credentials(&self) -> Result<AmbientCredentials> {
            Err(Error::Provider {
                provider: "failing".to_string(),
                source: anyhow::anyhow!("no ambient credentials found"),
            })
        }
    }

    fn ambient() -> AmbientCredentials {
        AmbientCredentials {
            access_key_id: "access_key".to_string(),
            secret_access_key: "secret_key".to_string(),
            session_token: Some("token".to_string()),
            region: None,
        }
    }

    fn settings(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[tokio::test]
    async fn test_no_provider_returns_settings() {
        let settings = settings(json!({
            "s3_access_key_id": "abc",
            "s3_secret_access_key": "xyz",
            "s3_region": "us-west-2"
        }));
        let resolved = resolve_settings(&settings, None).await.unwrap();
        assert_eq!(resolved, settings);
    }

    #[tokio::test]
    async fn test_provider_fills_session_keys() {
        let settings = settings(json!({"some_other_setting": 1}));
        let provider = StaticProvider(ambient());

        let resolved = resolve_settings(&settings, Some(&provider)).await.unwrap();
        assert_eq!(resolved["s3_access_key_id"], "access_key");
        assert_eq!(resolved["s3_secret_access_key"], "secret_key");
        assert_eq!(resolved["s3_session_token"], "token");
        assert_eq!(resolved["some_other_setting"], 1);
        assert!(!resolved.contains_key("s3_region"));
    }

    #[tokio::test]
    async fn test_configured_values_win() {
        let settings = settings(json!({"s3_access_key_id": "mine", "s3_session_token": ""}));
        let provider = StaticProvider(AmbientCredentials {
            region: Some("eu-west-1".to_string()),
            ..ambient()
        });

        let resolved = resolve_settings(&settings, Some(&provider)).await.unwrap();
        assert_eq!(resolved["s3_access_key_id"], "mine");
        assert_eq!(resolved["s3_secret_access_key"], "secret_key");
        assert_eq!(resolved["s3_session_token"], "token");
        assert_eq!(resolved["s3_region"], "eu-west-1");
    }

    #[tokio::test]
    async fn test_missing_token_not_written() {
        let provider = StaticProvider(AmbientCredentials {
            session_token: None,
            ..ambient()
        });
        let resolved = resolve_settings(&Map::new(), Some(&provider)).await.unwrap();
        assert!(!resolved.contains_key("s3_session_token"));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let err = resolve_settings(&Map::new(), Some(&FailingProvider)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert!(err.to_string().contains("no ambient credentials found"));
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("aws".parse::<CredentialProviderKind>().unwrap(), CredentialProviderKind::Aws);
        let err = "gcp".parse::<CredentialProviderKind>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_debug_masks_secret_key() {
        let debug = format!("{:?}", ambient());
        assert!(debug.contains("access_key"));
        assert!(!debug.contains("secret_key"));
        assert!(!debug.contains("\"token\""));
    }
}
