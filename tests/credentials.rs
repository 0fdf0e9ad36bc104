use async_trait::async_trait;
use duckdb_credentials::credentials::AmbientCredentials;
use duckdb_credentials::{
    Attachment, Configuration, CredentialProvider, Error, ErrorKind, SecretType, resolve_settings,
};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

struct AmbientIdentity;

#[async_trait]
impl CredentialProvider for AmbientIdentity {
    fn name(&self) -> &str {
        "ambient"
    }

    async fn ambient_credentials(&self) -> duckdb_credentials::Result<AmbientCredentials> {
        Ok(AmbientCredentials {
            access_key_id: "access_key".to_string(),
            secret_access_key: "secret_key".to_string(),
            session_token: Some("token".to_string()),
            region: None,
        })
    }
}

#[test]
fn test_add_secret_with_empty_name() {
    let config = Configuration::from_mapping(&json!({
        "secrets": [{
            "type": "s3",
            "name": "",
            "key_id": "abc",
            "secret": "xyz",
            "region": "us-west-2"
        }]
    }))
    .unwrap();

    assert_eq!(config.secrets.len(), 1);
    let secret = &config.secrets[0];
    assert_eq!(secret.secret_type().name(), "S3");
    assert_eq!(secret.get("key_id"), Some("abc"));
    assert_eq!(
        secret.to_sql(),
        "CREATE SECRET (
    type S3,
    key_id abc,
    secret xyz,
    region us-west-2
)"
    );
}

#[test]
fn test_add_azure_secret() {
    let config = Configuration::from_mapping(&json!({
        "secrets": [{
            "type": "azure",
            "name": "",
            "provider": "service_principal",
            "tenant_id": "abc",
            "client_id": "xyz",
            "client_certificate_path": "foo\\bar\\baz",
            "account_name": "123"
        }]
    }))
    .unwrap();

    let secret = &config.secrets[0];
    assert_eq!(secret.secret_type(), SecretType::Azure);
    assert_eq!(secret.get("client_certificate_path"), Some("foo\\bar\\baz.pem"));
    assert_eq!(
        secret.to_sql(),
        "CREATE SECRET (
    type AZURE,
    provider SERVICE_PRINCIPAL,
    account_name 123,
    tenant_id abc,
    client_id xyz,
    client_certificate_path foo\\bar\\baz.pem
)"
    );
}

#[test]
fn test_add_unsupported_secret() {
    let err = Configuration::from_mapping(&json!({
        "secrets": [{"type": "scrooge_mcduck", "name": "money"}]
    }))
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_add_unsupported_secret_param() {
    let err = Configuration::from_mapping(&json!({
        "secrets": [{"type": "s3", "password": "secret"}]
    }))
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedSecretField { .. }));
}

#[test]
fn test_rendering_is_deterministic() {
    let raw = json!({
        "secrets": [{"type": "r2", "name": "r", "account_id": "acc", "key_id": "k"}],
        "attach": [{"path": "/tmp/jklm.db", "alias": "jk", "read_only": true, "type": "sqlite"}]
    });
    let first = Configuration::from_mapping(&raw).unwrap();
    let second = Configuration::from_mapping(&raw).unwrap();
    assert_eq!(first.setup_statements(&first.settings), second.setup_statements(&second.settings));
    assert_eq!(
        first.attach[0],
        Attachment::new("/tmp/jklm.db", Some("jk".to_string()), true, Some("sqlite".to_string())).unwrap()
    );
}

#[tokio::test]
async fn test_load_aws_creds() {
    let config = Configuration::from_mapping(&json!({
        "use_credential_provider": "aws",
        "settings": {"some_other_setting": 1}
    }))
    .unwrap();

    let settings = resolve_settings(&config.settings, Some(&AmbientIdentity)).await.unwrap();
    assert_eq!(settings["s3_access_key_id"], "access_key");
    assert_eq!(settings["s3_secret_access_key"], "secret_key");
    assert_eq!(settings["s3_session_token"], "token");
    assert_eq!(settings["some_other_setting"], 1);
}

#[test]
fn test_from_path() {
    let dir = TempDir::new().unwrap();

    let yaml = dir.path().join("profile.yml");
    fs::write(
        &yaml,
        "path: md:jaffle_shop?token=abc123\nattach:\n  - path: /tmp/g1234.db\n    alias: g\n",
    )
    .unwrap();
    let config = Configuration::from_path(&yaml).unwrap();
    assert_eq!(config.database, "jaffle_shop");
    assert_eq!(config.attach[0].to_sql(), "ATTACH '/tmp/g1234.db' AS g");

    let json_path = dir.path().join("profile.json");
    fs::write(&json_path, r#"{"path": "/tmp/f1234.db"}"#).unwrap();
    assert_eq!(Configuration::from_path(&json_path).unwrap().database, "f1234");

    let missing = Configuration::from_path(dir.path().join("missing.json")).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Configuration);
}
