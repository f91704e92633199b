//! SecretService Tests
//!
//! Tests for:
//! - env:// resolution with and without prefix
//! - file:// resolution (absolute and base-dir relative)
//! - literal handling and the allow_literal switch
//! - empty values and empty references

use std::io::Write;

use dbp_secrets::{SecretService, SecretsError, SecretsSettings};

#[tokio::test]
async fn test_resolve_env_reference() {
    std::env::set_var("DBP_TEST_SVC_QH_PASSWORD", "from-env");
    let service = SecretService::new(&SecretsSettings::default());

    let secret = service.resolve("env://DBP_TEST_SVC_QH_PASSWORD").await.unwrap();
    assert_eq!(secret.expose(), "from-env");
}

#[tokio::test]
async fn test_resolve_env_reference_with_prefix() {
    std::env::set_var("DBP_TEST_PREFIXED_APP_USER", "prefixed");
    let settings = SecretsSettings {
        env_prefix: "DBP_TEST_PREFIXED_".to_string(),
        ..Default::default()
    };
    let service = SecretService::new(&settings);

    let secret = service.resolve("env://app-user").await.unwrap();
    assert_eq!(secret.expose(), "prefixed");
}

#[tokio::test]
async fn test_missing_env_reference_is_not_found() {
    let service = SecretService::new(&SecretsSettings::default());
    let err = service.resolve("env://DBP_TEST_SVC_NEVER_SET").await.unwrap_err();
    assert!(matches!(err, SecretsError::NotFound(_)));
}

#[tokio::test]
async fn test_resolve_file_reference() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "from-file").unwrap();
    let service = SecretService::new(&SecretsSettings::default());

    let reference = format!("file://{}", file.path().display());
    let secret = service.resolve(&reference).await.unwrap();
    assert_eq!(secret.expose(), "from-file");
}

#[tokio::test]
async fn test_resolve_relative_file_reference() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("qh_user"), "mounted\n").unwrap();
    let settings = SecretsSettings {
        file_base_dir: Some(dir.path().display().to_string()),
        ..Default::default()
    };
    let service = SecretService::new(&settings);

    let secret = service.resolve("file://qh_user").await.unwrap();
    assert_eq!(secret.expose(), "mounted");
}

#[tokio::test]
async fn test_empty_file_is_rejected() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let service = SecretService::new(&SecretsSettings::default());

    let reference = format!("file://{}", file.path().display());
    let err = service.resolve(&reference).await.unwrap_err();
    assert!(matches!(err, SecretsError::EmptySecret(_)));
}

#[tokio::test]
async fn test_literal_allowed_by_default() {
    let service = SecretService::new(&SecretsSettings::default());
    let secret = service.resolve("userpassword").await.unwrap();
    assert_eq!(secret.expose(), "userpassword");
}

#[tokio::test]
async fn test_literal_rejected_when_disabled() {
    let settings = SecretsSettings {
        allow_literal: false,
        ..Default::default()
    };
    let service = SecretService::new(&settings);

    let err = service.resolve("userpassword").await.unwrap_err();
    assert!(matches!(err, SecretsError::InvalidReference(_)));
    assert!(!err.to_string().contains("userpassword"));
}

#[tokio::test]
async fn test_empty_reference_and_empty_key() {
    let service = SecretService::new(&SecretsSettings::default());
    assert!(matches!(
        service.resolve("").await.unwrap_err(),
        SecretsError::InvalidReference(_)
    ));
    assert!(matches!(
        service.resolve("env://").await.unwrap_err(),
        SecretsError::InvalidReference(_)
    ));
}
