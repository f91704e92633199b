//! Credential Source
//!
//! Resolves the secret references found in provisioning configuration into
//! opaque [`Secret`] values. Supported reference formats:
//!
//! - `env://NAME` - environment variable (with optional prefix)
//! - `file:///path/to/secret` - file contents, trailing newline trimmed
//!   (container secret mounts such as `/run/secrets/...`)
//! - anything else - a literal secret, when literals are allowed
//!
//! Storage, rotation and encryption of secrets are left to whatever
//! populates the environment or the mounted files.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

mod env;
mod file;
mod service;

pub use env::EnvProvider;
pub use file::FileProvider;
pub use service::{SecretService, SecretsSettings};

#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("Secret not found: {0}")]
    NotFound(String),
    #[error("Invalid secret reference: {0}")]
    InvalidReference(String),
    #[error("Secret resolved to an empty value: {0}")]
    EmptySecret(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// An opaque credential.
///
/// Formatting never reveals the value; callers that hand the secret to a
/// database driver use [`Secret::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Secrets provider trait
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get a secret by key
    async fn get(&self, key: &str) -> Result<Secret, SecretsError>;

    /// Provider name
    fn name(&self) -> &str;
}
