//! SecretService - routes secret references to the matching provider.

use tracing::{debug, warn};

use crate::{EnvProvider, FileProvider, Provider, Secret, SecretsError};

const ENV_SCHEME: &str = "env://";
const FILE_SCHEME: &str = "file://";

/// Settings for the credential source
#[derive(Debug, Clone)]
pub struct SecretsSettings {
    /// Prefix prepended to every `env://` lookup
    pub env_prefix: String,
    /// Base directory for relative `file://` references
    pub file_base_dir: Option<String>,
    /// Accept references without a scheme as literal secrets
    pub allow_literal: bool,
}

impl Default for SecretsSettings {
    fn default() -> Self {
        Self {
            env_prefix: String::new(),
            file_base_dir: None,
            allow_literal: true,
        }
    }
}

/// Central service for resolving secret references.
pub struct SecretService {
    env_provider: EnvProvider,
    file_provider: FileProvider,
    allow_literal: bool,
}

impl SecretService {
    pub fn new(settings: &SecretsSettings) -> Self {
        let file_provider = match &settings.file_base_dir {
            Some(dir) if !dir.is_empty() => FileProvider::with_base_dir(dir),
            _ => FileProvider::new(),
        };
        Self {
            env_provider: EnvProvider::with_prefix(&settings.env_prefix),
            file_provider,
            allow_literal: settings.allow_literal,
        }
    }

    /// Resolve a secret reference to its value.
    pub async fn resolve(&self, reference: &str) -> Result<Secret, SecretsError> {
        if reference.is_empty() {
            return Err(SecretsError::InvalidReference(
                "Secret reference cannot be empty".to_string(),
            ));
        }

        let secret = if let Some(key) = reference.strip_prefix(ENV_SCHEME) {
            self.resolve_with(&self.env_provider, key, reference).await?
        } else if let Some(key) = reference.strip_prefix(FILE_SCHEME) {
            self.resolve_with(&self.file_provider, key, reference).await?
        } else if self.allow_literal {
            warn!("Using a literal secret from configuration; prefer env:// or file:// references");
            Secret::new(reference)
        } else {
            return Err(SecretsError::InvalidReference(format!(
                "{} (literal secrets are disabled; use env:// or file://)",
                Self::mask_reference(reference)
            )));
        };

        if secret.is_empty() {
            return Err(SecretsError::EmptySecret(Self::mask_reference(reference)));
        }
        Ok(secret)
    }

    async fn resolve_with(
        &self,
        provider: &dyn Provider,
        key: &str,
        reference: &str,
    ) -> Result<Secret, SecretsError> {
        if key.is_empty() {
            return Err(SecretsError::InvalidReference(format!(
                "{} has no key",
                Self::mask_reference(reference)
            )));
        }
        debug!(provider = provider.name(), reference = %Self::mask_reference(reference), "Resolving secret");
        provider.get(key).await
    }

    /// Get the provider type for a reference.
    pub fn provider_type(reference: &str) -> &'static str {
        if reference.starts_with(ENV_SCHEME) {
            "env"
        } else if reference.starts_with(FILE_SCHEME) {
            "file"
        } else {
            "literal"
        }
    }

    /// Render a reference for logs and errors.
    ///
    /// Scheme references only name where the secret lives and are shown as
    /// is; literals are the secret itself and are fully masked.
    pub fn mask_reference(reference: &str) -> String {
        match Self::provider_type(reference) {
            "literal" => "***".to_string(),
            _ => reference.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_reference() {
        assert_eq!(SecretService::mask_reference("env://QH_PW"), "env://QH_PW");
        assert_eq!(SecretService::mask_reference("file:///run/secrets/qh"), "file:///run/secrets/qh");
        assert_eq!(SecretService::mask_reference("userpassword"), "***");
    }

    #[test]
    fn test_provider_type() {
        assert_eq!(SecretService::provider_type("env://X"), "env");
        assert_eq!(SecretService::provider_type("file://x"), "file");
        assert_eq!(SecretService::provider_type("vault://x"), "literal");
    }
}
