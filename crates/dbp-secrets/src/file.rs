//! File-backed secrets provider

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{Provider, Secret, SecretsError};

/// Reads one secret per file.
///
/// Relative keys are resolved against the base directory when one is set.
pub struct FileProvider {
    base_dir: Option<PathBuf>,
}

impl FileProvider {
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    pub fn with_base_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self { base_dir: Some(dir.into()) }
    }

    fn resolve_path(&self, key: &str) -> PathBuf {
        let path = Path::new(key);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Default for FileProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip a single trailing line ending, as left behind by editors and `echo`.
fn trim_line_ending(mut value: String) -> String {
    if value.ends_with('\n') {
        value.pop();
        if value.ends_with('\r') {
            value.pop();
        }
    }
    value
}

#[async_trait]
impl Provider for FileProvider {
    async fn get(&self, key: &str) -> Result<Secret, SecretsError> {
        let path = self.resolve_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Secret::new(trim_line_ending(contents))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SecretsError::NotFound(format!("file {}", path.display())))
            }
            Err(e) => Err(SecretsError::IoError(e)),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending("secret\n".to_string()), "secret");
        assert_eq!(trim_line_ending("secret\r\n".to_string()), "secret");
        assert_eq!(trim_line_ending("secret".to_string()), "secret");
        assert_eq!(trim_line_ending("two\n\n".to_string()), "two\n");
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let provider = FileProvider::with_base_dir("/run/secrets");
        assert_eq!(provider.resolve_path("qh_user"), PathBuf::from("/run/secrets/qh_user"));
        assert_eq!(provider.resolve_path("/etc/pw"), PathBuf::from("/etc/pw"));
    }
}
