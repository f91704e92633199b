//! Driver Adapter
//!
//! The administrative surface a backend must offer to be provisioned:
//! check whether a principal exists, and create one with its grants.
//!
//! Implementations:
//! - [`InMemoryDriver`] - always available, used for tests and dry runs
//! - `MongoDriver` - feature `mongo`
//! - `PostgresDriver` - feature `postgres`

use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Duration;

use crate::{DriverError, PrincipalSpec};

mod memory;
pub use memory::InMemoryDriver;

#[cfg(feature = "mongo")]
mod mongo;
#[cfg(feature = "mongo")]
pub use mongo::MongoDriver;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;

/// Backend administrative operations used by the provisioner.
///
/// Implementations must bound every network call by a timeout and report
/// an elapsed timeout as a transient [`DriverError`].
#[async_trait]
pub trait DriverAdapter: Send + Sync {
    /// Whether `name` is registered for `database`. Must not mutate anything.
    async fn principal_exists(&self, name: &str, database: &str) -> Result<bool, DriverError>;

    /// Register the principal with its secret and every role grant.
    ///
    /// A backend that needs several calls and fails after the principal
    /// itself was created returns [`DriverError::partial`].
    async fn create_principal(&self, spec: &PrincipalSpec) -> Result<(), DriverError>;

    /// Short backend name for logs
    fn backend(&self) -> &str;
}

/// Connection settings shared by the network drivers
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub uri: String,
    /// Upper bound for each backend call, including connecting
    pub timeout: Duration,
    /// Reported to the server where the protocol supports it
    pub app_name: String,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            uri: String::new(),
            timeout: Duration::from_secs(10),
            app_name: "dbp-bootstrap".to_string(),
        }
    }
}

/// Run a backend call under `timeout`, mapping its error with `classify`.
#[cfg_attr(not(any(feature = "mongo", feature = "postgres")), allow(dead_code))]
pub(crate) async fn bounded<F, T, E>(
    timeout: Duration,
    operation: &str,
    call: F,
    classify: impl FnOnce(&str, E) -> DriverError,
) -> Result<T, DriverError>
where
    F: IntoFuture<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(classify(operation, e)),
        Err(_) => Err(DriverError::transient(format!(
            "{} timed out after {:?}",
            operation, timeout
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_reports_timeout_as_transient() {
        let result: Result<(), DriverError> = bounded(
            Duration::from_millis(10),
            "usersInfo",
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), String>(())
            },
            |op, e| DriverError::permanent(format!("{}: {}", op, e)),
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.is_transient());
        assert!(err.message().starts_with("usersInfo timed out"));
    }

    #[tokio::test]
    async fn test_bounded_uses_classifier() {
        let result: Result<(), DriverError> = bounded(
            Duration::from_secs(1),
            "createUser",
            async { Err::<(), String>("role not found".to_string()) },
            |op, e| DriverError::permanent(format!("{} failed: {}", op, e)),
        )
        .await;

        assert_eq!(
            result.unwrap_err(),
            DriverError::permanent("createUser failed: role not found")
        );
    }
}
