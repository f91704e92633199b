//! In-process driver.
//!
//! Keeps principals in a map keyed by `(database, name)`. Secrets are not
//! retained.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::DriverAdapter;
use crate::{DriverError, PrincipalSpec, RoleGrant};

#[derive(Default)]
pub struct InMemoryDriver {
    principals: Mutex<HashMap<(String, String), Vec<RoleGrant>>>,
}

impl InMemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with principals already registered, as `(name, database)` pairs.
    pub fn with_existing<I, N, D>(existing: I) -> Self
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<String>,
    {
        let principals = existing
            .into_iter()
            .map(|(name, db)| ((db.into(), name.into()), Vec::new()))
            .collect();
        Self {
            principals: Mutex::new(principals),
        }
    }

    pub fn contains(&self, name: &str, database: &str) -> bool {
        self.principals
            .lock()
            .contains_key(&(database.to_string(), name.to_string()))
    }

    pub fn grants_of(&self, name: &str, database: &str) -> Option<Vec<RoleGrant>> {
        self.principals
            .lock()
            .get(&(database.to_string(), name.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.principals.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DriverAdapter for InMemoryDriver {
    async fn principal_exists(&self, name: &str, database: &str) -> Result<bool, DriverError> {
        Ok(self.contains(name, database))
    }

    async fn create_principal(&self, spec: &PrincipalSpec) -> Result<(), DriverError> {
        let key = (spec.target_database().to_string(), spec.name().to_string());
        let mut principals = self.principals.lock();
        if principals.contains_key(&key) {
            return Err(DriverError::permanent(format!(
                "principal {}@{} already exists",
                spec.name(),
                spec.target_database()
            )));
        }
        principals.insert(key, spec.roles().to_vec());
        Ok(())
    }

    fn backend(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbp_secrets::Secret;

    fn spec(name: &str, db: &str) -> PrincipalSpec {
        PrincipalSpec::new(name, Secret::new("pw"), db, vec![RoleGrant::read_write(db)])
    }

    #[tokio::test]
    async fn test_create_then_exists() {
        let driver = InMemoryDriver::new();
        assert!(!driver.principal_exists("user", "qh_db").await.unwrap());

        driver.create_principal(&spec("user", "qh_db")).await.unwrap();

        assert!(driver.principal_exists("user", "qh_db").await.unwrap());
        assert!(!driver.principal_exists("user", "other_db").await.unwrap());
        assert_eq!(driver.grants_of("user", "qh_db"), Some(vec![RoleGrant::read_write("qh_db")]));
    }

    #[tokio::test]
    async fn test_duplicate_create_is_permanent_error() {
        let driver = InMemoryDriver::with_existing([("user", "qh_db")]);
        let err = driver.create_principal(&spec("user", "qh_db")).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(driver.len(), 1);
    }
}
