//! Principal declarations and role grants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use dbp_secrets::Secret;

/// Permission level bound to a database.
///
/// The built-in names follow MongoDB's role vocabulary; any other name is
/// treated as a backend-defined custom role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    ReadWrite,
    Read,
    ReadOnly,
    DbAdmin,
    Custom(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::ReadWrite => "readWrite",
            Role::Read => "read",
            Role::ReadOnly => "readOnly",
            Role::DbAdmin => "dbAdmin",
            Role::Custom(name) => name,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "readWrite" => Role::ReadWrite,
            "read" => Role::Read,
            "readOnly" => Role::ReadOnly,
            "dbAdmin" => Role::DbAdmin,
            _ => Role::Custom(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid role grant '{0}': expected role@database")]
pub struct ParseGrantError(pub String);

/// A role on a specific database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: Role,
    pub database: String,
}

impl RoleGrant {
    pub fn new(role: impl Into<Role>, database: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            database: database.into(),
        }
    }

    pub fn read_write(database: impl Into<String>) -> Self {
        Self::new(Role::ReadWrite, database)
    }
}

/// Parses the compact `role@database` form, e.g. `readWrite@qh_db`.
impl FromStr for RoleGrant {
    type Err = ParseGrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (role, database) = s
            .trim()
            .split_once('@')
            .ok_or_else(|| ParseGrantError(s.to_string()))?;
        let (role, database) = (role.trim(), database.trim());
        if role.is_empty() || database.is_empty() {
            return Err(ParseGrantError(s.to_string()));
        }
        Ok(RoleGrant::new(role, database))
    }
}

impl fmt::Display for RoleGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.role, self.database)
    }
}

/// Desired state for one principal. Immutable once built.
#[derive(Debug, Clone)]
pub struct PrincipalSpec {
    name: String,
    secret: Secret,
    target_database: String,
    roles: Vec<RoleGrant>,
}

impl PrincipalSpec {
    pub fn new(
        name: impl Into<String>,
        secret: Secret,
        target_database: impl Into<String>,
        roles: Vec<RoleGrant>,
    ) -> Self {
        Self {
            name: name.into(),
            secret,
            target_database: target_database.into(),
            roles,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn target_database(&self) -> &str {
        &self.target_database
    }

    pub fn roles(&self) -> &[RoleGrant] {
        &self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_names() {
        for name in ["readWrite", "read", "readOnly", "dbAdmin"] {
            let role = Role::from(name);
            assert!(!matches!(role, Role::Custom(_)), "{} parsed as custom", name);
            assert_eq!(role.as_str(), name);
        }
        assert_eq!(Role::from("clusterMonitor"), Role::Custom("clusterMonitor".to_string()));
        assert!(Role::from("  ").is_empty());
    }

    #[test]
    fn test_role_is_case_sensitive() {
        assert_eq!(Role::from("readwrite"), Role::Custom("readwrite".to_string()));
    }

    #[test]
    fn test_parse_grant() {
        let grant: RoleGrant = "readWrite@qh_db".parse().unwrap();
        assert_eq!(grant, RoleGrant::read_write("qh_db"));
        assert_eq!(grant.to_string(), "readWrite@qh_db");

        let custom: RoleGrant = " auditor @ reports ".parse().unwrap();
        assert_eq!(custom.role, Role::Custom("auditor".to_string()));
        assert_eq!(custom.database, "reports");
    }

    #[test]
    fn test_parse_grant_rejects_malformed() {
        assert!("readWrite".parse::<RoleGrant>().is_err());
        assert!("@qh_db".parse::<RoleGrant>().is_err());
        assert!("readWrite@".parse::<RoleGrant>().is_err());
    }

    #[test]
    fn test_grant_deserializes_from_role_string() {
        let grant: RoleGrant =
            serde_json::from_str(r#"{"role":"readWrite","database":"qh_db"}"#).unwrap();
        assert_eq!(grant.role, Role::ReadWrite);

        let empty: RoleGrant = serde_json::from_str(r#"{"role":"","database":"qh_db"}"#).unwrap();
        assert!(empty.role.is_empty());
    }

    #[test]
    fn test_spec_debug_hides_secret() {
        let spec = PrincipalSpec::new(
            "user",
            Secret::new("userpassword"),
            "qh_db",
            vec![RoleGrant::read_write("qh_db")],
        );
        let rendered = format!("{:?}", spec);
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("userpassword"));
    }
}
