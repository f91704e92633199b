//! Database Bootstrap Provisioner
//!
//! Declarative, idempotent creation of database principals and their role
//! grants. A batch of [`PrincipalSpec`]s is validated up front, then each
//! principal is created only if the backend does not already have it.
//!
//! ```rust,ignore
//! use dbp_core::{reconcile, InMemoryDriver, PrincipalSpec, RoleGrant};
//! use dbp_secrets::Secret;
//!
//! let mut driver = InMemoryDriver::new();
//! let specs = vec![PrincipalSpec::new(
//!     "user",
//!     Secret::new("userpassword"),
//!     "qh_db",
//!     vec![RoleGrant::read_write("qh_db")],
//! )];
//! let result = reconcile(specs, &mut driver).await?;
//! assert_eq!(result.created, vec!["user"]);
//! ```

pub mod driver;
mod error;
mod model;
mod provisioner;
mod result;

pub use driver::{DriverAdapter, DriverSettings, InMemoryDriver};
#[cfg(feature = "mongo")]
pub use driver::MongoDriver;
#[cfg(feature = "postgres")]
pub use driver::PostgresDriver;
pub use error::{DriverError, DriverErrorKind, ValidationError, ValidationIssue};
pub use model::{ParseGrantError, PrincipalSpec, Role, RoleGrant};
pub use provisioner::{plan, reconcile, validate};
pub use result::{ProvisioningPlan, ReconciliationResult};
