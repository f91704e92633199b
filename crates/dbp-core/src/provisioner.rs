//! Provisioner
//!
//! Brings a backend in line with a batch of principal declarations by
//! creating the ones that are missing. Existing principals are never
//! modified or removed, which makes a run safe to repeat: the second run
//! finds everything in place and creates nothing.

use std::collections::HashSet;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::driver::DriverAdapter;
use crate::{PrincipalSpec, ProvisioningPlan, ReconciliationResult, ValidationError, ValidationIssue};

/// Check a whole batch before anything touches the backend.
///
/// Every issue is collected so an operator can fix the configuration in
/// one pass.
pub fn validate(specs: &[PrincipalSpec]) -> Result<(), ValidationError> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    let mut reported_duplicates = HashSet::new();

    for (index, spec) in specs.iter().enumerate() {
        let name = spec.name();
        if name.trim().is_empty() {
            issues.push(ValidationIssue::EmptyName { index });
        } else if !seen.insert(name) && reported_duplicates.insert(name) {
            issues.push(ValidationIssue::DuplicateName(name.to_string()));
        }

        if spec.target_database().trim().is_empty() {
            issues.push(ValidationIssue::EmptyTargetDatabase(name.to_string()));
        }

        if spec.roles().is_empty() {
            issues.push(ValidationIssue::NoRoles(name.to_string()));
        }

        for (grant_index, grant) in spec.roles().iter().enumerate() {
            if grant.role.is_empty() {
                issues.push(ValidationIssue::EmptyRole {
                    principal: name.to_string(),
                    index: grant_index,
                });
            }
            if grant.database.trim().is_empty() {
                issues.push(ValidationIssue::EmptyRoleDatabase {
                    principal: name.to_string(),
                    index: grant_index,
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}

/// Create every declared principal that the backend does not have yet.
///
/// Only a [`ValidationError`] aborts the run, and it does so before the
/// first driver call. Backend failures are recorded per principal and the
/// remaining principals are still attempted.
pub async fn reconcile<D>(
    specs: Vec<PrincipalSpec>,
    driver: &mut D,
) -> Result<ReconciliationResult, ValidationError>
where
    D: DriverAdapter + ?Sized,
{
    validate(&specs)?;

    let driver: &D = driver;
    let span = info_span!("reconcile", backend = driver.backend(), principals = specs.len());

    let result = async move {
        let mut result = ReconciliationResult::default();

        for spec in &specs {
            let name = spec.name();
            let database = spec.target_database();

            match driver.principal_exists(name, database).await {
                Ok(true) => {
                    debug!(principal = name, database, "Principal already exists");
                    result.already_existed.push(name.to_string());
                }
                Ok(false) => match driver.create_principal(spec).await {
                    Ok(()) => {
                        info!(principal = name, database, grants = spec.roles().len(), "Created principal");
                        result.created.push(name.to_string());
                    }
                    Err(e) => {
                        warn!(principal = name, database, kind = %e.kind(), partial = e.is_partial(), error = %e.message(), "Failed to create principal");
                        result.failed.insert(name.to_string(), e);
                    }
                },
                Err(e) => {
                    warn!(principal = name, database, kind = %e.kind(), error = %e.message(), "Failed to check principal");
                    result.failed.insert(name.to_string(), e);
                }
            }
        }

        info!(
            created = result.created.len(),
            already_existed = result.already_existed.len(),
            failed = result.failed.len(),
            "Reconciliation complete"
        );
        result
    }
    .instrument(span)
    .await;

    Ok(result)
}

/// Report what [`reconcile`] would do without creating anything.
pub async fn plan<D>(specs: &[PrincipalSpec], driver: &D) -> Result<ProvisioningPlan, ValidationError>
where
    D: DriverAdapter + ?Sized,
{
    validate(specs)?;

    let mut plan = ProvisioningPlan::default();
    for spec in specs {
        match driver.principal_exists(spec.name(), spec.target_database()).await {
            Ok(true) => plan.already_existed.push(spec.name().to_string()),
            Ok(false) => plan.to_create.push(spec.name().to_string()),
            Err(e) => {
                plan.failed.insert(spec.name().to_string(), e);
            }
        }
    }

    info!(
        backend = driver.backend(),
        to_create = plan.to_create.len(),
        already_existed = plan.already_existed.len(),
        unknown = plan.failed.len(),
        "Provisioning plan computed"
    );
    Ok(plan)
}
