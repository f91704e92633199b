//! Outcome of a provisioning run.

use indexmap::IndexMap;

use crate::DriverError;

/// Aggregated outcome of [`reconcile`](crate::reconcile).
///
/// Names appear in the order the principals were processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub created: Vec<String>,
    pub already_existed: Vec<String>,
    pub failed: IndexMap<String, DriverError>,
}

impl ReconciliationResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.created.len() + self.already_existed.len() + self.failed.len()
    }

    /// Principals whose failure may clear up on another attempt.
    pub fn transient_failures(&self) -> Vec<&str> {
        self.failed
            .iter()
            .filter(|(_, err)| err.is_transient())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// One `name: error` line per failed principal.
    pub fn failure_lines(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|(name, err)| format!("{}: {}", name, err))
            .collect()
    }

    /// Fold in the result of re-running a subset of the failed principals.
    ///
    /// Each retried name leaves `failed` and lands wherever the retry put it.
    pub fn absorb_retry(&mut self, retry: ReconciliationResult) {
        for name in retry
            .created
            .iter()
            .chain(retry.already_existed.iter())
            .chain(retry.failed.keys())
        {
            self.failed.shift_remove(name);
        }
        self.created.extend(retry.created);
        self.already_existed.extend(retry.already_existed);
        self.failed.extend(retry.failed);
    }

    pub fn summary(&self) -> String {
        format!(
            "created={} already_existed={} failed={}",
            self.created.len(),
            self.already_existed.len(),
            self.failed.len()
        )
    }
}

/// What a run would do, computed without mutating the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningPlan {
    pub to_create: Vec<String>,
    pub already_existed: Vec<String>,
    /// Principals whose existence could not be determined
    pub failed: IndexMap<String, DriverError>,
}

impl ProvisioningPlan {
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "to_create={} already_existed={} unknown={}",
            self.to_create.len(),
            self.already_existed.len(),
            self.failed.len()
        )
    }
}
