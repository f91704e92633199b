//! Run reporting: summary on stdout, one line per failure on stderr.

use std::io::{self, Write};
use std::process::ExitCode;

use dbp_core::{ProvisioningPlan, ReconciliationResult};

/// How a run ended, as seen by the calling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every declared principal exists
    Success,
    /// At least one principal failed
    Failed,
    /// Stopped before any principal was attempted
    Aborted,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Failed => 1,
            Outcome::Aborted => 2,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.code())
    }
}

pub fn report_result(
    result: &ReconciliationResult,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<Outcome> {
    writeln!(out, "{}", result.summary())?;
    for line in result.failure_lines() {
        writeln!(err, "{}", line)?;
    }
    Ok(if result.is_success() { Outcome::Success } else { Outcome::Failed })
}

pub fn report_plan(
    plan: &ProvisioningPlan,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<Outcome> {
    writeln!(out, "{}", plan.summary())?;
    for name in &plan.to_create {
        writeln!(out, "would create: {}", name)?;
    }
    for (name, e) in &plan.failed {
        writeln!(err, "{}: {}", name, e)?;
    }
    Ok(if plan.failed.is_empty() { Outcome::Success } else { Outcome::Failed })
}
