//! Wiring between configuration, credentials, drivers and the provisioner.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use dbp_config::{AppConfig, DriverKind, GrantConfig};
use dbp_core::{
    reconcile, DriverAdapter, DriverError, DriverSettings, InMemoryDriver, MongoDriver,
    PostgresDriver, PrincipalSpec, ReconciliationResult, RoleGrant, ValidationError,
};
use dbp_secrets::{SecretService, SecretsSettings};

/// How often transiently failed principals are attempted again
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first run
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::from_millis(2000),
        }
    }
}

pub fn secrets_settings(config: &AppConfig) -> SecretsSettings {
    SecretsSettings {
        env_prefix: config.secrets.env_prefix.clone(),
        file_base_dir: Some(config.secrets.file_base_dir.clone()).filter(|dir| !dir.is_empty()),
        allow_literal: config.secrets.allow_literal,
    }
}

pub fn driver_settings(config: &AppConfig) -> DriverSettings {
    DriverSettings {
        uri: config.driver.uri.clone(),
        timeout: Duration::from_millis(config.driver.timeout_ms),
        app_name: config.driver.app_name.clone(),
    }
}

/// Turn the configured principals into specs, resolving every secret.
///
/// Any unresolvable secret or malformed grant fails the whole batch.
pub async fn build_specs(config: &AppConfig, secrets: &SecretService) -> Result<Vec<PrincipalSpec>> {
    let mut specs = Vec::with_capacity(config.principals.len());

    for (name, principal) in &config.principals {
        let secret = secrets
            .resolve(&principal.secret)
            .await
            .with_context(|| format!("failed to resolve secret for principal '{}'", name))?;

        let roles = principal
            .roles
            .iter()
            .map(grant_from_config)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("invalid role grant for principal '{}'", name))?;

        specs.push(PrincipalSpec::new(
            name.clone(),
            secret,
            principal.target_database.clone(),
            roles,
        ));
    }

    Ok(specs)
}

fn grant_from_config(grant: &GrantConfig) -> Result<RoleGrant, dbp_core::ParseGrantError> {
    match grant {
        GrantConfig::Compact(text) => text.parse(),
        GrantConfig::Full { role, database } => Ok(RoleGrant::new(role.as_str(), database.clone())),
    }
}

/// Connect to the configured backend
pub async fn connect_driver(config: &AppConfig) -> Result<Box<dyn DriverAdapter>, DriverError> {
    let settings = driver_settings(config);
    let driver: Box<dyn DriverAdapter> = match config.driver.kind {
        DriverKind::Mongodb => Box::new(MongoDriver::connect(&settings).await?),
        DriverKind::Postgres => Box::new(PostgresDriver::connect(&settings).await?),
        DriverKind::Memory => {
            warn!("Using the in-memory driver; nothing is persisted");
            Box::new(InMemoryDriver::new())
        }
    };
    Ok(driver)
}

/// Reconcile, then re-run principals whose failure was transient.
///
/// Permanent failures are never retried. The returned result covers every
/// spec exactly once.
pub async fn reconcile_with_retry<D>(
    specs: Vec<PrincipalSpec>,
    driver: &mut D,
    policy: RetryPolicy,
) -> Result<ReconciliationResult, ValidationError>
where
    D: DriverAdapter + ?Sized,
{
    let mut result = reconcile(specs.clone(), driver).await?;

    for attempt in 2..=policy.max_attempts.max(1) {
        let retry_names = result.transient_failures();
        if retry_names.is_empty() {
            break;
        }

        let subset: Vec<PrincipalSpec> = specs
            .iter()
            .filter(|spec| retry_names.contains(&spec.name()))
            .cloned()
            .collect();

        info!(attempt, principals = subset.len(), delay_ms = policy.delay.as_millis() as u64, "Retrying transient failures");
        tokio::time::sleep(policy.delay).await;

        let retry = reconcile(subset, driver).await?;
        result.absorb_retry(retry);
    }

    Ok(result)
}
