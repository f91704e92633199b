//! PostgreSQL driver
//!
//! Roles are cluster-wide, so existence is checked against `pg_roles`
//! regardless of the database argument. Table and schema privileges can
//! only be granted from a session on the database that owns them:
//!
//! - `CREATE ROLE` and the grants on the connected database run in one
//!   transaction
//! - grants on any other database run afterwards over a dedicated
//!   connection; a failure there leaves the role in place and is reported
//!   as partially applied

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::{bounded, DriverAdapter, DriverSettings};
use crate::{DriverError, PrincipalSpec, Role, RoleGrant};

pub struct PostgresDriver {
    pool: PgPool,
    connect_options: PgConnectOptions,
    home_database: String,
    timeout: Duration,
}

impl PostgresDriver {
    pub async fn connect(settings: &DriverSettings) -> Result<Self, DriverError> {
        let timeout = settings.timeout;
        let connect_options = connect_options(settings)?;

        let pool = bounded(
            timeout,
            "connect",
            PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(timeout)
                .connect_with(connect_options.clone()),
            classify,
        )
        .await?;

        let home_database: String = bounded(
            timeout,
            "current_database",
            sqlx::query_scalar("SELECT current_database()").fetch_one(&pool),
            classify,
        )
        .await?;
        info!(database = %home_database, "Connected to PostgreSQL");

        Ok(Self {
            pool,
            connect_options,
            home_database,
            timeout,
        })
    }

    async fn grant_on_remote(&self, database: &str, statements: &[String]) -> Result<(), DriverError> {
        let options = self.connect_options.clone().database(database);
        let mut conn = bounded(
            self.timeout,
            "connect",
            PgConnection::connect_with(&options),
            classify,
        )
        .await?;
        for statement in statements {
            bounded(self.timeout, "grant", sqlx::query(statement).execute(&mut conn), classify).await?;
        }
        // Close failures do not undo the grants.
        let _ = tokio::time::timeout(self.timeout, conn.close()).await;
        Ok(())
    }
}

/// Connection options for the admin pool and the per-database grant sessions.
///
/// `CREATE ROLE` carries the password in its text, so sqlx statement
/// logging (debug, and warn for slow statements) stays off.
pub(crate) fn connect_options(settings: &DriverSettings) -> Result<PgConnectOptions, DriverError> {
    let options = PgConnectOptions::from_str(&settings.uri)
        .map_err(|e| classify("parse connection string", e))?
        .application_name(&settings.app_name)
        .disable_statement_logging();
    Ok(options)
}

/// Databases that already hold grants once the local transaction committed.
fn committed_databases<'a>(home_database: &'a str, local: &[String]) -> Vec<&'a str> {
    if local.is_empty() {
        Vec::new()
    } else {
        vec![home_database]
    }
}

fn partial_failure(principal: &str, applied: &[&str], database: &str, error: &DriverError) -> DriverError {
    DriverError::partial(format!(
        "role {} created with grants on [{}]; grants on {} failed: {}",
        principal,
        applied.join(", "),
        database,
        error.message()
    ))
}

fn classify(operation: &str, error: sqlx::Error) -> DriverError {
    let message = format!("{} failed: {}", operation, error);
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => DriverError::transient(message),
        _ => DriverError::permanent(message),
    }
}

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Contains the password; never log the result.
pub(crate) fn create_role_statement(spec: &PrincipalSpec) -> String {
    format!(
        "CREATE ROLE {} WITH LOGIN PASSWORD {}",
        quote_ident(spec.name()),
        quote_literal(spec.secret().expose())
    )
}

/// Statements granting `grant` to `role`; run them on `grant.database`.
pub(crate) fn grant_statements(role: &str, grant: &RoleGrant) -> Vec<String> {
    let role = quote_ident(role);
    let database = quote_ident(&grant.database);
    let table_privileges = match &grant.role {
        Role::ReadWrite => "SELECT, INSERT, UPDATE, DELETE",
        Role::Read | Role::ReadOnly => "SELECT",
        Role::DbAdmin => {
            return vec![
                format!("GRANT ALL PRIVILEGES ON DATABASE {} TO {}", database, role),
                format!("GRANT ALL PRIVILEGES ON SCHEMA public TO {}", role),
            ];
        }
        Role::Custom(name) => return vec![format!("GRANT {} TO {}", quote_ident(name), role)],
    };
    vec![
        format!("GRANT CONNECT ON DATABASE {} TO {}", database, role),
        format!("GRANT USAGE ON SCHEMA public TO {}", role),
        format!("GRANT {} ON ALL TABLES IN SCHEMA public TO {}", table_privileges, role),
        format!(
            "ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT {} ON TABLES TO {}",
            table_privileges, role
        ),
    ]
}

/// Group grant statements by the database they must run on, in declaration order.
fn statements_by_database(spec: &PrincipalSpec) -> IndexMap<&str, Vec<String>> {
    let mut grouped: IndexMap<&str, Vec<String>> = IndexMap::new();
    for grant in spec.roles() {
        grouped
            .entry(grant.database.as_str())
            .or_default()
            .extend(grant_statements(spec.name(), grant));
    }
    grouped
}

#[async_trait]
impl DriverAdapter for PostgresDriver {
    async fn principal_exists(&self, name: &str, _database: &str) -> Result<bool, DriverError> {
        bounded(
            self.timeout,
            "pg_roles lookup",
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_roles WHERE rolname = $1)")
                .bind(name)
                .fetch_one(&self.pool),
            classify,
        )
        .await
    }

    async fn create_principal(&self, spec: &PrincipalSpec) -> Result<(), DriverError> {
        let mut grouped = statements_by_database(spec);
        let local = grouped.shift_remove(self.home_database.as_str()).unwrap_or_default();

        let mut tx = bounded(self.timeout, "begin", self.pool.begin(), classify).await?;
        let create = create_role_statement(spec);
        bounded(self.timeout, "create role", sqlx::query(&create).execute(&mut *tx), classify).await?;
        for statement in &local {
            bounded(self.timeout, "grant", sqlx::query(statement).execute(&mut *tx), classify).await?;
        }
        bounded(self.timeout, "commit", tx.commit(), classify).await?;
        debug!(principal = spec.name(), grants = local.len(), "Role created");

        let mut applied = committed_databases(&self.home_database, &local);
        for (database, statements) in &grouped {
            if let Err(e) = self.grant_on_remote(database, statements).await {
                return Err(partial_failure(spec.name(), &applied, database, &e));
            }
            applied.push(*database);
        }
        Ok(())
    }

    fn backend(&self) -> &str {
        "postgres"
    }
}
