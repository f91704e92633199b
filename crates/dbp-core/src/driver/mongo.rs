//! MongoDB driver
//!
//! Uses the `usersInfo` and `createUser` database commands. `createUser`
//! registers the password and the full role list in one command, so
//! creation is never partially applied.

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::{bounded, DriverAdapter, DriverSettings};
use crate::{DriverError, PrincipalSpec, Role};

pub struct MongoDriver {
    client: Client,
    timeout: Duration,
}

impl MongoDriver {
    /// Connect and verify the deployment answers a `ping` within the timeout.
    pub async fn connect(settings: &DriverSettings) -> Result<Self, DriverError> {
        let timeout = settings.timeout;
        let mut options = bounded(
            timeout,
            "parse connection string",
            ClientOptions::parse(settings.uri.as_str()),
            classify,
        )
        .await?;
        options.app_name = Some(settings.app_name.clone());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        let hosts = options.hosts.clone();

        let client = Client::with_options(options)
            .map_err(|e| classify("create client", e))?;
        let driver = Self { client, timeout };

        driver.run("admin", "ping", doc! { "ping": 1 }).await?;
        info!(?hosts, "Connected to MongoDB");

        Ok(driver)
    }

    /// Wrap an already configured client, e.g. one shared with the application.
    pub fn from_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn run(&self, database: &str, operation: &str, command: Document) -> Result<Document, DriverError> {
        let db = self.client.database(database);
        bounded(self.timeout, operation, db.run_command(command), classify).await
    }
}

/// MongoDB has no built-in `readOnly`; its read-only role is `read`.
pub(crate) fn mongo_role_name(role: &Role) -> &str {
    match role {
        Role::ReadOnly => "read",
        other => other.as_str(),
    }
}

pub(crate) fn create_user_command(spec: &PrincipalSpec) -> Document {
    let roles: Vec<Bson> = spec
        .roles()
        .iter()
        .map(|grant| {
            Bson::Document(doc! {
                "role": mongo_role_name(&grant.role),
                "db": grant.database.as_str(),
            })
        })
        .collect();

    doc! {
        "createUser": spec.name(),
        "pwd": spec.secret().expose(),
        "roles": roles,
    }
}

fn classify(operation: &str, error: MongoError) -> DriverError {
    let message = format!("{} failed: {}", operation, error);
    match error.kind.as_ref() {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => DriverError::transient(message),
        _ => DriverError::permanent(message),
    }
}

#[async_trait]
impl DriverAdapter for MongoDriver {
    async fn principal_exists(&self, name: &str, database: &str) -> Result<bool, DriverError> {
        let reply = self.run(database, "usersInfo", doc! { "usersInfo": name }).await?;
        let users = reply.get_array("users").map_err(|e| {
            DriverError::permanent(format!("usersInfo returned an unexpected reply: {}", e))
        })?;
        debug!(principal = name, database, matches = users.len(), "usersInfo");
        Ok(!users.is_empty())
    }

    async fn create_principal(&self, spec: &PrincipalSpec) -> Result<(), DriverError> {
        self.run(spec.target_database(), "createUser", create_user_command(spec))
            .await
            .map(|_| ())
    }

    fn backend(&self) -> &str {
        "mongodb"
    }
}
