use std::{future::Future, ops::Deref, path::Path, time::Duration};

use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{error::AppError, utils::config::AppConfig};

const MAX_CONFLICT_ATTEMPTS: usize = 5;
const INITIAL_BACKOFF_MS: u64 = 20;
const MAX_BACKOFF_MS: u64 = 400;

/// Embedded engines that keep their data in a local directory.
const FILE_BACKED_SCHEMES: [&str; 2] = ["surrealkv://", "rocksdb://"];

const DOCUMENT_SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS document SCHEMALESS;
    DEFINE FIELD IF NOT EXISTS name ON TABLE document TYPE string;
    DEFINE FIELD IF NOT EXISTS content ON TABLE document TYPE bytes;
    DEFINE FIELD IF NOT EXISTS thumbnail ON TABLE document TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS messages ON TABLE document TYPE array DEFAULT [];
    DEFINE FIELD IF NOT EXISTS created_at ON TABLE document TYPE datetime DEFAULT time::now();
    DEFINE TABLE IF NOT EXISTS sequence SCHEMALESS;
"#;

#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    /// # Initialize a new database client
    ///
    /// # Arguments
    /// * `address` - Engine endpoint, e.g. `surrealkv://./data/documents.db` or `ws://host:8000`
    /// * `credentials` - Root username and password, for engines that require sign-in
    /// * `namespace` / `database` - Selected after connecting
    ///
    /// # Returns
    /// * `SurrealDbClient` initialized
    pub async fn new(
        address: &str,
        credentials: Option<(&str, &str)>,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;

        if let Some((username, password)) = credentials {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }

    /// Opens the configured engine, creating the data directory of a
    /// file-backed engine first, and defines the document schema.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        if let Some(path) = FILE_BACKED_SCHEMES
            .iter()
            .find_map(|scheme| config.surrealdb_address.strip_prefix(scheme))
        {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        let db = Self::new(
            &config.surrealdb_address,
            config.surrealdb_credentials(),
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?;

        db.ensure_initialized().await?;

        Ok(db)
    }

    /// Idempotent: every definition uses `IF NOT EXISTS`.
    pub async fn ensure_initialized(&self) -> Result<(), Error> {
        self.client.query(DOCUMENT_SCHEMA).await?.check()?;
        Ok(())
    }

    pub async fn is_ready(&self) -> Result<(), Error> {
        self.client.query("RETURN true").await?.check()?;
        Ok(())
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

/// Runs a write, re-running it when SurrealDB reports an optimistic
/// transaction conflict. Any other outcome, success or failure, is returned
/// as is; a conflicted transaction has written nothing.
pub async fn with_conflict_retry<T, F, Fut>(
    operation: &'static str,
    mut f: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut backoff_ms = INITIAL_BACKOFF_MS;
    let mut attempt = 1;

    loop {
        match f().await {
            Err(err) if err.is_retryable_conflict() && attempt < MAX_CONFLICT_ATTEMPTS => {
                warn!(operation, attempt, "Transient SurrealDB conflict; retrying");
                sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                attempt += 1;
            }
            result => {
                if attempt > 1 {
                    debug!(operation, attempt, "Write settled after conflict retries");
                }
                return result;
            }
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        let client = SurrealDbClient { client: db };
        client.ensure_initialized().await?;

        Ok(client)
    }
}
