use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info};

use crate::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            document::{Document, DocumentId, DocumentSummary},
            message::ChatMessage,
        },
    },
    utils::config::AppConfig,
};

/// Process-wide owner of the document database.
///
/// Holds one long-lived client, opened on first use and shared by every
/// operation afterwards. A failed open is reported as `StorageUnavailable`
/// and attempted again by the next call, so a transient failure at startup
/// does not poison the service.
///
/// Every write goes through one lock. A SurrealDB `UPDATE` writes back the
/// record it read, so an update overlapping a delete would otherwise bring
/// the deleted record back.
pub struct DocumentStore {
    config: AppConfig,
    client: OnceCell<Arc<SurrealDbClient>>,
    write_lock: Mutex<()>,
}

impl DocumentStore {
    /// Create a store that opens the configured engine lazily.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store around an already opened client.
    ///
    /// Useful in tests where the client is an in-memory engine.
    pub fn with_client(client: Arc<SurrealDbClient>) -> Self {
        Self {
            config: AppConfig::default(),
            client: OnceCell::new_with(Some(client)),
            write_lock: Mutex::new(()),
        }
    }

    /// The shared client, opening it if this is the first use.
    pub async fn client(&self) -> Result<&SurrealDbClient, AppError> {
        let client = self
            .client
            .get_or_try_init(|| async {
                info!(address = %self.config.surrealdb_address, "Opening document store");
                SurrealDbClient::from_config(&self.config)
                    .await
                    .map(Arc::new)
                    .map_err(|err| {
                        error!(
                            address = %self.config.surrealdb_address,
                            error = %err,
                            "Failed to open document store"
                        );
                        AppError::StorageUnavailable(err.to_string())
                    })
            })
            .await?;

        Ok(client.as_ref())
    }

    /// Opens the store eagerly; used at startup to fail fast.
    pub async fn ensure_ready(&self) -> Result<(), AppError> {
        self.client().await?.is_ready().await?;
        Ok(())
    }

    pub async fn create(&self, name: &str, content: Bytes) -> Result<DocumentId, AppError> {
        let db = self.client().await?;
        let bytes = content.len();

        let _guard = self.write_lock.lock().await;
        let id = Document::create(name, content, db).await?;

        info!(document_id = %id, name, bytes, "Stored document");
        Ok(id)
    }

    pub async fn get(&self, id: DocumentId) -> Result<Document, AppError> {
        Document::get(id, self.client().await?).await
    }

    pub async fn get_summary(&self, id: DocumentId) -> Result<DocumentSummary, AppError> {
        Document::get_summary(id, self.client().await?).await
    }

    pub async fn list(&self) -> Result<Vec<Document>, AppError> {
        Document::list(self.client().await?).await
    }

    pub async fn list_summaries(&self) -> Result<Vec<DocumentSummary>, AppError> {
        Document::list_summaries(self.client().await?).await
    }

    pub async fn ids_without_thumbnail(&self) -> Result<Vec<DocumentId>, AppError> {
        Document::ids_without_thumbnail(self.client().await?).await
    }

    pub async fn update_thumbnail(
        &self,
        id: DocumentId,
        thumbnail: String,
    ) -> Result<(), AppError> {
        let db = self.client().await?;
        let bytes = thumbnail.len();

        let _guard = self.write_lock.lock().await;
        Document::update_thumbnail(id, thumbnail, db).await?;
        debug!(document_id = %id, bytes, "Thumbnail written back");
        Ok(())
    }

    pub async fn append_messages(
        &self,
        id: DocumentId,
        messages: Vec<ChatMessage>,
    ) -> Result<(), AppError> {
        let db = self.client().await?;
        let _guard = self.write_lock.lock().await;
        Document::append_messages(id, messages, db).await
    }

    pub async fn clear_messages(&self, id: DocumentId) -> Result<(), AppError> {
        let db = self.client().await?;
        let _guard = self.write_lock.lock().await;
        Document::clear_messages(id, db).await
    }

    pub async fn delete(&self, id: DocumentId) -> Result<(), AppError> {
        let db = self.client().await?;
        let _guard = self.write_lock.lock().await;
        Document::delete(id, db).await?;
        info!(document_id = %id, "Deleted document");
        Ok(())
    }
}
