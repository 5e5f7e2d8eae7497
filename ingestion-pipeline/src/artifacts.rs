use std::sync::Arc;

use common::{
    error::AppError,
    storage::{store::DocumentStore, types::document::DocumentId},
    utils::config::AppConfig,
};
use tracing::{debug, info, warn};

use crate::utils::thumbnail::{renderer_from_config, ThumbnailRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOutcome {
    ThumbnailStored,
    /// The document was deleted before or while its artifacts were produced.
    DocumentGone,
    /// The producer failed; the thumbnail stays absent.
    RenderFailed,
}

/// Renders thumbnails for stored documents and writes them back.
pub struct ArtifactWorker {
    store: Arc<DocumentStore>,
    renderer: Arc<dyn ThumbnailRenderer>,
}

impl ArtifactWorker {
    pub fn new(store: Arc<DocumentStore>, config: &AppConfig) -> Self {
        Self::with_renderer(store, renderer_from_config(config))
    }

    pub fn with_renderer(store: Arc<DocumentStore>, renderer: Arc<dyn ThumbnailRenderer>) -> Self {
        Self { store, renderer }
    }

    /// Renders every stored document that still lacks a thumbnail.
    pub async fn backfill_missing_thumbnails(&self) -> Result<usize, AppError> {
        let ids = self.store.ids_without_thumbnail().await?;
        if !ids.is_empty() {
            info!(count = ids.len(), "Backfilling missing thumbnails");
        }

        let mut stored = 0;
        for id in ids {
            if self.process_document(id).await? == ArtifactOutcome::ThumbnailStored {
                stored += 1;
            }
        }
        Ok(stored)
    }

    /// Renders the thumbnail of one document and writes it back.
    ///
    /// A document deleted in the meantime is not an error, and a renderer
    /// failure leaves the thumbnail absent. Storage failures are returned.
    #[tracing::instrument(skip(self), fields(renderer = self.renderer.name()))]
    pub async fn process_document(
        &self,
        document_id: DocumentId,
    ) -> Result<ArtifactOutcome, AppError> {
        let content = match self.store.get(document_id).await {
            Ok(document) => document.content,
            Err(AppError::NotFound(_)) => {
                info!(%document_id, "Document deleted before its thumbnail was rendered");
                return Ok(ArtifactOutcome::DocumentGone);
            }
            Err(err) => return Err(err),
        };

        let renderer = Arc::clone(&self.renderer);
        let rendered = tokio::task::spawn_blocking(move || renderer.render(&content))
            .await
            .map_err(AppError::from)
            .and_then(|result| result);

        let thumbnail = match rendered {
            Ok(thumbnail) => thumbnail,
            Err(err) => {
                warn!(%document_id, error = %err, "Thumbnail rendering failed");
                return Ok(ArtifactOutcome::RenderFailed);
            }
        };

        match self.store.update_thumbnail(document_id, thumbnail).await {
            Ok(()) => {
                debug!(%document_id, "Thumbnail stored");
                Ok(ArtifactOutcome::ThumbnailStored)
            }
            Err(AppError::NotFound(_)) => {
                info!(%document_id, "Document deleted while its thumbnail was rendered");
                Ok(ArtifactOutcome::DocumentGone)
            }
            Err(AppError::Validation(reason)) => {
                warn!(%document_id, %reason, "Renderer produced an unusable thumbnail");
                Ok(ArtifactOutcome::RenderFailed)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pdf::testing::blank_pdf;
    use bytes::Bytes;
    use common::storage::db::SurrealDbClient;
    use uuid::Uuid;

    struct FailingRenderer;

    impl ThumbnailRenderer for FailingRenderer {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn render(&self, _content: &[u8]) -> Result<String, AppError> {
            Err(AppError::Processing("renderer exploded".into()))
        }
    }

    struct SentinelRenderer;

    impl ThumbnailRenderer for SentinelRenderer {
        fn name(&self) -> &'static str {
            "sentinel"
        }

        fn render(&self, _content: &[u8]) -> Result<String, AppError> {
            Ok("error".into())
        }
    }

    async fn store_with_pdf() -> (Arc<DocumentStore>, DocumentId) {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        let store = Arc::new(DocumentStore::with_client(Arc::new(db)));
        let id = store
            .create("x.pdf", Bytes::from(blank_pdf().expect("pdf")))
            .await
            .expect("create");
        (store, id)
    }

    #[tokio::test]
    async fn test_thumbnail_is_written_back() {
        let (store, id) = store_with_pdf().await;
        let before = store.get(id).await.expect("get");
        let worker = ArtifactWorker::new(Arc::clone(&store), &AppConfig::default());

        assert_eq!(
            worker.process_document(id).await.expect("process"),
            ArtifactOutcome::ThumbnailStored
        );

        let after = store.get(id).await.expect("get");
        assert!(after.thumbnail.as_deref().is_some_and(|t| !t.is_empty()));
        assert_eq!(after.name, before.name);
        assert_eq!(after.content, before.content);
    }

    #[tokio::test]
    async fn test_renderer_failure_leaves_thumbnail_absent() {
        let (store, id) = store_with_pdf().await;
        let worker = ArtifactWorker::with_renderer(Arc::clone(&store), Arc::new(FailingRenderer));

        assert_eq!(
            worker.process_document(id).await.expect("process"),
            ArtifactOutcome::RenderFailed
        );
        assert!(store.get(id).await.expect("get").thumbnail.is_none());
    }

    #[tokio::test]
    async fn test_sentinel_output_is_never_stored() {
        let (store, id) = store_with_pdf().await;
        let worker = ArtifactWorker::with_renderer(Arc::clone(&store), Arc::new(SentinelRenderer));

        assert_eq!(
            worker.process_document(id).await.expect("process"),
            ArtifactOutcome::RenderFailed
        );
        assert!(store.get(id).await.expect("get").thumbnail.is_none());
    }

    #[tokio::test]
    async fn test_deleted_document_is_skipped() {
        let (store, id) = store_with_pdf().await;
        store.delete(id).await.expect("delete");
        let worker = ArtifactWorker::new(Arc::clone(&store), &AppConfig::default());

        assert_eq!(
            worker.process_document(id).await.expect("process"),
            ArtifactOutcome::DocumentGone
        );
        assert!(matches!(store.get(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_backfill_renders_only_missing_thumbnails() {
        let (store, first) = store_with_pdf().await;
        let second = store
            .create("y.pdf", Bytes::from(blank_pdf().expect("pdf")))
            .await
            .expect("create");
        let worker = ArtifactWorker::new(Arc::clone(&store), &AppConfig::default());
        worker.process_document(first).await.expect("process");

        assert_eq!(worker.backfill_missing_thumbnails().await.expect("backfill"), 1);
        assert!(store.get(second).await.expect("get").thumbnail.is_some());
        assert!(store.ids_without_thumbnail().await.expect("ids").is_empty());
    }
}
