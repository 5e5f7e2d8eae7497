use std::sync::Arc;

use common::{
    error::AppError,
    storage::{store::DocumentStore, types::document::DocumentId},
};
use tokio::sync::mpsc;
use tracing::warn;

use crate::utils::upload::DocumentUpload;

/// Derived-artifact work for one stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactJob {
    pub document_id: DocumentId,
}

pub type ArtifactJobReceiver = mpsc::UnboundedReceiver<ArtifactJob>;

/// Validates uploads, stores them, and queues their derived artifacts.
#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    store: Arc<DocumentStore>,
    jobs: mpsc::UnboundedSender<ArtifactJob>,
}

impl IngestionPipeline {
    /// The pipeline and the queue its artifact jobs arrive on.
    pub fn new(store: Arc<DocumentStore>) -> (Self, ArtifactJobReceiver) {
        let (jobs, receiver) = mpsc::unbounded_channel();
        (Self { store, jobs }, receiver)
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Stores a validated upload and queues its thumbnail.
    ///
    /// Nothing is written when validation fails.
    #[tracing::instrument(
        skip_all,
        fields(file_name = %upload.file_name, bytes = upload.bytes.len())
    )]
    pub async fn ingest(&self, upload: DocumentUpload) -> Result<DocumentId, AppError> {
        upload.validate()?;

        let id = self.store.create(&upload.file_name, upload.bytes).await?;

        if self.jobs.send(ArtifactJob { document_id: id }).is_err() {
            // Picked up by the backfill on the next worker start.
            warn!(document_id = %id, "Artifact worker is not running; thumbnail deferred");
        }

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pdf::testing::blank_pdf;
    use bytes::Bytes;
    use common::storage::db::SurrealDbClient;
    use uuid::Uuid;

    async fn test_store() -> Arc<DocumentStore> {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        Arc::new(DocumentStore::with_client(Arc::new(db)))
    }

    fn pdf_upload(name: &str) -> DocumentUpload {
        DocumentUpload::new(
            name,
            Some("application/pdf".into()),
            Bytes::from(blank_pdf().expect("pdf")),
        )
    }

    #[tokio::test]
    async fn test_ingest_stores_and_queues() {
        let store = test_store().await;
        let (pipeline, mut jobs) = IngestionPipeline::new(Arc::clone(&store));

        let id = pipeline.ingest(pdf_upload("x.pdf")).await.expect("ingest");

        let listed = store.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "x.pdf");
        assert!(listed[0].thumbnail.is_none());
        assert!(listed[0].messages.is_empty());
        assert_eq!(jobs.recv().await, Some(ArtifactJob { document_id: id }));
    }

    #[tokio::test]
    async fn test_non_pdf_is_rejected_without_a_record() {
        let store = test_store().await;
        let (pipeline, mut jobs) = IngestionPipeline::new(Arc::clone(&store));
        pipeline.ingest(pdf_upload("keep.pdf")).await.expect("ingest");
        let before = store.list().await.expect("list").len();

        let result = pipeline
            .ingest(DocumentUpload::new(
                "notes.txt",
                Some("text/plain".into()),
                Bytes::from_static(b"hello"),
            ))
            .await;

        assert!(matches!(result, Err(AppError::InvalidDocument(_))));
        assert_eq!(store.list().await.expect("list").len(), before);
        assert!(jobs.recv().await.is_some());
        assert!(jobs.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ingest_without_worker_still_stores() {
        let store = test_store().await;
        let (pipeline, jobs) = IngestionPipeline::new(Arc::clone(&store));
        drop(jobs);

        let id = pipeline.ingest(pdf_upload("late.pdf")).await.expect("ingest");
        assert_eq!(store.get(id).await.expect("get").name, "late.pdf");
    }
}
