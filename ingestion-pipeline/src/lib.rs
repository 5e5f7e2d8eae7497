#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod artifacts;
pub mod pipeline;
pub mod utils;

pub use artifacts::{ArtifactOutcome, ArtifactWorker};
pub use pipeline::{ArtifactJob, ArtifactJobReceiver, IngestionPipeline};
pub use utils::upload::DocumentUpload;

use tracing::{debug, error, info, warn};

/// Produces derived artifacts for queued documents until the pipeline that
/// feeds the queue is dropped.
///
/// Documents stored while no worker ran are rendered first.
pub async fn run_artifact_worker(worker: ArtifactWorker, mut jobs: ArtifactJobReceiver) {
    match worker.backfill_missing_thumbnails().await {
        Ok(count) if count > 0 => info!(count, "Thumbnail backfill complete"),
        Ok(_) => {}
        Err(err) => warn!(
            error = %err,
            "Thumbnail backfill failed; continuing with new uploads only"
        ),
    }

    info!("Artifact worker started");

    while let Some(job) = jobs.recv().await {
        let document_id = job.document_id;
        match worker.process_document(document_id).await {
            Ok(outcome) => debug!(%document_id, ?outcome, "Artifact job finished"),
            Err(err) => error!(%document_id, error = %err, "Artifact job failed"),
        }
    }

    info!("Artifact worker stopped");
}
