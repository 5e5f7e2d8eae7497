use std::sync::Arc;

use answer_pipeline::{DocumentChat, TextGenerator};
use common::{storage::store::DocumentStore, utils::config::AppConfig};
use ingestion_pipeline::IngestionPipeline;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<DocumentStore>,
    pub ingestion: Arc<IngestionPipeline>,
    pub chat: Arc<DocumentChat>,
    pub config: AppConfig,
}

impl ApiState {
    pub fn new(
        config: &AppConfig,
        ingestion: Arc<IngestionPipeline>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let store = Arc::clone(ingestion.store());
        let chat = Arc::new(DocumentChat::new(
            Arc::clone(&store),
            generator,
            config.persist_chat_history,
        ));

        Self {
            store,
            ingestion,
            chat,
            config: config.clone(),
        }
    }
}
