use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    storage::db::{with_conflict_retry, SurrealDbClient},
};

use super::{
    deserialize_datetime, deserialize_record_key, message::ChatMessage, RecordKey, StoredObject,
};

pub type DocumentId = RecordKey;

const THUMBNAIL_PREFIX: &str = "data:image/";

/// An uploaded file together with its derived artifacts and chat history.
///
/// `name` and `content` are fixed at creation. `thumbnail` is written back by
/// the artifact worker and `messages` by the chat session; neither write ever
/// touches the other fields.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Document {
    #[serde(deserialize_with = "deserialize_record_key")]
    pub id: DocumentId,
    pub name: String,
    pub content: Bytes,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Listing view of a document, without the binary.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DocumentSummary {
    #[serde(deserialize_with = "deserialize_record_key")]
    pub id: DocumentId,
    pub name: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub message_count: usize,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct DocumentRef {
    #[serde(deserialize_with = "deserialize_record_key")]
    id: DocumentId,
}

impl StoredObject for Document {
    fn table_name() -> &'static str {
        "document"
    }
}

impl Document {
    /// Inserts a new record and returns its engine-assigned id.
    ///
    /// The id is taken from the `sequence:document` counter inside the same
    /// transaction as the insert, so a failed insert leaves neither a record
    /// nor a half-advanced counter behind.
    pub async fn create(
        name: &str,
        content: Bytes,
        db: &SurrealDbClient,
    ) -> Result<DocumentId, AppError> {
        if content.is_empty() {
            return Err(AppError::Validation(
                "Document content must not be empty".into(),
            ));
        }

        const CREATE_QUERY: &str = r#"
            BEGIN TRANSACTION;
            UPSERT type::thing('sequence', $table) SET last_id = (last_id ?? 0) + 1;
            CREATE type::thing($table, (SELECT VALUE last_id FROM ONLY type::thing('sequence', $table)))
            CONTENT {
                name: $name,
                content: $content,
                messages: [],
                created_at: time::now()
            }
            RETURN id;
            COMMIT TRANSACTION;
        "#;

        with_conflict_retry("create_document", || {
            let name = name.to_string();
            let content = content.clone();
            async move {
                let mut response = db
                    .client
                    .query(CREATE_QUERY)
                    .bind(("table", Self::table_name()))
                    .bind(("name", name))
                    .bind(("content", content))
                    .await?
                    .check()?;

                let last = response.num_statements().saturating_sub(1);
                let created: Option<DocumentRef> = response.take(last)?;

                created.map(|record| record.id).ok_or_else(|| {
                    AppError::InternalError("Document insert returned no record".into())
                })
            }
        })
        .await
    }

    pub async fn get(id: DocumentId, db: &SurrealDbClient) -> Result<Self, AppError> {
        let document: Option<Self> = db
            .client
            .query("SELECT * FROM type::thing($table, $id)")
            .bind(("table", Self::table_name()))
            .bind(("id", id.0))
            .await?
            .take(0)?;

        document.ok_or_else(|| AppError::document_not_found(id))
    }

    /// All documents in creation order.
    pub async fn list(db: &SurrealDbClient) -> Result<Vec<Self>, AppError> {
        let documents: Vec<Self> = db
            .client
            .query("SELECT * FROM type::table($table) ORDER BY id ASC")
            .bind(("table", Self::table_name()))
            .await?
            .take(0)?;

        Ok(documents)
    }

    /// Same order as [`Document::list`], without loading any binaries.
    pub async fn list_summaries(db: &SurrealDbClient) -> Result<Vec<DocumentSummary>, AppError> {
        let summaries: Vec<DocumentSummary> = db
            .client
            .query(
                "SELECT id, name, thumbnail, created_at, array::len(messages) AS message_count
                 FROM type::table($table) ORDER BY id ASC",
            )
            .bind(("table", Self::table_name()))
            .await?
            .take(0)?;

        Ok(summaries)
    }

    pub async fn get_summary(
        id: DocumentId,
        db: &SurrealDbClient,
    ) -> Result<DocumentSummary, AppError> {
        let summary: Option<DocumentSummary> = db
            .client
            .query(
                "SELECT id, name, thumbnail, created_at, array::len(messages) AS message_count
                 FROM type::thing($table, $id)",
            )
            .bind(("table", Self::table_name()))
            .bind(("id", id.0))
            .await?
            .take(0)?;

        summary.ok_or_else(|| AppError::document_not_found(id))
    }

    /// Ids of documents whose thumbnail has not been produced yet.
    pub async fn ids_without_thumbnail(db: &SurrealDbClient) -> Result<Vec<DocumentId>, AppError> {
        let records: Vec<DocumentRef> = db
            .client
            .query("SELECT id FROM type::table($table) WHERE thumbnail = NONE ORDER BY id ASC")
            .bind(("table", Self::table_name()))
            .await?
            .take(0)?;

        Ok(records.into_iter().map(|record| record.id).collect())
    }

    /// Writes the thumbnail back onto an existing record.
    ///
    /// Reports `NotFound` when the record is already gone. The `UPDATE` is not
    /// atomic with a concurrent `DELETE`; callers serialize writes through
    /// [`DocumentStore`](crate::storage::store::DocumentStore).
    pub async fn update_thumbnail(
        id: DocumentId,
        thumbnail: String,
        db: &SurrealDbClient,
    ) -> Result<(), AppError> {
        validate_thumbnail(&thumbnail)?;

        with_conflict_retry("update_thumbnail", || {
            let thumbnail = thumbnail.clone();
            async move {
                let updated: Option<DocumentRef> = db
                    .client
                    .query("UPDATE type::thing($table, $id) SET thumbnail = $thumbnail RETURN id")
                    .bind(("table", Self::table_name()))
                    .bind(("id", id.0))
                    .bind(("thumbnail", thumbnail))
                    .await?
                    .take(0)?;

                updated
                    .map(|_| ())
                    .ok_or_else(|| AppError::document_not_found(id))
            }
        })
        .await
    }

    /// Appends turns to the stored history, with the same not-found rule as
    /// [`Document::update_thumbnail`].
    pub async fn append_messages(
        id: DocumentId,
        messages: Vec<ChatMessage>,
        db: &SurrealDbClient,
    ) -> Result<(), AppError> {
        if messages.is_empty() {
            // Still report a missing document to the caller.
            return Self::get_summary(id, db).await.map(|_| ());
        }

        with_conflict_retry("append_messages", || {
            let messages = messages.clone();
            async move {
                let updated: Option<DocumentRef> = db
                    .client
                    .query(
                        "UPDATE type::thing($table, $id)
                         SET messages = array::concat(messages, $messages) RETURN id",
                    )
                    .bind(("table", Self::table_name()))
                    .bind(("id", id.0))
                    .bind(("messages", messages))
                    .await?
                    .take(0)?;

                updated
                    .map(|_| ())
                    .ok_or_else(|| AppError::document_not_found(id))
            }
        })
        .await
    }

    pub async fn clear_messages(id: DocumentId, db: &SurrealDbClient) -> Result<(), AppError> {
        with_conflict_retry("clear_messages", || async move {
            let updated: Option<DocumentRef> = db
                .client
                .query("UPDATE type::thing($table, $id) SET messages = [] RETURN id")
                .bind(("table", Self::table_name()))
                .bind(("id", id.0))
                .await?
                .take(0)?;

            updated
                .map(|_| ())
                .ok_or_else(|| AppError::document_not_found(id))
        })
        .await
    }

    /// Removes the record with all its fields in one statement.
    pub async fn delete(id: DocumentId, db: &SurrealDbClient) -> Result<(), AppError> {
        with_conflict_retry("delete_document", || async move {
            let deleted: Option<DocumentRef> = db
                .client
                .query("DELETE type::thing($table, $id) RETURN BEFORE")
                .bind(("table", Self::table_name()))
                .bind(("id", id.0))
                .await?
                .take(0)?;

            deleted
                .map(|_| ())
                .ok_or_else(|| AppError::document_not_found(id))
        })
        .await
    }
}

/// A thumbnail must be a self-contained image URI the listing can render as
/// is; anything else would be a sentinel the viewer tries and fails to draw.
pub fn validate_thumbnail(thumbnail: &str) -> Result<(), AppError> {
    let payload = thumbnail
        .strip_prefix(THUMBNAIL_PREFIX)
        .and_then(|rest| rest.split_once(','))
        .map(|(_, payload)| payload);

    match payload {
        Some(payload) if !payload.is_empty() => Ok(()),
        _ => Err(AppError::Validation(
            "Thumbnail must be a non-empty data:image URI".into(),
        )),
    }
}
