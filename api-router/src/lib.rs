#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use routes::{
    documents::{
        delete_document, get_document, get_document_content, get_page, list_documents,
        upload_document,
    },
    liveness::live,
    messages::{clear_messages, get_messages, open_session, send_message},
    readiness::ready,
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probes for k8s/systemd
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let documents = Router::new()
        .route(
            "/documents",
            get(list_documents).post(upload_document).layer(DefaultBodyLimit::max(
                app_state.config.max_upload_bytes,
            )),
        )
        .route("/documents/{id}", get(get_document).delete(delete_document))
        .route("/documents/{id}/content", get(get_document_content))
        .route("/documents/{id}/pages", get(get_page))
        .route(
            "/documents/{id}/messages",
            get(get_messages).post(send_message).delete(clear_messages),
        )
        .route("/documents/{id}/session", post(open_session));

    probes.merge(documents)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use answer_pipeline::{session::testing::EchoGenerator, TextGenerator};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use common::{
        storage::{db::SurrealDbClient, store::DocumentStore},
        utils::config::AppConfig,
    };
    use ingestion_pipeline::{
        run_artifact_worker, utils::pdf::testing::pdf_with_pages, ArtifactWorker,
        IngestionPipeline,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    const BOUNDARY: &str = "docchat-test-boundary";

    struct TestApp {
        router: Router,
        state: ApiState,
        worker: Option<ArtifactWorker>,
        jobs: Option<ingestion_pipeline::ArtifactJobReceiver>,
    }

    async fn test_app(config: AppConfig) -> TestApp {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        let store = Arc::new(DocumentStore::with_client(Arc::new(db)));
        let (pipeline, jobs) = IngestionPipeline::new(Arc::clone(&store));
        let generator: Arc<dyn TextGenerator> = Arc::new(EchoGenerator::default());
        let state = ApiState::new(&config, Arc::new(pipeline), generator);

        TestApp {
            router: Router::new()
                .nest("/api/v1", api_routes_v1(&state))
                .with_state(state.clone()),
            worker: Some(ArtifactWorker::new(Arc::clone(&store), &config)),
            state,
            jobs: Some(jobs),
        }
    }

    fn multipart_body(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n"
        )
        .into_bytes();
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn upload(
        app: &TestApp,
        file_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Response {
        app.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/documents")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(multipart_body(file_name, content_type, bytes)))
                    .expect("request"),
            )
            .await
            .expect("router response")
    }

    async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        app.router
            .clone()
            .oneshot(request.body(body).expect("request"))
            .await
            .expect("router response")
    }

    async fn send_json(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> Value {
        json_body(send(app, method, uri, body).await).await
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn pdf() -> Vec<u8> {
        pdf_with_pages(&["Alpha", "Beta", "Gamma"]).expect("pdf")
    }

    #[tokio::test]
    async fn test_probes() {
        let app = test_app(AppConfig::default()).await;
        assert_eq!(send(&app, "GET", "/api/v1/live", None).await.status(), StatusCode::OK);
        assert_eq!(send(&app, "GET", "/api/v1/ready", None).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_is_listed_then_thumbnailed() {
        let mut app = test_app(AppConfig::default()).await;
        let pdf = pdf();

        let response = upload(&app, "x.pdf", Some("application/pdf"), &pdf).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = json_body(response).await["id"].as_i64().expect("id");

        let listed = json_body(send(&app, "GET", "/api/v1/documents", None).await).await;
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(listed[0]["name"], "x.pdf");
        assert!(listed[0]["thumbnail"].is_null());

        // Let the worker drain the queued job, then stop it.
        let worker = app.worker.take().expect("worker");
        let jobs = app.jobs.take().expect("jobs");
        let handle = tokio::spawn(run_artifact_worker(worker, jobs));
        let state = app.state.clone();
        drop(app);
        drop(state.ingestion);
        handle.await.expect("worker finished");

        let document = state.store.get(id.into()).await.expect("get");
        assert!(document.thumbnail.is_some_and(|t| !t.is_empty()));
        assert_eq!(document.content.as_ref(), pdf.as_slice());
    }

    #[tokio::test]
    async fn test_content_pages_and_delete() {
        let app = test_app(AppConfig::default()).await;
        let pdf = pdf();
        let id = json_body(upload(&app, "three.pdf", None, &pdf).await).await["id"]
            .as_i64()
            .expect("id");

        let content = send(&app, "GET", &format!("/api/v1/documents/{id}/content"), None).await;
        assert_eq!(content.status(), StatusCode::OK);
        assert_eq!(
            content.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"application/pdf"[..])
        );
        let bytes = to_bytes(content.into_body(), usize::MAX).await.expect("body");
        assert_eq!(bytes.as_ref(), pdf.as_slice());

        let pages_uri = format!("/api/v1/documents/{id}/pages");
        let page = send_json(&app, "GET", &format!("{pages_uri}?page=9"), None).await;
        assert_eq!(page, json!({"page": 3, "page_count": 3}));
        let page = send_json(&app, "GET", &format!("{pages_uri}?page=0"), None).await;
        assert_eq!(page["page"], 1);

        let deleted = send(&app, "DELETE", &format!("/api/v1/documents/{id}"), None).await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        let again = send(&app, "DELETE", &format!("/api/v1/documents/{id}"), None).await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
        let missing = send(&app, "GET", &format!("/api/v1/documents/{id}"), None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let listed = json_body(send(&app, "GET", "/api/v1/documents", None).await).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_non_pdf_upload_is_rejected() {
        let app = test_app(AppConfig::default()).await;

        let response = upload(&app, "notes.txt", Some("text/plain"), b"hello").await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json_body(response).await["status"], "error");

        let listed = json_body(send(&app, "GET", "/api/v1/documents", None).await).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let app = test_app(AppConfig {
            max_upload_bytes: 1024,
            ..Default::default()
        })
        .await;

        let response = upload(&app, "big.pdf", Some("application/pdf"), &vec![b'x'; 4096]).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(app.state.store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_conversation_endpoints() {
        let app = test_app(AppConfig::default()).await;
        let uploaded = upload(&app, "chat.pdf", Some("application/pdf"), &pdf()).await;
        let id = json_body(uploaded).await["id"].as_i64().expect("id");
        let messages_uri = format!("/api/v1/documents/{id}/messages");

        let session_uri = format!("/api/v1/documents/{id}/session");
        let opened = send_json(&app, "POST", &session_uri, None).await;
        assert_eq!(
            opened,
            json!([{"role": "assistant", "content": "re: summarize the pdf"}])
        );

        let added = send_json(
            &app,
            "POST",
            &messages_uri,
            Some(json!({"content": "fail please"})),
        )
        .await;
        assert_eq!(added[0], json!({"role": "user", "content": "fail please"}));
        assert_eq!(added[1]["error"], true);

        let blank = send_json(&app, "POST", &messages_uri, Some(json!({"content": "  "}))).await;
        assert_eq!(blank, json!([]));

        let history = json_body(send(&app, "GET", &messages_uri, None).await).await;
        assert_eq!(history.as_array().map(Vec::len), Some(3));

        let cleared = send(&app, "DELETE", &messages_uri, None).await;
        assert_eq!(cleared.status(), StatusCode::NO_CONTENT);
        let history = json_body(send(&app, "GET", &messages_uri, None).await).await;
        assert_eq!(history, json!([]));

        let missing = send(
            &app,
            "POST",
            "/api/v1/documents/999/messages",
            Some(json!({"content": "hi"})),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unopenable_store_reports_503() {
        let config = AppConfig {
            surrealdb_address: "nosuchengine://nowhere".into(),
            ..Default::default()
        };
        let store = Arc::new(DocumentStore::new(config.clone()));
        let (pipeline, _jobs) = IngestionPipeline::new(store);
        let generator: Arc<dyn TextGenerator> = Arc::new(EchoGenerator::default());
        let state = ApiState::new(&config, Arc::new(pipeline), generator);
        let router: Router = Router::new()
            .nest("/api/v1", api_routes_v1(&state))
            .with_state(state);

        let list = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/documents")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(list.status(), StatusCode::SERVICE_UNAVAILABLE);

        let ready = router
            .oneshot(Request::builder().uri("/api/v1/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
