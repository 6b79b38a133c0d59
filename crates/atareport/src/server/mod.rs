//! HTTP API.
//!
//! Exposes the form store and the export pipeline to the web editor. Store
//! operations are synchronous and run on the blocking pool behind a single
//! mutex, so read-modify-write sequences never interleave within one
//! process.

mod error;
mod handlers;

use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::{CommandRenderer, Exporter};
use crate::report::Assembler;
use crate::storage::FormStore;

pub use error::{ApiError, ResultExt};

/// Shared state of every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    store: Arc<Mutex<FormStore>>,
    exporter: Exporter,
    assembler: Arc<Assembler>,
}

impl AppState {
    /// Bundle already-built components.
    #[must_use]
    pub fn new(store: FormStore, exporter: Exporter, assembler: Assembler) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            exporter,
            assembler: Arc::new(assembler),
        }
    }

    /// Build the file-backed store, the command renderer and the assembler
    /// from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a data directory cannot be created or the logo
    /// cannot be loaded.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = FormStore::open(&config.storage)?;
        let renderer = Arc::new(CommandRenderer::from_config(&config.export));
        let exporter = Exporter::new(config.temp_dir(), renderer)?;
        let assembler = Assembler::from_config(&config.export)?;
        Ok(Self::new(store, exporter, assembler))
    }

    /// Run `f` against the store on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&FormStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let guard = store
                .lock()
                .map_err(|_| Error::internal("form store lock poisoned"))?;
            f(&guard)
        })
        .await
        .map_err(|e| Error::internal(format!("storage task failed: {e}")))?
    }
}

/// Build the API router.
pub fn router(state: AppState, permissive_cors: bool) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/data/:form_id", get(handlers::get_data))
        .route("/forms", get(handlers::list_forms))
        .route("/createForm", post(handlers::create_form))
        .route("/update/:form_id", post(handlers::update_form))
        .route("/generate/:form_id", post(handlers::generate))
        .route("/download/:filename", get(handlers::download))
        .route("/form/:form_id", delete(handlers::delete_form))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Serve the API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the state cannot be built or the address cannot be
/// bound.
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(state, config.server.permissive_cors);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::export::PdfRenderer;
    use crate::storage::{KeyValueStore, MemoryStore, StorageKey};

    #[derive(Debug)]
    struct StubRenderer;

    #[async_trait]
    impl PdfRenderer for StubRenderer {
        async fn render(&self, html: &str, output: &Path) -> Result<()> {
            tokio::fs::write(output, html).await?;
            Ok(())
        }
    }

    struct Harness {
        _temp_dir: TempDir,
        state: AppState,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_store(FormStore::in_memory())
        }

        fn with_store(store: FormStore) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let exporter = Exporter::new(temp_dir.path(), Arc::new(StubRenderer)).unwrap();
            Self {
                state: AppState::new(store, exporter, Assembler::default()),
                _temp_dir: temp_dir,
            }
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
            let response = router(self.state.clone(), true)
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, body.to_vec())
        }

        async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
            let (status, body) = self.send(request).await;
            (status, serde_json::from_slice(&body).unwrap())
        }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn delete_req(uri: &str) -> Request<Body> {
        Request::delete(uri).body(Body::empty()).unwrap()
    }

    async fn create(harness: &Harness) -> String {
        let (status, body) = harness
            .json(Request::post("/createForm").body(Body::empty()).unwrap())
            .await;
        assert_eq!(status, StatusCode::OK);
        body["formId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let harness = Harness::new();
        let (status, body) = harness.json(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let harness = Harness::new();
        let id = create(&harness).await;

        let (status, body) = harness.json(get("/forms")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{ "id": id, "title": "Novo Formulário", "date": "" }])
        );
    }

    #[tokio::test]
    async fn test_unknown_form_reads_as_default() {
        let harness = Harness::new();
        let (status, body) = harness.json(get("/data/never-created")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pdfGerado"], json!(false));
        assert_eq!(body["sectionsList"][0]["type"], json!("fiscal"));
        assert_eq!(body["sectionsList"][0]["blocks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_id_is_rejected() {
        let harness = Harness::new();
        let (status, body) = harness.json(get("/data/bad%20id")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_update_then_read_round_trip() {
        let harness = Harness::new();
        let id = create(&harness).await;

        let sections = json!([{
            "type": "contabil",
            "title": "Contábil",
            "blocks": [{ "title": "Balanço", "content": "<p>ok</p>", "assunto": "", "responsavel": "" }],
            "completed": true
        }]);
        let update = json!({
            "sectionsList": sections,
            "headerData": {
                "empresa": "Acme",
                "local": "Sede",
                "data": "2024-03-07",
                "participantesEmpresa": "Ana",
                "participantesContabilidade": "Eli"
            }
        });
        let (status, body) = harness
            .json(post_json(&format!("/update/{id}"), &update))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        let (_, document) = harness.json(get(&format!("/data/{id}"))).await;
        assert_eq!(document["sectionsList"], sections);
        assert_eq!(document["headerData"]["empresa"], json!("Acme"));

        let (_, forms) = harness.json(get("/forms")).await;
        assert_eq!(forms[0]["title"], json!("Acme"));
        assert_eq!(forms[0]["date"], json!("2024-03-07"));
    }

    #[tokio::test]
    async fn test_update_rejects_malformed_fields() {
        let harness = Harness::new();
        let id = create(&harness).await;
        let (status, _) = harness
            .json(post_json(
                &format!("/update/{id}"),
                &json!({ "sectionsList": "nope" }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generate_then_download_once() {
        let harness = Harness::new();
        let id = create(&harness).await;

        let request = json!({
            "sections": {
                "sectionsList": [{
                    "type": "fiscal",
                    "title": "Fiscal",
                    "blocks": [{ "title": "ICMS", "content": "<p>x</p>" }]
                }]
            },
            "headerData": { "empresa": "Acme & Co. Ltda", "data": "2024-03-07" }
        });
        let (status, body) = harness
            .json(post_json(&format!("/generate/{id}"), &request))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["empresaNome"], json!("Acme_Co_Ltda"));
        let filename = body["filename"].as_str().unwrap().to_string();

        let (_, document) = harness.json(get(&format!("/data/{id}"))).await;
        assert_eq!(document["pdfGerado"], json!(true));

        let response = router(harness.state.clone(), true)
            .oneshot(get(&format!("/download/{filename}?empresa=Acme_Co_Ltda")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Acme_Co_Ltda.zip\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");

        let (status, body) = harness
            .json(get(&format!("/download/{filename}")))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Arquivo não encontrado" }));
    }

    #[tokio::test]
    async fn test_download_defaults_name() {
        let harness = Harness::new();
        let id = create(&harness).await;
        let request = json!({ "sections": { "sectionsList": [] }, "headerData": {} });
        let (_, body) = harness
            .json(post_json(&format!("/generate/{id}"), &request))
            .await;
        assert_eq!(body["empresaNome"], json!("relatorio"));

        let filename = body["filename"].as_str().unwrap();
        let response = router(harness.state.clone(), true)
            .oneshot(get(&format!("/download/{filename}")))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"relatorio.zip\""
        );
    }

    #[tokio::test]
    async fn test_generate_requires_sections_and_header() {
        let harness = Harness::new();
        let id = create(&harness).await;
        for request in [
            json!({ "headerData": {} }),
            json!({ "sections": "x", "headerData": {} }),
            json!({ "sections": {} }),
        ] {
            let (status, body) = harness
                .json(post_json(&format!("/generate/{id}"), &request))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body["error"],
                json!("Dados inválidos: sections ou headerData ausentes")
            );
        }
    }

    #[tokio::test]
    async fn test_download_rejects_foreign_names() {
        let harness = Harness::new();
        let (status, _) = harness.json(get("/download/formList.json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_semantics() {
        let harness = Harness::new();
        let keep = create(&harness).await;
        let removed = create(&harness).await;

        let (status, body) = harness.json(delete_req(&format!("/form/{removed}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        let (status, body) = harness.json(delete_req(&format!("/form/{removed}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Formulário não encontrado." }));

        let (_, forms) = harness.json(get("/forms")).await;
        assert_eq!(forms.as_array().unwrap().len(), 1);
        assert_eq!(forms[0]["id"], json!(keep));
    }

    /// Memory backend that refuses to rewrite the index.
    #[derive(Debug, Default)]
    struct ReadOnlyIndexStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for ReadOnlyIndexStore {
        fn get(&self, key: &StorageKey) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn put(&self, key: &StorageKey, text: &str) -> Result<()> {
            if *key == StorageKey::Index {
                return Err(Error::internal("index is read-only"));
            }
            self.inner.put(key, text)
        }

        fn delete(&self, key: &StorageKey) -> Result<bool> {
            self.inner.delete(key)
        }

        fn list(&self) -> Result<Vec<crate::form::FormId>> {
            self.inner.list()
        }
    }

    #[tokio::test]
    async fn test_delete_with_unwritable_index_is_partial() {
        let backend = ReadOnlyIndexStore::default();
        let id = crate::form::FormId::parse("f1").unwrap();
        backend
            .inner
            .put(&StorageKey::Form(id), "{\"sectionsList\": []}")
            .unwrap();
        let harness = Harness::with_store(FormStore::new(Box::new(backend)));

        let (status, body) = harness.json(delete_req("/form/f1")).await;
        assert_eq!(status, StatusCode::MULTI_STATUS);
        assert_eq!(
            body["warning"],
            json!("Formulário excluído, mas houve erro ao atualizar a lista")
        );
        assert!(body["error"].as_str().unwrap().contains("read-only"));
    }

    #[tokio::test]
    async fn test_update_with_corrupt_index_succeeds() {
        let backend = MemoryStore::new();
        backend.put(&StorageKey::Index, "not json").unwrap();
        let harness = Harness::with_store(FormStore::new(Box::new(backend)));

        let (status, _) = harness
            .json(post_json("/update/f1", &json!({"headerData": {"empresa": "Acme"}})))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = harness.json(get("/data/f1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["headerData"]["empresa"], json!("Acme"));
    }
}
