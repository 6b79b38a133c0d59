//! Route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::error::{ApiError, ResultExt};
use super::AppState;
use crate::error::Error;
use crate::export::safe_download_name;
use crate::form::{FormDocument, FormId, FormUpdate, IndexEntry};
use crate::report::{header_from_value, ReportInput};
use crate::storage::DeleteOutcome;

const READ_FAILED: &str = "Erro ao ler os dados.";
const LIST_FAILED: &str = "Erro ao listar os formulários.";
const CREATE_FAILED: &str = "Erro ao criar o formulário.";
const SAVE_FAILED: &str = "Erro ao salvar os dados.";
const GENERATE_FAILED: &str = "Erro ao gerar documentos";
const DELETE_FAILED: &str = "Erro ao deletar o formulário.";
const DELETE_FILE_FAILED: &str = "Erro ao excluir arquivo do formulário";
const FORM_NOT_FOUND: &str = "Formulário não encontrado.";
const ARCHIVE_NOT_FOUND: &str = "Arquivo não encontrado";
const INVALID_GENERATE_BODY: &str = "Dados inválidos: sections ou headerData ausentes";
const INDEX_NOT_UPDATED: &str = "Formulário excluído, mas houve erro ao atualizar a lista";

fn parse_id(raw: String) -> Result<FormId, ApiError> {
    FormId::parse(raw).or_api_error(READ_FAILED)
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(format!("Dados inválidos: {rejection}")))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /data/:form_id`
pub async fn get_data(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<FormDocument>, ApiError> {
    let id = parse_id(raw)?;
    let document = state
        .with_store(move |store| store.read(&id))
        .await
        .or_api_error(READ_FAILED)?;
    Ok(Json(document))
}

/// `GET /forms`
pub async fn list_forms(State(state): State<AppState>) -> Result<Json<Vec<IndexEntry>>, ApiError> {
    let forms = state
        .with_store(|store| store.list())
        .await
        .or_api_error(LIST_FAILED)?;
    Ok(Json(forms))
}

/// `POST /createForm`
pub async fn create_form(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let id = state
        .with_store(|store| store.create())
        .await
        .or_api_error(CREATE_FAILED)?;
    Ok(Json(json!({ "formId": id.as_str() })))
}

/// `POST /update/:form_id`
pub async fn update_form(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(raw)?;
    let update: FormUpdate = serde_json::from_value(json_body(body)?)
        .map_err(|e| ApiError::bad_request(format!("Dados inválidos: {e}")))?;

    state
        .with_store(move |store| store.update(&id, update))
        .await
        .or_api_error(SAVE_FAILED)?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /generate/:form_id`
///
/// The top-level `formInfo` of the body is the questionnaire that gets
/// printed; a `formInfo` nested in `sections` is ignored.
pub async fn generate(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(raw)?;
    let body = json_body(body)?;

    let mut input = body
        .get("sections")
        .and_then(ReportInput::from_value)
        .ok_or_else(|| ApiError::bad_request(INVALID_GENERATE_BODY))?;
    let header = body
        .get("headerData")
        .and_then(header_from_value)
        .ok_or_else(|| ApiError::bad_request(INVALID_GENERATE_BODY))?;
    input.form_info = body.get("formInfo").and_then(Value::as_object).cloned();

    if input.compatibility_mode {
        info!("Generating form {} from legacy section keys", id);
    }
    let html = state.assembler.assemble(&input, &header);
    let archive = state
        .exporter
        .generate(&html)
        .await
        .or_api_error(GENERATE_FAILED)?;

    let marked = id.clone();
    if let Err(e) = state
        .with_store(move |store| store.mark_pdf_generated(&marked))
        .await
    {
        error!("Could not mark form {} as generated: {}", id, e);
    }

    Ok(Json(json!({
        "filename": archive.id.to_string(),
        "empresaNome": safe_download_name(&header.empresa),
    })))
}

/// Query of the download route.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// Company name used for the attachment name.
    pub empresa: Option<String>,
}

/// `GET /download/:filename?empresa=NAME`
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let bytes = match state.exporter.take_archive(&filename).await {
        Ok(bytes) => bytes,
        Err(e) if e.is_not_found() => return Err(ApiError::not_found(ARCHIVE_NOT_FOUND)),
        Err(e) => return Err(ApiError::from_error(&e, GENERATE_FAILED)),
    };

    let name = safe_download_name(query.empresa.as_deref().unwrap_or_default());
    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}.zip\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// `DELETE /form/:form_id`
pub async fn delete_form(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(raw)?;
    let outcome = match state.with_store(move |store| store.delete(&id)).await {
        Ok(outcome) => outcome,
        Err(e @ Error::StorageDelete { .. }) => {
            return Err(ApiError::from_error(&e, DELETE_FILE_FAILED))
        }
        Err(e) => return Err(ApiError::from_error(&e, DELETE_FAILED)),
    };

    let response = match outcome {
        DeleteOutcome::Deleted => Json(json!({ "success": true })).into_response(),
        DeleteOutcome::NotFound => return Err(ApiError::not_found(FORM_NOT_FOUND)),
        DeleteOutcome::PartiallyDeleted { reason } => {
            warn!("Partial delete: {}", reason);
            (
                StatusCode::MULTI_STATUS,
                Json(json!({ "warning": INDEX_NOT_UPDATED, "error": reason })),
            )
                .into_response()
        }
    };
    Ok(response)
}
