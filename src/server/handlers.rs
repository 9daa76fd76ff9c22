use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::types::{ImportResponse, MessageResponse};
use super::AppState;
use crate::models::{Contact, ContactMethod, ContactPayload, MethodPayload};
use crate::service::ContactService;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const EXPORT_DISPOSITION: &str = "attachment; filename=contacts_export.xlsx";

const CONTACT_NOT_FOUND: &str = "Contact not found";
const METHOD_NOT_FOUND: &str = "Contact method not found";

type ApiResult<T> = Result<T, ApiError>;

/// Run a storage call on the blocking pool with its own connection.
async fn blocking<T, F>(state: &AppState, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&ContactService) -> T + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || op(&service))
        .await
        .map_err(|e| ApiError::Internal(format!("Worker failed: {}", e)))
}

/// Ids that are not integers match no row.
fn parse_id(raw: &str, missing: &str) -> ApiResult<i64> {
    raw.parse().map_err(|_| ApiError::not_found(missing))
}

/// Empty body and `null` read as an empty payload so the presence check
/// produces the error message.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice::<Option<T>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

// ==================== CONTACTS ====================

pub async fn list_contacts(State(state): State<AppState>) -> ApiResult<Json<Vec<Contact>>> {
    let contacts = blocking(&state, |svc| svc.list_all()).await?;
    Ok(Json(contacts))
}

pub async fn list_favorites(State(state): State<AppState>) -> ApiResult<Json<Vec<Contact>>> {
    let contacts = blocking(&state, |svc| svc.list_favorites()).await?;
    Ok(Json(contacts))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Contact>> {
    let id = parse_id(&id, CONTACT_NOT_FOUND)?;
    blocking(&state, move |svc| svc.get(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(CONTACT_NOT_FOUND))
}

pub async fn create_contact(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let contact = parse_body::<ContactPayload>(&body)?.validate()?;

    blocking(&state, move |svc| svc.create(&contact))
        .await?
        .map(|created| (StatusCode::CREATED, Json(created)))
        .ok_or_else(|| ApiError::Internal("Failed to create contact".into()))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Contact>> {
    let contact = parse_body::<ContactPayload>(&body)?.validate()?;
    let id = parse_id(&id, CONTACT_NOT_FOUND)?;

    blocking(&state, move |svc| svc.update(id, &contact))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Contact not found or update failed"))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id, CONTACT_NOT_FOUND)?;

    if blocking(&state, move |svc| svc.delete(id)).await? {
        Ok(Json(MessageResponse::new("Contact deleted")))
    } else {
        Err(ApiError::not_found("Contact not found or delete failed"))
    }
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Contact>> {
    let id = parse_id(&id, CONTACT_NOT_FOUND)?;
    blocking(&state, move |svc| svc.toggle_favorite(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(CONTACT_NOT_FOUND))
}

// ==================== METHODS ====================

pub async fn list_methods(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ContactMethod>>> {
    let id = parse_id(&id, CONTACT_NOT_FOUND)?;
    let methods = blocking(&state, move |svc| svc.list_methods(id)).await?;
    Ok(Json(methods))
}

pub async fn create_method(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ContactMethod>)> {
    let method = parse_body::<MethodPayload>(&body)?.validate()?;
    let id = parse_id(&id, CONTACT_NOT_FOUND)?;

    blocking(&state, move |svc| svc.create_method(id, &method))
        .await?
        .map(|created| (StatusCode::CREATED, Json(created)))
        .ok_or_else(|| ApiError::Internal("Failed to create contact method".into()))
}

pub async fn update_method(
    State(state): State<AppState>,
    Path(method_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ContactMethod>> {
    let method = parse_body::<MethodPayload>(&body)?.validate()?;
    let method_id = parse_id(&method_id, METHOD_NOT_FOUND)?;

    blocking(&state, move |svc| svc.update_method(method_id, &method))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Contact method not found or update failed"))
}

pub async fn delete_method(
    State(state): State<AppState>,
    Path(method_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let method_id = parse_id(&method_id, METHOD_NOT_FOUND)?;

    if blocking(&state, move |svc| svc.delete_method(method_id)).await? {
        Ok(Json(MessageResponse::new("Contact method deleted")))
    } else {
        Err(ApiError::not_found("Contact method not found or delete failed"))
    }
}

// ==================== SPREADSHEET ====================

pub async fn export_contacts(State(state): State<AppState>) -> ApiResult<Response> {
    let bytes = blocking(&state, |svc| svc.export_workbook())
        .await?
        .map_err(|e| ApiError::Internal(format!("Export failed: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME),
            (header::CONTENT_DISPOSITION, EXPORT_DISPOSITION),
        ],
        bytes,
    )
        .into_response())
}

pub async fn import_contacts(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ImportResponse>> {
    let mut multipart = multipart.map_err(|_| ApiError::BadRequest("No file uploaded".into()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, data));
        break;
    }

    let Some((file_name, data)) = upload else {
        return Err(ApiError::BadRequest("No file uploaded".into()));
    };
    if file_name.is_empty() {
        return Err(ApiError::BadRequest("No file selected".into()));
    }
    if !file_name.to_ascii_lowercase().ends_with(".xlsx") {
        return Err(ApiError::BadRequest("Only .xlsx files are supported".into()));
    }

    tracing::info!(file = %file_name, bytes = data.len(), "Importing spreadsheet");
    let summary = blocking(&state, move |svc| svc.import_workbook(&data))
        .await?
        .map_err(|e| ApiError::Internal(format!("Import failed: {}", e)))?;

    Ok(Json(ImportResponse {
        message: "Contacts imported".to_string(),
        summary,
    }))
}

// ==================== MISC ====================

/// Answers bare OPTIONS requests; CORS preflights are handled by the layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

pub async fn not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(format!("Method {} not allowed", method))
}
