use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::path::AppPath;
use crate::extractors::session::Session;
use crate::files::{TempFileRecord, UploadedFile};
use crate::models::file::FileResponse;
use crate::state::AppState;
use crate::utils::filename::validate_flat_filename;
use crate::utils::response::{Disposition, file_response};

/// Multipart framing allowance on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn upload_body_limit(max_size: u64) -> DefaultBodyLimit {
    let limit = max_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Temp Files",
    operation_id = "uploadTempFile",
    summary = "Stage an upload",
    description = "Stores the `file` multipart field on the temp disk, scoped to the caller's \
        session. A caller without a session cookie is issued one.",
    request_body(content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 201, description = "File staged", body = FileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, session, jar, multipart), fields(session = %session.id))]
pub async fn upload_temp_file(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let max_size = state.config.upload.max_size;
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue; // Ignore unknown fields.
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
        let filename = validate_flat_filename(&filename)
            .map_err(|e| AppError::Validation(e.message().into()))?
            .to_string();

        upload = Some(UploadedFile {
            contents: read_field(field, max_size).await?,
            original_name: filename,
        });
    }

    let upload = upload.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let record = TempFileRecord::stage(&state.db, &state.files, upload.into(), &session.id).await?;
    let body = FileResponse::from_record(&record, &state.files).await?;

    Ok((StatusCode::CREATED, session.persist(jar), Json(body)))
}

#[utoipa::path(
    get,
    path = "/{id}/{name}",
    tag = "Temp Files",
    operation_id = "showTempFile",
    summary = "Fetch a staged upload",
    description = "Streams a staged file. Only the session that uploaded it can fetch it; \
        any mismatch of id, name or session is reported as not found.",
    params(
        ("id" = i32, Path, description = "Temp file ID"),
        ("name" = String, Path, description = "Display filename"),
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, session), fields(session = %session.id))]
pub async fn show_temp_file(
    State(state): State<AppState>,
    session: Session,
    AppPath((id, name)): AppPath<(i32, String)>,
) -> Result<Response, AppError> {
    let record = TempFileRecord::find_for_session(&state.db, id, &name, &session.id).await?;
    file_response(&record, &state.files, Disposition::Inline, None, &HeaderMap::new()).await
}

/// Buffer a multipart field, refusing anything larger than `max_size`.
async fn read_field(mut field: Field<'_>, max_size: u64) -> Result<Vec<u8>, AppError> {
    let mut contents = Vec::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        if (contents.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds maximum size of {max_size} bytes"
            )));
        }
        contents.extend_from_slice(&chunk);
    }

    Ok(contents)
}
