use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::UploadResponse,
};

/// Largest accepted file, inclusive.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Request body cap for the upload route: the file plus room for multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

pub const UPLOAD_TOO_LARGE: &str = "File size exceeds 10MB limit";

const FILE_PART: &str = "file";
const MAX_EXTENSION_CHARS: usize = 10;

/// Normalises a part's content type (`Text/Plain; charset=utf-8` → `text/plain`)
/// and checks it against the allow-list.
pub fn allowed_mime_type(content_type: &str) -> Option<String> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_MIME_TYPES
        .contains(&essence.as_str())
        .then_some(essence)
}

/// Extension taken from the client's file name, or `bin` when it is missing
/// or not a short alphanumeric token.
pub fn file_extension(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_CHARS
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string())
}

/// `<unix-millis>-<uuid>.<ext>`
pub fn generate_file_name(extension: &str) -> String {
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4(),
        extension
    )
}

/// Skips whatever is left of the body so the client reads the rejection
/// rather than a reset connection. Bounded by the route's body limit.
async fn discard_rest(multipart: &mut Multipart) {
    while let Ok(Some(_)) = multipart.next_field().await {}
}

/// upload_file
///
/// [Authenticated Route] Accepts a single multipart part named `file`, stores
/// it under a random name and returns where it can be fetched from.
///
/// The content type is checked before any file bytes are buffered, and the
/// size limit is enforced while streaming, so an oversized file is rejected as
/// soon as it crosses 10 MiB without holding more than that in memory.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content_type = "multipart/form-data", description = "A `file` part"),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Missing file, too large, or type not allowed"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Write failed")
    )
)]
pub async fn upload_file(
    caller: AuthUser,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart?;

    let rejection = 'parts: loop {
        let Some(mut field) = multipart.next_field().await? else {
            return Err(ApiError::bad_request("No file provided"));
        };
        if field.name() != Some(FILE_PART) {
            continue;
        }

        let Some(file_type) = field.content_type().and_then(allowed_mime_type) else {
            break 'parts "File type not allowed";
        };
        let extension = file_extension(field.file_name());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                tracing::debug!(user_id = %caller.id, "upload rejected: over size limit");
                break 'parts UPLOAD_TOO_LARGE;
            }
            bytes.extend_from_slice(&chunk);
        }

        let file_name = generate_file_name(&extension);
        state.storage.store(&file_name, &bytes).await?;
        tracing::info!(user_id = %caller.id, %file_name, size = bytes.len(), %file_type, "file uploaded");

        return Ok(Json(UploadResponse {
            file_url: state.storage.public_url(&file_name),
            file_name,
            file_size: bytes.len() as u64,
            file_type,
            uploaded_at: Utc::now(),
        }));
    };

    discard_rest(&mut multipart).await;
    Err(ApiError::bad_request(rejection))
}
