//! Media handlers: multipart upload into the BLOB store, byte download,
//! metadata lookup and owner-only deletion.

use apiseed_core::access::ensure_owner;
use apiseed_core::media::{Upload, delete_media, save_upload};
use apiseed_core::models::media::Media;
use apiseed_core::uuid::parse_id;
use axum::extract::{Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::MediaResponse;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "mediaFile";

/// Form field that also sets the record's `type`.
const TYPE_FIELD: &str = "type";

/// Form field never stored as metadata.
const TOKEN_FIELD: &str = "token";

const DEFAULT_MIMETYPE: &str = "application/octet-stream";

fn media_id(raw: &str) -> AppResult<Uuid> {
    parse_id(raw).ok_or_else(|| AppError::NotFound("Media file not found".into()))
}

async fn load_media(state: &AppState, id: Uuid) -> AppResult<Media> {
    state
        .stores
        .media
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Media file not found".into()))
}

/// `inline` disposition with quotes, backslashes and control characters
/// replaced so any stored filename yields a valid header value.
fn inline_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c == '"' || c == '\\' || c.is_ascii_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("inline; filename=\"{safe}\"")
}

/// `GET /media`
pub async fn list_media_handler(State(state): State<AppState>) -> AppResult<Json<Vec<Media>>> {
    Ok(Json(state.stores.media.list().await?))
}

/// `GET /media/{id}`: the stored bytes with their content type.
pub async fn get_media_file_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let media = load_media(&state, media_id(&id)?).await?;
    let blob = state
        .stores
        .blobs
        .get(media.blob_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Media file content not found".into()))?;

    Ok((
        [
            (CONTENT_TYPE, blob.content_type),
            (CONTENT_DISPOSITION, inline_disposition(&media.originalname)),
        ],
        blob.data,
    )
        .into_response())
}

/// `GET /media/metadata/{id}`: the form fields submitted with the upload.
pub async fn get_media_metadata_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let media = load_media(&state, media_id(&id)?).await?;
    Ok(Json(media.metadata))
}

/// `POST /media`: multipart upload with the file in `mediaFile`. Every other
/// text field is kept as metadata.
pub async fn upload_media_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> AppResult<Json<MediaResponse>> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut metadata = Map::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == FILE_FIELD {
            let originalname = field.file_name().unwrap_or("upload").to_string();
            let mimetype = field.content_type().unwrap_or(DEFAULT_MIMETYPE).to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read {FILE_FIELD}: {e}")))?;
            file = Some((originalname, mimetype, data.to_vec()));
        } else if name != TOKEN_FIELD {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read field {name}: {e}")))?;
            metadata.insert(name, Value::String(value));
        }
    }

    let (originalname, mimetype, data) =
        file.ok_or_else(|| AppError::Validation(format!("No {FILE_FIELD} was uploaded")))?;
    let media_type = metadata
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string);

    let media = save_upload(
        state.stores.media.as_ref(),
        state.stores.blobs.as_ref(),
        Upload {
            owner: user.id,
            originalname,
            mimetype,
            data,
            media_type,
            metadata: Value::Object(metadata),
        },
        &state.config.public_host,
    )
    .await?;

    Ok(Json(MediaResponse {
        status: "Mediafile saved!".into(),
        success: true,
        media,
    }))
}

/// `DELETE /media/{id}`: owner only. Removes the record and its bytes.
pub async fn delete_media_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<String> {
    let id = media_id(&id)?;
    ensure_owner(&load_media(&state, id).await?, user.id)?;

    let media = delete_media(state.stores.media.as_ref(), state.stores.blobs.as_ref(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Media file not found".into()))?;
    info!(id = %media.id, "media deleted");
    Ok(format!("Deleted mediafile with the id: {}", media.id))
}
