use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    AppState,
    error::{AppError, Result},
    media::{DEFAULT_FOLDER, UploadFile, UploadedMedia, YoutubeVideo},
    session::{Section, SessionUser},
};

/// GalleryResponse
///
/// The gallery after the batch was appended.
#[derive(Debug, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GalleryResponse {
    pub gallery: Vec<String>,
    pub added: usize,
}

#[derive(Debug, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct YoutubeRequest {
    pub url: String,
    /// Video URLs already attached to the article.
    #[serde(default)]
    pub existing: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct YoutubeResponse {
    pub video: YoutubeVideo,
    pub videos: Vec<String>,
}

/// Fields of an upload form: files under `file`/`files`, plus `folder` and, for
/// galleries, the current URLs as repeated `existing` fields.
#[derive(Default)]
struct UploadForm {
    files: Vec<UploadFile>,
    folder: Option<String>,
    existing: Vec<String>,
}

impl UploadForm {
    fn folder(&self) -> &str {
        self.folder.as_deref().unwrap_or(DEFAULT_FOLDER)
    }

    fn single_file(mut self) -> Result<(UploadFile, String)> {
        let folder = self.folder().to_string();
        match self.files.len() {
            0 => Err(AppError::field("file", "Choose a file to upload")),
            1 => Ok((self.files.remove(0), folder)),
            _ => Err(AppError::field("file", "Only one file can be uploaded here")),
        }
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    tracing::debug!(error = %e, "multipart body rejected");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(e.body_text());
    }
    AppError::field("file", e.body_text())
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "files" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.files.push(UploadFile::new(file_name, content_type, bytes));
            }
            "folder" => form.folder = Some(field.text().await.map_err(multipart_error)?),
            "existing" => {
                let url = field.text().await.map_err(multipart_error)?;
                if !url.trim().is_empty() {
                    form.existing.push(url);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// upload_image
///
/// [Admin Route] One image (≤ 10 MB, `image/*`) to the CDN.
#[utoipa::path(
    post,
    path = "/admin/api/uploads/image",
    request_body(
        content_type = "multipart/form-data",
        description = "`file` and optional `folder`"
    ),
    responses(
        (status = 200, description = "Uploaded", body = UploadedMedia),
        (status = 400, description = "Too large or not an image"),
        (status = 502, description = "CDN failure")
    )
)]
pub async fn upload_image(
    user: SessionUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadedMedia>> {
    user.require(Section::Media)?;
    let (file, folder) = read_form(multipart).await?.single_file()?;
    Ok(Json(state.media.upload_image(&folder, file).await?))
}

/// upload_document
///
/// [Admin Route] One document (≤ 50 MB, any type) to the CDN; reports its size.
#[utoipa::path(
    post,
    path = "/admin/api/uploads/document",
    request_body(
        content_type = "multipart/form-data",
        description = "`file` and optional `folder`"
    ),
    responses(
        (status = 200, description = "Uploaded", body = UploadedMedia),
        (status = 400, description = "Too large"),
        (status = 502, description = "CDN failure")
    )
)]
pub async fn upload_document(
    user: SessionUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadedMedia>> {
    user.require(Section::Media)?;
    let (file, folder) = read_form(multipart).await?.single_file()?;
    Ok(Json(state.media.upload_document(&folder, file).await?))
}

/// upload_gallery
///
/// [Admin Route] A batch of images uploaded concurrently and appended to the
/// `existing` list. All or nothing.
#[utoipa::path(
    post,
    path = "/admin/api/uploads/gallery",
    request_body(
        content_type = "multipart/form-data",
        description = "`files`, `existing` and optional `folder`"
    ),
    responses(
        (status = 200, description = "Gallery updated", body = GalleryResponse),
        (status = 400, description = "Gallery full or invalid image"),
        (status = 413, description = "Batch larger than the request limit"),
        (status = 502, description = "CDN failure, nothing appended")
    )
)]
pub async fn upload_gallery(
    user: SessionUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GalleryResponse>> {
    user.require(Section::Media)?;
    let form = read_form(multipart).await?;
    let folder = form.folder().to_string();
    let before = form.existing.len();

    let gallery = state
        .media
        .upload_gallery(&folder, form.existing, form.files)
        .await?;

    Ok(Json(GalleryResponse {
        added: gallery.len() - before,
        gallery,
    }))
}

/// add_youtube
///
/// [Admin Route] Validates a YouTube link against the already attached videos and
/// returns the new list. No network call.
#[utoipa::path(
    post,
    path = "/admin/api/videos/youtube",
    request_body = YoutubeRequest,
    responses(
        (status = 200, description = "Video accepted", body = YoutubeResponse),
        (status = 400, description = "Invalid, duplicate or over the limit")
    )
)]
pub async fn add_youtube(
    user: SessionUser,
    State(state): State<AppState>,
    Json(payload): Json<YoutubeRequest>,
) -> Result<Json<YoutubeResponse>> {
    user.require(Section::Media)?;
    let video = state.media.add_youtube(&payload.existing, &payload.url)?;

    let mut videos = payload.existing;
    videos.push(video.url.clone());
    Ok(Json(YoutubeResponse { video, videos }))
}
