use std::sync::{
    Arc, LazyLock,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::future::try_join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::config::CdnConfig;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_DOCUMENT_BYTES: usize = 50 * 1024 * 1024;
/// Default number of images in one article gallery.
pub const GALLERY_CAP: usize = 10;
/// Default number of YouTube videos on one article.
pub const VIDEO_CAP: usize = 5;

/// Folder used when the client does not name one.
pub const DEFAULT_FOLDER: &str = "site";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("The file is empty")]
    EmptyFile,

    #[error("The file exceeds the {limit_mb} MB limit")]
    FileTooLarge { limit_mb: usize },

    #[error("Unsupported file type `{0}`, an image is expected")]
    UnsupportedType(String),

    #[error("The gallery is limited to {cap} images")]
    GalleryFull { cap: usize },

    #[error("Not a recognised YouTube link")]
    InvalidVideoUrl,

    #[error("This video has already been added")]
    DuplicateVideo,

    #[error("At most {cap} videos can be attached")]
    VideoLimit { cap: usize },

    #[error("The media CDN is not configured")]
    NotConfigured,

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Upload service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl MediaError {
    /// True for errors raised before any network call.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            MediaError::NotConfigured | MediaError::Upload(_) | MediaError::Transport(_)
        )
    }
}

/// UploadKind
///
/// Selects the CDN resource type: images go through the image pipeline, documents
/// are stored untouched as raw files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Document,
}

impl UploadKind {
    pub fn resource_type(&self) -> &'static str {
        match self {
            UploadKind::Image => "image",
            UploadKind::Document => "raw",
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            UploadKind::Image => MAX_IMAGE_BYTES,
            UploadKind::Document => MAX_DOCUMENT_BYTES,
        }
    }
}

/// MediaLimits
///
/// Per-article caps on attached media, shared by the upload adapter and the news
/// validation so both enforce the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaLimits {
    pub gallery_cap: usize,
    pub video_cap: usize,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            gallery_cap: GALLERY_CAP,
            video_cap: VIDEO_CAP,
        }
    }
}

/// A file received from the admin client, held in memory for a single upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// What the CDN reports back for a stored file.
#[derive(Debug, Clone, Deserialize)]
pub struct CdnAsset {
    pub secure_url: String,
    pub public_id: String,
    #[serde(default)]
    pub bytes: u64,
}

/// UploadedMedia
///
/// Response of a single-file upload. `size` is only reported for documents.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// YoutubeVideo
///
/// A validated YouTube link with its derived thumbnail. No network call is involved.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct YoutubeVideo {
    pub url: String,
    pub video_id: String,
    pub thumbnail_url: String,
}

/// CdnClient Trait
///
/// One multipart upload to the media CDN. Swappable for `MockCdnClient` in tests.
#[async_trait]
pub trait CdnClient: Send + Sync {
    async fn upload(
        &self,
        kind: UploadKind,
        folder: &str,
        file: UploadFile,
    ) -> Result<CdnAsset, MediaError>;
}

pub type CdnState = Arc<dyn CdnClient>;

/// sanitize_folder
///
/// Removes empty, `.` and `..` segments and anything outside `[A-Za-z0-9_-]` from a
/// client-supplied folder label, so it cannot escape the project's upload tree.
pub fn sanitize_folder(folder: &str) -> String {
    let cleaned = folder
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .map(|segment| {
            segment
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if cleaned.is_empty() {
        DEFAULT_FOLDER.to_string()
    } else {
        cleaned
    }
}

// --- Cloudinary implementation ---

/// CloudinaryClient
///
/// Unsigned uploads to `https://api.cloudinary.com/v1_1/<cloud>/<resource>/upload`
/// using the configured upload preset.
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CdnConfig,
    base_url: String,
}

#[derive(Deserialize)]
struct CloudinaryError {
    error: CloudinaryErrorBody,
}

#[derive(Deserialize)]
struct CloudinaryErrorBody {
    message: String,
}

impl CloudinaryClient {
    pub fn new(config: CdnConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
        }
    }
}

#[async_trait]
impl CdnClient for CloudinaryClient {
    async fn upload(
        &self,
        kind: UploadKind,
        folder: &str,
        file: UploadFile,
    ) -> Result<CdnAsset, MediaError> {
        let url = format!(
            "{}/{}/{}/upload",
            self.base_url,
            self.config.cloud_name,
            kind.resource_type()
        );

        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.config.upload_preset.clone())
            .text("folder", folder.to_string());

        let response = self.http.post(&url).multipart(form).send().await?;

        if response.status().is_success() {
            Ok(response.json::<CdnAsset>().await?)
        } else {
            let status = response.status();
            let message = match response.json::<CloudinaryError>().await {
                Ok(body) => body.error.message,
                Err(_) => status.to_string(),
            };
            Err(MediaError::Upload(message))
        }
    }
}

// --- Mock implementation (tests) ---

/// MockCdnClient
///
/// Records every upload it receives and answers with a deterministic URL. Can be told
/// to fail every call, or only the call for one file name.
#[derive(Default)]
pub struct MockCdnClient {
    pub should_fail: bool,
    pub fail_file: Option<String>,
    calls: AtomicUsize,
}

impl MockCdnClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn failing_on(file_name: &str) -> Self {
        Self {
            fail_file: Some(file_name.to_string()),
            ..Self::default()
        }
    }

    /// Number of uploads that reached the CDN, successful or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CdnClient for MockCdnClient {
    async fn upload(
        &self,
        kind: UploadKind,
        folder: &str,
        file: UploadFile,
    ) -> Result<CdnAsset, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.should_fail || self.fail_file.as_deref() == Some(file.file_name.as_str()) {
            return Err(MediaError::Upload("Mock CDN error: simulation requested".to_string()));
        }

        let public_id = format!("{folder}/{}", file.file_name);
        Ok(CdnAsset {
            secure_url: format!(
                "https://res.cloudinary.com/mock/{}/upload/{public_id}",
                kind.resource_type()
            ),
            public_id,
            bytes: file.bytes.len() as u64,
        })
    }
}

// --- Upload adapter ---

/// MediaService
///
/// Validates files locally, then hands them to the CDN. Validation failures never
/// reach the network. Without a CDN every upload fails with `NotConfigured`.
#[derive(Clone)]
pub struct MediaService {
    cdn: Option<CdnState>,
    limits: MediaLimits,
}

impl MediaService {
    pub fn new(cdn: Option<CdnState>) -> Self {
        Self {
            cdn,
            limits: MediaLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: MediaLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> MediaLimits {
        self.limits
    }

    pub fn from_config(config: Option<&CdnConfig>) -> Self {
        Self::new(config.map(|c| Arc::new(CloudinaryClient::new(c.clone())) as CdnState))
    }

    fn cdn(&self) -> Result<&CdnState, MediaError> {
        self.cdn.as_ref().ok_or(MediaError::NotConfigured)
    }

    pub fn validate(kind: UploadKind, file: &UploadFile) -> Result<(), MediaError> {
        if file.bytes.is_empty() {
            return Err(MediaError::EmptyFile);
        }
        if file.bytes.len() > kind.max_bytes() {
            return Err(MediaError::FileTooLarge {
                limit_mb: kind.max_bytes() / (1024 * 1024),
            });
        }
        if kind == UploadKind::Image && !file.content_type.starts_with("image/") {
            return Err(MediaError::UnsupportedType(file.content_type.clone()));
        }
        Ok(())
    }

    pub async fn upload_image(
        &self,
        folder: &str,
        file: UploadFile,
    ) -> Result<UploadedMedia, MediaError> {
        Self::validate(UploadKind::Image, &file)?;
        let asset = self.send(UploadKind::Image, folder, file).await?;
        Ok(UploadedMedia {
            url: asset.secure_url,
            public_id: asset.public_id,
            size: None,
        })
    }

    pub async fn upload_document(
        &self,
        folder: &str,
        file: UploadFile,
    ) -> Result<UploadedMedia, MediaError> {
        Self::validate(UploadKind::Document, &file)?;
        let local_size = file.bytes.len() as u64;
        let asset = self.send(UploadKind::Document, folder, file).await?;
        Ok(UploadedMedia {
            url: asset.secure_url,
            public_id: asset.public_id,
            size: Some(if asset.bytes > 0 { asset.bytes } else { local_size }),
        })
    }

    /// upload_gallery
    ///
    /// Uploads a batch of images concurrently and returns `existing` with the new URLs
    /// appended in input order. The batch is refused up front if it would push the
    /// gallery past the configured cap; if any upload fails, nothing is appended.
    pub async fn upload_gallery(
        &self,
        folder: &str,
        existing: Vec<String>,
        files: Vec<UploadFile>,
    ) -> Result<Vec<String>, MediaError> {
        if files.is_empty() {
            return Ok(existing);
        }
        let cap = self.limits.gallery_cap;
        if existing.len() + files.len() > cap {
            return Err(MediaError::GalleryFull { cap });
        }
        for file in &files {
            Self::validate(UploadKind::Image, file)?;
        }

        let cdn = self.cdn()?;
        let folder = sanitize_folder(folder);
        let uploads = files
            .into_iter()
            .map(|file| cdn.upload(UploadKind::Image, &folder, file));
        let assets = try_join_all(uploads).await?;

        tracing::info!(count = assets.len(), folder = %folder, "gallery batch uploaded");

        let mut gallery = existing;
        gallery.extend(assets.into_iter().map(|asset| asset.secure_url));
        Ok(gallery)
    }

    /// `add_youtube_video` with the configured video cap.
    pub fn add_youtube(
        &self,
        existing: &[String],
        input: &str,
    ) -> Result<YoutubeVideo, MediaError> {
        add_youtube_video(existing, input, self.limits.video_cap)
    }

    async fn send(
        &self,
        kind: UploadKind,
        folder: &str,
        file: UploadFile,
    ) -> Result<CdnAsset, MediaError> {
        let cdn = self.cdn()?;
        let folder = sanitize_folder(folder);
        let file_name = file.file_name.clone();
        let asset = cdn.upload(kind, &folder, file).await?;
        tracing::info!(
            file = %file_name,
            folder = %folder,
            url = %asset.secure_url,
            "media uploaded"
        );
        Ok(asset)
    }
}

// --- YouTube ---

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:https?://)?(?:www\.|m\.)?",
        r"(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|live/|v/)",
        r"|youtube-nocookie\.com/embed/|youtu\.be/)",
        r"([A-Za-z0-9_-]{11})(?:[?&#/].*)?$",
    ))
    .expect("YouTube URL pattern is valid")
});

/// youtube_id
///
/// Extracts the 11-character video id from the watch, short, embed, shorts and
/// live URL shapes. Anything else is `None`.
pub fn youtube_id(input: &str) -> Option<String> {
    YOUTUBE_URL
        .captures(input.trim())
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

pub fn youtube_thumbnail(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg")
}

/// add_youtube_video
///
/// Validates `input` against the videos already attached: refuses once `cap` is
/// reached, refuses unrecognised links and refuses a video already present
/// (compared by id, whatever the URL shape).
pub fn add_youtube_video(
    existing: &[String],
    input: &str,
    cap: usize,
) -> Result<YoutubeVideo, MediaError> {
    if existing.len() >= cap {
        return Err(MediaError::VideoLimit { cap });
    }

    let video_id = youtube_id(input).ok_or(MediaError::InvalidVideoUrl)?;

    if existing
        .iter()
        .any(|url| {
            youtube_id(url).as_deref() == Some(video_id.as_str()) || url.trim() == input.trim()
        })
    {
        return Err(MediaError::DuplicateVideo);
    }

    Ok(YoutubeVideo {
        url: format!("https://www.youtube.com/watch?v={video_id}"),
        thumbnail_url: youtube_thumbnail(&video_id),
        video_id,
    })
}
