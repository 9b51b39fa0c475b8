//! Feed listing and post creation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{FetchError, SubmitError};
use crate::services::{FeedItem, FeedService};

/// A file on disk staged as the image of a new post. The bytes are read
/// when the post is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    path: PathBuf,
    file_name: String,
    mime: &'static str,
}

impl ImageFile {
    /// Accepts only image file types, judged by extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, SubmitError> {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let mime = image_mime(&extension)
            .ok_or_else(|| SubmitError::UnsupportedImage(path.display().to_string()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        Ok(Self {
            path,
            file_name,
            mime,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }
}

fn image_mime(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// The not-yet-submitted post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftPost {
    pub image: Option<ImageFile>,
    pub caption: String,
}

impl DraftPost {
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.caption.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A feed entry ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPost {
    pub author: String,
    pub media_url: String,
    pub caption: String,
    pub posted_at: Option<String>,
}

impl FeedPost {
    pub fn from_item(item: FeedItem, base_url: &str) -> Self {
        Self {
            media_url: absolute_media_url(base_url, &item.image),
            author: item.username,
            caption: item.caption,
            posted_at: item.timestamp,
        }
    }
}

/// Locators already starting with `http` are kept; anything else is resolved
/// against the feed service base address.
pub fn absolute_media_url(base_url: &str, locator: &str) -> String {
    if locator.starts_with("http") {
        locator.to_string()
    } else if locator.starts_with('/') {
        format!("{base_url}{locator}")
    } else {
        format!("{base_url}/{locator}")
    }
}

/// Identifies one feed refresh. Later refreshes carry larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FeedTicket(u64);

/// Snapshot of the draft handed to the service.
#[derive(Debug, Clone)]
pub struct PostRequest {
    pub caption: String,
    pub image: Option<ImageFile>,
}

pub struct FeedController {
    base_url: String,
    posts: Vec<FeedPost>,
    draft: DraftPost,
    issued: u64,
    applied: Option<FeedTicket>,
}

impl FeedController {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            posts: Vec::new(),
            draft: DraftPost::default(),
            issued: 0,
            applied: None,
        }
    }

    pub fn posts(&self) -> &[FeedPost] {
        &self.posts
    }

    pub fn draft(&self) -> &DraftPost {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut DraftPost {
        &mut self.draft
    }

    pub fn begin_load(&mut self) -> FeedTicket {
        self.issued += 1;
        FeedTicket(self.issued)
    }

    /// Replaces the displayed posts with a fetched listing. Failures and
    /// responses older than the last applied one leave the posts untouched.
    pub fn apply_load(
        &mut self,
        ticket: FeedTicket,
        result: Result<Vec<FeedItem>, FetchError>,
    ) -> Result<Vec<FeedPost>, FetchError> {
        let items = result.map_err(|e| {
            warn!(error = %e, "Error fetching posts");
            e
        })?;

        if self.applied.is_some_and(|applied| ticket < applied) {
            debug!(?ticket, applied = ?self.applied, "Discarding stale feed response");
            return Err(FetchError::Superseded);
        }

        let posts: Vec<FeedPost> = items
            .into_iter()
            .map(|item| FeedPost::from_item(item, &self.base_url))
            .collect();
        self.posts = posts.clone();
        self.applied = Some(ticket);
        Ok(posts)
    }

    pub fn begin_submit(&self) -> PostRequest {
        PostRequest {
            caption: self.draft.caption.clone(),
            image: self.draft.image.clone(),
        }
    }

    /// On success the submitted fields are reset; anything edited since
    /// `request` was taken is kept. On failure the draft is kept for a retry.
    pub fn finish_submit(
        &mut self,
        request: &PostRequest,
        result: Result<(), SubmitError>,
    ) -> Result<(), SubmitError> {
        match result {
            Ok(()) => {
                info!("Post created");
                if self.draft.caption == request.caption {
                    self.draft.caption.clear();
                }
                if self.draft.image == request.image {
                    self.draft.image = None;
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Error creating post");
                Err(e)
            }
        }
    }

    pub async fn load_feed(&mut self, service: &FeedService) -> Result<Vec<FeedPost>, FetchError> {
        let ticket = self.begin_load();
        let result = service.fetch_feed().await;
        self.apply_load(ticket, result)
    }

    /// Sends the draft and, once it is accepted, refreshes the feed. A failed
    /// refresh is logged but does not fail the submission.
    pub async fn submit_post(&mut self, service: &FeedService) -> Result<(), SubmitError> {
        let request = self.begin_submit();
        let result = service
            .create_post(&request.caption, request.image.as_ref())
            .await;
        self.finish_submit(&request, result)?;
        self.load_feed(service).await.ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(username: &str, image: &str) -> FeedItem {
        FeedItem {
            username: username.to_string(),
            image: image.to_string(),
            caption: format!("{username} caption"),
            timestamp: None,
        }
    }

    #[test]
    fn test_root_relative_media_is_prefixed() {
        assert_eq!(
            absolute_media_url("http://localhost:8000", "/media/x.jpg"),
            "http://localhost:8000/media/x.jpg"
        );
    }

    #[test]
    fn test_absolute_media_is_unchanged() {
        assert_eq!(
            absolute_media_url("http://localhost:8000", "http://cdn/x.jpg"),
            "http://cdn/x.jpg"
        );
        assert_eq!(
            absolute_media_url("http://localhost:8000", "https://cdn/x.jpg"),
            "https://cdn/x.jpg"
        );
    }

    #[test]
    fn test_bare_relative_media_gets_a_separator() {
        assert_eq!(
            absolute_media_url("http://localhost:8000", "static/x.png"),
            "http://localhost:8000/static/x.png"
        );
    }

    #[test]
    fn test_apply_load_replaces_posts() {
        let mut feed = FeedController::new("http://localhost:8000/");
        let ticket = feed.begin_load();
        let posts = feed
            .apply_load(ticket, Ok(vec![item("nasa", "/static/nasa.png")]))
            .unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(feed.posts()[0].media_url, "http://localhost:8000/static/nasa.png");
        assert_eq!(feed.posts()[0].author, "nasa");

        let ticket = feed.begin_load();
        feed.apply_load(ticket, Ok(vec![item("isro", "/static/isro.png")]))
            .unwrap();
        assert_eq!(feed.posts().len(), 1);
        assert_eq!(feed.posts()[0].author, "isro");
    }

    #[test]
    fn test_failed_load_keeps_previous_posts() {
        let mut feed = FeedController::new("http://localhost:8000");
        let ticket = feed.begin_load();
        feed.apply_load(ticket, Ok(vec![item("nasa", "/static/nasa.png")]))
            .unwrap();

        let ticket = feed.begin_load();
        let result = feed.apply_load(
            ticket,
            Err(FetchError::Status(reqwest::StatusCode::UNAUTHORIZED)),
        );
        assert!(result.is_err());
        assert_eq!(feed.posts().len(), 1);
        assert_eq!(feed.posts()[0].author, "nasa");
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut feed = FeedController::new("http://localhost:8000");
        let first = feed.begin_load();
        let second = feed.begin_load();

        feed.apply_load(second, Ok(vec![item("newer", "/n.png")]))
            .unwrap();
        let result = feed.apply_load(first, Ok(vec![item("older", "/o.png")]));

        assert!(matches!(result, Err(FetchError::Superseded)));
        assert_eq!(feed.posts()[0].author, "newer");
    }

    #[test]
    fn test_out_of_order_but_newer_still_applies() {
        let mut feed = FeedController::new("http://localhost:8000");
        let first = feed.begin_load();
        let second = feed.begin_load();

        feed.apply_load(first, Ok(vec![item("older", "/o.png")]))
            .unwrap();
        feed.apply_load(second, Ok(vec![item("newer", "/n.png")]))
            .unwrap();

        assert_eq!(feed.posts()[0].author, "newer");
    }

    #[test]
    fn test_finish_submit_resets_only_on_success() {
        let mut feed = FeedController::new("http://localhost:8000");
        feed.draft_mut().caption = "sunset".to_string();

        let request = feed.begin_submit();

        let result = feed.finish_submit(
            &request,
            Err(SubmitError::Status(reqwest::StatusCode::UNPROCESSABLE_ENTITY)),
        );
        assert!(result.is_err());
        assert_eq!(feed.draft().caption, "sunset");

        feed.finish_submit(&request, Ok(())).unwrap();
        assert!(feed.draft().is_empty());
    }

    #[test]
    fn test_finish_submit_keeps_edits_made_while_sending() {
        let mut feed = FeedController::new("http://localhost:8000");
        feed.draft_mut().caption = "first".to_string();
        feed.draft_mut().image = Some(ImageFile::from_path("/tmp/first.png").unwrap());
        let request = feed.begin_submit();

        feed.draft_mut().caption = "second".to_string();
        feed.finish_submit(&request, Ok(())).unwrap();

        assert_eq!(feed.draft().caption, "second");
        assert_eq!(feed.draft().image, None);
    }

    #[test]
    fn test_image_file_accepts_images_only() {
        let image = ImageFile::from_path("/tmp/Photo.JPG").unwrap();
        assert_eq!(image.mime(), "image/jpeg");
        assert_eq!(image.file_name(), "Photo.JPG");

        assert!(matches!(
            ImageFile::from_path("/tmp/notes.txt"),
            Err(SubmitError::UnsupportedImage(_))
        ));
        assert!(ImageFile::from_path("/tmp/no_extension").is_err());
    }
}
