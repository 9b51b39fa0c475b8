use feedchat_core::{FetchError, ImageFile, SubmitError};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

mod common;
use common::{Services, TEST_TOKEN};

fn body_text(request: &wiremock::Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}

async fn mock_feed(services: &Services, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&services.feed)
        .await;
}

#[tokio::test]
async fn test_load_feed_makes_media_urls_absolute() {
    let services = Services::start().await;
    mock_feed(
        &services,
        json!([
            {"username": "nasa", "image": "/media/x.jpg", "caption": "Exploring the cosmos!", "timestamp": "2024-05-01 10:00:00"},
            {"username": "isro", "image": "http://cdn/x.jpg", "caption": "Indian space achievements!"}
        ]),
    )
    .await;
    let mut shell = services.logged_in_shell();
    let (workspace, clients) = shell.parts_mut().unwrap();

    let posts = workspace.feed.load_feed(clients.feed()).await.unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].media_url, format!("{}/media/x.jpg", services.feed.uri()));
    assert_eq!(posts[0].author, "nasa");
    assert_eq!(posts[0].posted_at.as_deref(), Some("2024-05-01 10:00:00"));
    assert_eq!(posts[1].media_url, "http://cdn/x.jpg");
    assert_eq!(posts[1].posted_at, None);
    assert_eq!(workspace.feed.posts(), posts.as_slice());
}

#[tokio::test]
async fn test_failed_load_keeps_displayed_feed() {
    let services = Services::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"username": "nasa", "image": "/static/nasa.png", "caption": "cosmos"}
        ])))
        .up_to_n_times(1)
        .mount(&services.feed)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"})))
        .mount(&services.feed)
        .await;
    let mut shell = services.logged_in_shell();
    let (workspace, clients) = shell.parts_mut().unwrap();

    workspace.feed.load_feed(clients.feed()).await.unwrap();
    let err = workspace.feed.load_feed(clients.feed()).await.unwrap_err();

    assert!(matches!(err, FetchError::Status(status) if status.as_u16() == 401));
    assert_eq!(workspace.feed.posts().len(), 1);
    assert_eq!(workspace.feed.posts()[0].author, "nasa");
}

#[tokio::test]
async fn test_non_list_feed_is_a_decode_error() {
    let services = Services::start().await;
    mock_feed(&services, json!({"posts": []})).await;
    let mut shell = services.logged_in_shell();
    let (workspace, clients) = shell.parts_mut().unwrap();

    let err = workspace.feed.load_feed(clients.feed()).await.unwrap_err();

    assert!(matches!(err, FetchError::Decode(_)));
    assert!(workspace.feed.posts().is_empty());
}

#[tokio::test]
async fn test_submit_empty_draft_sends_caption_only_and_refreshes() {
    let services = Services::start().await;
    Mock::given(method("POST"))
        .and(path("/post"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Post created successfully"})))
        .expect(1)
        .mount(&services.feed)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"username": "admin", "image": "/static/admin.png", "caption": ""}
        ])))
        .expect(1)
        .mount(&services.feed)
        .await;
    let mut shell = services.logged_in_shell();
    let (workspace, clients) = shell.parts_mut().unwrap();

    workspace.feed.submit_post(clients.feed()).await.unwrap();

    assert!(workspace.feed.draft().is_empty());
    assert_eq!(workspace.feed.posts().len(), 1);

    let requests = services.feed.received_requests().await.unwrap();
    let post = requests.iter().find(|r| r.url.path() == "/post").unwrap();
    let content_type = post.headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = body_text(post);
    assert!(body.contains("name=\"caption\""));
    assert!(!body.contains("name=\"image\""));
}

#[tokio::test]
async fn test_submit_with_image_uploads_file_part() {
    let services = Services::start().await;
    Mock::given(method("POST"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&services.feed)
        .await;
    mock_feed(&services, json!([])).await;

    let dir = TempDir::new().unwrap();
    let image_path = dir.path().join("sunset.png");
    std::fs::write(&image_path, b"PNGDATA").unwrap();

    let mut shell = services.logged_in_shell();
    let (workspace, clients) = shell.parts_mut().unwrap();
    let draft = workspace.feed.draft_mut();
    draft.caption = "Golden hour".to_string();
    draft.image = Some(ImageFile::from_path(&image_path).unwrap());

    workspace.feed.submit_post(clients.feed()).await.unwrap();

    let requests = services.feed.received_requests().await.unwrap();
    let post = requests.iter().find(|r| r.url.path() == "/post").unwrap();
    let body = body_text(post);
    assert!(body.contains("name=\"image\"; filename=\"sunset.png\""));
    assert!(body.contains("Content-Type: image/png"));
    assert!(body.contains("PNGDATA"));
    assert!(body.contains("Golden hour"));
    assert!(workspace.feed.draft().is_empty());
}

#[tokio::test]
async fn test_failed_submit_keeps_draft_and_skips_refresh() {
    let services = Services::start().await;
    Mock::given(method("POST"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&services.feed)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&services.feed)
        .await;
    let mut shell = services.logged_in_shell();
    let (workspace, clients) = shell.parts_mut().unwrap();
    workspace.feed.draft_mut().caption = "keep me".to_string();

    let err = workspace.feed.submit_post(clients.feed()).await.unwrap_err();

    assert!(matches!(err, SubmitError::Status(status) if status.as_u16() == 422));
    assert_eq!(workspace.feed.draft().caption, "keep me");
}

#[tokio::test]
async fn test_unreadable_image_keeps_draft() {
    let services = Services::start().await;
    Mock::given(method("POST"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&services.feed)
        .await;
    let dir = TempDir::new().unwrap();
    let missing = ImageFile::from_path(dir.path().join("missing.jpg")).unwrap();

    let mut shell = services.logged_in_shell();
    let (workspace, clients) = shell.parts_mut().unwrap();
    workspace.feed.draft_mut().image = Some(missing.clone());

    let err = workspace.feed.submit_post(clients.feed()).await.unwrap_err();

    assert!(matches!(err, SubmitError::Image { .. }));
    assert_eq!(workspace.feed.draft().image.as_ref(), Some(&missing));
}
