#[cfg(test)]
mod tests {
    use crate::{resolve_image_path, Publisher, SocialPublisher};
    use chrono::{Duration, Local};
    use daypost_core::{
        Credentials, GraphApiError, GraphConfig, Platform, PostKind, PostRecord, StorageConfig,
    };
    use post_store::uploads::DUPLICATE_DETECTED;
    use post_store::{PostingLog, UploadTracker};
    use serde_json::json;
    use std::env;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const IMAGE: &[u8] = b"\x89PNG fake image bytes";
    const FB_PHOTO_URL: &str = "https://cdn.example/fb_photo.jpg";
    const UNPUBLISHED_URL: &str = "https://cdn.example/unpublished.jpg";

    #[derive(Debug, Clone)]
    struct SeenRequest {
        method: String,
        path: String,
        query: String,
        body: String,
    }

    impl SeenRequest {
        fn is(&self, method: &str, path: &str) -> bool {
            self.method == method && self.path == path
        }
    }

    /// Canned Graph API on a local port. Every request is recorded.
    struct GraphStub {
        base_url: String,
        seen: Arc<Mutex<Vec<SeenRequest>>>,
    }

    impl GraphStub {
        async fn start<F>(route: F) -> Self
        where
            F: Fn(&SeenRequest) -> (u16, String) + Send + Sync + 'static,
        {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let seen = Arc::new(Mutex::new(Vec::new()));

            let log = seen.clone();
            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let request = read_request(&mut stream).await;
                    let (status, body) = route(&request);
                    log.lock().unwrap().push(request);

                    let response = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });

            Self { base_url, seen }
        }

        fn requests(&self) -> Vec<SeenRequest> {
            self.seen.lock().unwrap().clone()
        }

        fn count(&self, method: &str, path: &str) -> usize {
            self.requests().iter().filter(|r| r.is(method, path)).count()
        }
    }

    async fn read_request(stream: &mut TcpStream) -> SeenRequest {
        let mut raw = Vec::new();
        let mut buf = [0u8; 8192];

        let header_end = loop {
            let n = stream.read(&mut buf).await.unwrap();
            raw.extend_from_slice(&buf[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                break raw.len();
            }
        };

        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let chunked = head
            .to_ascii_lowercase()
            .contains("transfer-encoding: chunked");
        let complete = |raw: &[u8]| {
            if chunked {
                raw.ends_with(b"0\r\n\r\n")
            } else {
                raw.len() >= header_end + content_length
            }
        };

        while !complete(&raw) {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
        }

        let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
        let method = request_line.next().unwrap_or_default().to_string();
        let target = request_line.next().unwrap_or_default();
        let (path, query) = target.split_once('?').unwrap_or((target, ""));

        SeenRequest {
            method,
            path: path.to_string(),
            query: query.to_string(),
            body: String::from_utf8_lossy(&raw[header_end..]).to_string(),
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    struct Behavior {
        page_denied: bool,
        photo_duplicate: bool,
    }

    fn ok(body: serde_json::Value) -> (u16, String) {
        (200, body.to_string())
    }

    fn graph_routes(behavior: Behavior) -> impl Fn(&SeenRequest) -> (u16, String) + Send + Sync {
        move |request| match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/page_1") if request.query.contains("fields=access_token") => {
                ok(json!({ "access_token": "page_token", "id": "page_1" }))
            }
            ("GET", "/page_1") if behavior.page_denied => (
                403,
                json!({ "error": { "message": "(#200) Missing permissions" } }).to_string(),
            ),
            ("GET", "/page_1") => ok(json!({
                "id": "page_1",
                "name": "Fishtown Web Design",
                "category": "Web Designer"
            })),
            ("POST", "/page_1/photos") if request.body.contains("name=\"published\"") => ok(json!({
                "id": "photo_unpublished",
                "images": [{ "source": UNPUBLISHED_URL, "width": 1024 }]
            })),
            ("POST", "/page_1/photos") if behavior.photo_duplicate => (
                400,
                json!({ "error": { "message": "(#506) Duplicate photo" } }).to_string(),
            ),
            ("POST", "/page_1/photos") => ok(json!({ "id": "photo_1", "post_id": "page_1_77" })),
            ("GET", "/photo_1") => ok(json!({
                "images": [{ "source": FB_PHOTO_URL }],
                "picture": "https://cdn.example/thumb.jpg"
            })),
            ("POST", "/page_1/feed") => ok(json!({ "id": "page_1_feed_1" })),
            ("GET", "/ig_1") => ok(json!({
                "id": "ig_1",
                "username": "fishtownweb",
                "media_count": 42
            })),
            ("POST", "/ig_1/media") => ok(json!({ "id": "container_1" })),
            ("POST", "/ig_1/media_publish") => ok(json!({ "id": "ig_media_1" })),
            _ => (
                404,
                json!({ "error": { "message": "unknown endpoint" } }).to_string(),
            ),
        }
    }

    fn credentials(instagram: bool) -> Credentials {
        Credentials {
            openai_api_key: None,
            facebook_token: Some("user_token".to_string()),
            facebook_page_id: Some("page_1".to_string()),
            instagram_account_id: instagram.then(|| "ig_1".to_string()),
        }
    }

    fn graph_config(stub: &GraphStub) -> GraphConfig {
        GraphConfig {
            base_url: stub.base_url.clone(),
            min_post_interval_secs: 0,
            upload_retention_days: 3,
        }
    }

    fn post_with_image(storage: &StorageConfig) -> PostRecord {
        std::fs::create_dir_all(&storage.images_dir).unwrap();
        let path = storage.images_dir.join("seo_tips_20241128_090000_1234.png");
        std::fs::write(&path, IMAGE).unwrap();
        sample_post(Some(path))
    }

    fn cleanup(storage: &StorageConfig) {
        let _ = std::fs::remove_dir_all(storage.data_dir.parent().unwrap());
    }

    fn temp_storage() -> StorageConfig {
        let root = env::temp_dir().join(format!("test_daypost_graph_{}", uuid::Uuid::new_v4()));
        StorageConfig {
            data_dir: root.join("posts"),
            images_dir: root.join("images"),
        }
    }

    fn sample_post(image_path: Option<PathBuf>) -> PostRecord {
        let mut post = PostRecord::new(
            PostKind::Category("seo_tips".to_string()),
            "Page speed is a ranking factor".to_string(),
            vec!["#SEO".to_string()],
        );
        post.image_path = image_path;
        post
    }

    #[tokio::test]
    async fn test_publish_without_credentials_reports_disabled_platforms() {
        let storage = temp_storage();
        let mut publisher =
            SocialPublisher::new(Credentials::default(), &GraphConfig::default(), &storage)
                .unwrap();

        let post = sample_post(None);
        let report = publisher.publish(&post).await.unwrap();

        assert!(!report.overall_success);
        assert_eq!(
            report.platforms[&Platform::Facebook].error.as_deref(),
            Some("Facebook posting is disabled")
        );
        assert_eq!(
            report.platforms[&Platform::Instagram].error.as_deref(),
            Some("Instagram posting is disabled")
        );

        let log = PostingLog::new(storage.posting_log_path());
        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].post_id, post.id);

        let _ = std::fs::remove_dir_all(storage.data_dir.parent().unwrap());
    }

    #[tokio::test]
    async fn test_instagram_reuses_facebook_photo_url() {
        let stub = GraphStub::start(graph_routes(Behavior::default())).await;
        let storage = temp_storage();
        let post = post_with_image(&storage);
        let mut publisher =
            SocialPublisher::new(credentials(true), &graph_config(&stub), &storage).unwrap();

        let report = publisher.publish(&post).await.unwrap();

        let facebook = &report.platforms[&Platform::Facebook];
        assert!(facebook.success);
        assert!(facebook.has_image);
        assert_eq!(facebook.post_id.as_deref(), Some("photo_1"));

        let instagram = &report.platforms[&Platform::Instagram];
        assert!(instagram.success, "{:?}", instagram.error);
        assert_eq!(instagram.post_id.as_deref(), Some("ig_media_1"));
        assert_eq!(instagram.media_id.as_deref(), Some("container_1"));
        assert!(report.overall_success);

        // The photo posted to the page is looked up; nothing is uploaded twice.
        assert_eq!(stub.count("GET", "/photo_1"), 1);
        assert_eq!(stub.count("POST", "/page_1/photos"), 1);
        let container = stub
            .requests()
            .into_iter()
            .find(|r| r.is("POST", "/ig_1/media"))
            .unwrap();
        assert!(container
            .body
            .contains("image_url=https%3A%2F%2Fcdn.example%2Ffb_photo.jpg"));
        assert_eq!(stub.count("POST", "/ig_1/media_publish"), 1);

        let record = publisher.uploads().get(IMAGE).unwrap();
        assert_eq!(record.media_id.as_deref(), Some("ig_media_1"));

        cleanup(&storage);
    }

    #[tokio::test]
    async fn test_previously_uploaded_image_goes_text_only() {
        let stub = GraphStub::start(graph_routes(Behavior::default())).await;
        let storage = temp_storage();
        let post = post_with_image(&storage);
        UploadTracker::open(storage.uploads_path())
            .unwrap()
            .mark_uploaded(IMAGE, "earlier_post", None)
            .unwrap();
        let mut publisher =
            SocialPublisher::new(credentials(true), &graph_config(&stub), &storage).unwrap();

        let report = publisher.publish(&post).await.unwrap();

        let facebook = &report.platforms[&Platform::Facebook];
        assert!(facebook.success);
        assert!(!facebook.has_image);
        assert_eq!(facebook.post_id.as_deref(), Some("page_1_feed_1"));
        assert_eq!(stub.count("POST", "/page_1/photos"), 0);

        let instagram = &report.platforms[&Platform::Instagram];
        assert!(!instagram.success);
        assert_eq!(
            instagram.error.as_deref(),
            Some(GraphApiError::DuplicateMedia.to_string().as_str())
        );
        assert_eq!(stub.count("POST", "/ig_1/media"), 0);
        assert!(report.overall_success);

        let record = publisher.uploads().get(IMAGE).unwrap();
        assert_eq!(record.media_id.as_deref(), Some("earlier_post"));

        cleanup(&storage);
    }

    #[tokio::test]
    async fn test_duplicate_photo_reply_falls_back_to_feed() {
        let stub = GraphStub::start(graph_routes(Behavior {
            photo_duplicate: true,
            ..Behavior::default()
        }))
        .await;
        let storage = temp_storage();
        let post = post_with_image(&storage);
        let mut publisher =
            SocialPublisher::new(credentials(false), &graph_config(&stub), &storage).unwrap();

        let report = publisher.publish(&post).await.unwrap();

        let facebook = &report.platforms[&Platform::Facebook];
        assert!(facebook.success);
        assert!(!facebook.has_image);
        assert_eq!(facebook.post_id.as_deref(), Some("page_1_feed_1"));
        assert_eq!(stub.count("POST", "/page_1/photos"), 1);
        assert_eq!(stub.count("POST", "/page_1/feed"), 1);

        let record = publisher.uploads().get(IMAGE).unwrap();
        assert_eq!(record.media_id.as_deref(), Some(DUPLICATE_DETECTED));

        // Persisted, so the next run sees the image as already uploaded.
        let reopened = UploadTracker::open(storage.uploads_path()).unwrap();
        assert!(reopened.already_uploaded(IMAGE));

        cleanup(&storage);
    }

    #[tokio::test]
    async fn test_facebook_failure_does_not_block_instagram() {
        let stub = GraphStub::start(graph_routes(Behavior {
            page_denied: true,
            ..Behavior::default()
        }))
        .await;
        let storage = temp_storage();
        let post = post_with_image(&storage);
        let mut publisher =
            SocialPublisher::new(credentials(true), &graph_config(&stub), &storage).unwrap();

        let report = publisher.publish(&post).await.unwrap();

        let facebook = &report.platforms[&Platform::Facebook];
        assert!(!facebook.success);
        let error = facebook.error.as_deref().unwrap();
        assert!(error.contains("403"), "{}", error);
        assert!(!error.contains("disabled"));

        // No Facebook photo this run, so Instagram gets its URL from an
        // unpublished upload.
        let instagram = &report.platforms[&Platform::Instagram];
        assert!(instagram.success, "{:?}", instagram.error);
        assert_eq!(instagram.post_id.as_deref(), Some("ig_media_1"));
        let upload = stub
            .requests()
            .into_iter()
            .find(|r| r.is("POST", "/page_1/photos"))
            .unwrap();
        assert!(upload.body.contains("name=\"published\""));
        let container = stub
            .requests()
            .into_iter()
            .find(|r| r.is("POST", "/ig_1/media"))
            .unwrap();
        assert!(container
            .body
            .contains("image_url=https%3A%2F%2Fcdn.example%2Funpublished.jpg"));
        assert!(report.overall_success);

        let entries = PostingLog::new(storage.posting_log_path()).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].has_image);
        assert!(entries[0].posting_results.platforms[&Platform::Instagram].success);

        cleanup(&storage);
    }

    #[test]
    fn test_publisher_purges_stale_uploads_on_start() {
        let storage = temp_storage();
        {
            let mut tracker = UploadTracker::open(storage.uploads_path()).unwrap();
            tracker
                .mark_uploaded_at(b"stale", "1", None, Local::now() - Duration::days(10))
                .unwrap();
            tracker.mark_uploaded(b"recent", "2", None).unwrap();
        }

        let publisher =
            SocialPublisher::new(Credentials::default(), &GraphConfig::default(), &storage)
                .unwrap();
        assert_eq!(publisher.uploads().len(), 1);
        assert!(publisher.uploads().already_uploaded(b"recent"));

        let _ = std::fs::remove_dir_all(storage.data_dir.parent().unwrap());
    }

    #[test]
    fn test_resolve_image_path_falls_back_to_images_dir() {
        let storage = temp_storage();
        std::fs::create_dir_all(&storage.images_dir).unwrap();
        let actual = storage.images_dir.join("seo_tips_20241128_090000_1234.png");
        std::fs::write(&actual, b"png").unwrap();

        assert_eq!(
            resolve_image_path(&actual, &storage.images_dir),
            Some(actual.clone())
        );
        assert_eq!(
            resolve_image_path(
                Path::new("generated_images/seo_tips_20241128_090000_1234.png"),
                &storage.images_dir
            ),
            Some(actual.clone())
        );
        assert_eq!(
            resolve_image_path(Path::new("missing.png"), &storage.images_dir),
            None
        );

        let _ = std::fs::remove_dir_all(storage.images_dir.parent().unwrap());
    }
}
