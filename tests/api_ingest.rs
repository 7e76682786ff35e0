use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use gitingest::{create_router, AppState, Settings};

struct Fixture {
    _scratch: TempDir,
    _repo: TempDir,
    repo_path: String,
    app: Router,
}

fn fixture_configured(configure: impl FnOnce(&mut Settings)) -> Fixture {
    let scratch = tempfile::tempdir().unwrap();
    let repo = tempfile::tempdir().unwrap();
    let root = repo.path().join("demo");
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("README.md"), "# Demo\n").unwrap();
    std::fs::write(root.join("src/lib.rs"), "pub fn answer() -> u32 { 42 }\n").unwrap();
    std::fs::write(root.join("notes.txt"), "some notes\n").unwrap();

    let mut settings = Settings::default();
    settings.server.allowed_hosts = vec!["localhost".to_string()];
    settings.server.rate_limit_per_minute = 100;
    settings.ingest.tmp_dir = scratch.path().to_path_buf();
    settings.ingest.allow_local_sources = true;
    configure(&mut settings);

    Fixture {
        repo_path: root.to_string_lossy().to_string(),
        app: create_router(AppState::new(settings)),
        _scratch: scratch,
        _repo: repo,
    }
}

fn fixture() -> Fixture {
    fixture_configured(|_| {})
}

fn ingest_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/ingest")
        .header(header::HOST, "localhost")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost")
        .body(Body::empty())
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_empty_input_is_a_validation_error() {
    let f = fixture();
    let response = f
        .app
        .oneshot(ingest_request(
            "input_text=&max_file_size=243&pattern_type=exclude&pattern=&token=",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Validation error: input_text cannot be empty");
    assert_eq!(body["repo_url"], "");
    assert_eq!(body["default_file_size"], 243);
    assert_eq!(body["token"], Value::Null);
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_out_of_range_slider_is_rejected() {
    let f = fixture();
    let response = f
        .app
        .oneshot(ingest_request("input_text=cyclotruc%2Fgitingest&max_file_size=600"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("less than or equal to 500"));
    assert_eq!(body["default_file_size"], 600);
    assert_eq!(body["pattern_type"], "exclude");
}

#[tokio::test]
async fn test_unknown_pattern_type_is_rejected() {
    let f = fixture();
    let response = f
        .app
        .oneshot(ingest_request(
            "input_text=cyclotruc%2Fgitingest&max_file_size=243&pattern_type=maybe",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Validation error:"));
    assert_eq!(body["pattern_type"], "maybe");
}

#[tokio::test]
async fn test_invalid_repository_url_is_a_processing_error() {
    let f = fixture();
    let response = f
        .app
        .oneshot(ingest_request(
            "input_text=cyclotruc%2F&max_file_size=243&pattern_type=exclude&pattern=",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Error: Invalid repository URL 'cyclotruc/'");
    assert_eq!(body["repo_url"], "cyclotruc/");
}

#[tokio::test]
async fn test_invalid_pattern_characters_are_rejected() {
    let f = fixture();
    let response = f
        .app
        .oneshot(ingest_request(
            "input_text=cyclotruc%2Fgitingest&max_file_size=243&pattern=%24%28rm%29",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("contains invalid characters"));
    assert_eq!(body["pattern"], "$(rm)");
}

#[tokio::test]
async fn test_non_form_body_is_rejected_with_error_shape() {
    let f = fixture();
    let request = Request::builder()
        .method("POST")
        .uri("/api/ingest")
        .header(header::HOST, "localhost")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"input_text\":\"a/b\"}"))
        .unwrap();
    let response = f.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Validation error:"));
}

#[tokio::test]
async fn test_successful_ingest_and_download() {
    let f = fixture();
    let body = format!(
        "input_text={}&max_file_size=243&pattern_type=exclude&pattern=&token=",
        f.repo_path
    );
    let response = f.app.clone().oneshot(ingest_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["result"], true);
    assert_eq!(json["short_repo_url"], "demo");
    assert_eq!(json["default_file_size"], 243);
    assert_eq!(json["pattern_type"], "exclude");
    assert!(json["summary"]
        .as_str()
        .unwrap()
        .starts_with("Directory: demo\nFiles analyzed: 3\n"));
    assert!(json["tree"].as_str().unwrap().contains("└── demo/"));
    assert!(json["content"].as_str().unwrap().contains("FILE: src/lib.rs"));

    let ingest_id = json["ingest_id"].as_str().unwrap().to_string();
    let response = f
        .app
        .oneshot(get_request(&format!("/api/download/file/{}", ingest_id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"demo.txt\""
    );
    let text = body_text(response).await;
    assert!(text.starts_with("Directory structure:"));
    assert!(text.contains("FILE: README.md"));
}

#[tokio::test]
async fn test_include_pattern_limits_content() {
    let f = fixture();
    let body = format!(
        "input_text={}&max_file_size=243&pattern_type=include&pattern=*.md",
        f.repo_path
    );
    let response = f.app.oneshot(ingest_request(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let content = json["content"].as_str().unwrap();
    assert!(content.contains("FILE: README.md"));
    assert!(!content.contains("lib.rs"));
    assert!(!content.contains("notes.txt"));
    assert_eq!(json["pattern"], "*.md");
}

#[tokio::test]
async fn test_download_unknown_id_is_not_found() {
    let f = fixture();
    let response = f
        .app
        .oneshot(get_request(
            "/api/download/file/00000000-0000-4000-8000-000000000000",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Ingest not found"));
}

#[tokio::test]
async fn test_health_head_and_static_files() {
    let f = fixture();

    let response = f.app.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");

    let head = Request::builder()
        .method("HEAD")
        .uri("/")
        .header(header::HOST, "localhost")
        .body(Body::empty())
        .unwrap();
    let response = f.app.clone().oneshot(head).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );

    let response = f.app.clone().oneshot(get_request("/robots.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("User-agent"));

    let response = f.app.oneshot(get_request("/llm.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("/api/ingest"));
}

#[tokio::test]
async fn test_untrusted_host_is_rejected() {
    let f = fixture();
    let request = Request::builder()
        .uri("/health")
        .header(header::HOST, "evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = f.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Invalid host header");
}

#[tokio::test]
async fn test_ingest_is_rate_limited() {
    let f = fixture_configured(|s| s.server.rate_limit_per_minute = 2);
    let body = "input_text=&max_file_size=243";

    for _ in 0..2 {
        let response = f.app.clone().oneshot(ingest_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = f.app.clone().oneshot(ingest_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Rate limit exceeded. Try again in "));
    assert_eq!(json["repo_url"], "");
    assert_eq!(json["default_file_size"], 243);
    assert_eq!(json["pattern_type"], "exclude");
    assert!(json.get("result").is_none());

    // Other routes are not limited
    let response = f.app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_inline_content_is_cropped_but_download_is_full() {
    let f = fixture_configured(|s| s.server.max_display_size = 1_500);
    let long_line = "x".repeat(3_000);
    std::fs::write(format!("{}/long.txt", f.repo_path), &long_line).unwrap();

    let body = format!("input_text={}&max_file_size=243", f.repo_path);
    let response = f.app.clone().oneshot(ingest_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let content = json["content"].as_str().unwrap();
    assert!(content.starts_with(
        "(Files content cropped to 1k characters, download full ingest to see more)\n"
    ));
    assert!(!content.contains(&long_line));

    let ingest_id = json["ingest_id"].as_str().unwrap().to_string();
    let response = f
        .app
        .oneshot(get_request(&format!("/api/download/file/{}", ingest_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(&long_line));
}
