/// エラーシナリオテスト
///
/// 様々なエラー条件での動作をテストします：
/// - 未対応のエクスポート形式
/// - 不正な設定
/// - JIRA APIのエラー応答
/// - 書き出し先の問題

use jira_export::{
    Auth, ChannelSink, Error, ExportConfig, ExportFormat, ExportService, Issue, JiraClient,
    JiraConfig, NoopSink,
};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_issue(n: usize) -> Issue {
    serde_json::from_value(json!({
        "id": n.to_string(),
        "key": format!("ERR-{}", n),
        "fields": {
            "summary": "Error scenario",
            "created": "2024-01-01T00:00:00.000Z",
            "updated": "2024-01-01T00:00:00.000Z"
        }
    }))
    .unwrap()
}

fn create_client(server: &MockServer) -> JiraClient {
    let config = JiraConfig::new(
        server.uri(),
        Auth::Bearer {
            token: "mock-token".to_string(),
        },
    )
    .unwrap();
    JiraClient::new(config).unwrap()
}

#[tokio::test]
async fn test_unsupported_format_fails_without_progress() {
    println!("🧪 Testing unsupported export format...");

    // Given: 未知の形式
    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = ExportConfig::from_json_str(r#"{"format": "bogus", "includeComments": true}"#).unwrap();

    // When
    let result = ExportService::new()
        .export(&[create_issue(1)], &config, &ChannelSink(tx))
        .await;

    // Then: 形式名を含むエラーで失敗し、進捗は1件も出ない
    match result {
        Err(Error::UnsupportedFormat(name)) => assert_eq!(name, "bogus"),
        other => panic!("expected UnsupportedFormat, got {:?}", other.map(|a| a.filename)),
    }
    assert!(rx.try_recv().is_err());
    println!("✓ Unsupported format rejected before any progress");
}

#[tokio::test]
async fn test_format_names_are_case_insensitive() {
    for raw in ["XML", "Json", "csv"] {
        let config = ExportConfig::from_json_str(&format!(r#"{{"format": "{}"}}"#, raw)).unwrap();
        assert!(config.format().is_ok(), "{} should be accepted", raw);
    }
    assert!(matches!(
        "yaml".parse::<ExportFormat>(),
        Err(Error::UnsupportedFormat(_))
    ));
}

#[test]
fn test_malformed_config_json() {
    let result = ExportConfig::from_json_str("{ not json");
    assert!(matches!(result, Err(Error::JsonParsing(_))));
}

#[test]
fn test_invalid_base_url() {
    let result = JiraConfig::new(
        "not a url",
        Auth::Basic {
            username: "user".to_string(),
            api_token: "token".to_string(),
        },
    );
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}

#[tokio::test]
async fn test_search_authentication_failure() {
    // Given: 401を返すJIRA
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/search"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    // When
    let result = create_client(&server).search_all("project = ERR", None, 50).await;

    // Then
    assert!(matches!(result, Err(Error::AuthenticationFailed(_))));
}

#[tokio::test]
async fn test_search_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/search"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let result = create_client(&server).search_all("project = ERR", None, 50).await;

    assert!(matches!(result, Err(Error::RateLimitExceeded)));
}

#[tokio::test]
async fn test_search_server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = create_client(&server).search_all("project = ERR", None, 50).await;

    match result {
        Err(Error::ApiError { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected ApiError, got {:?}", other.map(|i| i.len())),
    }
}

#[tokio::test]
async fn test_malformed_search_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"issues\": [{\"key\": 1}]}"))
        .mount(&server)
        .await;

    let result = create_client(&server).search_all("project = ERR", None, 50).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_write_artifact_to_missing_directory() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let artifact = ExportService::new()
        .export(&[create_issue(1)], &ExportConfig::new(ExportFormat::Json), &NoopSink)
        .await
        .unwrap();

    let result = artifact.write_to_dir(temp_dir.path().join("does/not/exist")).await;

    assert!(matches!(result, Err(Error::IoError(_))));
}

#[test]
fn test_invalid_issue_payload_is_rejected() {
    // created が無い課題は読み込めない
    let result: Result<Issue, _> = serde_json::from_value(json!({
        "id": "1",
        "key": "ERR-1",
        "fields": {"summary": "No timestamps"}
    }));
    assert!(result.is_err());
}
