/// エンドツーエンド統合テスト
///
/// 検索からファイル出力までの一連の流れをテストします：
/// 1. クライアント初期化
/// 2. JQL検索（ページング）
/// 3. 3形式へのエクスポート
/// 4. 成果物のファイル書き出し
///
/// これらのテストはwiremockを使用して実際のJIRA APIなしで動作します。

use jira_export::{
    Auth, ChannelSink, ExportConfig, ExportFormat, ExportService, JiraClient, JiraConfig,
    ProgressStage,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 全セクションを持つ課題のJSONを作成
fn create_mock_issue_json(n: u32) -> Value {
    json!({
        "id": format!("{}", 10000 + n),
        "key": format!("E2E-{}", n),
        "self": format!("https://jira.example.com/rest/api/2/issue/{}", 10000 + n),
        "fields": {
            "summary": format!("End to end issue {}", n),
            "description": format!("Description for issue {}", n),
            "issuetype": {"id": "1", "name": "Bug", "subtask": false},
            "project": {"id": "10000", "key": "E2E", "name": "End To End"},
            "status": {"id": "3", "name": "In Progress"},
            "priority": {"id": "2", "name": "High"},
            "assignee": {"name": "alice", "displayName": "Alice", "emailAddress": "alice@example.com"},
            "reporter": {"name": "bob", "displayName": "Bob"},
            "created": "2024-03-01T09:00:00.000+0000",
            "updated": "2024-03-02T10:30:00.000+0000",
            "labels": ["backend", "urgent"],
            "components": [{"id": "100", "name": "API"}],
            "fixVersions": [{"id": "200", "name": "2.0"}],
            "comment": {
                "comments": [
                    {"id": "1", "author": {"name": "bob", "displayName": "Bob"}, "body": "First", "created": "2024-03-01T10:00:00.000+0000"}
                ],
                "total": 1
            },
            "worklog": {
                "worklogs": [
                    {"id": "7", "author": {"name": "alice", "displayName": "Alice"}, "started": "2024-03-01T11:00:00.000+0000", "timeSpent": "1h", "timeSpentSeconds": 3600}
                ],
                "total": 1
            },
            "customfield_10001": {"value": "Gold"}
        }
    })
}

/// 検索エンドポイントを1ページで返すモックサーバーを起動
async fn setup_search_server(count: u32) -> MockServer {
    let server = MockServer::start().await;
    let issues: Vec<Value> = (1..=count).map(create_mock_issue_json).collect();

    Mock::given(method("POST"))
        .and(path("/rest/api/2/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 0,
            "maxResults": 100,
            "total": count,
            "issues": issues
        })))
        .mount(&server)
        .await;

    server
}

fn create_client(server: &MockServer) -> JiraClient {
    let config = JiraConfig::new(
        server.uri(),
        Auth::Basic {
            username: "test@example.com".to_string(),
            api_token: "mock-api-token".to_string(),
        },
    )
    .unwrap();
    JiraClient::new(config).unwrap()
}

#[tokio::test]
async fn test_complete_export_workflow() {
    println!("🚀 Starting complete export workflow test");

    // Given: 12件を返すJIRAと全セクション有効の設定
    let server = setup_search_server(12).await;
    let client = create_client(&server);
    let base_config = ExportConfig::new(ExportFormat::Json)
        .include_comments(true)
        .include_worklog(true)
        .custom_fields(vec!["customfield_10001".to_string()]);

    // When: 検索
    let issues = client
        .search_all("project = E2E", Some(base_config.search_fields()), 50)
        .await
        .unwrap();
    assert_eq!(issues.len(), 12);
    println!("✓ Fetched {} issues", issues.len());

    let temp_dir = TempDir::new().unwrap();
    let service = ExportService::new();

    for format in [ExportFormat::Xml, ExportFormat::Json, ExportFormat::Csv] {
        let config = ExportConfig {
            format: format.extension().to_string(),
            ..base_config.clone()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();

        // When: エクスポートして書き出し
        let artifact = service.export(&issues, &config, &ChannelSink(tx)).await.unwrap();
        let written = artifact.write_to_dir(temp_dir.path()).await.unwrap();

        // Then: 拡張子・MIMEタイプ・内容が一致
        assert!(written.to_string_lossy().ends_with(format.extension()));
        assert_eq!(artifact.mime_type, format.mime_type());
        let on_disk = tokio::fs::read(&written).await.unwrap();
        assert_eq!(on_disk, artifact.content);

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        let last = last.unwrap();
        assert_eq!(last.stage, ProgressStage::Complete);
        assert_eq!(last.message, "Export complete: 12 issues");

        println!("✓ {} export written to {}", format, written.display());
    }

    println!("🎉 Complete export workflow test passed");
}

#[tokio::test]
async fn test_exported_json_reflects_fetched_issues() {
    // Given: 3件を返すJIRA
    let server = setup_search_server(3).await;
    let client = create_client(&server);
    let config = ExportConfig::new(ExportFormat::Json)
        .include_comments(true)
        .include_worklog(true)
        .custom_fields(vec!["customfield_10001".to_string()]);

    // When: 検索してJSONへエクスポート
    let issues = client.search_all("project = E2E", None, 100).await.unwrap();
    let artifact = ExportService::new()
        .export(&issues, &config, &jira_export::NoopSink)
        .await
        .unwrap();
    let document: Value = serde_json::from_slice(&artifact.content).unwrap();

    // Then: メタデータと各課題の射影結果
    assert_eq!(document["metadata"]["totalIssues"], 3);
    assert_eq!(document["metadata"]["format"], "json");
    assert_eq!(document["metadata"]["version"], "1.0");

    let first = &document["issues"][0];
    assert_eq!(first["key"], "E2E-1");
    assert_eq!(first["project"]["key"], "E2E");
    assert_eq!(first["assignee"]["displayName"], "Alice");
    assert_eq!(first["created"], "2024-03-01T09:00:00.000Z");
    assert_eq!(first["comments"][0]["author"], "Bob");
    assert_eq!(first["worklogs"][0]["timeSpentSeconds"], 3600);
    assert_eq!(first["customFields"]["customfield_10001"], "Gold");
    assert!(first.get("attachments").is_none());
    assert!(first.get("links").is_none());
}

#[tokio::test]
async fn test_exported_csv_can_be_read_back() {
    // Given: 2件を返すJIRA
    let server = setup_search_server(2).await;
    let client = create_client(&server);
    let config = ExportConfig::new(ExportFormat::Csv).include_worklog(true);

    // When
    let issues = client.search_all("project = E2E", None, 100).await.unwrap();
    let artifact = ExportService::new()
        .export(&issues, &config, &jira_export::NoopSink)
        .await
        .unwrap();

    // Then: ヘッダー + 2行、作業時間列が埋まっている
    let mut reader = csv::Reader::from_reader(artifact.content.as_slice());
    let headers = reader.headers().unwrap().clone();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);

    let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
    assert_eq!(&rows[1][column("Issue Key")], "E2E-2");
    assert_eq!(&rows[1][column("Assignee")], "Alice");
    assert_eq!(&rows[1][column("Labels")], "backend, urgent");
    assert_eq!(&rows[1][column("Total Time Spent (hours)")], "1");
}
