//! JIRA Server REST APIの薄いラッパー（検索とページング、エラーの変換のみ）

use crate::error::{Error, Result};
use crate::models::{Issue, SearchParams, SearchResult, User};
use base64::Engine;
use reqwest::{header, Client, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// 1ページあたりの既定取得件数
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub enum Auth {
    Basic { username: String, api_token: String },
    Bearer { token: String },
}

#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub auth: Auth,
}

impl JiraConfig {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        // Validate URL
        let _ = Url::parse(&base_url)
            .map_err(|_| Error::InvalidConfiguration("Invalid base URL".to_string()))?;

        Ok(Self { base_url, auth })
    }

    /// `JIRA_URL` / `JIRA_USER` / `JIRA_API_TOKEN` から設定を作成
    pub fn from_env() -> Result<Self> {
        use std::env;

        let base_url = env::var("JIRA_URL")
            .map_err(|_| Error::ConfigurationMissing("JIRA_URL not found in environment".to_string()))?;

        let username = env::var("JIRA_USER")
            .map_err(|_| Error::ConfigurationMissing("JIRA_USER not found in environment".to_string()))?;

        let api_token = env::var("JIRA_API_TOKEN").map_err(|_| {
            Error::ConfigurationMissing("JIRA_API_TOKEN not found in environment".to_string())
        })?;

        Self::new(base_url, Auth::Basic { username, api_token })
    }
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    client: Client,
    config: Arc<JiraConfig>,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        // 認証ヘッダーを追加
        let auth_value = match &config.auth {
            Auth::Basic { username, api_token } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, api_token).as_bytes());
                format!("Basic {}", encoded)
            }
            Auth::Bearer { token } => format!("Bearer {}", token),
        };
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth_value)
                .map_err(|_| Error::InvalidConfiguration("Invalid auth header".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub(crate) async fn get<T>(&self, endpoint: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, endpoint);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    pub(crate) async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let url = format!("{}{}", self.config.base_url, endpoint);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// 接続確認（ログインユーザーを取得）
    pub async fn myself(&self) -> Result<User> {
        self.get("/rest/api/2/myself").await
    }

    /// JQLで1ページ分を検索
    pub async fn search_issues(&self, jql: &str, params: SearchParams) -> Result<SearchResult> {
        let mut body = serde_json::json!({
            "jql": jql
        });

        // SearchParamsの値をリクエストボディにマージ
        if let Some(start_at) = params.start_at {
            body["startAt"] = start_at.into();
        }
        if let Some(max_results) = params.max_results {
            body["maxResults"] = max_results.into();
        }
        if let Some(fields) = params.fields {
            body["fields"] = fields.into();
        }

        self.post("/rest/api/2/search", &body).await
    }

    /// `total` に達するか空ページが返るまでページングして全件取得
    pub async fn search_all(
        &self,
        jql: &str,
        fields: Option<Vec<String>>,
        page_size: u32,
    ) -> Result<Vec<Issue>> {
        let page_size = page_size.max(1);
        let mut issues: Vec<Issue> = Vec::new();
        let mut start_at = 0u32;

        loop {
            let mut params = SearchParams::new().start_at(start_at).max_results(page_size);
            if let Some(fields) = &fields {
                params = params.fields(fields.clone());
            }

            let page = self.search_issues(jql, params).await?;
            let fetched = page.issues.len() as u32;
            debug!(
                "Fetched {} issues (startAt={}, total={})",
                fetched, start_at, page.total
            );
            issues.extend(page.issues);

            if fetched == 0 {
                if (issues.len() as u32) < page.total {
                    warn!(
                        "Search returned an empty page before reaching total ({} of {})",
                        issues.len(),
                        page.total
                    );
                }
                break;
            }
            start_at += fetched;
            if start_at >= page.total {
                break;
            }
        }

        info!("Search returned {} issues for JQL: {}", issues.len(), jql);
        Ok(issues)
    }
}

/// HTTPステータスをエラーへ変換
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    warn!("JIRA API returned {}: {}", status, message);

    match status {
        StatusCode::UNAUTHORIZED => Err(Error::AuthenticationFailed(message)),
        StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimitExceeded),
        _ => Err(Error::ApiError {
            status: status.as_u16(),
            message,
        }),
    }
}
