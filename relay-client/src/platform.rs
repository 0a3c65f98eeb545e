//! Task platform client
//!
//! Speaks the Cloud Foundry v3 API: an OAuth password grant against the UAA
//! advertised by the API root, then bearer-authenticated calls for tasks.

use crate::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use relay_core::domain::task::TaskRequest;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Credentials for the task platform
#[derive(Debug, Clone)]
pub struct PlatformCredentials {
    pub api_url: String,
    pub username: String,
    pub password: String,
}

/// An authenticated handle to the task platform
#[derive(Debug, Clone)]
pub struct PlatformClient {
    api_url: String,
    token: String,
    client: Client,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RootInfo {
    links: RootLinks,
}

#[derive(Debug, Deserialize)]
struct RootLinks {
    #[serde(default)]
    uaa: Option<Link>,
    #[serde(default)]
    login: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PlatformErrors {
    errors: Vec<PlatformErrorBody>,
}

#[derive(Debug, Deserialize)]
struct PlatformErrorBody {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
}

#[derive(Debug, Deserialize)]
struct TaskList {
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    total_results: u64,
}

#[derive(Debug, Serialize)]
struct CreateTaskBody<'a> {
    command: &'a str,
    name: &'a str,
    memory_in_mb: u64,
    disk_in_mb: u64,
}

/// A task as acknowledged by the platform
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedTask {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
}

impl PlatformClient {
    /// Log in and return an authenticated client
    pub async fn login(credentials: &PlatformCredentials) -> Result<Self> {
        Self::login_with_client(credentials, Client::new()).await
    }

    /// Log in using a preconfigured HTTP client
    pub async fn login_with_client(credentials: &PlatformCredentials, client: Client) -> Result<Self> {
        let api_url = credentials.api_url.trim_end_matches('/').to_string();

        let response = client.get(format!("{}/", api_url)).send().await?;
        let root: RootInfo = handle_response(response).await?;
        let uaa = root
            .links
            .uaa
            .or(root.links.login)
            .ok_or_else(|| ClientError::ParseError("API root advertises no UAA link".to_string()))?;

        let response = client
            .post(format!("{}/oauth/token", uaa.href.trim_end_matches('/')))
            .basic_auth("cf", Some(""))
            .form(&[
                ("grant_type", "password"),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = handle_response(response).await?;

        info!(api_url = %api_url, "Logged in to task platform");

        Ok(Self::with_token(api_url, token.access_token, client))
    }

    /// Wrap an already issued bearer token
    pub fn with_token(api_url: impl Into<String>, token: impl Into<String>, client: Client) -> Self {
        let api_url = api_url.into();
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
            created_at: Utc::now(),
        }
    }

    /// When this session was established
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(&self.token)
    }

    /// Cheap read-only call that fails when the session is no longer valid
    pub async fn probe(&self) -> Result<()> {
        let response = self
            .request(Method::GET, "/v3/apps")
            .query(&[("names", "dummy_name"), ("per_page", "1")])
            .send()
            .await?;

        check(response).await.map(|_| ())
    }

    /// Number of tasks currently running against an application
    pub async fn count_running_tasks(&self, app_guid: &str) -> Result<u64> {
        let response = self
            .request(Method::GET, &format!("/v3/apps/{}/tasks", app_guid))
            .query(&[("states", "RUNNING"), ("per_page", "1")])
            .send()
            .await?;

        let tasks: TaskList = handle_response(response).await?;
        Ok(tasks.pagination.total_results)
    }

    /// Start a one-off task
    pub async fn create_task(&self, task: &TaskRequest) -> Result<CreatedTask> {
        let body = CreateTaskBody {
            command: &task.command,
            name: &task.name,
            memory_in_mb: task.memory_mb,
            disk_in_mb: task.disk_mb,
        };

        let response = self
            .request(Method::POST, &format!("/v3/apps/{}/tasks", task.target_id))
            .json(&body)
            .send()
            .await?;

        let created: CreatedTask = handle_response(response).await?;
        debug!(task_guid = %created.guid, name = %created.name, "Task created");
        Ok(created)
    }
}

/// Turn a non-success response into the most specific error available
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status = status.as_u16();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let first = serde_json::from_str::<PlatformErrors>(&text)
        .ok()
        .and_then(|body| body.errors.into_iter().next());

    Err(match first {
        Some(error) => ClientError::Platform {
            status,
            code: error.code,
            title: error.title,
            detail: error.detail,
        },
        None => ClientError::api_error(status, text),
    })
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    check(response)
        .await?
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::{
        Form, Json, Router,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::{get, post},
    };
    use relay_core::domain::task::ResourceAllocation;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorded {
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    fn bearer_ok(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "Bearer tok-1")
    }

    async fn fake_platform() -> (String, Recorded) {
        let recorded = Recorded::default();

        // The root handler needs its own URL, which is only known after binding
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let uaa = format!("{}/uaa", base);

        let router = Router::new()
            .route(
                "/",
                get(move || {
                    let uaa = uaa.clone();
                    async move { Json(json!({ "links": { "uaa": { "href": uaa } } })) }
                }),
            )
            .route(
                "/uaa/oauth/token",
                post(|Form(form): Form<HashMap<String, String>>| async move {
                    if form.get("password").map(String::as_str) == Some("secret") {
                        Json(json!({ "access_token": "tok-1", "token_type": "bearer" }))
                            .into_response()
                    } else {
                        (StatusCode::UNAUTHORIZED, "bad credentials").into_response()
                    }
                }),
            )
            .route(
                "/v3/apps",
                get(|headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                    if !bearer_ok(&headers) {
                        return (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({ "errors": [{ "code": 1000, "title": "CF-InvalidAuthToken", "detail": "Invalid Auth Token" }] })),
                        )
                            .into_response();
                    }
                    assert_eq!(q.get("names").map(String::as_str), Some("dummy_name"));
                    Json(json!({ "resources": [] })).into_response()
                }),
            )
            .route(
                "/v3/apps/{guid}/tasks",
                get(|Path(guid): Path<String>, Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(q.get("states").map(String::as_str), Some("RUNNING"));
                    let total = if guid == "app-busy" { 3 } else { 0 };
                    Json(json!({ "pagination": { "total_results": total } }))
                })
                .post(
                    |State(recorded): State<Recorded>, Path(guid): Path<String>, Json(body): Json<Value>| async move {
                        if guid == "app-full" {
                            return (
                                StatusCode::BAD_REQUEST,
                                Json(json!({ "errors": [{ "code": 100005, "title": "CF-AppMemoryQuotaExceeded", "detail": "memory quota exceeded" }] })),
                            )
                                .into_response();
                        }
                        let name = body["name"].clone();
                        recorded.bodies.lock().unwrap().push(body);
                        Json(json!({ "guid": "task-1", "name": name, "state": "RUNNING" })).into_response()
                    },
                ),
            )
            .with_state(recorded.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        (base, recorded)
    }

    fn credentials(api_url: &str, password: &str) -> PlatformCredentials {
        PlatformCredentials {
            api_url: api_url.to_string(),
            username: "deployer".to_string(),
            password: password.to_string(),
        }
    }

    fn task(target: &str) -> TaskRequest {
        TaskRequest::new(
            "worker --jobID 'J1'".to_string(),
            "J1".to_string(),
            target.to_string(),
            ResourceAllocation {
                disk_mb: 2560,
                memory_mb: 4352,
            },
        )
    }

    #[tokio::test]
    async fn test_login_and_probe() {
        let (base, _) = fake_platform().await;
        let client = PlatformClient::login(&credentials(&base, "secret")).await.unwrap();
        client.probe().await.unwrap();
    }

    #[tokio::test]
    async fn test_login_with_bad_credentials() {
        let (base, _) = fake_platform().await;
        let err = PlatformClient::login(&credentials(&base, "wrong"))
            .await
            .unwrap_err();
        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn test_probe_with_expired_token_is_auth_error() {
        let (base, _) = fake_platform().await;
        let client = PlatformClient::with_token(&base, "stale", Client::new());

        let err = client.probe().await.unwrap_err();
        assert!(matches!(err, ClientError::Platform { code: 1000, .. }));
        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn test_count_running_tasks() {
        let (base, _) = fake_platform().await;
        let client = PlatformClient::with_token(&base, "tok-1", Client::new());

        assert_eq!(client.count_running_tasks("app-busy").await.unwrap(), 3);
        assert_eq!(client.count_running_tasks("app-idle").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_task() {
        let (base, recorded) = fake_platform().await;
        let client = PlatformClient::with_token(&base, "tok-1", Client::new());

        let created = client.create_task(&task("app-1")).await.unwrap();
        assert_eq!(created.guid, "task-1");
        assert_eq!(created.name, "J1");

        let bodies = recorded.bodies.lock().unwrap();
        assert_eq!(
            bodies[0],
            json!({ "command": "worker --jobID 'J1'", "name": "J1", "memory_in_mb": 4352, "disk_in_mb": 2560 })
        );
    }

    #[tokio::test]
    async fn test_create_task_memory_limit() {
        let (base, _) = fake_platform().await;
        let client = PlatformClient::with_token(&base, "tok-1", Client::new());

        let err = client.create_task(&task("app-full")).await.unwrap_err();
        assert!(err.is_memory_limit_error());
        assert!(!err.is_auth_error());
    }
}
