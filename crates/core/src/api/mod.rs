//! GraphQL client for the booking backend.
//!
//! Every request is a JSON `POST {query, variables}`. Transport failures and
//! 5xx responses are retried with exponential backoff; GraphQL errors are not,
//! since the same query would fail the same way.

mod dto;
mod validate;
pub mod operations;

use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::FleetGuardConfig;
use crate::error::{CoreError, Result};
use crate::session::AuthSession;

pub use operations::{CancellationReceipt, Registration, RegistrationForm, ReservationReceipt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retrying after the zero-based `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    variables: &'a V,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

#[derive(Clone, Debug)]
pub struct GraphQlClient {
    http: reqwest::Client,
    endpoint: Url,
    retry: RetryPolicy,
}

impl GraphQlClient {
    pub fn new(http: reqwest::Client, endpoint: &str, retry: RetryPolicy) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            CoreError::Configuration(format!("invalid GraphQL endpoint {endpoint}: {e}"))
        })?;

        Ok(Self {
            http,
            endpoint,
            retry,
        })
    }

    pub fn from_config(http: reqwest::Client, config: &FleetGuardConfig) -> Result<Self> {
        let retry = RetryPolicy {
            max_attempts: config.retry.max_attempts,
            base_delay: config.retry.base_delay(),
        };
        Self::new(http, &config.graphql_endpoint, retry)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Run a query or mutation and decode its `data` member.
    pub async fn execute<V, T>(
        &self,
        operation: &str,
        query: &str,
        variables: &V,
        session: Option<&AuthSession>,
    ) -> Result<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let body = GraphQlRequest { query, variables };
        let token = session.map(AuthSession::token);

        let mut attempt = 0;
        loop {
            match self.send_once(&body, token).await {
                Ok(data) => return Ok(data),
                Err(e) if e.is_transient() && attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "GraphQL request failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(operation, "GraphQL request failed: {e}");
                    return Err(e);
                }
            }
        }
    }

    async fn send_once<V, T>(&self, body: &GraphQlRequest<'_, V>, token: Option<&str>) -> Result<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let mut request = self.http.post(self.endpoint.clone()).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        // GraphQL servers often report errors with a 4xx/5xx status; prefer
        // their messages over the bare status when the body decodes.
        let envelope: GraphQlResponse<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(CoreError::Http(status)),
            Err(e) => return Err(CoreError::MalformedResponse(e.to_string())),
        };

        if !envelope.errors.is_empty() {
            return Err(CoreError::GraphQl(
                envelope.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        if !status.is_success() {
            return Err(CoreError::Http(status));
        }

        envelope
            .data
            .ok_or_else(|| CoreError::MalformedResponse("response has no data".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::test_support::serve;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        }
    }

    async fn client_for(router: Router) -> GraphQlClient {
        let base = serve(router).await;
        GraphQlClient::new(reqwest::Client::new(), &format!("{base}graphql"), fast_retry())
            .unwrap()
    }

    #[test]
    fn test_retry_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_posts_query_and_variables() {
        async fn echo(Json(body): Json<Value>) -> Json<Value> {
            Json(json!({ "data": { "echo": body } }))
        }
        let client = client_for(Router::new().route("/graphql", post(echo))).await;

        let data: Value = client
            .execute("Echo", "query { echo }", &json!({ "id": "7" }), None)
            .await
            .unwrap();

        assert_eq!(data["echo"]["query"], "query { echo }");
        assert_eq!(data["echo"]["variables"]["id"], "7");
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        async fn flaky(State(hits): State<Arc<AtomicUsize>>) -> (StatusCode, Json<Value>) {
            if hits.fetch_add(1, Ordering::SeqCst) < 2 {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!("down")))
            } else {
                (StatusCode::OK, Json(json!({ "data": { "ok": true } })))
            }
        }
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/graphql", post(flaky))
            .with_state(hits.clone());
        let client = client_for(router).await;

        let data: Value = client.execute("Flaky", "query { ok }", &json!({}), None).await.unwrap();

        assert_eq!(data["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        async fn down(State(hits): State<Arc<AtomicUsize>>) -> StatusCode {
            hits.fetch_add(1, Ordering::SeqCst);
            StatusCode::BAD_GATEWAY
        }
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/graphql", post(down))
            .with_state(hits.clone());
        let client = client_for(router).await;

        let err = client
            .execute::<_, Value>("Down", "query { ok }", &json!({}), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Http(StatusCode::BAD_GATEWAY)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_graphql_errors_are_not_retried() {
        async fn invalid(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
            hits.fetch_add(1, Ordering::SeqCst);
            Json(json!({ "errors": [{ "message": "Viaje no encontrado" }], "data": null }))
        }
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/graphql", post(invalid))
            .with_state(hits.clone());
        let client = client_for(router).await;

        let err = client
            .execute::<_, Value>("Invalid", "query { x }", &json!({}), None)
            .await
            .unwrap_err();

        match err {
            CoreError::GraphQl(messages) => assert_eq!(messages, ["Viaje no encontrado"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sends_bearer_token_from_session() {
        async fn whoami(headers: HeaderMap) -> Json<Value> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            Json(json!({ "data": { "auth": auth } }))
        }
        let client = client_for(Router::new().route("/graphql", post(whoami))).await;
        let session = AuthSession::for_tests("tok-123", "p1");

        let data: Value = client
            .execute("WhoAmI", "query { me }", &json!({}), Some(&session))
            .await
            .unwrap();

        assert_eq!(data["auth"], "Bearer tok-123");
    }

    #[tokio::test]
    async fn test_missing_data_is_malformed() {
        async fn empty() -> Json<Value> {
            Json(json!({}))
        }
        let client = client_for(Router::new().route("/graphql", post(empty))).await;

        let err = client
            .execute::<_, Value>("Empty", "query { x }", &json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedResponse(_)));
    }
}
