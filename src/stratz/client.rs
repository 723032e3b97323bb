//! Rate-limited GraphQL client
//!
//! Issues one logical request with bounded retry. Knows nothing about what is
//! being fetched: callers pass a query document, variables, and a context label
//! used only for diagnostics.
//!
//! ## Policy
//!
//! | attempt result              | action                                   |
//! |-----------------------------|------------------------------------------|
//! | 200 without `errors`        | decode `data`, done                      |
//! | 200 with `errors`           | fail now                                 |
//! | 429                         | sleep `Retry-After` or doubling backoff  |
//! | >= 500                      | sleep 5s                                 |
//! | transport failure           | sleep 2s                                 |
//! | anything else               | fail now                                 |
//!
//! Sleeps are charged against a per-call wait budget; see [`RetryBudget`].

use super::error::ApiError;
use super::retry::{AttemptOutcome, RetryBudget, RetryPolicy, RetryState};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Wire body of a GraphQL POST
#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: serde_json::Value,
}

/// Raw HTTP result, decoupled from the HTTP library
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub body: String,
}

#[derive(Debug)]
pub struct TransportError(pub String);

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transport error: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

/// Sends one GraphQL request and returns whatever came back
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn post(&self, request: &GraphqlRequest) -> Result<TransportResponse, TransportError>;
}

/// Backoff sleeping, swappable so tests don't wait in real time
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// reqwest-backed transport with bearer authentication
pub struct ReqwestTransport {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl ReqwestTransport {
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl GraphqlTransport for ReqwestTransport {
    async fn post(&self, request: &GraphqlRequest) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}

enum Attempt<T> {
    Settled(Result<T, ApiError>),
    Retryable(AttemptOutcome),
}

pub struct RateLimitedClient {
    transport: Arc<dyn GraphqlTransport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl RateLimitedClient {
    pub fn new(
        transport: Arc<dyn GraphqlTransport>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// Run one logical request to completion or definitive failure.
    ///
    /// # Arguments
    /// * `query` - GraphQL document
    /// * `variables` - JSON object of query variables (`Value::Null` for none)
    /// * `context` - label for log lines (hero name, stage)
    pub async fn request<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        context: &str,
    ) -> Result<T, ApiError> {
        let request = GraphqlRequest {
            query: query.to_string(),
            variables,
        };
        let mut budget = RetryBudget::new(self.policy.clone());

        loop {
            let attempt = match self.transport.post(&request).await {
                Ok(response) => classify::<T>(response, context),
                Err(e) => {
                    log::warn!("⚠️  {} [{}]", e, context);
                    Attempt::Retryable(AttemptOutcome::Transport)
                }
            };

            let outcome = match attempt {
                Attempt::Settled(result) => {
                    let outcome = if result.is_ok() {
                        AttemptOutcome::Ok
                    } else {
                        AttemptOutcome::Rejected
                    };
                    if budget.on_outcome(&outcome) == RetryState::PermanentFailure {
                        if let Err(e) = &result {
                            log::warn!("❌ API call failed [{}]: {}", context, e);
                        }
                    }
                    return result;
                }
                Attempt::Retryable(outcome) => outcome,
            };

            match budget.on_outcome(&outcome) {
                RetryState::BackingOff(delay) => {
                    log::debug!(
                        "⏳ {:?} [{}], retrying in {}s (waited {}s so far)",
                        outcome,
                        context,
                        delay.as_secs(),
                        budget.elapsed().saturating_sub(delay).as_secs()
                    );
                    self.sleeper.sleep(delay).await;
                }
                _ => {
                    log::error!(
                        "⛔ Wait budget ({}s) exhausted [{}], giving up after {} attempts",
                        self.policy.wait_budget.as_secs(),
                        context,
                        budget.attempts()
                    );
                    return Err(ApiError::BudgetExhausted {
                        waited: budget.elapsed(),
                    });
                }
            }
        }
    }
}

fn classify<T: DeserializeOwned>(response: TransportResponse, context: &str) -> Attempt<T> {
    match response.status {
        // A 200 that is not JSON at all (proxy or challenge page) is treated
        // like a dropped connection; a JSON body of the wrong shape is not.
        200 => match serde_json::from_str::<serde_json::Value>(&response.body) {
            Ok(payload) => Attempt::Settled(decode_payload(payload)),
            Err(e) => {
                log::warn!("⚠️  Unparseable 200 response [{}]: {}", context, e);
                Attempt::Retryable(AttemptOutcome::Transport)
            }
        },
        429 => Attempt::Retryable(AttemptOutcome::RateLimited {
            retry_after: parse_retry_after(response.retry_after.as_deref()),
        }),
        status if status >= 500 => Attempt::Retryable(AttemptOutcome::ServerError { status }),
        status => Attempt::Settled(Err(ApiError::Http { status })),
    }
}

/// Delta-seconds form only; HTTP-date hints fall back to the doubling counter
fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn decode_payload<T: DeserializeOwned>(mut payload: serde_json::Value) -> Result<T, ApiError> {
    if let Some(errors) = payload.get("errors").filter(|e| !e.is_null()) {
        let message = errors
            .get(0)
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| errors.to_string());
        return Err(ApiError::GraphQl(message));
    }

    match payload.get_mut("data").map(serde_json::Value::take) {
        Some(data) if !data.is_null() => Ok(serde_json::from_value(data)?),
        _ => Err(ApiError::MissingData),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays scripted responses; repeats the last one once the script runs out
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<TransportResponse, String>>>,
        last: Mutex<Option<Result<TransportResponse, String>>>,
        calls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<TransportResponse, String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GraphqlTransport for ScriptedTransport {
        async fn post(&self, _request: &GraphqlRequest) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            let step = match next {
                Some(step) => {
                    *self.last.lock().unwrap() = Some(step.clone());
                    step
                }
                None => self.last.lock().unwrap().clone().expect("empty script"),
            };
            step.map_err(TransportError)
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn total(&self) -> Duration {
            self.slept.lock().unwrap().iter().sum()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn response(status: u16, body: &str) -> Result<TransportResponse, String> {
        Ok(TransportResponse {
            status,
            retry_after: None,
            body: body.to_string(),
        })
    }

    fn client(
        transport: Arc<ScriptedTransport>,
        sleeper: Arc<RecordingSleeper>,
    ) -> RateLimitedClient {
        RateLimitedClient::new(transport, sleeper, RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_always_rate_limited_respects_budget() {
        let transport = Arc::new(ScriptedTransport::new(vec![response(429, "")]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let result: Result<serde_json::Value, ApiError> =
            client.request("query {}", serde_json::Value::Null, "test").await;

        assert!(matches!(result, Err(ApiError::BudgetExhausted { .. })));
        assert!(sleeper.total() <= Duration::from_secs(60));
        assert_eq!(sleeper.total(), Duration::from_secs(1 + 2 + 4 + 8 + 16));
        assert_eq!(transport.calls(), 6);
    }

    #[tokio::test]
    async fn test_retry_after_header_is_honoured() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(TransportResponse {
                status: 429,
                retry_after: Some("7".to_string()),
                body: String::new(),
            }),
            response(200, r#"{"data": {"value": 1}}"#),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let result: serde_json::Value = client
            .request("query {}", serde_json::Value::Null, "test")
            .await
            .unwrap();

        assert_eq!(result["value"], 1);
        assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(7)]);
    }

    #[tokio::test]
    async fn test_graphql_errors_fail_immediately() {
        let transport = Arc::new(ScriptedTransport::new(vec![response(
            200,
            r#"{"errors": [{"message": "bad query"}], "data": null}"#,
        )]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let result: Result<serde_json::Value, ApiError> =
            client.request("query {}", serde_json::Value::Null, "test").await;

        match result {
            Err(ApiError::GraphQl(msg)) => assert_eq!(msg, "bad query"),
            other => panic!("expected GraphQl error, got {:?}", other),
        }
        assert_eq!(transport.calls(), 1);
        assert_eq!(sleeper.total(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_client_error_status_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![response(403, "forbidden")]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let result: Result<serde_json::Value, ApiError> =
            client.request("query {}", serde_json::Value::Null, "test").await;

        assert!(matches!(result, Err(ApiError::Http { status: 403 })));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_server_error_then_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            response(502, ""),
            Err("connection reset".to_string()),
            response(200, r#"{"data": {"ok": true}}"#),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let result: serde_json::Value = client
            .request("query {}", serde_json::Value::Null, "test")
            .await
            .unwrap();

        assert_eq!(result["ok"], true);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_secs(5), Duration::from_secs(2)]
        );
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_data_is_permanent() {
        let transport = Arc::new(ScriptedTransport::new(vec![response(200, r#"{"data": null}"#)]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper);

        let result: Result<serde_json::Value, ApiError> =
            client.request("query {}", serde_json::Value::Null, "test").await;

        assert!(matches!(result, Err(ApiError::MissingData)));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_json_body_is_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            response(200, "<html>Just a moment...</html>"),
            response(200, r#"{"data": {"ok": true}}"#),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let result: serde_json::Value = client
            .request("query {}", serde_json::Value::Null, "test")
            .await
            .unwrap();

        assert_eq!(result["ok"], true);
        assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(2)]);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_permanent() {
        #[derive(Debug, serde::Deserialize)]
        struct Expected {
            #[allow(dead_code)]
            count: u64,
        }

        let transport = Arc::new(ScriptedTransport::new(vec![response(200, r#"{"data": {"count": "many"}}"#)]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let result: Result<Expected, ApiError> = client.request("query {}", serde_json::Value::Null, "test").await;

        assert!(matches!(result, Err(ApiError::Decode(_))));
        assert_eq!(transport.calls(), 1);
        assert_eq!(sleeper.total(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_retry_after_gives_up_within_budget() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(TransportResponse {
            status: 429,
            retry_after: Some("0".to_string()),
            body: String::new(),
        })]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let result: Result<serde_json::Value, ApiError> =
            client.request("query {}", serde_json::Value::Null, "test").await;

        match result {
            Err(ApiError::BudgetExhausted { waited }) => assert_eq!(waited, Duration::from_secs(31)),
            other => panic!("expected BudgetExhausted, got {:?}", other),
        }
        assert_eq!(sleeper.total(), Duration::ZERO);
        assert_eq!(transport.calls(), 6);
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some(" 12 ")), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after(Some("Wed, 21 Oct 2015 07:28:00 GMT")), None);
        assert_eq!(parse_retry_after(None), None);
    }
}
