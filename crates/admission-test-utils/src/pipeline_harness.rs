//! In-process pipeline harness.
//!
//! Wraps a small router in a [`Pipeline`] and drives it with
//! `tower::ServiceExt::oneshot`, so tests exercise every stage without
//! binding a socket.

use crate::crypto_fixtures::TEST_JWT_SECRET;
use admission::auth::{TokenConfig, TokenService};
use admission::middleware::{Pipeline, PipelineConfig, RequestContext, StageOrder};
use admission::rate_limit::{RateLimiter, TokenBucket, TokenBucketConfig};
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    routing::{get, post},
    Extension, Json, Router,
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Response captured by the harness.
#[derive(Debug)]
pub struct HarnessResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// A pipeline-wrapped router with these routes:
///
/// - `GET /whoami` returns the request id and authenticated user id
/// - `POST /echo` buffers the body and returns its length
/// - `GET /slow` sleeps for one hour
/// - `GET /panic` panics
pub struct PipelineHarness {
    router: Router,
}

impl PipelineHarness {
    pub fn builder() -> PipelineHarnessBuilder {
        PipelineHarnessBuilder::default()
    }

    pub async fn get(&self, path: &str) -> HarnessResponse {
        self.send(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> HarnessResponse {
        self.get_with_authorization(path, &format!("Bearer {token}"))
            .await
    }

    pub async fn get_with_authorization(&self, path: &str, authorization: &str) -> HarnessResponse {
        self.send(
            Request::get(path)
                .header(header::AUTHORIZATION, authorization)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn options(&self, path: &str) -> HarnessResponse {
        self.send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri(path)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// `POST` with a bearer token. `declared_length` sets `Content-Length`;
    /// without it the body is sent with no declared length.
    pub async fn post_with_token(
        &self,
        path: &str,
        token: &str,
        body: Vec<u8>,
        declared_length: Option<u64>,
    ) -> HarnessResponse {
        let mut request =
            Request::post(path).header(header::AUTHORIZATION, format!("Bearer {token}"));
        if let Some(length) = declared_length {
            request = request.header(header::CONTENT_LENGTH, length);
        }
        self.send(request.body(Body::from(body)).unwrap()).await
    }

    /// Send an arbitrary request through the pipeline.
    ///
    /// Non-JSON bodies (axum's own rejections) come back as a JSON string.
    pub async fn send(&self, request: Request<Body>) -> HarnessResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        HarnessResponse {
            status,
            headers,
            body,
        }
    }
}

/// Configures a [`PipelineHarness`].
pub struct PipelineHarnessBuilder {
    order: StageOrder,
    burst: u32,
    refill_per_second: f64,
    request_timeout: Duration,
    max_body_bytes: u64,
    cors_allow_origin: String,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
}

impl Default for PipelineHarnessBuilder {
    fn default() -> Self {
        Self {
            order: StageOrder::default(),
            burst: 100,
            refill_per_second: 0.0,
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 1_048_576,
            cors_allow_origin: "*".to_string(),
            rate_limiter: None,
        }
    }
}

impl PipelineHarnessBuilder {
    pub fn stage_order(mut self, order: StageOrder) -> Self {
        self.order = order;
        self
    }

    /// Token-bucket capacity. The bucket does not refill unless
    /// [`refill_per_second`](Self::refill_per_second) is set.
    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    pub fn refill_per_second(mut self, rate: f64) -> Self {
        self.refill_per_second = rate;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn cors_allow_origin(mut self, origin: &str) -> Self {
        self.cors_allow_origin = origin.to_string();
        self
    }

    /// Use this limiter instead of a token bucket.
    pub fn rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn build(self) -> PipelineHarness {
        let token_service = Arc::new(TokenService::new(TokenConfig {
            secret: SecretString::from(TEST_JWT_SECRET.to_string()),
            issuer: "admission".to_string(),
            default_ttl: chrono::Duration::hours(1),
            clock_skew: Duration::from_secs(300),
        }));
        let rate_limiter = self.rate_limiter.unwrap_or_else(|| {
            Arc::new(TokenBucket::new(TokenBucketConfig {
                capacity: self.burst,
                refill_per_second: self.refill_per_second,
            }))
        });

        let pipeline = Pipeline::new(
            token_service,
            rate_limiter,
            &PipelineConfig {
                request_timeout: self.request_timeout,
                max_body_bytes: self.max_body_bytes,
                cors_allow_origin: self.cors_allow_origin,
            },
        )
        .expect("valid CORS origin")
        .with_stage_order(self.order);

        let routes = Router::new()
            .route("/whoami", get(whoami))
            .route("/echo", post(echo))
            .route("/slow", get(slow))
            .route("/panic", get(panics));

        PipelineHarness {
            router: pipeline.apply(routes),
        }
    }
}

async fn whoami(Extension(context): Extension<RequestContext>) -> Json<Value> {
    Json(json!({
        "request_id": context.request_id(),
        "user_id": context.identity().map(|identity| identity.user_id.clone()),
        "has_deadline": context.deadline().is_some(),
    }))
}

async fn echo(body: Bytes) -> Json<Value> {
    Json(json!({ "length": body.len() }))
}

async fn slow() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(3600)).await;
    StatusCode::OK
}

async fn panics() -> StatusCode {
    panic!("handler exploded");
}
