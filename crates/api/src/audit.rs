//! Per-request outcome records.
//!
//! The outermost layer of the router. It opens the request's
//! [`IdentityContext`] scope, times the call and emits exactly one
//! [`OutcomeRecord`] to the configured [`OutcomeSink`], whatever inner layer
//! produced the response.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use gatekeeper_auth::{
    IdentityContext, KEY_USER_ID, OperationRegistry, TemplateField, TemplateValues, render_template,
};
use gatekeeper_core::SecurityError;

use crate::app::errors::Rejection;
use crate::authz::OperationTag;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allowed,
    Unauthenticated,
    Denied,
    Error,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Unauthenticated => "unauthenticated",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }

    /// Classify a finished request. A pipeline rejection wins over the status.
    pub fn classify(status: StatusCode, rejection: Option<&SecurityError>) -> Self {
        match rejection {
            Some(SecurityError::PermissionDenied(_)) => Self::Denied,
            Some(SecurityError::Internal(_)) => Self::Error,
            Some(_) => Self::Unauthenticated,
            None if status == StatusCode::UNAUTHORIZED => Self::Unauthenticated,
            None if status == StatusCode::FORBIDDEN => Self::Denied,
            None if status.is_server_error() => Self::Error,
            None => Self::Allowed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    pub request_id: Uuid,
    pub method: String,
    pub path: String,
    pub operation: Option<String>,
    pub subject: Option<String>,
    pub user_id: Option<i64>,
    pub outcome: Outcome,
    pub status: u16,
    pub latency_ms: u64,
    pub description: Option<String>,
}

/// Consumer of request outcome records.
pub trait OutcomeSink: Send + Sync {
    fn record(&self, record: OutcomeRecord);
}

/// Writes every record as a structured event on `gatekeeper::outcome`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingOutcomeSink;

impl OutcomeSink for TracingOutcomeSink {
    fn record(&self, record: OutcomeRecord) {
        tracing::info!(
            target: "gatekeeper::outcome",
            request_id = %record.request_id,
            method = %record.method,
            path = %record.path,
            operation = record.operation.as_deref(),
            subject = record.subject.as_deref(),
            user_id = record.user_id,
            outcome = record.outcome.as_str(),
            status = record.status,
            latency_ms = record.latency_ms,
            description = record.description.as_deref(),
            "request outcome"
        );
    }
}

/// Keeps records in memory (tests, local inspection).
#[derive(Debug, Default)]
pub struct InMemoryOutcomeSink {
    records: Mutex<Vec<OutcomeRecord>>,
}

impl InMemoryOutcomeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl OutcomeSink for InMemoryOutcomeSink {
    fn record(&self, record: OutcomeRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

#[derive(Clone)]
pub struct AuditState {
    pub sink: Arc<dyn OutcomeSink>,
    pub registry: Arc<OperationRegistry>,
}

pub async fn audit_middleware(
    State(state): State<AuditState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let request_id = inbound_request_id(req.headers()).unwrap_or_else(Uuid::now_v7);
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let ctx = IdentityContext::new();
    let (mut response, subject, user_id) = ctx
        .clone()
        .scope(async {
            let response = next.run(req).await;
            let user_id = ctx.get(KEY_USER_ID).and_then(|v| v.trim().parse::<i64>().ok());
            (response, ctx.subject(), user_id)
        })
        .await;

    let operation = response
        .extensions()
        .get::<OperationTag>()
        .map(|tag| tag.0.clone());
    let rejection = response.extensions().get::<Rejection>().map(|r| &r.0);
    let outcome = Outcome::classify(response.status(), rejection);

    let description = operation
        .as_deref()
        .and_then(|op| state.registry.get(op).ok())
        .and_then(|policy| policy.description.as_deref())
        .map(|template| {
            let mut values = TemplateValues::new()
                .with(TemplateField::Method, &method)
                .with(TemplateField::Path, &path)
                .with(TemplateField::Outcome, outcome.as_str());
            if let Some(op) = &operation {
                values = values.with(TemplateField::Operation, op);
            }
            if let Some(subject) = &subject {
                values = values.with(TemplateField::Subject, subject);
            }
            if let Some(user_id) = user_id {
                values = values.with(TemplateField::UserId, user_id);
            }
            render_template(template, &values)
        });

    let record = OutcomeRecord {
        request_id,
        method,
        path,
        operation,
        subject,
        user_id,
        outcome,
        status: response.status().as_u16(),
        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        description,
    };
    state.sink.record(record);

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// A caller-supplied request id is kept when it is a well-formed UUID.
fn inbound_request_id(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    Uuid::parse_str(value.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_kind_decides_outcome() {
        assert_eq!(
            Outcome::classify(StatusCode::UNAUTHORIZED, Some(&SecurityError::ExpiredToken)),
            Outcome::Unauthenticated
        );
        assert_eq!(
            Outcome::classify(
                StatusCode::FORBIDDEN,
                Some(&SecurityError::permission_denied("order:write"))
            ),
            Outcome::Denied
        );
        assert_eq!(
            Outcome::classify(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(&SecurityError::internal("lookup timed out"))
            ),
            Outcome::Error
        );
    }

    #[test]
    fn status_decides_without_rejection() {
        assert_eq!(Outcome::classify(StatusCode::OK, None), Outcome::Allowed);
        assert_eq!(Outcome::classify(StatusCode::NOT_FOUND, None), Outcome::Allowed);
        assert_eq!(Outcome::classify(StatusCode::BAD_GATEWAY, None), Outcome::Error);
    }

    #[test]
    fn inbound_request_id_is_reused_when_valid() {
        let id = Uuid::now_v7();
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(inbound_request_id(&headers), Some(id));

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_eq!(inbound_request_id(&headers), None);
        assert_eq!(inbound_request_id(&HeaderMap::new()), None);
    }

    #[test]
    fn in_memory_sink_collects() {
        let sink = InMemoryOutcomeSink::new();
        sink.record(OutcomeRecord {
            request_id: Uuid::now_v7(),
            method: "GET".into(),
            path: "/health".into(),
            operation: None,
            subject: None,
            user_id: None,
            outcome: Outcome::Allowed,
            status: 200,
            latency_ms: 0,
            description: None,
        });
        assert_eq!(sink.records().len(), 1);
        sink.clear();
        assert!(sink.records().is_empty());
    }
}
