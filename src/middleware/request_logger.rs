//! Request logging.
//!
//! One record per exchange. The level follows the response status:
//! - 5xx -> most severe level
//! - 4xx -> second most severe level
//! - anything else -> fourth most severe level
//!
//! Metadata carries the request (with redacted headers, never the body), the
//! status, the response time, the middleware's logger name, GraphQL operation
//! details, and the response body only when it reports errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::StatusCode;
use serde_json::{json, Value};

use crate::error::Result;
use crate::format::{Fields, LOGGER_NAME_KEY};
use crate::logger::Logger;

use super::exchange::{RequestInfo, ResponseInfo};
use super::graphql::{GraphQLMeta, VariablesLimit};
use super::redact::RedactionRule;

/// Logger name attached to every request record.
pub const MIDDLEWARE_LOGGER_NAME: &str = "http";

const SERVER_ERROR_FALLBACK: &str = "ERROR";
const CLIENT_ERROR_FALLBACK: &str = "WARN";
const SUCCESS_FALLBACK: &str = "DEBUG";

/// Emits one record per request/response exchange.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    logger: Arc<Logger>,
    variables_limit: VariablesLimit,
    redaction: RedactionRule,
}

impl RequestLogger {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            logger,
            variables_limit: VariablesLimit::default(),
            redaction: RedactionRule::default(),
        }
    }

    pub fn with_variables_limit(mut self, limit: VariablesLimit) -> Self {
        self.variables_limit = limit;
        self
    }

    pub fn with_redaction(mut self, rule: RedactionRule) -> Self {
        self.redaction = rule;
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn variables_limit(&self) -> VariablesLimit {
        self.variables_limit
    }

    /// Level name for a response status.
    pub fn level_for_status(&self, status: StatusCode) -> String {
        let registry = self.logger.registry();
        let code = status.as_u16();
        if code >= 500 {
            registry.descending_name_or(0, SERVER_ERROR_FALLBACK)
        } else if code >= 400 {
            registry.descending_name_or(1, CLIENT_ERROR_FALLBACK)
        } else {
            registry.descending_name_or(3, SUCCESS_FALLBACK)
        }
    }

    /// Begin timing a request.
    pub fn start(&self, request: RequestInfo) -> InFlightRequest {
        InFlightRequest {
            middleware: self.clone(),
            request,
            started_at: Instant::now(),
        }
    }

    /// Log a completed exchange that took `elapsed`.
    pub fn log_exchange(
        &self,
        request: &RequestInfo,
        response: &ResponseInfo,
        elapsed: Duration,
    ) -> Result<()> {
        let level = self.level_for_status(response.status);
        let message = format!("HTTP {} {}", request.method, request.original_url);
        let meta = self.build_meta(request, response, elapsed);

        self.logger.log_with_fields(&level, &message, meta)
    }

    /// Metadata for one exchange.
    pub fn build_meta(
        &self,
        request: &RequestInfo,
        response: &ResponseInfo,
        elapsed: Duration,
    ) -> Fields {
        let mut req = Fields::new();
        req.insert("url".to_string(), json!(request.original_url));
        req.insert(
            "headers".to_string(),
            Value::Object(self.redaction.redact_headers(&request.headers)),
        );
        req.insert("method".to_string(), json!(request.method.as_str()));
        req.insert("httpVersion".to_string(), json!(request.http_version()));
        req.insert("originalUrl".to_string(), json!(request.original_url));
        req.insert("query".to_string(), Value::Object(request.query()));

        let mut res = Fields::new();
        res.insert("statusCode".to_string(), json!(response.status.as_u16()));
        if let Some(body) = response.error_body() {
            res.insert("body".to_string(), body.clone());
        }

        let mut meta = Fields::new();
        meta.insert("req".to_string(), Value::Object(req));
        meta.insert("res".to_string(), Value::Object(res));
        meta.insert(
            "responseTime".to_string(),
            json!(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)),
        );
        meta.insert(LOGGER_NAME_KEY.to_string(), json!(MIDDLEWARE_LOGGER_NAME));

        if let Some(graphql) =
            GraphQLMeta::from_request(&request.method, request.body.as_ref(), self.variables_limit)
        {
            meta.insert("graphql".to_string(), graphql.to_value());
        }

        meta
    }
}

/// A request being timed. Consumed by [`InFlightRequest::finish`], so each
/// request is logged at most once.
#[derive(Debug)]
pub struct InFlightRequest {
    middleware: RequestLogger,
    request: RequestInfo,
    started_at: Instant,
}

impl InFlightRequest {
    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Emit the record for this exchange.
    pub fn finish(self, response: ResponseInfo) -> Result<()> {
        let elapsed = self.elapsed();
        self.middleware
            .log_exchange(&self.request, &response, elapsed)
    }
}
