//! Observed request and response data.

use http::{HeaderMap, Method, StatusCode, Version};
use serde_json::Value;

use crate::format::Fields;

/// What the middleware sees of a request.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    /// Path and query as received.
    pub original_url: String,
    pub version: Version,
    pub headers: HeaderMap,
    /// Parsed JSON body, if any. Never logged directly.
    pub body: Option<Value>,
}

impl RequestInfo {
    pub fn new(method: Method, original_url: &str) -> Self {
        Self {
            method,
            original_url: original_url.to_string(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Capture method, URL, version and headers of an `http` request.
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        let original_url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        Self {
            method: parts.method.clone(),
            original_url,
            version: parts.version,
            headers: parts.headers.clone(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Parse `bytes` as the JSON body; non-JSON bodies are dropped.
    pub fn with_raw_body(mut self, bytes: &[u8]) -> Self {
        self.body = serde_json::from_slice(bytes).ok();
        self
    }

    pub fn path(&self) -> &str {
        self.original_url
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(&self.original_url)
    }

    /// Query string pairs, percent-decoded. Later duplicates win.
    pub fn query(&self) -> Fields {
        let mut out = Fields::new();
        if let Some((_, query)) = self.original_url.split_once('?') {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                out.insert(key.into_owned(), Value::String(value.into_owned()));
            }
        }
        out
    }

    pub fn http_version(&self) -> &'static str {
        if self.version == Version::HTTP_09 {
            "0.9"
        } else if self.version == Version::HTTP_10 {
            "1.0"
        } else if self.version == Version::HTTP_2 {
            "2.0"
        } else if self.version == Version::HTTP_3 {
            "3.0"
        } else {
            "1.1"
        }
    }
}

/// What the middleware sees of a response.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ResponseInfo {
    pub fn new(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Parse `bytes` as the JSON body; non-JSON bodies are dropped.
    pub fn with_raw_body(mut self, bytes: &[u8]) -> Self {
        self.body = serde_json::from_slice(bytes).ok();
        self
    }

    /// The body, only when it carries a non-empty `errors` list.
    pub fn error_body(&self) -> Option<&Value> {
        let body = self.body.as_ref()?;
        match body.get("errors") {
            Some(Value::Array(errors)) if !errors.is_empty() => Some(body),
            _ => None,
        }
    }
}
