//! Header redaction.
//!
//! Values of sensitive headers are replaced with a fixed mask before they
//! reach a log record.

use http::HeaderMap;
use serde_json::Value;

use crate::format::Fields;

/// Header names whose values are masked. Matching is exact.
pub const MASKED_HEADERS: &[&str] = &["Cookie", "cookie", "Authorization", "authorization"];

/// Replacement for masked header values.
pub const MASKED_HEADER_VALUE: &str = "*****";

/// Set of header names mapped to a mask value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionRule {
    names: Vec<String>,
    mask: String,
}

impl Default for RedactionRule {
    fn default() -> Self {
        Self::new(MASKED_HEADERS, MASKED_HEADER_VALUE)
    }
}

impl RedactionRule {
    pub fn new(names: &[&str], mask: &str) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            mask: mask.to_string(),
        }
    }

    pub fn mask(&self) -> &str {
        &self.mask
    }

    pub fn matches(&self, header: &str) -> bool {
        self.names.iter().any(|n| n == header)
    }

    pub fn apply<'a>(&'a self, header: &str, value: &'a str) -> &'a str {
        if self.matches(header) {
            &self.mask
        } else {
            value
        }
    }

    /// Headers as a name-to-value object with masked values replaced.
    /// Repeated headers are joined with `", "`.
    pub fn redact_headers(&self, headers: &HeaderMap) -> Fields {
        let mut out = Fields::new();
        for name in headers.keys() {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            let value = self.apply(name.as_str(), &joined).to_string();
            out.insert(name.as_str().to_string(), Value::String(value));
        }
        out
    }
}
