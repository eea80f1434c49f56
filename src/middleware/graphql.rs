//! GraphQL-style operation metadata.
//!
//! POST bodies carrying an `operationName` are logged with the operation
//! name and, depending on the [`VariablesLimit`], their variables.

use http::Method;
use serde_json::{json, Value};

/// Variables limit used when none is configured.
pub const DEFAULT_MAX_VARIABLES_LENGTH: usize = 512;

/// How much of an operation's variables is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariablesLimit {
    /// Log variables in full.
    Unlimited,
    /// Never log variables.
    Omit,
    /// Log variables whose JSON encoding fits in `n` characters; longer
    /// encodings are cut to `n` characters and marked as truncated.
    Truncate(usize),
}

impl Default for VariablesLimit {
    fn default() -> Self {
        VariablesLimit::Truncate(DEFAULT_MAX_VARIABLES_LENGTH)
    }
}

impl VariablesLimit {
    /// Negative means unlimited, zero means omit, positive truncates.
    pub fn from_raw(max_length: i64) -> Self {
        match max_length {
            n if n < 0 => VariablesLimit::Unlimited,
            0 => VariablesLimit::Omit,
            n => VariablesLimit::Truncate(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }

    /// Variables as they should appear in the record, or `None` to omit.
    pub fn apply(&self, variables: Option<&Value>) -> Option<Value> {
        let variables = variables?;

        match self {
            VariablesLimit::Unlimited => Some(variables.clone()),
            VariablesLimit::Omit => None,
            VariablesLimit::Truncate(max) => {
                let encoded = variables.to_string();
                if encoded.chars().count() > *max {
                    let prefix: String = encoded.chars().take(*max).collect();
                    Some(Value::String(format!(
                        "{} […] max payload length reached ({} chars)",
                        prefix, max
                    )))
                } else {
                    Some(variables.clone())
                }
            }
        }
    }
}

/// Operation name and (possibly truncated) variables.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQLMeta {
    pub operation_name: String,
    pub variables: Option<Value>,
}

impl GraphQLMeta {
    /// Detect an operation in a request. Only POST bodies with a non-empty
    /// string `operationName` qualify.
    pub fn from_request(method: &Method, body: Option<&Value>, limit: VariablesLimit) -> Option<Self> {
        if method != Method::POST {
            return None;
        }

        let body = body?;
        let operation_name = body
            .get("operationName")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())?;

        Some(Self {
            operation_name: operation_name.to_string(),
            variables: limit.apply(body.get("variables")),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut out = json!({ "operationName": self.operation_name });
        if let (Some(variables), Some(obj)) = (&self.variables, out.as_object_mut()) {
            obj.insert("variables".to_string(), variables.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Value {
        json!({
            "operationName": "createPizza",
            "mutation": "mutation createPizza($pizza: PizzaInput!) { createPizza(pizza: $pizza) { publicId } }",
            "variables": {"pizza": {"toppings": ["salami"]}}
        })
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(VariablesLimit::from_raw(-1), VariablesLimit::Unlimited);
        assert_eq!(VariablesLimit::from_raw(-40), VariablesLimit::Unlimited);
        assert_eq!(VariablesLimit::from_raw(0), VariablesLimit::Omit);
        assert_eq!(VariablesLimit::from_raw(10), VariablesLimit::Truncate(10));
        assert_eq!(VariablesLimit::default(), VariablesLimit::Truncate(512));
    }

    #[test]
    fn test_small_variables_kept() {
        let meta = GraphQLMeta::from_request(&Method::POST, Some(&payload()), VariablesLimit::default()).unwrap();
        assert_eq!(
            meta.to_value(),
            json!({"operationName": "createPizza", "variables": {"pizza": {"toppings": ["salami"]}}})
        );
    }

    #[test]
    fn test_truncated_variables() {
        let meta = GraphQLMeta::from_request(&Method::POST, Some(&payload()), VariablesLimit::Truncate(10)).unwrap();
        assert_eq!(
            meta.variables,
            Some(json!("{\"pizza\":{ […] max payload length reached (10 chars)"))
        );
    }

    #[test]
    fn test_exact_length_not_truncated() {
        let vars = json!({"a": 1});
        let len = vars.to_string().chars().count();
        assert_eq!(VariablesLimit::Truncate(len).apply(Some(&vars)), Some(vars));
    }

    #[test]
    fn test_omit_and_unlimited() {
        let omitted = GraphQLMeta::from_request(&Method::POST, Some(&payload()), VariablesLimit::Omit).unwrap();
        assert_eq!(omitted.variables, None);
        assert_eq!(omitted.to_value(), json!({"operationName": "createPizza"}));

        let big = json!({"operationName": "op", "variables": {"blob": "x".repeat(2000)}});
        let full = GraphQLMeta::from_request(&Method::POST, Some(&big), VariablesLimit::Unlimited).unwrap();
        assert_eq!(full.variables, Some(big["variables"].clone()));
    }

    #[test]
    fn test_requires_post_and_operation_name() {
        assert!(GraphQLMeta::from_request(&Method::GET, Some(&payload()), VariablesLimit::default()).is_none());
        assert!(GraphQLMeta::from_request(&Method::POST, Some(&json!({"query": "{ a }"})), VariablesLimit::default()).is_none());
        assert!(GraphQLMeta::from_request(&Method::POST, Some(&json!({"operationName": ""})), VariablesLimit::default()).is_none());
        assert!(GraphQLMeta::from_request(&Method::POST, None, VariablesLimit::default()).is_none());
    }

    #[test]
    fn test_missing_variables_omitted() {
        let meta = GraphQLMeta::from_request(
            &Method::POST,
            Some(&json!({"operationName": "ping"})),
            VariablesLimit::default(),
        )
        .unwrap();
        assert_eq!(meta.variables, None);
    }
}
