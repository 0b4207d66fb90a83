//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Response};
use serde::Serialize;

/// Body of every error response: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

/// A status code and JSON body, independent of the Lambda runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

impl ApiReply {
    /// Pretty-printed (2-space) JSON body.
    pub fn json<T: Serialize + ?Sized>(status: u16, data: &T) -> crate::Result<Self> {
        Ok(Self {
            status,
            body: serde_json::to_string_pretty(data)?,
        })
    }

    pub fn error(status: u16, message: &str) -> Self {
        let body = serde_json::to_string(&ErrorBody { error: message })
            .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());
        Self { status, body }
    }
}

/// Turn a reply into a Lambda HTTP response.
pub fn into_response(reply: ApiReply) -> Result<Response<Body>, lambda_http::Error> {
    let response = Response::builder()
        .status(reply.status)
        .header("content-type", "application/json")
        .body(Body::from(reply.body))
        .map_err(Box::new)?;
    Ok(response)
}

/// Create an error response with the given status code and message.
pub fn error_response(status: u16, message: &str) -> Result<Response<Body>, lambda_http::Error> {
    into_response(ApiReply::error(status, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_reply_is_pretty_printed() {
        let reply = ApiReply::json(200, &json!([{"title": "Potluck"}])).unwrap();
        assert_eq!(reply.body, "[\n  {\n    \"title\": \"Potluck\"\n  }\n]");
    }

    #[test]
    fn test_error_reply_shape() {
        let reply = ApiReply::error(404, "Events table not found");
        assert_eq!(reply.status, 404);
        assert_eq!(reply.body, r#"{"error":"Events table not found"}"#);
    }

    #[test]
    fn test_into_response_sets_content_type() {
        let response = error_response(400, "Event ID is required").unwrap();
        assert_eq!(response.status(), 400);
        assert_eq!(response.headers()["content-type"], "application/json");
        match response.body() {
            Body::Text(text) => assert_eq!(text, r#"{"error":"Event ID is required"}"#),
            other => panic!("unexpected body: {:?}", other),
        }
    }
}
