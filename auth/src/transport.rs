//! The transport seam: every outbound call in the pipeline is expressed as
//! an [`ApiRequest`] plus a [`RequestAuth`] attachment and handed to a
//! [`Transport`] implementation.
//!
//! The production implementation (`jailpool-client`) maps these onto HTTP;
//! tests script responses through a nullable transport instead.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use jailpool_types::{SessionCredential, SignedAuthProof};

/// Transport-level failures, before any protocol interpretation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    /// A non-success status on a streaming request, where no
    /// [`ApiResponse`] exists to carry the code.
    #[error("request rejected with status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// HTTP-ish request method. Only the verbs the pipeline uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound call: method, path (with query string), optional JSON body.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Extra headers beyond the auth attachment (e.g. `address` on verify).
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Authentication material attached to a request.
///
/// The transport is responsible for rendering this as headers:
/// a token becomes `Authorization: Bearer ...`, a proof becomes the
/// `signature` / `publickey` / `message` / `timestamp` header quad.
#[derive(Debug)]
pub enum RequestAuth {
    /// Unauthenticated (the challenge poll).
    None,
    /// A cached or freshly exchanged session credential.
    Token(SessionCredential),
    /// A one-shot signed proof (the token exchange itself).
    Proof(SignedAuthProof),
}

/// A completed (non-streamed) response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the server rejected the credential or proof.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    /// Deserialize the body into a typed response.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

/// A lazy, finite, non-restartable sequence of reply text chunks.
#[async_trait]
pub trait ReplyStream: Send {
    /// The next chunk, or `None` once the stream is complete.
    async fn next_chunk(&mut self) -> Result<Option<String>, TransportError>;
}

/// Abstract transport for all pipeline calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and buffer the full response.
    async fn execute(
        &self,
        request: ApiRequest,
        auth: RequestAuth,
    ) -> Result<ApiResponse, TransportError>;

    /// Execute a request whose response body is streamed incrementally.
    async fn execute_streaming(
        &self,
        request: ApiRequest,
        auth: RequestAuth,
    ) -> Result<Box<dyn ReplyStream>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_unauthorized_classification() {
        let ok = ApiResponse {
            status: 200,
            body: serde_json::json!({}),
        };
        assert!(ok.is_success());
        assert!(!ok.is_unauthorized());

        let rejected = ApiResponse {
            status: 401,
            body: serde_json::json!({"error": "Invalid signature"}),
        };
        assert!(!rejected.is_success());
        assert!(rejected.is_unauthorized());
    }

    #[test]
    fn typed_body_deserialization() {
        #[derive(serde::Deserialize)]
        struct TokenBody {
            token: String,
        }
        let resp = ApiResponse {
            status: 200,
            body: serde_json::json!({"token": "jwt-abc"}),
        };
        let body: TokenBody = resp.json().unwrap();
        assert_eq!(body.token, "jwt-abc");
    }

    #[test]
    fn request_builders() {
        let req = ApiRequest::post("/auth/token", serde_json::json!({}))
            .with_header("address", "abc");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.headers, vec![("address".into(), "abc".into())]);
    }
}
