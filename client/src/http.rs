//! reqwest-backed [`Transport`] implementation.
//!
//! Renders [`RequestAuth`] attachments as headers: a token becomes
//! `Authorization: Bearer ...`; a proof becomes the `signature` /
//! `publickey` / `message` / `timestamp` header quad, signature and key in
//! base58, timestamp in Unix milliseconds.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use url::Url;

use jailpool_auth::{
    ApiRequest, ApiResponse, Method, ReplyStream, RequestAuth, Transport, TransportError,
};

use crate::error::ClientError;

/// Default timeout for buffered requests.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP transport against one API base URL.
///
/// Buffered requests carry an overall timeout. A reply stream is open-ended
/// as a whole, but each individual chunk read is bounded by the same
/// timeout so a stalled server cannot park the consumer forever.
pub struct HttpTransport {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with default timeout settings.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with a custom buffered-request timeout.
    pub fn with_timeout(base_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid base url: {e}")))?;
        // A trailing slash makes Url::join treat the last segment as a
        // directory, so "/api" keeps its prefix when paths are joined.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http_client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self {
            http_client,
            base_url,
            request_timeout,
        })
    }

    fn build(
        &self,
        request: &ApiRequest,
        auth: &RequestAuth,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| TransportError::RequestFailed(format!("invalid path: {e}")))?;

        let mut builder = match request.method {
            Method::Get => self.http_client.get(url),
            Method::Post => self.http_client.post(url),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = match auth {
            RequestAuth::None => builder,
            RequestAuth::Token(credential) => builder.header("Authorization", credential.bearer()),
            RequestAuth::Proof(proof) => builder
                .header("signature", proof.signature.to_base58())
                .header("publickey", proof.identity.to_base58())
                .header("message", proof.message.clone())
                .header("timestamp", proof.timestamp.as_millis().to_string()),
        };
        Ok(builder)
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Unreachable(format!("request timed out: {e}"))
    } else if e.is_connect() {
        TransportError::Unreachable(format!("connection failed: {e}"))
    } else {
        TransportError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: ApiRequest,
        auth: RequestAuth,
    ) -> Result<ApiResponse, TransportError> {
        let response = self
            .build(&request, &auth)?
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        let body = if text.is_empty() {
            serde_json::Value::Null
        } else {
            // Error bodies are not always JSON; keep the raw text so the
            // caller can still report it.
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
        };
        Ok(ApiResponse { status, body })
    }

    async fn execute_streaming(
        &self,
        request: ApiRequest,
        auth: RequestAuth,
    ) -> Result<Box<dyn ReplyStream>, TransportError> {
        let response = self
            .build(&request, &auth)?
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                code: status.as_u16(),
                message,
            });
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| match chunk {
                Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) => Err(TransportError::RequestFailed(e.to_string())),
            })
            .boxed();
        Ok(Box::new(HttpReplyStream {
            chunks,
            chunk_timeout: self.request_timeout,
        }))
    }
}

struct HttpReplyStream {
    chunks: BoxStream<'static, Result<String, TransportError>>,
    /// Deadline for each individual chunk read, not the stream as a whole.
    chunk_timeout: Duration,
}

#[async_trait]
impl ReplyStream for HttpReplyStream {
    async fn next_chunk(&mut self) -> Result<Option<String>, TransportError> {
        match tokio::time::timeout(self.chunk_timeout, self.chunks.next()).await {
            Ok(chunk) => chunk.transpose(),
            Err(_) => Err(TransportError::Unreachable(format!(
                "no stream chunk within {:?}",
                self.chunk_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_its_path_prefix() {
        let transport = HttpTransport::new("https://jailpool.example/api").unwrap();
        let joined = transport.base_url.join("challenge/alcatraz").unwrap();
        assert_eq!(
            joined.as_str(),
            "https://jailpool.example/api/challenge/alcatraz"
        );
    }

    #[test]
    fn invalid_base_url_rejected() {
        assert!(matches!(
            HttpTransport::new("not a url"),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn stalled_stream_chunk_read_times_out() {
        let mut stream = HttpReplyStream {
            chunks: futures_util::stream::pending().boxed(),
            chunk_timeout: Duration::from_millis(10),
        };
        let err = stream.next_chunk().await.unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
    }
}
