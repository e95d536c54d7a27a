//! Nullable transport. Scripted responses, recorded requests, no sockets.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use jailpool_auth::{
    ApiRequest, ApiResponse, Method, ReplyStream, RequestAuth, Transport, TransportError,
};

/// One call the transport saw, with the auth attachment flattened for
/// assertions.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// `"none"`, `"token:<token>"`, or `"proof:<base58 identity>"`.
    pub auth: String,
}

enum ScriptedOutcome {
    Response(ApiResponse),
    Error(TransportError),
    Stream(Vec<Result<String, TransportError>>),
    GatedStream {
        first: String,
        rest: Vec<String>,
        gate: tokio::sync::oneshot::Receiver<()>,
    },
    StreamRejected(TransportError),
}

/// Handle releasing the held tail of a gated stream.
pub struct StreamGate(tokio::sync::oneshot::Sender<()>);

impl StreamGate {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

/// A scripted transport keyed by path prefix.
///
/// Each matching call pops the oldest outcome scripted for its prefix; a
/// call with nothing scripted panics, which in a test is the right failure.
pub struct NullTransport {
    scripted: Mutex<Vec<(String, VecDeque<ScriptedOutcome>)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Script a buffered response for calls whose path starts with `prefix`.
    pub fn enqueue(&self, prefix: &str, response: ApiResponse) {
        self.push_outcome(prefix, ScriptedOutcome::Response(response));
    }

    /// Script a buffered JSON response with the given status.
    pub fn enqueue_json(&self, prefix: &str, status: u16, body: serde_json::Value) {
        self.enqueue(prefix, ApiResponse { status, body });
    }

    /// Script a transport-level failure.
    pub fn enqueue_error(&self, prefix: &str, error: TransportError) {
        self.push_outcome(prefix, ScriptedOutcome::Error(error));
    }

    /// Script a successful stream delivering `chunks` in order.
    pub fn enqueue_stream(&self, prefix: &str, chunks: &[&str]) {
        let chunks = chunks.iter().map(|c| Ok(c.to_string())).collect();
        self.push_outcome(prefix, ScriptedOutcome::Stream(chunks));
    }

    /// Script a stream that delivers `chunks` and then fails.
    pub fn enqueue_broken_stream(&self, prefix: &str, chunks: &[&str], error: TransportError) {
        let mut scripted: Vec<Result<String, TransportError>> =
            chunks.iter().map(|c| Ok(c.to_string())).collect();
        scripted.push(Err(error));
        self.push_outcome(prefix, ScriptedOutcome::Stream(scripted));
    }

    /// Script a stream that delivers `first`, then holds `rest` until the
    /// returned gate is released. Lets a test act while a reply is
    /// mid-stream.
    pub fn enqueue_gated_stream(&self, prefix: &str, first: &str, rest: &[&str]) -> StreamGate {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.push_outcome(
            prefix,
            ScriptedOutcome::GatedStream {
                first: first.to_string(),
                rest: rest.iter().map(|c| c.to_string()).collect(),
                gate: rx,
            },
        );
        StreamGate(tx)
    }

    /// Script a streaming request rejected before any chunk arrives.
    pub fn enqueue_stream_rejection(&self, prefix: &str, error: TransportError) {
        self.push_outcome(prefix, ScriptedOutcome::StreamRejected(error));
    }

    /// All calls seen so far (for assertions).
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("null transport poisoned").clone()
    }

    /// Calls seen against one path prefix.
    pub fn requests_to(&self, prefix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(prefix))
            .collect()
    }

    fn push_outcome(&self, prefix: &str, outcome: ScriptedOutcome) {
        let mut scripted = self.scripted.lock().expect("null transport poisoned");
        if let Some((_, queue)) = scripted.iter_mut().find(|(p, _)| p == prefix) {
            queue.push_back(outcome);
        } else {
            scripted.push((prefix.to_string(), VecDeque::from([outcome])));
        }
    }

    fn record(&self, request: &ApiRequest, auth: &RequestAuth) {
        let auth = match auth {
            RequestAuth::None => "none".to_string(),
            RequestAuth::Token(credential) => format!("token:{}", credential.token),
            RequestAuth::Proof(proof) => format!("proof:{}", proof.identity.to_base58()),
        };
        self.requests
            .lock()
            .expect("null transport poisoned")
            .push(RecordedRequest {
                method: request.method,
                path: request.path.clone(),
                body: request.body.clone(),
                auth,
            });
    }

    fn take_outcome(&self, path: &str) -> ScriptedOutcome {
        let mut scripted = self.scripted.lock().expect("null transport poisoned");
        scripted
            .iter_mut()
            .find(|(prefix, queue)| path.starts_with(prefix.as_str()) && !queue.is_empty())
            .and_then(|(_, queue)| queue.pop_front())
            .unwrap_or_else(|| panic!("no scripted outcome for {path}"))
    }
}

impl Default for NullTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for NullTransport {
    async fn execute(
        &self,
        request: ApiRequest,
        auth: RequestAuth,
    ) -> Result<ApiResponse, TransportError> {
        self.record(&request, &auth);
        match self.take_outcome(&request.path) {
            ScriptedOutcome::Response(response) => Ok(response),
            ScriptedOutcome::Error(error) => Err(error),
            _ => panic!("scripted a stream for buffered call to {}", request.path),
        }
    }

    async fn execute_streaming(
        &self,
        request: ApiRequest,
        auth: RequestAuth,
    ) -> Result<Box<dyn ReplyStream>, TransportError> {
        self.record(&request, &auth);
        match self.take_outcome(&request.path) {
            ScriptedOutcome::Stream(chunks) => Ok(Box::new(NullReplyStream::scripted(chunks))),
            ScriptedOutcome::GatedStream { first, rest, gate } => Ok(Box::new(GatedReplyStream {
                first: Some(first),
                gate: Some(gate),
                rest: rest.into(),
            })),
            ScriptedOutcome::StreamRejected(error) => Err(error),
            _ => panic!("scripted a buffered response for stream call to {}", request.path),
        }
    }
}

/// A reply stream that yields scripted chunks.
pub struct NullReplyStream {
    chunks: VecDeque<Result<String, TransportError>>,
}

impl NullReplyStream {
    pub fn of(chunks: &[&str]) -> Self {
        Self::scripted(chunks.iter().map(|c| Ok(c.to_string())).collect())
    }

    fn scripted(chunks: Vec<Result<String, TransportError>>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

struct GatedReplyStream {
    first: Option<String>,
    gate: Option<tokio::sync::oneshot::Receiver<()>>,
    rest: VecDeque<String>,
}

#[async_trait]
impl ReplyStream for GatedReplyStream {
    async fn next_chunk(&mut self) -> Result<Option<String>, TransportError> {
        if let Some(first) = self.first.take() {
            return Ok(Some(first));
        }
        if let Some(gate) = self.gate.take() {
            // A dropped gate counts as released.
            let _ = gate.await;
        }
        Ok(self.rest.pop_front())
    }
}

#[async_trait]
impl ReplyStream for NullReplyStream {
    async fn next_chunk(&mut self) -> Result<Option<String>, TransportError> {
        match self.chunks.pop_front() {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}
