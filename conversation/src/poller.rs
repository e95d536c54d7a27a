//! Periodic challenge refresh.
//!
//! The poller is the only writer of [`ChallengeState`] and the only caller
//! of [`Transcript::accept_snapshot`]. It runs unauthenticated, so it works
//! before any wallet is connected.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::MissedTickBehavior;

use jailpool_auth::{ApiRequest, RequestAuth, Transport};
use jailpool_types::{
    ChallengeId, ChallengeName, ChallengeSnapshot, ChallengeStatus, ChatMessage, Timestamp,
};

use crate::error::ConversationError;
use crate::state::{ActiveIdentity, ChallengeState};
use crate::stream::StreamingFlag;
use crate::transcript::Transcript;

/// Matches the refresh cadence the server expects; the price query it sends
/// back lets the server skip the USD quote when nothing changed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Wire shape of one poll response.
#[derive(Debug, Deserialize)]
struct PollResponse {
    challenge: PollChallenge,
    #[serde(rename = "break_attempts")]
    break_attempts: u64,
    message_price: f64,
    prize: f64,
    #[serde(rename = "usdMessagePrice")]
    usd_message_price: f64,
    #[serde(rename = "usdPrize")]
    usd_prize: f64,
    expiry: Option<Timestamp>,
    #[serde(rename = "chatHistory", default)]
    chat_history: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct PollChallenge {
    #[serde(rename = "_id")]
    id: ChallengeId,
    name: ChallengeName,
    status: ChallengeStatus,
    #[serde(rename = "characterLimit")]
    character_limit: Option<usize>,
    #[serde(rename = "charactersPerWord")]
    characters_per_word: Option<usize>,
}

impl PollResponse {
    fn into_snapshot(self) -> (ChallengeSnapshot, Vec<ChatMessage>) {
        let snapshot = ChallengeSnapshot {
            id: self.challenge.id,
            name: self.challenge.name,
            status: self.challenge.status,
            message_price: self.message_price,
            prize: self.prize,
            usd_message_price: self.usd_message_price,
            usd_prize: self.usd_prize,
            break_attempts: self.break_attempts,
            expiry: self.expiry,
            character_limit: self.challenge.character_limit,
            characters_per_word: self.challenge.characters_per_word,
        };
        (snapshot, self.chat_history)
    }
}

/// Refreshes one challenge's metadata and transcript on a fixed cadence.
///
/// Clones share the same state cells, so one clone can run the loop while
/// another drives explicit ticks.
#[derive(Clone)]
pub struct ChallengePoller {
    transport: Arc<dyn Transport>,
    name: ChallengeName,
    state: ChallengeState,
    transcript: Transcript,
    streaming: StreamingFlag,
    identity: ActiveIdentity,
    interval: Duration,
}

impl ChallengePoller {
    pub fn new(
        transport: Arc<dyn Transport>,
        name: ChallengeName,
        state: ChallengeState,
        transcript: Transcript,
        streaming: StreamingFlag,
        identity: ActiveIdentity,
        interval: Duration,
    ) -> Self {
        Self {
            transport,
            name,
            state,
            transcript,
            streaming,
            identity,
            interval,
        }
    }

    /// One poll cycle.
    ///
    /// The challenge snapshot is always replaced. The transcript is only
    /// replaced when no reply is streaming, and (past the initial load)
    /// only when the server's last message is not the active identity's
    /// own, so a just-sent message is never clobbered by a stale poll.
    pub async fn tick(&self, initial: bool) -> Result<(), ConversationError> {
        let known_price = self
            .state
            .snapshot()
            .map(|s| s.message_price)
            .unwrap_or(0.0);
        let request = ApiRequest::get(format!(
            "/challenge/{}?initial={}&price={}",
            self.name, initial, known_price
        ));

        let response = self
            .transport
            .execute(request, RequestAuth::None)
            .await
            .map_err(|e| ConversationError::PollFailure(e.to_string()))?;
        if !response.is_success() {
            return Err(ConversationError::PollFailure(format!(
                "status {}",
                response.status
            )));
        }

        let (snapshot, chat_history) = response
            .json::<PollResponse>()
            .map_err(|e| ConversationError::PollFailure(e.to_string()))?
            .into_snapshot();

        self.state.replace(snapshot);

        if self.streaming.is_streaming() {
            tracing::trace!("reply streaming, transcript refresh skipped");
            return Ok(());
        }
        let identity = self.identity.current();
        self.transcript
            .accept_snapshot(chat_history, identity.as_ref(), initial);
        Ok(())
    }

    /// Poll until the task is dropped. Failures are logged and the cadence
    /// continues; `initial` semantics apply until the first success lands.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut initial = true;

        loop {
            ticker.tick().await;
            match self.tick(initial).await {
                Ok(()) => initial = false,
                Err(e) => {
                    tracing::warn!(challenge = %self.name, error = %e, "challenge poll failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jailpool_auth::{ApiResponse, ReplyStream, TransportError};
    use jailpool_types::PublicKey;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
        paths: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<ApiResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                paths: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(
            &self,
            request: ApiRequest,
            _auth: RequestAuth,
        ) -> Result<ApiResponse, TransportError> {
            self.paths.lock().unwrap().push(request.path);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }

        async fn execute_streaming(
            &self,
            _request: ApiRequest,
            _auth: RequestAuth,
        ) -> Result<Box<dyn ReplyStream>, TransportError> {
            unimplemented!("poller never streams")
        }
    }

    fn poll_body(last_address: Option<&str>) -> serde_json::Value {
        let history = match last_address {
            Some(addr) => serde_json::json!([
                {"role": "user", "content": "open sesame", "address": addr, "date": 1_000}
            ]),
            None => serde_json::json!([]),
        };
        serde_json::json!({
            "challenge": {
                "_id": "65a1",
                "name": "alcatraz",
                "status": "active",
                "characterLimit": 500,
                "charactersPerWord": null
            },
            "break_attempts": 7,
            "message_price": 0.05,
            "prize": 12.5,
            "usdMessagePrice": 4.2,
            "usdPrize": 1050.0,
            "expiry": 2_000_000,
            "chatHistory": history
        })
    }

    fn ok(body: serde_json::Value) -> Result<ApiResponse, TransportError> {
        Ok(ApiResponse { status: 200, body })
    }

    fn poller(transport: Arc<ScriptedTransport>) -> ChallengePoller {
        ChallengePoller::new(
            transport,
            ChallengeName::new("alcatraz"),
            ChallengeState::new(),
            Transcript::new(),
            StreamingFlag::new(),
            ActiveIdentity::new(),
            DEFAULT_POLL_INTERVAL,
        )
    }

    #[tokio::test]
    async fn tick_updates_state_and_transcript() {
        let transport = ScriptedTransport::new(vec![ok(poll_body(Some("somebody-else")))]);
        let p = poller(transport.clone());

        p.tick(true).await.unwrap();

        let snapshot = p.state.snapshot().unwrap();
        assert_eq!(snapshot.break_attempts, 7);
        assert_eq!(snapshot.message_price, 0.05);
        assert_eq!(p.transcript.messages().len(), 1);
        assert_eq!(
            transport.paths.lock().unwrap()[0],
            "/challenge/alcatraz?initial=true&price=0"
        );
    }

    #[tokio::test]
    async fn known_price_is_sent_back() {
        let transport = ScriptedTransport::new(vec![
            ok(poll_body(None)),
            ok(poll_body(None)),
        ]);
        let p = poller(transport.clone());

        p.tick(true).await.unwrap();
        p.tick(false).await.unwrap();

        assert_eq!(
            transport.paths.lock().unwrap()[1],
            "/challenge/alcatraz?initial=false&price=0.05"
        );
    }

    #[tokio::test]
    async fn streaming_suppresses_transcript_refresh_but_not_state() {
        let transport = ScriptedTransport::new(vec![ok(poll_body(Some("somebody-else")))]);
        let p = poller(transport);
        // Raise the flag the way production does: park a consumer on a
        // stream that will not finish until we let it.
        let flag = p.streaming.clone();
        let consumer = crate::stream::StreamConsumer::new(Transcript::new(), flag.clone());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        struct BlockingStream(Option<tokio::sync::oneshot::Receiver<()>>);
        #[async_trait]
        impl ReplyStream for BlockingStream {
            async fn next_chunk(&mut self) -> Result<Option<String>, TransportError> {
                if let Some(rx) = self.0.take() {
                    let _ = rx.await;
                }
                Ok(None)
            }
        }

        let streaming = tokio::spawn(async move {
            consumer.consume(Box::new(BlockingStream(Some(rx)))).await
        });
        tokio::task::yield_now().await;
        assert!(flag.is_streaming());

        p.tick(true).await.unwrap();

        assert!(p.state.snapshot().is_some());
        assert!(p.transcript.is_empty());

        tx.send(()).unwrap();
        streaming.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn own_last_message_is_not_clobbered() {
        let me = PublicKey([9; 32]);
        let transport =
            ScriptedTransport::new(vec![ok(poll_body(Some(me.address().as_str())))]);
        let p = poller(transport);
        p.identity.connect(me);
        p.transcript.push(ChatMessage::user(
            "open sesame",
            me.address(),
            Timestamp::new(1_000),
        ));
        p.transcript
            .append_assistant_chunk("no", Timestamp::new(1_001));

        p.tick(false).await.unwrap();

        // Local transcript (2 messages) kept over the server's staler one.
        assert_eq!(p.transcript.messages().len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_poll_failure() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::Unreachable(
            "dns".into(),
        ))]);
        let p = poller(transport);
        let err = p.tick(true).await.unwrap_err();
        assert!(matches!(err, ConversationError::PollFailure(_)));
        assert!(p.state.snapshot().is_none());
    }

    #[tokio::test]
    async fn non_success_status_surfaces_as_poll_failure() {
        let transport = ScriptedTransport::new(vec![ok(serde_json::json!({}))
            .map(|mut r| {
                r.status = 500;
                r
            })]);
        let p = poller(transport);
        assert!(matches!(
            p.tick(true).await,
            Err(ConversationError::PollFailure(_))
        ));
    }
}
