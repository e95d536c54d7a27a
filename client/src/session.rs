//! The challenge session facade and the per-message state machine.
//!
//! One [`ChallengeSession`] spans one challenge: it owns the credential
//! store, auth client, payment flow, transcript, and the background poller
//! task. `send_message` drives a single message through the full pipeline,
//! strictly in order: sign, confirm, submit, stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use jailpool_auth::{AuthClient, CredentialStore, IdentityProver, Transport, WalletSigner};
use jailpool_conversation::{
    sanitize_prompt, ActiveIdentity, ChallengePoller, ChallengeState, ConversationSubmitter,
    StreamConsumer, StreamingFlag, Transcript,
};
use jailpool_payment::{CancelToken, ChainClient, PaymentAction, PaymentFlow, PaymentWallet};
use jailpool_types::{ChallengeId, ChallengeName, PublicKey};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::HttpTransport;

/// Where one in-flight message stands.
///
/// The happy path walks `Idle → AwaitingSignature → AwaitingConfirmation →
/// Submitting → Streaming → Idle` with no skips; `Failed` is reachable from
/// every state except `Idle`. A message is never submitted without a
/// confirmed transaction behind it, because `Submitting` is only reachable
/// through `AwaitingConfirmation`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageLifecycle {
    Idle,
    AwaitingSignature,
    AwaitingConfirmation,
    Submitting,
    Streaming,
    Failed(String),
}

impl MessageLifecycle {
    /// Whether `next` is a legal successor of `self`.
    pub fn permits(&self, next: &MessageLifecycle) -> bool {
        use MessageLifecycle::*;
        match (self, next) {
            (Idle, Failed(_)) => false,
            (_, Failed(_)) => true,
            (Idle, AwaitingSignature) => true,
            (AwaitingSignature, AwaitingConfirmation) => true,
            (AwaitingConfirmation, Submitting) => true,
            (Submitting, Streaming) => true,
            (Streaming, Idle) => true,
            // A failed message leaves the machine ready for the next one.
            (Failed(_), AwaitingSignature) | (Failed(_), Idle) => true,
            _ => false,
        }
    }
}

/// One user's session against one challenge.
pub struct ChallengeSession {
    transport: Arc<dyn Transport>,
    auth: Arc<AuthClient>,
    signer: Arc<dyn WalletSigner>,
    flow: PaymentFlow,
    submitter: ConversationSubmitter,
    consumer: StreamConsumer,
    poller: ChallengePoller,
    transcript: Transcript,
    challenge: ChallengeState,
    identity: ActiveIdentity,
    cancel: Mutex<CancelToken>,
    lifecycle: Mutex<MessageLifecycle>,
    initial_polled: AtomicBool,
    poller_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChallengeSession {
    /// Build a session talking HTTP to `config.base_url`.
    pub fn new(
        config: &ClientConfig,
        challenge: ChallengeName,
        signer: Arc<dyn WalletSigner>,
        wallet: Arc<dyn PaymentWallet>,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Self, ClientError> {
        let transport = Arc::new(HttpTransport::new(&config.base_url)?);
        Ok(Self::with_transport(
            transport, config, challenge, signer, wallet, chain,
        ))
    }

    /// Build a session over an arbitrary transport (tests use a nullable).
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
        challenge_name: ChallengeName,
        signer: Arc<dyn WalletSigner>,
        wallet: Arc<dyn PaymentWallet>,
        chain: Arc<dyn ChainClient>,
    ) -> Self {
        let auth = Arc::new(AuthClient::new(
            transport.clone(),
            IdentityProver::new(signer.clone()),
            CredentialStore::new(),
        ));
        let flow = PaymentFlow::new(auth.clone(), wallet, chain, config.payment_config());

        let transcript = Transcript::new();
        let challenge = ChallengeState::new();
        let identity = ActiveIdentity::new();
        let streaming = StreamingFlag::new();
        let poller = ChallengePoller::new(
            transport.clone(),
            challenge_name,
            challenge.clone(),
            transcript.clone(),
            streaming.clone(),
            identity.clone(),
            config.poll_interval(),
        );

        Self {
            submitter: ConversationSubmitter::new(transport.clone(), transcript.clone()),
            consumer: StreamConsumer::new(transcript.clone(), streaming),
            transport,
            auth,
            signer,
            flow,
            poller,
            transcript,
            challenge,
            identity,
            cancel: Mutex::new(CancelToken::new()),
            lifecycle: Mutex::new(MessageLifecycle::Idle),
            initial_polled: AtomicBool::new(false),
            poller_task: Mutex::new(None),
        }
    }

    /// Spawn the background poller. Replaces any previous poller task.
    pub fn start_polling(&self) {
        let handle = tokio::spawn(self.poller.clone().run());
        if let Some(old) = self
            .poller_task
            .lock()
            .expect("session poisoned")
            .replace(handle)
        {
            old.abort();
        }
    }

    pub fn stop_polling(&self) {
        if let Some(handle) = self.poller_task.lock().expect("session poisoned").take() {
            handle.abort();
        }
    }

    /// Run one poll cycle synchronously. The first successful call carries
    /// the initial-load semantics (transcript adopted unconditionally).
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let initial = !self.initial_polled.load(Ordering::SeqCst);
        self.poller.tick(initial).await?;
        self.initial_polled.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Bind the signer's current identity to the session.
    ///
    /// Switching identities is a disconnect plus connect: stale credentials
    /// are dropped and any in-flight payment is aborted at its next
    /// checkpoint. A credential is established eagerly when none is cached.
    pub async fn connect(&self) -> Result<PublicKey, ClientError> {
        let identity = self
            .signer
            .identity()
            .ok_or(jailpool_auth::AuthError::IdentityUnavailable)?;

        if let Some(current) = self.identity.current() {
            if current != identity {
                self.disconnect();
            }
        }
        self.identity.connect(identity);
        *self.cancel.lock().expect("session poisoned") = CancelToken::new();

        if self.auth.store().get(&identity).is_none() {
            self.auth.refresh_credential(&identity).await?;
        }
        tracing::info!(%identity, "wallet connected");
        Ok(identity)
    }

    /// Drop the active identity. Credentials are cleared and an in-flight
    /// payment aborts at its next checkpoint; an active reply stream is
    /// left to finish on its own.
    pub fn disconnect(&self) {
        self.cancel.lock().expect("session poisoned").cancel();
        self.auth.store().clear();
        self.identity.disconnect();
        tracing::info!("wallet disconnected");
    }

    /// Send one paid message and return the full reply text.
    pub async fn send_message(&self, prompt: &str) -> Result<String, ClientError> {
        let identity = self
            .identity
            .current()
            .ok_or(jailpool_auth::AuthError::IdentityUnavailable)?;
        let snapshot = self
            .challenge
            .snapshot()
            .ok_or(ClientError::ChallengeUnknown)?;
        if !snapshot.accepts_messages() {
            return Err(ClientError::ChallengeClosed);
        }
        let content = sanitize_prompt(prompt, &snapshot);

        let result = self.drive(identity, snapshot.id, &content).await;
        if let Err(e) = &result {
            self.fail(e.to_string());
        }
        result
    }

    async fn drive(
        &self,
        identity: PublicKey,
        challenge_id: ChallengeId,
        content: &str,
    ) -> Result<String, ClientError> {
        let cancel = self.cancel.lock().expect("session poisoned").clone();
        let action = PaymentAction {
            challenge_id: challenge_id.clone(),
            content: content.to_string(),
            identity,
        };

        self.advance(MessageLifecycle::AwaitingSignature)?;
        let broadcast = self.flow.begin(&action, &cancel).await?;

        self.advance(MessageLifecycle::AwaitingConfirmation)?;
        let payment = self.flow.finish(&action, broadcast, &cancel).await?;

        self.advance(MessageLifecycle::Submitting)?;
        let stream = self.submitter.submit(&challenge_id, content, &payment).await?;

        self.advance(MessageLifecycle::Streaming)?;
        let reply = self.consumer.consume(stream).await?;

        self.advance(MessageLifecycle::Idle)?;
        Ok(reply)
    }

    fn advance(&self, to: MessageLifecycle) -> Result<(), ClientError> {
        let mut current = self.lifecycle.lock().expect("session poisoned");
        if !current.permits(&to) {
            return Err(ClientError::InvalidTransition {
                from: current.clone(),
                to,
            });
        }
        tracing::debug!(from = ?*current, to = ?to, "message lifecycle");
        *current = to;
        Ok(())
    }

    fn fail(&self, reason: String) {
        let mut current = self.lifecycle.lock().expect("session poisoned");
        if *current != MessageLifecycle::Idle {
            *current = MessageLifecycle::Failed(reason);
        }
    }

    /// Current state of the per-message machine.
    pub fn lifecycle(&self) -> MessageLifecycle {
        self.lifecycle.lock().expect("session poisoned").clone()
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    pub fn challenge(&self) -> ChallengeState {
        self.challenge.clone()
    }

    pub fn active_identity(&self) -> Option<PublicKey> {
        self.identity.current()
    }

    /// The transport the session was built over.
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }
}

impl Drop for ChallengeSession {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
