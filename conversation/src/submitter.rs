//! Gated message submission.
//!
//! A submission only happens after a payment was confirmed on chain; the
//! server re-verifies the referenced transaction before it will run the
//! prompt. The reply comes back as a stream, which the caller hands to a
//! [`StreamConsumer`](crate::stream::StreamConsumer).

use std::sync::Arc;

use jailpool_auth::{ApiRequest, ReplyStream, RequestAuth, Transport, TransportError};
use jailpool_payment::AuthorizedPayment;
use jailpool_types::{ChallengeId, ChatMessage, Timestamp};

use crate::error::ConversationError;
use crate::transcript::Transcript;

/// Submits a paid message and opens the reply stream.
pub struct ConversationSubmitter {
    transport: Arc<dyn Transport>,
    transcript: Transcript,
}

impl ConversationSubmitter {
    pub fn new(transport: Arc<dyn Transport>, transcript: Transcript) -> Self {
        Self { transport, transcript }
    }

    /// Echo the user's message into the transcript, then submit it with its
    /// payment proof and return the reply stream.
    ///
    /// The echo happens before the request so the user sees their message
    /// immediately. If the server rejects the payment, the echo is marked
    /// failed and kept; the submission is never retried, because the server
    /// consumes each transaction reference exactly once.
    pub async fn submit(
        &self,
        challenge: &ChallengeId,
        content: &str,
        payment: &AuthorizedPayment,
    ) -> Result<Box<dyn ReplyStream>, ConversationError> {
        let identity = payment.credential.identity;
        self.transcript.push(ChatMessage::user(
            content,
            identity.address(),
            Timestamp::now(),
        ));

        let body = serde_json::json!({
            "content": content,
            "walletAddress": identity.address().as_str(),
            "transactionSignature": payment.transaction_signature.as_str(),
            "actionId": payment.action_id,
        });
        let request = ApiRequest::post(format!("/conversation/submit/{challenge}"), body);

        let result = self
            .transport
            .execute_streaming(request, RequestAuth::Token(payment.credential.clone()))
            .await;

        match result {
            Ok(stream) => Ok(stream),
            Err(TransportError::Status { code: 402, message }) => {
                tracing::warn!(%message, "payment not recognized, marking message failed");
                self.transcript.mark_last_user_failed();
                Err(ConversationError::PaymentNotRecognized)
            }
            Err(TransportError::Status { code, message }) => {
                self.transcript.mark_last_user_failed();
                Err(ConversationError::SubmissionRejected {
                    status: code,
                    message,
                })
            }
            Err(e) => {
                self.transcript.mark_last_user_failed();
                Err(ConversationError::Transport(e))
            }
        }
    }
}
