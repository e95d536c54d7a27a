//! Incremental consumption of a streamed assistant reply.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jailpool_auth::ReplyStream;
use jailpool_types::Timestamp;

use crate::error::ConversationError;
use crate::transcript::Transcript;

/// The shared "a reply is streaming" bit.
///
/// Its only writers are the stream consumer's start and stop; its only
/// reader is the poller's transcript-replacement decision. That one flag is
/// the entire synchronization story between the two loops.
#[derive(Clone, Default)]
pub struct StreamingFlag {
    active: Arc<AtomicBool>,
}

impl StreamingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_streaming(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Raise the flag for the lifetime of the returned guard.
    fn raise(&self) -> StreamingGuard {
        self.active.store(true, Ordering::SeqCst);
        StreamingGuard {
            active: Arc::clone(&self.active),
        }
    }
}

/// Clears the streaming flag on drop, so an early return or a panic in the
/// consumer can never leave the poller suppressed forever.
struct StreamingGuard {
    active: Arc<AtomicBool>,
}

impl Drop for StreamingGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Folds a reply stream into the transcript's last assistant message.
pub struct StreamConsumer {
    transcript: Transcript,
    flag: StreamingFlag,
}

impl StreamConsumer {
    pub fn new(transcript: Transcript, flag: StreamingFlag) -> Self {
        Self { transcript, flag }
    }

    /// Consume the stream to completion, appending each chunk as it arrives.
    ///
    /// Returns the full reply text. On a mid-stream transport error the
    /// content appended so far is retained and the last assistant message is
    /// marked incomplete; the attempt was paid for, so nothing is rolled
    /// back.
    pub async fn consume(
        &self,
        mut stream: Box<dyn ReplyStream>,
    ) -> Result<String, ConversationError> {
        let _guard = self.flag.raise();
        let mut reply = String::new();

        loop {
            match stream.next_chunk().await {
                Ok(Some(chunk)) => {
                    self.transcript
                        .append_assistant_chunk(&chunk, Timestamp::now());
                    reply.push_str(&chunk);
                }
                Ok(None) => {
                    tracing::debug!(chars = reply.len(), "reply stream completed");
                    return Ok(reply);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reply stream interrupted, keeping partial content");
                    self.transcript.mark_last_assistant_incomplete();
                    return Err(ConversationError::StreamInterrupted(e.to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jailpool_auth::TransportError;
    use jailpool_types::{ChatMessage, PublicKey, Role};
    use std::collections::VecDeque;

    /// Yields scripted chunks; an entry of `Err` interrupts the stream.
    struct ScriptedStream {
        chunks: VecDeque<Result<String, TransportError>>,
    }

    impl ScriptedStream {
        fn of(chunks: &[&str]) -> Box<dyn ReplyStream> {
            Box::new(Self {
                chunks: chunks.iter().map(|c| Ok(c.to_string())).collect(),
            })
        }

        fn interrupted_after(chunks: &[&str]) -> Box<dyn ReplyStream> {
            let mut queue: VecDeque<Result<String, TransportError>> =
                chunks.iter().map(|c| Ok(c.to_string())).collect();
            queue.push_back(Err(TransportError::RequestFailed("connection reset".into())));
            Box::new(Self { chunks: queue })
        }
    }

    #[async_trait]
    impl ReplyStream for ScriptedStream {
        async fn next_chunk(&mut self) -> Result<Option<String>, TransportError> {
            match self.chunks.pop_front() {
                Some(Ok(chunk)) => Ok(Some(chunk)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn chunks_arrive_in_order() {
        let transcript = Transcript::new();
        let consumer = StreamConsumer::new(transcript.clone(), StreamingFlag::new());

        let reply = consumer
            .consume(ScriptedStream::of(&["Hi ", "there"]))
            .await
            .unwrap();
        assert_eq!(reply, "Hi there");

        let messages = transcript.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Hi there");
    }

    #[tokio::test]
    async fn flag_is_set_only_while_consuming() {
        let flag = StreamingFlag::new();
        let consumer = StreamConsumer::new(Transcript::new(), flag.clone());

        assert!(!flag.is_streaming());
        consumer.consume(ScriptedStream::of(&["x"])).await.unwrap();
        assert!(!flag.is_streaming());
    }

    #[tokio::test]
    async fn interruption_keeps_partial_content_and_clears_flag() {
        let transcript = Transcript::new();
        let flag = StreamingFlag::new();
        let consumer = StreamConsumer::new(transcript.clone(), flag.clone());

        let err = consumer
            .consume(ScriptedStream::interrupted_after(&["partial ", "reply"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversationError::StreamInterrupted(_)));
        assert!(!flag.is_streaming());

        let messages = transcript.messages();
        assert_eq!(messages[0].content, "partial reply");
        assert!(messages[0].incomplete);
    }

    #[tokio::test]
    async fn appends_to_existing_conversation() {
        let transcript = Transcript::new();
        transcript.push(ChatMessage::user(
            "hello",
            PublicKey([1; 32]).address(),
            jailpool_types::Timestamp::new(1),
        ));
        let consumer = StreamConsumer::new(transcript.clone(), StreamingFlag::new());
        consumer
            .consume(ScriptedStream::of(&["reply"]))
            .await
            .unwrap();

        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn empty_stream_produces_empty_reply() {
        let transcript = Transcript::new();
        let consumer = StreamConsumer::new(transcript.clone(), StreamingFlag::new());
        let reply = consumer.consume(ScriptedStream::of(&[])).await.unwrap();
        assert!(reply.is_empty());
        // No assistant message was fabricated for a reply that never started.
        assert!(transcript.is_empty());
    }
}
