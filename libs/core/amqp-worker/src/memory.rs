//! In-memory transport for exercising the worker without a broker.
//!
//! Each call to `open` consumes the next scripted session. Once the script is
//! exhausted every further `open` is refused like an unreachable broker.

use crate::error::WorkerError;
use crate::transport::{ConsumerSession, InboundMessage, QueueTransport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;

/// How a delivery was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acked,
    Requeued,
    Rejected,
}

/// How a scripted session ends after its messages are delivered
#[derive(Debug, Clone)]
pub enum SessionEnd {
    /// Consumer cancelled cleanly by the broker
    Close,
    /// Connection lost
    Fail(String),
    /// Stays open until shutdown
    Hold,
}

#[derive(Debug, Clone)]
enum Script {
    Refuse(String),
    Deliver {
        messages: Vec<Vec<u8>>,
        end: SessionEnd,
    },
}

#[derive(Debug, Default)]
struct State {
    script: VecDeque<Script>,
    opens: Vec<Instant>,
    settlements: Vec<(u64, Settlement)>,
    next_tag: u64,
    sessions_closed: usize,
}

/// Scripted transport shared between the worker and the test
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<Mutex<State>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next `open` fails with a connection error
    pub fn refuse(self, reason: impl Into<String>) -> Self {
        self.push(Script::Refuse(reason.into()));
        self
    }

    /// Next `open` succeeds and delivers `messages`, then ends with `end`
    pub fn session<I, B>(self, messages: I, end: SessionEnd) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        let messages = messages.into_iter().map(Into::into).collect();
        self.push(Script::Deliver { messages, end });
        self
    }

    /// Times at which `open` was called
    pub fn opens(&self) -> Vec<Instant> {
        self.lock().opens.clone()
    }

    /// Settlements in the order they happened
    pub fn settlements(&self) -> Vec<(u64, Settlement)> {
        self.lock().settlements.clone()
    }

    pub fn count(&self, kind: Settlement) -> usize {
        self.lock()
            .settlements
            .iter()
            .filter(|(_, s)| *s == kind)
            .count()
    }

    pub fn sessions_closed(&self) -> usize {
        self.lock().sessions_closed
    }

    fn push(&self, script: Script) {
        self.lock().script.push_back(script);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Poisoning only happens if a test panicked while holding the lock.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl QueueTransport for InMemoryTransport {
    type Session = InMemorySession;

    async fn open(&self) -> Result<InMemorySession, WorkerError> {
        let mut state = self.lock();
        state.opens.push(Instant::now());

        match state.script.pop_front() {
            Some(Script::Deliver { messages, end }) => {
                let mut queued = VecDeque::with_capacity(messages.len());
                for body in messages {
                    state.next_tag += 1;
                    queued.push_back(InMemoryMessage {
                        tag: state.next_tag,
                        body,
                        state: Arc::clone(&self.state),
                    });
                }
                Ok(InMemorySession {
                    messages: queued,
                    end: Some(end),
                    state: Arc::clone(&self.state),
                })
            }
            Some(Script::Refuse(reason)) => Err(WorkerError::Connection(reason)),
            None => Err(WorkerError::Connection("connection refused".into())),
        }
    }

    fn endpoint(&self) -> String {
        "memory://".to_string()
    }
}

/// Session produced by [`InMemoryTransport`]
#[derive(Debug)]
pub struct InMemorySession {
    messages: VecDeque<InMemoryMessage>,
    end: Option<SessionEnd>,
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl ConsumerSession for InMemorySession {
    type Message = InMemoryMessage;

    async fn next_delivery(&mut self) -> Option<Result<InMemoryMessage, WorkerError>> {
        if let Some(message) = self.messages.pop_front() {
            return Some(Ok(message));
        }

        match self.end.take() {
            Some(SessionEnd::Fail(reason)) => Some(Err(WorkerError::Connection(reason))),
            Some(SessionEnd::Hold) => {
                self.end = Some(SessionEnd::Hold);
                std::future::pending().await
            }
            Some(SessionEnd::Close) | None => None,
        }
    }

    async fn close(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.sessions_closed += 1;
    }
}

/// Delivery produced by [`InMemorySession`]
#[derive(Debug)]
pub struct InMemoryMessage {
    tag: u64,
    body: Vec<u8>,
    state: Arc<Mutex<State>>,
}

impl InMemoryMessage {
    fn settle(&self, settlement: Settlement) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.settlements.push((self.tag, settlement));
    }
}

#[async_trait]
impl InboundMessage for InMemoryMessage {
    fn body(&self) -> &[u8] {
        &self.body
    }

    fn delivery_tag(&self) -> u64 {
        self.tag
    }

    fn redelivered(&self) -> bool {
        false
    }

    async fn ack(&self) -> Result<(), WorkerError> {
        self.settle(Settlement::Acked);
        Ok(())
    }

    async fn requeue(&self) -> Result<(), WorkerError> {
        self.settle(Settlement::Requeued);
        Ok(())
    }

    async fn reject(&self) -> Result<(), WorkerError> {
        self.settle(Settlement::Rejected);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_sessions_in_order() {
        let transport = InMemoryTransport::new()
            .refuse("down")
            .session(vec![b"a".to_vec(), b"b".to_vec()], SessionEnd::Close);

        let err = transport.open().await.unwrap_err();
        assert!(err.is_transport());

        let mut session = transport.open().await.unwrap();
        let first = session.next_delivery().await.unwrap().unwrap();
        let second = session.next_delivery().await.unwrap().unwrap();
        assert_eq!(first.body(), b"a");
        assert_eq!(second.delivery_tag(), 2);
        assert!(session.next_delivery().await.is_none());

        first.ack().await.unwrap();
        second.reject().await.unwrap();
        assert_eq!(
            transport.settlements(),
            vec![(1, Settlement::Acked), (2, Settlement::Rejected)]
        );

        // Script exhausted: broker unreachable
        assert!(transport.open().await.is_err());
        assert_eq!(transport.opens().len(), 3);
    }

    #[tokio::test]
    async fn test_failing_session_reports_error_once() {
        let transport =
            InMemoryTransport::new().session(Vec::<Vec<u8>>::new(), SessionEnd::Fail("reset".into()));

        let mut session = transport.open().await.unwrap();
        assert!(matches!(session.next_delivery().await, Some(Err(_))));
        assert!(session.next_delivery().await.is_none());
    }
}
