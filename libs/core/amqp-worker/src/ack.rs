//! Acknowledgement strategies.
//!
//! A processed delivery is settled exactly once with one of three broker
//! operations. Which one is decided by the configured [`AckPolicy`] from the
//! processing [`Outcome`](crate::Outcome).

use crate::processor::Outcome;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// How a delivery is settled with the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum AckDecision {
    /// Remove the message from the queue
    Ack,
    /// Return the message to the queue for redelivery
    Requeue,
    /// Drop the message from the queue (dead-lettered when a DLX is configured)
    Reject,
}

/// Acknowledgement strategy, selected with `ACK_POLICY`.
///
/// | policy           | success | partial | poison |
/// |------------------|---------|---------|--------|
/// | `ack_always`     | ack     | ack     | ack    |
/// | `ack_on_success` | ack     | requeue | ack    |
/// | `dead_letter`    | ack     | reject  | reject |
///
/// `ack_always` never redelivers, so a failed step is lost. `ack_on_success`
/// redelivers partial failures, and steps that already succeeded run again.
/// `dead_letter` parks anything not fully applied on `<queue>.dlq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AckPolicy {
    #[default]
    AckAlways,
    AckOnSuccess,
    DeadLetter,
}

impl AckPolicy {
    /// Decide how to settle a delivery with the given outcome.
    pub fn decide(&self, outcome: &Outcome) -> AckDecision {
        match (self, outcome) {
            (AckPolicy::AckAlways, _) => AckDecision::Ack,
            (_, Outcome::Success) => AckDecision::Ack,
            (AckPolicy::AckOnSuccess, Outcome::Partial(_)) => AckDecision::Requeue,
            // A payload that cannot be parsed will never succeed; don't loop on it.
            (AckPolicy::AckOnSuccess, Outcome::Poison(_)) => AckDecision::Ack,
            (AckPolicy::DeadLetter, _) => AckDecision::Reject,
        }
    }

    /// Whether queues must be declared with a dead-letter route
    pub fn uses_dead_letter_queue(&self) -> bool {
        matches!(self, AckPolicy::DeadLetter)
    }
}
