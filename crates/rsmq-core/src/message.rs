use serde::{Deserialize, Serialize};

/// A message handed out by `receive_message` or `pop_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: String,
    /// Message body.
    pub message: String,
    /// Receive count, including this delivery.
    pub rc: u64,
    /// First receive time (ms). Stays fixed across redeliveries.
    pub fr: u64,
    /// Send time (ms), recovered from the id prefix.
    pub sent: u64,
}
