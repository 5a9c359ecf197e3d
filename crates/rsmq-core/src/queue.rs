use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Upper bound for `vt` and `delay`, in seconds (around 115 days).
pub const MAX_SECONDS: u32 = 9_999_999;

/// Smallest bounded `maxsize`, in bytes.
pub const MIN_MESSAGE_SIZE: u32 = 1024;

/// Largest bounded `maxsize`, in bytes.
pub const MAX_MESSAGE_SIZE: u32 = 65_536;

/// Maximum message body size for a queue. Stored as `-1` when unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum MaxSize {
    Unlimited,
    Bytes(u32),
}

impl MaxSize {
    pub fn as_i64(self) -> i64 {
        match self {
            MaxSize::Unlimited => -1,
            MaxSize::Bytes(n) => i64::from(n),
        }
    }

    /// Whether a body of `len` bytes fits.
    pub fn allows(self, len: usize) -> bool {
        match self {
            MaxSize::Unlimited => true,
            MaxSize::Bytes(n) => len <= n as usize,
        }
    }
}

impl Default for MaxSize {
    fn default() -> Self {
        MaxSize::Bytes(MAX_MESSAGE_SIZE)
    }
}

impl From<MaxSize> for i64 {
    fn from(size: MaxSize) -> Self {
        size.as_i64()
    }
}

impl TryFrom<i64> for MaxSize {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(MaxSize::Unlimited),
            n if n >= 0 && n <= i64::from(u32::MAX) => Ok(MaxSize::Bytes(n as u32)),
            n => Err(format!("invalid maxsize {n}")),
        }
    }
}

impl fmt::Display for MaxSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

impl FromStr for MaxSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid maxsize {s:?}"))?;
        MaxSize::try_from(value)
    }
}

/// Queue configuration as read together with the server clock at the start
/// of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueDef {
    pub qname: String,
    /// Default visibility timeout (seconds).
    pub vt: u32,
    /// Default delivery delay (seconds).
    pub delay: u32,
    pub maxsize: MaxSize,
    /// Server time in milliseconds when the queue was read.
    pub ts: u64,
    /// Freshly generated message id, present only when requested.
    pub uid: Option<String>,
}

/// Snapshot of a queue's attributes, counters and index statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueAttributes {
    pub vt: u32,
    pub delay: u32,
    pub maxsize: MaxSize,
    pub totalrecv: u64,
    pub totalsent: u64,
    /// Creation time, epoch seconds.
    pub created: u64,
    /// Last attribute change, epoch seconds.
    pub modified: u64,
    /// Number of messages in the queue.
    pub msgs: u64,
    /// Messages that are delayed or currently leased.
    pub hiddenmsgs: u64,
}
