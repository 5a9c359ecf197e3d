use crate::error::{StoreError, StoreResult};
use crate::lua::Script;
use crate::storage::op::{Op, Reply};

/// Authoritative wall-clock time as reported by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerTime {
    pub secs: u64,
    pub micros: u32,
}

impl ServerTime {
    pub fn from_micros(micros: u64) -> Self {
        Self {
            secs: micros / 1_000_000,
            micros: (micros % 1_000_000) as u32,
        }
    }

    pub fn as_micros(&self) -> u64 {
        self.secs * 1_000_000 + u64::from(self.micros)
    }

    /// Milliseconds, truncating the sub-millisecond part.
    pub fn as_millis(&self) -> u64 {
        self.secs * 1000 + u64::from(self.micros / 1000)
    }

    /// Decode a `TIME` reply: `[seconds, microseconds]`.
    pub fn from_reply(reply: Reply) -> StoreResult<Self> {
        let parts = reply
            .into_array()
            .ok_or_else(|| StoreError::Protocol("TIME reply is not an array".to_string()))?;
        match parts.as_slice() {
            [secs, micros] => {
                let secs = secs
                    .as_i64()
                    .and_then(|s| u64::try_from(s).ok())
                    .ok_or_else(|| StoreError::Protocol(format!("bad TIME seconds: {secs:?}")))?;
                let micros = micros
                    .as_i64()
                    .and_then(|m| u32::try_from(m).ok())
                    .filter(|m| *m < 1_000_000)
                    .ok_or_else(|| {
                        StoreError::Protocol(format!("bad TIME microseconds: {micros:?}"))
                    })?;
                Ok(Self { secs, micros })
            }
            _ => Err(StoreError::Protocol(format!(
                "TIME reply has {} elements",
                parts.len()
            ))),
        }
    }
}

/// Backing-store contract. Implementations must be thread-safe.
///
/// Every method is one round trip. Atomicity comes from the store itself:
/// a transaction runs its operations as one unit, and a script runs with
/// exclusive access to the keys it touches.
pub trait Store: Send + Sync {
    /// Run `ops` as a MULTI/EXEC transaction. Replies are returned in
    /// submission order.
    fn exec(&self, ops: Vec<Op>) -> StoreResult<Vec<Reply>>;

    /// Run a server-side script with positional keys and arguments.
    fn eval(&self, script: &Script, keys: &[String], args: &[String]) -> StoreResult<Reply>;

    /// Current server time.
    fn time(&self) -> StoreResult<ServerTime> {
        let reply = self
            .exec(vec![Op::Time])?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Protocol("empty TIME transaction".to_string()))?;
        ServerTime::from_reply(reply)
    }
}
