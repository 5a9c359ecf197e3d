//! Queue lifecycle and message commands.
//!
//! Each command validates its input, reads whatever queue metadata and
//! server time it needs, then issues one transaction or one script. Nothing
//! is cached between calls.

mod message;
mod queue;

#[cfg(test)]
mod tests;

use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::config::RsmqConfig;
use crate::error::{Result, RsmqError, StoreError, StoreResult};
use crate::id;
use crate::keys::{field, Namespace};
use crate::message::QueueMessage;
use crate::queue::{MaxSize, QueueDef};
use crate::storage::{Op, RedisStore, Reply, ServerTime, Store};

pub use message::{ChangeMessageVisibility, DeleteMessage, ReceiveMessage, SendMessage};
pub use queue::{CreateQueue, SetQueueAttributes};

/// Handle for issuing queue commands against a store.
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct Rsmq {
    store: Arc<dyn Store>,
    ns: Namespace,
}

impl Rsmq {
    pub fn new(store: Arc<dyn Store>, ns: Namespace) -> Self {
        Self { store, ns }
    }

    /// Build a Redis-backed handle from configuration.
    pub fn from_config(config: &RsmqConfig) -> Result<Self> {
        let mut store = RedisStore::open(&config.redis.url)?;
        if let Some(timeout) = config.redis.timeout() {
            store = store.with_timeout(timeout);
        }
        Ok(Self::new(Arc::new(store), Namespace::new(&config.ns)))
    }

    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    /// Read a queue's core attributes together with the server time in one
    /// transaction, optionally minting a message id from that time.
    pub(crate) fn get_queue(&self, qname: &str, generate_id: bool) -> Result<QueueDef> {
        let replies = self.store.exec(vec![
            Op::HMGet {
                key: self.ns.queue_key(qname),
                fields: vec![
                    field::VT.to_string(),
                    field::DELAY.to_string(),
                    field::MAXSIZE.to_string(),
                ],
            },
            Op::Time,
        ])?;
        let [attrs, time] = take_replies::<2>(replies)?;
        let attrs = expect_array(attrs, 3)?;
        if attrs.iter().any(Reply::is_nil) {
            return Err(RsmqError::QueueNotFound(qname.to_string()));
        }
        let now = ServerTime::from_reply(time)?;

        let uid = generate_id.then(|| id::generate(now.as_micros()));
        debug!(queue = qname, ts = now.as_millis(), "queue metadata read");

        Ok(QueueDef {
            qname: qname.to_string(),
            vt: parse_field(&attrs[0], field::VT)?,
            delay: parse_field(&attrs[1], field::DELAY)?,
            maxsize: parse_field::<MaxSize>(&attrs[2], field::MAXSIZE)?,
            ts: now.as_millis(),
            uid,
        })
    }
}

/// Split a transaction result into exactly `N` replies.
fn take_replies<const N: usize>(replies: Vec<Reply>) -> StoreResult<[Reply; N]> {
    let len = replies.len();
    replies
        .try_into()
        .map_err(|_| StoreError::Protocol(format!("expected {N} replies, got {len}")))
}

fn expect_array(reply: Reply, len: usize) -> StoreResult<Vec<Reply>> {
    match reply.into_array() {
        Some(items) if items.len() == len => Ok(items),
        Some(items) => Err(StoreError::Protocol(format!(
            "expected {len} fields, got {}",
            items.len()
        ))),
        None => Err(StoreError::Protocol("expected an array reply".to_string())),
    }
}

fn parse_field<T: FromStr>(reply: &Reply, name: &str) -> StoreResult<T> {
    let raw = match reply {
        Reply::Bulk(s) | Reply::Status(s) => s.clone(),
        Reply::Int(n) => n.to_string(),
        other => {
            return Err(StoreError::Protocol(format!(
                "field {name} has unexpected reply {other:?}"
            )))
        }
    };
    raw.parse()
        .map_err(|_| StoreError::Protocol(format!("field {name} is malformed: {raw:?}")))
}

/// Like `parse_field`, treating a missing field as zero.
fn parse_counter(reply: &Reply, name: &str) -> StoreResult<u64> {
    if reply.is_nil() {
        Ok(0)
    } else {
        parse_field(reply, name)
    }
}

/// Decode a pop/receive script reply: `{}` or `{id, body, rc, fr}`.
fn decode_message(reply: Reply) -> Result<Option<QueueMessage>> {
    let items = reply
        .into_array()
        .ok_or_else(|| StoreError::Protocol("script reply is not an array".to_string()))?;
    if items.is_empty() {
        return Ok(None);
    }
    let [id, body, rc, fr] = take_replies::<4>(items)?;

    let id = id
        .into_string()
        .ok_or_else(|| StoreError::Protocol("message id missing from reply".to_string()))?;
    let message = body
        .into_string()
        .ok_or_else(|| StoreError::Protocol(format!("message {id} has no body")))?;
    let rc = parse_field(&rc, "rc")?;
    let fr = parse_field(&fr, "fr")?;
    let sent = id::sent_at_millis(&id)
        .ok_or_else(|| StoreError::Protocol(format!("message id {id} has no timestamp")))?;

    Ok(Some(QueueMessage {
        id,
        message,
        rc,
        fr,
        sent,
    }))
}
