use tracing::debug;

use super::{decode_message, take_replies, Rsmq};
use crate::error::{Result, StoreError};
use crate::keys::{field, fr_field, rc_field};
use crate::lua;
use crate::message::QueueMessage;
use crate::storage::Op;
use crate::validate;

/// Parameters for [`Rsmq::send_message`].
#[derive(Debug, Clone, PartialEq)]
pub struct SendMessage {
    pub qname: String,
    pub message: String,
    /// Seconds before the message becomes visible. Falls back to the
    /// queue's default delay.
    pub delay: Option<u32>,
}

impl SendMessage {
    pub fn new(qname: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            qname: qname.into(),
            message: message.into(),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: u32) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Parameters for [`Rsmq::receive_message`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiveMessage {
    pub qname: String,
    /// Lease length in seconds. Falls back to the queue's default `vt`.
    pub vt: Option<u32>,
}

impl ReceiveMessage {
    pub fn new(qname: impl Into<String>) -> Self {
        Self {
            qname: qname.into(),
            vt: None,
        }
    }

    pub fn with_vt(mut self, vt: u32) -> Self {
        self.vt = Some(vt);
        self
    }
}

/// Parameters for [`Rsmq::delete_message`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteMessage {
    pub qname: String,
    pub id: String,
}

impl DeleteMessage {
    pub fn new(qname: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            qname: qname.into(),
            id: id.into(),
        }
    }
}

/// Parameters for [`Rsmq::change_message_visibility`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeMessageVisibility {
    pub qname: String,
    pub id: String,
    /// Seconds from now until the message becomes visible.
    pub vt: u32,
}

impl ChangeMessageVisibility {
    pub fn new(qname: impl Into<String>, id: impl Into<String>, vt: u32) -> Self {
        Self {
            qname: qname.into(),
            id: id.into(),
            vt,
        }
    }
}

fn deadline(now_ms: u64, secs: u32) -> u64 {
    now_ms + u64::from(secs) * 1000
}

impl Rsmq {
    /// Store a message and return its id.
    #[tracing::instrument(skip_all, fields(queue = %params.qname))]
    pub fn send_message(&self, params: &SendMessage) -> Result<String> {
        validate::qname(&params.qname)?;
        if let Some(delay) = params.delay {
            validate::delay(delay)?;
        }

        let queue = self.get_queue(&params.qname, true)?;
        validate::message_body(&params.message, queue.maxsize)?;
        let id = queue
            .uid
            .ok_or_else(|| StoreError::Protocol("no message id was generated".to_string()))?;
        let delay = params.delay.unwrap_or(queue.delay);
        let key = self.ns.queue_key(&params.qname);

        self.store.exec(vec![
            Op::ZAdd {
                key: self.ns.index_key(&params.qname),
                score: deadline(queue.ts, delay) as f64,
                member: id.clone(),
            },
            Op::HSet {
                key: key.clone(),
                field: id.clone(),
                value: params.message.clone(),
            },
            Op::HIncrBy {
                key,
                field: field::TOTALSENT.to_string(),
                delta: 1,
            },
        ])?;
        debug!(%id, delay, size = params.message.len(), "message sent");
        Ok(id)
    }

    /// Lease the earliest due message, hiding it for `vt` seconds.
    #[tracing::instrument(skip_all, fields(queue = %params.qname))]
    pub fn receive_message(&self, params: &ReceiveMessage) -> Result<Option<QueueMessage>> {
        validate::qname(&params.qname)?;
        if let Some(vt) = params.vt {
            validate::vt(vt)?;
        }

        let queue = self.get_queue(&params.qname, false)?;
        let vt = params.vt.unwrap_or(queue.vt);
        let reply = self.store.eval(
            &lua::RECEIVE_MESSAGE,
            &[
                self.ns.index_key(&params.qname),
                self.ns.queue_key(&params.qname),
            ],
            &[queue.ts.to_string(), deadline(queue.ts, vt).to_string()],
        )?;

        let message = decode_message(reply)?;
        match &message {
            Some(msg) => debug!(id = %msg.id, rc = msg.rc, vt, "message received"),
            None => debug!("no message due"),
        }
        Ok(message)
    }

    /// Remove and return the earliest due message.
    #[tracing::instrument(skip(self))]
    pub fn pop_message(&self, qname: &str) -> Result<Option<QueueMessage>> {
        validate::qname(qname)?;

        let queue = self.get_queue(qname, false)?;
        let reply = self.store.eval(
            &lua::POP_MESSAGE,
            &[self.ns.index_key(qname), self.ns.queue_key(qname)],
            &[queue.ts.to_string()],
        )?;

        let message = decode_message(reply)?;
        match &message {
            Some(msg) => debug!(id = %msg.id, rc = msg.rc, "message popped"),
            None => debug!("no message due"),
        }
        Ok(message)
    }

    /// Delete a message. Returns false if it was not in the queue.
    #[tracing::instrument(skip_all, fields(queue = %params.qname, id = %params.id))]
    pub fn delete_message(&self, params: &DeleteMessage) -> Result<bool> {
        validate::qname(&params.qname)?;
        validate::message_id(&params.id)?;

        let replies = self.store.exec(vec![
            Op::ZRem {
                key: self.ns.index_key(&params.qname),
                members: vec![params.id.clone()],
            },
            Op::HDel {
                key: self.ns.queue_key(&params.qname),
                fields: vec![
                    params.id.clone(),
                    rc_field(&params.id),
                    fr_field(&params.id),
                ],
            },
        ])?;
        let [index, fields] = take_replies::<2>(replies)?;
        let deleted = index.as_i64() == Some(1) && fields.as_i64().is_some_and(|n| n > 0);
        debug!(deleted, "delete message");
        Ok(deleted)
    }

    /// Make a message visible `vt` seconds from now. Returns false if the
    /// message is not in the queue.
    #[tracing::instrument(skip_all, fields(queue = %params.qname, id = %params.id))]
    pub fn change_message_visibility(&self, params: &ChangeMessageVisibility) -> Result<bool> {
        validate::qname(&params.qname)?;
        validate::message_id(&params.id)?;
        validate::vt(params.vt)?;

        let queue = self.get_queue(&params.qname, false)?;
        let reply = self.store.eval(
            &lua::CHANGE_MESSAGE_VISIBILITY,
            &[self.ns.index_key(&params.qname)],
            &[
                params.id.clone(),
                deadline(queue.ts, params.vt).to_string(),
            ],
        )?;

        let changed = reply.as_i64() == Some(1);
        debug!(changed, vt = params.vt, "change visibility");
        Ok(changed)
    }
}
