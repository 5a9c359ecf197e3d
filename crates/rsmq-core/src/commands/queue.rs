use tracing::{debug, info};

use super::{expect_array, parse_counter, parse_field, take_replies, Rsmq};
use crate::error::{Result, RsmqError, ValidationError};
use crate::keys::field;
use crate::queue::{MaxSize, QueueAttributes};
use crate::storage::{Op, Reply};
use crate::validate;

const DEFAULT_VT: u32 = 30;

/// Parameters for [`Rsmq::create_queue`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateQueue {
    pub qname: String,
    /// Default visibility timeout in seconds.
    pub vt: u32,
    /// Default delivery delay in seconds.
    pub delay: u32,
    pub maxsize: MaxSize,
}

impl CreateQueue {
    pub fn new(qname: impl Into<String>) -> Self {
        Self {
            qname: qname.into(),
            vt: DEFAULT_VT,
            delay: 0,
            maxsize: MaxSize::default(),
        }
    }
}

/// Parameters for [`Rsmq::set_queue_attributes`]. At least one attribute
/// must be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetQueueAttributes {
    pub qname: String,
    pub vt: Option<u32>,
    pub delay: Option<u32>,
    pub maxsize: Option<MaxSize>,
}

impl SetQueueAttributes {
    pub fn new(qname: impl Into<String>) -> Self {
        Self {
            qname: qname.into(),
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.vt.is_none() && self.delay.is_none() && self.maxsize.is_none()
    }
}

impl Rsmq {
    /// Create a queue. Fails with `QueueAlreadyExists` if any of its
    /// attributes are already present, leaving the hash as it was.
    #[tracing::instrument(skip_all, fields(queue = %params.qname))]
    pub fn create_queue(&self, params: &CreateQueue) -> Result<()> {
        validate::qname(&params.qname)?;
        validate::vt(params.vt)?;
        validate::delay(params.delay)?;
        validate::maxsize(params.maxsize)?;

        let now = self.store.time()?;
        let created = now.secs.to_string();
        let key = self.ns.queue_key(&params.qname);
        let set_nx = |field: &str, value: String| Op::HSetNx {
            key: key.clone(),
            field: field.to_string(),
            value,
        };

        let fields = [
            (field::VT, params.vt.to_string()),
            (field::DELAY, params.delay.to_string()),
            (field::MAXSIZE, params.maxsize.to_string()),
            (field::CREATED, created.clone()),
            (field::MODIFIED, created),
        ];
        let replies = self.store.exec(
            fields
                .iter()
                .map(|(name, value)| set_nx(name, value.clone()))
                .collect(),
        )?;
        if replies.iter().any(|r| r.as_i64() != Some(1)) {
            // Roll back the fields this attempt wrote so a partial hash
            // never gains the attributes of a queue.
            let written: Vec<String> = fields
                .iter()
                .zip(&replies)
                .filter(|(_, reply)| reply.as_i64() == Some(1))
                .map(|((name, _), _)| name.to_string())
                .collect();
            if !written.is_empty() {
                self.store.exec(vec![Op::HDel {
                    key: key.clone(),
                    fields: written,
                }])?;
            }
            debug!("queue attributes already present");
            return Err(RsmqError::QueueAlreadyExists(params.qname.clone()));
        }

        self.store.exec(vec![Op::SAdd {
            key: self.ns.queues_key(),
            member: params.qname.clone(),
        }])?;
        info!(vt = params.vt, delay = params.delay, maxsize = %params.maxsize, "queue created");
        Ok(())
    }

    /// Delete a queue together with all of its messages.
    #[tracing::instrument(skip(self))]
    pub fn delete_queue(&self, qname: &str) -> Result<()> {
        validate::qname(qname)?;

        let replies = self.store.exec(vec![
            Op::Del {
                key: self.ns.index_key(qname),
            },
            Op::Del {
                key: self.ns.queue_key(qname),
            },
            Op::SRem {
                key: self.ns.queues_key(),
                member: qname.to_string(),
            },
        ])?;
        let [_, attrs, _] = take_replies::<3>(replies)?;
        if attrs.as_i64() != Some(1) {
            return Err(RsmqError::QueueNotFound(qname.to_string()));
        }
        info!("queue deleted");
        Ok(())
    }

    /// Update one or more queue attributes and return the new snapshot.
    #[tracing::instrument(skip_all, fields(queue = %params.qname))]
    pub fn set_queue_attributes(&self, params: &SetQueueAttributes) -> Result<QueueAttributes> {
        validate::qname(&params.qname)?;
        if params.is_empty() {
            return Err(ValidationError::NoAttributes.into());
        }
        if let Some(vt) = params.vt {
            validate::vt(vt)?;
        }
        if let Some(delay) = params.delay {
            validate::delay(delay)?;
        }
        if let Some(maxsize) = params.maxsize {
            validate::maxsize(maxsize)?;
        }

        let queue = self.get_queue(&params.qname, false)?;
        let key = self.ns.queue_key(&params.qname);
        let set = |field: &str, value: String| Op::HSet {
            key: key.clone(),
            field: field.to_string(),
            value,
        };

        let mut ops = vec![set(field::MODIFIED, (queue.ts / 1000).to_string())];
        if let Some(vt) = params.vt {
            ops.push(set(field::VT, vt.to_string()));
        }
        if let Some(delay) = params.delay {
            ops.push(set(field::DELAY, delay.to_string()));
        }
        if let Some(maxsize) = params.maxsize {
            ops.push(set(field::MAXSIZE, maxsize.to_string()));
        }
        self.store.exec(ops)?;
        info!(vt = ?params.vt, delay = ?params.delay, maxsize = ?params.maxsize, "queue attributes updated");

        self.get_queue_attributes(&params.qname)
    }

    /// Attributes, counters and index statistics of a queue.
    #[tracing::instrument(skip(self))]
    pub fn get_queue_attributes(&self, qname: &str) -> Result<QueueAttributes> {
        validate::qname(qname)?;

        let now = self.store.time()?;
        let index = self.ns.index_key(qname);
        let replies = self.store.exec(vec![
            Op::HMGet {
                key: self.ns.queue_key(qname),
                fields: [
                    field::VT,
                    field::DELAY,
                    field::MAXSIZE,
                    field::TOTALRECV,
                    field::TOTALSENT,
                    field::CREATED,
                    field::MODIFIED,
                ]
                .iter()
                .map(|f| f.to_string())
                .collect(),
            },
            Op::ZCard {
                key: index.clone(),
            },
            Op::ZCount {
                key: index,
                min: f64::NEG_INFINITY,
                max: now.as_millis() as f64,
            },
        ])?;
        let [attrs, msgs, due] = take_replies::<3>(replies)?;
        let attrs = expect_array(attrs, 7)?;
        if attrs[..3].iter().any(Reply::is_nil) {
            return Err(RsmqError::QueueNotFound(qname.to_string()));
        }

        let msgs = parse_counter(&msgs, "msgs")?;
        let due = parse_counter(&due, "due")?;
        Ok(QueueAttributes {
            vt: parse_field(&attrs[0], field::VT)?,
            delay: parse_field(&attrs[1], field::DELAY)?,
            maxsize: parse_field(&attrs[2], field::MAXSIZE)?,
            totalrecv: parse_counter(&attrs[3], field::TOTALRECV)?,
            totalsent: parse_counter(&attrs[4], field::TOTALSENT)?,
            created: parse_counter(&attrs[5], field::CREATED)?,
            modified: parse_counter(&attrs[6], field::MODIFIED)?,
            msgs,
            hiddenmsgs: msgs.saturating_sub(due),
        })
    }

    /// Names of all queues in the namespace, sorted.
    #[tracing::instrument(skip(self))]
    pub fn list_queues(&self) -> Result<Vec<String>> {
        let replies = self.store.exec(vec![Op::SMembers {
            key: self.ns.queues_key(),
        }])?;
        let [members] = take_replies::<1>(replies)?;
        let mut names: Vec<String> = members
            .into_array()
            .unwrap_or_default()
            .into_iter()
            .filter_map(Reply::into_string)
            .collect();
        names.sort_unstable();
        debug!(count = names.len(), "queues listed");
        Ok(names)
    }
}
