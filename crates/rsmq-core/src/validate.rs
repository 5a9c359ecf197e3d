//! Input checks run before any store interaction.

use crate::error::ValidationError;
use crate::id::ID_LEN;
use crate::queue::{MaxSize, MAX_MESSAGE_SIZE, MAX_SECONDS, MIN_MESSAGE_SIZE};

const MAX_QNAME_LEN: usize = 160;

/// Queue names: 1-160 characters of `[A-Za-z0-9_-]`.
pub fn qname(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_QNAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidQueueName(name.to_string()))
    }
}

/// Message ids: exactly 32 characters of `[A-Za-z0-9:]`.
pub fn message_id(id: &str) -> Result<(), ValidationError> {
    let valid = id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b':');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidMessageId(id.to_string()))
    }
}

pub fn vt(vt: u32) -> Result<(), ValidationError> {
    if vt <= MAX_SECONDS {
        Ok(())
    } else {
        Err(ValidationError::VtOutOfRange(u64::from(vt)))
    }
}

pub fn delay(delay: u32) -> Result<(), ValidationError> {
    if delay <= MAX_SECONDS {
        Ok(())
    } else {
        Err(ValidationError::DelayOutOfRange(u64::from(delay)))
    }
}

pub fn maxsize(size: MaxSize) -> Result<(), ValidationError> {
    match size {
        MaxSize::Unlimited => Ok(()),
        MaxSize::Bytes(n) if (MIN_MESSAGE_SIZE..=MAX_MESSAGE_SIZE).contains(&n) => Ok(()),
        MaxSize::Bytes(n) => Err(ValidationError::MaxSizeOutOfRange(i64::from(n))),
    }
}

/// Body length against the queue limit.
pub fn message_body(body: &str, limit: MaxSize) -> Result<(), ValidationError> {
    match limit {
        MaxSize::Bytes(max) if !limit.allows(body.len()) => Err(ValidationError::MessageTooLong {
            size: body.len(),
            max,
        }),
        _ => Ok(()),
    }
}
