//! A message queue whose state lives entirely in Redis.
//!
//! Queues are a sorted set of message ids scored by visibility deadline plus
//! a hash of attributes and bodies. Claiming a message runs as a server-side
//! script so concurrent consumers never win the same message.

pub mod commands;
pub mod config;
pub mod error;
pub mod id;
pub mod keys;
pub mod lua;
pub mod message;
pub mod queue;
pub mod storage;
pub mod telemetry;
pub mod validate;

pub use commands::{
    ChangeMessageVisibility, CreateQueue, DeleteMessage, ReceiveMessage, Rsmq, SendMessage,
    SetQueueAttributes,
};
pub use config::{RedisConfig, RsmqConfig};
pub use error::{Result, RsmqError, StoreError, StoreResult, ValidationError};
pub use keys::Namespace;
pub use message::QueueMessage;
pub use queue::{MaxSize, QueueAttributes};
pub use storage::{Clock, ManualClock, MemoryStore, RedisStore, Store, SystemClock};
