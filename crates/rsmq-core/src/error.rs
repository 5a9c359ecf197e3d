/// Low-level backing store errors (transport, scripting, reply decoding).
/// This is the error type for the `Store` trait. Store operations only fail
/// with infrastructure errors, never domain errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("WRONGTYPE operation against key '{0}' holding the wrong kind of value")]
    WrongType(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Redis(err.to_string())
    }
}

impl From<mlua::Error> for StoreError {
    fn from(err: mlua::Error) -> Self {
        // Errors raised by `redis.call` cross the VM wrapped as external
        // errors, possibly inside callback errors. Recover the typed error.
        fn unwrap_store_error(err: &mlua::Error) -> Option<StoreError> {
            match err {
                mlua::Error::ExternalError(inner) => inner.downcast_ref::<StoreError>().cloned(),
                mlua::Error::CallbackError { cause, .. } => unwrap_store_error(cause),
                mlua::Error::WithContext { cause, .. } => unwrap_store_error(cause),
                _ => None,
            }
        }

        unwrap_store_error(&err).unwrap_or_else(|| StoreError::Script(err.to_string()))
    }
}

/// Input rejected before any store interaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid queue name: {0:?}")]
    InvalidQueueName(String),

    #[error("invalid message id: {0:?}")]
    InvalidMessageId(String),

    #[error("vt must be between 0 and 9999999, got {0}")]
    VtOutOfRange(u64),

    #[error("delay must be between 0 and 9999999, got {0}")]
    DelayOutOfRange(u64),

    #[error("maxsize must be between 1024 and 65536 or -1, got {0}")]
    MaxSizeOutOfRange(i64),

    #[error("message is {size} bytes, queue allows at most {max}")]
    MessageTooLong { size: usize, max: u32 },

    #[error("no attribute was supplied")]
    NoAttributes,
}

/// Application-level errors returned by the command layer.
#[derive(Debug, thiserror::Error)]
pub enum RsmqError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("queue already exists: {0}")]
    QueueAlreadyExists(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type Result<T> = std::result::Result<T, RsmqError>;
