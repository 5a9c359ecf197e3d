//! Keyspace layout.
//!
//! Every key starts with the namespace prefix (`<ns>:`):
//! - `<ns>:<qname>`: sorted set, message id -> visibility deadline (ms)
//! - `<ns>:<qname>:Q`: hash, queue attributes plus `<id>`, `<id>:rc`, `<id>:fr`
//! - `<ns>:QUEUES`: set of queue names

const QUEUE_SUFFIX: &str = ":Q";
const QUEUES: &str = "QUEUES";

/// Queue attribute field names in the queue hash.
pub mod field {
    pub const VT: &str = "vt";
    pub const DELAY: &str = "delay";
    pub const MAXSIZE: &str = "maxsize";
    pub const TOTALRECV: &str = "totalrecv";
    pub const TOTALSENT: &str = "totalsent";
    pub const CREATED: &str = "created";
    pub const MODIFIED: &str = "modified";
}

/// Namespace prefix applied to every key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    prefix: String,
}

impl Namespace {
    /// Build a namespace from its bare name, e.g. `rsmq` -> `rsmq:`.
    pub fn new(ns: &str) -> Self {
        let ns = ns.trim_end_matches(':');
        Self {
            prefix: format!("{ns}:"),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Sorted set holding the message index.
    pub fn index_key(&self, qname: &str) -> String {
        format!("{}{qname}", self.prefix)
    }

    /// Hash holding queue attributes and message bodies.
    pub fn queue_key(&self, qname: &str) -> String {
        format!("{}{qname}{QUEUE_SUFFIX}", self.prefix)
    }

    /// Set of all queue names in this namespace.
    pub fn queues_key(&self) -> String {
        format!("{}{QUEUES}", self.prefix)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new("rsmq")
    }
}

/// Hash field holding the receive count of a message.
pub fn rc_field(id: &str) -> String {
    format!("{id}:rc")
}

/// Hash field holding the first-receive timestamp of a message.
pub fn fr_field(id: &str) -> String {
    format!("{id}:fr")
}
