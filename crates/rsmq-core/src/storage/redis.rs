use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use redis::{Client, Connection, Value};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::lua::{self, Script};
use crate::storage::op::{format_score, Op, Reply};
use crate::storage::traits::{ServerTime, Store};

/// Upper bound on idle connections kept for reuse.
const MAX_IDLE: usize = 8;

/// Redis-backed store.
///
/// Calls check a connection out of a small idle pool and return it once the
/// call succeeds, so consecutive calls share one connection. A connection
/// whose call failed is dropped. Threads that find the pool empty open
/// their own connection.
pub struct RedisStore {
    client: Client,
    timeout: Option<Duration>,
    scripts: HashMap<&'static str, redis::Script>,
    idle: Mutex<Vec<Connection>>,
}

impl RedisStore {
    /// Create a store for the server at `url` (e.g. `redis://127.0.0.1:6379/0`).
    /// No connection is made until the first call.
    pub fn open(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let scripts = lua::ALL
            .iter()
            .map(|script| (script.name, redis::Script::new(script.source)))
            .collect();
        Ok(Self {
            client,
            timeout: None,
            scripts,
            idle: Mutex::new(Vec::new()),
        })
    }

    /// Bound connect, read and write time for each call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `f` on a pooled connection.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> redis::RedisResult<T>,
    ) -> StoreResult<T> {
        let pooled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let mut con = match pooled {
            Some(con) => con,
            None => self.connect()?,
        };
        let result = f(&mut con)?;

        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < MAX_IDLE {
            idle.push(con);
        }
        Ok(result)
    }

    fn connect(&self) -> StoreResult<Connection> {
        debug!("opening redis connection");
        let con = match self.timeout {
            Some(timeout) => {
                let con = self.client.get_connection_with_timeout(timeout)?;
                con.set_read_timeout(Some(timeout))?;
                con.set_write_timeout(Some(timeout))?;
                con
            }
            None => self.client.get_connection()?,
        };
        Ok(con)
    }
}

fn command(op: &Op) -> redis::Cmd {
    let mut cmd = redis::cmd(op.name());
    for arg in op.args() {
        cmd.arg(arg);
    }
    cmd
}

fn reply_from_value(value: Value) -> StoreResult<Reply> {
    match value {
        Value::Nil => Ok(Reply::Nil),
        Value::Int(n) => Ok(Reply::Int(n)),
        Value::BulkString(bytes) => String::from_utf8(bytes)
            .map(Reply::Bulk)
            .map_err(|e| StoreError::Protocol(format!("non-UTF-8 bulk reply: {e}"))),
        Value::Array(items) => items
            .into_iter()
            .map(reply_from_value)
            .collect::<StoreResult<Vec<_>>>()
            .map(Reply::Array),
        Value::SimpleString(s) => Ok(Reply::Status(s)),
        Value::Okay => Ok(Reply::Status("OK".to_string())),
        Value::Double(d) => Ok(Reply::Bulk(format_score(d))),
        other => {
            warn!(reply = ?other, "unexpected reply type");
            Err(StoreError::Protocol(format!("unexpected reply: {other:?}")))
        }
    }
}

impl Store for RedisStore {
    fn exec(&self, ops: Vec<Op>) -> StoreResult<Vec<Reply>> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            pipe.add_command(command(op));
        }
        debug!(ops = ops.len(), "executing transaction");

        let values: Vec<Value> = self.with_connection(|con| pipe.query(con))?;
        if values.len() != ops.len() {
            return Err(StoreError::Protocol(format!(
                "transaction returned {} replies for {} operations",
                values.len(),
                ops.len()
            )));
        }
        values.into_iter().map(reply_from_value).collect()
    }

    fn eval(&self, script: &Script, keys: &[String], args: &[String]) -> StoreResult<Reply> {
        let fallback;
        let compiled = match self.scripts.get(script.name) {
            Some(compiled) => compiled,
            None => {
                fallback = redis::Script::new(script.source);
                &fallback
            }
        };

        let mut invocation = compiled.prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        for arg in args {
            invocation.arg(arg);
        }
        debug!(script = script.name, "invoking script");

        let value: Value = self.with_connection(|con| invocation.invoke(con))?;
        reply_from_value(value)
    }

    fn time(&self) -> StoreResult<ServerTime> {
        let value: Value = self.with_connection(|con| redis::cmd("TIME").query(con))?;
        ServerTime::from_reply(reply_from_value(value)?)
    }
}
