//! Server-side scripts that claim, lease and re-score messages.
//!
//! Each script runs as one indivisible unit on the store. Keys and
//! arguments are positional:
//! - `KEYS[1]`: message index (sorted set)
//! - `KEYS[2]`: queue hash (attributes and bodies)
//! - `ARGV`: timestamps and ids as documented per script

pub mod bridge;
pub mod sandbox;

/// A named Lua script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Script {
    pub name: &'static str,
    pub source: &'static str,
}

/// Claim the earliest due message and delete it.
///
/// `ARGV[1]` is the current time (ms). Returns `{}` when nothing is due,
/// otherwise `{id, body, rc, fr}`.
pub const POP_MESSAGE: Script = Script {
    name: "pop_message",
    source: r#"
local msg = redis.call("ZRANGEBYSCORE", KEYS[1], "-inf", ARGV[1], "LIMIT", "0", "1")
if #msg == 0 then
    return {}
end
local id = msg[1]
redis.call("HINCRBY", KEYS[2], "totalrecv", 1)
local body = redis.call("HGET", KEYS[2], id)
local rc = redis.call("HINCRBY", KEYS[2], id .. ":rc", 1)
local fr
if rc == 1 then
    fr = ARGV[1]
else
    fr = redis.call("HGET", KEYS[2], id .. ":fr")
end
redis.call("ZREM", KEYS[1], id)
redis.call("HDEL", KEYS[2], id, id .. ":rc", id .. ":fr")
return {id, body, rc, fr}
"#,
};

/// Claim the earliest due message and hide it until a new deadline.
///
/// `ARGV[1]` is the current time (ms), `ARGV[2]` the new visibility
/// deadline (ms). Returns `{}` when nothing is due, otherwise
/// `{id, body, rc, fr}`.
pub const RECEIVE_MESSAGE: Script = Script {
    name: "receive_message",
    source: r#"
local msg = redis.call("ZRANGEBYSCORE", KEYS[1], "-inf", ARGV[1], "LIMIT", "0", "1")
if #msg == 0 then
    return {}
end
local id = msg[1]
redis.call("ZADD", KEYS[1], ARGV[2], id)
redis.call("HINCRBY", KEYS[2], "totalrecv", 1)
local body = redis.call("HGET", KEYS[2], id)
local rc = redis.call("HINCRBY", KEYS[2], id .. ":rc", 1)
local fr
if rc == 1 then
    redis.call("HSET", KEYS[2], id .. ":fr", ARGV[1])
    fr = ARGV[1]
else
    fr = redis.call("HGET", KEYS[2], id .. ":fr")
end
return {id, body, rc, fr}
"#,
};

/// Move an indexed message to a new deadline.
///
/// `ARGV[1]` is the message id, `ARGV[2]` the new deadline (ms). Returns 1,
/// or 0 when the message is not in the index.
pub const CHANGE_MESSAGE_VISIBILITY: Script = Script {
    name: "change_message_visibility",
    source: r#"
if not redis.call("ZSCORE", KEYS[1], ARGV[1]) then
    return 0
end
redis.call("ZADD", KEYS[1], ARGV[2], ARGV[1])
return 1
"#,
};

pub const ALL: [Script; 3] = [POP_MESSAGE, RECEIVE_MESSAGE, CHANGE_MESSAGE_VISIBILITY];
