use crate::error::{StoreError, StoreResult};

/// A single backing-store command. Transactions are a `Vec<Op>`; scripts
/// issue the same commands through the `redis.call` bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    HGet { key: String, field: String },
    HMGet { key: String, fields: Vec<String> },
    HSet { key: String, field: String, value: String },
    HSetNx { key: String, field: String, value: String },
    HDel { key: String, fields: Vec<String> },
    HIncrBy { key: String, field: String, delta: i64 },
    Del { key: String },
    ZAdd { key: String, score: f64, member: String },
    ZRem { key: String, members: Vec<String> },
    ZScore { key: String, member: String },
    ZCard { key: String },
    ZCount { key: String, min: f64, max: f64 },
    ZRangeByScore {
        key: String,
        min: f64,
        max: f64,
        limit: Option<(usize, usize)>,
    },
    SAdd { key: String, member: String },
    SRem { key: String, member: String },
    SMembers { key: String },
    Time,
}

/// A decoded store reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Nil,
    Int(i64),
    Bulk(String),
    Array(Vec<Reply>),
    Status(String),
}

impl Reply {
    /// Integer value of an integer reply or a numeric bulk string.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Reply::Int(n) => Some(*n),
            Reply::Bulk(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Reply::Bulk(s) | Reply::Status(s) => Some(s),
            Reply::Int(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Reply>> {
        match self {
            Reply::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }
}

/// Render a score the way the server does: integral values without a
/// fractional part, infinities as `-inf` / `+inf`.
pub fn format_score(score: f64) -> String {
    if score == f64::INFINITY {
        "+inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if score.fract() == 0.0 && score.abs() < 1e17 {
        format!("{}", score as i64)
    } else {
        score.to_string()
    }
}

pub fn parse_score(raw: &str) -> StoreResult<f64> {
    match raw.to_ascii_lowercase().as_str() {
        "-inf" => Ok(f64::NEG_INFINITY),
        "+inf" | "inf" => Ok(f64::INFINITY),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|s| !s.is_nan())
            .ok_or_else(|| StoreError::Script("ERR value is not a valid float".to_string())),
    }
}

fn parse_int(raw: &str) -> StoreResult<i64> {
    raw.parse().map_err(|_| {
        StoreError::Script("ERR value is not an integer or out of range".to_string())
    })
}

fn parse_usize(raw: &str) -> StoreResult<usize> {
    raw.parse().map_err(|_| {
        StoreError::Script("ERR value is not an integer or out of range".to_string())
    })
}

fn arity(name: &str) -> StoreError {
    StoreError::Script(format!(
        "ERR wrong number of arguments for '{}' command",
        name.to_ascii_lowercase()
    ))
}

impl Op {
    /// Command name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Op::HGet { .. } => "HGET",
            Op::HMGet { .. } => "HMGET",
            Op::HSet { .. } => "HSET",
            Op::HSetNx { .. } => "HSETNX",
            Op::HDel { .. } => "HDEL",
            Op::HIncrBy { .. } => "HINCRBY",
            Op::Del { .. } => "DEL",
            Op::ZAdd { .. } => "ZADD",
            Op::ZRem { .. } => "ZREM",
            Op::ZScore { .. } => "ZSCORE",
            Op::ZCard { .. } => "ZCARD",
            Op::ZCount { .. } => "ZCOUNT",
            Op::ZRangeByScore { .. } => "ZRANGEBYSCORE",
            Op::SAdd { .. } => "SADD",
            Op::SRem { .. } => "SREM",
            Op::SMembers { .. } => "SMEMBERS",
            Op::Time => "TIME",
        }
    }

    /// Command arguments on the wire, excluding the name.
    pub fn args(&self) -> Vec<String> {
        match self {
            Op::HGet { key, field } => vec![key.clone(), field.clone()],
            Op::HMGet { key, fields } | Op::HDel { key, fields } => {
                let mut args = vec![key.clone()];
                args.extend(fields.iter().cloned());
                args
            }
            Op::HSet { key, field, value } | Op::HSetNx { key, field, value } => {
                vec![key.clone(), field.clone(), value.clone()]
            }
            Op::HIncrBy { key, field, delta } => {
                vec![key.clone(), field.clone(), delta.to_string()]
            }
            Op::Del { key }
            | Op::ZCard { key }
            | Op::SMembers { key } => vec![key.clone()],
            Op::ZAdd { key, score, member } => {
                vec![key.clone(), format_score(*score), member.clone()]
            }
            Op::ZRem { key, members } => {
                let mut args = vec![key.clone()];
                args.extend(members.iter().cloned());
                args
            }
            Op::ZScore { key, member }
            | Op::SAdd { key, member }
            | Op::SRem { key, member } => vec![key.clone(), member.clone()],
            Op::ZCount { key, min, max } => {
                vec![key.clone(), format_score(*min), format_score(*max)]
            }
            Op::ZRangeByScore {
                key,
                min,
                max,
                limit,
            } => {
                let mut args = vec![key.clone(), format_score(*min), format_score(*max)];
                if let Some((offset, count)) = limit {
                    args.push("LIMIT".to_string());
                    args.push(offset.to_string());
                    args.push(count.to_string());
                }
                args
            }
            Op::Time => Vec::new(),
        }
    }

    /// Parse a raw command (name first), as issued by a script.
    pub fn from_args(argv: &[String]) -> StoreResult<Op> {
        let (name, rest) = argv
            .split_first()
            .ok_or_else(|| StoreError::Script("ERR no command given".to_string()))?;
        let upper = name.to_ascii_uppercase();
        let s = |i: usize| -> StoreResult<String> {
            rest.get(i).cloned().ok_or_else(|| arity(&upper))
        };

        let op = match upper.as_str() {
            "HGET" if rest.len() == 2 => Op::HGet {
                key: s(0)?,
                field: s(1)?,
            },
            "HMGET" if rest.len() >= 2 => Op::HMGet {
                key: s(0)?,
                fields: rest[1..].to_vec(),
            },
            "HSET" if rest.len() == 3 => Op::HSet {
                key: s(0)?,
                field: s(1)?,
                value: s(2)?,
            },
            "HSETNX" if rest.len() == 3 => Op::HSetNx {
                key: s(0)?,
                field: s(1)?,
                value: s(2)?,
            },
            "HDEL" if rest.len() >= 2 => Op::HDel {
                key: s(0)?,
                fields: rest[1..].to_vec(),
            },
            "HINCRBY" if rest.len() == 3 => Op::HIncrBy {
                key: s(0)?,
                field: s(1)?,
                delta: parse_int(&rest[2])?,
            },
            "DEL" if rest.len() == 1 => Op::Del { key: s(0)? },
            "ZADD" if rest.len() == 3 => Op::ZAdd {
                key: s(0)?,
                score: parse_score(&rest[1])?,
                member: s(2)?,
            },
            "ZREM" if rest.len() >= 2 => Op::ZRem {
                key: s(0)?,
                members: rest[1..].to_vec(),
            },
            "ZSCORE" if rest.len() == 2 => Op::ZScore {
                key: s(0)?,
                member: s(1)?,
            },
            "ZCARD" if rest.len() == 1 => Op::ZCard { key: s(0)? },
            "ZCOUNT" if rest.len() == 3 => Op::ZCount {
                key: s(0)?,
                min: parse_score(&rest[1])?,
                max: parse_score(&rest[2])?,
            },
            "ZRANGEBYSCORE" if rest.len() == 3 || rest.len() == 6 => {
                let limit = if rest.len() == 6 {
                    if !rest[3].eq_ignore_ascii_case("LIMIT") {
                        return Err(StoreError::Script("ERR syntax error".to_string()));
                    }
                    Some((parse_usize(&rest[4])?, parse_usize(&rest[5])?))
                } else {
                    None
                };
                Op::ZRangeByScore {
                    key: s(0)?,
                    min: parse_score(&rest[1])?,
                    max: parse_score(&rest[2])?,
                    limit,
                }
            }
            "SADD" if rest.len() == 2 => Op::SAdd {
                key: s(0)?,
                member: s(1)?,
            },
            "SREM" if rest.len() == 2 => Op::SRem {
                key: s(0)?,
                member: s(1)?,
            },
            "SMEMBERS" if rest.len() == 1 => Op::SMembers { key: s(0)? },
            "TIME" if rest.is_empty() => Op::Time,
            "HGET" | "HMGET" | "HSET" | "HSETNX" | "HDEL" | "HINCRBY" | "DEL" | "ZADD" | "ZREM"
            | "ZSCORE" | "ZCARD" | "ZCOUNT" | "ZRANGEBYSCORE" | "SADD" | "SREM" | "SMEMBERS"
            | "TIME" => return Err(arity(&upper)),
            _ => {
                return Err(StoreError::Script(format!(
                    "ERR unknown command '{name}'"
                )))
            }
        };
        Ok(op)
    }
}
