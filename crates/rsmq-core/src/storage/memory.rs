use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::lua::{bridge, Script};
use crate::storage::clock::{Clock, SystemClock};
use crate::storage::op::{format_score, Op, Reply};
use crate::storage::traits::Store;

/// Sorted-set score with a total order.
#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Members ordered by (score, member), like the server's skiplist.
#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<String, f64>,
    ordered: BTreeSet<(Score, String)>,
}

impl SortedSet {
    /// Insert or re-score a member. Returns true if the member is new.
    fn insert(&mut self, member: String, score: f64) -> bool {
        match self.scores.insert(member.clone(), score) {
            Some(old) => {
                self.ordered.remove(&(Score(old), member.clone()));
                self.ordered.insert((Score(score), member));
                false
            }
            None => {
                self.ordered.insert((Score(score), member));
                true
            }
        }
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered.remove(&(Score(score), member.to_string()));
                true
            }
            None => false,
        }
    }

    fn in_range(&self, min: f64, max: f64) -> impl Iterator<Item = &(Score, String)> {
        self.ordered
            .iter()
            .skip_while(move |(score, _)| score.0 < min)
            .take_while(move |(score, _)| score.0 <= max)
    }

    fn len(&self) -> usize {
        self.scores.len()
    }
}

#[derive(Debug)]
enum Entry {
    Hash(HashMap<String, String>),
    ZSet(SortedSet),
    Set(BTreeSet<String>),
}

impl Entry {
    fn is_empty(&self) -> bool {
        match self {
            Entry::Hash(h) => h.is_empty(),
            Entry::ZSet(z) => z.len() == 0,
            Entry::Set(s) => s.is_empty(),
        }
    }
}

/// The in-memory keyspace. Containers that become empty are removed, so
/// `DEL` and existence checks behave as on the server.
pub(crate) struct Keyspace {
    entries: HashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl Keyspace {
    fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    fn hash(&self, key: &str) -> StoreResult<Option<&HashMap<String, String>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Hash(h)) => Ok(Some(h)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn hash_mut(&mut self, key: &str) -> StoreResult<&mut HashMap<String, String>> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(HashMap::new()))
        {
            Entry::Hash(h) => Ok(h),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn zset(&self, key: &str) -> StoreResult<Option<&SortedSet>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::ZSet(z)) => Ok(Some(z)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn zset_mut(&mut self, key: &str) -> StoreResult<&mut SortedSet> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::ZSet(SortedSet::default()))
        {
            Entry::ZSet(z) => Ok(z),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn set(&self, key: &str) -> StoreResult<Option<&BTreeSet<String>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Set(s)) => Ok(Some(s)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn set_mut(&mut self, key: &str) -> StoreResult<&mut BTreeSet<String>> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()))
        {
            Entry::Set(s) => Ok(s),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn prune(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(Entry::is_empty) {
            self.entries.remove(key);
        }
    }

    /// Apply one command. Mutating commands on missing keys create them;
    /// anything left empty is dropped.
    pub(crate) fn apply(&mut self, op: Op) -> StoreResult<Reply> {
        let reply = match op {
            Op::HGet { key, field } => self
                .hash(&key)?
                .and_then(|h| h.get(&field))
                .map(|v| Reply::Bulk(v.clone()))
                .unwrap_or(Reply::Nil),
            Op::HMGet { key, fields } => {
                let hash = self.hash(&key)?;
                Reply::Array(
                    fields
                        .iter()
                        .map(|f| {
                            hash.and_then(|h| h.get(f))
                                .map(|v| Reply::Bulk(v.clone()))
                                .unwrap_or(Reply::Nil)
                        })
                        .collect(),
                )
            }
            Op::HSet { key, field, value } => {
                let added = self.hash_mut(&key)?.insert(field, value).is_none();
                Reply::Int(i64::from(added))
            }
            Op::HSetNx { key, field, value } => {
                let hash = self.hash_mut(&key)?;
                if hash.contains_key(&field) {
                    Reply::Int(0)
                } else {
                    hash.insert(field, value);
                    Reply::Int(1)
                }
            }
            Op::HDel { key, fields } => {
                let removed = if self.hash(&key)?.is_some() {
                    let hash = self.hash_mut(&key)?;
                    fields.iter().filter(|f| hash.remove(*f).is_some()).count()
                } else {
                    0
                };
                self.prune(&key);
                Reply::Int(removed as i64)
            }
            Op::HIncrBy { key, field, delta } => {
                let hash = self.hash_mut(&key)?;
                let current = match hash.get(&field) {
                    None => 0,
                    Some(v) => v.parse::<i64>().map_err(|_| {
                        StoreError::Script("ERR hash value is not an integer".to_string())
                    })?,
                };
                let next = current.checked_add(delta).ok_or_else(|| {
                    StoreError::Script("ERR increment or decrement would overflow".to_string())
                })?;
                hash.insert(field, next.to_string());
                Reply::Int(next)
            }
            Op::Del { key } => Reply::Int(i64::from(self.entries.remove(&key).is_some())),
            Op::ZAdd { key, score, member } => {
                let added = self.zset_mut(&key)?.insert(member, score);
                Reply::Int(i64::from(added))
            }
            Op::ZRem { key, members } => {
                let removed = if self.zset(&key)?.is_some() {
                    let zset = self.zset_mut(&key)?;
                    members.iter().filter(|m| zset.remove(m)).count()
                } else {
                    0
                };
                self.prune(&key);
                Reply::Int(removed as i64)
            }
            Op::ZScore { key, member } => self
                .zset(&key)?
                .and_then(|z| z.scores.get(&member))
                .map(|s| Reply::Bulk(format_score(*s)))
                .unwrap_or(Reply::Nil),
            Op::ZCard { key } => {
                Reply::Int(self.zset(&key)?.map(|z| z.len() as i64).unwrap_or(0))
            }
            Op::ZCount { key, min, max } => Reply::Int(
                self.zset(&key)?
                    .map(|z| z.in_range(min, max).count() as i64)
                    .unwrap_or(0),
            ),
            Op::ZRangeByScore {
                key,
                min,
                max,
                limit,
            } => {
                let members = match self.zset(&key)? {
                    None => Vec::new(),
                    Some(z) => {
                        let (offset, count) = limit.unwrap_or((0, usize::MAX));
                        z.in_range(min, max)
                            .skip(offset)
                            .take(count)
                            .map(|(_, m)| Reply::Bulk(m.clone()))
                            .collect()
                    }
                };
                Reply::Array(members)
            }
            Op::SAdd { key, member } => Reply::Int(i64::from(self.set_mut(&key)?.insert(member))),
            Op::SRem { key, member } => {
                let removed = self.set(&key)?.is_some() && self.set_mut(&key)?.remove(&member);
                self.prune(&key);
                Reply::Int(i64::from(removed))
            }
            Op::SMembers { key } => Reply::Array(
                self.set(&key)?
                    .map(|s| s.iter().map(|m| Reply::Bulk(m.clone())).collect())
                    .unwrap_or_default(),
            ),
            Op::Time => {
                let now = self.clock.now();
                Reply::Array(vec![
                    Reply::Bulk(now.secs.to_string()),
                    Reply::Bulk(now.micros.to_string()),
                ])
            }
        };
        Ok(reply)
    }
}

/// In-process store with the same command and script semantics as the
/// server. Transactions and scripts hold the keyspace lock for their whole
/// run, so both are atomic with respect to every other caller.
pub struct MemoryStore {
    keyspace: Mutex<Keyspace>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use `clock` to answer `TIME`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            keyspace: Mutex::new(Keyspace::new(clock)),
        }
    }

    /// Number of keys currently present.
    pub fn key_count(&self) -> usize {
        self.keyspace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn exec(&self, ops: Vec<Op>) -> StoreResult<Vec<Reply>> {
        let mut keyspace = self.keyspace.lock().unwrap_or_else(PoisonError::into_inner);
        ops.into_iter().map(|op| keyspace.apply(op)).collect()
    }

    fn eval(&self, script: &Script, keys: &[String], args: &[String]) -> StoreResult<Reply> {
        let mut keyspace = self.keyspace.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(script = script.name, "running script in memory store");
        bridge::run_script(script, keys, args, |op| keyspace.apply(op))
    }
}
