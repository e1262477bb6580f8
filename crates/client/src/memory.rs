//! In-memory reference driver.
//!
//! A complete [`Driver`] over a process-local store, used as the
//! executable collaborator in examples and integration tests. It
//! implements both deferred-execution models faithfully:
//!
//! - the pipeline session applies each request as it is dispatched (the
//!   server processes commands as they arrive) but resolves the deferred
//!   reply cells only at `flush`;
//! - the transaction session queues requests without touching the store
//!   and applies all of them under one lock at `exec`, returning the
//!   ordered raw-result list — nothing is observable before commit.
//!
//! Store-level failures (wrong type, non-numeric counter) are returned as
//! `RawReply::Error` values, the same way a real server reports them.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use prism_core::{CommandId, CommandRequest, ExecMode, RawReply, Result};

use crate::driver::{DeferredReply, Driver, PipelineSession, ReplySink, TransactionSession};

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_INTEGER: &str = "ERR value is not an integer or out of range";
const NOT_FLOAT: &str = "ERR value is not a valid float";

#[derive(Debug, Clone)]
enum Data {
    Text(Vec<u8>),
    Hash(HashMap<String, Vec<u8>>),
    Set(Vec<String>),
    Zset(Vec<(String, f64)>),
    List(VecDeque<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct Record {
    data: Data,
    expires_at: Option<Instant>,
}

impl Record {
    fn new(data: Data) -> Self {
        Record {
            data,
            expires_at: None,
        }
    }

    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

#[derive(Debug, Default)]
struct Store {
    entries: HashMap<String, Record>,
}

/// An in-memory store exposed through the driver contract.
///
/// Cloning is cheap; clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    store: Arc<Mutex<Store>>,
}

impl MemoryDriver {
    /// Create an empty store.
    pub fn new() -> Self {
        MemoryDriver::default()
    }
}

impl Driver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn supports(&self, _command: CommandId, _mode: ExecMode) -> bool {
        true
    }

    fn execute(&self, request: &CommandRequest) -> Result<RawReply> {
        Ok(apply(&mut self.store.lock(), request))
    }

    fn open_pipeline(&self) -> Result<Box<dyn PipelineSession>> {
        Ok(Box::new(MemoryPipeline {
            store: self.store.clone(),
            staged: Vec::new(),
        }))
    }

    fn open_transaction(&self) -> Result<Box<dyn TransactionSession>> {
        Ok(Box::new(MemoryTransaction {
            store: self.store.clone(),
            queued: Vec::new(),
        }))
    }
}

struct MemoryPipeline {
    store: Arc<Mutex<Store>>,
    staged: Vec<(ReplySink, RawReply)>,
}

impl PipelineSession for MemoryPipeline {
    fn dispatch(&mut self, request: &CommandRequest) -> Result<DeferredReply> {
        let raw = apply(&mut self.store.lock(), request);
        let (reply, sink) = DeferredReply::pending();
        self.staged.push((sink, raw));
        Ok(reply)
    }

    fn flush(&mut self, _timeout: Duration) -> Result<()> {
        for (sink, raw) in self.staged.drain(..) {
            sink.resolve(raw);
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.staged.clear();
    }
}

struct MemoryTransaction {
    store: Arc<Mutex<Store>>,
    queued: Vec<CommandRequest>,
}

impl TransactionSession for MemoryTransaction {
    fn queue(&mut self, request: &CommandRequest) -> Result<()> {
        self.queued.push(request.clone());
        Ok(())
    }

    fn exec(&mut self, _timeout: Duration) -> Result<Vec<RawReply>> {
        // One lock across the whole batch: commits are atomic.
        let mut store = self.store.lock();
        Ok(self
            .queued
            .drain(..)
            .map(|request| apply(&mut store, &request))
            .collect())
    }

    fn discard(&mut self) -> Result<()> {
        self.queued.clear();
        Ok(())
    }
}

// ==================== Command evaluation ====================

fn apply(store: &mut Store, request: &CommandRequest) -> RawReply {
    match request.id {
        CommandId::Get => read_text(store, request.arg_str(0), |data| {
            RawReply::Bytes(data.clone())
        }),
        CommandId::Set => {
            let (key, value) = (request.arg_str(0), request.arg_bytes(1));
            store.entries.insert(key, Record::new(Data::Text(value)));
            RawReply::status("OK")
        }
        CommandId::SetEx => {
            let key = request.arg_str(0);
            let Some(secs) = request.arg_str(1).parse::<u64>().ok() else {
                return RawReply::Error(NOT_INTEGER.to_string());
            };
            let mut record = Record::new(Data::Text(request.arg_bytes(2)));
            record.expires_at = Some(Instant::now() + Duration::from_secs(secs));
            store.entries.insert(key, record);
            RawReply::status("OK")
        }
        CommandId::Append => with_text(store, request.arg_str(0), |data| {
            data.extend_from_slice(&request.arg_bytes(1));
            RawReply::Int(data.len() as i64)
        }),
        CommandId::Strlen => read_text(store, request.arg_str(0), |data| {
            RawReply::Int(data.len() as i64)
        })
        .or_zero(),
        CommandId::MGet => RawReply::Array(
            request
                .args
                .iter()
                .map(|key| {
                    let key = String::from_utf8_lossy(key).into_owned();
                    match live(store, &key) {
                        Some(Record {
                            data: Data::Text(data),
                            ..
                        }) => RawReply::Bytes(data.clone()),
                        _ => RawReply::Nil,
                    }
                })
                .collect(),
        ),
        CommandId::Incr => incr_by(store, request.arg_str(0), 1),
        CommandId::IncrBy => match request.arg_str(1).parse::<i64>() {
            Ok(delta) => incr_by(store, request.arg_str(0), delta),
            Err(_) => RawReply::Error(NOT_INTEGER.to_string()),
        },
        CommandId::Decr => incr_by(store, request.arg_str(0), -1),
        CommandId::Del => {
            let mut removed = 0;
            for key in &request.args {
                let key = String::from_utf8_lossy(key).into_owned();
                let existed = live(store, &key).is_some();
                if existed {
                    store.entries.remove(&key);
                    removed += 1;
                }
            }
            RawReply::Int(removed)
        }
        CommandId::Exists => RawReply::Int(live(store, &request.arg_str(0)).is_some() as i64),
        CommandId::Expire => {
            let key = request.arg_str(0);
            let Some(secs) = request.arg_str(1).parse::<u64>().ok() else {
                return RawReply::Error(NOT_INTEGER.to_string());
            };
            match live_mut(store, &key) {
                Some(record) => {
                    record.expires_at = Some(Instant::now() + Duration::from_secs(secs));
                    RawReply::Int(1)
                }
                None => RawReply::Int(0),
            }
        }
        CommandId::Ttl => match live(store, &request.arg_str(0)) {
            None => RawReply::Int(-2),
            Some(record) => match record.expires_at {
                None => RawReply::Int(-1),
                Some(at) => {
                    let remaining = at.saturating_duration_since(Instant::now());
                    RawReply::Int(remaining.as_secs() as i64)
                }
            },
        },
        CommandId::HSet => with_hash(store, request.arg_str(0), |hash| {
            let added = hash
                .insert(request.arg_str(1), request.arg_bytes(2))
                .is_none();
            RawReply::Int(added as i64)
        }),
        CommandId::HGet => read_hash(store, request.arg_str(0), |hash| {
            match hash.get(&request.arg_str(1)) {
                Some(value) => RawReply::Bytes(value.clone()),
                None => RawReply::Nil,
            }
        }),
        CommandId::HGetAll => read_hash(store, request.arg_str(0), |hash| {
            RawReply::Map(
                hash.iter()
                    .map(|(field, value)| {
                        (
                            RawReply::bytes(field.as_bytes().to_vec()),
                            RawReply::Bytes(value.clone()),
                        )
                    })
                    .collect(),
            )
        }),
        CommandId::HDel => with_hash(store, request.arg_str(0), |hash| {
            let removed = request.args[1..]
                .iter()
                .filter(|field| hash.remove(&String::from_utf8_lossy(field).into_owned()).is_some())
                .count();
            RawReply::Int(removed as i64)
        }),
        CommandId::HLen => read_hash(store, request.arg_str(0), |hash| {
            RawReply::Int(hash.len() as i64)
        }),
        CommandId::SAdd => with_set(store, request.arg_str(0), |members| {
            let mut added = 0;
            for member in &request.args[1..] {
                let member = String::from_utf8_lossy(member).into_owned();
                if !members.contains(&member) {
                    members.push(member);
                    added += 1;
                }
            }
            RawReply::Int(added)
        }),
        CommandId::SRem => with_set(store, request.arg_str(0), |members| {
            let before = members.len();
            for member in &request.args[1..] {
                let member = String::from_utf8_lossy(member).into_owned();
                members.retain(|m| *m != member);
            }
            RawReply::Int((before - members.len()) as i64)
        }),
        CommandId::SMembers => read_set(store, request.arg_str(0), |members| {
            RawReply::Array(
                members
                    .iter()
                    .map(|m| RawReply::bytes(m.as_bytes().to_vec()))
                    .collect(),
            )
        }),
        CommandId::SIsMember => read_set(store, request.arg_str(0), |members| {
            RawReply::Int(members.contains(&request.arg_str(1)) as i64)
        }),
        CommandId::SCard => read_set(store, request.arg_str(0), |members| {
            RawReply::Int(members.len() as i64)
        }),
        CommandId::ZAdd => {
            let Ok(score) = request.arg_str(1).parse::<f64>() else {
                return RawReply::Error(NOT_FLOAT.to_string());
            };
            with_zset(store, request.arg_str(0), |scored| {
                let member = request.arg_str(2);
                match scored.iter_mut().find(|(m, _)| *m == member) {
                    Some(entry) => {
                        entry.1 = score;
                        RawReply::Int(0)
                    }
                    None => {
                        scored.push((member, score));
                        RawReply::Int(1)
                    }
                }
            })
        }
        CommandId::ZScore => read_zset(store, request.arg_str(0), |scored| {
            match scored.iter().find(|(m, _)| *m == request.arg_str(1)) {
                Some((_, score)) => RawReply::bytes(fmt_score(*score).into_bytes()),
                None => RawReply::Nil,
            }
        }),
        CommandId::ZCard => read_zset(store, request.arg_str(0), |scored| {
            RawReply::Int(scored.len() as i64)
        }),
        CommandId::ZRange => read_zset(store, request.arg_str(0), |scored| {
            let mut ranked = scored.to_vec();
            ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            let (start, stop) = match range_bounds(request, ranked.len()) {
                Some(bounds) => bounds,
                None => return RawReply::Array(Vec::new()),
            };
            RawReply::Array(
                ranked[start..=stop]
                    .iter()
                    .map(|(m, _)| RawReply::bytes(m.as_bytes().to_vec()))
                    .collect(),
            )
        }),
        CommandId::LPush => with_list(store, request.arg_str(0), |items| {
            for value in &request.args[1..] {
                items.push_front(value.clone());
            }
            RawReply::Int(items.len() as i64)
        }),
        CommandId::RPush => with_list(store, request.arg_str(0), |items| {
            for value in &request.args[1..] {
                items.push_back(value.clone());
            }
            RawReply::Int(items.len() as i64)
        }),
        CommandId::LPop => match live_mut(store, &request.arg_str(0)) {
            None => RawReply::Nil,
            Some(record) => match &mut record.data {
                Data::List(items) => match items.pop_front() {
                    Some(value) => RawReply::Bytes(value),
                    None => RawReply::Nil,
                },
                _ => RawReply::Error(WRONG_TYPE.to_string()),
            },
        },
        CommandId::LRange => read_list(store, request.arg_str(0), |items| {
            let (start, stop) = match range_bounds(request, items.len()) {
                Some(bounds) => bounds,
                None => return RawReply::Array(Vec::new()),
            };
            RawReply::Array(
                items
                    .iter()
                    .skip(start)
                    .take(stop - start + 1)
                    .map(|value| RawReply::Bytes(value.clone()))
                    .collect(),
            )
        }),
        CommandId::LLen => read_list(store, request.arg_str(0), |items| {
            RawReply::Int(items.len() as i64)
        }),
        CommandId::Ping => RawReply::status("PONG"),
        CommandId::Echo => RawReply::Bytes(request.arg_bytes(0)),
    }
}

// ==================== Store helpers ====================

fn live<'a>(store: &'a mut Store, key: &str) -> Option<&'a Record> {
    if store.entries.get(key).is_some_and(Record::expired) {
        store.entries.remove(key);
    }
    store.entries.get(key)
}

fn live_mut<'a>(store: &'a mut Store, key: &str) -> Option<&'a mut Record> {
    if store.entries.get(key).is_some_and(Record::expired) {
        store.entries.remove(key);
    }
    store.entries.get_mut(key)
}

fn read_text(store: &mut Store, key: String, read: impl FnOnce(&Vec<u8>) -> RawReply) -> RawReply {
    match live(store, &key) {
        None => RawReply::Nil,
        Some(Record {
            data: Data::Text(data),
            ..
        }) => read(data),
        Some(_) => RawReply::Error(WRONG_TYPE.to_string()),
    }
}

fn with_text(store: &mut Store, key: String, edit: impl FnOnce(&mut Vec<u8>) -> RawReply) -> RawReply {
    let record = store
        .entries
        .entry(key)
        .and_modify(|record| {
            if record.expired() {
                *record = Record::new(Data::Text(Vec::new()));
            }
        })
        .or_insert_with(|| Record::new(Data::Text(Vec::new())));
    match &mut record.data {
        Data::Text(data) => edit(data),
        _ => RawReply::Error(WRONG_TYPE.to_string()),
    }
}

fn incr_by(store: &mut Store, key: String, delta: i64) -> RawReply {
    with_text(store, key, |data| {
        let current = if data.is_empty() {
            0
        } else {
            match std::str::from_utf8(data).ok().and_then(|s| s.parse::<i64>().ok()) {
                Some(n) => n,
                None => return RawReply::Error(NOT_INTEGER.to_string()),
            }
        };
        let next = current.saturating_add(delta);
        *data = next.to_string().into_bytes();
        RawReply::Int(next)
    })
}

macro_rules! typed_accessors {
    ($read:ident, $with:ident, $variant:ident, $ty:ty, $empty:expr) => {
        fn $read(store: &mut Store, key: String, read: impl FnOnce(&$ty) -> RawReply) -> RawReply {
            match live(store, &key) {
                None => read(&$empty),
                Some(Record {
                    data: Data::$variant(inner),
                    ..
                }) => read(inner),
                Some(_) => RawReply::Error(WRONG_TYPE.to_string()),
            }
        }

        fn $with(
            store: &mut Store,
            key: String,
            edit: impl FnOnce(&mut $ty) -> RawReply,
        ) -> RawReply {
            let record = store
                .entries
                .entry(key)
                .and_modify(|record| {
                    if record.expired() {
                        *record = Record::new(Data::$variant($empty));
                    }
                })
                .or_insert_with(|| Record::new(Data::$variant($empty)));
            match &mut record.data {
                Data::$variant(inner) => edit(inner),
                _ => RawReply::Error(WRONG_TYPE.to_string()),
            }
        }
    };
}

typed_accessors!(read_hash, with_hash, Hash, HashMap<String, Vec<u8>>, HashMap::new());
typed_accessors!(read_set, with_set, Set, Vec<String>, Vec::new());
typed_accessors!(read_zset, with_zset, Zset, Vec<(String, f64)>, Vec::new());
typed_accessors!(read_list, with_list, List, VecDeque<Vec<u8>>, VecDeque::new());

fn fmt_score(score: f64) -> String {
    if score.fract() == 0.0 && score.is_finite() && score.abs() < 1e17 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}

fn range_bounds(request: &CommandRequest, len: usize) -> Option<(usize, usize)> {
    let start = request.arg_str(1).parse::<i64>().ok()?;
    let stop = request.arg_str(2).parse::<i64>().ok()?;
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

trait OrZero {
    fn or_zero(self) -> RawReply;
}

impl OrZero for RawReply {
    // Length probes on missing keys answer 0, not nil.
    fn or_zero(self) -> RawReply {
        match self {
            RawReply::Nil => RawReply::Int(0),
            other => other,
        }
    }
}

// Argument access shorthand local to the evaluator.
trait ArgAccess {
    fn arg_str(&self, index: usize) -> String;
    fn arg_bytes(&self, index: usize) -> Vec<u8>;
}

impl ArgAccess for CommandRequest {
    fn arg_str(&self, index: usize) -> String {
        self.args
            .get(index)
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .unwrap_or_default()
    }

    fn arg_bytes(&self, index: usize) -> Vec<u8> {
        self.args.get(index).cloned().unwrap_or_default()
    }
}
