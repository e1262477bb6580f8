//! The session facade.
//!
//! A [`Session`] owns one logical driver connection and exposes the typed
//! operation families. Direct calls resolve synchronously; `pipeline()` /
//! `multi()` open a batch that mutably borrows the session, so at most
//! one batch is in flight per connection and only its owner can complete
//! it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use prism_core::{CommandRequest, Error, Result, Status, Ttl, Value};

use crate::codec::{JsonCodec, ValueCodec};
use crate::config::ClientConfig;
use crate::convert::{Convert, RegistryConvert};
use crate::driver::Driver;
use crate::executor;
use crate::ops::{self, Op};
use crate::pipeline::Pipeline;
use crate::transaction::Transaction;

/// A typed client session over one driver connection.
pub struct Session {
    driver: Arc<dyn Driver>,
    config: ClientConfig,
    codec: Box<dyn ValueCodec>,
}

impl Session {
    /// Create a session over `driver` with the given configuration.
    pub fn new(driver: Arc<dyn Driver>, config: ClientConfig) -> Self {
        debug!(driver = driver.name(), "session opened");
        Session {
            driver,
            config,
            codec: Box::new(JsonCodec),
        }
    }

    /// Replace the structured-value codec.
    pub fn with_codec(mut self, codec: Box<dyn ValueCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Name of the driver beneath this session.
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub(crate) fn patience(&self) -> Duration {
        self.config.command_timeout
    }

    fn run<C: Convert>(&self, operation: Op<C>) -> Result<C::Output> {
        executor::execute_direct(self.driver.as_ref(), operation)
    }

    // ==================== Batch entry points ====================

    /// Open a pipelined batch on this connection.
    pub fn pipeline(&mut self) -> Result<Pipeline<'_>> {
        Pipeline::open(self)
    }

    /// Open a transaction (MULTI-equivalent) on this connection.
    pub fn multi(&mut self) -> Result<Transaction<'_>> {
        Transaction::open(self)
    }

    // ==================== Operation families ====================

    /// Fetch a string value. `None` when the key is missing.
    pub fn get(&mut self, key: &str) -> Result<Option<String>> {
        self.run(ops::get(key))
    }

    /// Fetch a value without assuming UTF-8.
    pub fn get_raw(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        self.run(ops::get_raw(key))
    }

    /// Store a value.
    pub fn set(&mut self, key: &str, value: impl Into<Vec<u8>>) -> Result<Status> {
        self.run(ops::set(key, value))
    }

    /// Store a value with an expiration.
    pub fn set_ex(&mut self, key: &str, value: impl Into<Vec<u8>>, ttl: Duration) -> Result<Status> {
        self.run(ops::set_ex(key, value, ttl))
    }

    /// Append to a value, returning the new length.
    pub fn append(&mut self, key: &str, value: impl Into<Vec<u8>>) -> Result<i64> {
        self.run(ops::append(key, value))
    }

    /// Length of a value; zero when missing.
    pub fn strlen(&mut self, key: &str) -> Result<i64> {
        self.run(ops::strlen(key))
    }

    /// Fetch many values, one entry per key in request order.
    pub fn mget(&mut self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        self.run(ops::mget(keys))
    }

    /// Increment a counter by one, returning the new value.
    pub fn incr(&mut self, key: &str) -> Result<i64> {
        self.run(ops::incr(key))
    }

    /// Increment a counter by `delta`.
    pub fn incr_by(&mut self, key: &str, delta: i64) -> Result<i64> {
        self.run(ops::incr_by(key, delta))
    }

    /// Decrement a counter by one.
    pub fn decr(&mut self, key: &str) -> Result<i64> {
        self.run(ops::decr(key))
    }

    /// Remove keys, returning how many existed.
    pub fn del(&mut self, keys: &[&str]) -> Result<i64> {
        self.run(ops::del(keys))
    }

    /// Whether a key exists.
    pub fn exists(&mut self, key: &str) -> Result<bool> {
        self.run(ops::exists(key))
    }

    /// Attach an expiration; `false` when the key is missing.
    pub fn expire(&mut self, key: &str, ttl: Duration) -> Result<bool> {
        self.run(ops::expire(key, ttl))
    }

    /// Remaining time-to-live.
    pub fn ttl(&mut self, key: &str) -> Result<Ttl> {
        self.run(ops::ttl(key))
    }

    /// Set a hash field, returning 1 when the field is new.
    pub fn hset(&mut self, key: &str, field: &str, value: impl Into<Vec<u8>>) -> Result<i64> {
        self.run(ops::hset(key, field, value))
    }

    /// Fetch a hash field.
    pub fn hget(&mut self, key: &str, field: &str) -> Result<Option<String>> {
        self.run(ops::hget(key, field))
    }

    /// Fetch all fields of a hash; empty when missing.
    pub fn hgetall(&mut self, key: &str) -> Result<HashMap<String, String>> {
        self.run(ops::hgetall(key))
    }

    /// Remove hash fields, returning how many existed.
    pub fn hdel(&mut self, key: &str, fields: &[&str]) -> Result<i64> {
        self.run(ops::hdel(key, fields))
    }

    /// Number of fields in a hash.
    pub fn hlen(&mut self, key: &str) -> Result<i64> {
        self.run(ops::hlen(key))
    }

    /// Add set members, returning how many were new.
    pub fn sadd(&mut self, key: &str, members: &[&str]) -> Result<i64> {
        self.run(ops::sadd(key, members))
    }

    /// Remove set members, returning how many existed.
    pub fn srem(&mut self, key: &str, members: &[&str]) -> Result<i64> {
        self.run(ops::srem(key, members))
    }

    /// Fetch all members of a set; empty when missing.
    pub fn smembers(&mut self, key: &str) -> Result<HashSet<String>> {
        self.run(ops::smembers(key))
    }

    /// Whether `member` is in the set.
    pub fn sismember(&mut self, key: &str, member: &str) -> Result<bool> {
        self.run(ops::sismember(key, member))
    }

    /// Cardinality of a set.
    pub fn scard(&mut self, key: &str) -> Result<i64> {
        self.run(ops::scard(key))
    }

    /// Add a scored member, returning 1 when the member is new.
    pub fn zadd(&mut self, key: &str, score: f64, member: &str) -> Result<i64> {
        self.run(ops::zadd(key, score, member))
    }

    /// Fetch a member's score.
    pub fn zscore(&mut self, key: &str, member: &str) -> Result<Option<f64>> {
        self.run(ops::zscore(key, member))
    }

    /// Cardinality of a sorted set.
    pub fn zcard(&mut self, key: &str) -> Result<i64> {
        self.run(ops::zcard(key))
    }

    /// Fetch members by rank range, lowest score first.
    pub fn zrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        self.run(ops::zrange(key, start, stop))
    }

    /// Push values to the head of a list, returning the new length.
    pub fn lpush(&mut self, key: &str, values: &[&str]) -> Result<i64> {
        self.run(ops::lpush(key, values))
    }

    /// Push values to the tail of a list, returning the new length.
    pub fn rpush(&mut self, key: &str, values: &[&str]) -> Result<i64> {
        self.run(ops::rpush(key, values))
    }

    /// Pop from the head of a list.
    pub fn lpop(&mut self, key: &str) -> Result<Option<String>> {
        self.run(ops::lpop(key))
    }

    /// Fetch a rank range of a list.
    pub fn lrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        self.run(ops::lrange(key, start, stop))
    }

    /// Length of a list; zero when missing.
    pub fn llen(&mut self, key: &str) -> Result<i64> {
        self.run(ops::llen(key))
    }

    /// Liveness probe; returns the server's status line.
    pub fn ping(&mut self) -> Result<String> {
        self.run(ops::ping())
    }

    /// Round-trip a payload through the server.
    pub fn echo(&mut self, message: impl Into<Vec<u8>>) -> Result<String> {
        self.run(ops::echo(message))
    }

    /// Execute a pre-built request; the result converts through the shape
    /// registry for its command.
    pub fn command(&mut self, request: CommandRequest) -> Result<Value> {
        self.run(Op {
            request,
            converter: RegistryConvert,
        })
    }

    // ==================== Structured values ====================

    /// Fetch and decode a structured value.
    pub fn get_json<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.get_raw(key)? else {
            return Ok(None);
        };
        let tree = self.codec.decode(&bytes)?;
        serde_json::from_value(tree)
            .map(Some)
            .map_err(|err| Error::Codec {
                reason: err.to_string(),
            })
    }

    /// Encode and store a structured value.
    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<Status> {
        let tree = serde_json::to_value(value).map_err(|err| Error::Codec {
            reason: err.to_string(),
        })?;
        let bytes = self.codec.encode(tree)?;
        self.set(key, bytes)
    }
}
