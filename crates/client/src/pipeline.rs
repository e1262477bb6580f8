//! Pipelined batch execution.
//!
//! A pipeline fires many operations without waiting for individual
//! replies, then collects them together. States: `Closed → Open →
//! (Draining) → Closed`. While open, every dispatched operation appends
//! to the pending queue and hands back a [`FutureResult`] without
//! blocking; [`Pipeline::sync`] flushes the driver, waits for outstanding
//! replies bounded by the configured command timeout, and drains the
//! queue.
//!
//! Partial failures do not abort siblings: an operation the store
//! rejected keeps its error on its own result, and `sync` surfaces the
//! first-seen failure as the aggregate error. On timeout, replies the
//! driver resolved in time remain readable from their `FutureResult`s;
//! the rest report the timeout.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use prism_core::{CommandRequest, Error, Result, Status, Ttl, Value};

use crate::convert::{Convert, RegistryConvert};
use crate::driver::PipelineSession;
use crate::executor;
use crate::future::{BatchCell, FutureResult, PendingQueue};
use crate::ops::{self, Op};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchState {
    Open,
    Closed,
}

/// One open pipelined batch.
///
/// Mutably borrows its [`Session`] for its whole lifetime, so a
/// connection carries at most one in-flight batch and only the batch
/// owner can drive it — the single-writer discipline is enforced at
/// compile time.
pub struct Pipeline<'a> {
    session: &'a mut Session,
    driver_session: Option<Box<dyn PipelineSession>>,
    pending: PendingQueue,
    batch: Arc<BatchCell>,
    state: BatchState,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn open(session: &'a mut Session) -> Result<Self> {
        let driver_session = session.driver().open_pipeline()?;
        debug!(driver = session.driver().name(), "pipeline opened");
        Ok(Pipeline {
            session,
            driver_session: Some(driver_session),
            pending: Vec::new(),
            batch: BatchCell::new(),
            state: BatchState::Open,
        })
    }

    /// Number of operations queued so far.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing has been queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn enqueue<C>(&mut self, operation: Op<C>) -> Result<FutureResult<C::Output>>
    where
        C: Convert + Send + 'static,
        C::Output: Send + 'static,
    {
        if self.state != BatchState::Open {
            return Err(Error::Closed);
        }
        let patience = self.session.patience();
        let driver = self.session.driver().clone();
        let Some(driver_session) = self.driver_session.as_mut() else {
            return Err(Error::Closed);
        };
        executor::queue_pipelined(
            driver.as_ref(),
            driver_session.as_mut(),
            &mut self.pending,
            &self.batch,
            patience,
            operation,
        )
    }

    /// Flush and await all queued operations, discarding their values.
    ///
    /// Returns the first-seen per-operation failure as the aggregate
    /// error; results already handed out stay individually inspectable.
    pub fn sync(&mut self) -> Result<()> {
        let outcomes = self.drain()?;
        match outcomes.into_iter().find_map(|outcome| outcome.err()) {
            Some(first_failure) => Err(first_failure),
            None => Ok(()),
        }
    }

    /// Flush and await all queued operations, returning each operation's
    /// converted result (or its per-operation error) in dispatch order.
    pub fn sync_all(&mut self) -> Result<Vec<Result<Value>>> {
        self.drain()
    }

    fn drain(&mut self) -> Result<Vec<Result<Value>>> {
        if self.state != BatchState::Open {
            return Err(Error::Closed);
        }
        let patience = self.session.patience();
        let Some(mut driver_session) = self.driver_session.take() else {
            return Err(Error::Closed);
        };

        debug!(queued = self.pending.len(), "pipeline sync");
        let flushed = driver_session.flush(patience);

        let mut outcomes = Vec::with_capacity(self.pending.len());
        for entry in self.pending.iter_mut() {
            match entry.take_resolved() {
                Some(outcome) => outcomes.push(outcome),
                None => {
                    // Resolved-in-time replies stay readable; the rest get
                    // the flush failure (timeout) or a driver-bug report.
                    let err = match &flushed {
                        Err(err) => err.clone(),
                        Ok(()) => Error::Transport {
                            reason: format!("driver left {} unresolved after flush", entry.command()),
                        },
                    };
                    entry.fail(err.clone());
                    outcomes.push(Err(err));
                }
            }
        }

        self.pending.clear();
        self.batch.complete();
        self.state = BatchState::Closed;

        flushed?;
        Ok(outcomes)
    }

    /// Abort without awaiting outstanding replies.
    ///
    /// Clears the queue; unresolved results report `Error::Closed`.
    /// Idempotent: safe after `sync` and safe to call twice.
    pub fn close(&mut self) {
        if self.state != BatchState::Open {
            return;
        }
        if let Some(mut driver_session) = self.driver_session.take() {
            driver_session.abort();
        }
        for entry in self.pending.iter_mut() {
            entry.fail(Error::Closed);
        }
        self.pending.clear();
        self.batch.complete();
        self.state = BatchState::Closed;
        debug!("pipeline closed without sync");
    }

    // ==================== Operation families ====================

    /// Queue a GET.
    pub fn get(&mut self, key: &str) -> Result<FutureResult<Option<String>>> {
        self.enqueue(ops::get(key))
    }

    /// Queue a binary-safe GET.
    pub fn get_raw(&mut self, key: &str) -> Result<FutureResult<Option<Vec<u8>>>> {
        self.enqueue(ops::get_raw(key))
    }

    /// Queue a SET.
    pub fn set(&mut self, key: &str, value: impl Into<Vec<u8>>) -> Result<FutureResult<Status>> {
        self.enqueue(ops::set(key, value))
    }

    /// Queue a SET with expiration.
    pub fn set_ex(
        &mut self,
        key: &str,
        value: impl Into<Vec<u8>>,
        ttl: Duration,
    ) -> Result<FutureResult<Status>> {
        self.enqueue(ops::set_ex(key, value, ttl))
    }

    /// Queue an APPEND.
    pub fn append(&mut self, key: &str, value: impl Into<Vec<u8>>) -> Result<FutureResult<i64>> {
        self.enqueue(ops::append(key, value))
    }

    /// Queue a STRLEN.
    pub fn strlen(&mut self, key: &str) -> Result<FutureResult<i64>> {
        self.enqueue(ops::strlen(key))
    }

    /// Queue an MGET.
    pub fn mget(&mut self, keys: &[&str]) -> Result<FutureResult<Vec<Option<String>>>> {
        self.enqueue(ops::mget(keys))
    }

    /// Queue an INCR.
    pub fn incr(&mut self, key: &str) -> Result<FutureResult<i64>> {
        self.enqueue(ops::incr(key))
    }

    /// Queue an INCRBY.
    pub fn incr_by(&mut self, key: &str, delta: i64) -> Result<FutureResult<i64>> {
        self.enqueue(ops::incr_by(key, delta))
    }

    /// Queue a DECR.
    pub fn decr(&mut self, key: &str) -> Result<FutureResult<i64>> {
        self.enqueue(ops::decr(key))
    }

    /// Queue a DEL.
    pub fn del(&mut self, keys: &[&str]) -> Result<FutureResult<i64>> {
        self.enqueue(ops::del(keys))
    }

    /// Queue an EXISTS.
    pub fn exists(&mut self, key: &str) -> Result<FutureResult<bool>> {
        self.enqueue(ops::exists(key))
    }

    /// Queue an EXPIRE.
    pub fn expire(&mut self, key: &str, ttl: Duration) -> Result<FutureResult<bool>> {
        self.enqueue(ops::expire(key, ttl))
    }

    /// Queue a TTL.
    pub fn ttl(&mut self, key: &str) -> Result<FutureResult<Ttl>> {
        self.enqueue(ops::ttl(key))
    }

    pub fn hset(
        &mut self,
        key: &str,
        field: &str,
        value: impl Into<Vec<u8>>,
    ) -> Result<FutureResult<i64>> {
        self.enqueue(ops::hset(key, field, value))
    }

    /// Queue an HGET.
    pub fn hget(&mut self, key: &str, field: &str) -> Result<FutureResult<Option<String>>> {
        self.enqueue(ops::hget(key, field))
    }

    /// Queue an HGETALL.
    pub fn hgetall(&mut self, key: &str) -> Result<FutureResult<HashMap<String, String>>> {
        self.enqueue(ops::hgetall(key))
    }

    /// Queue an HDEL.
    pub fn hdel(&mut self, key: &str, fields: &[&str]) -> Result<FutureResult<i64>> {
        self.enqueue(ops::hdel(key, fields))
    }

    /// Queue an HLEN.
    pub fn hlen(&mut self, key: &str) -> Result<FutureResult<i64>> {
        self.enqueue(ops::hlen(key))
    }

    /// Queue an SADD.
    pub fn sadd(&mut self, key: &str, members: &[&str]) -> Result<FutureResult<i64>> {
        self.enqueue(ops::sadd(key, members))
    }

    /// Queue an SREM.
    pub fn srem(&mut self, key: &str, members: &[&str]) -> Result<FutureResult<i64>> {
        self.enqueue(ops::srem(key, members))
    }

    /// Queue an SMEMBERS.
    pub fn smembers(&mut self, key: &str) -> Result<FutureResult<HashSet<String>>> {
        self.enqueue(ops::smembers(key))
    }

    /// Queue an SISMEMBER.
    pub fn sismember(&mut self, key: &str, member: &str) -> Result<FutureResult<bool>> {
        self.enqueue(ops::sismember(key, member))
    }

    /// Queue an SCARD.
    pub fn scard(&mut self, key: &str) -> Result<FutureResult<i64>> {
        self.enqueue(ops::scard(key))
    }

    /// Queue a ZADD.
    pub fn zadd(&mut self, key: &str, score: f64, member: &str) -> Result<FutureResult<i64>> {
        self.enqueue(ops::zadd(key, score, member))
    }

    /// Queue a ZSCORE.
    pub fn zscore(&mut self, key: &str, member: &str) -> Result<FutureResult<Option<f64>>> {
        self.enqueue(ops::zscore(key, member))
    }

    /// Queue a ZCARD.
    pub fn zcard(&mut self, key: &str) -> Result<FutureResult<i64>> {
        self.enqueue(ops::zcard(key))
    }

    /// Queue a ZRANGE.
    pub fn zrange(&mut self, key: &str, start: i64, stop: i64) -> Result<FutureResult<Vec<String>>> {
        self.enqueue(ops::zrange(key, start, stop))
    }

    /// Queue an LPUSH.
    pub fn lpush(&mut self, key: &str, values: &[&str]) -> Result<FutureResult<i64>> {
        self.enqueue(ops::lpush(key, values))
    }

    /// Queue an RPUSH.
    pub fn rpush(&mut self, key: &str, values: &[&str]) -> Result<FutureResult<i64>> {
        self.enqueue(ops::rpush(key, values))
    }

    /// Queue an LPOP.
    pub fn lpop(&mut self, key: &str) -> Result<FutureResult<Option<String>>> {
        self.enqueue(ops::lpop(key))
    }

    /// Queue an LRANGE.
    pub fn lrange(&mut self, key: &str, start: i64, stop: i64) -> Result<FutureResult<Vec<String>>> {
        self.enqueue(ops::lrange(key, start, stop))
    }

    /// Queue an LLEN.
    pub fn llen(&mut self, key: &str) -> Result<FutureResult<i64>> {
        self.enqueue(ops::llen(key))
    }

    /// Queue an ECHO.
    pub fn echo(&mut self, message: impl Into<Vec<u8>>) -> Result<FutureResult<String>> {
        self.enqueue(ops::echo(message))
    }

    /// Queue a pre-built request; the result converts through the shape
    /// registry for its command.
    pub fn command(&mut self, request: CommandRequest) -> Result<FutureResult<Value>> {
        self.enqueue(Op {
            request,
            converter: RegistryConvert,
        })
    }
}

impl Drop for Pipeline<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
