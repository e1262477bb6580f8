//! Transactional batch execution.
//!
//! A transaction queues operations server-side (MULTI-equivalent) and
//! executes all of them atomically at commit. States: `Closed →
//! Open(queuing) → Committed | Discarded`. While open, dispatched
//! operations queue exactly like a pipeline but the driver executes none
//! of them; `exec` issues the commit and reconciles the single raw-result
//! list against the pending queue in FIFO order.
//!
//! `discard` rolls back: the queue clears without conversion and every
//! result already handed out reports `Error::Discarded`. `close` releases
//! the driver session and is safe after either terminal transition.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use prism_core::{CommandRequest, Error, Result, Status, Ttl, Value};

use crate::convert::{Convert, RegistryConvert};
use crate::driver::TransactionSession;
use crate::executor;
use crate::future::{BatchCell, FutureResult, PendingQueue};
use crate::ops::{self, Op};
use crate::reconcile::reconcile;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Open,
    Committed,
    Discarded,
    Failed,
}

/// One open transactional batch.
///
/// Mutably borrows its [`Session`] for its whole lifetime; see
/// [`Pipeline`](crate::Pipeline) for the single-writer rationale.
pub struct Transaction<'a> {
    session: &'a mut Session,
    driver_session: Option<Box<dyn TransactionSession>>,
    pending: PendingQueue,
    batch: Arc<BatchCell>,
    state: TxnState,
}

impl<'a> Transaction<'a> {
    pub(crate) fn open(session: &'a mut Session) -> Result<Self> {
        let driver_session = session.driver().open_transaction()?;
        debug!(driver = session.driver().name(), "transaction opened");
        Ok(Transaction {
            session,
            driver_session: Some(driver_session),
            pending: Vec::new(),
            batch: BatchCell::new(),
            state: TxnState::Open,
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
        if self.state != TxnState::Open {
            return Err(Error::Closed);
        }
        let patience = self.session.patience();
        let driver = self.session.driver().clone();
        let Some(driver_session) = self.driver_session.as_mut() else {
            return Err(Error::Closed);
        };
        executor::queue_transactional(
            driver.as_ref(),
            driver_session.as_mut(),
            &mut self.pending,
            &self.batch,
            patience,
            operation,
        )
    }

    /// Commit the batch.
    ///
    /// Returns each operation's converted result (or its per-operation
    /// error) in queue order. Structural failures — commit-time count
    /// mismatch, timeout, transport — are the `Err` of `exec` itself and
    /// poison every outstanding result.
    pub fn exec(&mut self) -> Result<Vec<Result<Value>>> {
        if self.state != TxnState::Open {
            return Err(Error::Closed);
        }
        let patience = self.session.patience();
        let Some(mut driver_session) = self.driver_session.take() else {
            return Err(Error::Closed);
        };

        debug!(queued = self.pending.len(), "transaction exec");
        let raws = match driver_session.exec(patience) {
            Ok(raws) => raws,
            Err(err) => {
                for entry in self.pending.iter_mut() {
                    entry.fail(err.clone());
                }
                self.pending.clear();
                self.batch.complete();
                self.state = TxnState::Failed;
                return Err(err);
            }
        };

        let outcomes = reconcile(&mut self.pending, raws);
        self.batch.complete();
        self.state = if outcomes.is_ok() {
            TxnState::Committed
        } else {
            TxnState::Failed
        };
        outcomes
    }

    /// Roll the batch back.
    ///
    /// Clears the queue without conversion; every result already handed
    /// out reports `Error::Discarded` when waited on.
    pub fn discard(&mut self) -> Result<()> {
        if self.state != TxnState::Open {
            return Err(Error::Closed);
        }
        let Some(mut driver_session) = self.driver_session.take() else {
            return Err(Error::Closed);
        };

        debug!(queued = self.pending.len(), "transaction discard");
        let discarded = driver_session.discard();
        for entry in self.pending.iter_mut() {
            entry.fail(Error::Discarded);
        }
        self.pending.clear();
        self.batch.complete();
        self.state = TxnState::Discarded;
        discarded
    }

    /// Release the underlying batch resource.
    ///
    /// An open transaction is discarded; after a terminal transition this
    /// is a no-op. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.state == TxnState::Open {
            let _ = self.discard();
        }
        self.driver_session = None;
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

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
