//! Deferred results and the pending queue.
//!
//! A [`FutureResult`] unifies "already have the value" and "value arrives
//! later" behind one blocking accessor. The owning batch writes the
//! converted value (or the batch-level error) into a shared slot at its
//! terminal transition; [`FutureResult::wait`] blocks on the batch
//! completion cell, then reads the slot. Waiting is idempotent — the slot
//! holds the converted result, so repeated calls return the same value and
//! the driver is never re-invoked.
//!
//! [`PendingReply`] is the type-erased queue entry a batch accumulates:
//! it owns the bound converter, the caller-visible slot, and (pipeline
//! mode) the driver's deferred reply cell. Erasure is what lets one FIFO
//! queue hold entries with different output types.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use prism_core::{CommandId, Error, RawReply, Result, Value};

use crate::convert::{apply, value_converter, Convert};
use crate::driver::DeferredReply;

/// Completion cell shared by a batch and every result it handed out.
///
/// Flips to done exactly once, at the batch's terminal transition
/// (sync/exec/discard/close/timeout), and wakes all waiters.
#[derive(Debug, Default)]
pub(crate) struct BatchCell {
    done: Mutex<bool>,
    cond: Condvar,
}

impl BatchCell {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(BatchCell::default())
    }

    /// Mark the batch terminal and wake all waiters.
    pub(crate) fn complete(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.cond.notify_all();
    }

    fn wait_until(&self, deadline: Instant) -> bool {
        let mut done = self.done.lock();
        while !*done {
            if self.cond.wait_until(&mut done, deadline).timed_out() {
                return *done;
            }
        }
        true
    }
}

type Slot<T> = Arc<Mutex<Option<Result<T>>>>;

/// A deferred, converted result from a pipelined or transactional batch.
///
/// Handed out by dispatch while the batch is open; resolves when the
/// owner completes the batch. May be moved to (and waited on from)
/// another thread; only the batch owner can complete it.
#[derive(Debug)]
pub struct FutureResult<T> {
    command: CommandId,
    slot: Slot<T>,
    batch: Arc<BatchCell>,
    patience: Duration,
}

impl<T: Clone> FutureResult<T> {
    /// The command this result belongs to.
    pub fn command(&self) -> CommandId {
        self.command
    }

    /// Whether the converted value (or error) is already available.
    pub fn is_ready(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Block until the owning batch completes, then return the converted
    /// value.
    ///
    /// Idempotent: repeated calls return the same result without touching
    /// the driver again. Bounded by the client's command timeout — if the
    /// owner never completes the batch, this reports `Error::Timeout`
    /// instead of blocking forever.
    pub fn wait(&self) -> Result<T> {
        if let Some(result) = self.slot.lock().clone() {
            return result;
        }

        let deadline = Instant::now() + self.patience;
        self.batch.wait_until(deadline);

        match self.slot.lock().clone() {
            Some(result) => result,
            None => Err(Error::Timeout {
                elapsed: self.patience,
            }),
        }
    }
}

/// Type-erased pending-queue entry.
///
/// One entry per dispatched operation, in dispatch order. The batch owner
/// drives entries to resolution exactly once, through [`fulfill`] /
/// [`take_resolved`] / [`fail`].
///
/// [`fulfill`]: PendingReply::fulfill
/// [`take_resolved`]: PendingReply::take_resolved
/// [`fail`]: PendingReply::fail
pub(crate) trait PendingReply: Send {
    /// The command this entry was queued for.
    fn command(&self) -> CommandId;

    /// Convert one raw reply: writes the typed slot and returns the
    /// `Value`-level rendering for the ordered batch collection.
    fn fulfill(&mut self, raw: RawReply) -> Result<Value>;

    /// Pipeline mode: consume the driver's deferred cell if it resolved.
    /// `None` means the driver never produced a reply for this entry.
    fn take_resolved(&mut self) -> Option<Result<Value>>;

    /// Resolve the entry with a batch-level failure.
    fn fail(&mut self, err: Error);
}

/// Concrete pending entry binding a converter to its slot.
pub(crate) struct QueuedEntry<C: Convert> {
    command: CommandId,
    converter: C,
    slot: Slot<C::Output>,
    deferred: Option<DeferredReply>,
}

impl<C: Convert> QueuedEntry<C> {
    /// Create an entry plus the caller-visible result for it.
    pub(crate) fn new(
        command: CommandId,
        converter: C,
        deferred: Option<DeferredReply>,
        batch: &Arc<BatchCell>,
        patience: Duration,
    ) -> (Self, FutureResult<C::Output>) {
        let slot: Slot<C::Output> = Arc::new(Mutex::new(None));
        let future = FutureResult {
            command,
            slot: slot.clone(),
            batch: batch.clone(),
            patience,
        };
        let entry = QueuedEntry {
            command,
            converter,
            slot,
            deferred,
        };
        (entry, future)
    }
}

impl<C> PendingReply for QueuedEntry<C>
where
    C: Convert + Send,
    C::Output: Send,
{
    fn command(&self) -> CommandId {
        self.command
    }

    fn fulfill(&mut self, raw: RawReply) -> Result<Value> {
        if let RawReply::Error(message) = raw {
            let err = Error::Operation {
                command: self.command,
                message,
            };
            *self.slot.lock() = Some(Err(err.clone()));
            return Err(err);
        }

        let rendering = value_converter(self.command).convert_value(self.command, raw.clone());
        let typed = apply(&self.converter, self.command, raw);
        *self.slot.lock() = Some(typed);
        rendering
    }

    fn take_resolved(&mut self) -> Option<Result<Value>> {
        let resolution = self.deferred.as_ref()?.take()?;
        Some(match resolution {
            Ok(raw) => self.fulfill(raw),
            Err(err) => {
                *self.slot.lock() = Some(Err(err.clone()));
                Err(err)
            }
        })
    }

    fn fail(&mut self, err: Error) {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(Err(err));
        }
    }
}

/// FIFO queue of pending entries, exclusively owned by one batch.
pub(crate) type PendingQueue = Vec<Box<dyn PendingReply>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::AsInt;

    fn entry_with_future(
        command: CommandId,
        batch: &Arc<BatchCell>,
    ) -> (QueuedEntry<AsInt>, FutureResult<i64>) {
        QueuedEntry::new(command, AsInt, None, batch, Duration::from_millis(50))
    }

    #[test]
    fn test_wait_is_idempotent() {
        let batch = BatchCell::new();
        let (mut entry, future) = entry_with_future(CommandId::Incr, &batch);

        entry.fulfill(RawReply::Int(7)).unwrap();
        batch.complete();

        assert_eq!(future.wait().unwrap(), 7);
        assert_eq!(future.wait().unwrap(), 7);
    }

    #[test]
    fn test_wait_blocks_until_batch_completes() {
        let batch = BatchCell::new();
        let (mut entry, future) =
            QueuedEntry::new(CommandId::Get, crate::convert::AsMaybeText, None, &batch, Duration::from_secs(2));

        let owner_batch = batch.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            entry.fulfill(RawReply::bytes(b"v".to_vec())).unwrap();
            owner_batch.complete();
        });

        assert_eq!(future.wait().unwrap(), Some("v".to_string()));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_times_out_when_owner_never_completes() {
        let batch = BatchCell::new();
        let (_entry, future) = entry_with_future(CommandId::Incr, &batch);

        match future.wait() {
            Err(Error::Timeout { .. }) => {}
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_fulfill_error_reply_poisons_slot() {
        let batch = BatchCell::new();
        let (mut entry, future) = entry_with_future(CommandId::Incr, &batch);

        let outcome = entry.fulfill(RawReply::Error("WRONGTYPE".into()));
        batch.complete();

        assert!(matches!(outcome, Err(Error::Operation { .. })));
        assert!(matches!(future.wait(), Err(Error::Operation { .. })));
    }

    #[test]
    fn test_fail_does_not_overwrite_resolution() {
        let batch = BatchCell::new();
        let (mut entry, future) = entry_with_future(CommandId::Incr, &batch);

        entry.fulfill(RawReply::Int(3)).unwrap();
        entry.fail(Error::Discarded);
        batch.complete();

        assert_eq!(future.wait().unwrap(), 3);
    }

    #[test]
    fn test_take_resolved_consumes_deferred_cell() {
        let batch = BatchCell::new();
        let (deferred, sink) = DeferredReply::pending();
        let (mut entry, future) = QueuedEntry::new(
            CommandId::Incr,
            AsInt,
            Some(deferred),
            &batch,
            Duration::from_millis(50),
        );

        assert!(entry.take_resolved().is_none());
        sink.resolve(RawReply::Int(11));
        assert_eq!(entry.take_resolved(), Some(Ok(Value::Int(11))));
        batch.complete();
        assert_eq!(future.wait().unwrap(), 11);
    }
}
