//! Commit-time reconciliation of raw results against the pending queue.
//!
//! A transaction commit returns one raw entry per queued operation, in
//! queue order. Reconciliation walks both sequences in lock-step FIFO
//! order, applying each pending entry's bound converter to its raw entry —
//! never reordering, skipping, or coalescing.
//!
//! The length invariant is checked before anything converts: a mismatch
//! means a driver/core version skew or corrupted connection state, so the
//! whole batch fails with `Error::ResultCountMismatch` and no partial
//! conversion is attempted.

use tracing::warn;

use prism_core::{Error, RawReply, Result, Value};

use crate::future::PendingQueue;

/// Convert a commit-time raw-result list against the pending queue.
///
/// Consumes the queue destructively, one dequeue per raw entry. Every
/// entry's caller-visible slot is written: converted values on the happy
/// path, the count-mismatch error on the fatal path.
pub(crate) fn reconcile(pending: &mut PendingQueue, raws: Vec<RawReply>) -> Result<Vec<Result<Value>>> {
    if raws.len() != pending.len() {
        let err = Error::ResultCountMismatch {
            expected: pending.len(),
            actual: raws.len(),
        };
        warn!(expected = pending.len(), actual = raws.len(), "commit result count mismatch");
        for entry in pending.iter_mut() {
            entry.fail(err.clone());
        }
        pending.clear();
        return Err(err);
    }

    let mut outcomes = Vec::with_capacity(raws.len());
    for (mut entry, raw) in pending.drain(..).zip(raws) {
        outcomes.push(entry.fulfill(raw));
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use prism_core::CommandId;

    use crate::convert::AsInt;
    use crate::future::{BatchCell, FutureResult, QueuedEntry};

    fn queue_of_incrs(
        count: usize,
        batch: &Arc<BatchCell>,
    ) -> (PendingQueue, Vec<FutureResult<i64>>) {
        let mut pending: PendingQueue = Vec::new();
        let mut futures = Vec::new();
        for _ in 0..count {
            let (entry, future) =
                QueuedEntry::new(CommandId::Incr, AsInt, None, batch, Duration::from_millis(50));
            pending.push(Box::new(entry));
            futures.push(future);
        }
        (pending, futures)
    }

    #[test]
    fn test_reconcile_preserves_fifo_order() {
        let batch = BatchCell::new();
        let (mut pending, futures) = queue_of_incrs(3, &batch);

        let outcomes = reconcile(
            &mut pending,
            vec![RawReply::Int(1), RawReply::Int(2), RawReply::Int(3)],
        )
        .unwrap();
        batch.complete();

        assert_eq!(
            outcomes.into_iter().collect::<Result<Vec<Value>>>().unwrap(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
        assert!(pending.is_empty());
        for (index, future) in futures.iter().enumerate() {
            assert_eq!(future.wait().unwrap(), (index + 1) as i64);
        }
    }

    #[test]
    fn test_count_mismatch_is_fatal_and_converts_nothing() {
        let batch = BatchCell::new();
        let (mut pending, futures) = queue_of_incrs(3, &batch);

        let err = reconcile(&mut pending, vec![RawReply::Int(1), RawReply::Int(2)]).unwrap_err();
        batch.complete();

        match err {
            Error::ResultCountMismatch { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected ResultCountMismatch, got {:?}", other),
        }
        assert!(pending.is_empty());
        for future in &futures {
            assert!(matches!(
                future.wait(),
                Err(Error::ResultCountMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_per_operation_error_stays_an_entry() {
        let batch = BatchCell::new();
        let (mut pending, futures) = queue_of_incrs(2, &batch);

        let outcomes = reconcile(
            &mut pending,
            vec![RawReply::Int(1), RawReply::Error("WRONGTYPE".into())],
        )
        .unwrap();
        batch.complete();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0], Ok(Value::Int(1)));
        assert!(matches!(outcomes[1], Err(Error::Operation { .. })));
        assert_eq!(futures[0].wait().unwrap(), 1);
        assert!(matches!(futures[1].wait(), Err(Error::Operation { .. })));
    }

    #[test]
    fn test_empty_queue_empty_result() {
        let mut pending: PendingQueue = Vec::new();
        let outcomes = reconcile(&mut pending, Vec::new()).unwrap();
        assert!(outcomes.is_empty());
    }
}
