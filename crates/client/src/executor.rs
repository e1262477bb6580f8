//! Mode-aware command dispatch.
//!
//! One generic function per execution path, parameterized by the
//! operation's bound converter — composition instead of an inheritance
//! tree of per-driver command bases. The dispatch layer is the only code
//! that knows which driver-native handle shape it is adapting:
//!
//! - direct: the driver resolves the raw value in place; dispatch converts
//!   and returns the domain value synchronously.
//! - pipeline: the driver hands back a deferred cell; dispatch queues a
//!   pending entry and returns a [`FutureResult`] without blocking.
//! - transaction: the driver queues server-side; dispatch records a slot
//!   position in the pending queue (resolution comes from the commit-time
//!   raw list).
//!
//! Support checking happens first in every path, so an operation the
//! active driver cannot run in the active mode is rejected before any
//! network interaction.

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use prism_core::{CommandId, Error, ExecMode, Result};

use crate::convert::{apply, Convert};
use crate::driver::{Driver, PipelineSession, TransactionSession};
use crate::future::{BatchCell, FutureResult, PendingQueue, QueuedEntry};
use crate::ops::Op;

/// Reject `command` unless the driver supports it under `mode`.
pub(crate) fn check_support(driver: &dyn Driver, command: CommandId, mode: ExecMode) -> Result<()> {
    if driver.supports(command, mode) {
        Ok(())
    } else {
        Err(Error::Unsupported {
            command,
            mode,
            driver: driver.name().to_string(),
        })
    }
}

/// Execute one operation directly and return its converted value.
pub(crate) fn execute_direct<C: Convert>(driver: &dyn Driver, operation: Op<C>) -> Result<C::Output> {
    let command = operation.request.id;
    check_support(driver, command, ExecMode::Direct)?;
    trace!(command = %command, mode = %ExecMode::Direct, "dispatch");
    let raw = driver.execute(&operation.request)?;
    apply(&operation.converter, command, raw)
}

/// Fire one operation into an open pipeline and queue its pending entry.
pub(crate) fn queue_pipelined<C>(
    driver: &dyn Driver,
    session: &mut dyn PipelineSession,
    pending: &mut PendingQueue,
    batch: &Arc<BatchCell>,
    patience: Duration,
    operation: Op<C>,
) -> Result<FutureResult<C::Output>>
where
    C: Convert + Send + 'static,
    C::Output: Send + 'static,
{
    let command = operation.request.id;
    check_support(driver, command, ExecMode::Pipeline)?;
    trace!(command = %command, mode = %ExecMode::Pipeline, queued = pending.len(), "dispatch");
    let deferred = session.dispatch(&operation.request)?;
    let (entry, future) = QueuedEntry::new(command, operation.converter, Some(deferred), batch, patience);
    pending.push(Box::new(entry));
    Ok(future)
}

/// Queue one operation into an open transaction.
pub(crate) fn queue_transactional<C>(
    driver: &dyn Driver,
    session: &mut dyn TransactionSession,
    pending: &mut PendingQueue,
    batch: &Arc<BatchCell>,
    patience: Duration,
    operation: Op<C>,
) -> Result<FutureResult<C::Output>>
where
    C: Convert + Send + 'static,
    C::Output: Send + 'static,
{
    let command = operation.request.id;
    check_support(driver, command, ExecMode::Transaction)?;
    trace!(command = %command, mode = %ExecMode::Transaction, queued = pending.len(), "dispatch");
    session.queue(&operation.request)?;
    let (entry, future) = QueuedEntry::new(command, operation.converter, None, batch, patience);
    pending.push(Box::new(entry));
    Ok(future)
}
