//! The driver contract the execution pipeline consumes.
//!
//! A [`Driver`] is the low-level client library that actually speaks the
//! store's wire protocol. The core never talks to sockets itself; it asks
//! the driver to execute one request (direct mode) or to open a batch
//! session, and adapts whatever handle shape comes back.
//!
//! Two structurally different deferred-execution models hide behind these
//! traits:
//!
//! - **future-per-call**: a [`PipelineSession`] hands back one
//!   [`DeferredReply`] per dispatched request and resolves them all during
//!   `flush`.
//! - **batch-exec-returns-list**: a [`TransactionSession`] accepts queued
//!   requests silently and returns one ordered raw-result list from `exec`.
//!
//! The dispatch layer is the only place that knows which shape it is
//! adapting; everything above it sees `FutureResult`s.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use prism_core::{CommandId, CommandRequest, ExecMode, RawReply, Result};

/// A low-level store client, as consumed by the execution pipeline.
///
/// Implementations own connection establishment, pooling, and wire
/// protocol. Errors they return must distinguish transport failures
/// (`Error::Transport`) from store-reported operation failures, which
/// travel as [`RawReply::Error`] values.
pub trait Driver: Send + Sync {
    /// Short driver name used in log lines and error messages.
    fn name(&self) -> &'static str;

    /// Whether `command` can be issued under `mode`.
    ///
    /// Dispatch consults this before any driver call, so unsupported
    /// combinations fail without network interaction.
    fn supports(&self, command: CommandId, mode: ExecMode) -> bool;

    /// Execute one request and return its raw reply.
    fn execute(&self, request: &CommandRequest) -> Result<RawReply>;

    /// Open a pipelined batch session.
    fn open_pipeline(&self) -> Result<Box<dyn PipelineSession>>;

    /// Open a transactional batch session (MULTI-equivalent).
    fn open_transaction(&self) -> Result<Box<dyn TransactionSession>>;
}

/// One open pipelined batch on a driver connection.
pub trait PipelineSession: Send {
    /// Fire one request without waiting for its reply; the returned
    /// [`DeferredReply`] resolves during [`PipelineSession::flush`].
    fn dispatch(&mut self, request: &CommandRequest) -> Result<DeferredReply>;

    /// Flush outstanding requests and resolve their deferred replies,
    /// bounded by `timeout`. Replies resolved before the deadline stay
    /// resolved even when the flush itself fails.
    fn flush(&mut self, timeout: Duration) -> Result<()>;

    /// Abandon the batch without resolving outstanding replies.
    fn abort(&mut self);
}

/// One open transactional batch on a driver connection.
///
/// Queued requests are deferred server-side; nothing executes until
/// [`TransactionSession::exec`], which returns one raw entry per queued
/// request in queue order.
pub trait TransactionSession: Send {
    /// Queue one request for execution at commit.
    fn queue(&mut self, request: &CommandRequest) -> Result<()>;

    /// Commit the batch and return the ordered raw-result list.
    fn exec(&mut self, timeout: Duration) -> Result<Vec<RawReply>>;

    /// Roll the batch back (DISCARD-equivalent).
    fn discard(&mut self) -> Result<()>;
}

type ReplyCell = Arc<Mutex<Option<Result<RawReply>>>>;

/// A one-shot cell for a reply that arrives when the pipeline flushes.
///
/// The consumer side; the producing driver keeps the matching
/// [`ReplySink`]. A cell resolves at most once.
#[derive(Debug)]
pub struct DeferredReply {
    cell: ReplyCell,
}

/// Driver-side writer for a [`DeferredReply`].
#[derive(Debug, Clone)]
pub struct ReplySink {
    cell: ReplyCell,
}

impl DeferredReply {
    /// Create an unresolved cell plus its driver-side sink.
    pub fn pending() -> (DeferredReply, ReplySink) {
        let cell: ReplyCell = Arc::new(Mutex::new(None));
        (
            DeferredReply { cell: cell.clone() },
            ReplySink { cell },
        )
    }

    /// Create an already-resolved cell, for drivers that have the reply
    /// in hand at dispatch time.
    pub fn ready(raw: RawReply) -> DeferredReply {
        DeferredReply {
            cell: Arc::new(Mutex::new(Some(Ok(raw)))),
        }
    }

    /// Remove and return the resolution, if the driver produced one.
    pub fn take(&self) -> Option<Result<RawReply>> {
        self.cell.lock().take()
    }

    /// Whether the driver has resolved this reply.
    pub fn is_resolved(&self) -> bool {
        self.cell.lock().is_some()
    }
}

impl ReplySink {
    /// Resolve the cell with a raw reply. Later writes are ignored.
    pub fn resolve(&self, raw: RawReply) {
        let mut slot = self.cell.lock();
        if slot.is_none() {
            *slot = Some(Ok(raw));
        }
    }

    /// Resolve the cell with a driver-level failure. Later writes are
    /// ignored.
    pub fn fail(&self, err: prism_core::Error) {
        let mut slot = self.cell.lock();
        if slot.is_none() {
            *slot = Some(Err(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::Error;

    #[test]
    fn test_pending_cell_resolves_once() {
        let (reply, sink) = DeferredReply::pending();
        assert!(!reply.is_resolved());

        sink.resolve(RawReply::Int(1));
        sink.resolve(RawReply::Int(2));
        assert!(reply.is_resolved());
        assert_eq!(reply.take(), Some(Ok(RawReply::Int(1))));
        assert_eq!(reply.take(), None);
    }

    #[test]
    fn test_ready_cell() {
        let reply = DeferredReply::ready(RawReply::status("OK"));
        assert!(reply.is_resolved());
        assert_eq!(reply.take(), Some(Ok(RawReply::Status("OK".into()))));
    }

    #[test]
    fn test_sink_failure_wins_only_if_first() {
        let (reply, sink) = DeferredReply::pending();
        sink.fail(Error::Transport {
            reason: "broken pipe".into(),
        });
        sink.resolve(RawReply::Int(9));
        match reply.take() {
            Some(Err(Error::Transport { reason })) => assert!(reason.contains("broken pipe")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
