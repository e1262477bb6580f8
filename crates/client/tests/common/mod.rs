//! Shared test doubles.
//!
//! `ScriptedDriver` replays a canned reply sequence and can be bent into
//! the failure shapes the execution pipeline must survive: commands
//! denied per mode, flushes that resolve only a prefix of the batch
//! before timing out, and commits that return short raw-result lists.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use prism_client::{
    CommandId, CommandRequest, DeferredReply, Driver, Error, ExecMode, PipelineSession, RawReply,
    ReplySink, Result, TransactionSession,
};

type Script = Arc<Mutex<VecDeque<RawReply>>>;

pub struct ScriptedDriver {
    replies: Script,
    denied: Vec<(CommandId, ExecMode)>,
    resolve_limit: Option<usize>,
    exec_keep: Option<usize>,
}

#[allow(dead_code)]
impl ScriptedDriver {
    pub fn new() -> Self {
        ScriptedDriver {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            denied: Vec::new(),
            resolve_limit: None,
            exec_keep: None,
        }
    }

    /// Append one canned reply.
    pub fn reply(self, raw: RawReply) -> Self {
        self.replies.lock().push_back(raw);
        self
    }

    /// Append many canned replies.
    pub fn replies<I: IntoIterator<Item = RawReply>>(self, raws: I) -> Self {
        self.replies.lock().extend(raws);
        self
    }

    /// Mark a command unsupported under a mode.
    pub fn deny(mut self, command: CommandId, mode: ExecMode) -> Self {
        self.denied.push((command, mode));
        self
    }

    /// Resolve only the first `n` deferred replies at flush, then report
    /// a timeout.
    pub fn resolve_only(mut self, n: usize) -> Self {
        self.resolve_limit = Some(n);
        self
    }

    /// Truncate the commit raw-result list to `n` entries.
    pub fn exec_keep(mut self, n: usize) -> Self {
        self.exec_keep = Some(n);
        self
    }

    fn next_reply(replies: &Script) -> RawReply {
        replies.lock().pop_front().unwrap_or(RawReply::Nil)
    }
}

impl Driver for ScriptedDriver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports(&self, command: CommandId, mode: ExecMode) -> bool {
        !self.denied.contains(&(command, mode))
    }

    fn execute(&self, _request: &CommandRequest) -> Result<RawReply> {
        Ok(Self::next_reply(&self.replies))
    }

    fn open_pipeline(&self) -> Result<Box<dyn PipelineSession>> {
        Ok(Box::new(ScriptedPipeline {
            replies: self.replies.clone(),
            staged: Vec::new(),
            resolve_limit: self.resolve_limit,
        }))
    }

    fn open_transaction(&self) -> Result<Box<dyn TransactionSession>> {
        Ok(Box::new(ScriptedTransaction {
            replies: self.replies.clone(),
            queued: 0,
            exec_keep: self.exec_keep,
        }))
    }
}

struct ScriptedPipeline {
    replies: Script,
    staged: Vec<ReplySink>,
    resolve_limit: Option<usize>,
}

impl PipelineSession for ScriptedPipeline {
    fn dispatch(&mut self, _request: &CommandRequest) -> Result<DeferredReply> {
        let (reply, sink) = DeferredReply::pending();
        self.staged.push(sink);
        Ok(reply)
    }

    fn flush(&mut self, timeout: Duration) -> Result<()> {
        let staged = self.staged.len();
        let limit = self.resolve_limit.unwrap_or(staged).min(staged);
        for sink in self.staged.drain(..).take(limit) {
            sink.resolve(ScriptedDriver::next_reply(&self.replies));
        }
        if limit < staged {
            Err(Error::Timeout { elapsed: timeout })
        } else {
            Ok(())
        }
    }

    fn abort(&mut self) {
        self.staged.clear();
    }
}

struct ScriptedTransaction {
    replies: Script,
    queued: usize,
    exec_keep: Option<usize>,
}

impl TransactionSession for ScriptedTransaction {
    fn queue(&mut self, _request: &CommandRequest) -> Result<()> {
        self.queued += 1;
        Ok(())
    }

    fn exec(&mut self, _timeout: Duration) -> Result<Vec<RawReply>> {
        let keep = self.exec_keep.unwrap_or(self.queued).min(self.queued);
        let raws = (0..keep)
            .map(|_| ScriptedDriver::next_reply(&self.replies))
            .collect();
        self.queued = 0;
        Ok(raws)
    }

    fn discard(&mut self) -> Result<()> {
        self.queued = 0;
        Ok(())
    }
}
