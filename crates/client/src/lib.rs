//! # prism-client
//!
//! The execution/result pipeline of prismkv: one typed client surface
//! over interchangeable key-value-store drivers, with direct, pipelined,
//! and transactional execution.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use prism_client::{ClientConfig, MemoryDriver, Session};
//!
//! # fn main() -> prism_core::Result<()> {
//! let mut session = Session::new(Arc::new(MemoryDriver::new()), ClientConfig::default());
//!
//! session.set("user:1", "alice")?;
//! assert_eq!(session.get("user:1")?, Some("alice".to_string()));
//!
//! // Pipelined: fire many, collect later.
//! let mut pipe = session.pipeline()?;
//! let hits = pipe.incr("hits")?;
//! pipe.set("last", "now")?;
//! pipe.sync()?;
//! assert_eq!(hits.wait()?, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Dispatch routes every operation through one generic function per
//! execution mode; drivers return raw reply handles, converters map them
//! to domain types, and batches reconcile deferred results in FIFO order.
//! See the module docs of [`convert`], [`future`], [`pipeline`], and
//! [`transaction`] for the contracts.

#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod convert;
pub mod driver;
mod executor;
pub mod future;
pub mod memory;
mod ops;
pub mod pipeline;
mod reconcile;
pub mod session;
pub mod transaction;

pub use codec::{JsonCodec, ValueCodec};
pub use config::ClientConfig;
pub use convert::{value_converter, Convert, ValueConvert};
pub use driver::{DeferredReply, Driver, PipelineSession, ReplySink, TransactionSession};
pub use future::FutureResult;
pub use memory::MemoryDriver;
pub use pipeline::Pipeline;
pub use session::Session;
pub use transaction::Transaction;

// Re-export the leaf types so users don't need prism-core directly.
pub use prism_core::{
    CommandId, CommandRequest, Error, ExecMode, RawReply, Result, Status, Topology, Ttl, Value,
};
