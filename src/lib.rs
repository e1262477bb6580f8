//! prismkv - unified client abstraction for key-value stores
//!
//! prismkv lets application code issue key-value-store operations
//! identically regardless of which low-level driver, connection topology
//! (standalone, sentinel, cluster), or execution mode (direct, pipelined,
//! transactional) is active underneath.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use prismkv::{ClientConfig, MemoryDriver, Session};
//!
//! # fn main() -> prismkv::Result<()> {
//! let mut session = Session::new(Arc::new(MemoryDriver::new()), ClientConfig::default());
//!
//! session.set("greeting", "hello")?;
//! assert_eq!(session.get("greeting")?, Some("hello".to_string()));
//!
//! // Transactional: queue now, execute atomically at commit.
//! let mut txn = session.multi()?;
//! let count = txn.incr("visits")?;
//! txn.exec()?;
//! assert_eq!(count.wait()?, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! All operations go through one mode-aware dispatch layer. Drivers hand
//! back raw reply handles; converters map them to domain types; pipelines
//! and transactions reconcile deferred results in FIFO order. Drivers are
//! pluggable through the [`Driver`] trait — the bundled [`MemoryDriver`]
//! is the in-process reference implementation.

// Re-export the public API from prism-client
pub use prism_client::*;
