//! Shared tag types: execution modes, topology, status and TTL domains.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which execution path a dispatch takes.
///
/// Dispatch selects the driver invocation by mode; drivers report per-mode
/// command support so unsupported combinations fail before any network
/// interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecMode {
    /// One operation, result awaited immediately.
    Direct,
    /// Operation queued in an open pipeline, results collected at sync.
    Pipeline,
    /// Operation queued in an open transaction, executed at commit.
    Transaction,
}

impl std::fmt::Display for ExecMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecMode::Direct => "direct",
            ExecMode::Pipeline => "pipeline",
            ExecMode::Transaction => "transaction",
        };
        f.write_str(name)
    }
}

/// Connection topology the client is configured against.
///
/// This is a tag consumed by drivers when they establish connections;
/// topology discovery and slot routing live inside the driver layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// A single node.
    Standalone {
        /// Node address, e.g. `127.0.0.1:6379`.
        addr: String,
    },
    /// A sentinel-monitored master/replica group.
    Sentinel {
        /// Name of the monitored master.
        master_name: String,
        /// Sentinel addresses.
        sentinels: Vec<String>,
    },
    /// A sharded cluster.
    Cluster {
        /// Seed node addresses.
        nodes: Vec<String>,
    },
}

impl Default for Topology {
    fn default() -> Self {
        Topology::Standalone {
            addr: "127.0.0.1:6379".to_string(),
        }
    }
}

/// Outcome of a status-reply operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The store acknowledged the operation (`OK`).
    Success,
    /// The store returned a non-OK status line.
    Failure,
}

impl Status {
    /// Map a status line to an outcome. Only `OK` counts as success.
    pub fn from_status_text(text: &str) -> Self {
        if text == "OK" {
            Status::Success
        } else {
            Status::Failure
        }
    }

    /// Check for the success outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

/// Remaining time-to-live of a key.
///
/// Wire encoding is `-2` for a missing key, `-1` for a key without
/// expiration, and a non-negative number of seconds otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ttl {
    /// Key does not exist (or already expired).
    Missing,
    /// Key exists and never expires.
    Never,
    /// Key expires after this duration.
    In(Duration),
}

impl Ttl {
    /// Decode the wire integer form.
    pub fn from_wire(value: i64) -> Self {
        match value {
            -2 => Ttl::Missing,
            -1 => Ttl::Never,
            secs => Ttl::In(Duration::from_secs(secs.max(0) as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display() {
        assert_eq!(ExecMode::Direct.to_string(), "direct");
        assert_eq!(ExecMode::Transaction.to_string(), "transaction");
    }

    #[test]
    fn test_status_from_text() {
        assert_eq!(Status::from_status_text("OK"), Status::Success);
        assert_eq!(Status::from_status_text("QUEUED"), Status::Failure);
        assert!(Status::Success.is_success());
    }

    #[test]
    fn test_ttl_wire_decoding() {
        assert_eq!(Ttl::from_wire(-2), Ttl::Missing);
        assert_eq!(Ttl::from_wire(-1), Ttl::Never);
        assert_eq!(Ttl::from_wire(5), Ttl::In(Duration::from_secs(5)));
    }

    #[test]
    fn test_default_topology_is_standalone() {
        match Topology::default() {
            Topology::Standalone { addr } => assert!(addr.contains("6379")),
            other => panic!("unexpected default topology: {:?}", other),
        }
    }
}
