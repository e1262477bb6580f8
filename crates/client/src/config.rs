//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use prism_core::Topology;

/// Configuration for a [`Session`](crate::Session) and the driver
/// connection beneath it.
///
/// `command_timeout` bounds batch completion: `Pipeline::sync` and
/// `Transaction::exec` wait at most this long for the driver to resolve
/// outstanding handles, and `FutureResult::wait` uses the same bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Connection topology the driver should establish.
    pub topology: Topology,
    /// Deadline for one operation or batch completion.
    pub command_timeout: Duration,
    /// Deadline for establishing a connection.
    pub connect_timeout: Duration,
    /// Logical database index to select after connecting.
    pub database: u8,
    /// Optional client name announced to the server.
    pub client_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            topology: Topology::default(),
            command_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            database: 0,
            client_name: None,
        }
    }
}

impl ClientConfig {
    /// Replace the topology.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Replace the command/batch deadline.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Replace the connect deadline.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Select a logical database.
    pub fn with_database(mut self, database: u8) -> Self {
        self.database = database;
        self
    }

    /// Announce a client name.
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.command_timeout, Duration::from_secs(5));
        assert_eq!(config.database, 0);
        assert!(config.client_name.is_none());
    }

    #[test]
    fn test_builder_setters() {
        let config = ClientConfig::default()
            .with_command_timeout(Duration::from_millis(250))
            .with_database(3)
            .with_client_name("worker-1");
        assert_eq!(config.command_timeout, Duration::from_millis(250));
        assert_eq!(config.database, 3);
        assert_eq!(config.client_name.as_deref(), Some("worker-1"));
    }
}
