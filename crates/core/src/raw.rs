//! Driver-native reply shapes.
//!
//! A [`RawReply`] is the value a driver hands back for one operation before
//! any domain conversion. The set of shapes is the common denominator of
//! the supported drivers' wire models: scalars, bulk byte payloads, arrays,
//! field/value maps, and an in-band error marker.
//!
//! `RawReply::Nil` is the canonical absence marker. Converters must accept
//! it for every operation that can produce "no value" and map it to the
//! domain's absence value rather than failing.
//!
//! `RawReply::Error` carries a store-reported, per-operation failure as a
//! value. Inside a transaction's commit result the driver returns one raw
//! entry per queued operation, and a failed operation rides along as an
//! `Error` entry; the conversion boundary turns it into a typed error.

use serde::{Deserialize, Serialize};

/// One driver-native reply, before domain conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawReply {
    /// The driver's "no value" marker (null bulk, missing key).
    Nil,
    /// Status line reply, e.g. `OK` or `PONG`.
    Status(String),
    /// Integer reply.
    Int(i64),
    /// Bulk byte payload.
    Bytes(Vec<u8>),
    /// Ordered multi-value reply.
    Array(Vec<RawReply>),
    /// Field/value reply (driver iteration order preserved).
    Map(Vec<(RawReply, RawReply)>),
    /// Store-reported failure for this specific operation.
    Error(String),
}

impl RawReply {
    /// Get the shape name as a static string, for diagnostics.
    pub fn shape_name(&self) -> &'static str {
        match self {
            RawReply::Nil => "Nil",
            RawReply::Status(_) => "Status",
            RawReply::Int(_) => "Int",
            RawReply::Bytes(_) => "Bytes",
            RawReply::Array(_) => "Array",
            RawReply::Map(_) => "Map",
            RawReply::Error(_) => "Error",
        }
    }

    /// Check if this is the absence marker.
    pub fn is_nil(&self) -> bool {
        matches!(self, RawReply::Nil)
    }

    /// Check if this is an in-band operation error.
    pub fn is_error(&self) -> bool {
        matches!(self, RawReply::Error(_))
    }

    /// Build a bulk reply from anything byte-like.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        RawReply::Bytes(data.into())
    }

    /// Build a status reply.
    pub fn status(text: impl Into<String>) -> Self {
        RawReply::Status(text.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_names() {
        assert_eq!(RawReply::Nil.shape_name(), "Nil");
        assert_eq!(RawReply::Int(1).shape_name(), "Int");
        assert_eq!(RawReply::Error("ERR".into()).shape_name(), "Error");
    }

    #[test]
    fn test_predicates() {
        assert!(RawReply::Nil.is_nil());
        assert!(!RawReply::Int(0).is_nil());
        assert!(RawReply::Error("boom".into()).is_error());
        assert!(!RawReply::Status("OK".into()).is_error());
    }

    #[test]
    fn test_constructors() {
        assert_eq!(RawReply::bytes(b"ab".to_vec()), RawReply::Bytes(b"ab".to_vec()));
        assert_eq!(RawReply::status("OK"), RawReply::Status("OK".into()));
    }
}
