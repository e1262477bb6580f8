//! Logical operation identifiers and request carriers.
//!
//! A [`CommandId`] names one key-value-store command family. It is pure
//! data: the dispatch layer uses it to select a converter and to check
//! driver support, and error messages use it to name the failing
//! operation. It is never executed by itself.
//!
//! A [`CommandRequest`] pairs a `CommandId` with its already-validated,
//! wire-shaped arguments. Requests are:
//! - **Self-contained**: everything a driver needs is in the request
//! - **Serializable**: can be captured/replayed for testing
//! - **Pure data**: no closures or executable code

use serde::{Deserialize, Serialize};

/// Identifier for one key-value-store command family.
///
/// The set covers the operation families the typed client surface exposes;
/// batch control (MULTI/EXEC/DISCARD) is not listed because it is driven
/// through the pipeline/transaction lifecycle methods, never dispatched as
/// a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandId {
    // ==================== Strings ====================
    /// Fetch a string value.
    Get,
    /// Store a string value.
    Set,
    /// Store a string value with a time-to-live.
    SetEx,
    /// Append to a string value, returning the new length.
    Append,
    /// Length of a string value.
    Strlen,
    /// Fetch many string values in one round trip.
    MGet,

    // ==================== Counters ====================
    /// Increment by one.
    Incr,
    /// Increment by a delta.
    IncrBy,
    /// Decrement by one.
    Decr,

    // ==================== Keys ====================
    /// Remove keys, returning how many existed.
    Del,
    /// Check key existence.
    Exists,
    /// Attach a time-to-live.
    Expire,
    /// Inspect remaining time-to-live.
    Ttl,

    // ==================== Hashes ====================
    /// Set a hash field.
    HSet,
    /// Fetch a hash field.
    HGet,
    /// Fetch all fields and values of a hash.
    HGetAll,
    /// Remove hash fields.
    HDel,
    /// Number of fields in a hash.
    HLen,

    // ==================== Sets ====================
    /// Add members to a set.
    SAdd,
    /// Remove members from a set.
    SRem,
    /// Fetch all members of a set.
    SMembers,
    /// Check set membership.
    SIsMember,
    /// Cardinality of a set.
    SCard,

    // ==================== Sorted sets ====================
    /// Add a scored member.
    ZAdd,
    /// Fetch a member's score.
    ZScore,
    /// Cardinality of a sorted set.
    ZCard,
    /// Fetch members by rank range.
    ZRange,

    // ==================== Lists ====================
    /// Push to the head of a list.
    LPush,
    /// Push to the tail of a list.
    RPush,
    /// Pop from the head of a list.
    LPop,
    /// Fetch a rank range of a list.
    LRange,
    /// Length of a list.
    LLen,

    // ==================== Connection ====================
    /// Liveness probe.
    Ping,
    /// Round-trip a payload.
    Echo,
}

impl CommandId {
    /// Returns the wire-protocol name of this command.
    ///
    /// The exhaustive match ensures the compiler flags any new `CommandId`
    /// variant added without a corresponding name.
    pub fn name(&self) -> &'static str {
        match self {
            CommandId::Get => "GET",
            CommandId::Set => "SET",
            CommandId::SetEx => "SETEX",
            CommandId::Append => "APPEND",
            CommandId::Strlen => "STRLEN",
            CommandId::MGet => "MGET",
            CommandId::Incr => "INCR",
            CommandId::IncrBy => "INCRBY",
            CommandId::Decr => "DECR",
            CommandId::Del => "DEL",
            CommandId::Exists => "EXISTS",
            CommandId::Expire => "EXPIRE",
            CommandId::Ttl => "TTL",
            CommandId::HSet => "HSET",
            CommandId::HGet => "HGET",
            CommandId::HGetAll => "HGETALL",
            CommandId::HDel => "HDEL",
            CommandId::HLen => "HLEN",
            CommandId::SAdd => "SADD",
            CommandId::SRem => "SREM",
            CommandId::SMembers => "SMEMBERS",
            CommandId::SIsMember => "SISMEMBER",
            CommandId::SCard => "SCARD",
            CommandId::ZAdd => "ZADD",
            CommandId::ZScore => "ZSCORE",
            CommandId::ZCard => "ZCARD",
            CommandId::ZRange => "ZRANGE",
            CommandId::LPush => "LPUSH",
            CommandId::RPush => "RPUSH",
            CommandId::LPop => "LPOP",
            CommandId::LRange => "LRANGE",
            CommandId::LLen => "LLEN",
            CommandId::Ping => "PING",
            CommandId::Echo => "ECHO",
        }
    }

    /// Returns `true` if this command mutates store state.
    ///
    /// Drivers use this to reject writes on read-only replicas.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            CommandId::Set
                | CommandId::SetEx
                | CommandId::Append
                | CommandId::Incr
                | CommandId::IncrBy
                | CommandId::Decr
                | CommandId::Del
                | CommandId::Expire
                | CommandId::HSet
                | CommandId::HDel
                | CommandId::SAdd
                | CommandId::SRem
                | CommandId::ZAdd
                | CommandId::LPush
                | CommandId::RPush
                | CommandId::LPop
        )
    }

    /// Iterate over every command identifier.
    ///
    /// Used by the converter registry's coverage test.
    pub fn all() -> impl Iterator<Item = CommandId> {
        const ALL: &[CommandId] = &[
            CommandId::Get,
            CommandId::Set,
            CommandId::SetEx,
            CommandId::Append,
            CommandId::Strlen,
            CommandId::MGet,
            CommandId::Incr,
            CommandId::IncrBy,
            CommandId::Decr,
            CommandId::Del,
            CommandId::Exists,
            CommandId::Expire,
            CommandId::Ttl,
            CommandId::HSet,
            CommandId::HGet,
            CommandId::HGetAll,
            CommandId::HDel,
            CommandId::HLen,
            CommandId::SAdd,
            CommandId::SRem,
            CommandId::SMembers,
            CommandId::SIsMember,
            CommandId::SCard,
            CommandId::ZAdd,
            CommandId::ZScore,
            CommandId::ZCard,
            CommandId::ZRange,
            CommandId::LPush,
            CommandId::RPush,
            CommandId::LPop,
            CommandId::LRange,
            CommandId::LLen,
            CommandId::Ping,
            CommandId::Echo,
        ];
        ALL.iter().copied()
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One logical operation with its wire-shaped arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Which command family this request belongs to.
    pub id: CommandId,
    /// Arguments in wire order, excluding the command name itself.
    pub args: Vec<Vec<u8>>,
}

impl CommandRequest {
    /// Start a request with no arguments.
    pub fn new(id: CommandId) -> Self {
        CommandRequest { id, args: Vec::new() }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append many arguments.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Vec<u8>>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Argument at `index` as UTF-8 text, if present and valid.
    pub fn arg_text(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(|a| std::str::from_utf8(a).ok())
    }
}
