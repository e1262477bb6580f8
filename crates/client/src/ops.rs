//! Request builders for the typed operation families.
//!
//! Each function pairs a wire-shaped [`CommandRequest`] with the converter
//! for that operation's declared return shape. The three execution
//! surfaces (session, pipeline, transaction) all route these through the
//! same generic dispatch, so every operation family is defined exactly
//! once.

use std::time::Duration;

use prism_core::{CommandId, CommandRequest};

use crate::convert::{
    AsBool, AsInt, AsMaybeBinary, AsMaybeFloat, AsMaybeText, AsStatus, AsText, AsTtl, Convert,
    ListOf, MapOf, SetOf,
};

/// One dispatchable operation: the request plus its bound converter.
pub(crate) struct Op<C: Convert> {
    pub(crate) request: CommandRequest,
    pub(crate) converter: C,
}

fn op<C: Convert>(request: CommandRequest, converter: C) -> Op<C> {
    Op { request, converter }
}

fn fmt_f64(value: f64) -> String {
    // Integral scores print without a trailing ".0", matching the wire form.
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e17 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ==================== Strings ====================

pub(crate) fn get(key: &str) -> Op<AsMaybeText> {
    op(CommandRequest::new(CommandId::Get).arg(key), AsMaybeText)
}

pub(crate) fn get_raw(key: &str) -> Op<AsMaybeBinary> {
    op(CommandRequest::new(CommandId::Get).arg(key), AsMaybeBinary)
}

pub(crate) fn set(key: &str, value: impl Into<Vec<u8>>) -> Op<AsStatus> {
    op(CommandRequest::new(CommandId::Set).arg(key).arg(value), AsStatus)
}

pub(crate) fn set_ex(key: &str, value: impl Into<Vec<u8>>, ttl: Duration) -> Op<AsStatus> {
    op(
        CommandRequest::new(CommandId::SetEx)
            .arg(key)
            .arg(ttl.as_secs().to_string())
            .arg(value),
        AsStatus,
    )
}

pub(crate) fn append(key: &str, value: impl Into<Vec<u8>>) -> Op<AsInt> {
    op(CommandRequest::new(CommandId::Append).arg(key).arg(value), AsInt)
}

pub(crate) fn strlen(key: &str) -> Op<AsInt> {
    op(CommandRequest::new(CommandId::Strlen).arg(key), AsInt)
}

pub(crate) fn mget(keys: &[&str]) -> Op<ListOf<AsMaybeText>> {
    op(
        CommandRequest::new(CommandId::MGet).args(keys.iter().copied()),
        ListOf(AsMaybeText),
    )
}

// ==================== Counters ====================

pub(crate) fn incr(key: &str) -> Op<AsInt> {
    op(CommandRequest::new(CommandId::Incr).arg(key), AsInt)
}

pub(crate) fn incr_by(key: &str, delta: i64) -> Op<AsInt> {
    op(
        CommandRequest::new(CommandId::IncrBy).arg(key).arg(delta.to_string()),
        AsInt,
    )
}

pub(crate) fn decr(key: &str) -> Op<AsInt> {
    op(CommandRequest::new(CommandId::Decr).arg(key), AsInt)
}

// ==================== Keys ====================

pub(crate) fn del(keys: &[&str]) -> Op<AsInt> {
    op(CommandRequest::new(CommandId::Del).args(keys.iter().copied()), AsInt)
}

pub(crate) fn exists(key: &str) -> Op<AsBool> {
    op(CommandRequest::new(CommandId::Exists).arg(key), AsBool)
}

pub(crate) fn expire(key: &str, ttl: Duration) -> Op<AsBool> {
    op(
        CommandRequest::new(CommandId::Expire)
            .arg(key)
            .arg(ttl.as_secs().to_string()),
        AsBool,
    )
}

pub(crate) fn ttl(key: &str) -> Op<AsTtl> {
    op(CommandRequest::new(CommandId::Ttl).arg(key), AsTtl)
}

// ==================== Hashes ====================

pub(crate) fn hset(key: &str, field: &str, value: impl Into<Vec<u8>>) -> Op<AsInt> {
    op(
        CommandRequest::new(CommandId::HSet).arg(key).arg(field).arg(value),
        AsInt,
    )
}

pub(crate) fn hget(key: &str, field: &str) -> Op<AsMaybeText> {
    op(
        CommandRequest::new(CommandId::HGet).arg(key).arg(field),
        AsMaybeText,
    )
}

pub(crate) fn hgetall(key: &str) -> Op<MapOf<AsText, AsText>> {
    op(
        CommandRequest::new(CommandId::HGetAll).arg(key),
        MapOf(AsText, AsText),
    )
}

pub(crate) fn hdel(key: &str, fields: &[&str]) -> Op<AsInt> {
    op(
        CommandRequest::new(CommandId::HDel)
            .arg(key)
            .args(fields.iter().copied()),
        AsInt,
    )
}

pub(crate) fn hlen(key: &str) -> Op<AsInt> {
    op(CommandRequest::new(CommandId::HLen).arg(key), AsInt)
}

// ==================== Sets ====================

pub(crate) fn sadd(key: &str, members: &[&str]) -> Op<AsInt> {
    op(
        CommandRequest::new(CommandId::SAdd)
            .arg(key)
            .args(members.iter().copied()),
        AsInt,
    )
}

pub(crate) fn srem(key: &str, members: &[&str]) -> Op<AsInt> {
    op(
        CommandRequest::new(CommandId::SRem)
            .arg(key)
            .args(members.iter().copied()),
        AsInt,
    )
}

pub(crate) fn smembers(key: &str) -> Op<SetOf<AsText>> {
    op(CommandRequest::new(CommandId::SMembers).arg(key), SetOf(AsText))
}

pub(crate) fn sismember(key: &str, member: &str) -> Op<AsBool> {
    op(
        CommandRequest::new(CommandId::SIsMember).arg(key).arg(member),
        AsBool,
    )
}

pub(crate) fn scard(key: &str) -> Op<AsInt> {
    op(CommandRequest::new(CommandId::SCard).arg(key), AsInt)
}

// ==================== Sorted sets ====================

pub(crate) fn zadd(key: &str, score: f64, member: &str) -> Op<AsInt> {
    op(
        CommandRequest::new(CommandId::ZAdd)
            .arg(key)
            .arg(fmt_f64(score))
            .arg(member),
        AsInt,
    )
}

pub(crate) fn zscore(key: &str, member: &str) -> Op<AsMaybeFloat> {
    op(
        CommandRequest::new(CommandId::ZScore).arg(key).arg(member),
        AsMaybeFloat,
    )
}

pub(crate) fn zcard(key: &str) -> Op<AsInt> {
    op(CommandRequest::new(CommandId::ZCard).arg(key), AsInt)
}

pub(crate) fn zrange(key: &str, start: i64, stop: i64) -> Op<ListOf<AsText>> {
    op(
        CommandRequest::new(CommandId::ZRange)
            .arg(key)
            .arg(start.to_string())
            .arg(stop.to_string()),
        ListOf(AsText),
    )
}

// ==================== Lists ====================

pub(crate) fn lpush(key: &str, values: &[&str]) -> Op<AsInt> {
    op(
        CommandRequest::new(CommandId::LPush)
            .arg(key)
            .args(values.iter().copied()),
        AsInt,
    )
}

pub(crate) fn rpush(key: &str, values: &[&str]) -> Op<AsInt> {
    op(
        CommandRequest::new(CommandId::RPush)
            .arg(key)
            .args(values.iter().copied()),
        AsInt,
    )
}

pub(crate) fn lpop(key: &str) -> Op<AsMaybeText> {
    op(CommandRequest::new(CommandId::LPop).arg(key), AsMaybeText)
}

pub(crate) fn lrange(key: &str, start: i64, stop: i64) -> Op<ListOf<AsText>> {
    op(
        CommandRequest::new(CommandId::LRange)
            .arg(key)
            .arg(start.to_string())
            .arg(stop.to_string()),
        ListOf(AsText),
    )
}

pub(crate) fn llen(key: &str) -> Op<AsInt> {
    op(CommandRequest::new(CommandId::LLen).arg(key), AsInt)
}

// ==================== Connection ====================

pub(crate) fn ping() -> Op<AsText> {
    op(CommandRequest::new(CommandId::Ping), AsText)
}

pub(crate) fn echo(message: impl Into<Vec<u8>>) -> Op<AsText> {
    op(CommandRequest::new(CommandId::Echo).arg(message), AsText)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_shape_wire_args() {
        let built = set_ex("k", "v", Duration::from_secs(30));
        assert_eq!(built.request.id, CommandId::SetEx);
        assert_eq!(built.request.arg_text(0), Some("k"));
        assert_eq!(built.request.arg_text(1), Some("30"));
        assert_eq!(built.request.arg_text(2), Some("v"));

        let built = zadd("board", 1.5, "alice");
        assert_eq!(built.request.arg_text(1), Some("1.5"));

        let built = zadd("board", 2.0, "bob");
        assert_eq!(built.request.arg_text(1), Some("2"));
    }

    #[test]
    fn test_multi_key_builders() {
        let built = mget(&["a", "b", "c"]);
        assert_eq!(built.request.args.len(), 3);

        let built = del(&["a", "b"]);
        assert_eq!(built.request.args.len(), 2);

        let built = sadd("s", &["x", "y"]);
        assert_eq!(built.request.args.len(), 3);
    }
}
