//! Raw-to-domain conversion.
//!
//! A converter is a stateless mapping from one driver-native [`RawReply`]
//! to a domain value. Converters perform no I/O and are total over the
//! raw shapes their operation can produce: the driver's "no value" marker
//! maps to the output type's canonical absence (None, empty collection,
//! zero), never a panic.
//!
//! In-band [`RawReply::Error`] entries are intercepted by [`apply`] before
//! any converter runs, so per-operation store failures become
//! `Error::Operation` values uniformly in all execution modes.
//!
//! Collection converters ([`ListOf`], [`SetOf`], [`MapOf`]) are
//! parameterized by element converters so shape transitions compose
//! instead of being duplicated per type.
//!
//! [`value_converter`] is the static registry mapping every [`CommandId`]
//! to the `Value`-level converter for its declared return shape —
//! converter selection is a pure function of the command, built once at
//! startup.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use once_cell::sync::Lazy;

use prism_core::{CommandId, Error, RawReply, Result, Status, Ttl, Value};

/// A stateless raw-to-domain mapping bound to one operation's declared
/// return shape.
pub trait Convert {
    /// The domain type this converter produces.
    type Output;

    /// Map one raw reply to the domain. `command` is context for error
    /// reporting only.
    fn convert(&self, command: CommandId, raw: RawReply) -> Result<Self::Output>;
}

/// Apply a converter behind the in-band error guard.
///
/// `RawReply::Error` never reaches the converter; it becomes the
/// operation-scoped `Error::Operation` here.
pub fn apply<C: Convert>(converter: &C, command: CommandId, raw: RawReply) -> Result<C::Output> {
    match raw {
        RawReply::Error(message) => Err(Error::Operation { command, message }),
        raw => converter.convert(command, raw),
    }
}

fn wrong_shape(command: CommandId, expected: &'static str, raw: &RawReply) -> Error {
    Error::WrongShape {
        command,
        expected,
        actual: raw.shape_name(),
    }
}

fn utf8(command: CommandId, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| Error::Codec {
        reason: format!("{} reply is not valid UTF-8", command),
    })
}

// ==================== Scalar converters ====================

/// Status line to [`Status`]. Absence counts as failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsStatus;

impl Convert for AsStatus {
    type Output = Status;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<Status> {
        match raw {
            RawReply::Status(text) => Ok(Status::from_status_text(&text)),
            RawReply::Nil => Ok(Status::Failure),
            other => Err(wrong_shape(command, "Status", &other)),
        }
    }
}

/// Integer reply to `i64`. Absence maps to zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsInt;

impl Convert for AsInt {
    type Output = i64;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<i64> {
        match raw {
            RawReply::Int(n) => Ok(n),
            RawReply::Nil => Ok(0),
            other => Err(wrong_shape(command, "Int", &other)),
        }
    }
}

/// 0/1 integer reply to `bool`. Absence maps to `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsBool;

impl Convert for AsBool {
    type Output = bool;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<bool> {
        match raw {
            RawReply::Int(n) => Ok(n != 0),
            RawReply::Nil => Ok(false),
            other => Err(wrong_shape(command, "Int", &other)),
        }
    }
}

/// Bulk reply to `String`. Absence maps to the empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsText;

impl Convert for AsText {
    type Output = String;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<String> {
        match raw {
            RawReply::Bytes(data) => utf8(command, data),
            RawReply::Status(text) => Ok(text),
            RawReply::Nil => Ok(String::new()),
            other => Err(wrong_shape(command, "Bytes", &other)),
        }
    }
}

/// Bulk reply to `Option<String>`. Absence maps to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsMaybeText;

impl Convert for AsMaybeText {
    type Output = Option<String>;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<Option<String>> {
        match raw {
            RawReply::Nil => Ok(None),
            RawReply::Bytes(data) => utf8(command, data).map(Some),
            RawReply::Status(text) => Ok(Some(text)),
            other => Err(wrong_shape(command, "Bytes", &other)),
        }
    }
}

/// Bulk reply to `Option<Vec<u8>>`, for binary-safe payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsMaybeBinary;

impl Convert for AsMaybeBinary {
    type Output = Option<Vec<u8>>;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<Option<Vec<u8>>> {
        match raw {
            RawReply::Nil => Ok(None),
            RawReply::Bytes(data) => Ok(Some(data)),
            RawReply::Status(text) => Ok(Some(text.into_bytes())),
            other => Err(wrong_shape(command, "Bytes", &other)),
        }
    }
}

/// Bulk float reply to `Option<f64>`. Absence maps to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsMaybeFloat;

impl Convert for AsMaybeFloat {
    type Output = Option<f64>;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<Option<f64>> {
        match raw {
            RawReply::Nil => Ok(None),
            RawReply::Bytes(data) => {
                let text = utf8(command, data)?;
                text.parse::<f64>().map(Some).map_err(|_| Error::Codec {
                    reason: format!("{} reply {:?} is not a float", command, text),
                })
            }
            RawReply::Int(n) => Ok(Some(n as f64)),
            other => Err(wrong_shape(command, "Bytes", &other)),
        }
    }
}

/// TTL wire integer to [`Ttl`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AsTtl;

impl Convert for AsTtl {
    type Output = Ttl;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<Ttl> {
        match raw {
            RawReply::Int(n) => Ok(Ttl::from_wire(n)),
            RawReply::Nil => Ok(Ttl::Missing),
            other => Err(wrong_shape(command, "Int", &other)),
        }
    }
}

// ==================== Collection converters ====================

/// Array reply to `Vec`, element conversion delegated to `C`.
/// Absence maps to the empty vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOf<C>(
    /// Element converter.
    pub C,
);

impl<C: Convert> Convert for ListOf<C> {
    type Output = Vec<C::Output>;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<Vec<C::Output>> {
        match raw {
            RawReply::Nil => Ok(Vec::new()),
            RawReply::Array(items) => items
                .into_iter()
                .map(|item| apply(&self.0, command, item))
                .collect(),
            other => Err(wrong_shape(command, "Array", &other)),
        }
    }
}

/// Array reply to `HashSet`, element conversion delegated to `C`.
/// Absence maps to the empty set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOf<C>(
    /// Element converter.
    pub C,
);

impl<C: Convert> Convert for SetOf<C>
where
    C::Output: Eq + Hash,
{
    type Output = HashSet<C::Output>;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<HashSet<C::Output>> {
        match raw {
            RawReply::Nil => Ok(HashSet::new()),
            RawReply::Array(items) => items
                .into_iter()
                .map(|item| apply(&self.0, command, item))
                .collect(),
            other => Err(wrong_shape(command, "Array", &other)),
        }
    }
}

/// Field/value reply to `HashMap`, key and value conversion delegated.
///
/// Accepts both native map replies and the flat alternating-array form
/// some drivers use. Absence maps to the empty map.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapOf<K, V>(
    /// Field converter.
    pub K,
    /// Value converter.
    pub V,
);

impl<K: Convert, V: Convert> Convert for MapOf<K, V>
where
    K::Output: Eq + Hash,
{
    type Output = HashMap<K::Output, V::Output>;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<Self::Output> {
        match raw {
            RawReply::Nil => Ok(HashMap::new()),
            RawReply::Map(pairs) => pairs
                .into_iter()
                .map(|(k, v)| Ok((apply(&self.0, command, k)?, apply(&self.1, command, v)?)))
                .collect(),
            RawReply::Array(items) => {
                if items.len() % 2 != 0 {
                    return Err(wrong_shape(command, "Map", &RawReply::Array(items)));
                }
                let mut map = HashMap::with_capacity(items.len() / 2);
                let mut iter = items.into_iter();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    map.insert(apply(&self.0, command, k)?, apply(&self.1, command, v)?);
                }
                Ok(map)
            }
            other => Err(wrong_shape(command, "Map", &other)),
        }
    }
}

// ==================== Value-level registry ====================

/// Object-safe conversion to the aggregate [`Value`] domain, used for the
/// ordered collections returned by `sync_all`/`exec` and for the untyped
/// request escape hatch.
pub trait ValueConvert: Send + Sync {
    /// Map one raw reply to its `Value` rendering.
    fn convert_value(&self, command: CommandId, raw: RawReply) -> Result<Value>;
}

/// Status reply rendering: `OK` becomes [`Value::Okay`], other status
/// lines keep their text.
#[derive(Debug, Clone, Copy, Default)]
struct StatusValue;

impl ValueConvert for StatusValue {
    fn convert_value(&self, command: CommandId, raw: RawReply) -> Result<Value> {
        match raw {
            RawReply::Status(text) if text == "OK" => Ok(Value::Okay),
            RawReply::Status(text) => Ok(Value::Text(text)),
            RawReply::Nil => Ok(Value::Nil),
            other => Err(wrong_shape(command, "Status", &other)),
        }
    }
}

/// Integer reply rendering.
#[derive(Debug, Clone, Copy, Default)]
struct IntValue;

impl ValueConvert for IntValue {
    fn convert_value(&self, command: CommandId, raw: RawReply) -> Result<Value> {
        match raw {
            RawReply::Int(n) => Ok(Value::Int(n)),
            RawReply::Nil => Ok(Value::Nil),
            other => Err(wrong_shape(command, "Int", &other)),
        }
    }
}

/// Bulk reply rendering: UTF-8 payloads become text, others stay binary.
#[derive(Debug, Clone, Copy, Default)]
struct BulkValue;

impl ValueConvert for BulkValue {
    fn convert_value(&self, command: CommandId, raw: RawReply) -> Result<Value> {
        match raw {
            RawReply::Nil => Ok(Value::Nil),
            RawReply::Bytes(data) => Ok(match String::from_utf8(data) {
                Ok(text) => Value::Text(text),
                Err(err) => Value::Binary(err.into_bytes()),
            }),
            RawReply::Status(text) => Ok(Value::Text(text)),
            RawReply::Int(n) => Ok(Value::Int(n)),
            other => Err(wrong_shape(command, "Bytes", &other)),
        }
    }
}

/// Bulk float reply rendering.
#[derive(Debug, Clone, Copy, Default)]
struct FloatValue;

impl ValueConvert for FloatValue {
    fn convert_value(&self, command: CommandId, raw: RawReply) -> Result<Value> {
        match apply(&AsMaybeFloat, command, raw)? {
            Some(f) => Ok(Value::Float(f)),
            None => Ok(Value::Nil),
        }
    }
}

/// Array reply rendering with bulk elements.
#[derive(Debug, Clone, Copy, Default)]
struct ArrayValue;

impl ValueConvert for ArrayValue {
    fn convert_value(&self, command: CommandId, raw: RawReply) -> Result<Value> {
        match raw {
            RawReply::Nil => Ok(Value::List(Vec::new())),
            RawReply::Array(items) => {
                let elems: Result<Vec<Value>> = items
                    .into_iter()
                    .map(|item| match item {
                        RawReply::Error(message) => Err(Error::Operation { command, message }),
                        item => BulkValue.convert_value(command, item),
                    })
                    .collect();
                Ok(Value::List(elems?))
            }
            other => Err(wrong_shape(command, "Array", &other)),
        }
    }
}

/// Array reply rendering as an unordered collection.
#[derive(Debug, Clone, Copy, Default)]
struct SetValue;

impl ValueConvert for SetValue {
    fn convert_value(&self, command: CommandId, raw: RawReply) -> Result<Value> {
        match ArrayValue.convert_value(command, raw)? {
            Value::List(items) => Ok(Value::Set(items)),
            value => Ok(value),
        }
    }
}

/// Field/value reply rendering.
#[derive(Debug, Clone, Copy, Default)]
struct PairsValue;

impl ValueConvert for PairsValue {
    fn convert_value(&self, command: CommandId, raw: RawReply) -> Result<Value> {
        match raw {
            RawReply::Nil => Ok(Value::Map(Vec::new())),
            RawReply::Map(pairs) => {
                let rendered: Result<Vec<(Value, Value)>> = pairs
                    .into_iter()
                    .map(|(k, v)| {
                        Ok((
                            BulkValue.convert_value(command, k)?,
                            BulkValue.convert_value(command, v)?,
                        ))
                    })
                    .collect();
                Ok(Value::Map(rendered?))
            }
            RawReply::Array(items) => {
                if items.len() % 2 != 0 {
                    return Err(wrong_shape(command, "Map", &RawReply::Array(items)));
                }
                let mut rendered = Vec::with_capacity(items.len() / 2);
                let mut iter = items.into_iter();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    rendered.push((
                        BulkValue.convert_value(command, k)?,
                        BulkValue.convert_value(command, v)?,
                    ));
                }
                Ok(Value::Map(rendered))
            }
            other => Err(wrong_shape(command, "Map", &other)),
        }
    }
}

static STATUS_VALUE: StatusValue = StatusValue;
static INT_VALUE: IntValue = IntValue;
static BULK_VALUE: BulkValue = BulkValue;
static FLOAT_VALUE: FloatValue = FloatValue;
static ARRAY_VALUE: ArrayValue = ArrayValue;
static SET_VALUE: SetValue = SetValue;
static PAIRS_VALUE: PairsValue = PairsValue;

static REGISTRY: Lazy<HashMap<CommandId, &'static dyn ValueConvert>> = Lazy::new(|| {
    let mut registry: HashMap<CommandId, &'static dyn ValueConvert> = HashMap::new();
    for command in CommandId::all() {
        let converter: &'static dyn ValueConvert = match command {
            CommandId::Set | CommandId::SetEx | CommandId::Ping => &STATUS_VALUE,
            CommandId::Get | CommandId::HGet | CommandId::LPop | CommandId::Echo => &BULK_VALUE,
            CommandId::Append
            | CommandId::Strlen
            | CommandId::Incr
            | CommandId::IncrBy
            | CommandId::Decr
            | CommandId::Del
            | CommandId::Exists
            | CommandId::Expire
            | CommandId::Ttl
            | CommandId::HSet
            | CommandId::HDel
            | CommandId::HLen
            | CommandId::SAdd
            | CommandId::SRem
            | CommandId::SIsMember
            | CommandId::SCard
            | CommandId::ZAdd
            | CommandId::ZCard
            | CommandId::LPush
            | CommandId::RPush
            | CommandId::LLen => &INT_VALUE,
            CommandId::ZScore => &FLOAT_VALUE,
            CommandId::MGet | CommandId::ZRange | CommandId::LRange => &ARRAY_VALUE,
            CommandId::SMembers => &SET_VALUE,
            CommandId::HGetAll => &PAIRS_VALUE,
        };
        registry.insert(command, converter);
    }
    registry
});

/// Look up the `Value`-level converter for a command's declared return
/// shape. Total over [`CommandId`]; the registry is built once at startup.
pub fn value_converter(command: CommandId) -> &'static dyn ValueConvert {
    REGISTRY
        .get(&command)
        .copied()
        .unwrap_or(&BULK_VALUE as &'static dyn ValueConvert)
}

/// Adapter exposing the registry lookup as a [`Convert`] implementation,
/// for untyped request dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryConvert;

impl Convert for RegistryConvert {
    type Output = Value;

    fn convert(&self, command: CommandId, raw: RawReply) -> Result<Value> {
        value_converter(command).convert_value(command, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absence_maps_to_canonical_empty() {
        assert_eq!(apply(&AsMaybeText, CommandId::Get, RawReply::Nil).unwrap(), None);
        assert_eq!(apply(&AsInt, CommandId::Strlen, RawReply::Nil).unwrap(), 0);
        assert!(!apply(&AsBool, CommandId::Exists, RawReply::Nil).unwrap());
        assert!(apply(&ListOf(AsText), CommandId::LRange, RawReply::Nil)
            .unwrap()
            .is_empty());
        assert!(apply(&SetOf(AsText), CommandId::SMembers, RawReply::Nil)
            .unwrap()
            .is_empty());
        assert!(
            apply(&MapOf(AsText, AsText), CommandId::HGetAll, RawReply::Nil)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_in_band_error_becomes_operation_error() {
        let err = apply(&AsInt, CommandId::Incr, RawReply::Error("not an integer".into()))
            .unwrap_err();
        match err {
            Error::Operation { command, message } => {
                assert_eq!(command, CommandId::Incr);
                assert!(message.contains("not an integer"));
            }
            other => panic!("expected Operation, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shape_is_reported_not_panicked() {
        let err = apply(&AsInt, CommandId::Ttl, RawReply::status("OK")).unwrap_err();
        match err {
            Error::WrongShape {
                command,
                expected,
                actual,
            } => {
                assert_eq!(command, CommandId::Ttl);
                assert_eq!(expected, "Int");
                assert_eq!(actual, "Status");
            }
            other => panic!("expected WrongShape, got {:?}", other),
        }
    }

    #[test]
    fn test_list_composition() {
        let raw = RawReply::Array(vec![
            RawReply::bytes(b"a".to_vec()),
            RawReply::Nil,
            RawReply::bytes(b"c".to_vec()),
        ]);
        let out = apply(&ListOf(AsMaybeText), CommandId::MGet, raw).unwrap();
        assert_eq!(out, vec![Some("a".into()), None, Some("c".into())]);
    }

    #[test]
    fn test_map_accepts_flat_array_form() {
        let raw = RawReply::Array(vec![
            RawReply::bytes(b"f1".to_vec()),
            RawReply::bytes(b"v1".to_vec()),
            RawReply::bytes(b"f2".to_vec()),
            RawReply::bytes(b"v2".to_vec()),
        ]);
        let out = apply(&MapOf(AsText, AsText), CommandId::HGetAll, raw).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.get("f1").map(String::as_str), Some("v1"));
        assert_eq!(out.get("f2").map(String::as_str), Some("v2"));
    }

    #[test]
    fn test_map_rejects_odd_flat_array() {
        let raw = RawReply::Array(vec![RawReply::bytes(b"f1".to_vec())]);
        assert!(apply(&MapOf(AsText, AsText), CommandId::HGetAll, raw).is_err());
    }

    #[test]
    fn test_registry_covers_every_command() {
        for command in CommandId::all() {
            // Lookup must not fall back for any known command.
            assert!(REGISTRY.contains_key(&command), "no converter for {}", command);
        }
    }

    #[test]
    fn test_registry_value_renderings() {
        let ok = value_converter(CommandId::Set)
            .convert_value(CommandId::Set, RawReply::status("OK"))
            .unwrap();
        assert_eq!(ok, Value::Okay);

        let missing = value_converter(CommandId::Get)
            .convert_value(CommandId::Get, RawReply::Nil)
            .unwrap();
        assert_eq!(missing, Value::Nil);

        let text = value_converter(CommandId::Get)
            .convert_value(CommandId::Get, RawReply::bytes(b"1".to_vec()))
            .unwrap();
        assert_eq!(text, Value::Text("1".into()));
    }

    #[test]
    fn test_ttl_converter() {
        use std::time::Duration;
        assert_eq!(
            apply(&AsTtl, CommandId::Ttl, RawReply::Int(7)).unwrap(),
            Ttl::In(Duration::from_secs(7))
        );
        assert_eq!(apply(&AsTtl, CommandId::Ttl, RawReply::Int(-2)).unwrap(), Ttl::Missing);
    }
}
