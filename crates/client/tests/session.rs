//! Direct-mode session tests.

mod common;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use prism_client::{
    ClientConfig, CommandId, CommandRequest, Error, ExecMode, MemoryDriver, RawReply, Session,
    Status, Ttl, Value,
};

use common::ScriptedDriver;

fn memory_session() -> Session {
    Session::new(Arc::new(MemoryDriver::new()), ClientConfig::default())
}

#[test]
fn string_family_round_trip() {
    let mut session = memory_session();

    assert_eq!(session.get("k").unwrap(), None);
    assert_eq!(session.set("k", "hello").unwrap(), Status::Success);
    assert_eq!(session.get("k").unwrap(), Some("hello".to_string()));
    assert_eq!(session.append("k", " world").unwrap(), 11);
    assert_eq!(session.strlen("k").unwrap(), 11);
    assert_eq!(
        session.mget(&["k", "missing"]).unwrap(),
        vec![Some("hello world".to_string()), None]
    );
    assert_eq!(session.del(&["k"]).unwrap(), 1);
    assert!(!session.exists("k").unwrap());
}

#[test]
fn counter_family() {
    let mut session = memory_session();
    assert_eq!(session.incr("n").unwrap(), 1);
    assert_eq!(session.incr_by("n", 10).unwrap(), 11);
    assert_eq!(session.decr("n").unwrap(), 10);

    session.set("text", "abc").unwrap();
    assert!(matches!(
        session.incr("text"),
        Err(Error::Operation { command: CommandId::Incr, .. })
    ));
}

#[test]
fn hash_set_and_list_families() {
    let mut session = memory_session();

    assert_eq!(session.hset("h", "f1", "1").unwrap(), 1);
    assert_eq!(session.hset("h", "f1", "2").unwrap(), 0);
    assert_eq!(session.hget("h", "f1").unwrap(), Some("2".to_string()));
    let all: HashMap<String, String> = session.hgetall("h").unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(session.hdel("h", &["f1", "f2"]).unwrap(), 1);

    assert_eq!(session.sadd("s", &["a", "b", "a"]).unwrap(), 2);
    let members: HashSet<String> = session.smembers("s").unwrap();
    assert_eq!(members.len(), 2);
    assert!(session.sismember("s", "a").unwrap());
    assert_eq!(session.srem("s", &["a"]).unwrap(), 1);
    assert_eq!(session.scard("s").unwrap(), 1);

    assert_eq!(session.rpush("l", &["a", "b", "c"]).unwrap(), 3);
    assert_eq!(session.llen("l").unwrap(), 3);
    assert_eq!(session.lrange("l", 0, 1).unwrap(), vec!["a", "b"]);
    assert_eq!(session.lpop("l").unwrap(), Some("a".to_string()));
}

#[test]
fn sorted_set_family() {
    let mut session = memory_session();

    assert_eq!(session.zadd("board", 2.5, "alice").unwrap(), 1);
    assert_eq!(session.zadd("board", 1.0, "bob").unwrap(), 1);
    assert_eq!(session.zadd("board", 3.0, "alice").unwrap(), 0);

    assert_eq!(session.zscore("board", "alice").unwrap(), Some(3.0));
    assert_eq!(session.zscore("board", "nobody").unwrap(), None);
    assert_eq!(session.zcard("board").unwrap(), 2);
    assert_eq!(session.zrange("board", 0, -1).unwrap(), vec!["bob", "alice"]);
}

#[test]
fn ttl_family() {
    let mut session = memory_session();

    assert_eq!(session.ttl("none").unwrap(), Ttl::Missing);
    session.set("k", "v").unwrap();
    assert_eq!(session.ttl("k").unwrap(), Ttl::Never);
    assert!(session.expire("k", Duration::from_secs(120)).unwrap());
    assert!(matches!(session.ttl("k").unwrap(), Ttl::In(_)));
    assert!(!session.expire("none", Duration::from_secs(1)).unwrap());
}

#[test]
fn connection_family() {
    let mut session = memory_session();
    assert_eq!(session.ping().unwrap(), "PONG");
    assert_eq!(session.echo("payload").unwrap(), "payload");
}

#[test]
fn unsupported_direct_command_fails_before_the_driver() {
    // No canned replies: a dispatched command would answer Nil, so a
    // rejection proves the driver was never consulted.
    let driver = ScriptedDriver::new().deny(CommandId::Get, ExecMode::Direct);
    let mut session = Session::new(Arc::new(driver), ClientConfig::default());

    match session.get("k") {
        Err(Error::Unsupported { command, mode, .. }) => {
            assert_eq!(command, CommandId::Get);
            assert_eq!(mode, ExecMode::Direct);
        }
        other => panic!("expected Unsupported, got {:?}", other),
    }
}

#[test]
fn untyped_requests_convert_through_the_registry() {
    let mut session = memory_session();
    session.set("k", "v").unwrap();

    let value = session
        .command(CommandRequest::new(CommandId::Get).arg("k"))
        .unwrap();
    assert_eq!(value, Value::Text("v".into()));

    let value = session
        .command(CommandRequest::new(CommandId::Ping))
        .unwrap();
    assert_eq!(value, Value::Text("PONG".into()));
}

#[test]
fn operation_error_reply_surfaces_as_typed_error() {
    let driver = ScriptedDriver::new().reply(RawReply::Error("ERR custom failure".into()));
    let mut session = Session::new(Arc::new(driver), ClientConfig::default());

    match session.get("k") {
        Err(Error::Operation { command, message }) => {
            assert_eq!(command, CommandId::Get);
            assert!(message.contains("custom failure"));
        }
        other => panic!("expected Operation, got {:?}", other),
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    logins: u32,
}

#[test]
fn structured_values_round_trip_through_the_codec() {
    let mut session = memory_session();

    let profile = Profile {
        name: "alice".to_string(),
        logins: 3,
    };
    session.set_json("user:1", &profile).unwrap();

    let loaded: Profile = session.get_json("user:1").unwrap().unwrap();
    assert_eq!(loaded, profile);
    assert_eq!(session.get_json::<Profile>("user:2").unwrap(), None);
}

#[test]
fn corrupt_payload_is_a_codec_error() {
    let mut session = memory_session();
    session.set("user:1", "{not json").unwrap();
    assert!(matches!(
        session.get_json::<Profile>("user:1"),
        Err(Error::Codec { .. })
    ));
}
