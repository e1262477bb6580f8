//! End-to-end flows through the public facade.

use std::sync::Arc;

use prismkv::{ClientConfig, MemoryDriver, Session, Value};

fn session() -> Session {
    Session::new(Arc::new(MemoryDriver::new()), ClientConfig::default())
}

#[test]
fn pipelined_read_write_read() {
    let mut session = session();
    let mut pipe = session.pipeline().unwrap();

    pipe.get("a").unwrap();
    pipe.set("a", "1").unwrap();
    pipe.get("a").unwrap();

    let results = pipe.sync_all().unwrap();
    assert_eq!(
        results.into_iter().collect::<Result<Vec<_>, _>>().unwrap(),
        vec![Value::Nil, Value::Okay, Value::Text("1".into())]
    );
}

#[test]
fn transactional_increments_are_atomic_and_ordered() {
    let mut session = session();
    session.incr_by("c", 5).unwrap();

    let mut txn = session.multi().unwrap();
    txn.incr("c").unwrap();
    txn.incr("c").unwrap();
    txn.incr("c").unwrap();

    let results = txn.exec().unwrap();
    drop(txn);
    assert_eq!(results.len(), 3);

    let counts: Vec<i64> = results
        .into_iter()
        .map(|r| r.unwrap().as_int().unwrap())
        .collect();
    assert_eq!(counts, vec![6, 7, 8]);
    assert_eq!(session.get("c").unwrap(), Some("8".to_string()));
}

#[test]
fn direct_and_batch_modes_share_one_typed_surface() {
    let mut session = session();

    session.set("k", "direct").unwrap();
    assert_eq!(session.get("k").unwrap(), Some("direct".to_string()));

    let mut pipe = session.pipeline().unwrap();
    let piped = pipe.get("k").unwrap();
    pipe.sync().unwrap();
    assert_eq!(piped.wait().unwrap(), Some("direct".to_string()));
    drop(pipe);

    let mut txn = session.multi().unwrap();
    let queued = txn.get("k").unwrap();
    txn.exec().unwrap();
    assert_eq!(queued.wait().unwrap(), Some("direct".to_string()));
}

#[test]
fn results_can_be_waited_on_from_another_thread() {
    let mut session = session();
    session.set("shared", "42").unwrap();

    let mut pipe = session.pipeline().unwrap();
    let future = pipe.get("shared").unwrap();

    let reader = std::thread::spawn(move || future.wait());
    pipe.sync().unwrap();

    assert_eq!(reader.join().unwrap().unwrap(), Some("42".to_string()));
}
