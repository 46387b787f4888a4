// vim: tw=80
//! End-to-end sessions, from programming to verification.
#![deny(warnings)]

use std::{sync::Arc, thread, time::Duration};

use mockall_engine::*;
use mockall_engine::intercept::Registry;
use pretty_assertions::assert_eq;

fn session() -> (Arc<Registry>, Mock) {
    let registry = Arc::new(Registry::new());
    let mock = Mock::builder().interceptor(registry.clone()).build();
    (registry, mock)
}

#[test]
fn strict_call_with_default_answer() {
    let (registry, mock) = session();
    mock.strict("m", "f", specs![1, 2]).unwrap();
    mock.replay().unwrap();
    let r = registry.dispatch("m", "f", args![1, 2]).unwrap().unwrap();
    assert!(r.is::<()>());
    mock.verify().unwrap();
}

#[test]
fn strict_call_with_constant_answer() {
    let (registry, mock) = session();
    mock.strict_answer("m", "f", specs![1, 2], Answer::value(42)).unwrap();
    mock.replay().unwrap();
    let r = registry.dispatch("m", "f", args![1, 2]).unwrap().unwrap();
    assert_eq!(Value::new(42), r);
    mock.verify().unwrap();
}

#[test]
fn strict_call_with_the_wrong_argument() {
    let (registry, mock) = session();
    mock.strict("m", "f", specs![1]).unwrap();
    mock.replay().unwrap();
    let e = registry.dispatch("m", "f", args![2]).unwrap().unwrap_err();
    match &e {
        Error::Failed(Failure::Mismatch{position, expected, actual, ..}) => {
            assert_eq!(1, *position);
            assert_eq!("1", expected.to_string());
            assert_eq!(Value::new(2), *actual);
        },
        e => panic!("Unexpected error {}", e)
    }
    assert_eq!("m::f(1): argument 1 did not match: expected 1, actual 2",
               e.to_string());
    assert_eq!(Phase::Failed, mock.phase());
    assert!(mock.failure().is_some());
}

#[test]
fn stub_called_in_any_order() {
    let (registry, mock) = session();
    mock.stub_answer("m", "g", specs![any()], Answer::value("x")).unwrap();
    mock.replay().unwrap();
    assert_eq!(Phase::NoExpectations, mock.phase());
    let r2 = registry.dispatch("m", "g", args![2]).unwrap().unwrap();
    let r1 = registry.dispatch("m", "g", args![1]).unwrap().unwrap();
    assert_eq!(Some("x"), r1.get::<&str>());
    assert_eq!(Some("x"), r2.get::<&str>());
    let log = mock.call_log();
    assert_eq!(2, log.len());
    assert!(log.iter().all(|r| r.module == "m" && r.function == "g"));
    assert_eq!(args![2], log[0].args);
    assert_eq!(args![1], log[1].args);
    mock.verify().unwrap();
}

#[test]
fn await_before_and_after_consumption() {
    let (registry, mock) = session();
    let h = mock.strict("m", "f", specs![]).unwrap();
    // Nothing can consume the expectation before replay
    let e = mock.await_invocation_timeout(h, Duration::from_millis(50))
        .unwrap_err();
    assert!(matches!(e, Error::Timeout(_)));
    mock.replay().unwrap();
    let caller = thread::scope(|s| {
        s.spawn(|| {
            registry.dispatch("m", "f", args![]).unwrap().unwrap();
            CallerId::current()
        }).join().unwrap()
    });
    let inv = mock.await_invocation(h).unwrap();
    assert_eq!(caller, inv.caller);
    assert!(inv.args.is_empty());
    mock.verify().unwrap();
}

#[test]
fn mixed_strict_and_stub() {
    let (registry, mock) = session();
    mock.stub_answer("cfg", "get", specs!["port"], Answer::value(8080u16))
        .unwrap();
    mock.strict("net", "connect", specs![8080u16]).unwrap();
    mock.strict("net", "close", specs![]).unwrap();
    mock.replay().unwrap();

    let port = registry.dispatch("cfg", "get", args!["port"]).unwrap()
        .unwrap().get::<u16>().unwrap();
    registry.dispatch("net", "connect", args![port]).unwrap().unwrap();
    registry.dispatch("cfg", "get", args!["port"]).unwrap().unwrap();
    registry.dispatch("net", "close", args![]).unwrap().unwrap();

    let calls = mock.call_log().into_iter()
        .map(|r| format!("{}::{}", r.module, r.function))
        .collect::<Vec<_>>();
    assert_eq!(vec!["cfg::get", "net::connect", "cfg::get", "net::close"],
               calls);
    mock.await_expectations().unwrap();
    assert_eq!(Phase::Verified, mock.phase());
}
