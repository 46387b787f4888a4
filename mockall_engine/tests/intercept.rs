// vim: tw=80
//! Installing and removing interception, and blacklisted modules.
#![deny(warnings)]

use std::sync::{Arc, Mutex};

use mockall_engine::*;
use mockall_engine::intercept::{self, Endpoint, Interceptor, Registry};
use pretty_assertions::assert_eq;

fn session() -> (Arc<Registry>, Mock) {
    let registry = Arc::new(Registry::new());
    let mock = Mock::builder().interceptor(registry.clone()).build();
    (registry, mock)
}

/// Records what the engine asks of it
#[derive(Default)]
struct Recorder {
    installed: Mutex<Vec<Vec<String>>>,
    uninstalled: Mutex<Vec<Vec<String>>>,
}

impl Interceptor for Recorder {
    fn install(&self, modules: &[String], _endpoint: Endpoint) -> Result<()> {
        self.installed.lock().unwrap().push(modules.to_vec());
        Ok(())
    }

    fn uninstall(&self, modules: &[String]) {
        self.uninstalled.lock().unwrap().push(modules.to_vec());
    }
}

#[test]
fn installs_every_programmed_module_once() {
    let recorder = Arc::new(Recorder::default());
    let mock = Mock::builder().interceptor(recorder.clone()).build();
    mock.strict("b", "f", specs![]).unwrap();
    mock.stub("a", "g", specs![]).unwrap();
    mock.stub("b", "h", specs![]).unwrap();
    mock.nothing("c").unwrap();
    mock.replay().unwrap();
    assert_eq!(vec![vec!["a", "b", "c"]], *recorder.installed.lock().unwrap());
    assert!(recorder.uninstalled.lock().unwrap().is_empty());
    mock.deliver("b", "f", args![], CallerId::current()).unwrap();
    mock.verify().unwrap();
    assert_eq!(vec![vec!["a", "b", "c"]],
               *recorder.uninstalled.lock().unwrap());
    drop(mock);
    // Only once
    assert_eq!(1, recorder.uninstalled.lock().unwrap().len());
}

#[test]
fn uninstalls_on_failure() {
    let recorder = Arc::new(Recorder::default());
    let mock = Mock::builder().interceptor(recorder.clone()).build();
    mock.strict("m", "f", specs![]).unwrap();
    mock.replay().unwrap();
    mock.deliver("m", "g", args![], CallerId::current()).unwrap_err();
    assert_eq!(1, recorder.uninstalled.lock().unwrap().len());
    mock.failure();
}

#[test]
fn uninstalls_on_drop() {
    let (registry, mock) = session();
    mock.stub("m", "f", specs![]).unwrap();
    mock.replay().unwrap();
    assert!(registry.is_intercepted("m"));
    drop(mock);
    assert!(!registry.is_intercepted("m"));
    assert!(registry.dispatch("m", "f", args![]).is_none());
}

#[test]
fn module_already_mocked() {
    let registry = Arc::new(Registry::new());
    let first = Mock::builder().interceptor(registry.clone()).build();
    first.stub("shared", "f", specs![]).unwrap();
    first.replay().unwrap();

    let second = Mock::builder().interceptor(registry.clone()).build();
    second.stub("mine", "f", specs![]).unwrap();
    second.stub("shared", "f", specs![]).unwrap();
    let e = second.replay().unwrap_err();
    assert!(matches!(&e, Error::ModuleAlreadyMocked(m) if m == "shared"));
    assert_eq!(Phase::Failed, second.phase());
    match second.failure() {
        Some(Failure::Configuration(e)) => {
            assert!(matches!(*e, Error::ModuleAlreadyMocked(_)))
        },
        f => panic!("Unexpected failure {:?}", f)
    }
    // All or nothing
    assert!(!registry.is_intercepted("mine"));
    // The first session is undisturbed
    registry.dispatch("shared", "f", args![]).unwrap().unwrap();
    first.verify().unwrap();
}

#[test]
fn module_is_free_once_the_session_ends() {
    let registry = Arc::new(Registry::new());
    for _ in 0..2 {
        let mock = Mock::builder().interceptor(registry.clone()).build();
        mock.strict("m", "f", specs![]).unwrap();
        mock.replay().unwrap();
        registry.dispatch("m", "f", args![]).unwrap().unwrap();
        mock.verify().unwrap();
    }
}

#[test]
fn blacklisted_module() {
    let (registry, mock) = session();
    mock.nothing("forbidden").unwrap();
    mock.stub("allowed", "f", specs![]).unwrap();
    mock.replay().unwrap();
    let e = registry.dispatch("forbidden", "anything", args![1, 2]).unwrap()
        .unwrap_err();
    match e {
        Error::UndefinedFunction{module, function, arity} => {
            assert_eq!("forbidden", module);
            assert_eq!("anything", function);
            assert_eq!(2, arity);
        },
        e => panic!("Unexpected error {}", e)
    }
    // The session carries on, and the call is not logged
    assert_eq!(Phase::NoExpectations, mock.phase());
    registry.dispatch("allowed", "f", args![]).unwrap().unwrap();
    assert_eq!(1, mock.call_log().len());
    mock.verify().unwrap();
}

#[test]
fn blacklist_conflicts_with_expectations() {
    let (_registry, mock) = session();
    mock.strict("m", "f", specs![]).unwrap();
    assert!(matches!(mock.nothing("m"), Err(Error::Conflict(m)) if m == "m"));
    mock.nothing("n").unwrap();
    assert!(matches!(mock.stub("n", "f", specs![]), Err(Error::Conflict(_))));
    assert!(matches!(mock.strict("n", "f", specs![]),
                     Err(Error::Conflict(_))));
    // Still programming
    assert_eq!(Phase::Programming, mock.phase());
    mock.nothing("n").unwrap();
}

#[test]
fn endpoint_outlives_session() {
    let (_registry, mock) = session();
    let endpoint = mock.endpoint();
    drop(mock);
    let e = endpoint.deliver("m", "f", args![], CallerId::current());
    assert!(matches!(e, Err(Error::SessionEnded)));
}

#[test]
fn global_registry() {
    assert!(intercept::dispatch("global_registry_test", "f", args![])
            .is_none());
    let mock = Mock::new();
    mock.strict_answer("global_registry_test", "f", specs![],
                       Answer::value(true)).unwrap();
    mock.replay().unwrap();
    assert!(intercept::global().is_intercepted("global_registry_test"));
    let r = intercept::dispatch("global_registry_test", "f", args![]).unwrap();
    assert_eq!(Some(true), r.unwrap().get::<bool>());
    mock.verify().unwrap();
    assert!(intercept::dispatch("global_registry_test", "f", args![])
            .is_none());
}
