// vim: tw=80
//! A record/replay expectation engine for mock sessions.
//!
//! A test programs the calls it expects its collaborators to receive, then
//! lets the code under test run.  Every intercepted call is checked against
//! the program, in order, and answered with the programmed reply.  Anything
//! contrary to the program fails the session.
//!
//! # Usage
//!
//! * Create a [`Mock`] session.
//! * Program it.  [`strict`] expectations must be met exactly once each, in
//!   the order they were programmed.  [`stub`]s may be called any number of
//!   times, in any order.  Modules given to [`nothing`] may not be called at
//!   all.
//! * Call [`replay`].  From now on, calls into the programmed modules are
//!   intercepted and resolved by the session.
//! * Finish with [`verify`], or with [`await_expectations`] if the calls
//!   happen on other threads.
//!
//! # User Guide
//!
//! * [`Getting started`](#getting-started)
//! * [`Matching arguments`](#matching-arguments)
//! * [`Answers`](#answers)
//! * [`Awaiting calls`](#awaiting-calls)
//! * [`Failures`](#failures)
//! * [`Interception`](#interception)
//!
//! ## Getting Started
//! ```
//! use mockall_engine::*;
//! use std::sync::Arc;
//!
//! // Code that wants to be mockable forwards through an interceptor
//! fn fetch(registry: &intercept::Registry, key: u32) -> String {
//!     match registry.dispatch("store", "get", args![key]) {
//!         Some(reply) => reply.unwrap().get::<String>().unwrap(),
//!         None => unimplemented!("the real store")
//!     }
//! }
//!
//! let registry = Arc::new(intercept::Registry::new());
//! let mock = Mock::builder().interceptor(registry.clone()).build();
//! mock.strict_answer("store", "get", specs![4u32],
//!     Answer::value(String::from("four"))).unwrap();
//! mock.replay().unwrap();
//! assert_eq!("four", fetch(&registry, 4));
//! mock.verify().unwrap();
//! ```
//!
//! ## Matching arguments
//!
//! An argument specification is a list of [`ArgSpec`]s, one per argument.
//! Plain values must be equal to the actual argument, and must have the same
//! type.  [`any`] matches anything, [`CALLER`] matches the identity of the
//! calling thread, and [`pred`] and [`function`] adapt anything from the
//! [`predicate`] module or a closure.  Both are told the argument's type.
//!
//! ```
//! # use mockall_engine::*;
//! let s = specs![1u32, any(), pred::<i64, _>(predicate::lt(10)), CALLER];
//! # assert_eq!(4, s.len());
//! ```
//!
//! The arguments are checked left to right.  When a strict expectation
//! rejects an argument, the [`Failure::Mismatch`] reports the 1-based
//! position of the first rejected one.  A stub that rejects a call is simply
//! skipped.
//!
//! ## Answers
//!
//! By default a matched call returns `()`.  An [`Answer`] can return a
//! constant, or compute the reply from the arguments.  Answer functions run on
//! the thread that made the call.
//!
//! ```
//! # use mockall_engine::*;
//! let double = Answer::returning(|args| {
//!     Value::new(args[0].get::<u32>().unwrap() * 2)
//! });
//! assert_eq!(Some(8u32), double.call(&args![4u32]).get::<u32>());
//! ```
//!
//! ## Awaiting calls
//!
//! [`strict`] returns a [`Handle`].  [`await_invocation`] blocks until the
//! expectation is consumed and returns the [`Invocation`] that did so.  It
//! returns at once if that already happened.  [`await_expectations`] blocks
//! until every strict expectation is consumed, then ends the session.  Both
//! give up after [`Config::await_timeout`].
//!
//! ```
//! # use mockall_engine::*;
//! # use std::{sync::Arc, thread};
//! let registry = Arc::new(intercept::Registry::new());
//! let mock = Mock::builder().interceptor(registry.clone()).build();
//! let h = mock.strict("worker", "done", specs![CALLER]).unwrap();
//! mock.replay().unwrap();
//!
//! let r = registry.clone();
//! let worker = thread::spawn(move || {
//!     r.dispatch("worker", "done", args![CallerId::current()]);
//!     CallerId::current()
//! });
//! let inv = mock.await_invocation(h).unwrap();
//! assert_eq!(worker.join().unwrap(), inv.caller);
//! mock.await_expectations().unwrap();
//! ```
//!
//! ## Failures
//!
//! A wrong argument, an unexpected call, or a [`verify`] with strict
//! expectations left over ends the session with a [`Failure`].  The
//! intercepted caller that caused it gets the failure as an [`Error`], every
//! pending await is released with it, and later operations keep returning it.
//! A `Mock` whose failure was never observed by the test panics when dropped,
//! and so does one dropped with strict expectations left unconsumed.
//!
//! ## Interception
//!
//! How calls get redirected into a session is up to an
//! [`Interceptor`](intercept::Interceptor).  The bundled
//! [`Registry`](intercept::Registry) routes by module name; see the
//! [`intercept`] module.
//!
//! [`Mock`]: struct.Mock.html
//! [`await_expectations`]: struct.Mock.html#method.await_expectations
//! [`await_invocation`]: struct.Mock.html#method.await_invocation
//! [`nothing`]: struct.Mock.html#method.nothing
//! [`replay`]: struct.Mock.html#method.replay
//! [`strict`]: struct.Mock.html#method.strict
//! [`stub`]: struct.Mock.html#method.stub
//! [`verify`]: struct.Mock.html#method.verify

mod answer;
mod config;
mod error;
mod expectation;
pub mod intercept;
mod matcher;
mod mock;
mod session;
mod store;
mod value;

pub use answer::Answer;
pub use config::Config;
pub use error::{Error, Failure, Result};
pub use expectation::{CallRecord, Expectation, Handle, Invocation};
pub use matcher::{ArgSpec, CALLER, any, function, pred};
pub use mock::{Mock, MockBuilder};
pub use predicates::prelude::{Predicate, predicate};
pub use session::Phase;
pub use value::{CallerId, Value};
