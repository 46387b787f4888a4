// vim: tw=80
//! Programmed call contracts and the records of calls that satisfied them.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering}
};

use crate::{Answer, ArgSpec, CallerId, Value, value::Args};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Identifies a strict expectation, for use with
/// [`Mock::await_invocation`](crate::Mock::await_invocation).
///
/// Handles are never reused, not even across sessions.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Handle(u64);

impl Handle {
    pub(crate) fn next() -> Self {
        Handle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One programmed call contract.
#[derive(Clone, Debug)]
pub struct Expectation {
    handle: Option<Handle>,
    module: String,
    function: String,
    args: Vec<ArgSpec>,
    answer: Answer,
}

impl Expectation {
    pub(crate) fn new(handle: Option<Handle>, module: String, function: String,
                      args: Vec<ArgSpec>, answer: Answer) -> Self
    {
        Expectation{handle, module, function, args, answer}
    }

    /// Present only for strict expectations.
    pub fn handle(&self) -> Option<Handle> {
        self.handle
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn answer(&self) -> &Answer {
        &self.answer
    }

    /// Does this expectation target the same function and number of
    /// arguments as `inv`?  Says nothing about the argument values.
    pub(crate) fn targets(&self, inv: &Invocation) -> bool {
        self.module == inv.module && self.function == inv.function &&
            self.args.len() == inv.args.len()
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}(", self.module, self.function)?;
        for (i, a) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", a)?;
        }
        f.write_str(")")
    }
}

/// An intercepted call.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub module: String,
    pub function: String,
    pub args: Vec<Value>,
    pub caller: CallerId,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}({})", self.module, self.function, Args(&self.args))
    }
}

/// One entry of the call log: a call that was matched by a strict
/// expectation or a stub.
#[derive(Clone, Debug)]
pub struct CallRecord {
    pub module: String,
    pub function: String,
    pub args: Vec<Value>,
    pub answer: Answer,
}
