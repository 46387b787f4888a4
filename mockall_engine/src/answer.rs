// vim: tw=80
//! Responses produced by matched expectations.

use fragile::Fragile;
use std::{
    fmt,
    mem,
    sync::{Arc, Mutex, PoisonError}
};

use crate::Value;

/// Return functions for `return_once` answers
enum Rfunc {
    // Indicates that a `return_once` answer has already returned
    Expired,
    Once(Box<dyn FnOnce(&[Value]) -> Value + Send>),
}

/// What a matched expectation replies with.
///
/// Either a fixed value, or a function of the actual arguments.  Answer
/// functions run on the thread that made the intercepted call, never on the
/// engine's behalf, so they may inspect [`CallerId::current`] and a panic
/// inside of one unwinds into the code under test.  No lock is held while
/// they run, so an answer may call back into its own expectation.
///
/// [`CallerId::current`]: crate::CallerId::current
#[derive(Clone)]
pub struct Answer(Kind);

#[derive(Clone)]
enum Kind {
    Return(Value),
    Function(Arc<dyn Fn(&[Value]) -> Value + Send + Sync>),
    Once(Arc<Mutex<Rfunc>>),
}

impl Answer {
    /// Return a constant value.
    pub fn value<T>(t: T) -> Self
        where T: std::any::Any + fmt::Debug + PartialEq + Send + Sync
    {
        Answer(Kind::Return(Value::new(t)))
    }

    /// Supply a closure that will provide the return value.  The call's
    /// arguments are passed to the closure by reference.
    ///
    /// The closure may run on several threads at once.
    pub fn returning<F>(f: F) -> Self
        where F: Fn(&[Value]) -> Value + Send + Sync + 'static
    {
        Answer(Kind::Function(Arc::new(f)))
    }

    /// Supply an `FnOnce` closure that will provide the return value.  This
    /// is useful for stubs whose answer is not `Clone`.  It will be an error
    /// to call the answer twice.
    pub fn return_once<F>(f: F) -> Self
        where F: FnOnce(&[Value]) -> Value + Send + 'static
    {
        let rfunc = Rfunc::Once(Box::new(f));
        Answer(Kind::Once(Arc::new(Mutex::new(rfunc))))
    }

    /// Single-threaded version of [`returning`](#method.returning).  Can be
    /// used when the closure isn't `Send`.
    ///
    /// It is a runtime error to make the intercepted call from a different
    /// thread than the one that created this `Answer`.
    pub fn returning_st<F>(f: F) -> Self
        where F: Fn(&[Value]) -> Value + 'static
    {
        let fragile = Fragile::new(f);
        Answer::returning(move |args: &[Value]| (fragile.get())(args))
    }

    /// The constant this answer returns, if it is not a function.
    pub fn constant(&self) -> Option<&Value> {
        match &self.0 {
            Kind::Return(v) => Some(v),
            Kind::Function(_) | Kind::Once(_) => None
        }
    }

    /// Produce the reply for one call.
    pub fn call(&self, args: &[Value]) -> Value {
        match &self.0 {
            Kind::Return(v) => v.clone(),
            Kind::Function(f) => f(args),
            Kind::Once(rfunc) => {
                let fo = {
                    let mut guard = rfunc.lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    mem::replace(&mut *guard, Rfunc::Expired)
                };
                match fo {
                    Rfunc::Once(f) => f(args),
                    Rfunc::Expired => {
                        panic!("Called a method twice that was expected only once")
                    }
                }
            }
        }
    }
}

impl Default for Answer {
    /// Return `()`
    fn default() -> Self {
        Answer(Kind::Return(Value::unit()))
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            Kind::Return(v) => f.debug_tuple("Return").field(v).finish(),
            Kind::Function(_) | Kind::Once(_) => f.write_str("Function"),
        }
    }
}
