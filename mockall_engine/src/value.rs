// vim: tw=80
//! Dynamically typed argument and return values.

use downcast::*;
use std::{
    any,
    fmt,
    sync::Arc,
    thread::{self, ThreadId}
};

/// Anything that may travel through the engine as an argument or an answer.
///
/// Implemented for every `'static` type that is `Debug`, `PartialEq`, `Send`
/// and `Sync`.  Users will rarely if ever name this trait directly.
#[doc(hidden)]
pub trait Arg: Any + fmt::Debug + Send + Sync {
    /// Structural equality against another, possibly differently typed, arg.
    fn eq_arg(&self, other: &dyn Arg) -> bool;

    fn payload(&self) -> &dyn any::Any;
}
downcast!(dyn Arg);

impl<T> Arg for T
    where T: any::Any + fmt::Debug + PartialEq + Send + Sync
{
    fn eq_arg(&self, other: &dyn Arg) -> bool {
        other.downcast_ref::<T>().map_or(false, |o| self == o)
    }

    fn payload(&self) -> &dyn any::Any {
        self
    }
}

/// One argument of an intercepted call, or the value an [`Answer`] returns.
///
/// Cloning a `Value` is cheap; the payload is shared.  Two `Value`s are equal
/// when they hold the same concrete type and that type's `PartialEq` says so.
/// An `i32` never equals an `i64`, and a `&'static str` never equals a
/// `String`.
///
/// [`Answer`]: crate::Answer
#[derive(Clone)]
pub struct Value(Arc<dyn Arg>);

impl Value {
    /// Wrap a value.  Wrapping a `Value` returns it unchanged.
    pub fn new<T>(t: T) -> Self
        where T: any::Any + fmt::Debug + PartialEq + Send + Sync
    {
        if let Some(v) = (&t as &dyn any::Any).downcast_ref::<Value>() {
            return v.clone();
        }
        Value(Arc::new(t))
    }

    /// The value returned by expectations that were given no answer.
    pub fn unit() -> Self {
        Value::new(())
    }

    /// Borrow the payload if it has type `T`.
    pub fn downcast_ref<T: any::Any>(&self) -> Option<&T> {
        self.0.payload().downcast_ref::<T>()
    }

    /// Does the payload have type `T`?
    pub fn is<T: any::Any>(&self) -> bool {
        self.0.payload().is::<T>()
    }

    /// Clone the payload out, if it has type `T`.
    pub fn get<T: any::Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.0.eq_arg(&*other.0)
    }
}

/// Build a `Vec<Value>` from a list of expressions.
///
/// # Examples
/// ```
/// # use mockall_engine::*;
/// let args = args![1u32, "two"];
/// assert_eq!(Some(&1u32), args[0].downcast_ref::<u32>());
/// ```
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::Value>::new() };
    ($($a:expr),+ $(,)?) => {
        vec![$( $crate::Value::new($a), )+]
    };
}

/// Identity of the code that made an intercepted call.
///
/// Interception layers normally supply [`CallerId::current`], the calling
/// thread.  It can itself be passed as an argument, which is what the
/// [`CALLER`](crate::CALLER) sentinel matches against.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CallerId(ThreadId);

impl CallerId {
    /// The identity of the current thread.
    pub fn current() -> Self {
        CallerId(thread::current().id())
    }
}

impl From<ThreadId> for CallerId {
    fn from(id: ThreadId) -> Self {
        CallerId(id)
    }
}

pub(crate) struct Args<'a>(pub(crate) &'a [Value]);

impl<'a> fmt::Display for Args<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, a) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}", a)?;
        }
        Ok(())
    }
}
