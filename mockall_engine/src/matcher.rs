// vim: tw=80
//! Argument specifications and the positional matching algorithm.

use core::fmt::{self, Display};
use predicates::reflection::{Case, PredicateReflection, Product};
use predicates_tree::CaseTreeExt;
use std::{
    any,
    marker::PhantomData,
    panic::{self, AssertUnwindSafe},
    sync::Arc
};

use crate::{CallerId, Predicate, Value};

/// One element of an expectation's argument specification.
///
/// Literal values convert into `ArgSpec` with `From`, so most specifications
/// can be written with [`specs!`](crate::specs).
#[derive(Clone)]
pub enum ArgSpec {
    /// The actual argument must be structurally equal to this value.
    Literal(Value),
    /// The actual argument must satisfy this predicate.
    Pred(Arc<dyn Predicate<Value> + Send + Sync>),
    /// The actual argument must equal the identity of the caller.
    Caller,
}

/// Matches an argument that equals the identity of the calling thread.
pub const CALLER: ArgSpec = ArgSpec::Caller;

impl ArgSpec {
    /// Check one actual argument.
    ///
    /// A predicate that panics does not match.
    pub fn matches(&self, actual: &Value, caller: CallerId) -> bool {
        match self {
            ArgSpec::Literal(v) => v == actual,
            ArgSpec::Pred(p) => {
                panic::catch_unwind(AssertUnwindSafe(|| p.eval(actual)))
                    .unwrap_or(false)
            },
            ArgSpec::Caller => actual.downcast_ref::<CallerId>()
                .map_or(false, |c| *c == caller)
        }
    }

    /// Render a predicate's failing case tree, if there is one.
    fn explain(&self, actual: &Value) -> Option<String> {
        if let ArgSpec::Pred(p) = self {
            let r = panic::catch_unwind(AssertUnwindSafe(|| {
                p.find_case(false, actual).map(|c| c.tree().to_string())
            }));
            r.ok().flatten()
        } else {
            None
        }
    }
}

impl<T> From<T> for ArgSpec
    where T: any::Any + fmt::Debug + PartialEq + Send + Sync
{
    fn from(t: T) -> Self {
        ArgSpec::Literal(Value::new(t))
    }
}

impl Display for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArgSpec::Literal(v) => write!(f, "{:?}", v),
            ArgSpec::Pred(p) => write!(f, "{}", p),
            ArgSpec::Caller => f.write_str("<caller>"),
        }
    }
}

impl fmt::Debug for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Build a `Vec<ArgSpec>`.  Plain values become literals.
///
/// # Examples
/// ```
/// # use mockall_engine::*;
/// let s = specs![1u32, any(), CALLER];
/// assert_eq!(3, s.len());
/// ```
#[macro_export]
macro_rules! specs {
    () => { ::std::vec::Vec::<$crate::ArgSpec>::new() };
    ($($s:expr),+ $(,)?) => {
        vec![$( $crate::ArgSpec::from($s), )+]
    };
}

struct Anything;

impl Display for Anything {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("<anything>")
    }
}

impl PredicateReflection for Anything {}

impl Predicate<Value> for Anything {
    fn eval(&self, _: &Value) -> bool {
        true
    }
}

/// Matches any single argument.
pub fn any() -> ArgSpec {
    ArgSpec::Pred(Arc::new(Anything))
}

/// Adapts a `Predicate<T>` to the untyped [`Value`]s the engine carries.  A
/// value of any other type never matches.
struct Typed<P, T> {
    inner: P,
    _t: PhantomData<fn(&T)>
}

impl<P, T> Display for Typed<P, T>
    where P: Predicate<T>
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<P, T> PredicateReflection for Typed<P, T>
    where P: Predicate<T>
{
    fn children<'a>(&'a self)
        -> Box<dyn Iterator<Item=predicates::reflection::Child<'a>> + 'a>
    {
        self.inner.children()
    }
}

impl<P, T> Predicate<Value> for Typed<P, T>
    where P: Predicate<T>, T: any::Any
{
    fn eval(&self, v: &Value) -> bool {
        v.downcast_ref::<T>().map_or(false, |t| self.inner.eval(t))
    }

    fn find_case<'a>(&'a self, expected: bool, v: &Value)
        -> Option<Case<'a>>
    {
        match v.downcast_ref::<T>() {
            Some(t) => self.inner.find_case(expected, t),
            None if expected => None,
            None => Some(Case::new(Some(self), false)
                 .add_product(Product::new("expected type",
                                           any::type_name::<T>())))
        }
    }
}

/// Use a typed [`Predicate`] as an argument specification.
///
/// # Examples
/// ```
/// # use mockall_engine::*;
/// let s = pred::<u32, _>(predicate::lt(5u32));
/// let me = CallerId::current();
/// assert!(s.matches(&Value::new(4u32), me));
/// assert!(!s.matches(&Value::new(4i64), me));
/// ```
pub fn pred<T, P>(p: P) -> ArgSpec
    where T: any::Any, P: Predicate<T> + Send + Sync + 'static
{
    ArgSpec::Pred(Arc::new(Typed{inner: p, _t: PhantomData}))
}

/// Use a closure over `&T` as an argument specification.
///
/// This is equivalent to `pred(predicate::function(f))`.
pub fn function<T, F>(f: F) -> ArgSpec
    where T: any::Any + Send + Sync, F: Fn(&T) -> bool + Send + Sync + 'static
{
    pred::<T, _>(predicates::function::function(f))
}

/// Why an argument list was rejected.
#[derive(Clone, Debug)]
pub(crate) struct Rejection {
    /// 0-based position of the first failing argument
    pub index: usize,
    pub explanation: Option<String>,
}

/// Match `actual` against `specs` positionally, left to right.
///
/// The caller must already have checked that the arities agree.
pub(crate) fn check(specs: &[ArgSpec], actual: &[Value], caller: CallerId)
    -> Result<(), Rejection>
{
    debug_assert_eq!(specs.len(), actual.len());
    for (index, (s, a)) in specs.iter().zip(actual.iter()).enumerate() {
        if !s.matches(a, caller) {
            let explanation = s.explain(a);
            return Err(Rejection{index, explanation});
        }
    }
    Ok(())
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::predicate;
    use std::thread;

    #[test]
    fn literal() {
        let me = CallerId::current();
        assert!(ArgSpec::from(5u32).matches(&Value::new(5u32), me));
        assert!(!ArgSpec::from(5u32).matches(&Value::new(6u32), me));
    }

    #[test]
    fn literal_of_another_type() {
        let me = CallerId::current();
        assert!(!ArgSpec::from(5u32).matches(&Value::new(5u64), me));
        assert!(!ArgSpec::from("x").matches(&Value::new(String::from("x")),
                                            me));
    }

    #[test]
    fn anything() {
        let me = CallerId::current();
        let s = any();
        assert!(s.matches(&Value::new(5u32), me));
        assert!(s.matches(&Value::unit(), me));
        assert!(s.matches(&Value::new(vec!["a", "b"]), me));
        assert_eq!("<anything>", s.to_string());
    }

    #[test]
    fn caller() {
        let me = CallerId::current();
        let other = thread::spawn(CallerId::current).join().unwrap();
        assert!(CALLER.matches(&Value::new(me), me));
        assert!(!CALLER.matches(&Value::new(other), me));
        assert!(!CALLER.matches(&Value::new(5u32), me));
    }

    #[test]
    fn panicking_predicate_does_not_match() {
        let me = CallerId::current();
        let s = function(|_: &u32| -> bool { panic!("boom") });
        assert!(!s.matches(&Value::new(1u32), me));
    }

    #[test]
    fn typed_predicate() {
        let me = CallerId::current();
        let s = pred::<i32, _>(predicate::ge(10i32));
        assert!(s.matches(&Value::new(10i32), me));
        assert!(!s.matches(&Value::new(9i32), me));
        assert!(!s.matches(&Value::new("ten"), me));
    }

    #[test]
    fn first_failing_position() {
        let me = CallerId::current();
        let specs = specs![1u32, any(), 3u32, 4u32];
        let actual = crate::args![1u32, 99u32, 0u32, 0u32];
        let r = check(&specs, &actual, me).unwrap_err();
        assert_eq!(2, r.index);
    }

    #[test]
    fn all_positions_match() {
        let me = CallerId::current();
        let specs = specs![1u32, any(), CALLER];
        let actual = crate::args![1u32, "whatever", me];
        assert!(check(&specs, &actual, me).is_ok());
        assert!(check(&[], &[], me).is_ok());
    }

    #[test]
    fn explanation_of_predicate_mismatch() {
        let me = CallerId::current();
        let specs = vec![pred::<u32, _>(predicate::eq(4u32))];
        let r = check(&specs, &crate::args![5u32], me).unwrap_err();
        let e = r.explanation.unwrap();
        assert!(e.contains("var == 4"), "{}", e);
    }
}
