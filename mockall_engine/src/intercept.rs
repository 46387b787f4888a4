// vim: tw=80
//! The seam between the engine and whatever redirects real calls into it.
//!
//! The engine never decides how calls are intercepted.  At
//! [`replay`](crate::Mock::replay) it asks an [`Interceptor`] to route every
//! call of the programmed modules to an [`Endpoint`], and when the session
//! ends it asks for the routes to be removed.
//!
//! [`Registry`] is a ready-made interceptor based on function-pointer-like
//! indirection: code that wants to be mockable forwards through
//! [`Registry::dispatch`], and falls back to its real implementation when the
//! module isn't intercepted.
//!
//! # Examples
//! ```
//! # use mockall_engine::*;
//! mod clock {
//!     use mockall_engine::*;
//!
//!     pub fn now() -> u64 {
//!         match intercept::dispatch("clock", "now", args![]) {
//!             Some(reply) => reply.unwrap().get::<u64>().unwrap(),
//!             None => 1_700_000_000
//!         }
//!     }
//! }
//!
//! assert_eq!(1_700_000_000, clock::now());
//! let mock = Mock::new();
//! mock.strict_answer("clock", "now", specs![], Answer::value(42u64))
//!     .unwrap();
//! mock.replay().unwrap();
//! assert_eq!(42, clock::now());
//! mock.verify().unwrap();
//! assert_eq!(1_700_000_000, clock::now());
//! ```

use lazy_static::lazy_static;
use std::{
    collections::hash_map::{Entry, HashMap},
    sync::{Mutex, MutexGuard, PoisonError, Weak}
};
use tracing::{debug, warn};

use crate::{CallerId, Error, Result, Value, mock::Shared};

/// Installs and removes call interception on behalf of a session.
pub trait Interceptor: Send + Sync {
    /// Route every call of every function in `modules` to `endpoint`.
    ///
    /// Must be all-or-nothing: if any module is already claimed, fail with
    /// [`Error::ModuleAlreadyMocked`] and install none of them.
    fn install(&self, modules: &[String], endpoint: Endpoint) -> Result<()>;

    /// Restore the original behavior of `modules`.  Best-effort; must not
    /// fail.
    fn uninstall(&self, modules: &[String]);
}

/// A handle through which intercepted calls reach a session.
///
/// Holding an `Endpoint` does not keep the session alive.
#[derive(Clone)]
pub struct Endpoint(pub(crate) Weak<Shared>);

impl Endpoint {
    /// Hand one intercepted call to the session and get its reply.
    ///
    /// Blocks while the session resolves other calls.  The matched answer
    /// is computed on the current thread.  An `Err` must be raised to the
    /// caller of the intercepted function.
    pub fn deliver(&self, module: &str, function: &str, args: Vec<Value>,
                   caller: CallerId) -> Result<Value>
    {
        match self.0.upgrade() {
            Some(shared) => shared.deliver(module, function, args, caller),
            None => Err(Error::SessionEnded)
        }
    }

    fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// A table of intercepted modules, each routed to the session that claimed
/// it.
#[derive(Default)]
pub struct Registry {
    routes: Mutex<HashMap<String, Endpoint>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<String, Endpoint>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forward a call of `module::function` on behalf of the current thread.
    ///
    /// Returns `None` if the module isn't intercepted, in which case the
    /// caller should run the real implementation.
    pub fn dispatch(&self, module: &str, function: &str, args: Vec<Value>)
        -> Option<Result<Value>>
    {
        // Don't hold the table lock while the session works
        let endpoint = self.routes().get(module).cloned()?;
        Some(endpoint.deliver(module, function, args, CallerId::current()))
    }

    /// Is `module` currently routed to a live session?
    pub fn is_intercepted(&self, module: &str) -> bool {
        self.routes().get(module).map_or(false, Endpoint::is_alive)
    }
}

impl Interceptor for Registry {
    fn install(&self, modules: &[String], endpoint: Endpoint) -> Result<()> {
        let mut routes = self.routes();
        // Routes left behind by sessions that no longer exist are free
        routes.retain(|_, e| e.is_alive());
        if let Some(m) = modules.iter().find(|m| routes.contains_key(*m)) {
            warn!(module = %m, "module is already mocked");
            return Err(Error::ModuleAlreadyMocked(m.clone()));
        }
        for m in modules {
            if let Entry::Vacant(v) = routes.entry(m.clone()) {
                v.insert(endpoint.clone());
            }
        }
        debug!(?modules, "installed interception");
        Ok(())
    }

    fn uninstall(&self, modules: &[String]) {
        let mut routes = self.routes();
        for m in modules {
            routes.remove(m);
        }
        debug!(?modules, "removed interception");
    }
}

lazy_static! {
    static ref GLOBAL: Registry = Registry::new();
}

/// The process-wide registry used by [`Mock::new`](crate::Mock::new).
pub fn global() -> &'static Registry {
    &GLOBAL
}

/// Shorthand for `global().dispatch(module, function, args)`.
pub fn dispatch(module: &str, function: &str, args: Vec<Value>)
    -> Option<Result<Value>>
{
    global().dispatch(module, function, args)
}

/// Routes through the process-wide registry.
pub(crate) struct Global;

impl Interceptor for Global {
    fn install(&self, modules: &[String], endpoint: Endpoint) -> Result<()> {
        global().install(modules, endpoint)
    }

    fn uninstall(&self, modules: &[String]) {
        global().uninstall(modules)
    }
}
