// vim: tw=80
//! Storage for everything programmed before replay.

use std::collections::{BTreeSet, VecDeque};

use crate::{
    CallerId,
    Expectation,
    Handle,
    Invocation,
    matcher::{self, Rejection},
};

#[derive(Default)]
pub(crate) struct Store {
    /// Strict expectations, in execution order
    strict: VecDeque<Expectation>,
    /// Stubs, in registration order
    stubs: Vec<Expectation>,
    /// Modules that may not be called at all
    blacklist: BTreeSet<String>,
}

impl Store {
    pub fn push_strict(&mut self, e: Expectation) {
        self.strict.push_back(e);
    }

    pub fn push_stub(&mut self, e: Expectation) {
        self.stubs.push(e);
    }

    pub fn blacklist(&mut self, module: String) {
        self.blacklist.insert(module);
    }

    pub fn is_blacklisted(&self, module: &str) -> bool {
        self.blacklist.contains(module)
    }

    /// Does any strict expectation or stub target `module`?
    pub fn has_expectations_for(&self, module: &str) -> bool {
        self.strict.iter().chain(self.stubs.iter())
            .any(|e| e.module() == module)
    }

    /// Every module that must be intercepted, sorted and deduplicated.
    pub fn modules(&self) -> Vec<String> {
        let mut set: BTreeSet<&str> = self.blacklist.iter()
            .map(String::as_str)
            .collect();
        for e in self.strict.iter().chain(self.stubs.iter()) {
            set.insert(e.module());
        }
        set.into_iter().map(str::to_owned).collect()
    }

    pub fn head(&self) -> Option<&Expectation> {
        self.strict.front()
    }

    pub fn pop_head(&mut self) -> Option<Expectation> {
        self.strict.pop_front()
    }

    pub fn strict_is_empty(&self) -> bool {
        self.strict.is_empty()
    }

    pub fn remaining(&self) -> Vec<Expectation> {
        self.strict.iter().cloned().collect()
    }

    pub fn is_pending(&self, handle: Handle) -> bool {
        self.strict.iter().any(|e| e.handle() == Some(handle))
    }

    /// Check the head of the strict queue against `inv`.
    ///
    /// Returns `None` if the head does not target the same function and
    /// arity, so the call should be offered to the stubs instead.
    pub fn check_head(&self, inv: &Invocation)
        -> Option<(&Expectation, Result<(), Rejection>)>
    {
        self.head()
            .filter(|e| e.targets(inv))
            .map(|e| (e, matcher::check(e.args(), &inv.args, inv.caller)))
    }

    /// The first stub, by registration order, that matches `inv`.
    pub fn find_stub(&self, inv: &Invocation) -> Option<&Expectation> {
        let caller: CallerId = inv.caller;
        self.stubs.iter()
            .find(|e| e.targets(inv) &&
                  matcher::check(e.args(), &inv.args, caller).is_ok())
    }
}
