// vim: tw=80
//! The phase state machine, invocation resolution, and the listener and log
//! registry.  Everything here runs with the session lock held.

use std::{
    collections::HashMap,
    fmt,
    mem,
    sync::{Arc, mpsc::{self, Receiver, Sender}}
};
use tracing::{debug, trace, warn};

use crate::{
    Answer,
    ArgSpec,
    CallRecord,
    CallerId,
    Error,
    Expectation,
    Failure,
    Handle,
    Invocation,
    Result,
    intercept::{Endpoint, Interceptor},
    store::Store,
};

/// Where a session is in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Phase {
    /// Expectations may be added.  The initial phase.
    Programming,
    /// Strict expectations remain to be consumed.
    Replaying,
    /// Replaying, but only stubs remain.
    NoExpectations,
    /// The session ended successfully.
    Verified,
    /// The session ended with a [`Failure`].
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Phase::Programming => "programming",
            Phase::Replaying => "replaying",
            Phase::NoExpectations => "replaying without expectations",
            Phase::Verified => "verified",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The result of starting to await a strict expectation.
pub(crate) enum Watch {
    /// It was consumed already
    Done(Invocation),
    Pending(Receiver<Result<Invocation>>),
}

/// A registered "await all" waiter, identified so a timed-out waiter can
/// withdraw without disturbing a newer one.
pub(crate) type AwaitAll = (u64, Receiver<Result<()>>);

pub(crate) struct Session {
    phase: Phase,
    /// The thread that created the session
    owner: CallerId,
    interceptor: Arc<dyn Interceptor>,
    store: Store,
    strict_log: Vec<(Handle, Invocation)>,
    call_log: Vec<CallRecord>,
    listeners: HashMap<Handle, Vec<Sender<Result<Invocation>>>>,
    await_all: Option<(u64, Sender<Result<()>>)>,
    next_ticket: u64,
    /// Modules this session currently has intercepted
    installed: Vec<String>,
    failure: Option<Failure>,
    /// Has test code seen `failure` yet?
    observed: bool,
}

fn validate(module: &str, function: Option<&str>) -> Result<()> {
    if module.is_empty() {
        return Err(Error::Malformed("module name must not be empty"));
    }
    if function.map_or(false, str::is_empty) {
        return Err(Error::Malformed("function name must not be empty"));
    }
    Ok(())
}

impl Session {
    pub fn new(interceptor: Arc<dyn Interceptor>) -> Self {
        Session {
            phase: Phase::Programming,
            owner: CallerId::current(),
            interceptor,
            store: Store::default(),
            strict_log: Vec::new(),
            call_log: Vec::new(),
            listeners: HashMap::new(),
            await_all: None,
            next_ticket: 0,
            installed: Vec::new(),
            failure: None,
            observed: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn owner(&self) -> CallerId {
        self.owner
    }

    /// Report the stored failure to test code.
    fn observe_failure(&mut self) -> Error {
        self.observed = true;
        match &self.failure {
            Some(f) => Error::Failed(f.clone()),
            None => Error::SessionEnded
        }
    }

    fn require_programming(&mut self, op: &'static str) -> Result<()> {
        match self.phase {
            Phase::Programming => Ok(()),
            Phase::Failed => Err(self.observe_failure()),
            phase => Err(Error::WrongPhase{op, phase})
        }
    }

    fn check_target(&mut self, op: &'static str, module: &str, function: &str)
        -> Result<()>
    {
        validate(module, Some(function))?;
        self.require_programming(op)?;
        if self.store.is_blacklisted(module) {
            return Err(Error::Conflict(module.to_owned()));
        }
        Ok(())
    }

    pub fn strict(&mut self, module: String, function: String,
                  args: Vec<ArgSpec>, answer: Answer) -> Result<Handle>
    {
        self.check_target("strict", &module, &function)?;
        let handle = Handle::next();
        trace!(%module, %function, %handle, "strict expectation added");
        self.store.push_strict(Expectation::new(Some(handle), module,
                                                function, args, answer));
        Ok(handle)
    }

    pub fn stub(&mut self, module: String, function: String,
                args: Vec<ArgSpec>, answer: Answer) -> Result<()>
    {
        self.check_target("stub", &module, &function)?;
        trace!(%module, %function, "stub added");
        self.store.push_stub(Expectation::new(None, module, function, args,
                                              answer));
        Ok(())
    }

    pub fn nothing(&mut self, module: String) -> Result<()> {
        validate(&module, None)?;
        self.require_programming("nothing")?;
        if self.store.has_expectations_for(&module) {
            return Err(Error::Conflict(module));
        }
        trace!(%module, "module blacklisted");
        self.store.blacklist(module);
        Ok(())
    }

    pub fn replay(&mut self, endpoint: Endpoint) -> Result<()> {
        self.require_programming("replay")?;
        let modules = self.store.modules();
        if let Err(e) = self.interceptor.install(&modules, endpoint) {
            let failure = Failure::Configuration(Box::new(e.clone()));
            self.fail(failure);
            self.observed = true;
            return Err(e);
        }
        self.installed = modules;
        self.phase = if self.store.strict_is_empty() {
            Phase::NoExpectations
        } else {
            Phase::Replaying
        };
        debug!(phase = %self.phase, modules = ?self.installed, "replaying");
        Ok(())
    }

    /// Decide what to do with one intercepted call.
    ///
    /// Returns the answer to compute for the caller.
    pub fn resolve(&mut self, inv: Invocation) -> Result<Answer> {
        match self.phase {
            Phase::Replaying | Phase::NoExpectations => (),
            Phase::Verified => return Err(Error::SessionEnded),
            Phase::Failed => {
                return Err(self.failure.clone()
                           .map_or(Error::SessionEnded, Error::Failed));
            },
            phase => return Err(Error::WrongPhase{op: "deliver", phase})
        }
        if self.store.is_blacklisted(&inv.module) {
            return Err(Error::UndefinedFunction {
                module: inv.module,
                function: inv.function,
                arity: inv.args.len()
            });
        }
        if self.phase == Phase::Replaying {
            let head = self.store.check_head(&inv)
                .map(|(e, r)| r.map_err(|rejection| (e.clone(), rejection)));
            match head {
                Some(Ok(())) => {
                    if let Some(e) = self.store.pop_head() {
                        return Ok(self.consume(e, inv));
                    }
                },
                Some(Err((expectation, rejection))) => {
                    let i = rejection.index;
                    let failure = Failure::Mismatch {
                        position: i + 1,
                        expected: expectation.args()[i].clone(),
                        actual: inv.args[i].clone(),
                        expectation,
                        invocation: inv,
                        explanation: rejection.explanation,
                    };
                    return Err(self.fail(failure));
                },
                None => ()
            }
        }
        let stub = self.store.find_stub(&inv).map(|e| e.answer().clone());
        if let Some(answer) = stub {
            trace!(module = %inv.module, function = %inv.function,
                   "stub matched");
            self.call_log.push(CallRecord {
                module: inv.module,
                function: inv.function,
                args: inv.args,
                answer: answer.clone()
            });
            return Ok(answer);
        }
        let expected = self.store.head().cloned();
        Err(self.fail(Failure::Unexpected{invocation: inv, expected}))
    }

    /// Record the consumption of the former head of the strict queue.
    fn consume(&mut self, e: Expectation, inv: Invocation) -> Answer {
        debug!(module = %inv.module, function = %inv.function,
               handle = ?e.handle(), "strict expectation consumed");
        if let Some(h) = e.handle() {
            self.strict_log.push((h, inv.clone()));
            for tx in self.listeners.remove(&h).unwrap_or_default() {
                // The listener may have timed out already
                let _ = tx.send(Ok(inv.clone()));
            }
        }
        let answer = e.answer().clone();
        self.call_log.push(CallRecord {
            module: inv.module,
            function: inv.function,
            args: inv.args,
            answer: answer.clone()
        });
        if self.store.strict_is_empty() {
            match self.await_all.take() {
                Some((_, tx)) => {
                    let _ = tx.send(Ok(()));
                    self.finish();
                },
                None => self.phase = Phase::NoExpectations
            }
        }
        answer
    }

    /// Start awaiting the consumption of a strict expectation.
    pub fn watch(&mut self, handle: Handle) -> Result<Watch> {
        if let Some((_, inv)) = self.strict_log.iter().find(|(h, _)| *h == handle)
        {
            return Ok(Watch::Done(inv.clone()));
        }
        // Unknown handles are rejected in every phase
        if !self.store.is_pending(handle) {
            return Err(Error::InvalidHandle(handle));
        }
        if self.phase == Phase::Failed {
            return Err(self.observe_failure());
        }
        let (tx, rx) = mpsc::channel();
        self.listeners.entry(handle).or_default().push(tx);
        trace!(%handle, "listener registered");
        Ok(Watch::Pending(rx))
    }

    /// Start awaiting the consumption of every strict expectation.
    ///
    /// Returns `None` if the session is verified already.
    pub fn await_all(&mut self) -> Result<Option<AwaitAll>> {
        match self.phase {
            Phase::Verified => Ok(None),
            Phase::Failed => Err(self.observe_failure()),
            Phase::NoExpectations => {
                self.finish();
                Ok(None)
            },
            Phase::Replaying => {
                if self.await_all.is_some() {
                    return Err(Error::AlreadyAwaiting);
                }
                let ticket = self.next_ticket;
                self.next_ticket += 1;
                let (tx, rx) = mpsc::channel();
                self.await_all = Some((ticket, tx));
                trace!(ticket, "awaiting all expectations");
                Ok(Some((ticket, rx)))
            },
            phase => Err(Error::WrongPhase{op: "await_expectations", phase})
        }
    }

    /// Withdraw a timed-out "await all" waiter.
    pub fn withdraw_await_all(&mut self, ticket: u64) {
        if self.await_all.as_ref().map_or(false, |(t, _)| *t == ticket) {
            self.await_all = None;
        }
    }

    pub fn verify(&mut self) -> Result<()> {
        match self.phase {
            Phase::Verified => Ok(()),
            Phase::Failed => Err(self.observe_failure()),
            Phase::NoExpectations => {
                self.finish();
                Ok(())
            },
            Phase::Replaying => {
                let remaining = self.store.remaining();
                let e = self.fail(Failure::MissingInvocations(remaining));
                self.observed = true;
                Err(e)
            },
            phase => Err(Error::WrongPhase{op: "verify", phase})
        }
    }

    pub fn call_log(&self) -> Vec<CallRecord> {
        self.call_log.clone()
    }

    /// The stored failure, if any.  Counts as test code seeing it.
    pub fn failure(&mut self) -> Option<Failure> {
        if self.failure.is_some() {
            self.observed = true;
        }
        self.failure.clone()
    }

    /// End the session in failure.  Every waiter is released with the
    /// failure.
    fn fail(&mut self, failure: Failure) -> Error {
        warn!(%failure, owner = ?self.owner, "mock session failed");
        self.phase = Phase::Failed;
        let mut released = false;
        for (_, txs) in self.listeners.drain() {
            for tx in txs {
                released |= tx.send(Err(Error::Failed(failure.clone())))
                    .is_ok();
            }
        }
        if let Some((_, tx)) = self.await_all.take() {
            released |= tx.send(Err(Error::Failed(failure.clone()))).is_ok();
        }
        self.observed |= released;
        self.failure = Some(failure.clone());
        self.uninstall();
        Error::Failed(failure)
    }

    /// End the session successfully.
    fn finish(&mut self) {
        self.phase = Phase::Verified;
        // Dropping the senders wakes anybody left with SessionEnded
        self.listeners.clear();
        self.await_all = None;
        self.uninstall();
        debug!(owner = ?self.owner, "mock session verified");
    }

    fn uninstall(&mut self) {
        let modules = mem::take(&mut self.installed);
        if !modules.is_empty() {
            self.interceptor.uninstall(&modules);
        }
    }

    /// Tear down because the `Mock` is going away.
    ///
    /// Returns a failure that no test code has seen yet.  A session still
    /// replaying with strict expectations left counts as failed.
    pub fn abandon(&mut self) -> Option<Failure> {
        self.listeners.clear();
        self.await_all = None;
        self.uninstall();
        if self.phase == Phase::Replaying {
            let remaining = self.store.remaining();
            warn!(owner = ?self.owner, "mock session dropped unverified");
            return Some(Failure::MissingInvocations(remaining));
        }
        if self.observed {
            None
        } else {
            self.failure.take()
        }
    }
}
