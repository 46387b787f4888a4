// vim: tw=80
use std::{
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
        mpsc::RecvTimeoutError
    },
    thread,
    time::Duration
};

use crate::{
    Answer,
    ArgSpec,
    CallRecord,
    CallerId,
    Config,
    Error,
    Failure,
    Handle,
    Invocation,
    Phase,
    Result,
    Value,
    intercept::{Endpoint, Global, Interceptor},
    session::{Session, Watch},
};

/// State shared between a [`Mock`] and its [`Endpoint`]s.
pub(crate) struct Shared {
    session: Mutex<Session>,
    config: Config,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn deliver(&self, module: &str, function: &str,
                          args: Vec<Value>, caller: CallerId) -> Result<Value>
    {
        let inv = Invocation {
            module: module.to_owned(),
            function: function.to_owned(),
            args: args.clone(),
            caller
        };
        // The answer runs on the caller's thread, outside of the lock
        let answer = self.lock().resolve(inv)?;
        Ok(answer.call(&args))
    }
}

/// One record/replay mock session.
///
/// Program it with [`strict`](#method.strict), [`stub`](#method.stub) and
/// [`nothing`](#method.nothing), start intercepting with
/// [`replay`](#method.replay), and finish with [`verify`](#method.verify) or
/// [`await_expectations`](#method.await_expectations).  Every method takes
/// `&self`, and a `Mock` may be shared between threads.  Operations are
/// processed one at a time, in the order they acquire the session.
///
/// Dropping a `Mock` removes its interception.  If the session failed and no
/// test code observed the failure, the drop panics with it.  So does dropping
/// a session that is still replaying with strict expectations left, as if
/// [`verify`](#method.verify) had been called.
pub struct Mock {
    shared: Arc<Shared>,
}

impl Mock {
    /// Create a session that intercepts through the process-wide
    /// [`Registry`](crate::intercept::Registry).
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MockBuilder {
        MockBuilder::default()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.shared.lock()
    }

    /// Expect `module::function` to be called next, after every previously
    /// programmed strict expectation.  It will return `()`.
    pub fn strict<M, F>(&self, module: M, function: F, args: Vec<ArgSpec>)
        -> Result<Handle>
        where M: Into<String>, F: Into<String>
    {
        self.strict_answer(module, function, args, Answer::default())
    }

    /// Like [`strict`](#method.strict), but with an explicit answer.
    ///
    /// # Examples
    /// ```
    /// # use mockall_engine::*;
    /// let registry = std::sync::Arc::new(intercept::Registry::new());
    /// let mock = Mock::builder().interceptor(registry.clone()).build();
    /// let h = mock.strict_answer("m", "f", specs![1, 2], Answer::value(42))
    ///     .unwrap();
    /// mock.replay().unwrap();
    ///
    /// let reply = registry.dispatch("m", "f", args![1, 2]).unwrap();
    /// assert_eq!(Some(42), reply.unwrap().get::<i32>());
    /// assert_eq!(args![1, 2], mock.await_invocation(h).unwrap().args);
    /// mock.verify().unwrap();
    /// ```
    pub fn strict_answer<M, F>(&self, module: M, function: F,
                               args: Vec<ArgSpec>, answer: Answer)
        -> Result<Handle>
        where M: Into<String>, F: Into<String>
    {
        self.lock().strict(module.into(), function.into(), args, answer)
    }

    /// Allow `module::function` to be called any number of times, in any
    /// order.  It will return `()`.
    pub fn stub<M, F>(&self, module: M, function: F, args: Vec<ArgSpec>)
        -> Result<()>
        where M: Into<String>, F: Into<String>
    {
        self.stub_answer(module, function, args, Answer::default())
    }

    /// Like [`stub`](#method.stub), but with an explicit answer.
    ///
    /// When several stubs match a call, the first one registered wins.
    pub fn stub_answer<M, F>(&self, module: M, function: F,
                             args: Vec<ArgSpec>, answer: Answer)
        -> Result<()>
        where M: Into<String>, F: Into<String>
    {
        self.lock().stub(module.into(), function.into(), args, answer)
    }

    /// Forbid any call of any function in `module`.
    ///
    /// Such calls get [`Error::UndefinedFunction`].  The session itself
    /// carries on.
    pub fn nothing<M: Into<String>>(&self, module: M) -> Result<()> {
        self.lock().nothing(module.into())
    }

    /// Stop programming and start intercepting.
    ///
    /// Fails with [`Error::ModuleAlreadyMocked`] if another session holds one
    /// of the modules.  That aborts this session.
    pub fn replay(&self) -> Result<()> {
        let endpoint = self.endpoint();
        self.lock().replay(endpoint)
    }

    /// Block until the strict expectation `handle` has been consumed, and
    /// return the call that consumed it.
    ///
    /// Returns at once if it was consumed already.  Gives up after the
    /// configured [`await_timeout`](Config::await_timeout).
    pub fn await_invocation(&self, handle: Handle) -> Result<Invocation> {
        self.await_invocation_timeout(handle, self.shared.config.await_timeout())
    }

    /// Like [`await_invocation`](#method.await_invocation), with an explicit
    /// timeout.
    pub fn await_invocation_timeout(&self, handle: Handle, timeout: Duration)
        -> Result<Invocation>
    {
        let rx = match self.lock().watch(handle)? {
            Watch::Done(inv) => return Ok(inv),
            Watch::Pending(rx) => rx
        };
        match rx.recv_timeout(timeout) {
            Ok(r) => r,
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(Error::SessionEnded)
        }
    }

    /// Block until every strict expectation has been consumed, then end the
    /// session successfully.
    ///
    /// Only one call may be pending at a time; another one concurrently
    /// fails with [`Error::AlreadyAwaiting`].
    pub fn await_expectations(&self) -> Result<()> {
        self.await_expectations_timeout(self.shared.config.await_timeout())
    }

    /// Like [`await_expectations`](#method.await_expectations), with an
    /// explicit timeout.
    pub fn await_expectations_timeout(&self, timeout: Duration) -> Result<()> {
        let (ticket, rx) = match self.lock().await_all()? {
            Some(w) => w,
            None => return Ok(())
        };
        match rx.recv_timeout(timeout) {
            Ok(r) => r,
            Err(RecvTimeoutError::Timeout) => {
                self.lock().withdraw_await_all(ticket);
                // The queue may have drained while we weren't looking
                rx.try_recv().unwrap_or(Err(Error::Timeout(timeout)))
            },
            Err(RecvTimeoutError::Disconnected) => Err(Error::SessionEnded)
        }
    }

    /// End the session.
    ///
    /// Succeeds if every strict expectation was consumed.  Otherwise fails
    /// with [`Failure::MissingInvocations`], listing the rest in order.
    pub fn verify(&self) -> Result<()> {
        self.lock().verify()
    }

    /// Every call matched so far, strict or stub, in the order they were
    /// resolved.
    pub fn call_log(&self) -> Vec<CallRecord> {
        self.lock().call_log()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    /// Why the session failed, if it did.
    pub fn failure(&self) -> Option<Failure> {
        self.lock().failure()
    }

    /// A handle for an [`Interceptor`] to deliver calls through.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint(Arc::downgrade(&self.shared))
    }

    /// Deliver one call directly, as an interception layer would.
    pub fn deliver(&self, module: &str, function: &str, args: Vec<Value>,
                   caller: CallerId) -> Result<Value>
    {
        self.shared.deliver(module, function, args, caller)
    }
}

impl Default for Mock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mock {
    fn drop(&mut self) {
        let (owner, unobserved) = {
            let mut session = self.lock();
            (session.owner(), session.abandon())
        };
        if let Some(failure) = unobserved {
            if !thread::panicking() {
                panic!("Mock session created by {:?} failed: {}", owner,
                       failure);
            }
        }
    }
}

/// Builds a [`Mock`] with a non-default configuration or interceptor.
pub struct MockBuilder {
    config: Config,
    interceptor: Arc<dyn Interceptor>,
}

impl MockBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = interceptor;
        self
    }

    pub fn build(self) -> Mock {
        let session = Mutex::new(Session::new(self.interceptor));
        let shared = Arc::new(Shared{session, config: self.config});
        Mock{shared}
    }
}

impl Default for MockBuilder {
    fn default() -> Self {
        MockBuilder {
            config: Config::default(),
            interceptor: Arc::new(Global),
        }
    }
}
