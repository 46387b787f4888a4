// vim: tw=80
use std::time::Duration;

use crate::{ArgSpec, Expectation, Handle, Invocation, Phase, Value};

/// Result type of every fallible engine operation.
pub type Result<T = ()> = std::result::Result<T, Error>;

/// The single error type for all engine operations.
///
/// Most variants are local to the operation that returned them and leave the
/// session usable.  [`Error::Failed`] means the session is over.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("{op} is not allowed while the session is {phase}")]
    WrongPhase {
        op: &'static str,
        phase: Phase
    },

    #[error("Malformed argument: {0}")]
    Malformed(&'static str),

    #[error("Module {0} was declared with nothing() and cannot also have expectations")]
    Conflict(String),

    #[error("Module {0} is already mocked by another session")]
    ModuleAlreadyMocked(String),

    #[error("Invalid await handle {0}")]
    InvalidHandle(Handle),

    #[error("Undefined function {module}::{function}/{arity}")]
    UndefinedFunction {
        module: String,
        function: String,
        arity: usize
    },

    #[error("Another await_expectations call is already pending")]
    AlreadyAwaiting,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("The mock session has ended")]
    SessionEnded,

    #[error(transparent)]
    Failed(#[from] Failure),
}

/// Why a session failed.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Failure {
    /// The next strict expectation was called with the wrong arguments.
    #[error("{expectation}: argument {position} did not match: expected {expected}, actual {actual:?}")]
    Mismatch {
        /// 1-based
        position: usize,
        expected: ArgSpec,
        actual: Value,
        expectation: Expectation,
        invocation: Invocation,
        /// The failing case of a predicate specification, if available.
        explanation: Option<String>,
    },

    /// Neither the next strict expectation nor any stub matched a call.
    #[error("Unexpected call {invocation}{}",
            .expected.as_ref().map(|e| format!(", expected {}", e))
            .unwrap_or_default())]
    Unexpected {
        invocation: Invocation,
        expected: Option<Expectation>,
    },

    /// Strict expectations were left unconsumed at verification.
    #[error("Missing invocations: [{}]",
            .0.iter().map(ToString::to_string).collect::<Vec<_>>()
            .join(", "))]
    MissingInvocations(Vec<Expectation>),

    /// Interception could not be installed.
    #[error("Aborted: {0}")]
    Configuration(Box<Error>),
}
