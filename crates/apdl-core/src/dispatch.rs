//! Command dispatcher
//!
//! Turns an operation name plus positional string arguments into a call on
//! the state machine, and the result into a [`Response`]. Both the protocol
//! names and the names the deployed chaincode used are accepted.

use std::fmt;
use std::str::FromStr;

use apdl_ledger::LedgerStore;
use apdl_types::{ApdlError, Result};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::machine::{expect_args, AgreementStateMachine, PenalizeArgs, RequestArgs};

/// Protocol operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Initialize,
    Request,
    Penalize,
    Refund,
    GetStatus,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Request => "request",
            Self::Penalize => "penalize",
            Self::Refund => "refund",
            Self::GetStatus => "get_status",
        }
    }

    /// Number of positional arguments
    pub fn arity(&self) -> usize {
        match self {
            Self::Request => RequestArgs::ARITY,
            Self::Penalize => PenalizeArgs::ARITY,
            Self::Initialize | Self::Refund | Self::GetStatus => 0,
        }
    }
}

impl FromStr for Operation {
    type Err = ApdlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "initialize" | "init" => Ok(Self::Initialize),
            "request" | "download_request" => Ok(Self::Request),
            "penalize" | "penalty" => Ok(Self::Penalize),
            "refund" => Ok(Self::Refund),
            "get_status" | "status" => Ok(Self::GetStatus),
            other => Err(ApdlError::UnknownOperation {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An incoming call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub function: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, A>(function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a flat argument list whose first element is the function name
    pub fn from_string_args(mut all: Vec<String>) -> Option<Self> {
        if all.is_empty() {
            return None;
        }
        let function = all.remove(0);
        Some(Self {
            function,
            args: all,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Result of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: ResponseStatus,
    /// Success payload: a message, or the serialized record for `get_status`
    pub payload: Vec<u8>,
    /// Diagnostic on failure, empty on success
    pub message: String,
    pub code: Option<&'static str>,
}

impl Response {
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: ResponseStatus::Ok,
            payload: payload.into(),
            message: String::new(),
            code: None,
        }
    }

    pub fn error(err: &ApdlError) -> Self {
        Self {
            status: ResponseStatus::Error,
            payload: Vec::new(),
            message: err.to_string(),
            code: Some(err.error_code()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Routes invocations to a state machine
pub struct Dispatcher<S: LedgerStore, C: Clock> {
    machine: AgreementStateMachine<S, C>,
}

impl<S: LedgerStore, C: Clock> Dispatcher<S, C> {
    pub fn new(machine: AgreementStateMachine<S, C>) -> Self {
        Self { machine }
    }

    pub fn machine(&self) -> &AgreementStateMachine<S, C> {
        &self.machine
    }

    pub fn invoke(&self, invocation: &Invocation) -> Response {
        debug!(
            function = %invocation.function,
            args = invocation.args.len(),
            "dispatching invocation"
        );
        match self.try_invoke(invocation) {
            Ok(payload) => Response::success(payload),
            Err(e) => {
                warn!(
                    function = %invocation.function,
                    code = e.error_code(),
                    validation = e.is_validation(),
                    error = %e,
                    "invocation failed"
                );
                Response::error(&e)
            }
        }
    }

    fn try_invoke(&self, invocation: &Invocation) -> Result<Vec<u8>> {
        let operation: Operation = invocation.function.parse()?;
        let args = &invocation.args;

        let outcome = match operation {
            Operation::Initialize => {
                expect_args(operation.name(), operation.arity(), args)?;
                self.machine.initialize()?
            }
            Operation::Request => self.machine.request(&RequestArgs::from_args(args)?)?,
            Operation::Penalize => self.machine.penalize(&PenalizeArgs::from_args(args)?)?,
            Operation::Refund => {
                expect_args(operation.name(), operation.arity(), args)?;
                self.machine.refund()?
            }
            Operation::GetStatus => {
                expect_args(operation.name(), operation.arity(), args)?;
                return self.machine.get_status();
            }
        };
        Ok(outcome.message().as_bytes().to_vec())
    }
}
