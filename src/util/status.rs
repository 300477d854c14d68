use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Ok,
    NotFound,
    Corruption,
    NotSupported,
    InvalidArgument,
    IOError,
    ShutdownInProgress,
    TimedOut,
    Aborted,
    Busy,
}

/// Outcome of a store or remote-client operation.
///
/// `NotFound` is only ever produced by the remote contracts
/// (`Transaction::get`, `Snapshot::get`); the store layer turns it into an
/// absent value before it reaches callers.
#[derive(Debug, Clone)]
pub struct Status {
    code: Code,
    message: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Status {
            code: Code::Ok,
            message: None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Status {
            code: Code::NotFound,
            message: Some(msg.into()),
        }
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Status {
            code: Code::Corruption,
            message: Some(msg.into()),
        }
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Status {
            code: Code::NotSupported,
            message: Some(msg.into()),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Status {
            code: Code::InvalidArgument,
            message: Some(msg.into()),
        }
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Status {
            code: Code::IOError,
            message: Some(msg.into()),
        }
    }

    pub fn shutdown_in_progress(msg: impl Into<String>) -> Self {
        Status {
            code: Code::ShutdownInProgress,
            message: Some(msg.into()),
        }
    }

    pub fn timed_out(msg: impl Into<String>) -> Self {
        Status {
            code: Code::TimedOut,
            message: Some(msg.into()),
        }
    }

    pub fn aborted(msg: impl Into<String>) -> Self {
        Status {
            code: Code::Aborted,
            message: Some(msg.into()),
        }
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Status {
            code: Code::Busy,
            message: Some(msg.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }

    pub fn is_not_found(&self) -> bool {
        self.code == Code::NotFound
    }

    pub fn is_timed_out(&self) -> bool {
        self.code == Code::TimedOut
    }

    pub fn is_busy(&self) -> bool {
        self.code == Code::Busy
    }

    pub fn code(&self) -> &Code {
        &self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{:?}: {}", self.code, msg),
            None => write!(f, "{:?}", self.code),
        }
    }
}

impl std::error::Error for Status {}

impl From<std::io::Error> for Status {
    fn from(err: std::io::Error) -> Self {
        Status::io_error(err.to_string())
    }
}

impl From<serde_json::Error> for Status {
    fn from(err: serde_json::Error) -> Self {
        Status::invalid_argument(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Status>;
