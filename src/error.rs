//! `pgcore` error types.
use std::{backtrace::Backtrace, fmt, io};

use crate::{
    data::ArrayError,
    options::OptionsError,
    protocol::{backend::ErrorResponse, ProtocolError},
    sql::SqlError,
};

/// A specialized [`Result`] type for `pgcore` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible errors from the `pgcore` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Attach a short human-readable note ahead of the underlying cause.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub(crate) fn client(err: ClientError) -> Self {
        ErrorKind::Client(err).into()
    }
}

/// All possible error kinds from the `pgcore` library.
#[non_exhaustive]
pub enum ErrorKind {
    Client(ClientError),
    Options(OptionsError),
    Protocol(ProtocolError),
    Io(io::Error),
    Database(ErrorResponse),
    Sql(SqlError),
    Array(ArrayError),
}

/// Client-raised error conditions (SPEC_FULL.md §7).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Generic(String),
    #[error("operation timed out")]
    TimedOut,
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("connection lost")]
    ConnectionLost,
    #[error("connection session expired; statement was prepared on a prior session")]
    ConnectionSessionExpired,
    #[error("server requires TLS but the client did not request it")]
    TlsRequiredByServer,
    #[error("server rejected TLS negotiation")]
    TlsRejectedByServer,
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("connection is not ready to accept a new request")]
    NotReadyForRequest,
    #[error("invalid SQL string: {0}")]
    InvalidSqlString(String),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ClientError>e => ErrorKind::Client(e));
from!(<OptionsError>e => ErrorKind::Options(e));
from!(<ProtocolError>e => ErrorKind::Protocol(e));
from!(<std::io::Error>e => ErrorKind::Io(e));
from!(<ErrorResponse>e => ErrorKind::Database(e));
from!(<SqlError>e => ErrorKind::Sql(e));
from!(<ArrayError>e => ErrorKind::Array(e));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(e) => e.fmt(f),
            Self::Options(e) => e.fmt(f),
            Self::Protocol(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
            Self::Database(e) => e.fmt(f),
            Self::Sql(e) => e.fmt(f),
            Self::Array(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
