//! definition of the general error type of process image and dictionary operations

use std::{borrow::Cow, sync::Arc};
use core::fmt;
use crate::{data::PackingError, sdo::SdoAbortCode};

/**
    general object reporting an unexpected result regarding the master link

    Its kind is meant to help finding the cause responsible for the problem and how to deal with it. Misaligned or out of range PDO transfers are not reported with this type: they return zero bits transferred, because they happen routinely in the cyclic path.
*/
#[derive(Clone, Debug, thiserror::Error)]
#[error("{kind}: {message}{}", .code.map(|code| format!(" (code 0x{:x})", code)).unwrap_or_default())]
pub struct MasterError {
    kind: ErrorKind,
    message: Cow<'static, str>,
    code: Option<i64>,
    io: Option<Arc<std::io::Error>>,
}

/// classification of [MasterError]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// caller-supplied size, offset or bit width out of range
    ///
    /// these errors are raised at the call site and can be fixed by the caller
    InvalidArgument,
    /// an internal invariant about an object state is violated
    InstanceError,
    /// an optional capability was invoked without any driver-side implementation
    NotImplemented,
    /// error caused by the environment or the communication, it can be reported or the operation retried
    Runtime,
    /// unrecoverable error, the owning session should be terminated
    Critical,
    /// error reported by the transport with a specific status code, such as an SDO abort code
    Protocol,
}

/// convenient alias to simplify return annotations
pub type MasterResult<T=()> = core::result::Result<T, MasterError>;

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidArgument => "invalid argument",
            Self::InstanceError => "instance error",
            Self::NotImplemented => "not implemented",
            Self::Runtime => "runtime error",
            Self::Critical => "critical error",
            Self::Protocol => "protocol error",
        })
    }
}

impl MasterError {
    fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>, code: Option<i64>) -> Self {
        let error = Self {kind, message: message.into(), code, io: None};
        match kind {
            ErrorKind::Runtime | ErrorKind::Critical | ErrorKind::Protocol
                => log::error!("{}", error),
            _ => {},
        }
        error
    }

    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self  {Self::new(ErrorKind::InvalidArgument, message, None)}
    pub fn instance(message: impl Into<Cow<'static, str>>) -> Self  {Self::new(ErrorKind::InstanceError, message, None)}
    pub fn not_implemented(message: impl Into<Cow<'static, str>>) -> Self  {Self::new(ErrorKind::NotImplemented, message, None)}
    pub fn runtime(message: impl Into<Cow<'static, str>>) -> Self  {Self::new(ErrorKind::Runtime, message, None)}
    pub fn critical(message: impl Into<Cow<'static, str>>) -> Self  {Self::new(ErrorKind::Critical, message, None)}
    /// error with a transport-specific status code attached
    pub fn protocol(message: impl Into<Cow<'static, str>>, code: i64) -> Self  {Self::new(ErrorKind::Protocol, message, Some(code))}
    /// protocol error reporting a CANopen SDO abort
    pub fn abort(code: SdoAbortCode) -> Self {
        Self::protocol(code.description(), i64::from(u32::from(code)))
    }

    pub fn kind(&self) -> ErrorKind  {self.kind}
    pub fn message(&self) -> &str  {&self.message}
    /// numeric code for diagnostics, when the failure carries one
    pub fn code(&self) -> Option<i64>  {self.code}
    /// if true the session owning the failing object should be terminated
    pub fn is_critical(&self) -> bool  {self.kind == ErrorKind::Critical}
    /// the underlying io error, for errors raised by the communication support
    pub fn io(&self) -> Option<&std::io::Error>  {self.io.as_deref()}
}

impl From<std::io::Error> for MasterError {
    fn from(src: std::io::Error) -> Self {
        let mut error = Self::new(ErrorKind::Runtime, src.to_string(), src.raw_os_error().map(i64::from));
        error.io = Some(Arc::new(src));
        error
    }
}

impl From<PackingError> for MasterError {
    fn from(src: PackingError) -> Self {
        match src {
            PackingError::BadSize(_, text) => Self::invalid_argument(text),
            PackingError::InvalidValue(text) => Self::invalid_argument(text),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_codes() {
        let error = MasterError::invalid_argument("invalid size");
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert_eq!(error.code(), None);
        assert_eq!(error.to_string(), "invalid argument: invalid size");

        let error = MasterError::protocol("mailbox refused", 0x12);
        assert_eq!(error.kind(), ErrorKind::Protocol);
        assert_eq!(error.code(), Some(0x12));
        assert_eq!(error.to_string(), "protocol error: mailbox refused (code 0x12)");

        assert!(MasterError::critical("link lost").is_critical());
        assert!(! MasterError::runtime("link lost").is_critical());
    }

    #[test]
    fn abort_codes() {
        let error = MasterError::abort(SdoAbortCode::InvalidIndex);
        assert_eq!(error.kind(), ErrorKind::Protocol);
        assert_eq!(error.code(), Some(0x0602_0000));
        assert!(error.message().contains("does not exist"));
    }

    #[test]
    fn conversions() {
        let error = MasterError::from(PackingError::BadSize(1, "too short"));
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert_eq!(error.message(), "too short");

        let error = MasterError::from(std::io::Error::new(std::io::ErrorKind::TimedOut, "no answer"));
        assert_eq!(error.kind(), ErrorKind::Runtime);
        assert!(error.io().is_some());
    }
}
