use std::{error, fmt, result};

use futures::channel::oneshot::Canceled;

use labcodec::{DecodeError, EncodeError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The service or the method is not registered on the target server.
    Unimplemented(String),
    /// The caller's argument or reply type differs from the registered one.
    TypeMismatch {
        fq_name: String,
        expected: &'static str,
        found: &'static str,
    },
    /// The handler panicked; the message is the panic payload.
    HandlerPanicked(String),
    Encode(EncodeError),
    Decode(DecodeError),
    Recv(Canceled),
    Timeout,
    Stopped,
}

impl Error {
    /// Whether the error is a simulated network failure rather than a
    /// mistake in how the services were wired up.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Error::Timeout | Error::Stopped | Error::Recv(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Encode(ref e) => Some(e),
            Error::Decode(ref e) => Some(e),
            Error::Recv(ref e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;
