use spine_model::{ErrorNumber, MsgCounter, ResultData};
use thiserror::Error;

/// Errors surfaced by the protocol engine. None of these is fatal: every
/// failure affects only the message or call being processed.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum SpineError {
    #[error("address not found: {0}")]
    AddressNotFound(String),

    #[error("command rejected: {0}")]
    CommandRejected(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("the request with the message counter '{counter}' timed out")]
    Timeout { counter: MsgCounter },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("the result for the request with message counter '{0}' was already set")]
    AlreadyResolved(MsgCounter),

    #[error("feature type mismatch: {0}")]
    Mismatch(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("remote result {number}: {}", .description.as_deref().unwrap_or("no description"))]
    Result {
        number: ErrorNumber,
        description: Option<String>,
    },
}

impl SpineError {
    /// Wire representation of this error for an acknowledgement datagram.
    pub fn to_result_data(&self) -> ResultData {
        let number = match self {
            Self::AddressNotFound(_) => ErrorNumber::DestinationUnknown,
            Self::CommandRejected(_) => ErrorNumber::CommandRejected,
            Self::NotSupported(_) => ErrorNumber::CommandNotSupported,
            Self::Timeout { .. } => ErrorNumber::Timeout,
            Self::Result { number, .. } => *number,
            _ => ErrorNumber::GeneralError,
        };
        ResultData::error(number, self.to_string())
    }

    /// Error carried by a received result command; `None` for a success
    /// acknowledgement.
    pub fn from_result_data(result: &ResultData) -> Option<Self> {
        if !result.is_error() {
            return None;
        }
        Some(Self::Result {
            number: result.error_number,
            description: result.description.clone(),
        })
    }
}
