use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire error numbers carried by result commands.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(into = "u32", try_from = "u32")]
pub enum ErrorNumber {
    #[default]
    NoError,
    GeneralError,
    Timeout,
    Overload,
    DestinationUnknown,
    DestinationUnreachable,
    CommandNotSupported,
    CommandRejected,
    RestrictedFunctionExchangeCombinationNotSupported,
    BindingIsNecessary,
}

impl From<ErrorNumber> for u32 {
    fn from(value: ErrorNumber) -> Self {
        value as u32
    }
}

impl TryFrom<u32> for ErrorNumber {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let number = match value {
            0 => Self::NoError,
            1 => Self::GeneralError,
            2 => Self::Timeout,
            3 => Self::Overload,
            4 => Self::DestinationUnknown,
            5 => Self::DestinationUnreachable,
            6 => Self::CommandNotSupported,
            7 => Self::CommandRejected,
            8 => Self::RestrictedFunctionExchangeCombinationNotSupported,
            9 => Self::BindingIsNecessary,
            other => return Err(format!("unknown error number {other}")),
        };
        Ok(number)
    }
}

impl fmt::Display for ErrorNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u32)
    }
}

/// Payload of a result command acknowledging an earlier datagram.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultData {
    pub error_number: ErrorNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResultData {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn error(number: ErrorNumber, description: impl Into<String>) -> Self {
        Self { error_number: number, description: Some(description.into()) }
    }

    pub fn is_error(&self) -> bool {
        self.error_number != ErrorNumber::NoError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_numbers_round_trip_as_integers() {
        let json = serde_json::to_string(&ErrorNumber::CommandRejected).expect("serialize");
        assert_eq!(json, "7");
        let back: ErrorNumber = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, ErrorNumber::CommandRejected);
    }

    #[test]
    fn unknown_error_number_is_rejected() {
        assert!(serde_json::from_str::<ErrorNumber>("42").is_err());
    }
}
