use serde::{Deserialize, Serialize};

/// Empty marker element, present-or-absent on the wire.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementTag {}

/// Number scaled by a decimal exponent: value = number * 10^scale.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScaledNumber {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<i8>,
}

impl ScaledNumber {
    pub fn new(number: i64, scale: i8) -> Self {
        Self { number: Some(number), scale: Some(scale) }
    }
}

/// Operations a server feature advertises for one function.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PossibleOperations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<ElementTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<ElementTag>,
}

impl PossibleOperations {
    pub fn new(read: bool, write: bool) -> Self {
        Self {
            read: read.then_some(ElementTag {}),
            write: write.then_some(ElementTag {}),
        }
    }
}
