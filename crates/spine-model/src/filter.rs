use serde::{Deserialize, Serialize};

use crate::payloads::ElementTag;

/// Marks a command as a partial update or a deletion.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CmdControl {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<ElementTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<ElementTag>,
}

/// Per-function entry selector carried by a filter. A selector with all key
/// fields unset selects every entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Selector {
    LoadControlLimitListDataSelectors(LoadControlLimitSelectors),
    MeasurementListDataSelectors(MeasurementSelectors),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadControlLimitSelectors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_id: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSelectors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<u32>,
}

/// Filter attached to a command, controlling partial/delete merge behavior.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd_control: Option<CmdControl>,
    #[serde(flatten)]
    pub selector: Option<Selector>,
}

impl Filter {
    pub fn partial() -> Self {
        Self {
            cmd_control: Some(CmdControl { partial: Some(ElementTag {}), delete: None }),
            selector: None,
        }
    }

    pub fn delete() -> Self {
        Self {
            cmd_control: Some(CmdControl { partial: None, delete: Some(ElementTag {}) }),
            selector: None,
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn is_partial(&self) -> bool {
        self.cmd_control.as_ref().is_some_and(|c| c.partial.is_some())
    }

    pub fn is_delete(&self) -> bool {
        self.cmd_control.as_ref().is_some_and(|c| c.delete.is_some())
    }
}
