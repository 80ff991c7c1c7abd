use serde::{Deserialize, Serialize};

use crate::filter::{Filter, Selector};
use crate::payloads::ScaledNumber;
use crate::update::{update_list, ListData};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadControlLimitData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_limit_changeable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_limit_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ScaledNumber>,
}

impl ListData for LoadControlLimitData {
    fn key_matches(&self, other: &Self) -> bool {
        self.limit_id.is_some() && self.limit_id == other.limit_id
    }

    fn selected_by(&self, filter: &Filter) -> bool {
        match &filter.selector {
            Some(Selector::LoadControlLimitListDataSelectors(selectors)) => {
                selectors.limit_id.is_none() || selectors.limit_id == self.limit_id
            }
            Some(_) => false,
            None => true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadControlLimitListData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_control_limit_data: Vec<LoadControlLimitData>,
}

impl LoadControlLimitListData {
    pub fn update(&mut self, incoming: &Self, partial: Option<&Filter>, delete: Option<&Filter>) {
        self.load_control_limit_data = update_list(
            std::mem::take(&mut self.load_control_limit_data),
            &incoming.load_control_limit_data,
            partial,
            delete,
        );
    }
}
