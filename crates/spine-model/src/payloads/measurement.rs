use serde::{Deserialize, Serialize};

use crate::filter::{Filter, Selector};
use crate::payloads::ScaledNumber;
use crate::update::{update_list, ListData};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ScaledNumber>,
}

impl ListData for MeasurementData {
    fn key_matches(&self, other: &Self) -> bool {
        self.measurement_id.is_some() && self.measurement_id == other.measurement_id
    }

    fn selected_by(&self, filter: &Filter) -> bool {
        match &filter.selector {
            Some(Selector::MeasurementListDataSelectors(selectors)) => {
                selectors.measurement_id.is_none()
                    || selectors.measurement_id == self.measurement_id
            }
            Some(_) => false,
            None => true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementListData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measurement_data: Vec<MeasurementData>,
}

impl MeasurementListData {
    pub fn update(&mut self, incoming: &Self, partial: Option<&Filter>, delete: Option<&Filter>) {
        self.measurement_data = update_list(
            std::mem::take(&mut self.measurement_data),
            &incoming.measurement_data,
            partial,
            delete,
        );
    }
}
