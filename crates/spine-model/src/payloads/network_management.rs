use serde::{Deserialize, Serialize};

use crate::address::{DeviceAddress, EntityAddress, FeatureAddress};
use crate::payloads::PossibleOperations;
use crate::types::{DeviceType, EntityType, FeatureType, Function, NetworkFeatureSet, Role};

/// One function a feature supports, with its advertised operations.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionProperty {
    pub function: Function,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possible_operations: Option<PossibleOperations>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_address: Option<DeviceAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_feature_set: Option<NetworkFeatureSet>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_address: Option<EntityAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_address: Option<FeatureAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_type: Option<FeatureType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_function: Vec<FunctionProperty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
