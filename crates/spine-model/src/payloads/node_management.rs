use serde::{Deserialize, Serialize};

use crate::address::FeatureAddress;
use crate::payloads::network_management::{
    DeviceDescription, EntityDescription, FeatureDescription,
};
use crate::types::FeatureType;

/// Relationship call payload: client address, server address, optional
/// server feature type filter.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub client_address: FeatureAddress,
    pub server_address: FeatureAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_feature_type: Option<FeatureType>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequestCall {
    pub subscription_request: SubscriptionRequest,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDelete {
    pub client_address: FeatureAddress,
    pub server_address: FeatureAddress,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDeleteCall {
    pub subscription_delete: SubscriptionDelete,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BindingRequest {
    pub client_address: FeatureAddress,
    pub server_address: FeatureAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_feature_type: Option<FeatureType>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BindingRequestCall {
    pub binding_request: BindingRequest,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BindingDelete {
    pub client_address: FeatureAddress,
    pub server_address: FeatureAddress,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BindingDeleteCall {
    pub binding_delete: BindingDelete,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<DeviceDescription>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityInformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<EntityDescription>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureInformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<FeatureDescription>,
}

/// Self-description of a device's entity/feature tree, exchanged during
/// detailed discovery.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DetailedDiscoveryData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_information: Option<DeviceInformation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_information: Vec<EntityInformation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_information: Vec<FeatureInformation>,
}
