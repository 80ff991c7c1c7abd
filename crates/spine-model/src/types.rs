use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonically increasing per-device message counter value.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MsgCounter(pub u64);

impl fmt::Display for MsgCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MsgCounter {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Role a feature exposes on its entity.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Server,
    Special,
}

/// Feature types known to this engine. The catalogue is a representative
/// subset of the full specification.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FeatureType {
    NodeManagement,
    DeviceClassification,
    DeviceDiagnosis,
    ElectricalConnection,
    LoadControl,
    Measurement,
    Generic,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntityType {
    DeviceInformation,
    CEM,
    EV,
    EVSE,
    Generic,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceType {
    ChargingStation,
    EnergyManagementSystem,
    Generic,
}

/// Network management feature set advertised by a device.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NetworkFeatureSet {
    Simple,
    Smart,
    Router,
}

/// Identifiers of the data functions features can host.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Function {
    DeviceClassificationManufacturerData,
    DeviceDiagnosisHeartbeatData,
    LoadControlLimitListData,
    MeasurementListData,
    NodeManagementDetailedDiscoveryData,
    NodeManagementSubscriptionRequestCall,
    NodeManagementSubscriptionDeleteCall,
    NodeManagementBindingRequestCall,
    NodeManagementBindingDeleteCall,
    ResultData,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
