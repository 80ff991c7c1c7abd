//! Function payload types consumed by the engine through the generic
//! apply-update contract. A representative subset of the full catalogue.

mod common;
mod device_classification;
mod device_diagnosis;
mod load_control;
mod measurement;
mod network_management;
mod node_management;

pub use common::{ElementTag, PossibleOperations, ScaledNumber};
pub use device_classification::DeviceClassificationManufacturerData;
pub use device_diagnosis::DeviceDiagnosisHeartbeatData;
pub use load_control::{LoadControlLimitData, LoadControlLimitListData};
pub use measurement::{MeasurementData, MeasurementListData};
pub use network_management::{
    DeviceDescription, EntityDescription, FeatureDescription, FunctionProperty,
};
pub use node_management::{
    BindingDelete, BindingDeleteCall, BindingRequest, BindingRequestCall, DetailedDiscoveryData,
    DeviceInformation, EntityInformation, FeatureInformation, SubscriptionDelete,
    SubscriptionDeleteCall, SubscriptionRequest, SubscriptionRequestCall,
};
