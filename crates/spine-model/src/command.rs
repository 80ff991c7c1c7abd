use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::payloads::{
    BindingDeleteCall, BindingRequestCall, DetailedDiscoveryData,
    DeviceClassificationManufacturerData, DeviceDiagnosisHeartbeatData, LoadControlLimitListData,
    MeasurementListData, SubscriptionDeleteCall, SubscriptionRequestCall,
};
use crate::result_data::ResultData;
use crate::types::Function;

/// Tagged union over the supported function payloads. On the wire this is
/// the single function-keyed member of a command object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum CmdPayload {
    DeviceClassificationManufacturerData(DeviceClassificationManufacturerData),
    DeviceDiagnosisHeartbeatData(DeviceDiagnosisHeartbeatData),
    LoadControlLimitListData(LoadControlLimitListData),
    MeasurementListData(MeasurementListData),
    NodeManagementDetailedDiscoveryData(DetailedDiscoveryData),
    NodeManagementSubscriptionRequestCall(SubscriptionRequestCall),
    NodeManagementSubscriptionDeleteCall(SubscriptionDeleteCall),
    NodeManagementBindingRequestCall(BindingRequestCall),
    NodeManagementBindingDeleteCall(BindingDeleteCall),
    ResultData(ResultData),
}

impl CmdPayload {
    pub fn function(&self) -> Function {
        match self {
            Self::DeviceClassificationManufacturerData(_) => {
                Function::DeviceClassificationManufacturerData
            }
            Self::DeviceDiagnosisHeartbeatData(_) => Function::DeviceDiagnosisHeartbeatData,
            Self::LoadControlLimitListData(_) => Function::LoadControlLimitListData,
            Self::MeasurementListData(_) => Function::MeasurementListData,
            Self::NodeManagementDetailedDiscoveryData(_) => {
                Function::NodeManagementDetailedDiscoveryData
            }
            Self::NodeManagementSubscriptionRequestCall(_) => {
                Function::NodeManagementSubscriptionRequestCall
            }
            Self::NodeManagementSubscriptionDeleteCall(_) => {
                Function::NodeManagementSubscriptionDeleteCall
            }
            Self::NodeManagementBindingRequestCall(_) => {
                Function::NodeManagementBindingRequestCall
            }
            Self::NodeManagementBindingDeleteCall(_) => Function::NodeManagementBindingDeleteCall,
            Self::ResultData(_) => Function::ResultData,
        }
    }

    /// Empty payload of the given function, as sent in a read request or
    /// used as the merge base of a previously empty cell.
    pub fn empty(function: Function) -> Self {
        match function {
            Function::DeviceClassificationManufacturerData => {
                Self::DeviceClassificationManufacturerData(Default::default())
            }
            Function::DeviceDiagnosisHeartbeatData => {
                Self::DeviceDiagnosisHeartbeatData(Default::default())
            }
            Function::LoadControlLimitListData => Self::LoadControlLimitListData(Default::default()),
            Function::MeasurementListData => Self::MeasurementListData(Default::default()),
            Function::NodeManagementDetailedDiscoveryData => {
                Self::NodeManagementDetailedDiscoveryData(Default::default())
            }
            Function::NodeManagementSubscriptionRequestCall => {
                Self::NodeManagementSubscriptionRequestCall(Default::default())
            }
            Function::NodeManagementSubscriptionDeleteCall => {
                Self::NodeManagementSubscriptionDeleteCall(Default::default())
            }
            Function::NodeManagementBindingRequestCall => {
                Self::NodeManagementBindingRequestCall(Default::default())
            }
            Function::NodeManagementBindingDeleteCall => {
                Self::NodeManagementBindingDeleteCall(Default::default())
            }
            Function::ResultData => Self::ResultData(Default::default()),
        }
    }

    /// Applies `incoming` onto `self` under the apply-update contract.
    /// List-valued payloads honor partial/delete filters; single-valued
    /// payloads always replace wholesale.
    pub fn update(&mut self, incoming: &Self, partial: Option<&Filter>, delete: Option<&Filter>) {
        match (self, incoming) {
            (Self::LoadControlLimitListData(old), Self::LoadControlLimitListData(new)) => {
                old.update(new, partial, delete);
            }
            (Self::MeasurementListData(old), Self::MeasurementListData(new)) => {
                old.update(new, partial, delete);
            }
            (old, new) => *old = new.clone(),
        }
    }
}

/// One command of a datagram payload: an optional filter sequence plus the
/// function payload.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cmd {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Filter>,
    #[serde(flatten)]
    pub payload: Option<CmdPayload>,
}

impl Cmd {
    pub fn new(payload: CmdPayload) -> Self {
        Self { filter: Vec::new(), payload: Some(payload) }
    }

    pub fn with_filters(payload: CmdPayload, filter: Vec<Filter>) -> Self {
        Self { filter, payload: Some(payload) }
    }

    pub fn function(&self) -> Option<Function> {
        self.payload.as_ref().map(CmdPayload::function)
    }

    pub fn result(&self) -> Option<&ResultData> {
        match &self.payload {
            Some(CmdPayload::ResultData(result)) => Some(result),
            _ => None,
        }
    }

    pub fn filter_partial(&self) -> Option<&Filter> {
        self.filter.iter().find(|f| f.is_partial())
    }

    pub fn filter_delete(&self) -> Option<&Filter> {
        self.filter.iter().find(|f| f.is_delete())
    }
}
