use serde::{Deserialize, Serialize};

use crate::duration::XsDuration;

/// Liveness signal payload, single-valued.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDiagnosisHeartbeatData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_counter: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_timeout: Option<XsDuration>,
}
