//! Boundary traits and the message/event types handed across them.

use std::sync::Arc;

use spine_model::{Cmd, DeviceAddress, FeatureAddress, Header, MsgCounter, ResultData};

use crate::device_remote::DeviceRemote;
use crate::feature_remote::FeatureRemote;

/// Injected transport boundary. The engine hands every encoded datagram to
/// this writer and never performs transport I/O itself.
pub trait DatagramWriter: Send + Sync {
    fn write_spine_message(&self, payload: &[u8]) -> std::io::Result<()>;
}

/// Persistent subscriber for error results arriving at a local feature.
/// Invoked on an independently spawned task so dispatch never stalls on
/// user code.
pub trait ResultHandler: Send + Sync {
    fn handle_result(&self, result: ResultMessage);
}

/// One inbound command, routed by the local device to the addressed local
/// feature.
#[derive(Clone)]
pub struct Message {
    pub request_header: Header,
    pub cmd: Cmd,
    pub feature_remote: Option<Arc<FeatureRemote>>,
    pub device_remote: Arc<DeviceRemote>,
}

/// Result delivered to [`ResultHandler`]s and one-shot result callbacks.
#[derive(Clone, Debug)]
pub struct ResultMessage {
    pub msg_counter_reference: MsgCounter,
    pub result: ResultData,
    pub local_feature: FeatureAddress,
    pub remote_feature: Option<FeatureAddress>,
    pub ski: String,
}

/// Address of the well-known node-management feature: entity `[0]`,
/// feature 0.
pub fn node_management_address(device: Option<&DeviceAddress>) -> FeatureAddress {
    FeatureAddress {
        device: device.cloned(),
        entity: vec![0],
        feature: Some(0),
    }
}
