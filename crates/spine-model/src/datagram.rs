use serde::{Deserialize, Serialize};

use crate::address::FeatureAddress;
use crate::command::Cmd;
use crate::types::MsgCounter;

/// Protocol revision stamped into every outbound header.
pub const SPECIFICATION_VERSION: &str = "1.3.0";

/// The command's intent.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CmdClassifier {
    Read,
    Reply,
    Notify,
    Write,
    Call,
    Result,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specification_version: Option<String>,
    pub address_source: FeatureAddress,
    pub address_destination: FeatureAddress,
    pub msg_counter: MsgCounter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_counter_reference: Option<MsgCounter>,
    pub cmd_classifier: CmdClassifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack_request: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Payload {
    #[serde(default)]
    pub cmd: Vec<Cmd>,
}

/// One transmitted protocol message: header plus command payload sequence.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Datagram {
    pub header: Header,
    pub payload: Payload,
}

/// Top-level wire envelope around a datagram.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DatagramEnvelope {
    pub datagram: Datagram,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CmdPayload;
    use crate::payloads::DeviceDiagnosisHeartbeatData;

    #[test]
    fn envelope_round_trips() {
        let datagram = Datagram {
            header: Header {
                specification_version: Some(SPECIFICATION_VERSION.to_string()),
                address_source: FeatureAddress::new("a", vec![1], 2),
                address_destination: FeatureAddress::new("b", vec![0], 0),
                msg_counter: MsgCounter(7),
                msg_counter_reference: None,
                cmd_classifier: CmdClassifier::Notify,
                ack_request: None,
            },
            payload: Payload {
                cmd: vec![Cmd::new(CmdPayload::DeviceDiagnosisHeartbeatData(
                    DeviceDiagnosisHeartbeatData {
                        heartbeat_counter: Some(3),
                        ..Default::default()
                    },
                ))],
            },
        };

        let bytes =
            serde_json::to_vec(&DatagramEnvelope { datagram: datagram.clone() }).expect("encode");
        let decoded: DatagramEnvelope = serde_json::from_slice(&bytes).expect("decode");
        assert_eq!(decoded.datagram, datagram);
    }
}
