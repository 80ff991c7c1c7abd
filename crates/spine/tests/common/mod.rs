#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use spine::{DatagramWriter, DeviceConfig, DeviceLocal};
use spine_model::{
    Cmd, CmdClassifier, Datagram, DatagramEnvelope, DeviceType, FeatureAddress, Header, MsgCounter,
    NetworkFeatureSet, Payload, SPECIFICATION_VERSION,
};

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .is_test(true)
            .try_init();
    });
}

/// Writer that captures every outbound datagram for assertions.
#[derive(Default)]
pub struct CapturingWriter {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl CapturingWriter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn datagrams(&self) -> Vec<Datagram> {
        self.sent
            .lock()
            .expect("writer state")
            .iter()
            .map(|payload| {
                serde_json::from_slice::<DatagramEnvelope>(payload).expect("decode").datagram
            })
            .collect()
    }

}

impl DatagramWriter for CapturingWriter {
    fn write_spine_message(&self, payload: &[u8]) -> std::io::Result<()> {
        self.sent.lock().expect("writer state").push(payload.to_vec());
        Ok(())
    }
}

pub fn local_device(address: &str, heartbeat_timeout: Duration) -> DeviceLocal {
    setup();
    DeviceLocal::new(DeviceConfig {
        brand_name: "TestBrandName".to_string(),
        device_model: "TestDeviceModel".to_string(),
        serial_number: "TestSerialNumber".to_string(),
        device_code: "TestDeviceCode".to_string(),
        address: address.to_string(),
        device_type: DeviceType::EnergyManagementSystem,
        feature_set: NetworkFeatureSet::Smart,
        heartbeat_timeout,
    })
}

pub fn datagram(
    source: FeatureAddress,
    destination: FeatureAddress,
    classifier: CmdClassifier,
    msg_counter: u64,
    msg_counter_reference: Option<MsgCounter>,
    ack_request: bool,
    cmd: Vec<Cmd>,
) -> Datagram {
    Datagram {
        header: Header {
            specification_version: Some(SPECIFICATION_VERSION.to_string()),
            address_source: source,
            address_destination: destination,
            msg_counter: MsgCounter(msg_counter),
            msg_counter_reference,
            cmd_classifier: classifier,
            ack_request: ack_request.then_some(true),
        },
        payload: Payload { cmd },
    }
}
