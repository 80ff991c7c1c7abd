mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{datagram, local_device, CapturingWriter};
use spine::{ResultHandler, ResultMessage, SpineError};
use spine_model::payloads::DeviceClassificationManufacturerData;
use spine_model::{
    Cmd, CmdClassifier, CmdPayload, DeviceAddress, EntityType, ErrorNumber, FeatureType, Function,
    ResultData, Role,
};

const REMOTE_SKI: &str = "test-remote-ski";

fn manufacturer_data(name: &str) -> CmdPayload {
    CmdPayload::DeviceClassificationManufacturerData(DeviceClassificationManufacturerData {
        device_name: Some(name.into()),
        brand_name: Some("brand name".into()),
        ..Default::default()
    })
}

struct RecordingHandler {
    seen: Arc<Mutex<Vec<ResultMessage>>>,
}

impl ResultHandler for RecordingHandler {
    fn handle_result(&self, result: ResultMessage) {
        self.seen.lock().expect("handler state").push(result);
    }
}

#[tokio::test]
async fn request_is_correlated_with_its_reply() {
    let device = local_device("localdevice", Duration::from_secs(4));
    let entity = device.add_entity(EntityType::CEM, vec![1]);
    let client = entity.add_feature(FeatureType::DeviceClassification, Role::Client);

    let writer = CapturingWriter::new();
    let remote = device.setup_remote_device(REMOTE_SKI, writer.clone());
    remote.set_address(DeviceAddress::from("remote"));
    let remote_entity = remote.add_entity(EntityType::EVSE, vec![1]);
    let remote_feature = remote_entity.add_feature(FeatureType::DeviceClassification, Role::Server);

    let mut events = device.subscribe_events();

    let msg_counter = client
        .request_data(Function::DeviceClassificationManufacturerData, &remote_feature)
        .expect("request");

    // The read went out towards the remote server feature.
    let sent = writer.datagrams();
    assert_eq!(sent[0].header.cmd_classifier, CmdClassifier::Read);
    assert_eq!(sent[0].header.msg_counter, msg_counter);
    assert_eq!(sent[0].header.address_destination, *remote_feature.address());

    // The reply arrives referencing the request counter.
    let reply = datagram(
        remote_feature.address().clone(),
        client.address().clone(),
        CmdClassifier::Reply,
        100,
        Some(msg_counter),
        false,
        vec![Cmd::new(manufacturer_data("device name"))],
    );
    device.process_cmd(reply, &remote).expect("reply dispatch");

    // The merge landed in the remote mirror.
    assert_eq!(
        remote_feature.data_copy(Function::DeviceClassificationManufacturerData),
        Some(manufacturer_data("device name"))
    );

    let fetched = client
        .fetch_request_data(msg_counter, &remote_feature)
        .await
        .expect("fetch request data");
    assert_eq!(fetched, Some(manufacturer_data("device name")));

    // The merge was published on the device's event hub.
    let event = events.try_recv().expect("data change event");
    assert_eq!(event.ski, REMOTE_SKI);
    assert_eq!(event.classifier, Some(CmdClassifier::Reply));
    assert_eq!(event.feature, *remote_feature.address());
    assert_eq!(event.data, Some(manufacturer_data("device name")));
}

#[tokio::test]
async fn notify_and_write_send_the_current_cell_data() {
    let device = local_device("localdevice", Duration::from_secs(4));
    let entity = device.add_entity(EntityType::CEM, vec![1]);
    let client = entity.add_feature(FeatureType::DeviceClassification, Role::Client);
    client.set_data(
        Function::DeviceClassificationManufacturerData,
        manufacturer_data("local copy"),
    );

    let writer = CapturingWriter::new();
    let remote = device.setup_remote_device(REMOTE_SKI, writer.clone());
    remote.set_address(DeviceAddress::from("remote"));
    let remote_feature = remote
        .add_entity(EntityType::EVSE, vec![1])
        .add_feature(FeatureType::DeviceClassification, Role::Server);

    let write_counter = client
        .write_data(Function::DeviceClassificationManufacturerData, &remote_feature)
        .expect("write");
    let notify_counter = client
        .notify_data(Function::DeviceClassificationManufacturerData, &remote_feature)
        .expect("notify");

    let sent = writer.datagrams();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].header.cmd_classifier, CmdClassifier::Write);
    assert_eq!(sent[0].header.ack_request, Some(true));
    assert_eq!(sent[0].header.msg_counter, write_counter);
    assert_eq!(sent[0].payload.cmd[0].payload, Some(manufacturer_data("local copy")));
    assert_eq!(sent[1].header.cmd_classifier, CmdClassifier::Notify);

    // Only the notify datagram is kept for later result correlation.
    assert!(remote.sender().datagram_for_msg_counter(notify_counter).is_some());
    assert!(remote.sender().datagram_for_msg_counter(write_counter).is_none());
}

#[tokio::test]
async fn error_result_resolves_the_request_and_reaches_handlers() {
    let device = local_device("localdevice", Duration::from_secs(4));
    let entity = device.add_entity(EntityType::CEM, vec![1]);
    let client = entity.add_feature(FeatureType::DeviceClassification, Role::Client);

    let writer = CapturingWriter::new();
    let remote = device.setup_remote_device(REMOTE_SKI, writer);
    remote.set_address(DeviceAddress::from("remote"));
    let remote_entity = remote.add_entity(EntityType::EVSE, vec![1]);
    let remote_feature = remote_entity.add_feature(FeatureType::DeviceClassification, Role::Server);

    let seen = Arc::new(Mutex::new(Vec::new()));
    client.add_result_handler(Arc::new(RecordingHandler { seen: Arc::clone(&seen) }));

    let callback_seen: Arc<Mutex<Option<ResultMessage>>> = Arc::new(Mutex::new(None));

    let msg_counter = client
        .request_data(Function::DeviceClassificationManufacturerData, &remote_feature)
        .expect("request");
    let callback_slot = Arc::clone(&callback_seen);
    client.add_result_callback(msg_counter, move |result| {
        *callback_slot.lock().expect("callback state") = Some(result);
    });

    let result = datagram(
        remote_feature.address().clone(),
        client.address().clone(),
        CmdClassifier::Result,
        101,
        Some(msg_counter),
        false,
        vec![Cmd::new(CmdPayload::ResultData(ResultData::error(
            ErrorNumber::GeneralError,
            "error occurred",
        )))],
    );
    device.process_cmd(result, &remote).expect("result dispatch");

    let fetched = client.fetch_request_data(msg_counter, &remote_feature).await;
    assert_eq!(
        fetched,
        Err(SpineError::Result {
            number: ErrorNumber::GeneralError,
            description: Some("error occurred".into())
        })
    );
    assert_eq!(remote_feature.data_copy(Function::DeviceClassificationManufacturerData), None);

    // Handler and one-shot callback run on spawned tasks.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let handled = seen.lock().expect("handler state");
    assert_eq!(handled.len(), 1);
    assert_eq!(handled[0].msg_counter_reference, msg_counter);
    assert_eq!(handled[0].result.error_number, ErrorNumber::GeneralError);
    let callback_result = callback_seen.lock().expect("callback state");
    assert_eq!(
        callback_result.as_ref().map(|r| r.msg_counter_reference),
        Some(msg_counter)
    );
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let device = local_device("localdevice", Duration::from_secs(4));
    let entity = device.add_entity(EntityType::CEM, vec![1]);
    let client = entity.add_feature(FeatureType::Measurement, Role::Client);

    let writer = CapturingWriter::new();
    let remote = device.setup_remote_device(REMOTE_SKI, writer);
    remote.set_address(DeviceAddress::from("remote"));
    remote.set_max_response_delay(Duration::from_millis(30));
    let remote_entity = remote.add_entity(EntityType::EVSE, vec![1]);
    let remote_feature = remote_entity.add_feature(FeatureType::Measurement, Role::Server);

    let msg_counter =
        client.request_data(Function::MeasurementListData, &remote_feature).expect("request");

    // No reply ever arrives; the per-request expiry resolves the wait.
    let outcome = client.fetch_request_data(msg_counter, &remote_feature).await;
    assert_eq!(outcome, Err(SpineError::Timeout { counter: msg_counter }));
}
