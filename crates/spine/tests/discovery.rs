mod common;

use std::time::Duration;

use common::{datagram, local_device, CapturingWriter};
use spine::{node_management_address, SpineError};
use spine_model::{
    Cmd, CmdClassifier, CmdPayload, DeviceAddress, EntityType, FeatureAddress, FeatureType,
    Function, Role,
};

const REMOTE_SKI: &str = "test-remote-ski";

#[tokio::test]
async fn node_management_read_replies_with_the_device_tree() {
    let device = local_device("localdevice", Duration::from_secs(4));
    let entity = device.add_entity(EntityType::CEM, vec![1]);
    let server = entity.add_feature(FeatureType::Measurement, Role::Server);
    server.add_function_type(Function::MeasurementListData, true, false);
    server.set_description("measurement server");

    let writer = CapturingWriter::new();
    let remote = device.setup_remote_device(REMOTE_SKI, writer.clone());
    remote.set_address(DeviceAddress::from("remote"));

    let read = datagram(
        node_management_address(Some(&DeviceAddress::from("remote"))),
        node_management_address(Some(device.address())),
        CmdClassifier::Read,
        50,
        None,
        false,
        vec![Cmd::new(CmdPayload::empty(Function::NodeManagementDetailedDiscoveryData))],
    );
    device.process_cmd(read, &remote).expect("discovery read");

    let sent = writer.datagrams();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].header.cmd_classifier, CmdClassifier::Reply);
    let Some(CmdPayload::NodeManagementDetailedDiscoveryData(discovery)) =
        &sent[0].payload.cmd[0].payload
    else {
        panic!("expected discovery data");
    };

    // Root entity plus the added one; node management plus the server.
    assert_eq!(discovery.entity_information.len(), 2);
    assert_eq!(discovery.feature_information.len(), 2);
    let described = discovery
        .feature_information
        .iter()
        .filter_map(|info| info.description.as_ref())
        .find(|description| description.feature_address.as_ref() == Some(server.address()))
        .expect("server feature description");
    assert_eq!(described.feature_type, Some(FeatureType::Measurement));
    assert_eq!(described.role, Some(Role::Server));
    assert_eq!(described.description.as_deref(), Some("measurement server"));
    assert_eq!(described.supported_function.len(), 1);
    assert_eq!(described.supported_function[0].function, Function::MeasurementListData);
}

#[tokio::test]
async fn discovery_reply_builds_the_remote_mirror() {
    let peer = local_device("remotedevice", Duration::from_secs(4));
    let peer_entity = peer.add_entity(EntityType::EVSE, vec![1]);
    let peer_server = peer_entity.add_feature(FeatureType::ElectricalConnection, Role::Server);
    let discovery = peer.information();

    let device = local_device("localdevice", Duration::from_secs(4));
    let writer = CapturingWriter::new();
    let remote = device.setup_remote_device(REMOTE_SKI, writer);

    let reply = datagram(
        node_management_address(Some(&DeviceAddress::from("remotedevice"))),
        node_management_address(Some(device.address())),
        CmdClassifier::Reply,
        60,
        None,
        false,
        vec![Cmd::new(CmdPayload::NodeManagementDetailedDiscoveryData(discovery))],
    );
    device.process_cmd(reply, &remote).expect("discovery ingestion");

    assert_eq!(remote.address(), Some(DeviceAddress::from("remotedevice")));
    assert_eq!(remote.entities().len(), 2);
    let mirrored = remote
        .feature_by_address(&FeatureAddress::new("remotedevice", vec![1], 1))
        .expect("mirrored feature");
    assert_eq!(mirrored.feature_type(), FeatureType::ElectricalConnection);
    assert_eq!(mirrored.role(), Role::Server);
    assert_eq!(mirrored.address(), peer_server.address());
}

#[tokio::test]
async fn client_subscribe_and_bind_validate_before_sending() {
    let device = local_device("localdevice", Duration::from_secs(4));
    let entity = device.add_entity(EntityType::CEM, vec![1]);
    let client = entity.add_feature(FeatureType::DeviceDiagnosis, Role::Client);
    let server = entity.add_feature(FeatureType::DeviceDiagnosis, Role::Server);

    let target = FeatureAddress::new("remote", vec![1], 1);

    // The destination device is not a known peer yet.
    assert!(matches!(client.subscribe(&target), Err(SpineError::AddressNotFound(_))));
    assert!(matches!(client.bind(&target), Err(SpineError::AddressNotFound(_))));

    let writer = CapturingWriter::new();
    let remote = device.setup_remote_device(REMOTE_SKI, writer.clone());
    remote.set_address(DeviceAddress::from("remote"));

    // Server features cannot request relationships.
    assert!(matches!(server.subscribe(&target), Err(SpineError::CommandRejected(_))));
    assert!(matches!(server.bind(&target), Err(SpineError::CommandRejected(_))));

    let subscribe_counter = client.subscribe(&target).expect("subscribe");
    let bind_counter = client.bind(&target).expect("bind");
    assert_ne!(subscribe_counter, bind_counter);
    assert_eq!(client.subscriptions(), vec![target.clone()]);
    assert_eq!(client.bindings(), vec![target.clone()]);

    // Both went to the peer's node-management feature as acknowledged calls.
    let sent = writer.datagrams();
    assert_eq!(sent.len(), 2);
    for sent_datagram in &sent {
        assert_eq!(sent_datagram.header.cmd_classifier, CmdClassifier::Call);
        assert_eq!(sent_datagram.header.ack_request, Some(true));
        assert_eq!(
            sent_datagram.header.address_destination,
            node_management_address(Some(&DeviceAddress::from("remote")))
        );
    }

    client.remove_subscription(&target);
    client.remove_all_bindings();
    assert!(client.subscriptions().is_empty());
    assert!(client.bindings().is_empty());
}
