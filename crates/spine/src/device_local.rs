use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spine_model::payloads::{DetailedDiscoveryData, DeviceDescription, DeviceInformation};
use spine_model::{
    Cmd, Datagram, DeviceAddress, DeviceType, EntityType, FeatureAddress, FeatureType, Function,
    NetworkFeatureSet, Role,
};
use tokio::sync::broadcast;

use crate::api::{node_management_address, DatagramWriter, Message};
use crate::device_remote::DeviceRemote;
use crate::entity_local::EntityLocal;
use crate::error::SpineError;
use crate::events::{EventHub, EventPayload};
use crate::feature_local::FeatureLocal;
use crate::heartbeat_manager::HeartbeatManager;
use crate::relationships::{BindingManager, SubscriptionManager};
use crate::sender::Sender;

/// Static identification of the local device.
#[derive(Clone, Debug)]
pub struct DeviceConfig {
    pub brand_name: String,
    pub device_model: String,
    pub serial_number: String,
    pub device_code: String,
    pub address: String,
    pub device_type: DeviceType,
    pub feature_set: NetworkFeatureSet,
    pub heartbeat_timeout: Duration,
}

/// The local device: top-level router for inbound datagrams, owner of the
/// local entity/feature tree, the per-peer registry and the relationship and
/// heartbeat managers.
#[derive(Clone)]
pub struct DeviceLocal {
    inner: Arc<DeviceLocalInner>,
}

pub(crate) struct DeviceLocalInner {
    config: DeviceConfig,
    address: DeviceAddress,
    entities: Mutex<Vec<Arc<EntityLocal>>>,
    remote_devices: Mutex<HashMap<String, Arc<DeviceRemote>>>,
    binding_manager: BindingManager,
    subscription_manager: SubscriptionManager,
    heartbeat_manager: HeartbeatManager,
    events: EventHub,
}

impl DeviceLocal {
    pub fn new(config: DeviceConfig) -> Self {
        let address = DeviceAddress::new(config.address.clone());
        let heartbeat_timeout = config.heartbeat_timeout;
        let inner = Arc::new_cyclic(|weak| DeviceLocalInner {
            config,
            address,
            entities: Mutex::new(Vec::new()),
            remote_devices: Mutex::new(HashMap::new()),
            binding_manager: BindingManager::new(weak.clone()),
            subscription_manager: SubscriptionManager::new(weak.clone()),
            heartbeat_manager: HeartbeatManager::new(weak.clone(), heartbeat_timeout),
            events: EventHub::new(),
        });
        let device = Self { inner };

        // Every device carries the root entity with the node-management
        // feature at the well-known address.
        let root = device.add_entity(EntityType::DeviceInformation, vec![0]);
        let node_management = root.add_feature(FeatureType::NodeManagement, Role::Special);
        node_management.add_function_type(Function::NodeManagementDetailedDiscoveryData, true, false);

        device
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.inner.address
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.inner.config
    }

    pub fn binding_manager(&self) -> &BindingManager {
        &self.inner.binding_manager
    }

    pub fn subscription_manager(&self) -> &SubscriptionManager {
        &self.inner.subscription_manager
    }

    pub fn heartbeat_manager(&self) -> &HeartbeatManager {
        &self.inner.heartbeat_manager
    }

    /// Independent receiver for data-change events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventPayload> {
        self.inner.events.subscribe()
    }

    pub fn add_entity(&self, etype: EntityType, entity_path: Vec<u32>) -> Arc<EntityLocal> {
        self.inner.add_entity(etype, entity_path)
    }

    pub fn remove_entity(&self, entity: &Arc<EntityLocal>) {
        self.inner
            .entities
            .lock()
            .expect("entity list poisoned")
            .retain(|existing| !Arc::ptr_eq(existing, entity));
    }

    pub fn entities(&self) -> Vec<Arc<EntityLocal>> {
        self.inner.entities.lock().expect("entity list poisoned").clone()
    }

    pub fn entity(&self, entity_path: &[u32]) -> Option<Arc<EntityLocal>> {
        self.inner.entity(entity_path)
    }

    pub fn feature_by_address(&self, address: &FeatureAddress) -> Option<Arc<FeatureLocal>> {
        self.inner.feature_by_address(address)
    }

    /// Registers a remote peer together with the transport writer used to
    /// reach it.
    pub fn setup_remote_device(
        &self,
        ski: impl Into<String>,
        writer: Arc<dyn DatagramWriter>,
    ) -> Arc<DeviceRemote> {
        let ski = ski.into();
        let remote = DeviceRemote::new(ski.clone(), Sender::new(writer));
        self.inner
            .remote_devices
            .lock()
            .expect("remote device registry poisoned")
            .insert(ski, Arc::clone(&remote));
        remote
    }

    pub fn remote_device_for_ski(&self, ski: &str) -> Option<Arc<DeviceRemote>> {
        self.inner.remote_devices.lock().expect("remote device registry poisoned").get(ski).cloned()
    }

    pub fn remote_device_for_address(&self, address: &DeviceAddress) -> Option<Arc<DeviceRemote>> {
        self.inner.remote_device_for_address(address)
    }

    pub fn remote_devices(&self) -> Vec<Arc<DeviceRemote>> {
        self.inner
            .remote_devices
            .lock()
            .expect("remote device registry poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Tears down a disconnecting peer: its registry entry and every
    /// relationship tied to it.
    pub fn remove_remote_device(&self, ski: &str) {
        let removed =
            self.inner.remote_devices.lock().expect("remote device registry poisoned").remove(ski);
        if let Some(remote) = removed {
            self.inner.binding_manager.remove_bindings_for_device(&remote);
            self.inner.subscription_manager.remove_subscriptions_for_device(&remote);
            self.inner.update_heartbeat_on_subscriptions();
        }
    }

    /// Sends `cmd` as a notification to every client feature subscribed to
    /// the given local server feature.
    pub fn notify_subscribers(&self, server_address: &FeatureAddress, cmd: Cmd) {
        self.inner.notify_subscribers(server_address, cmd);
    }

    /// Detailed-discovery description of this device's entity/feature tree.
    pub fn information(&self) -> DetailedDiscoveryData {
        self.inner.information()
    }

    /// Validates and dispatches one inbound datagram to the addressed local
    /// feature, answering with a result datagram when the sender asked for
    /// acknowledgement.
    pub fn process_cmd(
        &self,
        datagram: Datagram,
        remote_device: &Arc<DeviceRemote>,
    ) -> Result<(), SpineError> {
        let header = datagram.header;
        let mut cmd_sequence = datagram.payload.cmd;
        if cmd_sequence.is_empty() {
            return Err(SpineError::NotSupported("no cmd content in payload".to_string()));
        }
        let cmd = cmd_sequence.swap_remove(0);

        if !header.address_source.has_entity() || !header.address_destination.has_entity() {
            return Err(SpineError::AddressNotFound(
                "source and destination must carry an entity address".to_string(),
            ));
        }

        let destination = header.address_destination.clone();
        let local_feature = self.inner.feature_by_address(&destination).ok_or_else(|| {
            SpineError::AddressNotFound(format!("no local feature at '{destination}'"))
        })?;

        let feature_remote = remote_device.feature_by_address(&header.address_source);
        let ack_requested = header.ack_request == Some(true);
        let message = Message {
            request_header: header,
            cmd,
            feature_remote,
            device_remote: Arc::clone(remote_device),
        };

        let result = if destination.matches(&node_management_address(None)) {
            self.inner.handle_node_management(&message)
        } else {
            local_feature.handle_message(&message)
        };

        if ack_requested {
            let acknowledgement = match &result {
                Ok(()) => remote_device
                    .sender()
                    .result_success(&message.request_header, local_feature.address()),
                Err(err) => remote_device.sender().result_error(
                    &message.request_header,
                    local_feature.address(),
                    err,
                ),
            };
            if let Err(err) = acknowledgement {
                log::warn!("result acknowledgement to '{}' failed: {err}", remote_device.ski());
            }
        }

        result
    }
}

impl DeviceLocalInner {
    pub(crate) fn add_entity(
        self: &Arc<Self>,
        etype: EntityType,
        entity_path: Vec<u32>,
    ) -> Arc<EntityLocal> {
        let address =
            spine_model::EntityAddress { device: Some(self.address.clone()), entity: entity_path };
        let entity = EntityLocal::new(etype, address, Arc::downgrade(self));
        self.entities.lock().expect("entity list poisoned").push(Arc::clone(&entity));
        entity
    }

    pub(crate) fn entity(&self, entity_path: &[u32]) -> Option<Arc<EntityLocal>> {
        self.entities
            .lock()
            .expect("entity list poisoned")
            .iter()
            .find(|entity| entity.address().entity == entity_path)
            .cloned()
    }

    /// Resolves a local feature by entity path and feature id. The device
    /// component is not compared; the datagram already reached this device.
    pub(crate) fn feature_by_address(&self, address: &FeatureAddress) -> Option<Arc<FeatureLocal>> {
        let id = address.feature?;
        self.entity(&address.entity)?.feature_by_id(id)
    }

    pub(crate) fn remote_device_for_address(
        &self,
        address: &DeviceAddress,
    ) -> Option<Arc<DeviceRemote>> {
        self.remote_devices
            .lock()
            .expect("remote device registry poisoned")
            .values()
            .find(|remote| remote.address().as_ref() == Some(address))
            .cloned()
    }

    pub(crate) fn binding_manager(&self) -> &BindingManager {
        &self.binding_manager
    }

    pub(crate) fn subscription_manager(&self) -> &SubscriptionManager {
        &self.subscription_manager
    }

    pub(crate) fn events(&self) -> &EventHub {
        &self.events
    }

    pub(crate) fn notify_subscribers(&self, server_address: &FeatureAddress, cmd: Cmd) {
        for subscription in self.subscription_manager.subscriptions_on_feature(server_address) {
            let Some(client_device) = subscription.client.device.as_ref() else {
                continue;
            };
            let Some(remote) = self.remote_device_for_address(client_device) else {
                log::warn!("subscriber device '{client_device}' is not connected");
                continue;
            };
            if let Err(err) =
                remote.sender().notify(server_address, &subscription.client, cmd.clone())
            {
                log::warn!("notify to '{}' failed: {err}", subscription.client);
            }
        }
    }

    /// The local server feature hosting the heartbeat function with read
    /// enabled, if any.
    pub(crate) fn heartbeat_feature(&self) -> Option<Arc<FeatureLocal>> {
        self.entities
            .lock()
            .expect("entity list poisoned")
            .iter()
            .flat_map(|entity| entity.features())
            .find(|feature| {
                matches!(feature.role(), Role::Server | Role::Special)
                    && feature
                        .operations_for(Function::DeviceDiagnosisHeartbeatData)
                        .is_some_and(|operations| operations.read())
            })
    }

    /// Stops the heartbeat when its last subscriber is gone.
    pub(crate) fn update_heartbeat_on_subscriptions(&self) {
        let Some(feature) = self.heartbeat_feature() else {
            return;
        };
        if self.subscription_manager.subscriptions_on_feature(feature.address()).is_empty() {
            self.heartbeat_manager.stop_heartbeat();
        }
    }

    pub(crate) fn information(&self) -> DetailedDiscoveryData {
        let entities = self.entities.lock().expect("entity list poisoned").clone();
        DetailedDiscoveryData {
            device_information: Some(DeviceInformation {
                description: Some(DeviceDescription {
                    device_address: Some(self.address.clone()),
                    device_type: Some(self.config.device_type),
                    network_feature_set: Some(self.config.feature_set),
                }),
            }),
            entity_information: entities.iter().map(|entity| entity.information()).collect(),
            feature_information: entities
                .iter()
                .flat_map(|entity| entity.features())
                .map(|feature| feature.information())
                .collect(),
        }
    }
}

impl Drop for DeviceLocalInner {
    fn drop(&mut self) {
        self.heartbeat_manager.stop_heartbeat();
    }
}
