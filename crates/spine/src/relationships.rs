//! Device-scoped registries of binding and subscription relationships.
//! Both managers share the same contract shape; only the manager instance a
//! relationship lives in distinguishes it.

use std::sync::{Mutex, Weak};

use spine_model::payloads::{BindingDelete, BindingRequest, SubscriptionDelete, SubscriptionRequest};
use spine_model::{FeatureAddress, FeatureType};

use crate::device_local::DeviceLocalInner;
use crate::device_remote::DeviceRemote;
use crate::error::SpineError;

/// One persistent relationship between a remote client feature and a local
/// server feature.
#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub client: FeatureAddress,
    pub server: FeatureAddress,
    pub server_feature_type: Option<FeatureType>,
}

struct StoredRelationship {
    ski: String,
    relationship: Relationship,
}

struct RelationshipStore {
    entries: Mutex<Vec<StoredRelationship>>,
}

impl RelationshipStore {
    fn new() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }

    fn add(&self, ski: &str, relationship: Relationship) -> Result<(), SpineError> {
        let mut entries = self.entries.lock().expect("relationship store poisoned");
        let duplicate = entries.iter().any(|stored| {
            stored.relationship.client == relationship.client
                && stored.relationship.server == relationship.server
        });
        if duplicate {
            return Err(SpineError::AlreadyExists(format!(
                "relationship {} -> {} is already registered",
                relationship.client, relationship.server
            )));
        }
        entries.push(StoredRelationship { ski: ski.to_string(), relationship });
        Ok(())
    }

    fn remove(
        &self,
        ski: &str,
        client: &FeatureAddress,
        server: &FeatureAddress,
    ) -> Result<(), SpineError> {
        let mut entries = self.entries.lock().expect("relationship store poisoned");
        let position = entries
            .iter()
            .position(|stored| {
                stored.ski == ski
                    && stored.relationship.client == *client
                    && stored.relationship.server == *server
            })
            .ok_or_else(|| {
                SpineError::AddressNotFound(format!(
                    "no relationship {client} -> {server} registered"
                ))
            })?;
        entries.remove(position);
        Ok(())
    }

    fn for_peer(&self, ski: &str) -> Vec<Relationship> {
        self.entries
            .lock()
            .expect("relationship store poisoned")
            .iter()
            .filter(|stored| stored.ski == ski)
            .map(|stored| stored.relationship.clone())
            .collect()
    }

    /// All relationships whose server address matches `pattern`, honoring
    /// wildcard components.
    fn on_feature(&self, pattern: &FeatureAddress) -> Vec<Relationship> {
        self.entries
            .lock()
            .expect("relationship store poisoned")
            .iter()
            .filter(|stored| stored.relationship.server.matches(pattern))
            .map(|stored| stored.relationship.clone())
            .collect()
    }

    fn remove_all_for_peer(&self, ski: &str) {
        self.entries
            .lock()
            .expect("relationship store poisoned")
            .retain(|stored| stored.ski != ski);
    }

    fn has(&self, client: &FeatureAddress, server: &FeatureAddress) -> bool {
        self.entries
            .lock()
            .expect("relationship store poisoned")
            .iter()
            .any(|stored| {
                stored.relationship.client == *client && stored.relationship.server == *server
            })
    }
}

/// Validates a relationship request against the local feature tree before it
/// is stored: the server feature must exist and any declared feature-type
/// filter must match.
fn validate_server_feature(
    device: &Weak<DeviceLocalInner>,
    server: &FeatureAddress,
    server_feature_type: Option<FeatureType>,
) -> Result<(), SpineError> {
    let device = device
        .upgrade()
        .ok_or_else(|| SpineError::AddressNotFound("local device dropped".to_string()))?;
    let feature = device.feature_by_address(server).ok_or_else(|| {
        SpineError::AddressNotFound(format!("no local feature at '{server}'"))
    })?;
    if let Some(wanted) = server_feature_type {
        if wanted != feature.feature_type() {
            return Err(SpineError::Mismatch(format!(
                "feature at '{server}' is {:?}, not {wanted:?}",
                feature.feature_type()
            )));
        }
    }
    Ok(())
}

/// Registry of bindings granted by local server features.
pub struct BindingManager {
    device: Weak<DeviceLocalInner>,
    store: RelationshipStore,
}

impl BindingManager {
    pub(crate) fn new(device: Weak<DeviceLocalInner>) -> Self {
        Self { device, store: RelationshipStore::new() }
    }

    pub fn add_binding(
        &self,
        remote_device: &DeviceRemote,
        request: BindingRequest,
    ) -> Result<(), SpineError> {
        validate_server_feature(&self.device, &request.server_address, request.server_feature_type)?;
        self.store.add(
            remote_device.ski(),
            Relationship {
                client: request.client_address,
                server: request.server_address,
                server_feature_type: request.server_feature_type,
            },
        )
    }

    pub fn remove_binding(
        &self,
        delete: BindingDelete,
        remote_device: &DeviceRemote,
    ) -> Result<(), SpineError> {
        self.store.remove(remote_device.ski(), &delete.client_address, &delete.server_address)
    }

    pub fn bindings(&self, remote_device: &DeviceRemote) -> Vec<Relationship> {
        self.store.for_peer(remote_device.ski())
    }

    pub fn bindings_on_feature(&self, pattern: &FeatureAddress) -> Vec<Relationship> {
        self.store.on_feature(pattern)
    }

    pub fn remove_bindings_for_device(&self, remote_device: &DeviceRemote) {
        self.store.remove_all_for_peer(remote_device.ski());
    }

    pub(crate) fn has_binding(&self, client: &FeatureAddress, server: &FeatureAddress) -> bool {
        self.store.has(client, server)
    }
}

/// Registry of subscriptions granted by local server features.
pub struct SubscriptionManager {
    device: Weak<DeviceLocalInner>,
    store: RelationshipStore,
}

impl SubscriptionManager {
    pub(crate) fn new(device: Weak<DeviceLocalInner>) -> Self {
        Self { device, store: RelationshipStore::new() }
    }

    pub fn add_subscription(
        &self,
        remote_device: &DeviceRemote,
        request: SubscriptionRequest,
    ) -> Result<(), SpineError> {
        validate_server_feature(&self.device, &request.server_address, request.server_feature_type)?;
        self.store.add(
            remote_device.ski(),
            Relationship {
                client: request.client_address,
                server: request.server_address,
                server_feature_type: request.server_feature_type,
            },
        )
    }

    pub fn remove_subscription(
        &self,
        delete: SubscriptionDelete,
        remote_device: &DeviceRemote,
    ) -> Result<(), SpineError> {
        self.store.remove(remote_device.ski(), &delete.client_address, &delete.server_address)
    }

    pub fn subscriptions(&self, remote_device: &DeviceRemote) -> Vec<Relationship> {
        self.store.for_peer(remote_device.ski())
    }

    pub fn subscriptions_on_feature(&self, pattern: &FeatureAddress) -> Vec<Relationship> {
        self.store.on_feature(pattern)
    }

    pub fn remove_subscriptions_for_device(&self, remote_device: &DeviceRemote) {
        self.store.remove_all_for_peer(remote_device.ski());
    }
}
