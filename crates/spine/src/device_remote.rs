use std::sync::{Arc, Mutex};
use std::time::Duration;

use spine_model::payloads::DetailedDiscoveryData;
use spine_model::{DeviceAddress, EntityAddress, EntityType, FeatureAddress, FeatureType, Role};

use crate::entity_remote::EntityRemote;
use crate::error::SpineError;
use crate::feature_remote::FeatureRemote;
use crate::sender::Sender;

/// Default expiry for pending requests towards a peer that has not
/// advertised its own limit.
pub const DEFAULT_MAX_RESPONSE_DELAY: Duration = Duration::from_secs(10);

/// A remote peer: its identity (SKI), the sender towards it, and the
/// mirrored entity/feature tree learned via discovery.
pub struct DeviceRemote {
    ski: String,
    address: Mutex<Option<DeviceAddress>>,
    sender: Arc<Sender>,
    max_response_delay: Arc<Mutex<Duration>>,
    entities: Mutex<Vec<Arc<EntityRemote>>>,
}

impl DeviceRemote {
    pub fn new(ski: impl Into<String>, sender: Sender) -> Arc<Self> {
        Arc::new(Self {
            ski: ski.into(),
            address: Mutex::new(None),
            sender: Arc::new(sender),
            max_response_delay: Arc::new(Mutex::new(DEFAULT_MAX_RESPONSE_DELAY)),
            entities: Mutex::new(Vec::new()),
        })
    }

    pub fn ski(&self) -> &str {
        &self.ski
    }

    pub fn address(&self) -> Option<DeviceAddress> {
        self.address.lock().expect("remote address poisoned").clone()
    }

    pub fn set_address(&self, address: DeviceAddress) {
        *self.address.lock().expect("remote address poisoned") = Some(address);
    }

    pub fn sender(&self) -> Arc<Sender> {
        Arc::clone(&self.sender)
    }

    pub fn max_response_delay(&self) -> Duration {
        *self.max_response_delay.lock().expect("response delay poisoned")
    }

    /// Adjusts the expiry applied to requests towards this peer, as
    /// advertised by the peer itself.
    pub fn set_max_response_delay(&self, delay: Duration) {
        *self.max_response_delay.lock().expect("response delay poisoned") = delay;
    }

    pub fn entities(&self) -> Vec<Arc<EntityRemote>> {
        self.entities.lock().expect("remote entity list poisoned").clone()
    }

    pub fn entity(&self, entity_path: &[u32]) -> Option<Arc<EntityRemote>> {
        self.entities
            .lock()
            .expect("remote entity list poisoned")
            .iter()
            .find(|entity| entity.address().entity == entity_path)
            .cloned()
    }

    pub fn add_entity(&self, etype: EntityType, entity_path: Vec<u32>) -> Arc<EntityRemote> {
        let address = EntityAddress { device: self.address(), entity: entity_path };
        let entity = EntityRemote::new(
            etype,
            address,
            self.ski.clone(),
            Arc::clone(&self.sender),
            Arc::clone(&self.max_response_delay),
        );
        self.entities.lock().expect("remote entity list poisoned").push(Arc::clone(&entity));
        entity
    }

    pub fn remove_entity(&self, entity_path: &[u32]) {
        self.entities
            .lock()
            .expect("remote entity list poisoned")
            .retain(|entity| entity.address().entity != entity_path);
    }

    pub fn feature_by_address(&self, address: &FeatureAddress) -> Option<Arc<FeatureRemote>> {
        let id = address.feature?;
        self.entity(&address.entity)?.feature_by_id(id)
    }

    /// Builds the mirror from a received detailed-discovery document.
    pub fn add_entity_and_features(
        &self,
        data: &DetailedDiscoveryData,
    ) -> Result<Vec<Arc<EntityRemote>>, SpineError> {
        if let Some(address) = data
            .device_information
            .as_ref()
            .and_then(|info| info.description.as_ref())
            .and_then(|description| description.device_address.clone())
        {
            self.set_address(address);
        }

        let mut added = Vec::new();
        for info in &data.entity_information {
            let description = info.description.as_ref().ok_or_else(|| {
                SpineError::NotSupported("entity information without description".to_string())
            })?;
            let address = description.entity_address.as_ref().ok_or_else(|| {
                SpineError::AddressNotFound("entity information without address".to_string())
            })?;
            let etype = description.entity_type.unwrap_or(EntityType::Generic);
            added.push(self.add_entity(etype, address.entity.clone()));
        }

        for info in &data.feature_information {
            let description = info.description.as_ref().ok_or_else(|| {
                SpineError::NotSupported("feature information without description".to_string())
            })?;
            let address = description.feature_address.as_ref().ok_or_else(|| {
                SpineError::AddressNotFound("feature information without address".to_string())
            })?;
            let id = address.feature.ok_or_else(|| {
                SpineError::AddressNotFound(format!("feature id missing in '{address}'"))
            })?;
            let entity = self.entity(&address.entity).ok_or_else(|| {
                SpineError::AddressNotFound(format!(
                    "feature '{address}' references an unknown entity"
                ))
            })?;
            entity.add_feature_with_id(
                id,
                description.feature_type.unwrap_or(FeatureType::Generic),
                description.role.unwrap_or(Role::Client),
            );
        }

        Ok(added)
    }
}
