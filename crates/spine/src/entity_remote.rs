use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spine_model::{EntityAddress, EntityType, FeatureAddress, FeatureType, Role};

use crate::feature_remote::FeatureRemote;
use crate::sender::Sender;

/// Mirror of an entity on a remote device.
pub struct EntityRemote {
    etype: EntityType,
    address: EntityAddress,
    ski: String,
    sender: Arc<Sender>,
    max_response_delay: Arc<Mutex<Duration>>,
    features: Mutex<Vec<Arc<FeatureRemote>>>,
    next_feature_id: AtomicU32,
}

impl EntityRemote {
    pub(crate) fn new(
        etype: EntityType,
        address: EntityAddress,
        ski: String,
        sender: Arc<Sender>,
        max_response_delay: Arc<Mutex<Duration>>,
    ) -> Arc<Self> {
        // Feature numbering starts at 0 on the root entity, at 1 elsewhere.
        let first_id = if address.entity == [0] { 0 } else { 1 };
        Arc::new(Self {
            etype,
            address,
            ski,
            sender,
            max_response_delay,
            features: Mutex::new(Vec::new()),
            next_feature_id: AtomicU32::new(first_id),
        })
    }

    pub fn entity_type(&self) -> EntityType {
        self.etype
    }

    pub fn address(&self) -> &EntityAddress {
        &self.address
    }

    pub fn features(&self) -> Vec<Arc<FeatureRemote>> {
        self.features.lock().expect("remote feature list poisoned").clone()
    }

    /// Adds a mirrored feature with the next free id.
    pub fn add_feature(&self, ftype: FeatureType, role: Role) -> Arc<FeatureRemote> {
        let id = self.next_feature_id.fetch_add(1, Ordering::Relaxed);
        self.add_feature_with_id(id, ftype, role)
    }

    /// Adds a mirrored feature under an id taken from discovery data.
    pub fn add_feature_with_id(&self, id: u32, ftype: FeatureType, role: Role) -> Arc<FeatureRemote> {
        let feature = FeatureRemote::new(
            FeatureAddress::for_entity(&self.address, id),
            ftype,
            role,
            self.ski.clone(),
            Arc::clone(&self.sender),
            Arc::clone(&self.max_response_delay),
        );
        self.features.lock().expect("remote feature list poisoned").push(Arc::clone(&feature));
        feature
    }

    pub fn feature_by_id(&self, id: u32) -> Option<Arc<FeatureRemote>> {
        self.features
            .lock()
            .expect("remote feature list poisoned")
            .iter()
            .find(|feature| feature.address().feature == Some(id))
            .cloned()
    }
}
