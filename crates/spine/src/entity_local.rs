use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use spine_model::payloads::{EntityDescription, EntityInformation};
use spine_model::{EntityAddress, EntityType, FeatureAddress, FeatureType, Role};

use crate::device_local::DeviceLocalInner;
use crate::feature_local::FeatureLocal;

/// An entity hosted on the local device, owning its features.
pub struct EntityLocal {
    etype: EntityType,
    address: EntityAddress,
    device: Weak<DeviceLocalInner>,
    features: Mutex<Vec<Arc<FeatureLocal>>>,
    next_feature_id: AtomicU32,
}

impl EntityLocal {
    pub(crate) fn new(
        etype: EntityType,
        address: EntityAddress,
        device: Weak<DeviceLocalInner>,
    ) -> Arc<Self> {
        // Feature numbering starts at 0 on the root entity, at 1 elsewhere.
        let first_id = if address.entity == [0] { 0 } else { 1 };
        Arc::new(Self {
            etype,
            address,
            device,
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

    pub fn features(&self) -> Vec<Arc<FeatureLocal>> {
        self.features.lock().expect("feature list poisoned").clone()
    }

    /// Adds a feature with the next free id.
    pub fn add_feature(&self, ftype: FeatureType, role: Role) -> Arc<FeatureLocal> {
        let id = self.next_feature_id.fetch_add(1, Ordering::Relaxed);
        let feature = FeatureLocal::new(
            FeatureAddress::for_entity(&self.address, id),
            ftype,
            role,
            self.device.clone(),
        );
        self.features.lock().expect("feature list poisoned").push(Arc::clone(&feature));
        feature
    }

    /// Returns the feature of the given type and role, creating it if the
    /// entity does not host one yet.
    pub fn get_or_add_feature(&self, ftype: FeatureType, role: Role) -> Arc<FeatureLocal> {
        if let Some(feature) = self.feature_of_type_and_role(ftype, role) {
            return feature;
        }
        self.add_feature(ftype, role)
    }

    pub fn feature_of_type_and_role(
        &self,
        ftype: FeatureType,
        role: Role,
    ) -> Option<Arc<FeatureLocal>> {
        self.features
            .lock()
            .expect("feature list poisoned")
            .iter()
            .find(|feature| feature.feature_type() == ftype && feature.role() == role)
            .cloned()
    }

    pub fn feature_by_id(&self, id: u32) -> Option<Arc<FeatureLocal>> {
        self.features
            .lock()
            .expect("feature list poisoned")
            .iter()
            .find(|feature| feature.address().feature == Some(id))
            .cloned()
    }

    /// Discovery description of this entity.
    pub fn information(&self) -> EntityInformation {
        EntityInformation {
            description: Some(EntityDescription {
                entity_address: Some(self.address.clone()),
                entity_type: Some(self.etype),
                description: None,
            }),
        }
    }
}
