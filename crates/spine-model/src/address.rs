use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque device identifier as carried in datagram addresses.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeviceAddress(pub String);

impl DeviceAddress {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Address of one entity on a device. The root entity is path `[0]`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceAddress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity: Vec<u32>,
}

impl EntityAddress {
    pub fn new(device: impl Into<String>, entity: Vec<u32>) -> Self {
        Self { device: Some(DeviceAddress::new(device)), entity }
    }
}

/// Address of one feature. A feature address is only meaningful together
/// with its owning entity path and device identifier; unset components act
/// as wildcards in [`FeatureAddress::matches`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceAddress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<u32>,
}

impl FeatureAddress {
    pub fn new(device: impl Into<String>, entity: Vec<u32>, feature: u32) -> Self {
        Self {
            device: Some(DeviceAddress::new(device)),
            entity,
            feature: Some(feature),
        }
    }

    /// Builds the address of feature `id` on the entity at `entity_address`.
    pub fn for_entity(entity_address: &EntityAddress, id: u32) -> Self {
        Self {
            device: entity_address.device.clone(),
            entity: entity_address.entity.clone(),
            feature: Some(id),
        }
    }

    pub fn entity_address(&self) -> EntityAddress {
        EntityAddress { device: self.device.clone(), entity: self.entity.clone() }
    }

    /// An address is dispatchable only when its entity path is present.
    pub fn has_entity(&self) -> bool {
        !self.entity.is_empty()
    }

    /// Structural containment check: every component set in `pattern` must
    /// equal the corresponding component of `self`; unset pattern components
    /// match anything. Used for queries such as "all bindings on this
    /// feature".
    pub fn matches(&self, pattern: &FeatureAddress) -> bool {
        if let Some(device) = &pattern.device {
            if self.device.as_ref() != Some(device) {
                return false;
            }
        }
        if !pattern.entity.is_empty() && pattern.entity != self.entity {
            return false;
        }
        if let Some(feature) = pattern.feature {
            if self.feature != Some(feature) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for FeatureAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = self.device.as_ref().map(|d| d.0.as_str()).unwrap_or("*");
        write!(f, "{}:{:?}", device, self.entity)?;
        match self.feature {
            Some(id) => write!(f, ":{id}"),
            None => f.write_str(":*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_treats_unset_components_as_wildcards() {
        let concrete = FeatureAddress::new("d1", vec![1, 2], 3);

        let mut pattern = FeatureAddress::default();
        assert!(concrete.matches(&pattern));

        pattern.entity = vec![1, 2];
        assert!(concrete.matches(&pattern));

        pattern.feature = Some(3);
        assert!(concrete.matches(&pattern));

        pattern.device = Some(DeviceAddress::from("d1"));
        assert!(concrete.matches(&pattern));

        pattern.feature = Some(4);
        assert!(!concrete.matches(&pattern));

        pattern.feature = Some(3);
        pattern.entity = vec![1];
        assert!(!concrete.matches(&pattern));

        pattern.entity = vec![1, 2];
        pattern.device = Some(DeviceAddress::from("other"));
        assert!(!concrete.matches(&pattern));
    }

    #[test]
    fn equality_is_structural() {
        let a = FeatureAddress::new("d1", vec![1], 0);
        let b = FeatureAddress::new("d1", vec![1], 0);
        assert_eq!(a, b);
        assert_ne!(a, FeatureAddress::new("d1", vec![1], 1));
    }
}
