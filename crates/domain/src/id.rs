//! Hub-side identifiers and the composite keys used to match records to proxies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Actuator identifier assigned by the hub (`act_id` on the wire).
///
/// Only unique within a category: a relay and a thermo zone may share the
/// same remote id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(u32);

impl RemoteId {
    /// Wrap a raw hub identifier.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Access the raw value sent on the wire.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for RemoteId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RemoteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Composite identity of one physical device across fetches.
///
/// Reconciliation matches on this key, never on array position. Lights live
/// in a floor → room hierarchy on the hub, so their key carries the indices
/// of both levels; every other category is flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum DeviceKey {
    Light {
        floor_ind: u32,
        room_ind: u32,
        remote_id: RemoteId,
    },
    Relay {
        remote_id: RemoteId,
    },
    Thermo {
        remote_id: RemoteId,
    },
    Sensor {
        remote_id: RemoteId,
    },
}

impl DeviceKey {
    /// The category this key belongs to.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Light { .. } => Category::Light,
            Self::Relay { .. } => Category::Relay,
            Self::Thermo { .. } => Category::Thermo,
            Self::Sensor { .. } => Category::Sensor,
        }
    }

    /// The hub identifier, without the hierarchy.
    #[must_use]
    pub fn remote_id(&self) -> RemoteId {
        match self {
            Self::Light { remote_id, .. }
            | Self::Relay { remote_id }
            | Self::Thermo { remote_id }
            | Self::Sensor { remote_id } => *remote_id,
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light {
                floor_ind,
                room_ind,
                remote_id,
            } => write!(f, "light/{floor_ind}/{room_ind}/{remote_id}"),
            other => write!(f, "{}/{}", other.category(), other.remote_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_remote_id_from_string() {
        let id: RemoteId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn should_reject_non_numeric_remote_id() {
        assert!(RemoteId::from_str("kitchen").is_err());
    }

    #[test]
    fn should_serialize_remote_id_as_plain_number() {
        let json = serde_json::to_string(&RemoteId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn should_distinguish_same_remote_id_across_categories() {
        let relay = DeviceKey::Relay {
            remote_id: RemoteId::new(1),
        };
        let thermo = DeviceKey::Thermo {
            remote_id: RemoteId::new(1),
        };
        assert_ne!(relay, thermo);
        assert_eq!(relay.remote_id(), thermo.remote_id());
    }

    #[test]
    fn should_distinguish_lights_in_different_rooms() {
        let a = DeviceKey::Light {
            floor_ind: 0,
            room_ind: 1,
            remote_id: RemoteId::new(5),
        };
        let b = DeviceKey::Light {
            floor_ind: 0,
            room_ind: 2,
            remote_id: RemoteId::new(5),
        };
        assert_ne!(a, b);
    }

    #[test]
    fn should_report_category_of_key() {
        let key = DeviceKey::Sensor {
            remote_id: RemoteId::new(3),
        };
        assert_eq!(key.category(), Category::Sensor);
    }

    #[test]
    fn should_display_hierarchical_light_key() {
        let key = DeviceKey::Light {
            floor_ind: 2,
            room_ind: 3,
            remote_id: RemoteId::new(14),
        };
        assert_eq!(key.to_string(), "light/2/3/14");
    }

    #[test]
    fn should_display_flat_key() {
        let key = DeviceKey::Relay {
            remote_id: RemoteId::new(9),
        };
        assert_eq!(key.to_string(), "relay/9");
    }
}
