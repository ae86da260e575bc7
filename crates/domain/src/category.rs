//! The device groups the hub lists and returns together.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A class of device the hub returns as one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Light,
    Relay,
    Thermo,
    Sensor,
}

impl Category {
    /// Every category, in discovery order.
    pub const ALL: [Self; 4] = [Self::Light, Self::Relay, Self::Thermo, Self::Sensor];

    /// Name of the list request the hub exposes for this category.
    #[must_use]
    pub fn list_name(self) -> &'static str {
        match self {
            Self::Light => "lights",
            Self::Relay => "relays",
            Self::Thermo => "thermoregulation",
            Self::Sensor => "analogin",
        }
    }

    /// Entity domain used when naming devices of this category.
    #[must_use]
    pub fn entity_domain(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Relay => "switch",
            Self::Thermo => "climate",
            Self::Sensor => "sensor",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => f.write_str("light"),
            Self::Relay => f.write_str("relay"),
            Self::Thermo => f.write_str("thermo"),
            Self::Sensor => f.write_str("sensor"),
        }
    }
}
