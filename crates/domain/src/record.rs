//! Device records — normalized, immutable snapshots produced by one fetch.
//!
//! Records are never patched: each fetch produces a fresh [`Catalog`] and a
//! proxy replaces its whole cached record with the matching one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::climate::{Celsius, HvacMode, Season, ZoneMode};
use crate::id::{DeviceKey, RemoteId};

/// UTC timestamp of a fetch.
pub type Timestamp = DateTime<Utc>;

/// A light inside the hub's floor → room hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightRecord {
    pub remote_id: RemoteId,
    pub floor_ind: u32,
    pub room_ind: u32,
    pub name: String,
    pub floor_name: String,
    pub room_name: String,
    pub on: bool,
}

/// A switchable relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub remote_id: RemoteId,
    pub name: String,
    pub on: bool,
}

/// A thermoregulation zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermoRecord {
    pub remote_id: RemoteId,
    pub name: String,
    /// Whether the zone is currently calling for heat/cool.
    pub active: bool,
    pub mode: ZoneMode,
    pub season: Season,
    pub setpoint: Celsius,
    pub temperature: Celsius,
    /// Relative humidity, only for zones fitted with a hygrometer.
    pub humidity: Option<f64>,
}

impl ThermoRecord {
    /// Caller-facing mode derived from zone mode and season.
    #[must_use]
    pub fn hvac_mode(&self) -> HvacMode {
        HvacMode::from_zone(self.mode, self.season)
    }
}

/// An analog input (humidity, temperature and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub remote_id: RemoteId,
    pub name: String,
    pub value: f64,
    pub unit: String,
}

/// Any record, tagged with its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum DeviceRecord {
    Light(LightRecord),
    Relay(RelayRecord),
    Thermo(ThermoRecord),
    Sensor(SensorRecord),
}

impl DeviceRecord {
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Light(_) => Category::Light,
            Self::Relay(_) => Category::Relay,
            Self::Thermo(_) => Category::Thermo,
            Self::Sensor(_) => Category::Sensor,
        }
    }

    #[must_use]
    pub fn key(&self) -> DeviceKey {
        match self {
            Self::Light(r) => r.key(),
            Self::Relay(r) => r.key(),
            Self::Thermo(r) => r.key(),
            Self::Sensor(r) => r.key(),
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Light(r) => &r.name,
            Self::Relay(r) => &r.name,
            Self::Thermo(r) => &r.name,
            Self::Sensor(r) => &r.name,
        }
    }
}

/// Typed access to one record variant.
///
/// Implemented by every per-category record so proxies and reconciliation
/// can be written once, generically.
pub trait CatalogRecord: Clone + PartialEq + Send + Sync + 'static {
    /// Category the record belongs to.
    const CATEGORY: Category;

    /// Composite identity used for matching across fetches.
    fn key(&self) -> DeviceKey;

    /// Name shown to users.
    fn display_name(&self) -> &str;

    /// Stable identifier derived from the hub naming, e.g. `switch.kitchen_1`.
    fn unique_id(&self) -> String;

    /// Borrow this variant out of a tagged record.
    fn from_record(record: &DeviceRecord) -> Option<&Self>;
}

impl CatalogRecord for LightRecord {
    const CATEGORY: Category = Category::Light;

    fn key(&self) -> DeviceKey {
        DeviceKey::Light {
            floor_ind: self.floor_ind,
            room_ind: self.room_ind,
            remote_id: self.remote_id,
        }
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn unique_id(&self) -> String {
        format!(
            "{}.{}_{}_{}",
            Self::CATEGORY.entity_domain(),
            slugify(&self.floor_name),
            slugify(&self.name).replace('.', ""),
            self.remote_id
        )
    }

    fn from_record(record: &DeviceRecord) -> Option<&Self> {
        match record {
            DeviceRecord::Light(r) => Some(r),
            _ => None,
        }
    }
}

macro_rules! flat_record {
    ($record:ident, $variant:ident) => {
        impl CatalogRecord for $record {
            const CATEGORY: Category = Category::$variant;

            fn key(&self) -> DeviceKey {
                DeviceKey::$variant {
                    remote_id: self.remote_id,
                }
            }

            fn display_name(&self) -> &str {
                &self.name
            }

            fn unique_id(&self) -> String {
                format!(
                    "{}.{}_{}",
                    Self::CATEGORY.entity_domain(),
                    slugify(&self.name),
                    self.remote_id
                )
            }

            fn from_record(record: &DeviceRecord) -> Option<&Self> {
                match record {
                    DeviceRecord::$variant(r) => Some(r),
                    _ => None,
                }
            }
        }
    };
}

flat_record!(RelayRecord, Relay);
flat_record!(ThermoRecord, Thermo);
flat_record!(SensorRecord, Sensor);

/// The result of one category-scoped fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub category: Category,
    pub records: Vec<DeviceRecord>,
    pub fetched_at: Timestamp,
}

impl Catalog {
    /// Iterate the records of type `R` in hub order.
    pub fn iter<R: CatalogRecord>(&self) -> impl Iterator<Item = &R> {
        self.records.iter().filter_map(R::from_record)
    }

    /// Find the record with the given key.
    #[must_use]
    pub fn find<R: CatalogRecord>(&self, key: &DeviceKey) -> Option<&R> {
        self.iter::<R>().find(|r| r.key() == *key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Hub identity returned by the `features` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubInfo {
    pub serial: String,
    pub features: Vec<String>,
}

/// Lower-case, spaces to underscores. Light names additionally lose their
/// dots in [`LightRecord::unique_id`].
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}
