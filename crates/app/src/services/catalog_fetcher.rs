//! Catalog fetcher — category-scoped list requests and the parsing boundary.
//!
//! Hub payloads are loosely typed JSON. This is the only place they are
//! looked at: every list is turned into typed [`DeviceRecord`]s here, with
//! fixed-point temperatures normalized exactly once. A malformed item is
//! logged and skipped; a malformed envelope fails the whole fetch.
//!
//! Proxies subscribe to the fetcher so that a catalog fetched on behalf of
//! one device is merged into all of its siblings.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use chrono::Utc;
use domosync_domain::category::Category;
use domosync_domain::climate::{Celsius, Season, ZoneMode};
use domosync_domain::command::HubCommand;
use domosync_domain::error::{DomoError, ProtocolError};
use domosync_domain::id::RemoteId;
use domosync_domain::record::{
    Catalog, DeviceRecord, HubInfo, LightRecord, RelayRecord, SensorRecord, ThermoRecord,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::ports::HubTransport;
use crate::proxy::Reconcile;
use crate::services::session_manager::SessionManager;

type Subscribers = Arc<RwLock<Vec<Weak<dyn Reconcile>>>>;

/// Issues list requests through a shared [`SessionManager`].
pub struct CatalogFetcher<T> {
    session: Arc<SessionManager<T>>,
    subscribers: Subscribers,
}

impl<T> Clone for CatalogFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T: HubTransport> CatalogFetcher<T> {
    #[must_use]
    pub fn new(session: Arc<SessionManager<T>>) -> Self {
        Self {
            session,
            subscribers: Subscribers::default(),
        }
    }

    /// The session every request goes through.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager<T>> {
        &self.session
    }

    /// Fetch every device of `category`, in hub order.
    ///
    /// # Errors
    ///
    /// Any [`SessionManager`] error, or [`DomoError::Protocol`] when the list
    /// envelope is malformed.
    #[tracing::instrument(skip(self), fields(%category))]
    pub async fn fetch(&self, category: Category) -> Result<Catalog, DomoError> {
        let payload = self.session.request(&HubCommand::List { category }).await?;
        let records = parse_catalog(category, &payload)?;
        tracing::debug!(count = records.len(), "fetched catalog");
        Ok(Catalog {
            category,
            records,
            fetched_at: Utc::now(),
        })
    }

    /// Register `proxy` for [`publish`](Self::publish). Only a weak
    /// reference is kept; dropped proxies are pruned on the next publish.
    pub fn subscribe(&self, proxy: &Arc<dyn Reconcile>) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(proxy));
    }

    /// Merge `catalog` into every live subscriber of its category. Returns
    /// how many subscribers took the catalog.
    pub fn publish(&self, catalog: &Catalog) -> usize {
        let live: Vec<Arc<dyn Reconcile>> = {
            let mut subscribers = self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.retain(|proxy| proxy.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        let targets: Vec<_> = live
            .iter()
            .filter(|proxy| proxy.category() == catalog.category)
            .collect();
        for proxy in &targets {
            proxy.merge(catalog);
        }
        targets.len()
    }

    /// Fetch the hub's identity.
    ///
    /// # Errors
    ///
    /// Any [`SessionManager`] error, or [`DomoError::Protocol`] when the
    /// serial number is missing.
    pub async fn hub_info(&self) -> Result<HubInfo, DomoError> {
        let payload = self.session.request(&HubCommand::ListFeatures).await?;
        Ok(parse_hub_info(&payload)?)
    }
}

/// Turn a list payload into typed records.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the payload has no `array` list.
pub fn parse_catalog(
    category: Category,
    payload: &Value,
) -> Result<Vec<DeviceRecord>, ProtocolError> {
    let items = item_array(payload)?;
    let records = match category {
        Category::Light => flatten_lights(items),
        Category::Relay => parse_items::<WireSwitchable>(category, items)
            .map(|w| {
                DeviceRecord::Relay(RelayRecord {
                    remote_id: RemoteId::new(w.act_id),
                    name: w.name,
                    on: w.status,
                })
            })
            .collect(),
        Category::Thermo => parse_items::<WireZone>(category, items)
            .filter_map(|w| match w.into_record() {
                Some(record) => Some(DeviceRecord::Thermo(record)),
                None => {
                    tracing::warn!(%category, "skipping zone with unknown mode or season");
                    None
                }
            })
            .collect(),
        Category::Sensor => parse_items::<WireAnalog>(category, items)
            .map(|w| {
                DeviceRecord::Sensor(SensorRecord {
                    remote_id: RemoteId::new(w.act_id),
                    name: w.name,
                    value: w.value,
                    unit: w.unit,
                })
            })
            .collect(),
    };
    Ok(records)
}

/// Extract the hub identity from a `features` payload.
///
/// # Errors
///
/// Returns [`ProtocolError::MissingField`] when `serial` is absent.
pub fn parse_hub_info(payload: &Value) -> Result<HubInfo, ProtocolError> {
    let serial = payload
        .get("serial")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("serial"))?;
    let features = payload
        .get("list")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(HubInfo {
        serial: serial.to_string(),
        features,
    })
}

fn item_array(payload: &Value) -> Result<&[Value], ProtocolError> {
    match payload.get("array") {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ProtocolError::UnexpectedType {
            field: "array",
            expected: "a list",
        }),
        None => Err(ProtocolError::MissingField("array")),
    }
}

fn parse_items<'a, W>(category: Category, items: &'a [Value]) -> impl Iterator<Item = W> + 'a
where
    W: for<'de> Deserialize<'de> + 'a,
{
    items
        .iter()
        .enumerate()
        .filter_map(move |(position, item)| match W::deserialize(item) {
            Ok(wire) => Some(wire),
            Err(err) => {
                tracing::warn!(%category, position, %err, "skipping malformed record");
                None
            }
        })
}

/// Flatten floor → room → light, keeping both indices on each record.
fn flatten_lights(floors: &[Value]) -> Vec<DeviceRecord> {
    let mut records = Vec::new();
    for floor in parse_items::<WireFloor>(Category::Light, floors) {
        for room in parse_items::<WireRoom>(Category::Light, &floor.array) {
            for light in parse_items::<WireSwitchable>(Category::Light, &room.array) {
                records.push(DeviceRecord::Light(LightRecord {
                    remote_id: RemoteId::new(light.act_id),
                    floor_ind: floor.floor_ind,
                    room_ind: room.room_ind,
                    name: light.name,
                    floor_name: floor.name.clone(),
                    room_name: room.name.clone(),
                    on: light.status,
                }));
            }
        }
    }
    records
}

#[derive(Deserialize)]
struct WireFloor {
    floor_ind: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    array: Vec<Value>,
}

#[derive(Deserialize)]
struct WireRoom {
    room_ind: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    array: Vec<Value>,
}

#[derive(Deserialize)]
struct WireSwitchable {
    act_id: u32,
    name: String,
    #[serde(deserialize_with = "flag")]
    status: bool,
}

#[derive(Deserialize)]
struct WireZone {
    act_id: u32,
    name: String,
    #[serde(deserialize_with = "flag")]
    status: bool,
    temp: i32,
    mode: i64,
    set_point: i32,
    season: String,
    hygro: Option<f64>,
}

impl WireZone {
    fn into_record(self) -> Option<ThermoRecord> {
        Some(ThermoRecord {
            remote_id: RemoteId::new(self.act_id),
            name: self.name,
            active: self.status,
            mode: ZoneMode::from_code(self.mode)?,
            season: Season::from_name(&self.season)?,
            setpoint: Celsius::from_tenths(self.set_point),
            temperature: Celsius::from_tenths(self.temp),
            humidity: self.hygro,
        })
    }
}

#[derive(Deserialize)]
struct WireAnalog {
    act_id: u32,
    name: String,
    value: f64,
    #[serde(default)]
    unit: String,
}

/// Status flags arrive either as booleans or as 0/1.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}
