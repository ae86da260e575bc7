//! # domosync-adapter-virtual
//!
//! An in-memory hub implementing [`HubTransport`], for demos and tests.
//!
//! It serves the same JSON shapes as a real hub (temperatures in tenths),
//! applies switch, zone and season commands to its own state, checks
//! credentials, issues session tokens and records every call it receives.
//!
//! ## Fault injection
//!
//! | Fault | Effect |
//! |-------|--------|
//! | [`expire_sessions`](VirtualHub::expire_sessions) | every issued token becomes unknown |
//! | [`fail_next`](VirtualHub::fail_next) | the next `n` calls fail with a transport error |
//! | [`malform_next_list`](VirtualHub::malform_next_list) | the next list answer has no `array` |
//! | [`remove_device`](VirtualHub::remove_device) | the device disappears from its list |
//!
//! ## Dependency rule
//!
//! Depends on `domosync-app` (port trait) and `domosync-domain` only.

mod devices;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use domosync_app::ports::{Credentials, HubTransport, SessionToken};
use domosync_domain::category::Category;
use domosync_domain::climate::{Season, ZoneMode};
use domosync_domain::command::HubCommand;
use domosync_domain::error::{BoxError, DomoError, ProtocolError, TransportError};
use domosync_domain::id::RemoteId;
use serde_json::{Value, json};

pub use devices::{Floor, Room, VirtualLight, VirtualRelay, VirtualSensor, VirtualZone};

/// One call received by the virtual hub, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum HubCall {
    Login,
    KeepAlive,
    Send(HubCommand),
    Logout,
}

/// Ack reason returned for a command naming an unknown device.
pub const UNKNOWN_DEVICE: i64 = 1;

struct State {
    credentials: Credentials,
    serial: String,
    season: Season,
    floors: Vec<Floor>,
    relays: Vec<VirtualRelay>,
    zones: Vec<VirtualZone>,
    sensors: Vec<VirtualSensor>,
    sessions: HashSet<String>,
    calls: Vec<HubCall>,
    failing_calls: usize,
    malformed_lists: usize,
}

/// Simulated hub. Clones share the same state, so a test can keep a handle
/// for inspection and fault injection after handing one to a session.
#[derive(Clone)]
pub struct VirtualHub {
    state: Arc<Mutex<State>>,
}

impl VirtualHub {
    /// An empty hub accepting `credentials`, in winter.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                credentials,
                serial: "0000virtual".to_string(),
                season: Season::Winter,
                floors: Vec::new(),
                relays: Vec::new(),
                zones: Vec::new(),
                sensors: Vec::new(),
                sessions: HashSet::new(),
                calls: Vec::new(),
                failing_calls: 0,
                malformed_lists: 0,
            })),
        }
    }

    /// A small furnished house.
    #[must_use]
    pub fn demo(credentials: Credentials) -> Self {
        let hub = Self::new(credentials);
        let lights = [
            (0, "Ground Floor", 0, "Kitchen", VirtualLight::new(1, "Ceiling", false)),
            (0, "Ground Floor", 0, "Kitchen", VirtualLight::new(2, "Island", true)),
            (0, "Ground Floor", 1, "Living Room", VirtualLight::new(3, "Floor Lamp", false)),
            (1, "First Floor", 0, "Bedroom", VirtualLight::new(4, "Bedside", false)),
        ];
        for (floor_ind, floor_name, room_ind, room_name, light) in lights {
            hub.add_light(floor_ind, floor_name, room_ind, room_name, light);
        }
        hub.add_relay(VirtualRelay::new(1, "Garden Pump", false));
        hub.add_relay(VirtualRelay::new(2, "Garage Door", false));
        hub.add_zone(VirtualZone::new(1, "Living Room", ZoneMode::Manual, 205, 198));
        hub.add_zone(
            VirtualZone::new(2, "Bathroom", ZoneMode::Auto, 220, 214).with_humidity(58.0),
        );
        hub.add_sensor(VirtualSensor::new(1, "Cellar Humidity", 61.0, "%"));
        hub
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_serial(&self, serial: impl Into<String>) {
        self.lock().serial = serial.into();
    }

    /// Place a light in the floor → room hierarchy, creating levels as needed.
    pub fn add_light(
        &self,
        floor_ind: u32,
        floor_name: &str,
        room_ind: u32,
        room_name: &str,
        light: VirtualLight,
    ) {
        let mut state = self.lock();
        let position = match state.floors.iter().position(|f| f.floor_ind == floor_ind) {
            Some(position) => position,
            None => {
                state.floors.push(Floor::new(floor_ind, floor_name));
                state.floors.len() - 1
            }
        };
        state.floors[position]
            .room_mut(room_ind, room_name)
            .lights
            .push(light);
    }

    pub fn add_relay(&self, relay: VirtualRelay) {
        self.lock().relays.push(relay);
    }

    pub fn add_zone(&self, zone: VirtualZone) {
        self.lock().zones.push(zone);
    }

    pub fn add_sensor(&self, sensor: VirtualSensor) {
        self.lock().sensors.push(sensor);
    }

    #[must_use]
    pub fn season(&self) -> Season {
        self.lock().season
    }

    /// Change the season from the hub side.
    pub fn set_season(&self, season: Season) {
        self.lock().season = season;
    }

    #[must_use]
    pub fn relay(&self, act_id: u32) -> Option<VirtualRelay> {
        self.lock().relays.iter().find(|r| r.act_id == act_id).cloned()
    }

    /// Flip a relay from the hub side, as a wall switch would.
    pub fn set_relay(&self, act_id: u32, on: bool) {
        if let Some(relay) = self.lock().relays.iter_mut().find(|r| r.act_id == act_id) {
            relay.on = on;
        }
    }

    #[must_use]
    pub fn zone(&self, act_id: u32) -> Option<VirtualZone> {
        self.lock().zones.iter().find(|z| z.act_id == act_id).cloned()
    }

    /// Change a zone's measured temperature, in tenths.
    pub fn set_zone_temperature(&self, act_id: u32, temp: i32) {
        if let Some(zone) = self.lock().zones.iter_mut().find(|z| z.act_id == act_id) {
            zone.temp = temp;
        }
    }

    /// On/off state of the first light with `act_id` in the given room.
    #[must_use]
    pub fn light(&self, floor_ind: u32, room_ind: u32, act_id: u32) -> Option<bool> {
        let state = self.lock();
        state
            .floors
            .iter()
            .filter(|f| f.floor_ind == floor_ind)
            .flat_map(|f| f.rooms.iter())
            .filter(|r| r.room_ind == room_ind)
            .flat_map(|r| r.lights.iter())
            .find(|l| l.act_id == act_id)
            .map(|l| l.on)
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<HubCall> {
        self.lock().calls.clone()
    }

    /// Commands received so far, without session traffic.
    #[must_use]
    pub fn sends(&self) -> Vec<HubCommand> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HubCall::Send(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Forget every issued token.
    pub fn expire_sessions(&self) {
        self.lock().sessions.clear();
    }

    /// Fail the next `count` calls with a transport error.
    pub fn fail_next(&self, count: usize) {
        self.lock().failing_calls = count;
    }

    /// Answer the next list request without its `array`.
    pub fn malform_next_list(&self) {
        self.lock().malformed_lists += 1;
    }

    /// Drop a device from its list. For lights every light with `remote_id`
    /// goes.
    pub fn remove_device(&self, category: Category, remote_id: RemoteId) {
        let id = remote_id.get();
        let mut state = self.lock();
        match category {
            Category::Light => {
                for room in state.floors.iter_mut().flat_map(|f| f.rooms.iter_mut()) {
                    room.lights.retain(|l| l.act_id != id);
                }
            }
            Category::Relay => state.relays.retain(|r| r.act_id != id),
            Category::Thermo => state.zones.retain(|z| z.act_id != id),
            Category::Sensor => state.sensors.retain(|s| s.act_id != id),
        }
    }
}

impl State {
    /// Record `call` and consume one injected failure if any is pending.
    fn receive(&mut self, call: HubCall) -> Result<(), DomoError> {
        self.calls.push(call);
        if self.failing_calls > 0 {
            self.failing_calls -= 1;
            let source: BoxError = "injected transport failure".into();
            return Err(TransportError::Io(source).into());
        }
        Ok(())
    }

    fn check_session(&self, token: &SessionToken) -> Result<(), DomoError> {
        if self.sessions.contains(token.as_str()) {
            Ok(())
        } else {
            Err(DomoError::SessionExpired)
        }
    }

    fn list(&mut self, category: Category) -> Value {
        if self.malformed_lists > 0 {
            self.malformed_lists -= 1;
            return json!({ "ack_reason": 0 });
        }
        let items: Vec<Value> = match category {
            Category::Light => self.floors.iter().map(Floor::to_json).collect(),
            Category::Relay => self.relays.iter().map(VirtualRelay::to_json).collect(),
            Category::Thermo => self.zones.iter().map(|z| z.to_json(self.season)).collect(),
            Category::Sensor => self.sensors.iter().map(VirtualSensor::to_json).collect(),
        };
        json!({ "ack_reason": 0, "array": items })
    }

    fn apply(&mut self, command: &HubCommand) -> Result<Value, DomoError> {
        let found = match command {
            HubCommand::ListFeatures => {
                return Ok(json!({
                    "ack_reason": 0,
                    "serial": self.serial,
                    "list": ["lights", "relays", "thermoregulation", "analogin"],
                }));
            }
            HubCommand::List { category } => return Ok(self.list(*category)),
            HubCommand::Switch {
                remote_id,
                on,
                is_light: true,
            } => {
                let mut found = false;
                for light in self.floors.iter_mut().flat_map(Floor::lights_mut) {
                    if light.act_id == remote_id.get() {
                        light.on = *on;
                        found = true;
                    }
                }
                found
            }
            HubCommand::Switch {
                remote_id,
                on,
                is_light: false,
            } => match self.relays.iter_mut().find(|r| r.act_id == remote_id.get()) {
                Some(relay) => {
                    relay.on = *on;
                    true
                }
                None => false,
            },
            HubCommand::ThermoMode {
                remote_id,
                mode,
                setpoint,
            } => match self.zones.iter_mut().find(|z| z.act_id == remote_id.get()) {
                Some(zone) => {
                    zone.mode = *mode;
                    zone.set_point = setpoint.to_tenths();
                    true
                }
                None => false,
            },
            HubCommand::ChangeSeason { season } => {
                self.season = *season;
                true
            }
        };

        if found {
            Ok(json!({ "ack_reason": 0 }))
        } else {
            Err(ProtocolError::Rejected(UNKNOWN_DEVICE).into())
        }
    }
}

impl HubTransport for VirtualHub {
    fn host(&self) -> &str {
        "virtual"
    }

    async fn login(&self, credentials: &Credentials) -> Result<SessionToken, DomoError> {
        let mut state = self.lock();
        state.receive(HubCall::Login)?;
        if *credentials != state.credentials {
            return Err(DomoError::Auth);
        }
        let token = uuid::Uuid::new_v4().to_string();
        state.sessions.insert(token.clone());
        tracing::debug!("virtual hub issued a session");
        Ok(SessionToken::new(token))
    }

    async fn keep_alive(&self, token: &SessionToken) -> Result<(), DomoError> {
        let mut state = self.lock();
        state.receive(HubCall::KeepAlive)?;
        state.check_session(token)
    }

    async fn send(&self, token: &SessionToken, command: &HubCommand) -> Result<Value, DomoError> {
        let mut state = self.lock();
        state.receive(HubCall::Send(command.clone()))?;
        state.check_session(token)?;
        tracing::debug!(%command, "virtual hub applying command");
        state.apply(command)
    }

    async fn logout(&self, token: &SessionToken) -> Result<(), DomoError> {
        let mut state = self.lock();
        state.receive(HubCall::Logout)?;
        state.sessions.remove(token.as_str());
        Ok(())
    }
}
