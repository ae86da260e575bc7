//! Virtual thermo zone.

use domosync_domain::climate::{Season, ZoneMode};
use serde_json::{Value, json};

/// A zone with its setpoint and measured temperature kept in tenths, the
/// way the hub stores them.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualZone {
    pub act_id: u32,
    pub name: String,
    pub mode: ZoneMode,
    pub set_point: i32,
    pub temp: i32,
    pub hygro: Option<f64>,
}

impl VirtualZone {
    #[must_use]
    pub fn new(
        act_id: u32,
        name: impl Into<String>,
        mode: ZoneMode,
        set_point: i32,
        temp: i32,
    ) -> Self {
        Self {
            act_id,
            name: name.into(),
            mode,
            set_point,
            temp,
            hygro: None,
        }
    }

    #[must_use]
    pub fn with_humidity(mut self, hygro: f64) -> Self {
        self.hygro = Some(hygro);
        self
    }

    /// Render the zone; the season is plant-wide and comes from the hub.
    #[must_use]
    pub fn to_json(&self, season: Season) -> Value {
        let mut zone = json!({
            "act_id": self.act_id,
            "name": self.name,
            "status": u8::from(self.mode != ZoneMode::Off),
            "mode": self.mode.code(),
            "set_point": self.set_point,
            "temp": self.temp,
            "season": season.as_str(),
        });
        if let (Some(hygro), Value::Object(map)) = (self.hygro, &mut zone) {
            map.insert("hygro".into(), hygro.into());
        }
        zone
    }
}
