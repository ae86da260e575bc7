//! Climate model — zone modes, the hub-global season and temperatures.
//!
//! A zone is in one of `{Off, Manual, Auto}` × `{Summer, Winter}`. The season
//! is global to the plant: switching a zone from heating to cooling means
//! flipping the season first, then issuing the zone mode command. Transitions
//! only happen through commands; the hub's first report is the initial state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::HubCommand;
use crate::error::ValidationError;
use crate::id::RemoteId;

/// Lowest setpoint accepted by a thermo zone, in degrees Celsius.
pub const MIN_SETPOINT: f64 = 5.0;
/// Highest setpoint accepted by a thermo zone, in degrees Celsius.
pub const MAX_SETPOINT: f64 = 35.0;
/// Resolution of hub temperatures.
pub const SETPOINT_STEP: f64 = 0.1;

/// A temperature in degrees Celsius.
///
/// The hub reports temperatures as fixed-point integers in tenths of a
/// degree. The only way to build a `Celsius` from hub data is
/// [`from_tenths`](Self::from_tenths), which takes the raw integer, so the
/// scaling cannot be applied twice.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Celsius(f64);

impl Celsius {
    /// Normalize a hub fixed-point value (`v / 10.0`).
    #[must_use]
    pub fn from_tenths(tenths: i32) -> Self {
        Self(f64::from(tenths) / 10.0)
    }

    /// Build a setpoint, rejecting values outside the zone's range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SetpointOutOfRange`] if `degrees` is not a
    /// finite value within [`MIN_SETPOINT`]..=[`MAX_SETPOINT`].
    pub fn setpoint(degrees: f64) -> Result<Self, ValidationError> {
        if !degrees.is_finite() || !(MIN_SETPOINT..=MAX_SETPOINT).contains(&degrees) {
            return Err(ValidationError::SetpointOutOfRange(degrees));
        }
        Ok(Self(degrees))
    }

    /// Degrees as a float.
    #[must_use]
    pub fn degrees(self) -> f64 {
        self.0
    }

    /// Back to the hub's fixed-point representation, rounded to the nearest tenth.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_tenths(self) -> i32 {
        (self.0 * 10.0).round() as i32
    }
}

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{b0}C", self.0)
    }
}

/// Zone operating mode as understood by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneMode {
    Off,
    Manual,
    Auto,
}

impl ZoneMode {
    /// Integer code carried by the `thermo_mode` command.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Manual => 1,
            Self::Auto => 2,
        }
    }

    /// Decode the hub's integer mode.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::Manual),
            2 => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Plant-wide heating/cooling flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Summer,
    Winter,
}

impl Season {
    /// Integer code carried by the `change_season` command.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Winter => 1,
            Self::Summer => 2,
        }
    }

    /// Name the hub uses in zone listings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summer => "summer",
            Self::Winter => "winter",
        }
    }

    /// Parse the name the hub uses in zone listings.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "summer" => Some(Self::Summer),
            "winter" => Some(Self::Winter),
            _ => None,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller asks a climate zone to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    Auto,
}

impl HvacMode {
    /// Derive the caller-facing mode from what the hub reports.
    #[must_use]
    pub fn from_zone(mode: ZoneMode, season: Season) -> Self {
        match (mode, season) {
            (ZoneMode::Off, _) => Self::Off,
            (ZoneMode::Auto, _) => Self::Auto,
            (ZoneMode::Manual, Season::Winter) => Self::Heat,
            (ZoneMode::Manual, Season::Summer) => Self::Cool,
        }
    }

    /// The season this mode only makes sense in, if any.
    #[must_use]
    pub fn required_season(self) -> Option<Season> {
        match self {
            Self::Heat => Some(Season::Winter),
            Self::Cool => Some(Season::Summer),
            Self::Off | Self::Auto => None,
        }
    }

    /// Zone mode sent to the hub.
    #[must_use]
    pub fn zone_mode(self) -> ZoneMode {
        match self {
            Self::Off => ZoneMode::Off,
            Self::Heat | Self::Cool => ZoneMode::Manual,
            Self::Auto => ZoneMode::Auto,
        }
    }

    /// Commands needed to move a zone into this mode.
    ///
    /// A season flip, when required, always comes before the zone command.
    /// The zone command always carries a setpoint because the hub needs both
    /// fields.
    #[must_use]
    pub fn commands(
        self,
        remote_id: RemoteId,
        current_season: Season,
        setpoint: Celsius,
    ) -> Vec<HubCommand> {
        let mut commands = Vec::with_capacity(2);
        if let Some(season) = self.required_season()
            && season != current_season
        {
            commands.push(HubCommand::ChangeSeason { season });
        }
        commands.push(HubCommand::ThermoMode {
            remote_id,
            mode: self.zone_mode(),
            setpoint,
        });
        commands
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Heat => f.write_str("heat"),
            Self::Cool => f.write_str("cool"),
            Self::Auto => f.write_str("auto"),
        }
    }
}
