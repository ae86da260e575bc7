//! Typed requests sent through a hub session.

use std::fmt;

use crate::category::Category;
use crate::climate::{Celsius, Season, ZoneMode};
use crate::id::RemoteId;

/// A request the hub understands, other than the session requests
/// (login, keep-alive, logout) which the session manager issues itself.
#[derive(Debug, Clone, PartialEq)]
pub enum HubCommand {
    /// Hub identity and enabled features.
    ListFeatures,
    /// Every device of one category.
    List { category: Category },
    /// Switch a light or a relay.
    Switch {
        remote_id: RemoteId,
        on: bool,
        is_light: bool,
    },
    /// Set a thermo zone's mode and setpoint together.
    ThermoMode {
        remote_id: RemoteId,
        mode: ZoneMode,
        setpoint: Celsius,
    },
    /// Flip the plant-wide season.
    ChangeSeason { season: Season },
}

impl HubCommand {
    /// Short name used in logs and tracing spans.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ListFeatures => "features",
            Self::List { category } => category.list_name(),
            Self::Switch { .. } => "switch",
            Self::ThermoMode { .. } => "thermo_mode",
            Self::ChangeSeason { .. } => "change_season",
        }
    }

    /// Whether the command changes device state on the hub.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::ListFeatures | Self::List { .. })
    }
}

impl fmt::Display for HubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListFeatures => f.write_str("list(features)"),
            Self::List { category } => write!(f, "list({})", category.list_name()),
            Self::Switch {
                remote_id,
                on,
                is_light,
            } => write!(f, "switch({remote_id}, {on}, {is_light})"),
            Self::ThermoMode {
                remote_id,
                mode,
                setpoint,
            } => write!(
                f,
                "thermo_mode({remote_id}, {}, {})",
                mode.code(),
                setpoint.degrees()
            ),
            Self::ChangeSeason { season } => write!(f, "change_season({})", season.code()),
        }
    }
}
