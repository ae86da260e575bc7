//! On/off devices: lights and relays.

use domosync_domain::command::HubCommand;
use domosync_domain::error::DomoError;
use domosync_domain::record::{CatalogRecord, LightRecord, RelayRecord};

use super::{Commandable, DeviceProxy, Snapshot};
use crate::ports::HubTransport;

/// A record with a single on/off state.
pub trait Switchable: CatalogRecord {
    /// Lights and relays use different hub commands.
    const IS_LIGHT: bool;

    fn is_on(&self) -> bool;
}

impl Switchable for LightRecord {
    const IS_LIGHT: bool = true;

    fn is_on(&self) -> bool {
        self.on
    }
}

impl Switchable for RelayRecord {
    const IS_LIGHT: bool = false;

    fn is_on(&self) -> bool {
        self.on
    }
}

/// Operations on a light or relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    SetPower(bool),
    TurnOn,
    TurnOff,
}

impl<T, R> DeviceProxy<T, R>
where
    T: HubTransport,
    R: Switchable,
{
    /// Last cached on/off state.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.snapshot().record.is_on()
    }

    /// Switch the device, then refresh its category.
    ///
    /// # Errors
    ///
    /// Any error of the switch exchange or of the refresh.
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    pub async fn set_power(&self, on: bool) -> Result<Snapshot<R>, DomoError> {
        let command = HubCommand::Switch {
            remote_id: self.key.remote_id(),
            on,
            is_light: R::IS_LIGHT,
        };
        self.dispatch(&[command]).await
    }

    /// # Errors
    ///
    /// See [`set_power`](Self::set_power).
    pub async fn turn_on(&self) -> Result<Snapshot<R>, DomoError> {
        self.set_power(true).await
    }

    /// # Errors
    ///
    /// See [`set_power`](Self::set_power).
    pub async fn turn_off(&self) -> Result<Snapshot<R>, DomoError> {
        self.set_power(false).await
    }
}

impl<T, R> Commandable for DeviceProxy<T, R>
where
    T: HubTransport,
    R: Switchable,
{
    type Command = SwitchCommand;

    async fn command(&self, command: SwitchCommand) -> Result<Snapshot<R>, DomoError> {
        match command {
            SwitchCommand::SetPower(on) => self.set_power(on).await,
            SwitchCommand::TurnOn => self.turn_on().await,
            SwitchCommand::TurnOff => self.turn_off().await,
        }
    }
}
