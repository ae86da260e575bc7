//! Thermoregulation zones.
//!
//! A zone is driven by its mode (off, manual, auto) and setpoint, which the
//! hub always takes together, and by the plant-wide season. Heating and
//! cooling are both "manual"; which one happens depends on the season, so a
//! HEAT or COOL request may need a season change first.

use domosync_domain::climate::{Celsius, HvacMode, Season, ZoneMode};
use domosync_domain::command::HubCommand;
use domosync_domain::error::DomoError;
use domosync_domain::record::ThermoRecord;

use super::{Commandable, DeviceProxy, Snapshot};
use crate::ports::HubTransport;

/// Operations on a thermo zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClimateCommand {
    SetMode {
        mode: HvacMode,
        setpoint: Option<f64>,
    },
    SetTemperature(f64),
    SetSeason(Season),
    TurnOn,
    TurnOff,
}

impl<T: HubTransport> DeviceProxy<T, ThermoRecord> {
    /// Caller-facing mode of the last cached state.
    #[must_use]
    pub fn hvac_mode(&self) -> HvacMode {
        self.snapshot().record.hvac_mode()
    }

    /// Set mode and setpoint in one exchange, changing season first if the
    /// mode requires it. Without a setpoint the last cached one is sent.
    ///
    /// HEAT and COOL read the season from a fresh zone list, since another
    /// zone may have flipped it since this one was last refreshed.
    ///
    /// # Errors
    ///
    /// [`DomoError::Validation`] if `setpoint` is outside the accepted range,
    /// before anything is sent; otherwise any fetch, exchange or refresh error.
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    pub async fn set_mode(
        &self,
        mode: HvacMode,
        setpoint: Option<f64>,
    ) -> Result<Snapshot<ThermoRecord>, DomoError> {
        let zone = self.snapshot().record;
        let setpoint = match setpoint {
            Some(degrees) => Celsius::setpoint(degrees)?,
            None => zone.setpoint,
        };
        let season = if mode.required_season().is_some() {
            self.current_season(zone.season).await?
        } else {
            zone.season
        };
        let commands = mode.commands(zone.remote_id, season, setpoint);
        self.dispatch(&commands).await
    }

    /// The plant-wide season as the hub reports it now. Every zone carries
    /// it; `cached` is only used when the hub lists no zone at all.
    async fn current_season(&self, cached: Season) -> Result<Season, DomoError> {
        let catalog = self.fetch_category().await?;
        let season = catalog
            .find::<ThermoRecord>(&self.key)
            .or_else(|| catalog.iter::<ThermoRecord>().next())
            .map_or(cached, |zone| zone.season);
        Ok(season)
    }

    /// Change the setpoint, keeping the zone's current mode.
    ///
    /// # Errors
    ///
    /// See [`set_mode`](Self::set_mode).
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    pub async fn set_temperature(
        &self,
        setpoint: f64,
    ) -> Result<Snapshot<ThermoRecord>, DomoError> {
        let setpoint = Celsius::setpoint(setpoint)?;
        let zone = self.snapshot().record;
        self.send_mode(zone.mode, setpoint).await
    }

    /// Flip the plant-wide season. Affects every zone on the hub.
    ///
    /// # Errors
    ///
    /// Any exchange or refresh error.
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    pub async fn set_season(&self, season: Season) -> Result<Snapshot<ThermoRecord>, DomoError> {
        self.dispatch(&[HubCommand::ChangeSeason { season }]).await
    }

    /// Manual mode at the last cached setpoint.
    ///
    /// # Errors
    ///
    /// Any exchange or refresh error.
    pub async fn turn_on(&self) -> Result<Snapshot<ThermoRecord>, DomoError> {
        let zone = self.snapshot().record;
        self.send_mode(ZoneMode::Manual, zone.setpoint).await
    }

    /// Off, keeping the last cached setpoint.
    ///
    /// # Errors
    ///
    /// Any exchange or refresh error.
    pub async fn turn_off(&self) -> Result<Snapshot<ThermoRecord>, DomoError> {
        let zone = self.snapshot().record;
        self.send_mode(ZoneMode::Off, zone.setpoint).await
    }

    async fn send_mode(
        &self,
        mode: ZoneMode,
        setpoint: Celsius,
    ) -> Result<Snapshot<ThermoRecord>, DomoError> {
        let command = HubCommand::ThermoMode {
            remote_id: self.key.remote_id(),
            mode,
            setpoint,
        };
        self.dispatch(&[command]).await
    }
}

impl<T: HubTransport> Commandable for DeviceProxy<T, ThermoRecord> {
    type Command = ClimateCommand;

    async fn command(&self, command: ClimateCommand) -> Result<Snapshot<ThermoRecord>, DomoError> {
        match command {
            ClimateCommand::SetMode { mode, setpoint } => self.set_mode(mode, setpoint).await,
            ClimateCommand::SetTemperature(setpoint) => self.set_temperature(setpoint).await,
            ClimateCommand::SetSeason(season) => self.set_season(season).await,
            ClimateCommand::TurnOn => self.turn_on().await,
            ClimateCommand::TurnOff => self.turn_off().await,
        }
    }
}
