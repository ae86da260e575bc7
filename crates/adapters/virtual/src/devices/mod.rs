//! Simulated devices — lights, relays, thermo zones, analog inputs.
//!
//! Each device renders itself in the hub's list format, temperatures in
//! tenths of a degree.

mod light;
mod relay;
mod sensor;
mod zone;

pub use light::{Floor, Room, VirtualLight};
pub use relay::VirtualRelay;
pub use sensor::VirtualSensor;
pub use zone::VirtualZone;
