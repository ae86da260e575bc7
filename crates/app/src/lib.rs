//! # domosync-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **driven/outbound port** adapters must implement:
//!   - `HubTransport`: login, keep-alive, command exchange, logout
//! - Provide the **Session Manager**, the single critical section every
//!   hub-bound request goes through
//! - Provide the **Catalog Fetcher**, the parsing boundary turning hub
//!   payloads into typed records
//! - Provide **Device Proxies** (light, switch, climate, sensor) caching the
//!   last-known state of one device each
//! - Provide the **Reconciliation Loop** merging fresh catalogs into proxies
//! - Provide [`services::hub::DomoHub`], the top-level service wiring it all
//!
//! ## Dependency rule
//! Depends on `domosync-domain` only (plus `tokio` for locking and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod proxy;
pub mod reconciler;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
