//! Application services — use-case implementations.
//!
//! Each service accepts a [`HubTransport`](crate::ports::HubTransport)
//! implementation via a generic parameter (constructor injection), keeping this
//! layer decoupled from concrete adapters.

pub mod catalog_fetcher;
pub mod hub;
pub mod session_manager;
