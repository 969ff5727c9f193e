//! Event model: activity notices, subnet wire events and the agent stream.
//!
//! ## Contents
//! - [`ActivityEvent`], [`ActivityKind`] notices published through the activity hub
//! - [`AgentEvent`] the typed, serializable stream consumed by presentation layers
//! - [`SubnetEvent`], [`parse_line`] the JSON-lines format subnets print on stdout
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast` carrying [`AgentEvent`]s
//!
//! ## Quick reference
//! - **Producers**: `core::pipeline` (subnet output), `core::supervisor`
//!   (exits, crashes, inactivity), `core::scheduler` (source updates).
//! - **Consumers**: subscribers registered on the hubs, and anything holding a
//!   `Bus` receiver.

mod bus;
mod event;
mod wire;

pub use bus::Bus;
pub use event::{ActivityEvent, ActivityKind, AgentEvent, STATION_SOURCE};
pub use wire::{parse_line, LineError, SubnetEvent};
