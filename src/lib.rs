//! # Seaward
//!
//! Client-side prediction and state synchronization for a multiplayer game
//! played on the surface of a sphere.
//!
//! ## Components
//!
//! - `seaward-protocol`: wire envelope, typed messages and the world data model
//! - `seaward-simulation`: world mirror, sync applier, motion stepper, sound tracking
//! - `seaward-client`: transports, transport session, router and game sessions
//!
//! ## Example
//!
//! See `demos/headless_client.rs` for a client that connects to a server and
//! logs the world it mirrors.

pub use seaward_client as client;
pub use seaward_protocol as protocol;
pub use seaward_simulation as simulation;
