//! # Navigation Bus
//!
//! Core of a real-time navigation processing framework: a shared-state bus
//! describing inertial (IMU) and satellite navigation (GNSS) data, driven by an
//! ordered list of plugins executed once per tick.
//!
//! The core performs no navigation math. Plugins read and write bus fields to
//! implement mechanization, filtering and solution fusion.
//!
//! ## Features
//!
//! - **Nested configuration**: one brace-delimited string carved into
//!   per-subsystem spans without copying
//! - **Optional subsystems**: IMU, GNSS and GPS/GLONASS/Galileo/BeiDou records
//!   exist exactly when their block is configured
//! - **Periodic scheduling**: per-entry cycle/shift activation, suspend/resume,
//!   replace and reschedule, callable from the host or from plugins
//! - **Cooperative termination**: any plugin may request shutdown; every plugin
//!   gets a final call before the bus is released
//!
//! ## Quick Start
//!
//! ```rust
//! use navbus::Core;
//!
//! let config = String::from("{imu: rate: 100} {gnss: {gps: } {glo: }}");
//! let mut core = Core::new();
//!
//! let stop = core.register_plugin("stop", |ctx| {
//!     if ctx.bus.t >= 0.03 {
//!         ctx.request_termination();
//!     }
//! });
//! let clock = core.register(navbus::plugins::Clock::new(0.01));
//! core.add_plugin(clock).unwrap();
//! core.add_plugin(stop).unwrap();
//!
//! core.init(&config).unwrap();
//! assert!(core.bus().unwrap().imu.is_some());
//!
//! while core.step() {}
//! assert!(!core.is_initialized());
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - Brace-aware span extraction
//! - [`bus`] - Shared bus state and solution types
//! - [`subsystems`] - IMU and GNSS records, constants
//! - [`scheduler`] - Plugin list and scheduling mutators
//! - [`lifecycle`] - `init`, `step`, `terminate` and teardown
//! - [`plugins`] - General-purpose plugins

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod bus;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod plugins;
pub mod scheduler;
pub mod subsystems;

// Re-export main public types for convenience
pub use bus::{Bus, Flagged, Phase, Solution, TimeEpoch, BUS_VERSION};
pub use config::ConfigSpan;
pub use error::{CoreError, ScheduleError};
pub use lifecycle::Core;
pub use scheduler::{Plugin, PluginContext, PluginEntry, PluginId, Scheduler};
pub use subsystems::{Constellation, Gnss, GnssSystem, Imu, SubsystemId};
