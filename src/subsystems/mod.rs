pub mod constants;
pub mod gnss;
pub mod imu;

pub use constants::{GnssConstants, ImuConstants};
pub use gnss::{Constellation, Gnss, GnssSettings, GnssSystem, IonoModel, ObsCode, Satellite};
pub use imu::Imu;

use crate::config::{extract_span, ConfigSpan};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

pub const VECTOR_DIM: usize = 3;
pub const QUATERNION_DIM: usize = 4;
pub const MATRIX_DIM: usize = VECTOR_DIM * VECTOR_DIM;

const_assert_eq!(QUATERNION_DIM, VECTOR_DIM + 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsystemId {
    Imu,
    Gnss,
    Gps,
    Glonass,
    Galileo,
    BeiDou,
}

impl SubsystemId {
    pub const COUNT: usize = 6;

    /// Block label that introduces this subsystem in its parent's configuration.
    pub const fn label(self) -> &'static str {
        match self {
            SubsystemId::Imu => "{imu:",
            SubsystemId::Gnss => "{gnss:",
            SubsystemId::Gps => "{gps:",
            SubsystemId::Glonass => "{glo:",
            SubsystemId::Galileo => "{gal:",
            SubsystemId::BeiDou => "{bds:",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SubsystemId::Imu => "imu",
            SubsystemId::Gnss => "gnss",
            SubsystemId::Gps => "gps",
            SubsystemId::Glonass => "glo",
            SubsystemId::Galileo => "gal",
            SubsystemId::BeiDou => "bds",
        }
    }
}

/// A bus record built from a labeled configuration block.
pub trait Subsystem<'cfg>: Sized {
    const ID: SubsystemId;

    /// Builds the record around the body of its block.
    fn from_span(span: ConfigSpan<'cfg>) -> Self;

    fn config(&self) -> ConfigSpan<'cfg>;

    /// Builds the record when its block appears at the top level of `parent`.
    fn extract(parent: ConfigSpan<'cfg>) -> Option<Self> {
        extract_span(Self::ID.label(), parent).map(Self::from_span)
    }
}
