use crate::config::{extract_span, ConfigSpan};
use crate::subsystems::{
    Gnss, GnssConstants, Imu, ImuConstants, Subsystem, SubsystemId, MATRIX_DIM, QUATERNION_DIM,
    VECTOR_DIM,
};
use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Bus layout version reported to plugins.
pub const BUS_VERSION: u32 = 4;

/// A value that is only meaningful while `valid` is set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Flagged<T> {
    pub val: T,
    pub valid: bool,
}

impl<T> Flagged<T> {
    pub fn set(&mut self, val: T) {
        self.val = val;
        self.valid = true;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn get(&self) -> Option<&T> {
        self.valid.then_some(&self.val)
    }
}

/// Navigation solution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Solution {
    /// Cartesian coordinates, meters.
    pub x: Flagged<[f64; VECTOR_DIM]>,
    /// Coordinate RMS deviation estimate, meters.
    pub x_cov: f64,
    /// Longitude (rad), latitude (rad), height (m).
    pub llh: Flagged<[f64; VECTOR_DIM]>,
    /// Velocity relative to Earth, local-level or cartesian frame, m/s.
    pub v: Flagged<[f64; VECTOR_DIM]>,
    pub v_cov: f64,
    /// Attitude quaternion, scalar part first.
    pub q: Flagged<[f64; QUATERNION_DIM]>,
    /// Attitude matrix, row-wise.
    pub l: Flagged<[f64; MATRIX_DIM]>,
    /// Roll, pitch, true heading (rad).
    pub rpy: Flagged<[f64; VECTOR_DIM]>,
    /// Clock bias.
    pub dt: Flagged<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeEpoch {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: f64,
}

/// Operation phase encoded by the sign of [`Bus::mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Initializing,
    Running,
    Terminating,
}

impl Phase {
    pub fn from_mode(mode: i32) -> Self {
        match mode {
            0 => Phase::Initializing,
            m if m > 0 => Phase::Running,
            _ => Phase::Terminating,
        }
    }
}

/// Shared state read and written by plugins.
///
/// Subsystem records exist exactly when their labeled block appears in the
/// configuration. Every span borrows from the configuration buffer, which must
/// outlive the bus.
#[derive(Debug, Serialize)]
pub struct Bus<'cfg> {
    pub version: u32,

    pub config: ConfigSpan<'cfg>,
    /// Text outside the leading and trailing subsystem blocks.
    pub common_config: Option<ConfigSpan<'cfg>>,

    pub imu_const: ImuConstants,
    pub imu: Option<Imu<'cfg>>,

    pub gnss_const: GnssConstants,
    pub gnss: Option<Gnss<'cfg>>,

    /// System time.
    pub t: f64,
    /// 0 while initializing, > 0 running, < 0 terminating.
    pub mode: i32,
    pub sol: Solution,
}

impl<'cfg> Bus<'cfg> {
    pub fn from_config(config: &'cfg str) -> Self {
        let config = ConfigSpan::new(config);

        Self {
            version: BUS_VERSION,
            config,
            common_config: extract_span("", config),
            imu_const: ImuConstants::default(),
            imu: Imu::extract(config),
            gnss_const: GnssConstants::default(),
            gnss: Gnss::extract(config),
            t: 0.0,
            mode: 0,
            sol: Solution::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_mode(self.mode)
    }

    /// Signals termination. The scheduler finishes the protocol.
    pub fn request_termination(&mut self) {
        if self.mode >= 0 {
            self.mode = -1;
        }
    }

    pub fn is_terminating(&self) -> bool {
        self.mode < 0
    }

    /// Every record present on the bus, parents before children.
    pub fn present_subsystems(&self) -> Vec<SubsystemId, { SubsystemId::COUNT }> {
        let mut present = Vec::new();
        if self.imu.is_some() {
            let _ = present.push(SubsystemId::Imu);
        }
        if let Some(gnss) = &self.gnss {
            let _ = present.push(SubsystemId::Gnss);
            for constellation in gnss.constellations() {
                let _ = present.push(constellation.system.subsystem_id());
            }
        }
        present
    }
}
