use super::{Subsystem, SubsystemId, QUATERNION_DIM, VECTOR_DIM};
use crate::bus::{Flagged, Solution};
use crate::config::ConfigSpan;
use serde::Serialize;

/// Inertial measurement unit record.
#[derive(Debug, Clone, Serialize)]
pub struct Imu<'cfg> {
    pub config: ConfigSpan<'cfg>,

    /// Time of measurement update.
    pub t: f64,

    /// Gyroscope measurements.
    pub w: Flagged<[f64; VECTOR_DIM]>,
    /// Accelerometer measurements.
    pub f: Flagged<[f64; VECTOR_DIM]>,
    /// Angular velocity of the local-level frame.
    pub w_level: Flagged<[f64; VECTOR_DIM]>,
    /// Current gravity acceleration vector.
    pub g: Flagged<[f64; VECTOR_DIM]>,
    pub q: Flagged<[f64; QUATERNION_DIM]>,

    /// Inertial solution.
    pub sol: Solution,
}

impl<'cfg> Subsystem<'cfg> for Imu<'cfg> {
    const ID: SubsystemId = SubsystemId::Imu;

    fn from_span(config: ConfigSpan<'cfg>) -> Self {
        Self {
            config,
            t: 0.0,
            w: Flagged::default(),
            f: Flagged::default(),
            w_level: Flagged::default(),
            g: Flagged::default(),
            q: Flagged::default(),
            sol: Solution::default(),
        }
    }

    fn config(&self) -> ConfigSpan<'cfg> {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imu_starts_zeroed_and_invalid() {
        let imu = Imu::extract(ConfigSpan::new("{imu: rate: 100}")).unwrap();
        assert_eq!(imu.config().as_str(), " rate: 100");
        assert_eq!(imu.w.val, [0.0; 3]);
        assert_eq!(imu.q.val, [0.0; 4]);
        assert!(!imu.w.valid && !imu.f.valid && !imu.q.valid);
        assert!(!imu.sol.x.valid);
    }

    #[test]
    fn test_imu_absent_without_block() {
        assert!(Imu::extract(ConfigSpan::new("{gnss: {gps:}}")).is_none());
        // Nested inside another block does not count.
        assert!(Imu::extract(ConfigSpan::new("{gnss: {imu: x}}")).is_none());
    }
}
