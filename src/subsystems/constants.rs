//! Physical and system constants published on the bus independently of the
//! subsystem records.

use serde::{Deserialize, Serialize};

const PI: f64 = core::f64::consts::PI;
const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Inertial navigation constants, GRS-80 Earth model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuConstants {
    pub pi: f64,
    pub rad2deg: f64,
    /// Earth rotation rate, rad/s.
    pub u: f64,
    /// Ellipsoid semi-major axis, m.
    pub a: f64,
    /// First eccentricity squared.
    pub e2: f64,
    /// Normal gravity at the equator, m/s^2.
    pub ge: f64,
    /// Normal gravity flattening.
    pub fg: f64,
}

impl Default for ImuConstants {
    fn default() -> Self {
        Self {
            pi: PI,
            rad2deg: 180.0 / PI,
            u: 7.292_115e-5,
            a: 6_378_137.0,
            e2: 6.694_380_022_90e-3,
            ge: 9.780_326_771_5,
            fg: 5.302_440_112e-3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsConstants {
    pub mu: f64,
    pub u: f64,
    pub a: f64,
    pub e2: f64,
    /// Relativistic correction constant, s/sqrt(m).
    pub f: f64,
    pub f1: f64,
    pub l1: f64,
    pub f2: f64,
    pub l2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GloConstants {
    pub mu: f64,
    /// Second zonal harmonic of the geopotential.
    pub j02: f64,
    pub u: f64,
    pub a: f64,
    pub e2: f64,
    /// L1 centre frequency and channel separation, Hz.
    pub f01: f64,
    pub df1: f64,
    pub f02: f64,
    pub df2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GalConstants {
    pub mu: f64,
    pub u: f64,
    pub a: f64,
    pub e2: f64,
    pub f: f64,
    pub f1: f64,
    pub l1: f64,
    pub f5a: f64,
    pub l5a: f64,
    pub f5b: f64,
    pub l5b: f64,
    pub f6: f64,
    pub l6: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BdsConstants {
    pub mu: f64,
    pub u: f64,
    /// CGCS2000 semi-major axis, m.
    pub a: f64,
    pub e2: f64,
    pub f: f64,
    /// Leap seconds between BeiDou time and GPS time as of 2006-01-01.
    pub leap_sec: f64,
    pub b1: f64,
    pub l1: f64,
    pub b2: f64,
    pub l2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GnssConstants {
    pub pi: f64,
    /// Speed of light, m/s.
    pub c: f64,
    pub sec_in_w: f64,
    pub sec_in_d: f64,
    pub gps: GpsConstants,
    pub glo: GloConstants,
    pub gal: GalConstants,
    pub bds: BdsConstants,
}

fn wavelength(frequency: f64) -> f64 {
    SPEED_OF_LIGHT / frequency
}

impl Default for GnssConstants {
    fn default() -> Self {
        let gps = GpsConstants {
            mu: 3.986_005e14,
            u: 7.292_115_146_7e-5,
            a: 6_378_137.0,
            e2: 6.694_379_990_14e-3,
            f: -4.442_807_633e-10,
            f1: 1_575.42e6,
            l1: wavelength(1_575.42e6),
            f2: 1_227.60e6,
            l2: wavelength(1_227.60e6),
        };
        let glo = GloConstants {
            mu: 3.986_004_4e14,
            j02: 1.082_625_75e-3,
            u: 7.292_115e-5,
            a: 6_378_136.0,
            e2: 6.694_366_2e-3,
            f01: 1_602.0e6,
            df1: 562.5e3,
            f02: 1_246.0e6,
            df2: 437.5e3,
        };
        let gal = GalConstants {
            mu: 3.986_004_418e14,
            u: 7.292_115_146_7e-5,
            a: 6_378_137.0,
            e2: 6.694_379_990_14e-3,
            f: -4.442_807_309e-10,
            f1: 1_575.42e6,
            l1: wavelength(1_575.42e6),
            f5a: 1_176.45e6,
            l5a: wavelength(1_176.45e6),
            f5b: 1_207.14e6,
            l5b: wavelength(1_207.14e6),
            f6: 1_278.75e6,
            l6: wavelength(1_278.75e6),
        };
        let bds = BdsConstants {
            mu: 3.986_004_418e14,
            u: 7.292_115e-5,
            a: 6_378_137.0,
            e2: 6.694_380_022_90e-3,
            f: -4.442_807_309e-10,
            leap_sec: 14.0,
            b1: 1_561.098e6,
            l1: wavelength(1_561.098e6),
            b2: 1_207.14e6,
            l2: wavelength(1_207.14e6),
        };

        Self {
            pi: PI,
            c: SPEED_OF_LIGHT,
            sec_in_w: 604_800.0,
            sec_in_d: 86_400.0,
            gps,
            glo,
            gal,
            bds,
        }
    }
}
