use super::{Subsystem, SubsystemId, VECTOR_DIM};
use crate::bus::{Flagged, Solution, TimeEpoch};
use crate::config::{extract_span, ConfigSpan};
use crate::error::CoreError;
use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use tracing::debug;

/// RINEX observation code length, e.g. `C1C`.
pub const OBS_CODE_LEN: usize = 3;
pub const MAX_OBS_TYPES: usize = 32;
const CLOCK_CORR_LEN: usize = 4;

const_assert!(MAX_OBS_TYPES <= u8::MAX as usize);

pub type ObsCode = ArrayString<OBS_CODE_LEN>;
pub type ObsTypeList = heapless::Vec<ObsCode, MAX_OBS_TYPES>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GnssSystem {
    Gps,
    Glonass,
    Galileo,
    BeiDou,
}

impl GnssSystem {
    pub const ALL: [GnssSystem; 4] = [
        GnssSystem::Gps,
        GnssSystem::Glonass,
        GnssSystem::Galileo,
        GnssSystem::BeiDou,
    ];

    pub const fn subsystem_id(self) -> SubsystemId {
        match self {
            GnssSystem::Gps => SubsystemId::Gps,
            GnssSystem::Glonass => SubsystemId::Glonass,
            GnssSystem::Galileo => SubsystemId::Galileo,
            GnssSystem::BeiDou => SubsystemId::BeiDou,
        }
    }

    pub const fn label(self) -> &'static str {
        self.subsystem_id().label()
    }

    fn default_iono(self) -> IonoModel {
        match self {
            GnssSystem::Gps | GnssSystem::BeiDou => IonoModel::Klobuchar {
                alpha: [0.0; 4],
                beta: [0.0; 4],
            },
            GnssSystem::Galileo => IonoModel::NeQuick([0.0; 3]),
            GnssSystem::Glonass => IonoModel::Unavailable,
        }
    }
}

/// Ionospheric model parameters broadcast in the almanac.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IonoModel {
    Klobuchar { alpha: [f64; 4], beta: [f64; 4] },
    NeQuick([f64; 3]),
    Unavailable,
}

/// Operation settings shared by all constellations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GnssSettings {
    /// Sine of the elevation mask angle.
    pub sin_el_mask: f64,
    /// Pseudorange sigma, meters.
    pub code_sigma: f64,
    /// Carrier phase sigma, cycles.
    pub phase_sigma: f64,
    /// Antenna position in the instrumental frame.
    pub ant_pos: [f64; VECTOR_DIM],
    pub ant_pos_tol: Option<f64>,
    pub leap_sec_default: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Satellite {
    /// Ephemeris in RINEX order, starting with the time of clock.
    pub eph: Vec<f64>,
    pub eph_valid: bool,

    /// Code phase offset to subtract from the signal time.
    pub delta_tsv: f64,

    /// Time of signal emission.
    pub t_em: Flagged<f64>,
    pub x: Flagged<[f64; VECTOR_DIM]>,
    pub v: Flagged<[f64; VECTOR_DIM]>,
    pub sin_el: Flagged<f64>,

    /// Observables, one per constellation observation type.
    pub obs: Vec<f64>,
    pub obs_valid: Vec<bool>,
}

fn zeroed<T: Clone + Default>(len: usize, what: &'static str) -> Result<Vec<T>, CoreError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| CoreError::Allocation { what, requested: len })?;
    buf.resize(len, T::default());
    Ok(buf)
}

impl Satellite {
    fn with_sizes(eph_count: usize, obs_count: usize) -> Result<Self, CoreError> {
        Ok(Self {
            eph: zeroed(eph_count, "ephemeris")?,
            obs: zeroed(obs_count, "observables")?,
            obs_valid: zeroed(obs_count, "observable flags")?,
            ..Self::default()
        })
    }
}

/// One satellite constellation (GPS, GLONASS, Galileo, BeiDou).
#[derive(Debug, Clone, Serialize)]
pub struct Constellation<'cfg> {
    pub system: GnssSystem,
    pub config: ConfigSpan<'cfg>,

    pub max_sat_count: usize,
    pub max_eph_count: usize,
    pub sats: Vec<Satellite>,
    /// Observation types, in the same order as each satellite's `obs`.
    pub obs_types: ObsTypeList,
    /// GLONASS frequency numbers, one per satellite. Empty for other systems.
    pub freq_slot: Vec<i32>,

    pub iono: Flagged<IonoModel>,

    pub clock_corr: Flagged<[f64; CLOCK_CORR_LEN]>,
    /// Time system the correction results in: `GP`, `UT`, `GA`, ...
    pub clock_corr_to: ArrayString<2>,
}

impl<'cfg> Constellation<'cfg> {
    pub fn new(system: GnssSystem, config: ConfigSpan<'cfg>) -> Self {
        Self {
            system,
            config,
            max_sat_count: 0,
            max_eph_count: 0,
            sats: Vec::new(),
            obs_types: ObsTypeList::new(),
            freq_slot: Vec::new(),
            iono: Flagged {
                val: system.default_iono(),
                valid: false,
            },
            clock_corr: Flagged::default(),
            clock_corr_to: ArrayString::new(),
        }
    }

    /// Builds the record when `{label:` for `system` appears in `parent`.
    pub fn extract(system: GnssSystem, parent: ConfigSpan<'cfg>) -> Option<Self> {
        extract_span(system.label(), parent).map(|span| Self::new(system, span))
    }

    /// Sizes the satellite table. Replaces any previous table.
    pub fn allocate(
        &mut self,
        sat_count: usize,
        eph_count: usize,
        obs_types: &[&str],
    ) -> Result<(), CoreError> {
        let mut codes = ObsTypeList::new();
        for code in obs_types {
            if code.len() != OBS_CODE_LEN || !code.is_ascii() {
                return Err(CoreError::InvalidObsType((*code).to_string()));
            }
            let code = ObsCode::from(code).map_err(|_| CoreError::InvalidObsType((*code).to_string()))?;
            codes.push(code).map_err(|_| CoreError::TooManyObsTypes {
                requested: obs_types.len(),
                max: MAX_OBS_TYPES,
            })?;
        }

        let mut sats = Vec::new();
        sats.try_reserve_exact(sat_count)
            .map_err(|_| CoreError::Allocation { what: "satellites", requested: sat_count })?;
        for _ in 0..sat_count {
            sats.push(Satellite::with_sizes(eph_count, codes.len())?);
        }

        self.freq_slot = if self.system == GnssSystem::Glonass {
            zeroed(sat_count, "frequency slots")?
        } else {
            Vec::new()
        };
        self.sats = sats;
        self.obs_types = codes;
        self.max_sat_count = sat_count;
        self.max_eph_count = eph_count;

        debug!(
            system = ?self.system,
            sat_count,
            eph_count,
            obs_count = self.obs_types.len(),
            "constellation allocated"
        );
        Ok(())
    }

    pub fn obs_count(&self) -> usize {
        self.obs_types.len()
    }
}

/// Global navigation satellite systems record.
#[derive(Debug, Clone, Serialize)]
pub struct Gnss<'cfg> {
    /// Whole GNSS block.
    pub config: ConfigSpan<'cfg>,
    /// Part of the block common to all constellations.
    pub settings_config: Option<ConfigSpan<'cfg>>,
    pub settings: GnssSettings,

    pub gps: Option<Constellation<'cfg>>,
    pub glo: Option<Constellation<'cfg>>,
    pub gal: Option<Constellation<'cfg>>,
    pub bds: Option<Constellation<'cfg>>,

    pub epoch: TimeEpoch,
    pub leap_sec: Flagged<i32>,

    pub sol: Solution,
    /// Total observations used in the solution.
    pub obs_count: usize,
}

impl<'cfg> Gnss<'cfg> {
    pub fn constellation(&self, system: GnssSystem) -> Option<&Constellation<'cfg>> {
        match system {
            GnssSystem::Gps => self.gps.as_ref(),
            GnssSystem::Glonass => self.glo.as_ref(),
            GnssSystem::Galileo => self.gal.as_ref(),
            GnssSystem::BeiDou => self.bds.as_ref(),
        }
    }

    pub fn constellation_mut(&mut self, system: GnssSystem) -> Option<&mut Constellation<'cfg>> {
        match system {
            GnssSystem::Gps => self.gps.as_mut(),
            GnssSystem::Glonass => self.glo.as_mut(),
            GnssSystem::Galileo => self.gal.as_mut(),
            GnssSystem::BeiDou => self.bds.as_mut(),
        }
    }

    /// Present constellations in GPS, GLONASS, Galileo, BeiDou order.
    pub fn constellations(&self) -> impl Iterator<Item = &Constellation<'cfg>> {
        GnssSystem::ALL
            .into_iter()
            .filter_map(move |system| self.constellation(system))
    }
}

impl<'cfg> Subsystem<'cfg> for Gnss<'cfg> {
    const ID: SubsystemId = SubsystemId::Gnss;

    fn from_span(config: ConfigSpan<'cfg>) -> Self {
        Self {
            config,
            settings_config: extract_span("", config),
            settings: GnssSettings::default(),
            gps: Constellation::extract(GnssSystem::Gps, config),
            glo: Constellation::extract(GnssSystem::Glonass, config),
            gal: Constellation::extract(GnssSystem::Galileo, config),
            bds: Constellation::extract(GnssSystem::BeiDou, config),
            epoch: TimeEpoch::default(),
            leap_sec: Flagged::default(),
            sol: Solution::default(),
            obs_count: 0,
        }
    }

    fn config(&self) -> ConfigSpan<'cfg> {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gnss(text: &str) -> Gnss<'_> {
        Gnss::extract(ConfigSpan::new(text)).unwrap()
    }

    #[test]
    fn test_constellations_follow_labels() {
        let gnss = gnss("{gnss: mask: 10 {gps: a} {gal: b}}");
        assert_eq!(gnss.settings_config.unwrap().as_str(), "mask: 10");
        assert_eq!(gnss.gps.as_ref().unwrap().config.as_str(), " a");
        assert_eq!(gnss.gal.as_ref().unwrap().config.as_str(), " b");
        assert!(gnss.glo.is_none());
        assert!(gnss.bds.is_none());
        let systems: Vec<_> = gnss.constellations().map(|c| c.system).collect();
        assert_eq!(systems, vec![GnssSystem::Gps, GnssSystem::Galileo]);
    }

    #[test]
    fn test_systems_map_to_constellation_ids() {
        let names: Vec<&str> = GnssSystem::ALL.iter().map(|s| s.subsystem_id().name()).collect();
        assert_eq!(names, vec!["gps", "glo", "gal", "bds"]);
        assert_eq!(GnssSystem::Galileo.label(), "{gal:");
    }

    #[test]
    fn test_default_iono_per_system() {
        let gnss = gnss("{gnss:{gps:}{glo:}{gal:}{bds:}}");
        assert!(matches!(gnss.gps.unwrap().iono.val, IonoModel::Klobuchar { .. }));
        assert_eq!(gnss.glo.unwrap().iono.val, IonoModel::Unavailable);
        assert!(matches!(gnss.gal.unwrap().iono.val, IonoModel::NeQuick(_)));
        assert!(!gnss.bds.unwrap().iono.valid);
    }

    #[test]
    fn test_allocate_sizes_satellite_table() {
        let mut gnss = gnss("{gnss:{glo:}}");
        let glo = gnss.constellation_mut(GnssSystem::Glonass).unwrap();
        glo.allocate(24, 15, &["C1C", "L1C", "D1C"]).unwrap();

        assert_eq!(glo.sats.len(), 24);
        assert_eq!(glo.freq_slot.len(), 24);
        assert_eq!(glo.obs_count(), 3);
        assert_eq!(glo.obs_types[1].as_str(), "L1C");
        let sat = &glo.sats[23];
        assert_eq!(sat.eph, vec![0.0; 15]);
        assert_eq!(sat.obs.len(), 3);
        assert_eq!(sat.obs_valid, vec![false; 3]);
        assert!(!sat.eph_valid && !sat.x.valid);
    }

    #[test]
    fn test_allocate_rejects_bad_codes() {
        let mut constellation = Constellation::new(GnssSystem::Gps, ConfigSpan::new(""));
        let err = constellation.allocate(4, 4, &["C1"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidObsType(code) if code == "C1"));

        let too_many: Vec<&str> = std::iter::repeat("C1C").take(MAX_OBS_TYPES + 1).collect();
        let err = constellation.allocate(4, 4, &too_many).unwrap_err();
        assert!(matches!(err, CoreError::TooManyObsTypes { .. }));

        // Failed calls leave the previous table alone.
        assert!(constellation.sats.is_empty());
        assert!(constellation.freq_slot.is_empty());
    }
}
