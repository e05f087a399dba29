use ndarray::Array2;

use super::channel_registry::ChannelRegistry;
use super::config_parser::ConfigTableParser;
use super::constants::{CHANNEL_COUNT, X_INDEX_MIN, Y_INDEX_MIN};
use super::daq_config::{
    CutConfig, DaqConfig, FadcConfig, GtpConfig, PairTriggerConfig, SinglesTriggerConfig,
    SspConfig, GRID_COLS, GRID_ROWS,
};

/// Cut values arrive in integer milli-units; energy-like cuts are converted
/// to GeV-equivalent units. Hit-count, coplanarity and time cuts are never
/// converted.
const MILLI_PER_UNIT: f64 = 1000.0;

fn to_gev(raw: u32) -> f64 {
    raw as f64 / MILLI_PER_UNIT
}

/// Accumulates per-channel calibration into owned storage and freezes it
/// into an immutable `FadcConfig` once every channel of the cycle has been
/// visited.
struct FadcConfigBuilder {
    gains: Vec<f32>,
    pedestals: Vec<f32>,
    thresholds: Vec<u32>,
    grid: Array2<Option<u16>>,
    incomplete: Vec<u16>,
}

impl FadcConfigBuilder {
    fn new() -> Self {
        Self {
            gains: vec![0.0; CHANNEL_COUNT as usize + 1],
            pedestals: vec![0.0; CHANNEL_COUNT as usize + 1],
            thresholds: vec![0; CHANNEL_COUNT as usize + 1],
            grid: Array2::from_elem((GRID_ROWS, GRID_COLS), None),
            incomplete: Vec::new(),
        }
    }

    fn set_channel(&mut self, id: u16, x: i16, y: i16, gain: f32, pedestal: f32, threshold: u32) {
        self.gains[id as usize] = gain;
        self.pedestals[id as usize] = pedestal;
        self.thresholds[id as usize] = threshold;
        let col = (x - X_INDEX_MIN) as usize;
        let row = (y - Y_INDEX_MIN) as usize;
        self.grid[(row, col)] = Some(id);
    }

    fn mark_incomplete(&mut self, id: u16) {
        self.incomplete.push(id);
    }

    fn finish(self, parser: &ConfigTableParser) -> FadcConfig {
        FadcConfig {
            nsa: parser.get_int("FADC250_NSA", 0),
            nsb: parser.get_int("FADC250_NSB", 0),
            npeak: parser.get_int("FADC250_NPEAK", 0),
            mode: parser.get_int("FADC250_MODE", 0),
            window_width: parser.get_int("FADC250_W_WIDTH", 0),
            window_offset: parser.get_int("FADC250_W_OFFSET", 0),
            gains: self.gains,
            pedestals: self.pedestals,
            thresholds: self.thresholds,
            grid: self.grid,
            incomplete: self.incomplete,
        }
    }
}

/// Assemble a configuration tree from whatever the parser currently holds,
/// joined against the channel registry snapshot.
///
/// Missing parameters resolve to the parser's zero defaults rather than
/// failing the build; an incomplete tree is caught upstream by the
/// configuration manager, which only publishes complete cycles.
pub fn build(parser: &ConfigTableParser, registry: &ChannelRegistry) -> DaqConfig {
    let mut fadc = FadcConfigBuilder::new();
    for entry in registry.entries() {
        let a = entry.address;
        let gain = parser.gain(a.crate_id, a.slot, a.channel);
        let pedestal = parser.pedestal(a.crate_id, a.slot, a.channel);
        let threshold = parser.threshold(a.crate_id, a.slot, a.channel);
        match (gain, pedestal, threshold) {
            (Some(g), Some(p), Some(t)) => {
                fadc.set_channel(entry.id, entry.x, entry.y, g, p, t);
            }
            _ => fadc.mark_incomplete(entry.id),
        }
    }

    let gtp = GtpConfig {
        seed_threshold_mev: parser.get_int("GTP_CLUSTER_THRESH", 0),
        window_before: parser.get_int("GTP_TIMEDIFF", 0),
        window_after: parser.get_int("GTP_TIMEDIFF", 1),
    };

    let singles_enabled = parser.singles_enabled();
    let pairs_enabled = parser.pairs_enabled();
    let singles = [0, 1].map(|ii| build_singles(parser, ii, singles_enabled[ii]));
    let pairs = [0, 1].map(|ii| build_pairs(parser, ii, pairs_enabled[ii]));

    DaqConfig {
        fadc: fadc.finish(parser),
        gtp,
        ssp: SspConfig { singles, pairs },
    }
}

fn build_singles(parser: &ConfigTableParser, ii: usize, enabled: bool) -> SinglesTriggerConfig {
    SinglesTriggerConfig {
        enabled,
        energy_min: CutConfig::LowerBound {
            lower: to_gev(parser.get_trigger_int(ii, "SINGLES_EMIN", 0)),
            enabled: parser.get_trigger_bool(ii, "SINGLES_EMIN", 1),
        },
        energy_max: CutConfig::UpperBound {
            upper: to_gev(parser.get_trigger_int(ii, "SINGLES_EMAX", 0)),
            enabled: parser.get_trigger_bool(ii, "SINGLES_EMAX", 1),
        },
        hit_count: CutConfig::LowerBound {
            lower: parser.get_trigger_int(ii, "SINGLES_NMIN", 0) as f64,
            enabled: parser.get_trigger_bool(ii, "SINGLES_NMIN", 1),
        },
    }
}

fn build_pairs(parser: &ConfigTableParser, ii: usize, enabled: bool) -> PairTriggerConfig {
    // The hardware applies the pair energy bounds, the hit-count bound and
    // the time coincidence unconditionally; their parsed enable flags are
    // meaningless and are overridden here.
    PairTriggerConfig {
        enabled,
        energy_min: CutConfig::LowerBound {
            lower: to_gev(parser.get_trigger_int(ii, "PAIRS_EMIN", 0)),
            enabled: true,
        },
        energy_max: CutConfig::UpperBound {
            upper: to_gev(parser.get_trigger_int(ii, "PAIRS_EMAX", 0)),
            enabled: true,
        },
        hit_count: CutConfig::LowerBound {
            lower: parser.get_trigger_int(ii, "PAIRS_NMIN", 0) as f64,
            enabled: true,
        },
        energy_sum: CutConfig::Window {
            lower: to_gev(parser.get_trigger_int(ii, "PAIRS_SUMMAX_MIN", 1)),
            upper: to_gev(parser.get_trigger_int(ii, "PAIRS_SUMMAX_MIN", 0)),
            enabled: parser.get_trigger_bool(ii, "PAIRS_SUMMAX_MIN", 2),
        },
        energy_difference: CutConfig::UpperBound {
            upper: to_gev(parser.get_trigger_int(ii, "PAIRS_DIFFMAX", 0)),
            enabled: parser.get_trigger_bool(ii, "PAIRS_DIFFMAX", 1),
        },
        energy_slope: CutConfig::SlopeBound {
            lower: to_gev(parser.get_trigger_int(ii, "PAIRS_ENERGYDIST", 1)),
            slope: parser.get_trigger_float(ii, "PAIRS_ENERGYDIST", 0) / MILLI_PER_UNIT,
            enabled: parser.get_trigger_bool(ii, "PAIRS_ENERGYDIST", 2),
        },
        coplanarity: CutConfig::UpperBound {
            upper: parser.get_trigger_int(ii, "PAIRS_COPLANARITY", 0) as f64,
            enabled: parser.get_trigger_bool(ii, "PAIRS_COPLANARITY", 1),
        },
        time_difference: CutConfig::UpperBound {
            upper: parser.get_trigger_int(ii, "PAIRS_TIMECOINCIDENCE", 0) as f64,
            enabled: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalibrationError;

    fn sixteen(value: &str) -> String {
        vec![value; 16].join(" ")
    }

    fn full_parser() -> ConfigTableParser {
        let mut parser = ConfigTableParser::new();
        let fadc_table = format!(
            "FADC250_NSA 100\nFADC250_NSB 20\nFADC250_NPEAK 1\nFADC250_MODE 1\n\
             FADC250_W_WIDTH 400\nFADC250_W_OFFSET 4868\n\
             FADC250_SLOT 3\n\
             FADC250_ALLCH_GAIN {}\nFADC250_ALLCH_PED {}\nFADC250_ALLCH_TET {}",
            sixteen("0.25"),
            sixteen("150.5"),
            sixteen("12"),
        );
        parser.ingest(37, 5772, &[fadc_table.as_str()]);
        parser.ingest(39, 5772, &["FADC250_MODE 1"]);
        let ssp_table = "SSP_HPS_SET_IO_SRC 5 20\n\
                         SSP_HPS_SINGLES_NMIN 0 3 1\n\
                         SSP_HPS_SINGLES_EMIN 0 500 1\n\
                         SSP_HPS_SINGLES_EMAX 0 2500 0\n\
                         SSP_HPS_PAIRS_NMIN 0 2 0\n\
                         SSP_HPS_PAIRS_EMIN 0 150 0\n\
                         SSP_HPS_PAIRS_EMAX 0 1400 0\n\
                         SSP_HPS_PAIRS_SUMMAX_MIN 0 1500 400 1\n\
                         SSP_HPS_PAIRS_DIFFMAX 0 1100 1\n\
                         SSP_HPS_PAIRS_COPLANARITY 0 35 1\n\
                         SSP_HPS_PAIRS_TIMECOINCIDENCE 0 12 0\n\
                         SSP_HPS_PAIRS_ENERGYDIST 0 5.5 600 1";
        parser.ingest(46, 5772, &[ssp_table]);
        parser.ingest(58, 5772, &["GTP_CLUSTER_THRESH 87\nGTP_TIMEDIFF 2 3"]);
        parser
    }

    #[test]
    fn test_fadc_scalars_unconverted() {
        let registry = ChannelRegistry::new(None).unwrap();
        let config = build(&full_parser(), &registry);
        assert_eq!(config.fadc.nsa, 100);
        assert_eq!(config.fadc.nsb, 20);
        assert_eq!(config.fadc.npeak, 1);
        assert_eq!(config.fadc.mode, 1);
        assert_eq!(config.fadc.window_width, 400);
        assert_eq!(config.fadc.window_offset, 4868);
        assert_eq!(config.gtp.seed_threshold_mev, 87);
        assert_eq!(config.gtp.window_before, 2);
        assert_eq!(config.gtp.window_after, 3);
    }

    #[test]
    fn test_energy_cuts_converted_to_gev() {
        let registry = ChannelRegistry::new(None).unwrap();
        let config = build(&full_parser(), &registry);
        let pairs = config.ssp.pairs(0);
        assert_eq!(pairs.energy_sum.upper(), Some(1.5));
        assert_eq!(pairs.energy_sum.lower(), Some(0.4));
        assert!(pairs.energy_sum.is_enabled());
        assert_eq!(pairs.energy_difference.upper(), Some(1.1));
        assert_eq!(pairs.energy_slope.lower(), Some(0.6));
        assert_eq!(pairs.energy_slope.slope(), Some(0.0055));
        // Geometric and time cuts stay in their native units.
        assert_eq!(pairs.coplanarity.upper(), Some(35.0));
        assert_eq!(pairs.time_difference.upper(), Some(12.0));

        let singles = config.ssp.singles(0);
        assert_eq!(singles.energy_min.lower(), Some(0.5));
        assert_eq!(singles.energy_max.upper(), Some(2.5));
        assert!(!singles.energy_max.is_enabled());
        assert_eq!(singles.hit_count.lower(), Some(3.0));
        assert!(singles.enabled);
        assert!(!config.ssp.singles(1).enabled);
    }

    #[test]
    fn test_fixed_policy_cuts_always_enabled() {
        let registry = ChannelRegistry::new(None).unwrap();
        let config = build(&full_parser(), &registry);
        let pairs = config.ssp.pairs(0);
        // All carry a parsed "0" enable flag; the hardware applies them
        // regardless.
        assert!(pairs.energy_min.is_enabled());
        assert!(pairs.energy_max.is_enabled());
        assert!(pairs.hit_count.is_enabled());
        assert!(pairs.time_difference.is_enabled());
    }

    #[test]
    fn test_channel_join_and_out_of_range() {
        let registry = ChannelRegistry::new(None).unwrap();
        let config = build(&full_parser(), &registry);
        // Crate 37 slot 3 holds channels 1..=16 in the default map; only
        // those got a full calibration triple.
        assert_eq!(config.fadc.gain(1).unwrap(), 0.25);
        assert_eq!(config.fadc.pedestal(16).unwrap(), 150.5);
        assert_eq!(config.fadc.threshold(16).unwrap(), 12);
        // Channel 442 had no table entries: reserved default, incomplete.
        assert_eq!(config.fadc.gain(442).unwrap(), 0.0);
        assert!(config.fadc.incomplete_channels().contains(&442));
        assert!(!config.fadc.incomplete_channels().contains(&1));

        assert_eq!(config.fadc.gain(0), Err(CalibrationError::OutOfRange(0)));
        assert_eq!(config.fadc.gain(443), Err(CalibrationError::OutOfRange(443)));
    }

    #[test]
    fn test_incomplete_channels_excluded_from_grid() {
        let registry = ChannelRegistry::new(None).unwrap();
        let config = build(&full_parser(), &registry);
        let complete = registry.entry_for_id(1).unwrap();
        assert_eq!(config.fadc.channel_at(complete.x, complete.y), Some(1));
        let incomplete = registry.entry_for_id(442).unwrap();
        assert_eq!(config.fadc.channel_at(incomplete.x, incomplete.y), None);
        // Position zero never exists.
        assert_eq!(config.fadc.channel_at(0, 0), None);
    }
}
