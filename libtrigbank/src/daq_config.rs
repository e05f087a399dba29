use std::fmt;

use ndarray::Array2;

use super::constants::{CHANNEL_COUNT, X_INDEX_MAX, X_INDEX_MIN, Y_INDEX_MAX, Y_INDEX_MIN};
use super::error::CalibrationError;

// Grid dimensions for the dense (x, y) -> channel lookup. Index zero rows
// and columns exist in the grid but are never populated.
pub(crate) const GRID_COLS: usize = (X_INDEX_MAX - X_INDEX_MIN + 1) as usize;
pub(crate) const GRID_ROWS: usize = (Y_INDEX_MAX - Y_INDEX_MIN + 1) as usize;

/// One cut applied by a trigger, in one of the four shapes the hardware
/// supports. The shape fixes exactly which scalars the cut carries;
/// enabled/disabled is independent of the values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutConfig {
    LowerBound { lower: f64, enabled: bool },
    UpperBound { upper: f64, enabled: bool },
    Window { lower: f64, upper: f64, enabled: bool },
    SlopeBound { lower: f64, slope: f64, enabled: bool },
}

impl CutConfig {
    pub fn is_enabled(&self) -> bool {
        match *self {
            CutConfig::LowerBound { enabled, .. } => enabled,
            CutConfig::UpperBound { enabled, .. } => enabled,
            CutConfig::Window { enabled, .. } => enabled,
            CutConfig::SlopeBound { enabled, .. } => enabled,
        }
    }

    pub fn lower(&self) -> Option<f64> {
        match *self {
            CutConfig::LowerBound { lower, .. } => Some(lower),
            CutConfig::Window { lower, .. } => Some(lower),
            CutConfig::SlopeBound { lower, .. } => Some(lower),
            CutConfig::UpperBound { .. } => None,
        }
    }

    pub fn upper(&self) -> Option<f64> {
        match *self {
            CutConfig::UpperBound { upper, .. } => Some(upper),
            CutConfig::Window { upper, .. } => Some(upper),
            _ => None,
        }
    }

    pub fn slope(&self) -> Option<f64> {
        match *self {
            CutConfig::SlopeBound { slope, .. } => Some(slope),
            _ => None,
        }
    }
}

impl fmt::Display for CutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_enabled() { "on" } else { "off" };
        match *self {
            CutConfig::LowerBound { lower, .. } => write!(f, ">= {lower} [{state}]"),
            CutConfig::UpperBound { upper, .. } => write!(f, "<= {upper} [{state}]"),
            CutConfig::Window { lower, upper, .. } => {
                write!(f, "in [{lower}, {upper}] [{state}]")
            }
            CutConfig::SlopeBound { lower, slope, .. } => {
                write!(f, ">= {lower} with slope {slope} [{state}]")
            }
        }
    }
}

/// Cuts owned by one singles trigger instance. Energies are in GeV, the hit
/// count in hits.
#[derive(Debug, Clone, PartialEq)]
pub struct SinglesTriggerConfig {
    pub enabled: bool,
    pub energy_min: CutConfig,
    pub energy_max: CutConfig,
    pub hit_count: CutConfig,
}

/// Cuts owned by one pair trigger instance. Energies are in GeV, the
/// coplanarity bound in degrees and the time coincidence in nanoseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct PairTriggerConfig {
    pub enabled: bool,
    pub energy_min: CutConfig,
    pub energy_max: CutConfig,
    pub hit_count: CutConfig,
    pub energy_sum: CutConfig,
    pub energy_difference: CutConfig,
    pub energy_slope: CutConfig,
    pub coplanarity: CutConfig,
    pub time_difference: CutConfig,
}

/// Clustering settings of the trigger processor. Units are MeV for the seed
/// threshold and clock-cycles for the windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GtpConfig {
    pub seed_threshold_mev: u32,
    pub window_before: u32,
    pub window_after: u32,
}

/// FADC timing settings plus the per-channel calibration arrays.
///
/// The arrays are indexed by stable channel identity; channels the
/// configuration cycle never covered hold the reserved zero default and are
/// listed in `incomplete_channels`. Built once per cycle by the assembler
/// and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FadcConfig {
    pub nsa: u32,
    pub nsb: u32,
    pub npeak: u32,
    pub mode: u32,
    pub window_width: u32,
    pub window_offset: u32,
    pub(crate) gains: Vec<f32>,
    pub(crate) pedestals: Vec<f32>,
    pub(crate) thresholds: Vec<u32>,
    pub(crate) grid: Array2<Option<u16>>,
    pub(crate) incomplete: Vec<u16>,
}

impl FadcConfig {
    fn check_channel(channel: u16) -> Result<usize, CalibrationError> {
        if channel < 1 || channel > CHANNEL_COUNT {
            Err(CalibrationError::OutOfRange(channel))
        } else {
            Ok(channel as usize)
        }
    }

    /// Gain for a channel in ADC / MeV.
    pub fn gain(&self, channel: u16) -> Result<f32, CalibrationError> {
        Ok(self.gains[Self::check_channel(channel)?])
    }

    /// Pedestal for a channel in ADC counts.
    pub fn pedestal(&self, channel: u16) -> Result<f32, CalibrationError> {
        Ok(self.pedestals[Self::check_channel(channel)?])
    }

    /// Readout threshold for a channel in ADC counts.
    pub fn threshold(&self, channel: u16) -> Result<u32, CalibrationError> {
        Ok(self.thresholds[Self::check_channel(channel)?])
    }

    /// Channel identity at a geometric position, if that position exists and
    /// its calibration is complete.
    pub fn channel_at(&self, x: i16, y: i16) -> Option<u16> {
        if !(X_INDEX_MIN..=X_INDEX_MAX).contains(&x) || !(Y_INDEX_MIN..=Y_INDEX_MAX).contains(&y) {
            return None;
        }
        let col = (x - X_INDEX_MIN) as usize;
        let row = (y - Y_INDEX_MIN) as usize;
        self.grid[(row, col)]
    }

    /// Channel identity for a flat geometric cell id (row-major over the
    /// grid), mirroring `channel_at`.
    pub fn channel_for_cell(&self, cell: usize) -> Option<u16> {
        if cell >= GRID_ROWS * GRID_COLS {
            return None;
        }
        self.grid[(cell / GRID_COLS, cell % GRID_COLS)]
    }

    /// Channels whose calibration triple was not fully populated this cycle.
    pub fn incomplete_channels(&self) -> &[u16] {
        &self.incomplete
    }
}

impl fmt::Display for FadcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FADC NSA: {} NSB: {} NPEAK: {}", self.nsa, self.nsb, self.npeak)?;
        writeln!(
            f,
            "FADC mode: {} window width: {} offset: {}",
            self.mode, self.window_width, self.window_offset
        )?;
        write!(f, "Channels with incomplete calibration: {}", self.incomplete.len())
    }
}

/// Both numbered instances of each trigger type owned by the trigger
/// processor.
#[derive(Debug, Clone, PartialEq)]
pub struct SspConfig {
    pub(crate) singles: [SinglesTriggerConfig; 2],
    pub(crate) pairs: [PairTriggerConfig; 2],
}

impl SspConfig {
    pub fn singles(&self, instance: usize) -> &SinglesTriggerConfig {
        &self.singles[instance]
    }

    pub fn pairs(&self, instance: usize) -> &PairTriggerConfig {
        &self.pairs[instance]
    }
}

/// The assembled trigger/DAQ configuration tree for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DaqConfig {
    pub fadc: FadcConfig,
    pub gtp: GtpConfig,
    pub ssp: SspConfig,
}

impl fmt::Display for DaqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.fadc)?;
        writeln!(
            f,
            "GTP seed threshold: {} MeV window: -{}/+{} cycles",
            self.gtp.seed_threshold_mev, self.gtp.window_before, self.gtp.window_after
        )?;
        for ii in 0..2 {
            let s = &self.ssp.singles[ii];
            writeln!(
                f,
                "Singles {} [{}]: emin {} emax {} nhits {}",
                ii,
                if s.enabled { "on" } else { "off" },
                s.energy_min,
                s.energy_max,
                s.hit_count
            )?;
        }
        for ii in 0..2 {
            let p = &self.ssp.pairs[ii];
            writeln!(
                f,
                "Pairs {} [{}]: emin {} emax {} nhits {}",
                ii,
                if p.enabled { "on" } else { "off" },
                p.energy_min,
                p.energy_max,
                p.hit_count
            )?;
            writeln!(
                f,
                "         esum {} ediff {} eslope {}",
                p.energy_sum, p.energy_difference, p.energy_slope
            )?;
            writeln!(
                f,
                "         coplanarity {} tdiff {}",
                p.coplanarity, p.time_difference
            )?;
        }
        Ok(())
    }
}
